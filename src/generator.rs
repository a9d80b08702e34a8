//! Orchestrator: drives the three output modes over one document.
//!
//! The pipeline is the same in every mode:
//! 1. Parse: YAML/JSON -> `Document`
//! 2. Index: `Document` -> `Registry` (read-only afterwards)
//! 3. Translate: registry -> Type-AST declarations per mode
//! 4. Emit: AST -> canonical text
//!
//! A fatal error aborts the whole file; nothing partial is emitted.

use indexmap::IndexMap;

use crate::ast::{Decl, Emit, File, TraitDecl, Visibility};
use crate::config::{Config, Mode};
use crate::diagnostics::DiagnosticSink;
use crate::error::TranslateError;
use crate::mangle::mangle;
use crate::registry::Registry;
use crate::spec::Document;
use crate::translate::operation::{
    api_method, client_method, component_response_decls, emit_body_enum, register_line,
    server_method, translate_operations, TranslatedOperation,
};
use crate::translate::content::translate_content;
use crate::translate::schema::SchemaTranslator;

/// Everything a run can produce.
#[derive(Debug)]
pub struct GeneratedFiles {
    pub types: String,
    pub client: String,
    pub server: String,
}

/// Generate the file selected by `config.mode` from an OpenAPI document
/// in YAML or JSON form.
pub fn generate(
    input: &str,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<String, TranslateError> {
    let document = Document::from_yaml(input)?;
    generate_document(document, config, sink)
}

/// Generate all three files over a single registry.
pub fn generate_all(
    input: &str,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<GeneratedFiles, TranslateError> {
    let document = Document::from_yaml(input)?;
    let registry = Registry::index(document);
    Ok(GeneratedFiles {
        types: emit_mode(&registry, config, Mode::Types, sink)?,
        client: emit_mode(&registry, config, Mode::Client, sink)?,
        server: emit_mode(&registry, config, Mode::Server, sink)?,
    })
}

/// Generate from an already-parsed document.
pub fn generate_document(
    document: Document,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<String, TranslateError> {
    let registry = Registry::index(document);
    emit_mode(&registry, config, config.mode, sink)
}

fn emit_mode(
    registry: &Registry,
    config: &Config,
    mode: Mode,
    sink: &mut dyn DiagnosticSink,
) -> Result<String, TranslateError> {
    tracing::debug!(mode = mode.as_str(), "generating file");
    let file = match mode {
        Mode::Types => types_file(registry, config, sink)?,
        Mode::Client => client_file(registry, config, sink)?,
        Mode::Server => server_file(registry, config, sink)?,
    };
    Ok(file.emit())
}

fn file_docs(registry: &Registry, what: &str) -> Vec<String> {
    format!(
        "Generated {what} for '{}' by oxgen. Do not edit.",
        registry.document().info.title
    )
    .split('\n')
    .map(str::to_string)
    .collect()
}

const FILE_ALLOW: &str = "#![allow(unused, clippy::all, non_camel_case_types, non_snake_case)]";

/// Standard per-module import preamble for generated modules.
fn module_with_preamble(name: &str, vis: Visibility, docs: Vec<String>, decls: Vec<Decl>) -> Decl {
    let mut all = vec![
        Decl::Use("oxgen_runtime as runtime".to_string()),
        Decl::Use("serde::{Deserialize, Serialize}".to_string()),
        Decl::Use("indexmap::IndexMap".to_string()),
    ];
    all.extend(decls);
    Decl::Module {
        name: name.to_string(),
        vis,
        docs,
        decls: all,
    }
}

/// Reject two component keys mangling to the same identifier.
fn check_namespace<'k>(
    keys: impl Iterator<Item = &'k String>,
    namespace: &str,
) -> Result<(), TranslateError> {
    let mut claimed: IndexMap<String, &'k String> = IndexMap::new();
    for key in keys {
        let identifier = mangle(key);
        if let Some(first) = claimed.get(&identifier) {
            return Err(TranslateError::NameCollision {
                namespace: namespace.to_string(),
                identifier,
                first: (*first).clone(),
                second: key.clone(),
            });
        }
        claimed.insert(identifier, key);
    }
    Ok(())
}

/// The type catalog: component namespaces, operation envelopes, and the
/// `Api` trait.
fn types_file(
    registry: &Registry,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<File, TranslateError> {
    let vis = config.access.visibility();
    let mut decls: Vec<Decl> = vec![
        Decl::Raw(FILE_ALLOW.to_string()),
        Decl::Use("oxgen_runtime as runtime".to_string()),
    ];

    // Components: five namespaces, emitted only when populated.
    let mut submodules = Vec::new();
    {
        let mut translator = SchemaTranslator::new(registry, config, "");
        translator.translate_components(sink)?;
        let schema_decls = translator.finish();
        if !schema_decls.is_empty() {
            submodules.push(module_with_preamble("schemas", vis, Vec::new(), schema_decls));
        }
    }
    if let Some(components) = &registry.document().components {
        // Parameters and headers are typealiases of their schema types.
        check_namespace(components.parameters.keys(), "components.parameters")?;
        let mut translator = SchemaTranslator::new(registry, config, "super::schemas::");
        for (name, parameter) in &components.parameters {
            let parameter = registry.resolve_parameter(parameter)?;
            let alias = translator.claim(name);
            let ty =
                translator.type_for_optional_schema(sink, parameter.schema.as_ref(), &alias)?;
            translator.push_decl(Decl::TypeAlias {
                name: alias,
                vis,
                docs: Vec::new(),
                ty,
            });
        }
        let decls = translator.finish();
        if !decls.is_empty() {
            submodules.push(module_with_preamble("parameters", vis, Vec::new(), decls));
        }

        check_namespace(components.headers.keys(), "components.headers")?;
        let mut translator = SchemaTranslator::new(registry, config, "super::schemas::");
        for (name, header) in &components.headers {
            let header = registry.resolve_header(header)?;
            let alias = translator.claim(name);
            let ty = translator.type_for_optional_schema(sink, header.schema.as_ref(), &alias)?;
            translator.push_decl(Decl::TypeAlias {
                name: alias,
                vis,
                docs: Vec::new(),
                ty,
            });
        }
        let decls = translator.finish();
        if !decls.is_empty() {
            submodules.push(module_with_preamble("headers", vis, Vec::new(), decls));
        }

        check_namespace(components.responses.keys(), "components.responses")?;
        let mut translator = SchemaTranslator::new(registry, config, "super::schemas::");
        for (name, response) in &components.responses {
            let response = registry.resolve_response(response)?;
            component_response_decls(&mut translator, sink, config, registry, name, response)?;
        }
        let decls = translator.finish();
        if !decls.is_empty() {
            submodules.push(module_with_preamble("responses", vis, Vec::new(), decls));
        }

        check_namespace(
            components.request_bodies.keys(),
            "components.requestBodies",
        )?;
        let mut translator = SchemaTranslator::new(registry, config, "super::schemas::");
        for (name, request_body) in &components.request_bodies {
            let request_body = registry.resolve_request_body(request_body)?;
            let enum_name = translator.claim(name);
            let variants = translate_content(
                &mut translator,
                sink,
                config,
                &request_body.content,
                &enum_name,
            )?;
            emit_body_enum(&mut translator, vis, &enum_name, &variants);
        }
        let decls = translator.finish();
        if !decls.is_empty() {
            submodules.push(module_with_preamble("request_bodies", vis, Vec::new(), decls));
        }
    }
    if !submodules.is_empty() {
        decls.push(Decl::Module {
            name: "components".to_string(),
            vis,
            docs: vec!["Reusable components of the document.".to_string()],
            decls: submodules,
        });
    }

    // Operations: one envelope module per operation.
    let operations = translate_operations(registry, config, sink)?;
    if !operations.is_empty() {
        let modules: Vec<Decl> = operations
            .iter()
            .map(|op| {
                module_with_preamble(
                    &op.name,
                    vis,
                    vec![op.doc_line()],
                    op.module_decls.clone(),
                )
            })
            .collect();
        decls.push(Decl::Module {
            name: "operations".to_string(),
            vis,
            docs: vec!["Per-operation request and response envelopes.".to_string()],
            decls: modules,
        });

        decls.push(Decl::Trait(TraitDecl {
            name: "Api".to_string(),
            vis,
            docs: vec![
                "The API surface: one async, fallible method per operation.".to_string(),
            ],
            fns: operations.iter().map(api_method).collect(),
        }));
    }

    Ok(File {
        docs: file_docs(registry, "type catalog"),
        decls,
    })
}

/// The HTTP client: a constructor plus one method per operation.
fn client_file(
    registry: &Registry,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<File, TranslateError> {
    let vis = config.access.visibility();
    let operations = translate_operations(registry, config, sink)?;

    let mut decls: Vec<Decl> = vec![
        Decl::Raw(FILE_ALLOW.to_string()),
        Decl::Use("oxgen_runtime as runtime".to_string()),
        Decl::Use("crate::types::operations".to_string()),
    ];

    decls.push(Decl::Raw(client_shell(
        vis,
        &registry.document().info.title,
        registry
            .document()
            .servers
            .first()
            .map(|server| server.url.as_str()),
    )));

    let fns = operations
        .iter()
        .map(|op| client_method(op, vis))
        .collect();
    decls.push(Decl::Impl(crate::ast::ImplDecl {
        generics: None,
        trait_name: None,
        target: "Client".to_string(),
        fns,
    }));

    Ok(File {
        docs: file_docs(registry, "client"),
        decls,
    })
}

fn client_shell(vis: Visibility, title: &str, default_server: Option<&str>) -> String {
    let vis = vis.emit();
    let default_server_fn = match default_server {
        Some(url) => format!(
            "\n\n    /// The first server URL the document declares.\n    \
             {vis}fn default_server_url() -> runtime::ServerUrl {{\n        \
             runtime::ServerUrl::parse(\"{url}\")\n    }}"
        ),
        None => String::new(),
    };
    format!(
        "/// Client for '{title}'.\n\
         {vis}struct Client {{\n    \
         transport: runtime::Transport,\n    \
         server_url: runtime::ServerUrl,\n    \
         config: runtime::Configuration,\n    \
         middlewares: Vec<runtime::Middleware>,\n\
         }}\n\n\
         impl Client {{\n    \
         /// Creates a client from a transport, server URL, configuration,\n    \
         /// and middleware chain.\n    \
         {vis}fn new(\n        \
         transport: runtime::Transport,\n        \
         server_url: runtime::ServerUrl,\n        \
         config: runtime::Configuration,\n        \
         middlewares: Vec<runtime::Middleware>,\n    \
         ) -> Self {{\n        \
         Self {{ transport, server_url, config, middlewares }}\n    \
         }}{default_server_fn}\n\
         }}"
    )
}

/// The server adapter: per-operation handler methods plus
/// `register_handlers`.
fn server_file(
    registry: &Registry,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<File, TranslateError> {
    let vis = config.access.visibility();
    let operations = translate_operations(registry, config, sink)?;

    let mut decls: Vec<Decl> = vec![
        Decl::Raw(FILE_ALLOW.to_string()),
        Decl::Use("oxgen_runtime as runtime".to_string()),
        Decl::Use("crate::types::{operations, Api}".to_string()),
    ];

    decls.push(Decl::Raw(format!(
        "/// Adapter dispatching transport requests to an `Api` implementation.\n\
         {}struct Server<A: Api> {{\n    api: A,\n}}",
        vis.emit()
    )));

    decls.push(Decl::Impl(crate::ast::ImplDecl {
        generics: Some("<A: Api>".to_string()),
        trait_name: None,
        target: "Server<A>".to_string(),
        fns: operations.iter().map(server_method).collect(),
    }));

    decls.push(Decl::Raw(register_handlers_fn(vis, &operations)));

    Ok(File {
        docs: file_docs(registry, "server adapter"),
        decls,
    })
}

fn register_handlers_fn(vis: Visibility, operations: &[TranslatedOperation]) -> String {
    let registrations: Vec<String> = operations
        .iter()
        .map(|op| format!("    {}", register_line(op)))
        .collect();
    format!(
        "/// Registers one handler per operation with `(method, path template)`.\n\
         {}fn register_handlers<A>(transport: &mut runtime::ServerTransport, api: A)\n\
         where\n    A: Api + Clone + Send + Sync + 'static,\n\
         {{\n    let server = std::sync::Arc::new(Server {{ api }});\n{}\n}}",
        vis.emit(),
        registrations.join("\n")
    )
}
