//! Operation translation: per-operation `Input`/`Output` envelopes,
//! routes, and the four generated blocks: client serializer, server
//! deserializer, server serializer, client deserializer.
//!
//! The translation runs once per operation and records everything the
//! three output modes need; the types mode emits the envelope module,
//! the client and server modes emit method bodies referencing it.

use std::collections::HashSet;

use crate::ast::{
    Decl, EnumDecl, Field, FnDecl, ImplDecl, Param, Stmt, StructDecl, Type, Variant, Visibility,
};
use crate::config::Config;
use crate::diagnostics::DiagnosticSink;
use crate::error::TranslateError;
use crate::mangle::{mangle, Namespace};
use crate::registry::Registry;
use crate::spec::{HttpMethod, Operation, Response};

use super::content::{
    accept_header_value, translate_content, ContentCategory, ContentVariant, MultipartClasses,
};
use super::params::{
    rewrite_path_template, translate_parameters, ParameterGroups, PathTemplate,
    TranslatedParameter,
};
use super::schema::{constructor_fn, SchemaTranslator};
use super::plain_derives;

/// Path from an operation module back to the component schemas module.
const SCHEMAS_PATH: &str = "super::super::components::schemas::";

/// A request or response body sum.
#[derive(Debug, Clone)]
pub struct BodyShape {
    pub required: bool,
    pub enum_name: String,
    pub variants: Vec<ContentVariant>,
}

/// One documented response of an operation.
#[derive(Debug, Clone)]
pub struct ResponseShape {
    pub variant_name: String,
    /// Payload struct; `None` means a unit variant.
    pub struct_name: Option<String>,
    /// `default` and range keys carry the actual status in the payload.
    pub carries_status: bool,
    /// Match pattern on the client: `200`, `status @ 200..=299`, or
    /// `status` for the `default` catch-all.
    pub client_pattern: String,
    /// Status expression on the server: `200` or `value.status`.
    pub server_status: String,
    pub headers: Vec<TranslatedParameter>,
    pub headers_struct: Option<String>,
    pub body: Option<BodyShape>,
}

impl ResponseShape {
    fn is_catch_all(&self) -> bool {
        self.client_pattern == "status"
    }

    fn is_range(&self) -> bool {
        self.client_pattern.contains("..=")
    }
}

/// Everything the three modes need to know about one operation.
#[derive(Debug)]
pub struct TranslatedOperation {
    pub name: String,
    pub method: HttpMethod,
    pub path: String,
    pub template: PathTemplate,
    /// Path render arguments in template occurrence order.
    pub path_exprs: Vec<String>,
    pub groups: ParameterGroups,
    pub body: Option<BodyShape>,
    pub responses: Vec<ResponseShape>,
    /// The union of response content types, for the `Accept` header.
    pub accept: Option<String>,
    pub deprecated: bool,
    /// Declarations of the `operations::<name>` module.
    pub module_decls: Vec<Decl>,
}

impl TranslatedOperation {
    /// The `` `GET /pets/{petId}` `` doc line shared by the generated
    /// surfaces.
    pub fn doc_line(&self) -> String {
        let deprecated = if self.deprecated { " (deprecated)" } else { "" };
        format!("`{} {}`{deprecated}", self.method.as_str(), self.path)
    }

    fn qual(&self) -> String {
        format!("operations::{}", self.name)
    }

    pub fn has_catch_all(&self) -> bool {
        self.responses.iter().any(ResponseShape::is_catch_all)
    }
}

/// Translate every operation in the document, path order then method
/// order. Path items carrying `$ref` are skipped with a warning; a
/// duplicate operation name is fatal.
pub fn translate_operations(
    registry: &Registry,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
) -> Result<Vec<TranslatedOperation>, TranslateError> {
    let mut seen = HashSet::new();
    let mut operations = Vec::new();
    for (path, item) in &registry.document().paths {
        if let Some(reference) = &item.reference {
            sink.warning(&format!(
                "path item '{path}' uses $ref '{reference}', which is not supported; \
                 path skipped"
            ));
            continue;
        }
        for (method, operation) in item.operations() {
            let name = operation_name(method, path, operation);
            if !seen.insert(name.clone()) {
                return Err(TranslateError::DuplicateOperationId { id: name });
            }
            tracing::debug!(operation = %name, method = method.as_str(), path, "translating operation");
            operations.push(translate_operation(
                registry, config, sink, path, item, method, operation, name,
            )?);
        }
    }
    Ok(operations)
}

/// The operation's identifier: the mangled `operationId`, or a synthetic
/// `<method>_<segments>` name when the document omits one.
fn operation_name(method: HttpMethod, path: &str, operation: &Operation) -> String {
    if let Some(id) = &operation.operation_id {
        return mangle(id);
    }
    let segments: Vec<&str> = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.trim_start_matches('{').trim_end_matches('}'))
        .collect();
    mangle(&format!(
        "{}_{}",
        method.as_lower_str(),
        segments.join("_")
    ))
}

#[allow(clippy::too_many_arguments)]
fn translate_operation(
    registry: &Registry,
    config: &Config,
    sink: &mut dyn DiagnosticSink,
    path: &str,
    item: &crate::spec::PathItem,
    method: HttpMethod,
    operation: &Operation,
    name: String,
) -> Result<TranslatedOperation, TranslateError> {
    let vis = config.access.visibility();
    let mut schemas = SchemaTranslator::new(registry, config, SCHEMAS_PATH);

    let groups = translate_parameters(
        &mut schemas,
        sink,
        registry,
        &item.parameters,
        &operation.parameters,
        &name,
    )?;

    // Envelope groups, omitted entirely when empty.
    let mut input_fields = Vec::new();
    for (group_name, field_name, params) in [
        ("Path", "path", &groups.path),
        ("Query", "query", &groups.query),
        ("Headers", "headers", &groups.headers),
        ("Cookies", "cookies", &groups.cookies),
    ] {
        if params.is_empty() {
            continue;
        }
        let struct_name = emit_group_struct(&mut schemas, vis, group_name, params);
        let all_default = params.iter().all(|p| !p.required);
        input_fields.push(Field {
            name: field_name.to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: Type::path(struct_name),
            has_default: all_default,
        });
    }

    // Request body.
    let body = match &operation.request_body {
        Some(request_body) => {
            let request_body = registry.resolve_request_body(request_body)?;
            if request_body.content.is_empty() {
                None
            } else {
                let enum_name = schemas.claim("Body");
                let variants = translate_content(
                    &mut schemas,
                    sink,
                    config,
                    &request_body.content,
                    &enum_name,
                )?;
                emit_body_enum(&mut schemas, vis, &enum_name, &variants);
                Some(BodyShape {
                    required: request_body.required,
                    enum_name,
                    variants,
                })
            }
        }
        None => None,
    };
    if let Some(body) = &body {
        input_fields.push(Field {
            name: "body".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: if body.required {
                Type::path(&body.enum_name)
            } else {
                Type::option(Type::path(&body.enum_name))
            },
            has_default: !body.required,
        });
    }

    let input_name = schemas.claim("Input");
    let input_constructor = constructor_fn(&input_fields, vis, None);
    schemas.push_decl(Decl::Struct(StructDecl {
        name: input_name.clone(),
        vis,
        docs: vec!["Request envelope.".to_string()],
        derives: plain_derives(),
        attrs: Vec::new(),
        fields: input_fields,
    }));
    if let Some(constructor) = input_constructor {
        schemas.push_decl(Decl::Impl(ImplDecl {
            generics: None,
            trait_name: None,
            target: input_name,
            fns: vec![constructor],
        }));
    }

    // Responses, document order preserved.
    let mut responses = Vec::new();
    let mut variant_ns = Namespace::new();
    let mut media_types = Vec::new();
    for (status_key, response) in &operation.responses {
        let response = registry.resolve_response(response)?;
        for media_type in response.content.keys() {
            media_types.push(media_type.clone());
        }
        let shape = build_response_shape(
            &mut schemas,
            sink,
            config,
            registry,
            &mut variant_ns,
            status_key,
            response,
        )?;
        responses.push(shape);
    }

    let undocumented = variant_ns.claim("Undocumented");
    let mut output_variants: Vec<Variant> = responses
        .iter()
        .map(|shape| Variant {
            name: shape.variant_name.clone(),
            docs: Vec::new(),
            attrs: Vec::new(),
            payload: shape
                .struct_name
                .iter()
                .map(|name| Type::path(name.clone()))
                .collect(),
        })
        .collect();
    output_variants.push(Variant {
        name: undocumented,
        docs: vec!["Any status the document does not describe.".to_string()],
        attrs: Vec::new(),
        payload: vec![Type::path("u16"), Type::path("runtime::UndocumentedPayload")],
    });
    let output_name = schemas.claim("Output");
    schemas.push_decl(Decl::Enum(EnumDecl {
        name: output_name,
        vis,
        docs: vec!["Response envelope, one variant per documented status.".to_string()],
        derives: plain_derives(),
        attrs: Vec::new(),
        variants: output_variants,
    }));

    let template = rewrite_path_template(path);
    let mut path_exprs = Vec::new();
    for placeholder in &template.placeholders {
        match groups.find_path_parameter(placeholder) {
            Some(parameter) => path_exprs.push(format!("&input.path.{}", parameter.field_name)),
            None => {
                sink.warning(&format!(
                    "path template '{path}' mentions '{{{placeholder}}}' but no path \
                     parameter declares it"
                ));
                path_exprs.push(format!("&input.path.{}", mangle(placeholder)));
            }
        }
    }

    let accept = if media_types.is_empty() {
        None
    } else {
        Some(accept_header_value(&media_types))
    };

    Ok(TranslatedOperation {
        name,
        method,
        path: path.to_string(),
        template,
        path_exprs,
        groups,
        body,
        responses,
        accept,
        deprecated: operation.deprecated,
        module_decls: schemas.finish(),
    })
}

/// Emit a `Path`/`Query`/`Headers`/`Cookies` struct. All-optional groups
/// derive `Default` so the envelope constructor can omit them.
pub(crate) fn emit_group_struct(
    schemas: &mut SchemaTranslator<'_>,
    vis: Visibility,
    group_name: &str,
    params: &[TranslatedParameter],
) -> String {
    let struct_name = schemas.claim(group_name);
    let fields: Vec<Field> = params.iter().map(|p| p.field(vis)).collect();
    let mut derives = plain_derives();
    if fields.iter().all(|f| f.has_default) {
        derives.push("Default".to_string());
    }
    let constructor = constructor_fn(&fields, vis, None);
    schemas.push_decl(Decl::Struct(StructDecl {
        name: struct_name.clone(),
        vis,
        docs: Vec::new(),
        derives,
        attrs: Vec::new(),
        fields,
    }));
    if let Some(constructor) = constructor {
        schemas.push_decl(Decl::Impl(ImplDecl {
            generics: None,
            trait_name: None,
            target: struct_name.clone(),
            fns: vec![constructor],
        }));
    }
    struct_name
}

/// Emit a body sum plus its accessors: `as_<label>` returns the payload
/// or the "unexpected body" error naming the expected media type.
pub(crate) fn emit_body_enum(
    schemas: &mut SchemaTranslator<'_>,
    vis: Visibility,
    enum_name: &str,
    variants: &[ContentVariant],
) {
    let enum_variants: Vec<Variant> = variants
        .iter()
        .map(|v| Variant {
            name: v.label.clone(),
            docs: vec![format!("`{}`", v.media_type)],
            attrs: Vec::new(),
            payload: vec![v.ty.clone()],
        })
        .collect();
    schemas.push_decl(Decl::Enum(EnumDecl {
        name: enum_name.to_string(),
        vis,
        docs: Vec::new(),
        derives: plain_derives(),
        attrs: Vec::new(),
        variants: enum_variants,
    }));

    let fns: Vec<FnDecl> = variants
        .iter()
        .map(|v| {
            use crate::ast::Emit as _;
            FnDecl {
                name: format!("as_{}", v.label),
                vis,
                docs: Vec::new(),
                is_async: false,
                receiver: Some("&self".to_string()),
                params: Vec::new(),
                return_type: Some(Type::path(format!(
                    "Result<&{}, runtime::UnexpectedBody>",
                    v.ty.emit()
                ))),
                body: Some(vec![Stmt::Raw(format!(
                    "match self {{\n    Self::{}(value) => Ok(value),\n    \
                     _ => Err(runtime::UnexpectedBody::expected(\"{}\")),\n}}",
                    v.label, v.media_type
                ))]),
            }
        })
        .collect();
    schemas.push_decl(Decl::Impl(ImplDecl {
        generics: None,
        trait_name: None,
        target: enum_name.to_string(),
        fns,
    }));
}

/// The headers group and body sum of one response, names derived from
/// `base`.
pub(crate) fn response_payload(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    config: &Config,
    registry: &Registry,
    base: &str,
    response: &Response,
) -> Result<
    (
        Vec<TranslatedParameter>,
        Option<String>,
        Option<BodyShape>,
    ),
    TranslateError,
> {
    let vis = config.access.visibility();

    // Response headers become a typed group with the simple style.
    let mut headers = Vec::new();
    let mut header_ns = Namespace::new();
    for (header_name, header) in &response.headers {
        let header = registry.resolve_header(header)?;
        let field_name = header_ns.claim(header_name);
        let ty = schemas.type_for_optional_schema(sink, header.schema.as_ref(), &field_name)?;
        headers.push(TranslatedParameter {
            field_name,
            original_name: header_name.clone(),
            location: crate::spec::ParameterLocation::Header,
            required: header.required,
            style: crate::spec::ParameterStyle::Simple,
            explode: false,
            ty,
        });
    }
    let headers_struct = if headers.is_empty() {
        None
    } else {
        let name = format!("{base}Headers");
        Some(emit_group_struct(schemas, vis, &name, &headers))
    };

    let body = if response.content.is_empty() {
        None
    } else {
        let enum_name = schemas.claim(&format!("{base}Body"));
        let variants = translate_content(schemas, sink, config, &response.content, &enum_name)?;
        emit_body_enum(schemas, vis, &enum_name, &variants);
        Some(BodyShape {
            required: true,
            enum_name,
            variants,
        })
    };

    Ok((headers, headers_struct, body))
}

/// Build the payload declarations for one documented response.
fn build_response_shape(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    config: &Config,
    registry: &Registry,
    variant_ns: &mut Namespace,
    status_key: &str,
    response: &Response,
) -> Result<ResponseShape, TranslateError> {
    let vis = config.access.visibility();
    let (base_name, carries_status, client_pattern, server_status) = status_shape(status_key);
    let variant_name = variant_ns.claim(&base_name);

    let (headers, headers_struct, body) =
        response_payload(schemas, sink, config, registry, &variant_name, response)?;

    let mut fields = Vec::new();
    if carries_status {
        fields.push(Field {
            name: "status".to_string(),
            vis,
            docs: vec!["The actual HTTP status received.".to_string()],
            attrs: Vec::new(),
            ty: Type::path("u16"),
            has_default: false,
        });
    }
    if let Some(headers_struct) = &headers_struct {
        fields.push(Field {
            name: "headers".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: Type::path(headers_struct.clone()),
            has_default: headers.iter().all(|h| !h.required),
        });
    }
    if let Some(body) = &body {
        fields.push(Field {
            name: "body".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: Type::path(body.enum_name.clone()),
            has_default: false,
        });
    }

    let struct_name = if fields.is_empty() {
        None
    } else {
        let struct_name = schemas.claim(&format!("{variant_name}Response"));
        let constructor = constructor_fn(&fields, vis, None);
        schemas.push_decl(Decl::Struct(StructDecl {
            name: struct_name.clone(),
            vis,
            docs: Vec::new(),
            derives: plain_derives(),
            attrs: Vec::new(),
            fields,
        }));
        if let Some(constructor) = constructor {
            schemas.push_decl(Decl::Impl(ImplDecl {
                generics: None,
                trait_name: None,
                target: struct_name.clone(),
                fns: vec![constructor],
            }));
        }
        Some(struct_name)
    };

    Ok(ResponseShape {
        variant_name,
        struct_name,
        carries_status,
        client_pattern,
        server_status,
        headers,
        headers_struct,
        body,
    })
}

/// One declaration per component response: a struct carrying the typed
/// headers group and the body sum.
pub(crate) fn component_response_decls(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    config: &Config,
    registry: &Registry,
    name: &str,
    response: &Response,
) -> Result<(), TranslateError> {
    let vis = config.access.visibility();
    let base = mangle(name);
    let (headers, headers_struct, body) =
        response_payload(schemas, sink, config, registry, &base, response)?;

    let mut fields = Vec::new();
    if let Some(headers_struct) = headers_struct {
        fields.push(Field {
            name: "headers".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: Type::path(headers_struct),
            has_default: headers.iter().all(|h| !h.required),
        });
    }
    if let Some(body) = body {
        fields.push(Field {
            name: "body".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: Type::path(body.enum_name),
            has_default: false,
        });
    }
    let struct_name = schemas.claim(name);
    let constructor = constructor_fn(&fields, vis, None);
    schemas.push_decl(Decl::Struct(StructDecl {
        name: struct_name.clone(),
        vis,
        docs: Vec::new(),
        derives: plain_derives(),
        attrs: Vec::new(),
        fields,
    }));
    if let Some(constructor) = constructor {
        schemas.push_decl(Decl::Impl(ImplDecl {
            generics: None,
            trait_name: None,
            target: struct_name,
            fns: vec![constructor],
        }));
    }
    Ok(())
}

/// Variant naming and match shapes per response map key.
fn status_shape(key: &str) -> (String, bool, String, String) {
    if key == "default" {
        return (
            "Default".to_string(),
            true,
            "status".to_string(),
            "value.status".to_string(),
        );
    }
    if let Some(range) = key.strip_suffix("XX") {
        if range.len() == 1 && range.chars().all(|c| c.is_ascii_digit()) {
            let low = format!("{range}00");
            let high = format!("{range}99");
            return (
                format!("Status{key}"),
                true,
                format!("status @ {low}..={high}"),
                "value.status".to_string(),
            );
        }
    }
    let name = match key {
        "200" => "Ok",
        "201" => "Created",
        "202" => "Accepted",
        "203" => "NonAuthoritativeInformation",
        "204" => "NoContent",
        "205" => "ResetContent",
        "206" => "PartialContent",
        "300" => "MultipleChoices",
        "301" => "MovedPermanently",
        "302" => "Found",
        "303" => "SeeOther",
        "304" => "NotModified",
        "307" => "TemporaryRedirect",
        "308" => "PermanentRedirect",
        "400" => "BadRequest",
        "401" => "Unauthorized",
        "402" => "PaymentRequired",
        "403" => "Forbidden",
        "404" => "NotFound",
        "405" => "MethodNotAllowed",
        "406" => "NotAcceptable",
        "408" => "RequestTimeout",
        "409" => "Conflict",
        "410" => "Gone",
        "412" => "PreconditionFailed",
        "413" => "ContentTooLarge",
        "415" => "UnsupportedMediaType",
        "422" => "UnprocessableContent",
        "429" => "TooManyRequests",
        "500" => "InternalServerError",
        "501" => "NotImplemented",
        "502" => "BadGateway",
        "503" => "ServiceUnavailable",
        "504" => "GatewayTimeout",
        other => {
            return (
                format!("Status{other}"),
                false,
                other.to_string(),
                other.to_string(),
            )
        }
    };
    (name.to_string(), false, key.to_string(), key.to_string())
}

fn method_variant(method: HttpMethod) -> &'static str {
    match method {
        HttpMethod::Get => "Get",
        HttpMethod::Put => "Put",
        HttpMethod::Post => "Post",
        HttpMethod::Delete => "Delete",
        HttpMethod::Options => "Options",
        HttpMethod::Head => "Head",
        HttpMethod::Patch => "Patch",
        HttpMethod::Trace => "Trace",
    }
}

fn classes_literal(classes: &MultipartClasses) -> String {
    fn list(items: &[String]) -> String {
        let quoted: Vec<String> = items.iter().map(|s| format!("\"{s}\"")).collect();
        format!("&[{}]", quoted.join(", "))
    }
    format!(
        "runtime::MultipartClasses {{ required_exactly_once: {}, \
         required_at_least_once: {}, at_most_once: {}, zero_or_more: {} }}",
        list(&classes.required_exactly_once),
        list(&classes.required_at_least_once),
        list(&classes.at_most_once),
        list(&classes.zero_or_more)
    )
}

/// The statement writing one body variant into a request or response.
fn body_write_arm(qual: &str, enum_name: &str, variant: &ContentVariant, target: &str) -> String {
    let pattern = format!("{qual}::{enum_name}::{}(value)", variant.label);
    let media = &variant.media_type;
    match variant.category {
        ContentCategory::Json => format!(
            "{pattern} => runtime::set_body_as_json(&mut {target}, \"{media}\", &value)?,"
        ),
        ContentCategory::UrlEncodedForm => format!(
            "{pattern} => runtime::set_body_as_url_encoded_form(&mut {target}, \"{media}\", &value)?,"
        ),
        ContentCategory::PlainText | ContentCategory::Binary => format!(
            "{pattern} => runtime::set_body_as_binary(&mut {target}, \"{media}\", value)?,"
        ),
        ContentCategory::MultipartForm => {
            let classes = variant
                .multipart
                .as_ref()
                .map(classes_literal)
                .unwrap_or_default();
            format!(
                "{pattern} => runtime::set_body_as_multipart(&mut {target}, \"{media}\", value, {classes})?,"
            )
        }
    }
}

/// The expression reading one body variant out of a request or response.
fn body_read_expr(variant: &ContentVariant, source: &str) -> String {
    match variant.category {
        ContentCategory::Json => format!("runtime::get_body_as_json({source})?"),
        ContentCategory::UrlEncodedForm => {
            format!("runtime::get_body_as_url_encoded_form({source})?")
        }
        ContentCategory::PlainText | ContentCategory::Binary => {
            format!("runtime::get_body_as_binary({source})?")
        }
        ContentCategory::MultipartForm => {
            let classes = variant
                .multipart
                .as_ref()
                .map(classes_literal)
                .unwrap_or_default();
            format!("runtime::get_body_as_multipart({source}, {classes})?")
        }
    }
}

/// Content negotiation: the declared options in declaration order, as a
/// `best_content_type` match.
fn negotiated_body_read(
    qual: &str,
    body: &BodyShape,
    source: &str,
    error_ty: &str,
    indent: &str,
) -> String {
    let options: Vec<String> = body
        .variants
        .iter()
        .map(|v| format!("\"{}\"", v.media_type))
        .collect();
    let mut arms = Vec::new();
    for variant in &body.variants {
        arms.push(format!(
            "{indent}    \"{}\" => {qual}::{}::{}({}),",
            variant.media_type,
            body.enum_name,
            variant.label,
            body_read_expr(variant, source)
        ));
    }
    arms.push(format!(
        "{indent}    other => return Err(runtime::{error_ty}::unexpected_content_type(other)),"
    ));
    format!(
        "match runtime::best_content_type({source}, &[{}])? {{\n{}\n{indent}}}",
        options.join(", "),
        arms.join("\n")
    )
}

/// The client method for one operation: serialize `Input` into a
/// request, send it, deserialize the response into `Output`.
pub fn client_method(op: &TranslatedOperation, vis: Visibility) -> FnDecl {
    let qual = op.qual();
    let mut lines: Vec<String> = Vec::new();

    // Path rendering with positional placeholders.
    let args: Vec<&str> = op.path_exprs.iter().map(String::as_str).collect();
    lines.push(format!(
        "let path = runtime::render_path(\"{}\", &[{}])?;",
        op.template.rewritten,
        args.join(", ")
    ));
    lines.push(format!(
        "let mut request = runtime::Request::new(runtime::Method::{}, path);",
        method_variant(op.method)
    ));

    for parameter in &op.groups.query {
        lines.push(parameter.client_serializer("input.query"));
    }
    for parameter in &op.groups.headers {
        lines.push(parameter.client_serializer("input.headers"));
    }
    for parameter in &op.groups.cookies {
        lines.push(parameter.client_serializer("input.cookies"));
    }
    if let Some(accept) = &op.accept {
        lines.push(format!(
            "runtime::set_accept_header(&mut request, \"{accept}\")?;"
        ));
    }

    if let Some(body) = &op.body {
        let arms: Vec<String> = body
            .variants
            .iter()
            .map(|v| format!("    {}", body_write_arm(&qual, &body.enum_name, v, "request")))
            .collect();
        if body.required {
            lines.push(format!("match input.body {{\n{}\n}}", arms.join("\n")));
        } else {
            let indented: Vec<String> = arms.iter().map(|arm| format!("    {arm}")).collect();
            lines.push(format!(
                "if let Some(body) = input.body {{\n    match body {{\n{}\n    }}\n}}",
                indented.join("\n")
            ));
        }
    }

    lines.push(
        "let response = runtime::send(&self.transport, &self.server_url, &self.middlewares, \
         request).await?;"
            .to_string(),
    );

    // Client deserializer: one arm per documented status, specific
    // statuses before ranges, the `default` catch-all last.
    let mut arms: Vec<String> = Vec::new();
    let mut ordered: Vec<&ResponseShape> = op.responses.iter().filter(|r| !r.is_range()).collect();
    ordered.extend(op.responses.iter().filter(|r| r.is_range()));
    ordered.sort_by_key(|r| usize::from(r.is_catch_all()));
    for shape in ordered {
        arms.push(client_response_arm(&qual, shape));
    }
    if !op.has_catch_all() {
        arms.push(format!(
            "status => Ok({qual}::Output::Undocumented(status, \
             runtime::undocumented_payload(response))),"
        ));
    }
    lines.push(format!(
        "match runtime::status_of(&response) {{\n{}\n}}",
        arms.join("\n")
    ));

    FnDecl {
        name: op.name.clone(),
        vis,
        docs: vec![op.doc_line()],
        is_async: true,
        receiver: Some("&self".to_string()),
        params: vec![Param {
            name: "input".to_string(),
            ty: Type::path(format!("{qual}::Input")),
        }],
        return_type: Some(Type::result(
            Type::path(format!("{qual}::Output")),
            Type::path("runtime::ClientError"),
        )),
        body: Some(lines.into_iter().map(Stmt::Raw).collect()),
    }
}

fn client_response_arm(qual: &str, shape: &ResponseShape) -> String {
    let pattern = &shape.client_pattern;
    let variant = &shape.variant_name;
    let Some(struct_name) = &shape.struct_name else {
        return format!("{pattern} => Ok({qual}::Output::{variant}),");
    };

    let mut inner = Vec::new();
    let mut field_names = Vec::new();
    if shape.carries_status {
        field_names.push("status".to_string());
    }
    if let Some(headers_struct) = &shape.headers_struct {
        let header_fields: Vec<String> = shape
            .headers
            .iter()
            .map(|h| {
                let getter = if h.required {
                    "get_required_header_field_as_uri"
                } else {
                    "get_optional_header_field_as_uri"
                };
                format!(
                    "    {}: runtime::{getter}(&response, \"{}\", runtime::Style::Simple, false)?,",
                    h.field_name, h.original_name
                )
            })
            .collect();
        inner.push(format!(
            "let headers = {qual}::{headers_struct} {{\n{}\n}};",
            header_fields.join("\n")
        ));
        field_names.push("headers".to_string());
    }
    if let Some(body) = &shape.body {
        inner.push(format!(
            "let body = {};",
            negotiated_body_read(qual, body, "&response", "ClientError", "")
        ));
        field_names.push("body".to_string());
    }
    inner.push(format!(
        "Ok({qual}::Output::{variant}({qual}::{struct_name} {{ {} }}))",
        field_names.join(", ")
    ));

    let indented: Vec<String> = inner
        .iter()
        .flat_map(|block| block.lines())
        .map(|line| format!("    {line}"))
        .collect();
    format!("{pattern} => {{\n{}\n}}", indented.join("\n"))
}

/// The server method for one operation: deserialize the request into
/// `Input`, dispatch to the handler, serialize `Output` into a response.
pub fn server_method(op: &TranslatedOperation) -> FnDecl {
    let qual = op.qual();
    let mut lines: Vec<String> = Vec::new();
    lines.push("let parts = runtime::RequestParts::from(request);".to_string());

    let mut input_fields = Vec::new();
    for (field_name, struct_name, params) in [
        ("path", "Path", &op.groups.path),
        ("query", "Query", &op.groups.query),
        ("headers", "Headers", &op.groups.headers),
        ("cookies", "Cookies", &op.groups.cookies),
    ] {
        if params.is_empty() {
            continue;
        }
        for parameter in params {
            lines.push(parameter.server_deserializer());
        }
        let names: Vec<&str> = params.iter().map(|p| p.field_name.as_str()).collect();
        lines.push(format!(
            "let {field_name} = {qual}::{struct_name} {{ {} }};",
            names.join(", ")
        ));
        input_fields.push(field_name);
    }

    if let Some(body) = &op.body {
        let negotiation = negotiated_body_read(&qual, body, "&parts", "ServerError", "");
        if body.required {
            lines.push(format!("let body = {negotiation};"));
        } else {
            let indented: Vec<String> = negotiation
                .lines()
                .map(|line| format!("    {line}"))
                .collect();
            lines.push(format!(
                "let body = if runtime::has_body(&parts) {{\n    Some({})\n}} else {{\n    None\n}};",
                indented.join("\n").trim_start()
            ));
        }
        input_fields.push("body");
    }

    lines.push(format!(
        "let input = {qual}::Input {{ {} }};",
        input_fields.join(", ")
    ));
    lines.push(format!("let output = self.api.{}(input).await?;", op.name));

    let mut arms: Vec<String> = op
        .responses
        .iter()
        .map(|shape| server_response_arm(&qual, shape))
        .collect();
    arms.push(format!(
        "{qual}::Output::Undocumented(status, payload) => \
         Ok(runtime::response_from_undocumented(status, payload)),"
    ));
    lines.push(format!("match output {{\n{}\n}}", arms.join("\n")));

    FnDecl {
        name: op.name.clone(),
        vis: Visibility::Private,
        docs: vec![op.doc_line()],
        is_async: true,
        receiver: Some("&self".to_string()),
        params: vec![Param {
            name: "request".to_string(),
            ty: Type::path("runtime::Request"),
        }],
        return_type: Some(Type::result(
            Type::path("runtime::Response"),
            Type::path("runtime::ServerError"),
        )),
        body: Some(lines.into_iter().map(Stmt::Raw).collect()),
    }
}

fn server_response_arm(qual: &str, shape: &ResponseShape) -> String {
    let variant = &shape.variant_name;
    if shape.struct_name.is_none() {
        return format!(
            "{qual}::Output::{variant} => Ok(runtime::Response::new({})),",
            shape.server_status
        );
    }

    let mut inner = vec![format!(
        "let mut response = runtime::Response::new({});",
        shape.server_status
    )];
    for header in &shape.headers {
        inner.push(format!(
            "runtime::set_header_field_as_uri(&mut response, \"{}\", \
             runtime::Style::Simple, false, &value.headers.{})?;",
            header.original_name, header.field_name
        ));
    }
    if let Some(body) = &shape.body {
        let arms: Vec<String> = body
            .variants
            .iter()
            .map(|v| format!("    {}", body_write_arm(qual, &body.enum_name, v, "response")))
            .collect();
        inner.push(format!("match value.body {{\n{}\n}}", arms.join("\n")));
    }
    inner.push("Ok(response)".to_string());

    let indented: Vec<String> = inner
        .iter()
        .flat_map(|block| block.lines())
        .map(|line| format!("    {line}"))
        .collect();
    format!(
        "{qual}::Output::{variant}(value) => {{\n{}\n}}",
        indented.join("\n")
    )
}

/// The `Api` trait method signature for one operation.
pub fn api_method(op: &TranslatedOperation) -> FnDecl {
    let qual = op.qual();
    FnDecl {
        name: op.name.clone(),
        vis: Visibility::Private,
        docs: vec![op.doc_line()],
        is_async: true,
        receiver: Some("&self".to_string()),
        params: vec![Param {
            name: "input".to_string(),
            ty: Type::path(format!("{qual}::Input")),
        }],
        return_type: Some(Type::result(
            Type::path(format!("{qual}::Output")),
            Type::path("runtime::HandlerError"),
        )),
        body: None,
    }
}

/// The registration line binding `(method, path template)` to the
/// operation's handler.
pub fn register_line(op: &TranslatedOperation) -> String {
    format!(
        "transport.register(runtime::Method::{}, \"{}\", runtime::handler!(server, {}));",
        method_variant(op.method),
        op.template.rewritten,
        op.name
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::ast::Emit;
    use crate::config::{Config, FeatureFlag, Mode};
    use crate::diagnostics::Collector;
    use crate::spec::Document;

    fn translate(document_yaml: &str, config: &Config) -> (Vec<TranslatedOperation>, Collector) {
        let doc = Document::from_yaml(document_yaml).unwrap();
        let registry = Registry::index(doc);
        let mut sink = Collector::new();
        let operations = translate_operations(&registry, config, &mut sink).unwrap();
        (operations, sink)
    }

    fn module_text(op: &TranslatedOperation) -> String {
        op.module_decls
            .iter()
            .map(Emit::emit)
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    const QUERY_DOC: &str = r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /foo:
    get:
      operationId: getFoo
      parameters:
        - {name: single, in: query, schema: {type: string}}
        - {name: manyExploded, in: query, explode: true,
           schema: {type: array, items: {type: string}}}
        - {name: manyUnexploded, in: query, explode: false,
           schema: {type: array, items: {type: string}}}
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema: {type: string}
"#;

    #[test]
    fn test_query_envelope_and_client_calls() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(QUERY_DOC, &config);
        let op = &operations[0];
        assert_eq!(op.name, "getFoo");

        let module = module_text(op);
        assert!(module.contains("pub struct Query {"));
        assert!(module.contains("pub single: Option<String>,"));
        assert!(module.contains("pub manyExploded: Option<Vec<String>>,"));
        assert!(module.contains("pub manyUnexploded: Option<Vec<String>>,"));
        // All-optional group defaults; Input::new needs no query argument.
        assert!(module.contains("#[derive(Debug, Clone, PartialEq, Default)]\npub struct Query {"));
        assert!(module.contains("pub fn new() -> Self"));

        let client = client_method(op, Visibility::Pub).emit();
        assert!(client.contains(
            "runtime::set_query_item_as_uri(&mut request, \"single\", runtime::Style::Form, \
             true, &input.query.single)?;"
        ));
        assert!(client.contains(
            "runtime::set_query_item_as_uri(&mut request, \"manyExploded\", \
             runtime::Style::Form, true, &input.query.manyExploded)?;"
        ));
        assert!(client.contains(
            "runtime::set_query_item_as_uri(&mut request, \"manyUnexploded\", \
             runtime::Style::Form, false, &input.query.manyUnexploded)?;"
        ));

        let server = server_method(op).emit();
        assert!(server.contains(
            "let single = runtime::get_optional_query_item_as_uri(&parts, \"single\", \
             runtime::Style::Form, true)?;"
        ));
        assert!(server.contains(
            "let manyUnexploded = runtime::get_optional_query_item_as_uri(&parts, \
             \"manyUnexploded\", runtime::Style::Form, false)?;"
        ));
        assert!(server.contains("let query = operations::getFoo::Query { single, manyExploded, manyUnexploded };"));
    }

    #[test]
    fn test_path_template_rewritten_in_occurrence_order() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /foo/{a-b}/bar/{id}:
    get:
      operationId: getBar
      parameters:
        - {name: id, in: path, required: true, schema: {type: string}}
        - {name: a-b, in: path, required: true, schema: {type: string}}
      responses:
        '204': {description: done}
"#,
            &config,
        );
        let op = &operations[0];
        assert_eq!(op.template.rewritten, "/foo/{}/bar/{}");
        // Order follows the template, not the parameter declarations.
        assert_eq!(
            op.path_exprs,
            ["&input.path.a_hyphen_b", "&input.path.id"]
        );
        let client = client_method(op, Visibility::Pub).emit();
        assert!(client.contains(
            "let path = runtime::render_path(\"/foo/{}/bar/{}\", \
             &[&input.path.a_hyphen_b, &input.path.id])?;"
        ));
    }

    #[test]
    fn test_empty_groups_omitted_from_input() {
        let config = Config::new(Mode::Types);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /health:
    get:
      operationId: health
      responses:
        '204': {description: OK}
"#,
            &config,
        );
        let module = module_text(&operations[0]);
        assert!(module.contains("pub struct Input {}"));
        assert!(!module.contains("pub struct Query"));
        assert!(!module.contains("pub struct Path"));
        // 204 has no payload: unit variant.
        assert!(module.contains("NoContent,"));
        assert!(module.contains("Undocumented(u16, runtime::UndocumentedPayload),"));
    }

    #[test]
    fn test_response_body_sum_with_accessors() {
        let config =
            Config::new(Mode::Types).with_flag(FeatureFlag::MultipleContentTypes);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /data:
    get:
      operationId: getData
      responses:
        '200':
          description: OK
          content:
            application/json:
              schema: {type: integer}
            application/json; foo=bar:
              schema: {type: integer}
            text/plain:
              schema: {}
            application/octet-stream:
              schema: {}
"#,
            &config,
        );
        let op = &operations[0];
        let module = module_text(op);
        assert!(module.contains("pub enum OkBody {"));
        assert!(module.contains("json(i64),"));
        assert!(module.contains("application_json_foo_bar(i64),"));
        assert!(module.contains("plainText(runtime::ByteStream),"));
        assert!(module.contains("binary(runtime::ByteStream),"));
        assert!(module.contains("pub fn as_json(&self) -> Result<&i64, runtime::UnexpectedBody>"));
        assert!(module
            .contains("Err(runtime::UnexpectedBody::expected(\"application/json; foo=bar\"))"));
        assert!(module.contains("pub fn as_plainText(&self)"));

        // Negotiation preserves declaration order.
        let client = client_method(op, Visibility::Pub).emit();
        let json_pos = client.find("\"application/json\" =>").unwrap();
        let text_pos = client.find("\"text/plain\" =>").unwrap();
        assert!(json_pos < text_pos);
        assert!(client.contains(
            "runtime::best_content_type(&response, &[\"application/json\", \
             \"application/json; foo=bar\", \"text/plain\", \"application/octet-stream\"])?"
        ));
        assert!(client.contains("runtime::set_accept_header(&mut request, \
             \"application/json, text/plain, application/octet-stream\")?;"));
    }

    #[test]
    fn test_request_body_optional_vs_required() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /required:
    post:
      operationId: createRequired
      requestBody:
        required: true
        content:
          application/json:
            schema: {type: object, properties: {a: {type: string}}}
      responses:
        '201': {description: done}
  /optional:
    post:
      operationId: createOptional
      requestBody:
        content:
          application/json:
            schema: {type: string}
      responses:
        '201': {description: done}
"#,
            &config,
        );
        let required = &operations[0];
        assert_eq!(required.name, "createRequired");
        let module = module_text(required);
        assert!(module.contains("pub body: Body,"));
        let client = client_method(required, Visibility::Pub).emit();
        assert!(client.contains("match input.body {"));
        assert!(client.contains(
            "operations::createRequired::Body::json(value) => \
             runtime::set_body_as_json(&mut request, \"application/json\", &value)?,"
        ));

        let optional = &operations[1];
        assert_eq!(optional.name, "createOptional");
        let module = module_text(optional);
        assert!(module.contains("pub body: Option<Body>,"));
        let client = client_method(optional, Visibility::Pub).emit();
        assert!(client.contains("if let Some(body) = input.body {"));

        let server = server_method(optional).emit();
        assert!(server.contains("let body = if runtime::has_body(&parts) {"));
    }

    #[test]
    fn test_default_response_is_catch_all() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /thing:
    get:
      operationId: getThing
      responses:
        default:
          description: anything
          content:
            application/json:
              schema: {type: string}
        '200':
          description: OK
          content:
            application/json:
              schema: {type: string}
"#,
            &config,
        );
        let op = &operations[0];
        assert!(op.has_catch_all());
        let module = module_text(op);
        // Document order is preserved in the enum.
        let default_pos = module.find("Default(DefaultResponse)").unwrap();
        let ok_pos = module.find("Ok(OkResponse)").unwrap();
        assert!(default_pos < ok_pos);
        assert!(module.contains("pub status: u16,"));

        let client = client_method(op, Visibility::Pub).emit();
        // The catch-all arm is emitted last despite document order.
        let specific = client.find("200 => {").unwrap();
        let catch_all = client.find("status => {").unwrap();
        assert!(specific < catch_all);
        // No undocumented arm when default catches everything.
        assert!(!client.contains("Output::Undocumented(status"));

        let server = server_method(op).emit();
        assert!(server.contains("runtime::Response::new(value.status)"));
    }

    #[test]
    fn test_response_headers_typed() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /limited:
    get:
      operationId: getLimited
      responses:
        '200':
          description: OK
          headers:
            x-rate-limit:
              required: true
              schema: {type: integer}
            x-request-id:
              schema: {type: string}
          content:
            application/json:
              schema: {type: string}
"#,
            &config,
        );
        let op = &operations[0];
        let module = module_text(op);
        assert!(module.contains("pub struct OkHeaders {"));
        assert!(module.contains("pub x_hyphen_rate_hyphen_limit: i64,"));
        assert!(module.contains("pub x_hyphen_request_hyphen_id: Option<String>,"));

        let client = client_method(op, Visibility::Pub).emit();
        assert!(client.contains(
            "x_hyphen_rate_hyphen_limit: runtime::get_required_header_field_as_uri(&response, \
             \"x-rate-limit\", runtime::Style::Simple, false)?,"
        ));

        let server = server_method(op).emit();
        assert!(server.contains(
            "runtime::set_header_field_as_uri(&mut response, \"x-rate-limit\", \
             runtime::Style::Simple, false, &value.headers.x_hyphen_rate_hyphen_limit)?;"
        ));
    }

    #[test]
    fn test_duplicate_operation_id_is_fatal() {
        let doc = Document::from_yaml(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /a:
    get:
      operationId: same
      responses: {'204': {description: ok}}
  /b:
    get:
      operationId: same
      responses: {'204': {description: ok}}
"#,
        )
        .unwrap();
        let registry = Registry::index(doc);
        let config = Config::new(Mode::Types);
        let mut sink = Collector::new();
        let err = translate_operations(&registry, &config, &mut sink).unwrap_err();
        assert!(matches!(err, TranslateError::DuplicateOperationId { .. }));
    }

    #[test]
    fn test_path_item_ref_skipped_with_warning() {
        let config = Config::new(Mode::Types);
        let (operations, sink) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /aliased:
    $ref: '#/components/pathItems/Aliased'
  /real:
    get:
      operationId: real
      responses: {'204': {description: ok}}
"#,
            &config,
        );
        assert_eq!(operations.len(), 1);
        assert_eq!(operations[0].name, "real");
        assert_eq!(sink.warnings().count(), 1);
    }

    #[test]
    fn test_synthesized_operation_name() {
        let config = Config::new(Mode::Types);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /pets/{petId}:
    get:
      responses: {'204': {description: ok}}
"#,
            &config,
        );
        assert_eq!(operations[0].name, "get_pets_petId");
    }

    #[test]
    fn test_register_line() {
        let config = Config::new(Mode::Server);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /pets/{petId}:
    delete:
      operationId: deletePet
      parameters:
        - {name: petId, in: path, required: true, schema: {type: string}}
      responses: {'204': {description: ok}}
"#,
            &config,
        );
        assert_eq!(
            register_line(&operations[0]),
            "transport.register(runtime::Method::Delete, \"/pets/{}\", \
             runtime::handler!(server, deletePet));"
        );
    }

    #[test]
    fn test_multipart_request_classes_in_client() {
        let config = Config::new(Mode::Client);
        let (operations, _) = translate(
            r#"
openapi: '3.1.0'
info: {title: T, version: '1'}
paths:
  /upload:
    post:
      operationId: upload
      requestBody:
        required: true
        content:
          multipart/form-data:
            schema:
              type: object
              properties:
                log: {type: string}
              additionalProperties: false
            encoding:
              log:
                headers:
                  x-log-type:
                    schema: {type: string, enum: [structured, unstructured]}
      responses: {'204': {description: ok}}
"#,
            &config,
        );
        let op = &operations[0];
        let module = module_text(op);
        assert!(module.contains("pub struct logHeaders {"));
        assert!(module.contains("pub x_hyphen_log_hyphen_type: Option<x_hyphen_log_hyphen_typePayload>,"));
        assert!(module.contains("pub body: runtime::ByteStream,"));

        let client = client_method(op, Visibility::Pub).emit();
        assert!(client.contains(
            "runtime::set_body_as_multipart(&mut request, \"multipart/form-data\", value, \
             runtime::MultipartClasses { required_exactly_once: &[], \
             required_at_least_once: &[], at_most_once: &[\"log\"], zero_or_more: &[] })?,"
        ));
    }

    #[test]
    fn test_api_method_signature() {
        let config = Config::new(Mode::Types);
        let (operations, _) = translate(QUERY_DOC, &config);
        let api = api_method(&operations[0]).emit();
        assert_eq!(
            api,
            "/// `GET /foo`\nasync fn getFoo(&self, input: operations::getFoo::Input) -> \
             Result<operations::getFoo::Output, runtime::HandlerError>;"
        );
    }
}
