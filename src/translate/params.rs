//! Parameter translation: path/query/header/cookie parameters into typed
//! fields and the serializer/deserializer invocations that carry
//! `{style, explode, name}` onto the wire.

use crate::ast::{Field, Type, Visibility};
use crate::diagnostics::DiagnosticSink;
use crate::error::TranslateError;
use crate::mangle::{mangle, Namespace};
use crate::registry::Registry;
use crate::spec::{Parameter, ParameterLocation, ParameterStyle, RefOr};

use super::schema::SchemaTranslator;

/// A parameter resolved against the OpenAPI defaults, ready to become a
/// field plus wire calls.
#[derive(Debug, Clone)]
pub struct TranslatedParameter {
    pub field_name: String,
    pub original_name: String,
    pub location: ParameterLocation,
    pub required: bool,
    pub style: ParameterStyle,
    pub explode: bool,
    /// Base type; `Option` is applied per `required`.
    pub ty: Type,
}

impl TranslatedParameter {
    /// The envelope field for this parameter. Optional parameters are
    /// `Option<T>` defaulting to `None`. Envelope groups go through the
    /// runtime URI coders, not serde, so the field carries no attributes;
    /// the original name lives in the serializer calls.
    pub fn field(&self, vis: Visibility) -> Field {
        Field {
            name: self.field_name.clone(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: if self.required {
                self.ty.clone()
            } else {
                Type::option(self.ty.clone())
            },
            has_default: !self.required,
        }
    }

    fn style_expr(&self) -> String {
        let variant = match self.style {
            ParameterStyle::Matrix => "Matrix",
            ParameterStyle::Label => "Label",
            ParameterStyle::Form => "Form",
            ParameterStyle::Simple => "Simple",
            ParameterStyle::SpaceDelimited => "SpaceDelimited",
            ParameterStyle::PipeDelimited => "PipeDelimited",
            ParameterStyle::DeepObject => "DeepObject",
        };
        format!("runtime::Style::{variant}")
    }

    /// Client-side serializer statement writing this parameter into the
    /// outbound request.
    pub fn client_serializer(&self, group_expr: &str) -> String {
        let setter = match self.location {
            ParameterLocation::Query => "set_query_item_as_uri",
            ParameterLocation::Header => "set_header_field_as_uri",
            ParameterLocation::Cookie => "set_cookie_as_uri",
            // Path parameters are rendered through the template.
            ParameterLocation::Path => "set_path_parameter_as_uri",
        };
        format!(
            "runtime::{setter}(&mut request, \"{}\", {}, {}, &{group_expr}.{})?;",
            self.original_name,
            self.style_expr(),
            self.explode,
            self.field_name
        )
    }

    /// Server-side deserializer statement extracting this parameter from
    /// the inbound request.
    pub fn server_deserializer(&self) -> String {
        let getter = match (self.location, self.required) {
            (ParameterLocation::Path, _) => "get_path_parameter_as_uri",
            (ParameterLocation::Query, true) => "get_required_query_item_as_uri",
            (ParameterLocation::Query, false) => "get_optional_query_item_as_uri",
            (ParameterLocation::Header, true) => "get_required_header_field_as_uri",
            (ParameterLocation::Header, false) => "get_optional_header_field_as_uri",
            (ParameterLocation::Cookie, true) => "get_required_cookie_as_uri",
            (ParameterLocation::Cookie, false) => "get_optional_cookie_as_uri",
        };
        format!(
            "let {} = runtime::{getter}(&parts, \"{}\", {}, {})?;",
            self.field_name,
            self.original_name,
            self.style_expr(),
            self.explode
        )
    }
}

/// Parameters grouped by location, declaration order preserved.
#[derive(Debug, Clone, Default)]
pub struct ParameterGroups {
    pub path: Vec<TranslatedParameter>,
    pub query: Vec<TranslatedParameter>,
    pub headers: Vec<TranslatedParameter>,
    pub cookies: Vec<TranslatedParameter>,
}

impl ParameterGroups {
    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
            && self.query.is_empty()
            && self.headers.is_empty()
            && self.cookies.is_empty()
    }

    /// Find the path parameter matching a template placeholder: exact
    /// name first, then equality after mangling.
    pub fn find_path_parameter(&self, placeholder: &str) -> Option<&TranslatedParameter> {
        self.path
            .iter()
            .find(|p| p.original_name == placeholder)
            .or_else(|| {
                self.path
                    .iter()
                    .find(|p| p.field_name == mangle(placeholder))
            })
    }
}

/// Merge path-level and operation-level parameters (operation wins per
/// `(name, location)`), resolve references and defaults, and group by
/// location.
pub fn translate_parameters(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    registry: &Registry,
    path_level: &[RefOr<Parameter>],
    operation_level: &[RefOr<Parameter>],
    hint: &str,
) -> Result<ParameterGroups, TranslateError> {
    let mut merged: Vec<(&str, &Parameter)> = Vec::new();
    for (level, list) in [("path-level", path_level), ("operation", operation_level)] {
        for item in list {
            let parameter = registry.resolve_parameter(item)?;
            if let Some((existing_level, _)) = merged.iter().find(|(_, existing)| {
                existing.name == parameter.name && existing.location == parameter.location
            }) {
                // Same-level duplicates are a document defect;
                // operation-level parameters shadow path-level ones
                // silently.
                if *existing_level == level {
                    sink.warning(&format!(
                        "duplicate {level} parameter '{}' in '{hint}'; the last one wins",
                        parameter.name
                    ));
                }
                merged.retain(|(_, existing)| {
                    !(existing.name == parameter.name
                        && existing.location == parameter.location)
                });
            }
            merged.push((level, parameter));
        }
    }
    let merged: Vec<&Parameter> = merged.into_iter().map(|(_, parameter)| parameter).collect();

    let mut groups = ParameterGroups::default();
    let mut namespaces = [
        Namespace::new(),
        Namespace::new(),
        Namespace::new(),
        Namespace::new(),
    ];
    for parameter in merged {
        let style = effective_style(sink, parameter, hint);
        let explode = parameter
            .explode
            .unwrap_or(style == ParameterStyle::Form);
        let namespace = &mut namespaces[group_index(parameter.location)];
        let field_name = namespace.claim(&parameter.name);
        let ty = schemas.type_for_optional_schema(
            sink,
            parameter.schema.as_ref(),
            &field_name,
        )?;
        let translated = TranslatedParameter {
            field_name,
            original_name: parameter.name.clone(),
            location: parameter.location,
            // Path parameters are always required on the wire.
            required: parameter.required || parameter.location == ParameterLocation::Path,
            style,
            explode,
            ty,
        };
        match parameter.location {
            ParameterLocation::Path => groups.path.push(translated),
            ParameterLocation::Query => groups.query.push(translated),
            ParameterLocation::Header => groups.headers.push(translated),
            ParameterLocation::Cookie => groups.cookies.push(translated),
        }
    }
    Ok(groups)
}

fn group_index(location: ParameterLocation) -> usize {
    match location {
        ParameterLocation::Path => 0,
        ParameterLocation::Query => 1,
        ParameterLocation::Header => 2,
        ParameterLocation::Cookie => 3,
    }
}

/// The style in effect, replacing styles that do not apply to the
/// parameter's location with the location default.
fn effective_style(
    sink: &mut dyn DiagnosticSink,
    parameter: &Parameter,
    hint: &str,
) -> ParameterStyle {
    let style = parameter.resolved_style();
    let allowed = match parameter.location {
        ParameterLocation::Path => matches!(
            style,
            ParameterStyle::Simple | ParameterStyle::Label | ParameterStyle::Matrix
        ),
        ParameterLocation::Query => matches!(
            style,
            ParameterStyle::Form
                | ParameterStyle::SpaceDelimited
                | ParameterStyle::PipeDelimited
                | ParameterStyle::DeepObject
        ),
        ParameterLocation::Header => style == ParameterStyle::Simple,
        ParameterLocation::Cookie => style == ParameterStyle::Form,
    };
    if allowed {
        style
    } else {
        let fallback = ParameterStyle::default_for(parameter.location);
        sink.warning(&format!(
            "style '{}' does not apply to {} parameter '{}' in '{hint}'; \
             using '{}'",
            style.as_str(),
            parameter.location.as_str(),
            parameter.name,
            fallback.as_str()
        ));
        fallback
    }
}

/// A path template rewritten to positional placeholders, with the
/// original placeholder names in occurrence order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    pub rewritten: String,
    pub placeholders: Vec<String>,
}

/// Rewrite `/foo/{p.a-b}` to `/foo/{}`, collecting placeholder names in
/// the order the template mentions them (not parameter declaration
/// order).
pub fn rewrite_path_template(path: &str) -> PathTemplate {
    let mut rewritten = String::with_capacity(path.len());
    let mut placeholders = Vec::new();
    let mut current = String::new();
    let mut in_placeholder = false;
    for c in path.chars() {
        match c {
            '{' => {
                in_placeholder = true;
                current.clear();
            }
            '}' if in_placeholder => {
                in_placeholder = false;
                placeholders.push(current.clone());
                rewritten.push_str("{}");
            }
            _ if in_placeholder => current.push(c),
            _ => rewritten.push(c),
        }
    }
    PathTemplate {
        rewritten,
        placeholders,
    }
}
