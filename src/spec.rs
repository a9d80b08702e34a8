//! OpenAPI document structs for serde deserialization.
//!
//! This module defines the read-only view of an OpenAPI 3.0/3.1 document
//! that the translators consume. Maps are `IndexMap` throughout: the
//! declaration order of properties, content entries, and `oneOf` children
//! is semantic (decode attempt order, content negotiation) and must
//! survive parsing.

use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::TranslateError;

/// Root OpenAPI document.
#[derive(Debug, Deserialize)]
pub struct Document {
    /// Version tag, e.g. "3.0.3" or "3.1.0".
    pub openapi: String,
    pub info: Info,
    #[serde(default)]
    pub servers: Vec<Server>,
    #[serde(default)]
    pub paths: IndexMap<String, PathItem>,
    pub components: Option<Components>,
}

impl Document {
    /// Parse a document from a YAML string (also accepts JSON, which is a
    /// YAML subset).
    pub fn from_yaml(input: &str) -> Result<Self, TranslateError> {
        serde_yaml::from_str(input).map_err(TranslateError::from)
    }

    /// Parse a document from a JSON string.
    pub fn from_json(input: &str) -> Result<Self, TranslateError> {
        serde_json::from_str(input).map_err(TranslateError::from)
    }
}

/// Info block. Carried for fidelity; the generator only reads the title
/// for the file preamble.
#[derive(Debug, Clone, Deserialize)]
pub struct Info {
    pub title: String,
    pub version: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Server entry. The first server URL seeds the generated client's
/// default base URL.
#[derive(Debug, Clone, Deserialize)]
pub struct Server {
    pub url: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Components section: five reusable namespaces keyed by local name.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Components {
    #[serde(default)]
    pub schemas: IndexMap<String, Schema>,
    #[serde(default)]
    pub parameters: IndexMap<String, RefOr<Parameter>>,
    #[serde(default)]
    pub headers: IndexMap<String, RefOr<Header>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
    #[serde(default)]
    pub request_bodies: IndexMap<String, RefOr<RequestBody>>,
}

/// Either a `$ref` or an inline item. Every component position admits a
/// reference; schemas carry their `$ref` inline instead (see [`Schema`]).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum RefOr<T> {
    Ref {
        #[serde(rename = "$ref")]
        reference: String,
    },
    Item(T),
}

/// A path item: one slot per HTTP method, plus path-level parameters
/// shared by all operations.
#[derive(Debug, Deserialize)]
pub struct PathItem {
    /// Path-item `$ref`. Unsupported: the generator warns and skips the
    /// whole path.
    #[serde(rename = "$ref")]
    pub reference: Option<String>,
    pub get: Option<Operation>,
    pub put: Option<Operation>,
    pub post: Option<Operation>,
    pub delete: Option<Operation>,
    pub options: Option<Operation>,
    pub head: Option<Operation>,
    pub patch: Option<Operation>,
    pub trace: Option<Operation>,
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
}

impl PathItem {
    /// Iterate the populated method slots in the fixed OpenAPI order.
    pub fn operations(&self) -> impl Iterator<Item = (HttpMethod, &Operation)> {
        [
            (HttpMethod::Get, self.get.as_ref()),
            (HttpMethod::Put, self.put.as_ref()),
            (HttpMethod::Post, self.post.as_ref()),
            (HttpMethod::Delete, self.delete.as_ref()),
            (HttpMethod::Options, self.options.as_ref()),
            (HttpMethod::Head, self.head.as_ref()),
            (HttpMethod::Patch, self.patch.as_ref()),
            (HttpMethod::Trace, self.trace.as_ref()),
        ]
        .into_iter()
        .filter_map(|(method, op)| op.map(|op| (method, op)))
    }
}

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Put,
    Post,
    Delete,
    Options,
    Head,
    Patch,
    Trace,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Head => "HEAD",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Lowercase form used when synthesizing operation names.
    pub fn as_lower_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Put => "put",
            HttpMethod::Post => "post",
            HttpMethod::Delete => "delete",
            HttpMethod::Options => "options",
            HttpMethod::Head => "head",
            HttpMethod::Patch => "patch",
            HttpMethod::Trace => "trace",
        }
    }
}

/// An API operation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Operation {
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub deprecated: bool,
    #[serde(default)]
    pub parameters: Vec<RefOr<Parameter>>,
    pub request_body: Option<RefOr<RequestBody>>,
    #[serde(default)]
    pub responses: IndexMap<String, RefOr<Response>>,
}

/// A path, query, header, or cookie parameter.
#[derive(Debug, Clone, Deserialize)]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    pub schema: Option<Schema>,
    pub style: Option<ParameterStyle>,
    pub explode: Option<bool>,
}

impl Parameter {
    /// The style in effect, applying the OpenAPI defaults: `form` for
    /// query and cookie, `simple` for path and header.
    pub fn resolved_style(&self) -> ParameterStyle {
        self.style
            .unwrap_or_else(|| ParameterStyle::default_for(self.location))
    }

    /// The explode flag in effect: defaults to `true` for `form`, `false`
    /// for every other style.
    pub fn resolved_explode(&self) -> bool {
        self.explode
            .unwrap_or(self.resolved_style() == ParameterStyle::Form)
    }
}

/// Parameter location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
    Cookie,
}

impl ParameterLocation {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

/// Parameter serialization style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterStyle {
    Matrix,
    Label,
    Form,
    Simple,
    SpaceDelimited,
    PipeDelimited,
    DeepObject,
}

impl ParameterStyle {
    pub fn default_for(location: ParameterLocation) -> Self {
        match location {
            ParameterLocation::Query | ParameterLocation::Cookie => ParameterStyle::Form,
            ParameterLocation::Path | ParameterLocation::Header => ParameterStyle::Simple,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterStyle::Matrix => "matrix",
            ParameterStyle::Label => "label",
            ParameterStyle::Form => "form",
            ParameterStyle::Simple => "simple",
            ParameterStyle::SpaceDelimited => "spaceDelimited",
            ParameterStyle::PipeDelimited => "pipeDelimited",
            ParameterStyle::DeepObject => "deepObject",
        }
    }
}

/// A request body definition.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// Media type content (e.g. under `application/json`).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MediaType {
    pub schema: Option<Schema>,
    /// Per-property encoding for multipart bodies.
    #[serde(default)]
    pub encoding: IndexMap<String, Encoding>,
}

/// Multipart part encoding: a part-level content type override and
/// per-part headers.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Encoding {
    pub content_type: Option<String>,
    #[serde(default)]
    pub headers: IndexMap<String, RefOr<Header>>,
}

/// A response definition.
#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    pub description: Option<String>,
    #[serde(default)]
    pub headers: IndexMap<String, RefOr<Header>>,
    #[serde(default)]
    pub content: IndexMap<String, MediaType>,
}

/// A response (or multipart part) header: a parameter without a name or
/// location.
#[derive(Debug, Clone, Deserialize)]
pub struct Header {
    pub description: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub deprecated: bool,
    pub schema: Option<Schema>,
}

/// JSON Schema node as used in OpenAPI. Recursive; `$ref` is carried
/// inline rather than through [`RefOr`] so that reference cycles stay
/// representable.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    /// The declared type: a single name, or a list carrying `"null"` for
    /// 3.1 nullability.
    #[serde(rename = "type")]
    pub schema_type: Option<SchemaType>,

    /// Reference to a component schema.
    #[serde(rename = "$ref")]
    pub ref_path: Option<String>,

    /// Properties for object types.
    pub properties: Option<IndexMap<String, Schema>>,

    /// Required property names for object types.
    pub required: Option<Vec<String>>,

    /// Additional properties: absent, `false`, `true`, or a value schema.
    pub additional_properties: Option<AdditionalProperties>,

    /// Item schema for array types.
    pub items: Option<Box<Schema>>,

    /// Enum values.
    #[serde(rename = "enum")]
    pub enum_values: Option<Vec<EnumValue>>,

    #[serde(rename = "allOf")]
    pub all_of: Option<Vec<Schema>>,
    #[serde(rename = "anyOf")]
    pub any_of: Option<Vec<Schema>>,
    #[serde(rename = "oneOf")]
    pub one_of: Option<Vec<Schema>>,

    /// Discriminator for polymorphic oneOf schemas.
    pub discriminator: Option<Discriminator>,

    /// Format hint (`int64`, `date-time`, `byte`, `binary`, ...).
    pub format: Option<String>,

    /// 3.1 content encoding (`base64`).
    pub content_encoding: Option<String>,

    /// OpenAPI 3.0 nullable flag (3.1 uses type lists instead).
    pub nullable: Option<bool>,

    #[serde(default)]
    pub deprecated: bool,

    /// Default value. Carried, not translated.
    pub default: Option<serde_json::Value>,

    pub title: Option<String>,
    pub description: Option<String>,
}

impl Schema {
    /// Whether this node is nullable: `"null"` in the type list (3.1), the
    /// legacy `nullable: true` flag (3.0), or a bare `null` child inside
    /// `anyOf` (the form FastAPI emits).
    pub fn is_nullable(&self) -> bool {
        if self.nullable == Some(true) {
            return true;
        }
        if let Some(SchemaType::Multiple(types)) = &self.schema_type {
            if types.iter().any(|t| t == "null") {
                return true;
            }
        }
        if let Some(any_of) = &self.any_of {
            return any_of.iter().any(Schema::is_null_type);
        }
        false
    }

    /// Whether this node is exactly the `null` type.
    pub fn is_null_type(&self) -> bool {
        matches!(&self.schema_type, Some(SchemaType::Single(t)) if t == "null")
    }

    /// Whether this is the empty fragment `{}`: no type, no reference, no
    /// structure at all.
    pub fn is_empty_fragment(&self) -> bool {
        self.schema_type.is_none()
            && self.ref_path.is_none()
            && self.properties.is_none()
            && self.additional_properties.is_none()
            && self.items.is_none()
            && self.enum_values.is_none()
            && self.all_of.is_none()
            && self.any_of.is_none()
            && self.one_of.is_none()
    }

    /// The single non-null type name, if one exists. A 3.1 list like
    /// `[string, "null"]` resolves to `string`.
    pub fn single_type(&self) -> Option<&str> {
        match &self.schema_type {
            Some(SchemaType::Single(t)) => Some(t.as_str()),
            Some(SchemaType::Multiple(types)) => {
                let mut non_null = types.iter().filter(|t| *t != "null");
                match (non_null.next(), non_null.next()) {
                    (Some(t), None) => Some(t.as_str()),
                    _ => None,
                }
            }
            None => None,
        }
    }

    /// Whether the schema is an array type.
    pub fn is_array(&self) -> bool {
        self.single_type() == Some("array")
    }
}

/// Schema type: single name or a list (the 3.1 nullable form).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum SchemaType {
    Single(String),
    Multiple(Vec<String>),
}

/// `additionalProperties`: a boolean or a value schema.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Bool(bool),
    Schema(Box<Schema>),
}

/// Enum value: string, integer, float, boolean, or null.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum EnumValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Null,
}

/// Discriminator for polymorphic oneOf schemas. The mapping order is the
/// variant declaration order of the emitted sum.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Discriminator {
    /// The property whose value selects the variant.
    pub property_name: String,
    /// Ordered mapping from discriminator value to schema `$ref`.
    pub mapping: Option<IndexMap<String, String>>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_document() {
        let doc = Document::from_yaml(
            r#"
openapi: "3.1.0"
info:
  title: Test
  version: "1.0"
paths: {}
"#,
        )
        .unwrap();
        assert_eq!(doc.openapi, "3.1.0");
        assert_eq!(doc.info.title, "Test");
        assert!(doc.paths.is_empty());
        assert!(doc.components.is_none());
    }

    #[test]
    fn test_parse_json_document() {
        let doc = Document::from_json(
            r#"{"openapi": "3.0.3", "info": {"title": "T", "version": "1"}, "paths": {}}"#,
        )
        .unwrap();
        assert_eq!(doc.openapi, "3.0.3");
    }

    #[test]
    fn test_nullable_type_list() {
        let schema: Schema = serde_yaml::from_str("type: [string, 'null']").unwrap();
        assert!(schema.is_nullable());
        assert_eq!(schema.single_type(), Some("string"));
    }

    #[test]
    fn test_nullable_legacy_flag() {
        let schema: Schema = serde_yaml::from_str("{type: string, nullable: true}").unwrap();
        assert!(schema.is_nullable());
        assert_eq!(schema.single_type(), Some("string"));
    }

    #[test]
    fn test_nullable_any_of_null_child() {
        let schema: Schema =
            serde_yaml::from_str("anyOf: [{type: string}, {type: 'null'}]").unwrap();
        assert!(schema.is_nullable());
    }

    #[test]
    fn test_not_nullable() {
        let schema: Schema = serde_yaml::from_str("type: string").unwrap();
        assert!(!schema.is_nullable());
    }

    #[test]
    fn test_empty_fragment() {
        let schema: Schema = serde_yaml::from_str("{}").unwrap();
        assert!(schema.is_empty_fragment());
        let schema: Schema = serde_yaml::from_str("type: object").unwrap();
        assert!(!schema.is_empty_fragment());
    }

    #[test]
    fn test_parameter_style_defaults() {
        let p: Parameter =
            serde_yaml::from_str("{name: q, in: query, schema: {type: string}}").unwrap();
        assert_eq!(p.resolved_style(), ParameterStyle::Form);
        assert!(p.resolved_explode());

        let p: Parameter =
            serde_yaml::from_str("{name: id, in: path, required: true, schema: {type: string}}")
                .unwrap();
        assert_eq!(p.resolved_style(), ParameterStyle::Simple);
        assert!(!p.resolved_explode());

        let p: Parameter =
            serde_yaml::from_str("{name: h, in: header, schema: {type: string}}").unwrap();
        assert_eq!(p.resolved_style(), ParameterStyle::Simple);
        assert!(!p.resolved_explode());

        let p: Parameter =
            serde_yaml::from_str("{name: c, in: cookie, schema: {type: string}}").unwrap();
        assert_eq!(p.resolved_style(), ParameterStyle::Form);
        assert!(p.resolved_explode());
    }

    #[test]
    fn test_parameter_explode_override() {
        let p: Parameter = serde_yaml::from_str(
            "{name: tags, in: query, explode: false, schema: {type: array, items: {type: string}}}",
        )
        .unwrap();
        assert_eq!(p.resolved_style(), ParameterStyle::Form);
        assert!(!p.resolved_explode());
    }

    #[test]
    fn test_ref_or_parses_reference() {
        let r: RefOr<Parameter> =
            serde_yaml::from_str("$ref: '#/components/parameters/Limit'").unwrap();
        match r {
            RefOr::Ref { reference } => assert_eq!(reference, "#/components/parameters/Limit"),
            RefOr::Item(_) => panic!("expected a reference"),
        }
    }

    #[test]
    fn test_content_map_preserves_order() {
        let body: RequestBody = serde_yaml::from_str(
            r#"
content:
  application/json:
    schema: {type: integer}
  text/plain:
    schema: {}
  application/octet-stream:
    schema: {}
"#,
        )
        .unwrap();
        let keys: Vec<_> = body.content.keys().collect();
        assert_eq!(
            keys,
            ["application/json", "text/plain", "application/octet-stream"]
        );
    }

    #[test]
    fn test_discriminator_mapping_preserves_order() {
        let schema: Schema = serde_yaml::from_str(
            r#"
oneOf:
  - $ref: '#/components/schemas/A'
  - $ref: '#/components/schemas/B'
discriminator:
  propertyName: which
  mapping:
    b: '#/components/schemas/B'
    a: '#/components/schemas/A'
"#,
        )
        .unwrap();
        let disc = schema.discriminator.unwrap();
        let keys: Vec<_> = disc.mapping.unwrap().keys().cloned().collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn test_additional_properties_forms() {
        let s: Schema = serde_yaml::from_str("{type: object, additionalProperties: false}")
            .unwrap();
        assert!(matches!(
            s.additional_properties,
            Some(AdditionalProperties::Bool(false))
        ));

        let s: Schema =
            serde_yaml::from_str("{type: object, additionalProperties: {type: integer}}").unwrap();
        assert!(matches!(
            s.additional_properties,
            Some(AdditionalProperties::Schema(_))
        ));
    }

    #[test]
    fn test_path_item_operations_order() {
        let item: PathItem = serde_yaml::from_str(
            r#"
post:
  responses: {}
get:
  responses: {}
"#,
        )
        .unwrap();
        let methods: Vec<_> = item.operations().map(|(m, _)| m).collect();
        assert_eq!(methods, [HttpMethod::Get, HttpMethod::Post]);
    }
}
