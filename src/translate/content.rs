//! Content translation: media types to body variants.
//!
//! Classifies each content entry into the closed label set (`json`,
//! `urlEncodedForm`, `multipartForm`, `plainText`, `binary`), preserving
//! declaration order for content negotiation, and expands
//! `multipart/form-data` schemas into per-part declarations with
//! multiplicity classes.

use indexmap::IndexMap;

use crate::ast::{Attr, Decl, EnumDecl, Field, StructDecl, Type, Variant, Visibility};
use crate::config::{Config, FeatureFlag};
use crate::diagnostics::DiagnosticSink;
use crate::error::TranslateError;
use crate::mangle::Namespace;
use crate::spec::{AdditionalProperties, Encoding, MediaType, RefOr, Schema};

use super::schema::SchemaTranslator;
use super::{data_derives, plain_derives};

/// Canonical content categories, in negotiation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCategory {
    Json,
    UrlEncodedForm,
    MultipartForm,
    PlainText,
    Binary,
}

impl ContentCategory {
    /// Classify a media type by its type/subtype essence; parameters do
    /// not change the category.
    pub fn classify(media_type: &str) -> Self {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_ascii_lowercase();
        if essence == "application/json" || essence.ends_with("+json") {
            ContentCategory::Json
        } else if essence == "application/x-www-form-urlencoded" {
            ContentCategory::UrlEncodedForm
        } else if essence == "multipart/form-data" {
            ContentCategory::MultipartForm
        } else if essence.starts_with("text/") {
            ContentCategory::PlainText
        } else {
            ContentCategory::Binary
        }
    }

    fn base_label(self) -> &'static str {
        match self {
            ContentCategory::Json => "json",
            ContentCategory::UrlEncodedForm => "urlEncodedForm",
            ContentCategory::MultipartForm => "multipartForm",
            ContentCategory::PlainText => "plainText",
            ContentCategory::Binary => "binary",
        }
    }
}

/// One entry of a content map, translated.
#[derive(Debug, Clone)]
pub struct ContentVariant {
    /// Variant name in the body sum.
    pub label: String,
    /// The media type exactly as declared.
    pub media_type: String,
    pub category: ContentCategory,
    /// Payload type of the variant.
    pub ty: Type,
    /// Part multiplicity classes, multipart only.
    pub multipart: Option<MultipartClasses>,
}

/// Part names grouped by multiplicity, passed verbatim to the runtime
/// multipart coder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartClasses {
    pub required_exactly_once: Vec<String>,
    pub required_at_least_once: Vec<String>,
    pub at_most_once: Vec<String>,
    pub zero_or_more: Vec<String>,
}

/// Translate a content map into ordered body variants. Auxiliary
/// declarations (payload types, part enums) land in `schemas`' module
/// stream. With the `multiple-content-types` flag off, only the first
/// entry is kept and the rest warn.
pub fn translate_content(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    config: &Config,
    content: &IndexMap<String, MediaType>,
    hint: &str,
) -> Result<Vec<ContentVariant>, TranslateError> {
    let mut entries: Vec<(&String, &MediaType)> = content.iter().collect();
    if entries.len() > 1 && !config.is_enabled(FeatureFlag::MultipleContentTypes) {
        for (media_type, _) in &entries[1..] {
            sink.warning(&format!(
                "content type '{media_type}' at '{hint}' skipped: multiple content types \
                 require the 'multiple-content-types' feature flag"
            ));
        }
        entries.truncate(1);
    }

    let mut labels = Namespace::new();
    let mut variants = Vec::new();
    for (media_type, media) in entries {
        let category = ContentCategory::classify(media_type);
        let label = labels.claim(&variant_label(category, media_type));
        let (ty, multipart) = match category {
            ContentCategory::Json | ContentCategory::UrlEncodedForm => {
                let ty =
                    schemas.type_for_optional_schema(sink, media.schema.as_ref(), &label)?;
                (ty, None)
            }
            ContentCategory::PlainText | ContentCategory::Binary => {
                (Type::path("runtime::ByteStream"), None)
            }
            ContentCategory::MultipartForm => {
                let (ty, classes) = translate_multipart(schemas, sink, config, media, &label)?;
                (ty, Some(classes))
            }
        };
        variants.push(ContentVariant {
            label,
            media_type: media_type.clone(),
            category,
            ty,
            multipart,
        });
    }
    Ok(variants)
}

/// The variant label: the canonical category label, except parameterized
/// JSON entries, which keep their full media type mangled so multiple
/// JSON flavors stay distinct.
fn variant_label(category: ContentCategory, media_type: &str) -> String {
    if category == ContentCategory::Json && media_type.contains(';') {
        collapse_label(media_type)
    } else {
        category.base_label().to_string()
    }
}

/// Lowercase a media type and collapse every non-alphanumeric run into a
/// single underscore: `application/json; foo=bar` becomes
/// `application_json_foo_bar`.
fn collapse_label(media_type: &str) -> String {
    let mut out = String::with_capacity(media_type.len());
    let mut pending_separator = false;
    for c in media_type.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            pending_separator = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    out
}

/// Expand a `multipart/form-data` schema: one variant per named part,
/// plus the `additionalProperties`-driven handling of unknown parts.
fn translate_multipart(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    config: &Config,
    media: &MediaType,
    label: &str,
) -> Result<(Type, MultipartClasses), TranslateError> {
    let empty = Schema::default();
    let schema = media.schema.as_ref().unwrap_or(&empty);
    let vis = config.access.visibility();

    let empty_properties = IndexMap::new();
    let properties = schema.properties.as_ref().unwrap_or(&empty_properties);
    let required: Vec<&str> = schema
        .required
        .as_ref()
        .map(|names| names.iter().map(String::as_str).collect())
        .unwrap_or_default();

    let enum_name = schemas.claim(&format!("{label}Part"));
    let mut variant_ns = Namespace::new();
    let mut variants = Vec::new();
    let mut classes = MultipartClasses::default();

    for (part_name, part_schema) in properties {
        let variant_name = variant_ns.claim(part_name);
        let is_required = required.contains(&part_name.as_str());
        let is_array = part_schema.is_array();
        match (is_required, is_array) {
            (true, false) => classes.required_exactly_once.push(part_name.clone()),
            (true, true) => classes.required_at_least_once.push(part_name.clone()),
            (false, false) => classes.at_most_once.push(part_name.clone()),
            (false, true) => classes.zero_or_more.push(part_name.clone()),
        }

        // Repeated parts carry the element schema per part.
        let element = if is_array {
            part_schema.items.as_deref().unwrap_or(&empty)
        } else {
            part_schema
        };
        let body_ty = part_body_type(schemas, sink, element, &variant_name)?;

        let encoding = media.encoding.get(part_name);
        let headers_ty = match encoding {
            Some(encoding) if !encoding.headers.is_empty() => Some(translate_part_headers(
                schemas,
                sink,
                vis,
                encoding,
                &variant_name,
            )?),
            _ => None,
        };

        let part_struct = schemas.claim(&format!("{variant_name}Body"));
        let mut fields = Vec::new();
        // Part shells are handled by the multipart coder, not serde, so
        // their fields carry no serde attributes.
        if let Some(headers_ty) = headers_ty {
            fields.push(Field {
                name: "headers".to_string(),
                vis,
                docs: Vec::new(),
                attrs: Vec::new(),
                ty: Type::option(headers_ty),
                has_default: true,
            });
        }
        fields.push(Field {
            name: "body".to_string(),
            vis,
            docs: Vec::new(),
            attrs: Vec::new(),
            ty: body_ty,
            has_default: false,
        });
        schemas.push_decl(Decl::Struct(StructDecl {
            name: part_struct.clone(),
            vis,
            docs: Vec::new(),
            derives: plain_derives(),
            attrs: Vec::new(),
            fields,
        }));

        variants.push(Variant {
            name: variant_name,
            docs: Vec::new(),
            attrs: Vec::new(),
            payload: vec![Type::path(part_struct)],
        });
    }

    // Unknown parts.
    match &schema.additional_properties {
        None | Some(AdditionalProperties::Bool(true)) => {
            variants.push(Variant {
                name: variant_ns.claim("undocumented"),
                docs: Vec::new(),
                attrs: Vec::new(),
                payload: vec![Type::path("runtime::RawPart")],
            });
        }
        Some(AdditionalProperties::Schema(value)) => {
            let value_ty = schemas.use_site_type(sink, value, "additionalProperties")?;
            variants.push(Variant {
                name: variant_ns.claim("additionalProperties"),
                docs: Vec::new(),
                attrs: Vec::new(),
                payload: vec![Type::path(format!(
                    "runtime::DynamicPart<{}>",
                    type_text(&value_ty)
                ))],
            });
        }
        // `false`: unknown parts are rejected by the coder's validation;
        // no extra variant.
        Some(AdditionalProperties::Bool(false)) => {}
    }

    schemas.push_decl(Decl::Enum(EnumDecl {
        name: enum_name.clone(),
        vis,
        docs: Vec::new(),
        derives: plain_derives(),
        attrs: Vec::new(),
        variants,
    }));

    Ok((
        Type::path(format!("runtime::MultipartBody<{enum_name}>")),
        classes,
    ))
}

/// The body type of one part, by the part schema's shape: objects are
/// JSON, base64 strings keep the Base64 container, plain primitives are
/// opaque byte streams with inferred `text/plain`.
fn part_body_type(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    schema: &Schema,
    hint: &str,
) -> Result<Type, TranslateError> {
    let base64 = schema.format.as_deref() == Some("byte")
        || schema.content_encoding.as_deref() == Some("base64");
    if schema.single_type() == Some("string") && !base64 {
        return Ok(Type::path("runtime::ByteStream"));
    }
    if schema.is_empty_fragment() {
        return Ok(Type::path("runtime::ByteStream"));
    }
    schemas.use_site_type(sink, schema, hint)
}

/// Per-part headers from `encoding.<part>.headers`.
fn translate_part_headers(
    schemas: &mut SchemaTranslator<'_>,
    sink: &mut dyn DiagnosticSink,
    vis: Visibility,
    encoding: &Encoding,
    part: &str,
) -> Result<Type, TranslateError> {
    let struct_name = schemas.claim(&format!("{part}Headers"));
    let mut field_ns = Namespace::new();
    let mut fields = Vec::new();
    for (header_name, header) in &encoding.headers {
        let header = match header {
            RefOr::Item(header) => header,
            RefOr::Ref { reference } => {
                sink.warning(&format!(
                    "header reference '{reference}' in multipart encoding of part '{part}' \
                     is not supported; header skipped"
                ));
                continue;
            }
        };
        let field_name = field_ns.claim(header_name);
        let base_ty =
            schemas.type_for_optional_schema(sink, header.schema.as_ref(), &field_name)?;
        let mut attrs = Vec::new();
        if &field_name != header_name {
            attrs.push(Attr::SerdeRename(header_name.clone()));
        }
        let optional = !header.required;
        if optional {
            attrs.push(Attr::SerdeDefault);
            attrs.push(Attr::SerdeSkipSerializingIfNone);
        }
        fields.push(Field {
            name: field_name,
            vis,
            docs: Vec::new(),
            attrs,
            ty: if optional {
                Type::option(base_ty)
            } else {
                base_ty
            },
            has_default: optional,
        });
    }
    schemas.push_decl(Decl::Struct(StructDecl {
        name: struct_name.clone(),
        vis,
        docs: Vec::new(),
        derives: data_derives(),
        attrs: Vec::new(),
        fields,
    }));
    Ok(Type::path(struct_name))
}

fn type_text(ty: &Type) -> String {
    use crate::ast::Emit as _;
    ty.emit()
}

/// The union of response content types, for the client `Accept` header.
pub fn accept_header_value(media_types: &[String]) -> String {
    let mut seen = Vec::new();
    for media_type in media_types {
        let essence = media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_string();
        if !seen.contains(&essence) {
            seen.push(essence);
        }
    }
    seen.join(", ")
}
