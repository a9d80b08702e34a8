//! Schema translation: OpenAPI schema nodes to Type-AST declarations.
//!
//! This is where the composition semantics live: `allOf`/`anyOf`/`oneOf`,
//! discriminators, nullability propagation, recursion breaking, and the
//! `<property>Payload` naming of inline sub-schemas.

use indexmap::IndexMap;
use std::collections::HashSet;

use crate::ast::{
    Attr, Decl, Emit as _, EnumDecl, Field, FnDecl, ImplDecl, Param, Stmt, StructDecl, Type,
    Variant, Visibility,
};
use crate::config::{Config, FeatureFlag};
use crate::diagnostics::DiagnosticSink;
use crate::error::TranslateError;
use crate::mangle::{mangle, Namespace};
use crate::registry::Registry;
use crate::spec::{AdditionalProperties, Discriminator, EnumValue, Schema};

use super::{data_derives, plain_derives};

/// Translates schemas into declarations for one target module. Holds the
/// module's identifier namespace so payload types synthesized for inline
/// sub-schemas stay unique.
pub struct SchemaTranslator<'a> {
    registry: &'a Registry,
    config: &'a Config,
    /// Path prefix for component schema types as seen from the target
    /// module. Empty inside `components::schemas` itself.
    schemas_path: String,
    namespace: Namespace,
    decls: Vec<Decl>,
    /// While translating a compound component (`allOf`/`anyOf`/`oneOf`)
    /// that owns a back-edge, references along that edge are boxed at
    /// the use site; object components break cycles with boxed storage
    /// instead.
    box_source: Option<String>,
}

impl<'a> SchemaTranslator<'a> {
    pub fn new(registry: &'a Registry, config: &'a Config, schemas_path: &str) -> Self {
        Self {
            registry,
            config,
            schemas_path: schemas_path.to_string(),
            namespace: Namespace::new(),
            decls: Vec::new(),
            box_source: None,
        }
    }

    fn vis(&self) -> Visibility {
        self.config.access.visibility()
    }

    /// Translate every component schema, in declaration order. Two
    /// components mangling to the same identifier is fatal.
    pub fn translate_components(
        &mut self,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<(), TranslateError> {
        let registry = self.registry;
        let mut claimed: IndexMap<String, String> = IndexMap::new();
        for key in registry.schemas().keys() {
            let identifier = mangle(key);
            if let Some(first) = claimed.get(&identifier) {
                return Err(TranslateError::NameCollision {
                    namespace: "components.schemas".to_string(),
                    identifier,
                    first: first.clone(),
                    second: key.clone(),
                });
            }
            claimed.insert(identifier, key.clone());
        }

        for (key, schema) in registry.schemas() {
            let rust_name = self.namespace.claim(key);
            tracing::debug!(component = %key, %rust_name, "translating component schema");
            self.translate_named(sink, &rust_name, Some(key), schema)?;
        }
        Ok(())
    }

    /// The declarations produced so far, in emission order.
    pub fn finish(self) -> Vec<Decl> {
        self.decls
    }

    /// The type to use for a parameter or body whose schema is absent:
    /// an opaque string.
    pub fn type_for_optional_schema(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        schema: Option<&Schema>,
        hint: &str,
    ) -> Result<Type, TranslateError> {
        match schema {
            Some(schema) => self.use_site_type(sink, schema, hint),
            None => Ok(Type::path("String")),
        }
    }

    /// Claim an identifier in this module's namespace (envelope types,
    /// body enums).
    pub fn claim(&mut self, name: &str) -> String {
        self.namespace.claim(name)
    }

    /// Append a declaration produced outside the schema translator to
    /// this module's output, keeping one ordered declaration stream.
    pub fn push_decl(&mut self, decl: Decl) {
        self.decls.push(decl);
    }

    /// Translate a schema appearing at a use site (property, parameter,
    /// body) into a type. Inline compound schemas synthesize a sibling
    /// `<hint>Payload` declaration. The returned type is the base type;
    /// the caller applies `Option` for its own optionality/nullability.
    pub fn use_site_type(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        schema: &Schema,
        hint: &str,
    ) -> Result<Type, TranslateError> {
        // References point at the component's emitted type; nullability
        // of the target is not inherited here (use-site rule).
        if let Some(ref_path) = &schema.ref_path {
            let (local, _) = self.registry.resolve_schema(ref_path)?;
            let ty = Type::path(format!("{}{}", self.schemas_path, mangle(local)));
            return Ok(self.maybe_boxed(local, ty));
        }

        // anyOf that only wraps nullability collapses to its one real child.
        if let Some(inner) = nullable_wrapper_child(schema) {
            return self.use_site_type(sink, inner, hint);
        }

        if schema.enum_values.is_some()
            || schema.all_of.is_some()
            || schema.any_of.is_some()
            || schema.one_of.is_some()
        {
            let name = self.namespace.claim(&format!("{hint}Payload"));
            self.translate_named(sink, &name, None, schema)?;
            return Ok(Type::path(name));
        }

        if schema.is_empty_fragment() {
            return Ok(Type::path("runtime::AnyValue"));
        }

        if schema.properties.is_some() || schema.additional_properties.is_some() {
            // Pure map shapes stay inline; a named payload is only
            // needed once there are named properties.
            if schema.properties.is_none() {
                return self.additional_properties_only_type(sink, schema, hint);
            }
            let name = self.namespace.claim(&format!("{hint}Payload"));
            self.translate_named(sink, &name, None, schema)?;
            return Ok(Type::path(name));
        }

        match schema.single_type() {
            Some("array") => {
                let item_ty = match &schema.items {
                    Some(items) => {
                        let base = self.use_site_type(sink, items, hint)?;
                        if items.is_nullable() {
                            Type::option(base)
                        } else {
                            base
                        }
                    }
                    None => Type::path("runtime::AnyValue"),
                };
                Ok(Type::vec(item_ty))
            }
            Some("object") => Ok(Type::path("runtime::AnyObject")),
            Some(primitive) => Ok(self.primitive_type(sink, primitive, schema, hint)),
            None => Ok(Type::path("runtime::AnyValue")),
        }
    }

    fn additional_properties_only_type(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        schema: &Schema,
        hint: &str,
    ) -> Result<Type, TranslateError> {
        match &schema.additional_properties {
            Some(AdditionalProperties::Schema(value)) => {
                let value_ty = self.use_site_type(sink, value, hint)?;
                Ok(Type::map(value_ty))
            }
            Some(AdditionalProperties::Bool(true)) | None => Ok(Type::path("runtime::AnyObject")),
            Some(AdditionalProperties::Bool(false)) => {
                let name = self.namespace.claim(&format!("{hint}Payload"));
                self.translate_named(sink, &name, None, schema)?;
                Ok(Type::path(name))
            }
        }
    }

    /// Map a primitive type name plus format to a Rust type.
    fn primitive_type(
        &self,
        sink: &mut dyn DiagnosticSink,
        type_name: &str,
        schema: &Schema,
        hint: &str,
    ) -> Type {
        match type_name {
            "string" => {
                let base64 = schema.format.as_deref() == Some("byte")
                    || schema.content_encoding.as_deref() == Some("base64");
                if base64 {
                    if self.config.is_enabled(FeatureFlag::Base64) {
                        return Type::path("runtime::Base64Bytes");
                    }
                    sink.warning(&format!(
                        "base64-encoded string at '{hint}' requires the 'base64' feature flag; \
                         falling back to String"
                    ));
                    return Type::path("String");
                }
                match schema.format.as_deref() {
                    Some("date-time") => Type::path("runtime::DateTime"),
                    Some("binary") => Type::path("runtime::ByteStream"),
                    _ => Type::path("String"),
                }
            }
            "integer" => match schema.format.as_deref() {
                Some("int32") => Type::path("i32"),
                _ => Type::path("i64"),
            },
            "number" => match schema.format.as_deref() {
                Some("float") => Type::path("f32"),
                _ => Type::path("f64"),
            },
            "boolean" => Type::path("bool"),
            other => {
                sink.warning(&format!(
                    "unknown schema type '{other}' at '{hint}'; treated as a fragment"
                ));
                Type::path("runtime::AnyValue")
            }
        }
    }

    /// Translate a schema into a named declaration (plus auxiliaries).
    /// `component_name` is set for component schemas and drives recursion
    /// breaking.
    fn translate_named(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        component_name: Option<&str>,
        schema: &Schema,
    ) -> Result<(), TranslateError> {
        if let Some(values) = &schema.enum_values {
            return self.emit_enum_of_literals(sink, rust_name, schema, values);
        }
        if let Some(children) = &schema.all_of {
            return self.with_box_source(component_name, |translator| {
                translator.emit_all_of(sink, rust_name, children)
            });
        }
        if let Some(inner) = nullable_wrapper_child(schema) {
            // A component that is anyOf [T, null] aliases T; the use site
            // decides about `Option`.
            let ty = self.use_site_type(sink, inner, rust_name)?;
            self.push_alias(rust_name, ty);
            return Ok(());
        }
        if let Some(children) = &schema.any_of {
            return self.with_box_source(component_name, |translator| {
                translator.emit_any_of(sink, rust_name, children)
            });
        }
        if let Some(children) = &schema.one_of {
            let discriminator = schema.discriminator.as_ref();
            return self.with_box_source(component_name, |translator| {
                translator.emit_one_of(sink, rust_name, children, discriminator)
            });
        }
        if let Some(ref_path) = &schema.ref_path {
            let (local, _) = self.registry.resolve_schema(ref_path)?;
            let ty = Type::path(format!("{}{}", self.schemas_path, mangle(local)));
            self.push_alias(rust_name, ty);
            return Ok(());
        }
        if schema.properties.is_some()
            || schema.additional_properties.is_some()
            || schema.single_type() == Some("object")
        {
            return self.emit_object(sink, rust_name, component_name, schema);
        }
        if schema.is_array() {
            let ty = self.use_site_type(sink, schema, rust_name)?;
            self.push_alias(rust_name, ty);
            return Ok(());
        }
        match schema.single_type() {
            Some(primitive) => {
                let ty = self.primitive_type(sink, primitive, schema, rust_name);
                self.push_alias(rust_name, ty);
            }
            None => {
                self.push_alias(rust_name, Type::path("runtime::AnyValue"));
            }
        }
        Ok(())
    }

    /// Run `f` with back-edge boxing active for `component_name`. Inline
    /// payloads (no component name) keep the enclosing component's edge
    /// context.
    fn with_box_source<R>(
        &mut self,
        component_name: Option<&str>,
        f: impl FnOnce(&mut Self) -> R,
    ) -> R {
        let previous = self.box_source.take();
        self.box_source = component_name
            .map(str::to_string)
            .or_else(|| previous.clone());
        let result = f(self);
        self.box_source = previous;
        result
    }

    /// Box `ty` when the reference to `local` is the chosen back-edge of
    /// the compound component currently being translated.
    fn maybe_boxed(&self, local: &str, ty: Type) -> Type {
        match &self.box_source {
            Some(source) if self.registry.is_back_edge(source, local) => Type::boxed(ty),
            _ => ty,
        }
    }

    fn push_alias(&mut self, name: &str, ty: Type) {
        self.decls.push(Decl::TypeAlias {
            name: name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            ty,
        });
    }

    /// A closed sum over string literals. Non-string literal sets fall
    /// back to a typealias with a warning.
    fn emit_enum_of_literals(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        schema: &Schema,
        values: &[EnumValue],
    ) -> Result<(), TranslateError> {
        let strings: Vec<&String> = values
            .iter()
            .filter_map(|v| match v {
                EnumValue::String(s) => Some(s),
                _ => None,
            })
            .collect();
        if strings.len() != values.len() {
            sink.warning(&format!(
                "non-string enum values in '{rust_name}' are not supported; \
                 emitting a typealias of the underlying type"
            ));
            let ty = match schema.single_type() {
                Some(primitive) => self.primitive_type(sink, primitive, schema, rust_name),
                None => Type::path("runtime::AnyValue"),
            };
            self.push_alias(rust_name, ty);
            return Ok(());
        }

        let mut variant_ns = Namespace::new();
        let variants = strings
            .iter()
            .map(|literal| {
                let name = variant_ns.claim(literal);
                let attrs = if &name == *literal {
                    Vec::new()
                } else {
                    vec![Attr::SerdeRename((*literal).clone())]
                };
                Variant {
                    name,
                    docs: Vec::new(),
                    attrs,
                    payload: Vec::new(),
                }
            })
            .collect();

        self.decls.push(Decl::Enum(EnumDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: enum_derives(),
            attrs: Vec::new(),
            variants,
        }));
        Ok(())
    }

    /// A product with one field per property. Component schemas on a
    /// reference cycle get boxed storage with forwarding accessors.
    fn emit_object(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        component_name: Option<&str>,
        schema: &Schema,
    ) -> Result<(), TranslateError> {
        let empty = IndexMap::new();
        let properties = schema.properties.as_ref().unwrap_or(&empty);
        let required = required_set(sink, rust_name, schema, properties);

        let mut field_ns = Namespace::new();
        let mut fields = Vec::new();
        for (property_name, property) in properties {
            if is_binary_string(property) {
                sink.warning(&format!(
                    "unsupported 'binary' format on property '{property_name}' of \
                     '{rust_name}'; property skipped"
                ));
                continue;
            }
            let field_name = field_ns.claim(property_name);
            if field_name != mangle(property_name) {
                sink.note(&format!(
                    "property '{property_name}' of '{rust_name}' renamed to '{field_name}' \
                     to stay unique"
                ));
            }
            let base_ty = self.use_site_type(sink, property, &field_name)?;
            let optional = !required.contains(property_name.as_str());
            let nullable = property.is_nullable();
            let ty = if optional || nullable {
                Type::option(base_ty)
            } else {
                base_ty
            };

            let mut attrs = Vec::new();
            if &field_name != property_name {
                attrs.push(Attr::SerdeRename(property_name.clone()));
            }
            if optional {
                attrs.push(Attr::SerdeDefault);
                attrs.push(Attr::SerdeSkipSerializingIfNone);
            } else if nullable {
                // Required-but-nullable: the key must be present even
                // when the value is null, so the implicit Option
                // missing-field handling is opted out.
                attrs.push(Attr::Custom(
                    "#[serde(deserialize_with = \"runtime::required_nullable\")]".to_string(),
                ));
            }

            fields.push(Field {
                name: field_name,
                vis: self.vis(),
                docs: Vec::new(),
                attrs,
                ty,
                has_default: optional,
            });
        }

        let mut struct_attrs = Vec::new();
        if schema.deprecated {
            struct_attrs.push(Attr::Custom("#[deprecated]".to_string()));
        }
        match &schema.additional_properties {
            Some(AdditionalProperties::Bool(false)) => {
                struct_attrs.push(Attr::SerdeDenyUnknownFields);
            }
            Some(AdditionalProperties::Bool(true)) => {
                fields.push(additional_field(
                    Type::path("runtime::AnyObject"),
                    self.vis(),
                ));
            }
            Some(AdditionalProperties::Schema(value)) => {
                let value_ty = self.use_site_type(sink, value, "additionalProperties")?;
                fields.push(additional_field(Type::map(value_ty), self.vis()));
            }
            None => {}
        }

        let boxed = component_name.is_some_and(|name| self.registry.needs_boxed_storage(name));
        if boxed {
            self.emit_boxed_struct(rust_name, struct_attrs, fields);
        } else {
            self.emit_plain_struct(rust_name, struct_attrs, fields);
        }
        Ok(())
    }

    fn emit_plain_struct(&mut self, rust_name: &str, attrs: Vec<Attr>, fields: Vec<Field>) {
        let constructor = constructor_fn(&fields, self.vis(), None);
        self.decls.push(Decl::Struct(StructDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: data_derives(),
            attrs,
            fields,
        }));
        if let Some(constructor) = constructor {
            self.decls.push(Decl::Impl(ImplDecl {
                generics: None,
                trait_name: None,
                target: rust_name.to_string(),
                fns: vec![constructor],
            }));
        }
    }

    /// Recursive product: the fields live behind a single boxed storage
    /// struct; public accessors forward reads and in-place mutation, and
    /// serde is delegated to the storage transparently.
    fn emit_boxed_struct(&mut self, rust_name: &str, attrs: Vec<Attr>, fields: Vec<Field>) {
        let storage_name = self.namespace.claim(&format!("{rust_name}Storage"));

        let mut fns = Vec::new();
        if let Some(constructor) = constructor_fn(&fields, self.vis(), Some(&storage_name)) {
            fns.push(constructor);
        }
        for field in &fields {
            fns.push(FnDecl {
                name: field.name.clone(),
                vis: self.vis(),
                docs: Vec::new(),
                is_async: false,
                receiver: Some("&self".to_string()),
                params: Vec::new(),
                return_type: Some(Type::path(format!("&{}", field.ty.emit()))),
                body: Some(vec![Stmt::Raw(format!("&self.storage.{}", field.name))]),
            });
            fns.push(FnDecl {
                name: format!("{}_mut", field.name),
                vis: self.vis(),
                docs: Vec::new(),
                is_async: false,
                receiver: Some("&mut self".to_string()),
                params: Vec::new(),
                return_type: Some(Type::path(format!("&mut {}", field.ty.emit()))),
                body: Some(vec![Stmt::Raw(format!("&mut self.storage.{}", field.name))]),
            });
        }

        // The storage struct carries the serde surface.
        let mut storage_fields = fields;
        for field in &mut storage_fields {
            field.vis = Visibility::Private;
        }
        self.decls.push(Decl::Struct(StructDecl {
            name: storage_name.clone(),
            vis: Visibility::Private,
            docs: Vec::new(),
            derives: data_derives(),
            attrs,
            fields: storage_fields,
        }));
        self.decls.push(Decl::Struct(StructDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: data_derives(),
            attrs: vec![Attr::SerdeTransparent],
            fields: vec![Field {
                name: "storage".to_string(),
                vis: Visibility::Private,
                docs: Vec::new(),
                attrs: Vec::new(),
                ty: Type::boxed(Type::path(storage_name)),
                has_default: false,
            }],
        }));
        self.decls.push(Decl::Impl(ImplDecl {
            generics: None,
            trait_name: None,
            target: rust_name.to_string(),
            fns,
        }));
    }

    /// `allOf`: a product with one field per child, decoded from the same
    /// input. Primitive and array children go through the single-value
    /// container.
    fn emit_all_of(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        children: &[Schema],
    ) -> Result<(), TranslateError> {
        let parts = self.composition_parts(sink, children)?;
        let fields: Vec<Field> = parts
            .iter()
            .map(|part| Field {
                name: part.field.clone(),
                vis: self.vis(),
                docs: Vec::new(),
                attrs: Vec::new(),
                ty: part.ty.clone(),
                has_default: false,
            })
            .collect();

        self.decls.push(Decl::Struct(StructDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: plain_derives(),
            attrs: Vec::new(),
            fields,
        }));

        let encode_lines: Vec<String> = parts
            .iter()
            .map(|part| {
                let call = if part.single_value {
                    "encode_single_value"
                } else {
                    "encode"
                };
                format!(
                    "merged.{call}(&self.{}).map_err(serde::ser::Error::custom)?;",
                    part.field
                )
            })
            .collect();
        let decode_lines: Vec<String> = parts
            .iter()
            .map(|part| {
                let call = if part.single_value {
                    "decode_single_value"
                } else {
                    "decode"
                };
                format!(
                    "let {} = raw.{call}().map_err(serde::de::Error::custom)?;",
                    part.field
                )
            })
            .collect();
        let field_list: Vec<&str> = parts.iter().map(|p| p.field.as_str()).collect();
        self.decls.push(Decl::Raw(manual_serialize(
            rust_name,
            &encode_lines.join("\n        "),
        )));
        self.decls.push(Decl::Raw(manual_deserialize(
            rust_name,
            &format!(
                "{}\n        Ok(Self {{ {} }})",
                decode_lines.join("\n        "),
                field_list.join(", ")
            ),
        )));
        Ok(())
    }

    /// `anyOf`: a product of optional children. Decode tries every child
    /// independently and accumulates errors; at least one must succeed.
    fn emit_any_of(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        children: &[Schema],
    ) -> Result<(), TranslateError> {
        let parts = self.composition_parts(sink, children)?;
        let fields: Vec<Field> = parts
            .iter()
            .map(|part| Field {
                name: part.field.clone(),
                vis: self.vis(),
                docs: Vec::new(),
                attrs: Vec::new(),
                ty: Type::option(part.ty.clone()),
                has_default: false,
            })
            .collect();

        self.decls.push(Decl::Struct(StructDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: plain_derives(),
            attrs: Vec::new(),
            fields,
        }));

        // Encode: single-value children are mutually exclusive, the
        // first non-None one wins; object children all merge.
        let mut encode_lines = Vec::new();
        let single_parts: Vec<&CompositionPart> =
            parts.iter().filter(|p| p.single_value).collect();
        if !single_parts.is_empty() {
            let chain = single_parts
                .iter()
                .map(|part| {
                    format!(
                        "if let Some(value) = &self.{} {{\n            \
                         merged.encode_single_value(value).map_err(serde::ser::Error::custom)?;\n        }}",
                        part.field
                    )
                })
                .collect::<Vec<_>>()
                .join(" else ");
            encode_lines.push(chain);
        }
        for part in parts.iter().filter(|p| !p.single_value) {
            encode_lines.push(format!(
                "if let Some(value) = &self.{} {{\n            \
                 merged.encode(value).map_err(serde::ser::Error::custom)?;\n        }}",
                part.field
            ));
        }

        let mut decode_lines = vec!["let mut errors = Vec::new();".to_string()];
        for part in &parts {
            let call = if part.single_value {
                "decode_single_value"
            } else {
                "decode"
            };
            decode_lines.push(format!(
                "let {} = raw.{call}().map_err(|error| errors.push(error)).ok();",
                part.field
            ));
        }
        let none_check = parts
            .iter()
            .map(|p| format!("{}.is_none()", p.field))
            .collect::<Vec<_>>()
            .join(" && ");
        decode_lines.push(format!(
            "if {none_check} {{\n            return Err(serde::de::Error::custom(\
             runtime::DecodeError::no_any_of_branch(errors)));\n        }}"
        ));
        let field_list: Vec<&str> = parts.iter().map(|p| p.field.as_str()).collect();
        decode_lines.push(format!("Ok(Self {{ {} }})", field_list.join(", ")));

        self.decls.push(Decl::Raw(manual_serialize(
            rust_name,
            &encode_lines.join("\n        "),
        )));
        self.decls.push(Decl::Raw(manual_deserialize(
            rust_name,
            &decode_lines.join("\n        "),
        )));
        Ok(())
    }

    /// `oneOf`: a closed sum. Without a discriminator the decode attempts
    /// run in document order (untagged); with one, the discriminator
    /// property selects the variant (internally tagged), variant names
    /// coming from the ordered mapping first.
    fn emit_one_of(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        children: &[Schema],
        discriminator: Option<&Discriminator>,
    ) -> Result<(), TranslateError> {
        if let Some(discriminator) = discriminator {
            return self.emit_discriminated_one_of(sink, rust_name, children, discriminator);
        }

        let parts = self.composition_parts(sink, children)?;
        let variants = parts
            .iter()
            .map(|part| Variant {
                name: capitalized(&part.field),
                docs: Vec::new(),
                attrs: Vec::new(),
                payload: vec![part.ty.clone()],
            })
            .collect();
        self.decls.push(Decl::Enum(EnumDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: data_derives(),
            attrs: vec![Attr::SerdeUntagged],
            variants,
        }));
        Ok(())
    }

    fn emit_discriminated_one_of(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        rust_name: &str,
        children: &[Schema],
        discriminator: &Discriminator,
    ) -> Result<(), TranslateError> {
        // Children must be references for a discriminator to make sense.
        let mut referenced: Vec<(String, String)> = Vec::new(); // (local name, full ref)
        for child in children {
            match &child.ref_path {
                Some(ref_path) => {
                    let (local, _) = self.registry.resolve_schema(ref_path)?;
                    referenced.push((local.to_string(), ref_path.clone()));
                }
                None => sink.warning(&format!(
                    "inline schema inside discriminated oneOf '{rust_name}' skipped; \
                     discriminator variants must be references"
                )),
            }
        }

        let mut variant_ns = Namespace::new();
        let mut variants = Vec::new();
        let mut covered: HashSet<String> = HashSet::new();

        // Mapping entries first, in mapping order.
        if let Some(mapping) = &discriminator.mapping {
            for (value, target) in mapping {
                let Some((local, _)) = referenced.iter().find(|(_, r)| r == target) else {
                    sink.warning(&format!(
                        "discriminator mapping '{value}' of '{rust_name}' points at \
                         '{target}', which is not a oneOf child; entry skipped"
                    ));
                    continue;
                };
                covered.insert(local.clone());
                let name = variant_ns.claim(value);
                let mut attrs = Vec::new();
                if &name != value {
                    attrs.push(Attr::SerdeRename(value.clone()));
                }
                let ty = Type::path(format!("{}{}", self.schemas_path, mangle(local)));
                variants.push(Variant {
                    name,
                    docs: Vec::new(),
                    attrs,
                    payload: vec![self.maybe_boxed(local, ty)],
                });
            }
        }

        // One variant per referenced schema not covered by the mapping.
        // The decoder accepts both the bare name and the full $ref path.
        for (local, full_ref) in &referenced {
            if covered.contains(local) {
                continue;
            }
            let name = variant_ns.claim(local);
            let mut attrs = Vec::new();
            if &name != local {
                attrs.push(Attr::SerdeRename(local.clone()));
            }
            attrs.push(Attr::SerdeAlias(full_ref.clone()));
            let ty = Type::path(format!("{}{}", self.schemas_path, mangle(local)));
            variants.push(Variant {
                name,
                docs: Vec::new(),
                attrs,
                payload: vec![self.maybe_boxed(local, ty)],
            });
        }

        self.decls.push(Decl::Enum(EnumDecl {
            name: rust_name.to_string(),
            vis: self.vis(),
            docs: Vec::new(),
            derives: data_derives(),
            attrs: vec![Attr::SerdeTag(discriminator.property_name.clone())],
            variants,
        }));
        Ok(())
    }

    /// Positional `value1..valueN` fields for composition children, with
    /// the single-value classification each coder needs.
    fn composition_parts(
        &mut self,
        sink: &mut dyn DiagnosticSink,
        children: &[Schema],
    ) -> Result<Vec<CompositionPart>, TranslateError> {
        let mut parts = Vec::new();
        for (index, child) in children.iter().enumerate() {
            let ordinal = index + 1;
            let ty = self.use_site_type(sink, child, &format!("Value{ordinal}"))?;
            parts.push(CompositionPart {
                field: format!("value{ordinal}"),
                ty,
                single_value: self.is_single_value(child),
            });
        }
        Ok(parts)
    }

    /// Whether a schema decodes from a single value (primitive, array,
    /// or string enum) rather than merging into a keyed container.
    /// References are resolved first.
    pub fn is_single_value(&self, schema: &Schema) -> bool {
        let schema = match &schema.ref_path {
            Some(ref_path) => match self.registry.resolve_schema(ref_path) {
                Ok((_, target)) => target,
                Err(_) => return false,
            },
            None => schema,
        };
        if schema.enum_values.is_some() {
            return true;
        }
        matches!(
            schema.single_type(),
            Some("string" | "integer" | "number" | "boolean" | "array")
        )
    }
}

/// One child of an `allOf`/`anyOf`/`oneOf`.
struct CompositionPart {
    field: String,
    ty: Type,
    single_value: bool,
}

/// The `required` set, with names lacking a matching property warned and
/// inferred out.
fn required_set<'s>(
    sink: &mut dyn DiagnosticSink,
    rust_name: &str,
    schema: &'s Schema,
    properties: &IndexMap<String, Schema>,
) -> HashSet<&'s str> {
    let mut required = HashSet::new();
    if let Some(names) = &schema.required {
        for name in names {
            if properties.contains_key(name) {
                required.insert(name.as_str());
            } else {
                sink.warning(&format!(
                    "required name '{name}' of '{rust_name}' has no matching property; ignored"
                ));
            }
        }
    }
    required
}

fn is_binary_string(schema: &Schema) -> bool {
    schema.single_type() == Some("string") && schema.format.as_deref() == Some("binary")
}

/// True when the schema is `anyOf` wrapping exactly one real child plus a
/// `null` (the common 3.1 nullable spelling). Returns the real child.
fn nullable_wrapper_child(schema: &Schema) -> Option<&Schema> {
    let any_of = schema.any_of.as_ref()?;
    let mut non_null = any_of.iter().filter(|child| !child.is_null_type());
    match (non_null.next(), non_null.next()) {
        (Some(child), None) if any_of.len() > 1 => Some(child),
        _ => None,
    }
}

fn additional_field(ty: Type, vis: Visibility) -> Field {
    Field {
        name: "additional_properties".to_string(),
        vis,
        docs: Vec::new(),
        attrs: vec![Attr::SerdeFlatten, Attr::SerdeDefault],
        ty,
        has_default: true,
    }
}

fn enum_derives() -> Vec<String> {
    [
        "Debug",
        "Clone",
        "Copy",
        "PartialEq",
        "Eq",
        "Serialize",
        "Deserialize",
    ]
    .into_iter()
    .map(str::to_string)
    .collect()
}

fn capitalized(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        None => String::new(),
        Some(first) => first.to_uppercase().chain(chars).collect(),
    }
}

/// Memberwise constructor: one parameter per non-defaulted field;
/// defaulted fields are initialized in place.
pub(crate) fn constructor_fn(
    fields: &[Field],
    vis: Visibility,
    storage_name: Option<&str>,
) -> Option<FnDecl> {
    if fields.is_empty() {
        return None;
    }
    let params: Vec<Param> = fields
        .iter()
        .filter(|field| !field.has_default)
        .map(|field| Param {
            name: field.name.clone(),
            ty: field.ty.clone(),
        })
        .collect();
    let inits: Vec<String> = fields
        .iter()
        .map(|field| {
            if !field.has_default {
                field.name.clone()
            } else if field.ty.is_option() {
                format!("{}: None", field.name)
            } else {
                format!("{}: Default::default()", field.name)
            }
        })
        .collect();
    let literal = format!("{{ {} }}", inits.join(", "));
    let body = match storage_name {
        None => format!("Self {literal}"),
        Some(storage) => format!("Self {{ storage: Box::new({storage} {literal}) }}"),
    };
    Some(FnDecl {
        name: "new".to_string(),
        vis,
        docs: Vec::new(),
        is_async: false,
        receiver: None,
        params,
        return_type: Some(Type::path("Self")),
        body: Some(vec![Stmt::Raw(body)]),
    })
}

fn manual_serialize(name: &str, body: &str) -> String {
    format!(
        "impl serde::Serialize for {name} {{\n    \
         fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>\n    \
         where\n        S: serde::Serializer,\n    {{\n        \
         let mut merged = runtime::MergedObject::new();\n        \
         {body}\n        \
         merged.end(serializer)\n    }}\n}}"
    )
}

fn manual_deserialize(name: &str, body: &str) -> String {
    format!(
        "impl<'de> serde::Deserialize<'de> for {name} {{\n    \
         fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>\n    \
         where\n        D: serde::Deserializer<'de>,\n    {{\n        \
         let raw = runtime::AnyValue::deserialize(deserializer)?;\n        \
         {body}\n    }}\n}}"
    )
}
