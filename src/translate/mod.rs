//! The translation pipeline: OpenAPI constructs to Type-AST declarations.
//!
//! Four translators, leaves first:
//! - `schema`: any schema node to a declaration tree
//! - `content`: media types to body variants (including multipart)
//! - `params`: path/query/header/cookie parameters
//! - `operation`: per-operation `Input`/`Output` envelopes and the
//!   client/server serializer and deserializer blocks
//!
//! All OpenAPI corner cases are resolved here; the AST layer below is
//! purely structural.

pub mod content;
pub mod operation;
pub mod params;
pub mod schema;

/// Derives applied to generated data types.
pub(crate) fn data_derives() -> Vec<String> {
    ["Debug", "Clone", "PartialEq", "Serialize", "Deserialize"]
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Derives for generated types that never touch the wire (envelope
/// shells, header groups).
pub(crate) fn plain_derives() -> Vec<String> {
    ["Debug", "Clone", "PartialEq"]
        .into_iter()
        .map(str::to_string)
        .collect()
}
