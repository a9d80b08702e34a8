//! Fatal error type for the translation pipeline.

use thiserror::Error;

/// A fatal translation error. Warnings never take this path; they are
/// reported through the diagnostic sink and translation continues.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// A `$ref` does not resolve within the document.
    #[error("unresolved reference '{reference}'")]
    UnresolvedReference { reference: String },

    /// A reference chain exceeded the resolution depth guard, which only
    /// happens when non-schema components reference each other in a loop.
    #[error("reference cycle while resolving '{reference}'")]
    ReferenceCycle { reference: String },

    /// Two distinct OpenAPI entities mangle to the same identifier within
    /// one namespace.
    #[error("name collision in {namespace}: '{first}' and '{second}' both map to '{identifier}'")]
    NameCollision {
        namespace: String,
        identifier: String,
        first: String,
        second: String,
    },

    /// Two operations share an `operationId`.
    #[error("duplicate operationId '{id}'")]
    DuplicateOperationId { id: String },

    /// The document is structurally unusable (beyond the warn-and-skip
    /// cases).
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    #[error("failed to parse document: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("failed to parse document: {0}")]
    Json(#[from] serde_json::Error),
}
