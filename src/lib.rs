#![forbid(unsafe_code)]
#![deny(warnings, unused_must_use)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro
)]

//! OpenAPI 3.0/3.1 to Rust code generator.
//!
//! Three output modes over one document:
//! - **types**: the data model (component namespaces, per-operation
//!   `Input`/`Output` envelopes, the `Api` trait)
//! - **client**: a `Client` that serializes `Input` into HTTP requests
//!   and deserializes responses into `Output`
//! - **server**: an adapter that deserializes requests, dispatches to an
//!   `Api` implementation, and serializes its `Output`
//!
//! The pipeline is staged: parse (`spec`) -> index (`registry`) ->
//! translate (`translate`) -> Type AST (`ast`) -> canonical text via
//! `Emit`. Translation is single-threaded, deterministic, and performs
//! no I/O; diagnostics flow out-of-band through a [`DiagnosticSink`].

pub mod ast;
pub mod config;
pub mod diagnostics;
mod error;
mod generator;
pub mod mangle;
pub mod registry;
pub mod spec;
mod translate;

pub use config::{Access, Config, FeatureFlag, Mode};
pub use diagnostics::{CallbackSink, Collector, Diagnostic, DiagnosticSink, Severity};
pub use error::TranslateError;
pub use generator::{generate, generate_all, generate_document, GeneratedFiles};
