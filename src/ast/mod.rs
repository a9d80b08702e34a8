//! Target-language AST for the emitted program.
//!
//! Two layers:
//! - `types`: declarations, types, expressions, statements
//! - `emit`: AST to canonical text via the `Emit` trait
//!
//! The translators build this AST; the snapshot tests (and the external
//! pretty-printer) consume its canonical text form. Keeping the AST
//! structured (attributes and derives are modeled, not strings) is what
//! makes the translator output testable without a renderer.

mod emit;
mod types;

pub use emit::Emit;
pub use types::{
    Attr, Decl, EnumDecl, Expr, Field, File, FnDecl, ImplDecl, Literal, Param, Stmt, StructDecl,
    TraitDecl, Type, Variant, Visibility,
};
