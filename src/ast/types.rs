//! AST node definitions for the emitted Rust program.
//!
//! - `Decl`: top-level and nested declarations (modules, structs, enums,
//!   aliases, impls, traits, functions)
//! - `Type`: type positions
//! - `Expr` / `Stmt`: function bodies
//!
//! Complex generated bodies that do not benefit from structure use the
//! `Raw` escape hatch; everything with identity (names, fields, variants,
//! attributes) stays structured.

/// Visibility of an emitted symbol, lowered from the configured access
/// level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Pub,
    PubCrate,
    PubSuper,
    Private,
}

/// A complete generated file: doc preamble, imports, declarations.
#[derive(Debug, Clone, Default)]
pub struct File {
    /// File-level doc lines (`//!`).
    pub docs: Vec<String>,
    pub decls: Vec<Decl>,
}

/// A declaration.
#[derive(Debug, Clone)]
pub enum Decl {
    /// `use path;`
    Use(String),
    Module {
        name: String,
        vis: Visibility,
        docs: Vec<String>,
        decls: Vec<Decl>,
    },
    Struct(StructDecl),
    Enum(EnumDecl),
    TypeAlias {
        name: String,
        vis: Visibility,
        docs: Vec<String>,
        ty: Type,
    },
    Impl(ImplDecl),
    Trait(TraitDecl),
    Fn(FnDecl),
    /// Preformatted declaration text.
    Raw(String),
}

/// A product type.
#[derive(Debug, Clone)]
pub struct StructDecl {
    pub name: String,
    pub vis: Visibility,
    pub docs: Vec<String>,
    pub derives: Vec<String>,
    pub attrs: Vec<Attr>,
    pub fields: Vec<Field>,
}

/// One struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub vis: Visibility,
    pub docs: Vec<String>,
    pub attrs: Vec<Attr>,
    pub ty: Type,
    /// Defaulted fields are omitted from the generated constructor and
    /// initialized there (`None` / `Default::default()`).
    pub has_default: bool,
}

/// A sum type.
#[derive(Debug, Clone)]
pub struct EnumDecl {
    pub name: String,
    pub vis: Visibility,
    pub docs: Vec<String>,
    pub derives: Vec<String>,
    pub attrs: Vec<Attr>,
    pub variants: Vec<Variant>,
}

/// One enum variant, optionally carrying a payload.
#[derive(Debug, Clone)]
pub struct Variant {
    pub name: String,
    pub docs: Vec<String>,
    pub attrs: Vec<Attr>,
    pub payload: Vec<Type>,
}

/// An inherent or trait impl block.
#[derive(Debug, Clone)]
pub struct ImplDecl {
    /// Generic parameter list including the angle brackets, e.g.
    /// `<A: Api>`.
    pub generics: Option<String>,
    /// Implemented trait, if any.
    pub trait_name: Option<String>,
    pub target: String,
    pub fns: Vec<FnDecl>,
}

/// A trait declaration (the generated `Api` surface).
#[derive(Debug, Clone)]
pub struct TraitDecl {
    pub name: String,
    pub vis: Visibility,
    pub docs: Vec<String>,
    pub fns: Vec<FnDecl>,
}

/// A function: free, inherent, or trait method. An empty body inside a
/// trait emits as a required method signature.
#[derive(Debug, Clone)]
pub struct FnDecl {
    pub name: String,
    pub vis: Visibility,
    pub docs: Vec<String>,
    pub is_async: bool,
    /// Receiver, e.g. `&self`. Empty for free functions.
    pub receiver: Option<String>,
    pub params: Vec<Param>,
    pub return_type: Option<Type>,
    pub body: Option<Vec<Stmt>>,
}

/// A function parameter.
#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A type position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// A named path: `String`, `i64`, `runtime::DateTime`,
    /// `components::schemas::Pet`.
    Path(String),
    Option(Box<Type>),
    Vec(Box<Type>),
    Boxed(Box<Type>),
    /// `IndexMap<String, V>`
    Map(Box<Type>),
    /// `Result<T, E>`
    Result(Box<Type>, Box<Type>),
    Unit,
}

impl Type {
    pub fn path(name: impl Into<String>) -> Self {
        Type::Path(name.into())
    }

    pub fn option(inner: Type) -> Self {
        Type::Option(Box::new(inner))
    }

    pub fn vec(inner: Type) -> Self {
        Type::Vec(Box::new(inner))
    }

    pub fn boxed(inner: Type) -> Self {
        Type::Boxed(Box::new(inner))
    }

    pub fn map(value: Type) -> Self {
        Type::Map(Box::new(value))
    }

    pub fn result(ok: Type, err: Type) -> Self {
        Type::Result(Box::new(ok), Box::new(err))
    }

    pub fn is_option(&self) -> bool {
        matches!(self, Type::Option(_))
    }
}

/// An attribute on a declaration, field, or variant. Serde attributes are
/// modeled because the translators reason about them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attr {
    SerdeRename(String),
    SerdeRenameAll(String),
    /// Internally tagged enum: `#[serde(tag = "...")]`.
    SerdeTag(String),
    SerdeUntagged,
    SerdeDenyUnknownFields,
    SerdeFlatten,
    SerdeTransparent,
    SerdeDefault,
    SerdeSkipSerializingIfNone,
    /// Extra rename accepted on deserialize only:
    /// `#[serde(alias = "...")]`.
    SerdeAlias(String),
    /// Anything else, verbatim including the `#[...]`.
    Custom(String),
}

/// A literal value.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
}

/// An expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Identifier or path: `input`, `runtime::Method::Get`.
    Path(String),
    Literal(Literal),
    /// `callee(args...)`
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// `receiver.method(args...)`
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    /// `receiver.field`
    FieldAccess {
        receiver: Box<Expr>,
        field: String,
    },
    /// `Name { field: expr, ... }`
    StructLit {
        name: String,
        fields: Vec<(String, Expr)>,
    },
    /// `expr?`
    Try(Box<Expr>),
    /// `expr.await`
    Await(Box<Expr>),
    /// `&expr`
    Ref(Box<Expr>),
    Raw(String),
}

impl Expr {
    pub fn path(p: impl Into<String>) -> Self {
        Expr::Path(p.into())
    }

    pub fn str_lit(s: impl Into<String>) -> Self {
        Expr::Literal(Literal::Str(s.into()))
    }

    pub fn call(callee: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            callee: Box::new(Expr::path(callee)),
            args,
        }
    }

    pub fn method(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method: method.into(),
            args,
        }
    }

    pub fn field(receiver: Expr, field: impl Into<String>) -> Self {
        Expr::FieldAccess {
            receiver: Box::new(receiver),
            field: field.into(),
        }
    }

    pub fn try_(inner: Expr) -> Self {
        Expr::Try(Box::new(inner))
    }

    pub fn await_(inner: Expr) -> Self {
        Expr::Await(Box::new(inner))
    }
}

/// A statement.
#[derive(Debug, Clone)]
pub enum Stmt {
    /// `let [mut] name = init;`
    Let {
        name: String,
        mutable: bool,
        init: Expr,
    },
    Expr(Expr),
    Return(Option<Expr>),
    /// `match scrutinee { pattern => { body } ... }`
    Match {
        scrutinee: Expr,
        arms: Vec<(String, Vec<Stmt>)>,
    },
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        else_body: Option<Vec<Stmt>>,
    },
    Raw(String),
}
