//! Canonical text emission via the `Emit` trait.
//!
//! Each AST node renders itself; containers indent their children. The
//! output is the canonical form the snapshot tests assert against;
//! anything fancier (line wrapping, comment reflow) belongs to the
//! external pretty-printer.

use super::types::{
    Attr, Decl, EnumDecl, Expr, Field, File, FnDecl, ImplDecl, Literal, Stmt, StructDecl,
    TraitDecl, Type, Variant, Visibility,
};

/// Convert an AST node to its canonical text.
pub trait Emit {
    fn emit(&self) -> String;
}

const INDENT: &str = "    ";

/// Indent every non-empty line one level.
fn indent(text: &str) -> String {
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{INDENT}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn doc_lines(docs: &[String]) -> String {
    let mut out = String::new();
    for doc in docs {
        out.push_str("/// ");
        out.push_str(doc);
        out.push('\n');
    }
    out
}

fn derive_line(derives: &[String]) -> String {
    if derives.is_empty() {
        String::new()
    } else {
        format!("#[derive({})]\n", derives.join(", "))
    }
}

fn attr_lines(attrs: &[Attr]) -> String {
    let mut out = String::new();
    for attr in attrs {
        out.push_str(&attr.emit());
        out.push('\n');
    }
    out
}

impl Emit for Visibility {
    fn emit(&self) -> String {
        match self {
            Visibility::Pub => "pub ".to_string(),
            Visibility::PubCrate => "pub(crate) ".to_string(),
            Visibility::PubSuper => "pub(super) ".to_string(),
            Visibility::Private => String::new(),
        }
    }
}

impl Emit for Type {
    fn emit(&self) -> String {
        match self {
            Type::Path(path) => path.clone(),
            Type::Option(inner) => format!("Option<{}>", inner.emit()),
            Type::Vec(inner) => format!("Vec<{}>", inner.emit()),
            Type::Boxed(inner) => format!("Box<{}>", inner.emit()),
            Type::Map(value) => format!("IndexMap<String, {}>", value.emit()),
            Type::Result(ok, err) => format!("Result<{}, {}>", ok.emit(), err.emit()),
            Type::Unit => "()".to_string(),
        }
    }
}

impl Emit for Attr {
    fn emit(&self) -> String {
        match self {
            Attr::SerdeRename(name) => format!("#[serde(rename = \"{}\")]", escape(name)),
            Attr::SerdeRenameAll(style) => format!("#[serde(rename_all = \"{style}\")]"),
            Attr::SerdeTag(tag) => format!("#[serde(tag = \"{}\")]", escape(tag)),
            Attr::SerdeUntagged => "#[serde(untagged)]".to_string(),
            Attr::SerdeDenyUnknownFields => "#[serde(deny_unknown_fields)]".to_string(),
            Attr::SerdeFlatten => "#[serde(flatten)]".to_string(),
            Attr::SerdeTransparent => "#[serde(transparent)]".to_string(),
            Attr::SerdeDefault => "#[serde(default)]".to_string(),
            Attr::SerdeSkipSerializingIfNone => {
                "#[serde(skip_serializing_if = \"Option::is_none\")]".to_string()
            }
            Attr::SerdeAlias(name) => format!("#[serde(alias = \"{}\")]", escape(name)),
            Attr::Custom(text) => text.clone(),
        }
    }
}

fn escape(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

impl Emit for Literal {
    fn emit(&self) -> String {
        match self {
            Literal::Str(s) => format!("\"{}\"", escape(s)),
            Literal::Int(i) => i.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::Bool(b) => b.to_string(),
        }
    }
}

impl Emit for Expr {
    fn emit(&self) -> String {
        match self {
            Expr::Path(path) => path.clone(),
            Expr::Literal(lit) => lit.emit(),
            Expr::Call { callee, args } => {
                let args: Vec<_> = args.iter().map(Emit::emit).collect();
                format!("{}({})", callee.emit(), args.join(", "))
            }
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => {
                let args: Vec<_> = args.iter().map(Emit::emit).collect();
                format!("{}.{}({})", receiver.emit(), method, args.join(", "))
            }
            Expr::FieldAccess { receiver, field } => {
                format!("{}.{}", receiver.emit(), field)
            }
            Expr::StructLit { name, fields } => {
                if fields.is_empty() {
                    format!("{name} {{}}")
                } else {
                    let fields: Vec<_> = fields
                        .iter()
                        .map(|(field, value)| {
                            let value = value.emit();
                            if *field == value {
                                field.clone()
                            } else {
                                format!("{field}: {value}")
                            }
                        })
                        .collect();
                    format!("{name} {{ {} }}", fields.join(", "))
                }
            }
            Expr::Try(inner) => format!("{}?", inner.emit()),
            Expr::Await(inner) => format!("{}.await", inner.emit()),
            Expr::Ref(inner) => format!("&{}", inner.emit()),
            Expr::Raw(text) => text.clone(),
        }
    }
}

fn emit_body(body: &[Stmt]) -> String {
    body.iter().map(Emit::emit).collect::<Vec<_>>().join("\n")
}

impl Emit for Stmt {
    fn emit(&self) -> String {
        match self {
            Stmt::Let {
                name,
                mutable,
                init,
            } => {
                let mutable = if *mutable { "mut " } else { "" };
                format!("let {mutable}{name} = {};", init.emit())
            }
            Stmt::Expr(expr) => format!("{};", expr.emit()),
            Stmt::Return(None) => "return;".to_string(),
            Stmt::Return(Some(expr)) => format!("return {};", expr.emit()),
            Stmt::Match { scrutinee, arms } => {
                let mut out = format!("match {} {{\n", scrutinee.emit());
                for (pattern, body) in arms {
                    out.push_str(&indent(&format!(
                        "{pattern} => {{\n{}\n}}",
                        indent(&emit_body(body))
                    )));
                    out.push('\n');
                }
                out.push('}');
                out
            }
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let mut out = format!(
                    "if {} {{\n{}\n}}",
                    cond.emit(),
                    indent(&emit_body(then_body))
                );
                if let Some(else_body) = else_body {
                    out.push_str(&format!(" else {{\n{}\n}}", indent(&emit_body(else_body))));
                }
                out
            }
            Stmt::Raw(text) => text.clone(),
        }
    }
}

impl Emit for Field {
    fn emit(&self) -> String {
        format!(
            "{}{}{}{}: {},",
            doc_lines(&self.docs),
            attr_lines(&self.attrs),
            self.vis.emit(),
            self.name,
            self.ty.emit()
        )
    }
}

impl Emit for StructDecl {
    fn emit(&self) -> String {
        let header = format!(
            "{}{}{}{}struct {}",
            doc_lines(&self.docs),
            derive_line(&self.derives),
            attr_lines(&self.attrs),
            self.vis.emit(),
            self.name
        );
        if self.fields.is_empty() {
            return format!("{header} {{}}");
        }
        let fields: Vec<_> = self.fields.iter().map(Emit::emit).collect();
        format!("{header} {{\n{}\n}}", indent(&fields.join("\n")))
    }
}

impl Emit for Variant {
    fn emit(&self) -> String {
        let payload = if self.payload.is_empty() {
            String::new()
        } else {
            let types: Vec<_> = self.payload.iter().map(Emit::emit).collect();
            format!("({})", types.join(", "))
        };
        format!(
            "{}{}{}{},",
            doc_lines(&self.docs),
            attr_lines(&self.attrs),
            self.name,
            payload
        )
    }
}

impl Emit for EnumDecl {
    fn emit(&self) -> String {
        let header = format!(
            "{}{}{}{}enum {}",
            doc_lines(&self.docs),
            derive_line(&self.derives),
            attr_lines(&self.attrs),
            self.vis.emit(),
            self.name
        );
        if self.variants.is_empty() {
            return format!("{header} {{}}");
        }
        let variants: Vec<_> = self.variants.iter().map(Emit::emit).collect();
        format!("{header} {{\n{}\n}}", indent(&variants.join("\n")))
    }
}

impl Emit for FnDecl {
    fn emit(&self) -> String {
        let asyncness = if self.is_async { "async " } else { "" };
        let mut params: Vec<String> = Vec::new();
        if let Some(receiver) = &self.receiver {
            params.push(receiver.clone());
        }
        params.extend(
            self.params
                .iter()
                .map(|p| format!("{}: {}", p.name, p.ty.emit())),
        );
        let return_type = self
            .return_type
            .as_ref()
            .map(|ty| format!(" -> {}", ty.emit()))
            .unwrap_or_default();
        let signature = format!(
            "{}{}{asyncness}fn {}({}){return_type}",
            doc_lines(&self.docs),
            self.vis.emit(),
            self.name,
            params.join(", ")
        );
        match &self.body {
            None => format!("{signature};"),
            Some(body) if body.is_empty() => format!("{signature} {{}}"),
            Some(body) => format!("{signature} {{\n{}\n}}", indent(&emit_body(body))),
        }
    }
}

impl Emit for ImplDecl {
    fn emit(&self) -> String {
        let generics = self.generics.as_deref().unwrap_or_default();
        let header = match &self.trait_name {
            Some(trait_name) => format!("impl{generics} {trait_name} for {}", self.target),
            None => format!("impl{generics} {}", self.target),
        };
        if self.fns.is_empty() {
            return format!("{header} {{}}");
        }
        let fns: Vec<_> = self.fns.iter().map(Emit::emit).collect();
        format!("{header} {{\n{}\n}}", indent(&fns.join("\n\n")))
    }
}

impl Emit for TraitDecl {
    fn emit(&self) -> String {
        let header = format!(
            "{}{}trait {}",
            doc_lines(&self.docs),
            self.vis.emit(),
            self.name
        );
        if self.fns.is_empty() {
            return format!("{header} {{}}");
        }
        let fns: Vec<_> = self.fns.iter().map(Emit::emit).collect();
        format!("{header} {{\n{}\n}}", indent(&fns.join("\n\n")))
    }
}

impl Emit for Decl {
    fn emit(&self) -> String {
        match self {
            Decl::Use(path) => format!("use {path};"),
            Decl::Module {
                name,
                vis,
                docs,
                decls,
            } => {
                let body: Vec<_> = decls.iter().map(Emit::emit).collect();
                format!(
                    "{}{}mod {name} {{\n{}\n}}",
                    doc_lines(docs),
                    vis.emit(),
                    indent(&body.join("\n\n"))
                )
            }
            Decl::Struct(decl) => decl.emit(),
            Decl::Enum(decl) => decl.emit(),
            Decl::TypeAlias {
                name,
                vis,
                docs,
                ty,
            } => format!("{}{}type {name} = {};", doc_lines(docs), vis.emit(), ty.emit()),
            Decl::Impl(decl) => decl.emit(),
            Decl::Trait(decl) => decl.emit(),
            Decl::Fn(decl) => decl.emit(),
            Decl::Raw(text) => text.clone(),
        }
    }
}

impl Emit for File {
    fn emit(&self) -> String {
        let mut out = String::new();
        for doc in &self.docs {
            out.push_str("//! ");
            out.push_str(doc);
            out.push('\n');
        }
        if !self.docs.is_empty() {
            out.push('\n');
        }
        let decls: Vec<_> = self.decls.iter().map(Emit::emit).collect();
        out.push_str(&decls.join("\n\n"));
        out.push('\n');
        out
    }
}
