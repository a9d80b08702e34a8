//! Name mangling: arbitrary OpenAPI strings to valid Rust identifiers.
//!
//! The special-character spelling table is fixed and reproduced verbatim
//! for compatibility; changing a spelling changes every downstream
//! identifier.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// Rust reserved words that cannot be used as raw identifiers here.
/// Covers strict, reserved, and weak keywords.
static RUST_RESERVED_WORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        "as", "break", "const", "continue", "crate", "dyn", "else", "enum", "extern", "false",
        "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut", "pub",
        "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true", "type",
        "unsafe", "use", "where", "while", "async", "await", "abstract", "become", "box", "do",
        "final", "macro", "override", "priv", "typeof", "unsized", "virtual", "yield", "try",
        "gen", "union", "raw", "macro_rules",
    ]
    .into_iter()
    .collect()
});

/// Spelling for a character outside `[A-Za-z0-9_]`. The table follows the
/// HTML entity names of the characters.
fn spell(c: char) -> Option<&'static str> {
    let spelled = match c {
        '-' => "_hyphen_",
        '.' => "_period_",
        '$' => "_dollar_",
        '/' => "_sol_",
        ' ' => "_space_",
        '!' => "_excl_",
        '"' => "_quot_",
        '#' => "_num_",
        '%' => "_percnt_",
        '&' => "_amp_",
        '\'' => "_apos_",
        '(' => "_lpar_",
        ')' => "_rpar_",
        '*' => "_ast_",
        '+' => "_plus_",
        ',' => "_comma_",
        ':' => "_colon_",
        ';' => "_semi_",
        '<' => "_lt_",
        '=' => "_equals_",
        '>' => "_gt_",
        '?' => "_quest_",
        '@' => "_commat_",
        '[' => "_lsqb_",
        '\\' => "_bsol_",
        ']' => "_rsqb_",
        '^' => "_hat_",
        '`' => "_grave_",
        '{' => "_lcub_",
        '|' => "_verbar_",
        '}' => "_rcub_",
        '~' => "_tilde_",
        _ => return None,
    };
    Some(spelled)
}

/// Mangle an arbitrary string into a valid Rust identifier. Pure and
/// deterministic; never returns the empty string.
pub fn mangle(input: &str) -> String {
    if input.is_empty() {
        return "_empty".to_string();
    }

    let mut result = String::with_capacity(input.len());
    for c in input.chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            result.push(c);
        } else if let Some(spelled) = spell(c) {
            result.push_str(spelled);
        } else {
            // Any character without a spelling falls back to its hex
            // scalar value so that distinct inputs stay distinct.
            let _ = write!(result, "_x{:X}_", c as u32);
        }
    }

    if result
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_digit())
    {
        result.insert(0, '_');
    }

    if RUST_RESERVED_WORDS.contains(result.as_str()) {
        result.insert(0, '_');
    }

    result
}

/// One identifier namespace. Mangled names are claimed in declaration
/// order; a collision gets a numeric suffix as a last resort.
#[derive(Debug, Default)]
pub struct Namespace {
    claimed: HashSet<String>,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a unique identifier for `input`. Returns the mangled name,
    /// suffixed with `_2`, `_3`, ... if an earlier claim already took it.
    pub fn claim(&mut self, input: &str) -> String {
        let base = mangle(input);
        if self.claimed.insert(base.clone()) {
            return base;
        }
        let mut n: u32 = 2;
        loop {
            let candidate = format!("{base}_{n}");
            if self.claimed.insert(candidate.clone()) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Whether a mangled identifier is already taken.
    pub fn contains(&self, identifier: &str) -> bool {
        self.claimed.contains(identifier)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_identifiers_pass_through() {
        assert_eq!(mangle("foo"), "foo");
        assert_eq!(mangle("Foo_Bar"), "Foo_Bar");
        assert_eq!(mangle("snake_case_123"), "snake_case_123");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(mangle(""), "_empty");
    }

    #[test]
    fn test_special_character_spellings() {
        assert_eq!(mangle("a-b"), "a_hyphen_b");
        assert_eq!(mangle("a.b"), "a_period_b");
        assert_eq!(mangle("$ref"), "_dollar_ref");
        assert_eq!(mangle("a/b"), "a_sol_b");
        assert_eq!(mangle("x-log-type"), "x_hyphen_log_hyphen_type");
        assert_eq!(mangle("application/json; foo=bar"),
            "application_sol_json_semi__space_foo_equals_bar");
    }

    #[test]
    fn test_leading_digit() {
        assert_eq!(mangle("1foo"), "_1foo");
        assert_eq!(mangle("200"), "_200");
    }

    #[test]
    fn test_reserved_words() {
        assert_eq!(mangle("type"), "_type");
        assert_eq!(mangle("self"), "_self");
        assert_eq!(mangle("fn"), "_fn");
        assert_eq!(mangle("async"), "_async");
        assert_eq!(mangle("enum"), "_enum");
        assert_eq!(mangle("not_reserved"), "not_reserved");
    }

    #[test]
    fn test_unspelled_character_hex_fallback() {
        assert_eq!(mangle("caf\u{e9}"), "caf_xE9_");
        assert_ne!(mangle("a\u{1F600}"), mangle("a\u{1F601}"));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(mangle("x-rate-limit"), mangle("x-rate-limit"));
    }

    #[test]
    fn test_namespace_suffixes_collisions() {
        let mut ns = Namespace::new();
        assert_eq!(ns.claim("a-b"), "a_hyphen_b");
        // "a.b" would not collide; "a_hyphen_b" itself does.
        assert_eq!(ns.claim("a_hyphen_b"), "a_hyphen_b_2");
        assert_eq!(ns.claim("a_hyphen_b"), "a_hyphen_b_3");
    }

    #[test]
    fn test_namespace_distinct_names_unsuffixed() {
        let mut ns = Namespace::new();
        assert_eq!(ns.claim("foo"), "foo");
        assert_eq!(ns.claim("bar"), "bar");
        assert!(ns.contains("foo"));
        assert!(!ns.contains("baz"));
    }
}
