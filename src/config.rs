//! Generator configuration.
//!
//! Plain serde-deserializable structs; the file/CLI loader that produces
//! them lives outside this crate.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::ast::Visibility;

/// Which generated file to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// The type catalog.
    Types,
    /// The HTTP client.
    Client,
    /// The server adapter.
    Server,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Types => "types",
            Mode::Client => "client",
            Mode::Server => "server",
        }
    }
}

/// Access level applied to every top-level generated symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Package,
    Internal,
    Fileprivate,
    Private,
}

impl Access {
    /// Lower to the nearest Rust visibility. `Package` and `Internal`
    /// both land on `pub(crate)`: Rust has no level between crate and
    /// module.
    pub fn visibility(self) -> Visibility {
        match self {
            Access::Public => Visibility::Pub,
            Access::Package | Access::Internal => Visibility::PubCrate,
            Access::Fileprivate => Visibility::PubSuper,
            Access::Private => Visibility::Private,
        }
    }
}

/// Named feature toggles for behavior that is staged in rather than
/// always on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Deserialize)]
pub enum FeatureFlag {
    /// Base64-encoded byte containers for `format: byte` /
    /// `contentEncoding: base64`.
    #[serde(rename = "base64")]
    Base64,
    /// Body sum types when a content map declares several media types.
    /// Off: first entry wins, the rest warn.
    #[serde(rename = "multiple-content-types")]
    MultipleContentTypes,
}

/// Generator configuration for one run.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub mode: Mode,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub feature_flags: BTreeSet<FeatureFlag>,
}

impl Config {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            access: Access::default(),
            feature_flags: BTreeSet::new(),
        }
    }

    pub fn with_flag(mut self, flag: FeatureFlag) -> Self {
        self.feature_flags.insert(flag);
        self
    }

    pub fn is_enabled(&self, flag: FeatureFlag) -> bool {
        self.feature_flags.contains(&flag)
    }
}
