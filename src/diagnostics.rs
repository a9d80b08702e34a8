//! Diagnostic sink: notes, warnings, and errors emitted during
//! translation.
//!
//! Warnings are non-fatal: the offending element is skipped and the
//! traversal continues. The collector decides whether accumulated
//! diagnostics fail the build.

use std::fmt;

use tracing::{debug, warn};

/// Diagnostic severity ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Note => write!(f, "note"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A single addressed diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.severity, self.message)
    }
}

/// Receiver for diagnostics. Implementations must be append-only; the
/// translators call this and move on.
pub trait DiagnosticSink {
    fn emit(&mut self, severity: Severity, message: &str);

    fn note(&mut self, message: &str) {
        self.emit(Severity::Note, message);
    }

    fn warning(&mut self, message: &str) {
        self.emit(Severity::Warning, message);
    }

    fn error(&mut self, message: &str) {
        self.emit(Severity::Error, message);
    }
}

/// Adapts a plain `(severity, message)` callback into a sink, which is
/// the narrow interface external callers plug into.
#[derive(Debug)]
pub struct CallbackSink<F>(pub F);

impl<F: FnMut(Severity, &str)> DiagnosticSink for CallbackSink<F> {
    fn emit(&mut self, severity: Severity, message: &str) {
        (self.0)(severity, message);
    }
}

/// Retains every diagnostic and answers whether the run should fail.
#[derive(Debug, Default)]
pub struct Collector {
    diagnostics: Vec<Diagnostic>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }
}

impl DiagnosticSink for Collector {
    fn emit(&mut self, severity: Severity, message: &str) {
        match severity {
            Severity::Note => debug!(diagnostic = message, "note"),
            Severity::Warning | Severity::Error => {
                warn!(severity = %severity, diagnostic = message, "diagnostic");
            }
        }
        self.diagnostics.push(Diagnostic {
            severity,
            message: message.to_string(),
        });
    }
}

/// Forwards diagnostics at or above a severity floor to an inner sink.
#[derive(Debug)]
pub struct ThresholdSink<S> {
    floor: Severity,
    inner: S,
}

impl<S: DiagnosticSink> ThresholdSink<S> {
    pub fn new(floor: Severity, inner: S) -> Self {
        Self { floor, inner }
    }

    pub fn into_inner(self) -> S {
        self.inner
    }
}

impl<S: DiagnosticSink> DiagnosticSink for ThresholdSink<S> {
    fn emit(&mut self, severity: Severity, message: &str) {
        if severity >= self.floor {
            self.inner.emit(severity, message);
        }
    }
}
