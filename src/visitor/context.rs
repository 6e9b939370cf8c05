//! State threaded through lint and run passes.

use std::fmt;
use std::sync::Arc;

use rustc_hash::FxHashSet;
use serde::Serialize;

use crate::syntax::Span;
use crate::typing::{SchemaEnv, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: Span,
    pub severity: Severity,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.span, self.message)
    }
}

// Span is serialized as `{from, to}` for `--json` output.
impl Serialize for Span {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Span", 2)?;
        state.serialize_field("from", &self.from)?;
        state.serialize_field("to", &self.to)?;
        state.end()
    }
}

/// Outcome of a lint pass.
#[derive(Debug, Clone, Default)]
pub struct LintResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl LintResult {
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
    }

    /// One `path:from-to: message` line per error.
    pub fn report(&self, path: &str) -> Vec<String> {
        format_diagnostics(path, self.errors())
    }
}

pub fn format_diagnostics<'d>(
    path: &str,
    diagnostics: impl IntoIterator<Item = &'d Diagnostic>,
) -> Vec<String> {
    diagnostics
        .into_iter()
        .map(|d| format!("{path}:{d}"))
        .collect()
}

// ============================================================================
// Lint
// ============================================================================

/// Collects diagnostics without evaluating anything.
///
/// Tracks the type names declared so far, so references are checked in
/// source order.
#[derive(Debug, Default)]
pub struct LintContext {
    diagnostics: Vec<Diagnostic>,
    declared: FxHashSet<String>,
}

impl LintContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `names` already declared (types from the live graph).
    pub fn with_known(names: impl IntoIterator<Item = String>) -> Self {
        Self {
            diagnostics: Vec::new(),
            declared: names.into_iter().collect(),
        }
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.push(span, Severity::Error, message.into());
    }

    /// Reported, but does not stop the file from running.
    pub fn warning(&mut self, span: Span, message: impl Into<String>) {
        self.push(span, Severity::Warning, message.into());
    }

    fn push(&mut self, span: Span, severity: Severity, message: String) {
        self.diagnostics.push(Diagnostic {
            span,
            severity,
            message,
        });
    }

    pub fn error_count(&self) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count()
    }

    pub fn declare(&mut self, name: &str) {
        self.declared.insert(name.to_string());
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.declared.contains(name)
    }

    pub fn finish(self) -> LintResult {
        LintResult {
            diagnostics: self.diagnostics,
        }
    }
}

// ============================================================================
// Run
// ============================================================================

/// Loads the types another schema module exports.
pub trait ImportResolver {
    fn resolve(&mut self, path: &str) -> Result<SchemaEnv, String>;
}

/// Evaluation state: the types built so far plus run-time diagnostics.
pub struct RunContext<'r> {
    env: SchemaEnv,
    diagnostics: Vec<Diagnostic>,
    resolver: Option<&'r mut dyn ImportResolver>,
}

impl Default for RunContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'r> RunContext<'r> {
    pub fn new() -> Self {
        Self {
            env: SchemaEnv::new(),
            diagnostics: Vec::new(),
            resolver: None,
        }
    }

    pub fn with_resolver(resolver: &'r mut dyn ImportResolver) -> Self {
        Self {
            resolver: Some(resolver),
            ..Self::new()
        }
    }

    /// Seed the environment (types visible without importing).
    pub fn with_env(mut self, env: SchemaEnv) -> Self {
        self.env = env;
        self
    }

    pub fn env(&self) -> &SchemaEnv {
        &self.env
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Type>> {
        self.env.get(name).cloned()
    }

    /// Bind `name`; an existing binding is kept.
    pub fn define(&mut self, name: &str, ty: Arc<Type>) {
        self.env.entry(name.to_string()).or_insert(ty);
    }

    pub fn import(&mut self, path: &str) -> Result<SchemaEnv, String> {
        match self.resolver.as_deref_mut() {
            Some(resolver) => resolver.resolve(path),
            None => Err(format!("Cannot import {path}: imports are not available here")),
        }
    }

    pub fn error(&mut self, span: Span, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            span,
            severity: Severity::Error,
            message: message.into(),
        });
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_env(self) -> SchemaEnv {
        self.env
    }
}
