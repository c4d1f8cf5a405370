//! The shared diagnostic sink.
//!
//! Every pass in every crate — name resolution, type checking, const
//! evaluation, pattern matching, lowering — reports through one
//! [`DiagnosticContext`] rather than failing fast. This lets a single
//! compile surface every problem it can find instead of stopping at the
//! first one (spec.md §5, §7).

use std::fmt;

use crate::span::Span;

/// Stable, documented diagnostic codes (spec.md §6, §7).
///
/// Codes are grouped by the error taxonomy in spec.md §7: name resolution
/// (`E1xx`), type checking (`E2xx`), format-string validation (`E301`-
/// `E304`, fixed by spec.md §6), const evaluation (`E4xx`), pattern
/// matching (`E5xx`), and lowering invariants (`E9xx`, fatal).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub enum Code {
    // ── Name resolution ──────────────────────────────────────────
    UndefinedVariable,
    UndefinedFunction,
    UnknownProperty,
    UnknownType,
    UnresolvedTypePath,
    CyclicImport,
    DuplicateDeclaration,

    // ── Type checking ────────────────────────────────────────────
    TypeMismatch,
    WrongArgumentCount,
    TraitNotImplemented,
    IndexKeyNotConvertible,
    IndexAssignWithoutRefIndex,
    DeleteOnNonRef,
    MissingStructField,
    MissingReturn,

    // ── Format-string validation (spec.md §6) ────────────────────
    FormatArgNotStringLiteral,
    FormatPlaceholderShortage,
    FormatPlaceholderExcess,
    FormatInvalidPlaceholder,

    // ── Const evaluation ─────────────────────────────────────────
    ConstCircular,
    ConstUnresolved,
    ConstDivisionByZero,
    ConstNotInteger,
    ConstNotCompileTime,

    // ── Pattern matching ─────────────────────────────────────────
    UnknownEnumInPattern,
    UnknownVariant,
    PatternBindingCountMismatch,
    AmbiguousWholeVariantBind,

    // ── Lowering invariants (fatal to codegen) ───────────────────
    MissingObjectType,
    BreakOutsideLoop,
    ContinueOutsideLoop,
}

impl Code {
    /// The stable string the driver prints / puts in JSON output, e.g. `"E201"`.
    pub fn as_str(&self) -> &'static str {
        use Code::*;
        match self {
            UndefinedVariable => "E101",
            UndefinedFunction => "E102",
            UnknownProperty => "E103",
            UnknownType => "E104",
            UnresolvedTypePath => "E105",
            CyclicImport => "E106",
            DuplicateDeclaration => "E107",

            TypeMismatch => "E201",
            WrongArgumentCount => "E202",
            TraitNotImplemented => "E203",
            IndexKeyNotConvertible => "E204",
            IndexAssignWithoutRefIndex => "E205",
            DeleteOnNonRef => "E206",
            MissingStructField => "E207",
            MissingReturn => "E208",

            FormatArgNotStringLiteral => "E301",
            FormatPlaceholderShortage => "E302",
            FormatPlaceholderExcess => "E303",
            FormatInvalidPlaceholder => "E304",

            ConstCircular => "E401",
            ConstUnresolved => "E402",
            ConstDivisionByZero => "E403",
            ConstNotInteger => "E404",
            ConstNotCompileTime => "E405",

            UnknownEnumInPattern => "E501",
            UnknownVariant => "E502",
            PatternBindingCountMismatch => "E503",
            AmbiguousWholeVariantBind => "E504",

            MissingObjectType => "E901",
            BreakOutsideLoop => "E902",
            ContinueOutsideLoop => "E903",
        }
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Whether a diagnostic stops compilation from reaching lowering.
///
/// `FormatPlaceholderExcess` is the one documented warning (spec.md §6:
/// "an excess of arguments is a warning, shortage is an error"); the
/// inference and const-eval iteration caps are the other warning sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub enum Severity {
    Error,
    Warning,
}

/// One reported problem, with enough context to render a snippet.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Diagnostic {
    pub code: Code,
    pub severity: Severity,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
}

impl Diagnostic {
    pub fn error(code: Code, message: impl Into<String>, span: Span) -> Self {
        Self { code, severity: Severity::Error, message: message.into(), span, notes: Vec::new() }
    }

    pub fn warning(code: Code, message: impl Into<String>, span: Span) -> Self {
        Self { code, severity: Severity::Warning, message: message.into(), span, notes: Vec::new() }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.code, self.span, self.message)
    }
}

/// The append-only sink every pass reports diagnostics through.
///
/// One `DiagnosticContext` is shared across every module in a
/// `ModuleRegistry` (spec.md §5): passes keep running and accumulating
/// diagnostics after an error, and only the transition into lowering
/// checks [`DiagnosticContext::has_errors`].
#[derive(Debug, Default)]
pub struct DiagnosticContext {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
    }

    pub fn error(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::error(code, message, span));
    }

    pub fn warning(&mut self, code: Code, message: impl Into<String>, span: Span) {
        self.push(Diagnostic::warning(code, message, span));
    }

    /// Gates the transition from type inference to lowering (spec.md §5, §7).
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.severity == Severity::Error)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn warnings_do_not_gate_lowering() {
        let mut ctx = DiagnosticContext::new();
        ctx.warning(Code::FormatPlaceholderExcess, "extra argument", Span::new(0, 1));
        assert!(!ctx.has_errors());
    }

    #[test]
    fn errors_gate_lowering() {
        let mut ctx = DiagnosticContext::new();
        ctx.error(Code::TypeMismatch, "expected i32, found str", Span::new(0, 1));
        assert!(ctx.has_errors());
    }

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(Code::TypeMismatch.as_str(), "E201");
        assert_eq!(Code::FormatArgNotStringLiteral.as_str(), "E301");
    }
}
