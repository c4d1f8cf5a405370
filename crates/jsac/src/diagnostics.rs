//! Diagnostic rendering: human-readable snippets via `ariadne`, or
//! machine-readable JSON for editor/CI integration (spec.md §3, §4.F).
//!
//! `jsa-common`/`jsa-typeck`/`jsa-modules`/`jsa-codegen` only ever push
//! [`jsa_common::Diagnostic`] values into a shared sink; rendering them to
//! a terminal or to stdout-as-JSON is entirely this driver's job.

use ariadne::{Label, Report, ReportKind, Source};

use jsa_common::{Diagnostic, DiagnosticContext, Severity};

pub fn render_text(diagnostics: &DiagnosticContext, source: &str, _file_name: &str) {
    for diagnostic in diagnostics.iter() {
        let kind = match diagnostic.severity {
            Severity::Error => ReportKind::Error,
            Severity::Warning => ReportKind::Warning,
        };
        let start = diagnostic.span.start as usize;
        let end = (diagnostic.span.end as usize).max(start + 1);
        let mut builder = Report::<std::ops::Range<usize>>::build(kind, start..end)
            .with_code(diagnostic.code.as_str())
            .with_message(&diagnostic.message)
            .with_label(Label::new(start..end).with_message(&diagnostic.message));
        for note in &diagnostic.notes {
            builder = builder.with_note(note);
        }
        let _ = builder.finish().eprint(Source::from(source));
    }
}

pub fn render_json(diagnostics: &DiagnosticContext) -> String {
    let all: Vec<&Diagnostic> = diagnostics.iter().collect();
    serde_json::to_string_pretty(&all).unwrap_or_else(|_| "[]".to_string())
}
