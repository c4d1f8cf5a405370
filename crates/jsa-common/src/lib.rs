//! Shared types used across every `jsa` compiler crate: source spans and
//! the diagnostic sink. No compiler logic lives here -- see `jsa-typeck`,
//! `jsa-modules`, and `jsa-codegen` for that.

pub mod diagnostic;
pub mod span;

pub use diagnostic::{Code, Diagnostic, DiagnosticContext, Severity};
pub use span::Span;
