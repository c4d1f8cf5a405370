//! Parsed type annotations, as they appear in source before resolution.
//!
//! A `TypeHint` is what the parser hands the type checker for a `: Type`
//! annotation, a parameter type, a field type, or a `new T[n]` allocation.
//! Resolving a hint into an interned `TypeInfo` (namespaced paths included)
//! is `jsa-typeck`'s job -- see its `resolve_type_hint`.

use crate::expr::Expr;
use jsa_common::Span;

/// A type as written by the programmer.
#[derive(Debug, Clone)]
pub enum TypeHint {
    /// A bare name: `i32`, `Str`, `Point`.
    Named { name: String, span: Span },
    /// A single-level namespaced path: `termios.termios_t` (spec.md §4.E).
    /// Deeper paths (`a.b.c.Type`) are rejected by the resolver, not the AST.
    NamespacePath { namespace: String, name: String, span: Span },
    /// `ref T` / `ref mut T`.
    Ref { target: Box<TypeHint>, is_mutable: bool, span: Span },
    /// `T[]`, an array of unknown/dynamic size.
    Array { element: Box<TypeHint>, span: Span },
    /// `T[n]` where `n` is a compile-time size expression (field/array decls).
    FixedArray { element: Box<TypeHint>, size: Box<Expr>, span: Span },
}

impl TypeHint {
    pub fn span(&self) -> Span {
        match self {
            TypeHint::Named { span, .. }
            | TypeHint::NamespacePath { span, .. }
            | TypeHint::Ref { span, .. }
            | TypeHint::Array { span, .. }
            | TypeHint::FixedArray { span, .. } => *span,
        }
    }
}
