//! Thin builders over `jsa_common`'s diagnostic codes, phrased for the
//! situations inference actually hits (spec.md §7). Kept separate from
//! `jsa_common::diagnostic` so the message wording for each code lives
//! next to the pass that raises it instead of in the shared crate.

use jsa_common::{Code, Diagnostic, Span};

pub fn undefined_variable(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UndefinedVariable, format!("undefined variable `{name}`"), span)
}

pub fn undefined_function(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UndefinedFunction, format!("undefined function `{name}`"), span)
}

pub fn unknown_property(ty: &str, name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UnknownProperty, format!("`{ty}` has no field or method `{name}`"), span)
}

pub fn unknown_type(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UnknownType, format!("unknown type `{name}`"), span)
}

pub fn unresolved_type_path(namespace: &str, name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UnresolvedTypePath, format!("`{namespace}.{name}` does not name a type"), span)
}

pub fn duplicate_declaration(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::DuplicateDeclaration, format!("`{name}` is already declared in this scope"), span)
}

pub fn type_mismatch(expected: &str, found: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::TypeMismatch, format!("expected `{expected}`, found `{found}`"), span)
}

pub fn wrong_argument_count(name: &str, expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::WrongArgumentCount,
        format!("`{name}` expects {expected} argument(s), found {found}"),
        span,
    )
}

pub fn trait_not_implemented(trait_name: &str, ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::TraitNotImplemented, format!("`{ty}` does not implement `{trait_name}`"), span)
}

pub fn index_key_not_convertible(ty: &str, key_ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::IndexKeyNotConvertible,
        format!("`{key_ty}` cannot be used to index `{ty}`: no `From<{key_ty}>` for a usable index type"),
        span,
    )
}

pub fn index_assign_without_ref_index(ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::IndexAssignWithoutRefIndex,
        format!("`{ty}` implements `Index` but not `RefIndex`; assignment through `[]` requires `RefIndex`"),
        span,
    )
}

pub fn delete_on_non_ref(ty: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::DeleteOnNonRef, format!("`delete` requires a `ref` expression, found `{ty}`"), span)
}

pub fn missing_struct_field(struct_name: &str, field: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::MissingStructField, format!("missing field `{field}` in `{struct_name}` literal"), span)
}

pub fn missing_return(fn_name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::MissingReturn, format!("function `{fn_name}` does not return on all paths"), span)
}

pub fn format_arg_not_string_literal(span: Span) -> Diagnostic {
    Diagnostic::error(Code::FormatArgNotStringLiteral, "format string must be a string literal".to_string(), span)
}

pub fn format_placeholder_shortage(expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::FormatPlaceholderShortage,
        format!("format string has {expected} placeholder(s) but {found} argument(s) were given"),
        span,
    )
}

pub fn format_placeholder_excess(expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::warning(
        Code::FormatPlaceholderExcess,
        format!("format string has {expected} placeholder(s) but {found} argument(s) were given"),
        span,
    )
}

pub fn format_invalid_placeholder(span: Span) -> Diagnostic {
    Diagnostic::error(Code::FormatInvalidPlaceholder, "invalid `{}` placeholder in format string".to_string(), span)
}

pub fn const_circular(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::ConstCircular, format!("`{name}` depends on itself"), span)
}

pub fn const_unresolved(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::ConstUnresolved,
        format!("`{name}` could not be resolved after the maximum number of passes"),
        span,
    )
}

pub fn const_division_by_zero(span: Span) -> Diagnostic {
    Diagnostic::error(Code::ConstDivisionByZero, "division by zero in const expression".to_string(), span)
}

pub fn const_not_integer(span: Span) -> Diagnostic {
    Diagnostic::error(Code::ConstNotInteger, "const expressions must be non-negative integers".to_string(), span)
}

pub fn const_not_compile_time(span: Span) -> Diagnostic {
    Diagnostic::error(Code::ConstNotCompileTime, "expression is not valid in const position".to_string(), span)
}

pub fn unknown_enum_in_pattern(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UnknownEnumInPattern, format!("unknown enum `{name}` in `is` pattern"), span)
}

pub fn unknown_variant(enum_name: &str, variant: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::UnknownVariant, format!("`{enum_name}` has no variant `{variant}`"), span)
}

pub fn pattern_binding_count_mismatch(variant: &str, expected: usize, found: usize, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::PatternBindingCountMismatch,
        format!("`{variant}` has {expected} field(s) but the pattern binds {found}"),
        span,
    )
}

pub fn ambiguous_whole_variant_bind(variant: &str, span: Span) -> Diagnostic {
    Diagnostic::error(
        Code::AmbiguousWholeVariantBind,
        format!("`{variant}` has fields; bind each one or use `_` for the whole pattern, not a single name"),
        span,
    )
}

pub fn missing_object_type(name: &str, span: Span) -> Diagnostic {
    Diagnostic::error(Code::MissingObjectType, format!("internal: `{name}` has no registered object type at lowering"), span)
}

pub fn break_outside_loop(span: Span) -> Diagnostic {
    Diagnostic::error(Code::BreakOutsideLoop, "`break` outside of a loop".to_string(), span)
}

pub fn continue_outside_loop(span: Span) -> Diagnostic {
    Diagnostic::error(Code::ContinueOutsideLoop, "`continue` outside of a loop".to_string(), span)
}
