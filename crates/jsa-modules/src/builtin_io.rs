//! The synthetic `@io` built-in module (spec.md §4.E, §6).
//!
//! `println, print, eprintln, eprint` and `format` are declared as ordinary
//! `extern`, variadic `FunctionDecl`s with no body, so the rest of the
//! loader (export collection, `TypeContext` registration via pass 1) treats
//! `@io` exactly like any other module instead of special-casing it.
//!
//! Their format-string shape -- first argument a string literal, `{}`
//! count matching the rest of the argument list -- isn't expressible as a
//! parameter type, so it's checked by [`validate_format_calls`] as a
//! dedicated pass over call sites rather than through normal arity
//! checking (which only runs for non-variadic functions).

use jsa_ast::{Expr, ExprKind, FunctionDecl, Item, Param, Program, TypeHint};
use jsa_common::{DiagnosticContext, Span};
use jsa_typeck::error;

/// The five names `import x from "@io"` makes available, and whether each
/// returns `Str` (only `format` does; the rest are `void`).
const IO_FUNCTIONS: &[(&str, bool)] = &[("println", false), ("print", false), ("eprintln", false), ("eprint", false), ("format", true)];

pub fn io_module_program() -> Program {
    let items = IO_FUNCTIONS
        .iter()
        .map(|&(name, returns_str)| {
            Item::Function(FunctionDecl {
                id: 0,
                name: name.to_string(),
                params: vec![Param { name: "fmt".to_string(), type_hint: Some(named("str")), span: Span::synthetic() }],
                return_type: returns_str.then(|| named("str")),
                body: None,
                is_variadic: true,
                is_export: true,
                is_extern: true,
                span: Span::synthetic(),
            })
        })
        .collect();
    Program::new(items)
}

fn named(name: &str) -> TypeHint {
    TypeHint::Named { name: name.to_string(), span: Span::synthetic() }
}

/// Walks every `Call` in `program`, and for each one whose callee is
/// `binding.fn_name` where `binding` is bound to the `@io` import, checks
/// that the first argument is a string literal and that its `{}` count
/// equals the remaining argument count (spec.md §4.E, §6): a shortage is
/// an error, an excess a warning.
pub fn validate_format_calls(program: &Program, io_binding: &str, diagnostics: &mut DiagnosticContext) {
    for item in &program.items {
        if let Item::Function(f) = item {
            if let Some(body) = &f.body {
                walk_block(body, io_binding, diagnostics);
            }
        }
    }
}

fn walk_block(block: &jsa_ast::Block, io_binding: &str, diagnostics: &mut DiagnosticContext) {
    for stmt in &block.stmts {
        walk_stmt(stmt, io_binding, diagnostics);
    }
}

fn walk_stmt(stmt: &jsa_ast::Stmt, io_binding: &str, diagnostics: &mut DiagnosticContext) {
    use jsa_ast::Stmt;
    match stmt {
        Stmt::Expr(e) => walk_expr(e, io_binding, diagnostics),
        Stmt::Const(c) => walk_expr(&c.init, io_binding, diagnostics),
        Stmt::Var(v) => {
            if let Some(init) = &v.init {
                walk_expr(init, io_binding, diagnostics);
            }
        }
        Stmt::If(i) => {
            walk_expr(&i.cond, io_binding, diagnostics);
            walk_block(&i.then_branch, io_binding, diagnostics);
            match &i.else_branch {
                Some(b) => match b.as_ref() {
                    jsa_ast::ElseBranch::Block(b) => walk_block(b, io_binding, diagnostics),
                    jsa_ast::ElseBranch::If(nested) => walk_stmt(&jsa_ast::Stmt::If(nested.clone()), io_binding, diagnostics),
                },
                None => {}
            }
        }
        Stmt::While(w) => {
            walk_expr(&w.cond, io_binding, diagnostics);
            walk_block(&w.body, io_binding, diagnostics);
        }
        Stmt::For(f) => {
            if let Some(init) = &f.init {
                walk_stmt(init, io_binding, diagnostics);
            }
            if let Some(cond) = &f.cond {
                walk_expr(cond, io_binding, diagnostics);
            }
            if let Some(update) = &f.update {
                walk_stmt(update, io_binding, diagnostics);
            }
            walk_block(&f.body, io_binding, diagnostics);
        }
        Stmt::Return { value: Some(v), .. } => walk_expr(v, io_binding, diagnostics),
        Stmt::Delete { target, .. } => walk_expr(target, io_binding, diagnostics),
        Stmt::Block(b) => walk_block(b, io_binding, diagnostics),
        Stmt::Return { value: None, .. } | Stmt::Break(_) | Stmt::Continue(_) => {}
    }
}

fn walk_expr(expr: &Expr, io_binding: &str, diagnostics: &mut DiagnosticContext) {
    if let ExprKind::Call { callee, args } = &expr.kind {
        if is_io_call(callee, io_binding) {
            check_format_call(args, expr.span, diagnostics);
        }
        walk_expr(callee, io_binding, diagnostics);
        for a in args {
            walk_expr(a, io_binding, diagnostics);
        }
        return;
    }
    match &expr.kind {
        ExprKind::Member { base, .. } => walk_expr(base, io_binding, diagnostics),
        ExprKind::Index { base, index } => {
            walk_expr(base, io_binding, diagnostics);
            walk_expr(index, io_binding, diagnostics);
        }
        ExprKind::Unary { operand, .. } => walk_expr(operand, io_binding, diagnostics),
        ExprKind::Binary { lhs, rhs, .. } => {
            walk_expr(lhs, io_binding, diagnostics);
            walk_expr(rhs, io_binding, diagnostics);
        }
        ExprKind::Assign { target, value } | ExprKind::CompoundAssign { target, value, .. } => {
            walk_expr(target, io_binding, diagnostics);
            walk_expr(value, io_binding, diagnostics);
        }
        ExprKind::PreIncDec { operand, .. } | ExprKind::PostIncDec { operand, .. } => walk_expr(operand, io_binding, diagnostics),
        ExprKind::NewArray { size, .. } => walk_expr(size, io_binding, diagnostics),
        ExprKind::StructLiteral { fields, .. } | ExprKind::EnumLiteral { fields, .. } => {
            for f in fields {
                walk_expr(&f.value, io_binding, diagnostics);
            }
        }
        ExprKind::IsPattern { scrutinee, .. } => walk_expr(scrutinee, io_binding, diagnostics),
        ExprKind::Paren(inner) => walk_expr(inner, io_binding, diagnostics),
        ExprKind::IntLiteral(_)
        | ExprKind::FloatLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::CStringLiteral(_)
        | ExprKind::Identifier(_) => {}
    }
}

fn is_io_call(callee: &Expr, io_binding: &str) -> bool {
    match &callee.kind {
        ExprKind::Member { base, name, .. } => {
            matches!(&base.kind, ExprKind::Identifier(n) if n == io_binding) && IO_FUNCTIONS.iter().any(|&(f, _)| f == name)
        }
        _ => false,
    }
}

fn check_format_call(args: &[Expr], span: Span, diagnostics: &mut DiagnosticContext) {
    let Some(fmt_arg) = args.first() else { return };
    let ExprKind::StringLiteral(fmt) = &fmt_arg.kind else {
        diagnostics.push(error::format_arg_not_string_literal(fmt_arg.span));
        return;
    };
    let placeholders = fmt.matches("{}").count();
    let provided = args.len() - 1;
    if placeholders > provided {
        diagnostics.push(error::format_placeholder_shortage(placeholders, provided, span));
    } else if placeholders < provided {
        diagnostics.push(error::format_placeholder_excess(placeholders, provided, span));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsa_ast::{Block, Stmt};

    fn call_stmt(fmt: &str, extra_args: usize) -> Stmt {
        let mut args = vec![Expr::new(ExprKind::StringLiteral(fmt.to_string()), Span::synthetic())];
        for i in 0..extra_args {
            args.push(Expr::new(ExprKind::IntLiteral(i as i64), Span::synthetic()));
        }
        let callee = Expr::new(
            ExprKind::Member {
                base: Box::new(Expr::new(ExprKind::Identifier("io".to_string()), Span::synthetic())),
                name: "println".to_string(),
                name_span: Span::synthetic(),
            },
            Span::synthetic(),
        );
        Stmt::Expr(Expr::new(ExprKind::Call { callee: Box::new(callee), args }, Span::synthetic()))
    }

    fn program_with(stmt: Stmt) -> Program {
        Program::new(vec![Item::Function(FunctionDecl {
            id: 0,
            name: "main".to_string(),
            params: vec![],
            return_type: None,
            body: Some(Block::new(vec![stmt], Span::synthetic())),
            is_variadic: false,
            is_export: false,
            is_extern: false,
            span: Span::synthetic(),
        })])
    }

    #[test]
    fn matching_placeholder_count_is_clean() {
        let program = program_with(call_stmt("{} and {}", 2));
        let mut diagnostics = DiagnosticContext::new();
        validate_format_calls(&program, "io", &mut diagnostics);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn shortage_is_an_error() {
        let program = program_with(call_stmt("{} {} {}", 1));
        let mut diagnostics = DiagnosticContext::new();
        validate_format_calls(&program, "io", &mut diagnostics);
        assert!(diagnostics.has_errors());
    }

    #[test]
    fn excess_is_a_warning_not_an_error() {
        let program = program_with(call_stmt("{}", 2));
        let mut diagnostics = DiagnosticContext::new();
        validate_format_calls(&program, "io", &mut diagnostics);
        assert!(!diagnostics.has_errors());
        assert_eq!(diagnostics.len(), 1);
    }

    #[test]
    fn non_literal_format_argument_is_rejected() {
        let callee = Expr::new(
            ExprKind::Member {
                base: Box::new(Expr::new(ExprKind::Identifier("io".to_string()), Span::synthetic())),
                name: "print".to_string(),
                name_span: Span::synthetic(),
            },
            Span::synthetic(),
        );
        let args = vec![Expr::new(ExprKind::Identifier("msg".to_string()), Span::synthetic())];
        let stmt = Stmt::Expr(Expr::new(ExprKind::Call { callee: Box::new(callee), args }, Span::synthetic()));
        let program = program_with(stmt);
        let mut diagnostics = DiagnosticContext::new();
        validate_format_calls(&program, "io", &mut diagnostics);
        assert!(diagnostics.has_errors());
    }
}
