//! End-to-end tests for `infer_program`: hand-built `Program`s run through
//! the whole pass pipeline, checked against the rendered diagnostic text
//! (spec.md §4.F, §7). `jsa-typeck` has no parser of its own (spec.md §1
//! scopes parsing out), so every fixture here is an AST built directly
//! rather than source text -- there is no `jsac`/`jsa-modules` source to
//! parse from in this crate.

use jsa_ast::{
    Block, ConstDecl, Expr, ExprKind, FieldDecl, FunctionDecl, ImportDecl, Item, Param, Program,
    Stmt, StructDecl, StructLiteralField, TypeHint,
};
use jsa_common::{DiagnosticContext, Span};
use jsa_typeck::{infer_program, ImportedExport, SymbolTable, TraitRegistry, TypeContext};

fn span() -> Span {
    Span::new(0, 1)
}

fn named(name: &str) -> TypeHint {
    TypeHint::Named { name: name.to_string(), span: span() }
}

fn ident(name: &str) -> Expr {
    Expr::new(ExprKind::Identifier(name.to_string()), span())
}

/// Runs `infer_program` over `items` with no imports and returns every
/// diagnostic it raised, rendered through `Diagnostic`'s own `Display`
/// impl (the same text the CLI prints).
fn check(items: Vec<Item>) -> Vec<String> {
    check_with_imports(items, &[])
}

fn check_with_imports(items: Vec<Item>, imports: &[ImportedExport]) -> Vec<String> {
    let mut program = Program::new(items);
    let mut ctx = TypeContext::new();
    let mut traits = TraitRegistry::new();
    let mut symbols = SymbolTable::new();
    let mut diagnostics = DiagnosticContext::new();
    infer_program(&mut program, &mut ctx, &mut traits, &mut symbols, &mut diagnostics, imports);
    diagnostics.iter().map(|d| d.to_string()).collect()
}

fn void_fn(name: &str, body: Vec<Stmt>) -> FunctionDecl {
    FunctionDecl {
        id: 0,
        name: name.to_string(),
        params: vec![],
        return_type: Some(named("void")),
        body: Some(Block::new(body, span())),
        is_variadic: false,
        is_export: false,
        is_extern: false,
        span: span(),
    }
}

// ── Name resolution ──────────────────────────────────────────────────

#[test]
fn calling_an_undefined_function_is_reported() {
    let call = Expr::new(ExprKind::Call { callee: Box::new(ident("ghost")), args: vec![] }, span());
    let main = void_fn("main", vec![Stmt::Expr(call)]);

    let diags = check(vec![Item::Function(main)]);

    assert_eq!(diags, vec!["E102 [0..1] undefined function `ghost`".to_string()]);
}

#[test]
fn referencing_an_undefined_variable_is_reported() {
    let main = void_fn("main", vec![Stmt::Expr(ident("ghost"))]);

    let diags = check(vec![Item::Function(main)]);

    assert_eq!(diags, vec!["E101 [0..1] undefined variable `ghost`".to_string()]);
}

// ── Struct literals ──────────────────────────────────────────────────

#[test]
fn struct_literal_missing_a_required_field_is_reported() {
    let point = StructDecl {
        id: 0,
        name: "Point".to_string(),
        fields: vec![
            FieldDecl { name: "x".to_string(), type_hint: named("i32"), array_size: None, default: None, span: span() },
            FieldDecl { name: "y".to_string(), type_hint: named("i32"), array_size: None, default: None, span: span() },
        ],
        methods: vec![],
        is_export: false,
        span: span(),
    };
    let literal = Expr::new(
        ExprKind::StructLiteral {
            type_hint: Some("Point".to_string()),
            fields: vec![StructLiteralField { name: "x".to_string(), value: Expr::new(ExprKind::IntLiteral(1), span()), span: span() }],
            span: span(),
        },
        span(),
    );
    let main = void_fn("main", vec![Stmt::Expr(literal)]);

    let diags = check(vec![Item::Struct(point), Item::Function(main)]);

    assert_eq!(diags, vec!["E207 [0..1] missing field `y` in `Point` literal".to_string()]);
}

#[test]
fn fully_populated_struct_literal_is_clean() {
    let point = StructDecl {
        id: 0,
        name: "Point".to_string(),
        fields: vec![FieldDecl { name: "x".to_string(), type_hint: named("i32"), array_size: None, default: None, span: span() }],
        methods: vec![],
        is_export: false,
        span: span(),
    };
    let literal = Expr::new(
        ExprKind::StructLiteral {
            type_hint: Some("Point".to_string()),
            fields: vec![StructLiteralField { name: "x".to_string(), value: Expr::new(ExprKind::IntLiteral(1), span()), span: span() }],
            span: span(),
        },
        span(),
    );
    let main = void_fn("main", vec![Stmt::Expr(literal)]);

    let diags = check(vec![Item::Struct(point), Item::Function(main)]);

    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
}

// ── Const evaluation ─────────────────────────────────────────────────

#[test]
fn a_const_defined_in_terms_of_another_const_resolves() {
    let base = ConstDecl { id: 0, name: "BASE".to_string(), array_size: None, type_hint: None, init: Expr::new(ExprKind::IntLiteral(2), span()), is_export: false, span: span() };
    let derived = ConstDecl {
        id: 0,
        name: "DOUBLE".to_string(),
        array_size: None,
        type_hint: None,
        init: Expr::new(
            ExprKind::Binary { op: jsa_ast::BinaryOp::Mul, lhs: Box::new(ident("BASE")), rhs: Box::new(Expr::new(ExprKind::IntLiteral(2), span())), op_span: span() },
            span(),
        ),
        is_export: false,
        span: span(),
    };

    let diags = check(vec![Item::Const(base), Item::Const(derived)]);

    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
}

#[test]
fn a_self_referential_const_is_a_circular_dependency_not_an_unresolved_one() {
    let a = ConstDecl {
        id: 0,
        name: "A".to_string(),
        array_size: None,
        type_hint: None,
        init: Expr::new(
            ExprKind::Binary { op: jsa_ast::BinaryOp::Add, lhs: Box::new(ident("A")), rhs: Box::new(Expr::new(ExprKind::IntLiteral(1), span())), op_span: span() },
            span(),
        ),
        is_export: false,
        span: span(),
    };

    let diags = check(vec![Item::Const(a)]);

    assert_eq!(diags, vec!["E401 [0..1] `A` depends on itself".to_string()]);
}

// ── Cross-module namespaced calls (spec.md §4.E, §8 S3) ─────────────

#[test]
fn a_namespaced_call_to_an_imported_function_is_clean() {
    let io_println = FunctionDecl {
        id: 0,
        name: "println".to_string(),
        params: vec![Param { name: "fmt".to_string(), type_hint: Some(named("str")), span: span() }],
        return_type: None,
        body: None,
        is_variadic: true,
        is_export: true,
        is_extern: true,
        span: span(),
    };
    let import_decl = ImportDecl { id: 0, binding_name: "io".to_string(), path: "@io".to_string(), imported_module: Some(1), span: span() };
    let call = Expr::new(
        ExprKind::Call {
            callee: Box::new(Expr::new(ExprKind::Member { base: Box::new(ident("io")), name: "println".to_string(), name_span: span() }, span())),
            args: vec![Expr::new(ExprKind::StringLiteral("hi".to_string()), span())],
        },
        span(),
    );
    let main = void_fn("main", vec![Stmt::Expr(call)]);

    let imports = vec![ImportedExport { binding_name: "io", func: &io_println, link_name: "println".to_string() }];
    let diags = check_with_imports(vec![Item::Import(import_decl), Item::Function(main)], &imports);

    assert!(diags.is_empty(), "unexpected diagnostics: {diags:?}");
}

#[test]
fn calling_a_function_an_import_never_exported_is_still_reported() {
    let import_decl = ImportDecl { id: 0, binding_name: "io".to_string(), path: "@io".to_string(), imported_module: Some(1), span: span() };
    let call = Expr::new(
        ExprKind::Call {
            callee: Box::new(Expr::new(ExprKind::Member { base: Box::new(ident("io")), name: "nope".to_string(), name_span: span() }, span())),
            args: vec![],
        },
        span(),
    );
    let main = void_fn("main", vec![Stmt::Expr(call)]);

    // No `ImportedExport` registered for `io.nope`: dispatch still fails,
    // it just fails against the qualified name instead of a bare one.
    let diags = check_with_imports(vec![Item::Import(import_decl), Item::Function(main)], &[]);

    assert_eq!(diags, vec!["E102 [0..1] undefined function `io.nope`".to_string()]);
}
