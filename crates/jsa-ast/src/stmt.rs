//! Statement and block nodes.

use jsa_common::Span;

use crate::expr::Expr;
use crate::item::{ConstDecl, VarDecl};

/// Opaque handle into the owning module's symbol-table arena (`jsa-typeck`).
/// `Block`, `For`, and specialized function bodies each get one scope
/// (spec.md §4.B, §4.H: "scopes from inference are reused").
pub type ScopeId = u32;

#[derive(Debug, Clone)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
    /// Populated by inference's first walk over this block, then read
    /// (never recreated) by lowering.
    pub scope: Option<ScopeId>,
}

impl Block {
    pub fn new(stmts: Vec<Stmt>, span: Span) -> Self {
        Self { stmts, span, scope: None }
    }
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Expr(Expr),
    Const(ConstDecl),
    Var(VarDecl),
    If(IfStmt),
    While(WhileStmt),
    For(ForStmt),
    Break(Span),
    Continue(Span),
    Return { value: Option<Expr>, span: Span },
    Delete { target: Expr, span: Span },
    Block(Block),
}

#[derive(Debug, Clone)]
pub struct IfStmt {
    pub cond: Expr,
    /// Pattern bindings introduced by an `is` pattern in `cond` are
    /// published onto this block's scope, not the condition's (spec.md
    /// §4.F, §9: "two-phase infer pattern-only -> publish bindings ->
    /// infer remainder").
    pub then_branch: Block,
    pub else_branch: Option<Box<ElseBranch>>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum ElseBranch {
    Block(Block),
    If(IfStmt),
}

#[derive(Debug, Clone)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct ForStmt {
    pub init: Option<Box<Stmt>>,
    pub cond: Option<Expr>,
    pub update: Option<Box<Stmt>>,
    pub body: Block,
    pub span: Span,
    /// The scope holding `init`'s binding, parent of `body`'s scope.
    pub scope: Option<ScopeId>,
}
