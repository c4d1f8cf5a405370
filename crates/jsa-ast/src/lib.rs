//! The AST node catalog consumed by every other `jsa` compiler crate.
//!
//! Constructing this tree from source text is the parser's job and is out
//! of scope for this workspace (spec.md §1) -- the parser is assumed to
//! produce a [`item::Program`] with every node's `span` populated and
//! every declaration's id assigned via [`item::Program::assign_ids`].
//! What lives here is the shape later passes agree on.

pub mod expr;
pub mod item;
pub mod stmt;
pub mod ty_hint;

pub use expr::{BinaryOp, CompoundOp, Expr, ExprKind, IncDecOp, TypeId, UnaryOp};
pub use item::{
    ConstDecl, EnumDecl, FieldDecl, FunctionDecl, Item, ItemId, Param, Program, StructDecl,
    VarDecl, VariantDecl, ImportDecl,
};
pub use stmt::{Block, ElseBranch, ForStmt, IfStmt, ScopeId, Stmt, WhileStmt};
pub use ty_hint::TypeHint;
