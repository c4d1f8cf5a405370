//! Expression nodes.
//!
//! Each [`Expr`] carries a `type_info` slot the inference engine fills in
//! (spec.md §4.F, §8 invariant 1). It starts `None` and is mutated in
//! place as passes run; by the time lowering sees the tree it must be
//! `Some` on every node or inference has a bug.

use jsa_common::Span;

use crate::ty_hint::TypeHint;

/// Opaque handle into the owning module's `TypeContext` arena (`jsa-typeck`).
/// The AST never stores a `TypeInfo` directly -- only this index -- so that
/// the arena, not the tree, owns type identity (spec.md §9 design notes).
pub type TypeId = u32;

#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub type_info: Option<TypeId>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span, type_info: None }
    }
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    IntLiteral(i64),
    FloatLiteral(f64),
    BoolLiteral(bool),
    StringLiteral(String),
    CStringLiteral(String),
    Identifier(String),

    /// `base.name` -- may resolve to a namespace symbol access
    /// (`m.Symbol`), a struct field, or an enum/struct static reference,
    /// depending on what `base` resolves to. Disambiguated during
    /// inference, not parsing (spec.md §4.F: `analyze_call_sites`).
    Member { base: Box<Expr>, name: String, name_span: Span },

    Index { base: Box<Expr>, index: Box<Expr> },

    /// A direct or resolved call: `f(args)`, `m.f(args)`, `Type.method(args)`,
    /// `obj.method(args)`. The callee is an arbitrary expression so that
    /// `Member` resolution and call-site analysis can stay in inference.
    Call { callee: Box<Expr>, args: Vec<Expr> },

    Unary { op: UnaryOp, operand: Box<Expr>, op_span: Span },
    Binary { op: BinaryOp, lhs: Box<Expr>, rhs: Box<Expr>, op_span: Span },

    Assign { target: Box<Expr>, value: Box<Expr> },
    CompoundAssign { op: CompoundOp, target: Box<Expr>, value: Box<Expr>, op_span: Span },
    PreIncDec { op: IncDecOp, operand: Box<Expr> },
    PostIncDec { op: IncDecOp, operand: Box<Expr> },

    /// `new T[n]` -- heap array allocation.
    NewArray { element: TypeHint, size: Box<Expr> },

    /// `{ a: 1, b: 2 }`, a struct literal. `type_hint` is `None` when the
    /// literal relies on contextual typing from a `var` declaration
    /// (spec.md §4.F pass 2-4 step 1: "contextual typing for object
    /// literals matching a struct hint").
    StructLiteral { type_hint: Option<String>, fields: Vec<StructLiteralField>, span: Span },

    /// `Msg.Pong(n: 3)` -- an enum variant constructor.
    EnumLiteral { enum_name: String, variant_name: String, fields: Vec<StructLiteralField> },

    /// `expr is EnumName.Variant(let a, _)` (spec.md §4.F pattern contract).
    IsPattern { scrutinee: Box<Expr>, pattern: EnumPattern },

    Paren(Box<Expr>),
}

#[derive(Debug, Clone)]
pub struct StructLiteralField {
    pub name: String,
    pub value: Expr,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub struct EnumPattern {
    pub enum_name: String,
    pub variant_name: String,
    pub bindings: Vec<PatternBinding>,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum PatternBinding {
    Wildcard,
    Bind { name: String, span: Span },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    /// Short-circuit `&&` -- not a trait, lowered to a basic-block diamond
    /// (spec.md §4.C, §4.H).
    LogAnd,
    /// Short-circuit `||`.
    LogOr,
}

impl BinaryOp {
    /// The operator names trait dispatch is keyed on (spec.md §4.C).
    /// Returns `None` for `&&`/`||`, which never reach trait dispatch.
    pub fn trait_method(&self) -> Option<(&'static str, &'static str)> {
        use BinaryOp::*;
        match self {
            Add => Some(("Add", "add")),
            Sub => Some(("Sub", "sub")),
            Mul => Some(("Mul", "mul")),
            Div => Some(("Div", "div")),
            Rem => Some(("Rem", "rem")),
            BitAnd => Some(("BitAnd", "bitand")),
            BitOr => Some(("BitOr", "bitor")),
            BitXor => Some(("BitXor", "bitxor")),
            Shl => Some(("Shl", "shl")),
            Shr => Some(("Shr", "shr")),
            Eq => Some(("Eq", "eq")),
            Ne => Some(("Eq", "ne")),
            Lt => Some(("Ord", "lt")),
            Le => Some(("Ord", "le")),
            Gt => Some(("Ord", "gt")),
            Ge => Some(("Ord", "ge")),
            LogAnd | LogOr => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompoundOp {
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
}

impl CompoundOp {
    pub fn trait_method(&self) -> (&'static str, &'static str) {
        match self {
            CompoundOp::AddAssign => ("AddAssign", "add_assign"),
            CompoundOp::SubAssign => ("SubAssign", "sub_assign"),
            CompoundOp::MulAssign => ("MulAssign", "mul_assign"),
            CompoundOp::DivAssign => ("DivAssign", "div_assign"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncDecOp {
    Inc,
    Dec,
}
