//! Const expression evaluator -- component D (spec.md §3, §4.D).
//!
//! Evaluates the expressions legal in const position (array-size hints,
//! `const` initializers) down to an `i64`, the only shape Pass 0's
//! fixed-point needs: a resolved array size or a resolved const value.
//! Tri-state result instead of a plain `Result` because "not ready yet"
//! (`Waiting`) and "not ready and never will be on its own" (`Cycle`) are
//! distinct outcomes the caller's fixed-point loop reacts to differently
//! (spec.md §4.D): `Waiting` means try again next iteration, `Cycle`
//! means stop retrying and emit a diagnostic now.

use std::collections::HashSet;

use jsa_ast::{BinaryOp, Expr, ExprKind, ItemId};
use jsa_common::Span;

/// Evaluation stack depth cap (spec.md §4.D), shared with the identity
/// set used for cycle detection.
pub const MAX_EVAL_DEPTH: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalResult {
    Success(i64),
    /// A dependency (another const) hasn't been resolved yet this pass;
    /// retry on the next fixed-point iteration.
    Waiting(Span, String),
    /// A dependency cycle was detected by node identity; retrying will
    /// not help.
    Cycle(Span, String),
    /// The expression isn't valid in const position at all.
    Error(Span, String),
}

/// Resolves identifiers that appear in const position to an already-known
/// value. `infer.rs`'s Pass 0 implements this over the module's constant
/// declarations.
pub trait ConstLookup {
    /// Returns the resolved value for `name` if its declaration has
    /// already been evaluated this pass, and the declaring node's id for
    /// cycle detection regardless of whether it has.
    fn resolve(&self, name: &str) -> Option<ConstRef>;
}

pub struct ConstRef {
    pub decl: ItemId,
    pub value: Option<i64>,
}

/// One evaluation call, with its own identity stack so concurrent
/// evaluations (one per const in Pass 0's worklist) don't share state.
pub struct Evaluator<'a, L: ConstLookup> {
    lookup: &'a L,
    stack: Vec<ItemId>,
}

impl<'a, L: ConstLookup> Evaluator<'a, L> {
    pub fn new(lookup: &'a L) -> Self {
        Self { lookup, stack: Vec::new() }
    }

    /// Marks `decl` as being evaluated, so a self-reference reached while
    /// evaluating its own initializer is caught by `eval_identifier`'s
    /// `.contains()` check. The caller must pair this with [`Self::leave`]
    /// once the initializer has been fully evaluated.
    pub fn enter(&mut self, decl: ItemId) {
        self.stack.push(decl);
    }

    pub fn leave(&mut self) {
        self.stack.pop();
    }

    pub fn eval(&mut self, expr: &Expr) -> EvalResult {
        match &expr.kind {
            ExprKind::IntLiteral(n) => {
                if *n < 0 {
                    EvalResult::Error(expr.span, "const expressions must be non-negative integers".into())
                } else {
                    EvalResult::Success(*n)
                }
            }
            ExprKind::Identifier(name) => self.eval_identifier(expr.span, name),
            ExprKind::Paren(inner) => self.eval(inner),
            ExprKind::Unary { op, operand, .. } => {
                let v = match self.eval(operand) {
                    EvalResult::Success(v) => v,
                    other => return other,
                };
                match op {
                    jsa_ast::UnaryOp::Neg => {
                        let negated = -v;
                        if negated < 0 {
                            EvalResult::Error(expr.span, "const expressions must be non-negative integers".into())
                        } else {
                            EvalResult::Success(negated)
                        }
                    }
                    jsa_ast::UnaryOp::Not => EvalResult::Error(expr.span, "`!` is not valid in const position".into()),
                }
            }
            ExprKind::Binary { op, lhs, rhs, .. } => self.eval_binary(expr.span, *op, lhs, rhs),
            _ => EvalResult::Error(expr.span, "expression is not valid in const position".into()),
        }
    }

    fn eval_identifier(&mut self, span: Span, name: &str) -> EvalResult {
        let Some(const_ref) = self.lookup.resolve(name) else {
            return EvalResult::Error(span, format!("`{name}` is not a const in scope"));
        };
        if self.stack.contains(&const_ref.decl) {
            return EvalResult::Cycle(span, format!("`{name}` depends on itself"));
        }
        match const_ref.value {
            Some(v) => EvalResult::Success(v),
            None => EvalResult::Waiting(span, format!("`{name}` is not resolved yet")),
        }
    }

    fn eval_binary(&mut self, span: Span, op: BinaryOp, lhs: &Expr, rhs: &Expr) -> EvalResult {
        if self.stack.len() >= MAX_EVAL_DEPTH {
            return EvalResult::Cycle(span, "const expression nesting exceeded the evaluator's depth limit".into());
        }
        let l = match self.eval(lhs) {
            EvalResult::Success(v) => v,
            other => return other,
        };
        let r = match self.eval(rhs) {
            EvalResult::Success(v) => v,
            other => return other,
        };
        match op {
            BinaryOp::Add => EvalResult::Success(l + r),
            BinaryOp::Sub => EvalResult::Success(l - r),
            BinaryOp::Mul => EvalResult::Success(l * r),
            BinaryOp::Div => {
                if r == 0 {
                    EvalResult::Error(span, "division by zero in const expression".into())
                } else {
                    EvalResult::Success(l / r)
                }
            }
            BinaryOp::Rem => {
                if r == 0 {
                    EvalResult::Error(span, "modulo by zero in const expression".into())
                } else {
                    EvalResult::Success(l % r)
                }
            }
            _ => EvalResult::Error(span, "operator is not valid in const position".into()),
        }
    }
}

/// Identity-based cycle detection across Pass 0's whole worklist, not
/// just one evaluation call: records every node visited this fixed-point
/// iteration so a cycle spanning two different `eval` invocations (e.g.
/// `const A = B; const B = A;`) is still caught (spec.md §4.D).
#[derive(Debug, Default)]
pub struct CycleGuard {
    visiting: HashSet<ItemId>,
}

impl CycleGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, decl: ItemId) -> bool {
        self.visiting.insert(decl)
    }

    pub fn leave(&mut self, decl: ItemId) {
        self.visiting.remove(&decl);
    }

    pub fn is_visiting(&self, decl: ItemId) -> bool {
        self.visiting.contains(&decl)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsa_common::Span;

    struct FixedLookup {
        value: Option<i64>,
        decl: ItemId,
    }

    impl ConstLookup for FixedLookup {
        fn resolve(&self, _name: &str) -> Option<ConstRef> {
            Some(ConstRef { decl: self.decl, value: self.value })
        }
    }

    fn span() -> Span {
        Span::new(0, 1)
    }

    #[test]
    fn positive_int_literal_succeeds() {
        let lookup = FixedLookup { value: None, decl: 0 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(ExprKind::IntLiteral(4), span());
        assert_eq!(eval.eval(&expr), EvalResult::Success(4));
    }

    #[test]
    fn negative_int_literal_is_an_error() {
        let lookup = FixedLookup { value: None, decl: 0 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(ExprKind::IntLiteral(-1), span());
        assert!(matches!(eval.eval(&expr), EvalResult::Error(_, _)));
    }

    #[test]
    fn unresolved_const_identifier_waits() {
        let lookup = FixedLookup { value: None, decl: 5 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(ExprKind::Identifier("N".into()), span());
        assert!(matches!(eval.eval(&expr), EvalResult::Waiting(_, _)));
    }

    #[test]
    fn resolved_const_identifier_succeeds() {
        let lookup = FixedLookup { value: Some(7), decl: 5 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(ExprKind::Identifier("N".into()), span());
        assert_eq!(eval.eval(&expr), EvalResult::Success(7));
    }

    #[test]
    fn division_by_zero_is_an_error_not_a_panic() {
        let lookup = FixedLookup { value: None, decl: 0 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Div,
                lhs: Box::new(Expr::new(ExprKind::IntLiteral(4), span())),
                rhs: Box::new(Expr::new(ExprKind::IntLiteral(0), span())),
                op_span: span(),
            },
            span(),
        );
        assert!(matches!(eval.eval(&expr), EvalResult::Error(_, _)));
    }

    #[test]
    fn arithmetic_combines_left_and_right() {
        let lookup = FixedLookup { value: None, decl: 0 };
        let mut eval = Evaluator::new(&lookup);
        let expr = Expr::new(
            ExprKind::Binary {
                op: BinaryOp::Mul,
                lhs: Box::new(Expr::new(ExprKind::IntLiteral(3), span())),
                rhs: Box::new(Expr::new(ExprKind::IntLiteral(4), span())),
                op_span: span(),
            },
            span(),
        );
        assert_eq!(eval.eval(&expr), EvalResult::Success(12));
    }

    #[test]
    fn cycle_guard_detects_reentry() {
        let mut guard = CycleGuard::new();
        assert!(guard.enter(1));
        assert!(guard.is_visiting(1));
        assert!(!guard.enter(1));
        guard.leave(1);
        assert!(!guard.is_visiting(1));
    }
}
