//! Trait (operator) registry -- component C (spec.md §4.C).
//!
//! A fixed catalogue of polymorphic operator traits with per-type-pair
//! implementations, integer-promotion rules for the built-in numeric
//! traits, and lazy auto-implementation of `Index`/`RefIndex`/`Length`
//! for array and string types. The surface language has no `impl` syntax
//! (spec.md §6's grammar never mentions one) so every [`TraitImpl`] this
//! registry ever holds is compiler-synthesized; [`MethodImpl`] still
//! carries all three shapes spec.md §3 names because a hosted trait
//! registry is a general mechanism, not a language-specific one.
//!
//! Arithmetic/comparison on the eleven numeric primitives is resolved by
//! [`promote`] rather than by pre-registering every `(L, R)` pair: spec.md
//! §4.C fixes the operator-to-trait map and the promotion law, but
//! registering is_integer(L) * is_integer(R) concrete impls would just
//! re-encode that same law as data. `get_binary_method`/`get_binary_output`
//! take this fast path for numeric operands and fall back to scanning
//! registered impls (`Str`, arrays, `Display`, ...) otherwise -- see
//! DESIGN.md for the grounding note.

use jsa_ast::ItemId;
use rustc_hash::FxHashMap;

use crate::ty::{TypeContext, TypeId, TypeInfo};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trait {
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
    Ord,
    Neg,
    Not,
    AddAssign,
    SubAssign,
    MulAssign,
    DivAssign,
    Index,
    RefIndex,
    Length,
    Display,
    From,
    CStr,
}

impl Trait {
    pub fn name(&self) -> &'static str {
        match self {
            Trait::Add => "Add",
            Trait::Sub => "Sub",
            Trait::Mul => "Mul",
            Trait::Div => "Div",
            Trait::Rem => "Rem",
            Trait::BitAnd => "BitAnd",
            Trait::BitOr => "BitOr",
            Trait::BitXor => "BitXor",
            Trait::Shl => "Shl",
            Trait::Shr => "Shr",
            Trait::Eq => "Eq",
            Trait::Ord => "Ord",
            Trait::Neg => "Neg",
            Trait::Not => "Not",
            Trait::AddAssign => "AddAssign",
            Trait::SubAssign => "SubAssign",
            Trait::MulAssign => "MulAssign",
            Trait::DivAssign => "DivAssign",
            Trait::Index => "Index",
            Trait::RefIndex => "RefIndex",
            Trait::Length => "Length",
            Trait::Display => "Display",
            Trait::From => "From",
            Trait::CStr => "CStr",
        }
    }

    pub fn from_name(name: &str) -> Option<Trait> {
        Some(match name {
            "Add" => Trait::Add,
            "Sub" => Trait::Sub,
            "Mul" => Trait::Mul,
            "Div" => Trait::Div,
            "Rem" => Trait::Rem,
            "BitAnd" => Trait::BitAnd,
            "BitOr" => Trait::BitOr,
            "BitXor" => Trait::BitXor,
            "Shl" => Trait::Shl,
            "Shr" => Trait::Shr,
            "Eq" => Trait::Eq,
            "Ord" => Trait::Ord,
            "Neg" => Trait::Neg,
            "Not" => Trait::Not,
            "AddAssign" => Trait::AddAssign,
            "SubAssign" => Trait::SubAssign,
            "MulAssign" => Trait::MulAssign,
            "DivAssign" => Trait::DivAssign,
            "Index" => Trait::Index,
            "RefIndex" => Trait::RefIndex,
            "Length" => Trait::Length,
            "Display" => Trait::Display,
            "From" => Trait::From,
            "CStr" => Trait::CStr,
            _ => return None,
        })
    }

    /// Whether this trait is numeric-promotion-driven rather than a
    /// concrete registered impl (spec.md §4.C promotion policy).
    fn is_builtin_numeric(&self) -> bool {
        matches!(
            self,
            Trait::Add | Trait::Sub | Trait::Mul | Trait::Div | Trait::Rem
                | Trait::BitAnd | Trait::BitOr | Trait::BitXor | Trait::Shl | Trait::Shr
                | Trait::Eq | Trait::Ord
        )
    }
}

/// A stable identifier codegen (`jsa-codegen`) uses to pick the concrete
/// IR-building closure for an intrinsic method -- the "opaque context"
/// split described in the module doc comment.
pub type IntrinsicTag = &'static str;

#[derive(Debug, Clone)]
pub enum MethodImpl {
    /// Resolved to a codegen-owned builtin lowering, identified by tag.
    Intrinsic(IntrinsicTag),
    /// A body-carrying implementation (unreachable from today's surface
    /// grammar, kept because spec.md §3 names it as part of the model).
    UserFunction { decl: ItemId },
    /// A link-time-resolved implementation, e.g. a runtime-provided method.
    External { linkage_name: String },
}

#[derive(Debug, Clone)]
pub struct TraitImpl {
    pub trait_: Trait,
    pub self_type: TypeId,
    pub type_param_bindings: Vec<TypeId>,
    pub assoc_type_bindings: FxHashMap<String, TypeId>,
    pub methods: FxHashMap<String, MethodImpl>,
}

#[derive(Debug, Default)]
pub struct TraitRegistry {
    impls: Vec<TraitImpl>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, impl_def: TraitImpl) {
        self.impls.push(impl_def);
    }

    /// Scans registrations matching on `(trait, self_type, type_param_bindings)`
    /// identity (spec.md §4.C: "scans registered implementations matching
    /// on pointer equality of self and each binding" -- `TypeId` equality
    /// stands in for pointer equality here, see ty.rs).
    pub fn find_impl(&self, trait_: Trait, self_type: TypeId, type_param_bindings: &[TypeId]) -> Option<&TraitImpl> {
        self.impls
            .iter()
            .find(|i| i.trait_ == trait_ && i.self_type == self_type && i.type_param_bindings == type_param_bindings)
    }

    /// Picks the implementation whose method `method_name` is present,
    /// preferring the numeric fast path for built-in arithmetic/comparison
    /// traits (spec.md §4.C).
    pub fn get_binary_method(
        &mut self,
        ctx: &mut TypeContext,
        trait_: Trait,
        left: TypeId,
        right: TypeId,
        method_name: &str,
    ) -> Option<BinaryMethod> {
        if trait_.is_builtin_numeric() {
            if let Some(result) = self.numeric_binary(ctx, trait_, left, right, method_name) {
                return Some(result);
            }
        }
        self.ensure_auto_impl(ctx, trait_, left, &[right]);
        let impl_ = self.find_impl(trait_, left, &[right])?;
        let method = impl_.methods.get(method_name)?;
        Some(BinaryMethod {
            method: method.clone(),
            output: impl_.assoc_type_bindings.get("Output").copied().unwrap_or(ctx.unknown()),
        })
    }

    pub fn get_binary_output(&mut self, ctx: &mut TypeContext, trait_: Trait, left: TypeId, right: TypeId) -> Option<TypeId> {
        let method_name = builtin_method_name(trait_);
        self.get_binary_method(ctx, trait_, left, right, method_name).map(|m| m.output)
    }

    /// Numeric fast path: same type -> identity, any+double -> double,
    /// both integer -> widest width, unsigned wins on a tie (spec.md §4.C).
    fn numeric_binary(
        &self,
        ctx: &mut TypeContext,
        trait_: Trait,
        left: TypeId,
        right: TypeId,
        method_name: &str,
    ) -> Option<BinaryMethod> {
        let expected = builtin_method_name(trait_);
        if method_name != expected {
            return None;
        }
        let numeric = |id: TypeId| ctx.is_integer(id) || ctx.is_double(id);
        if !numeric(left) || !numeric(right) {
            return None;
        }
        let output = match trait_ {
            Trait::Eq | Trait::Ord => ctx.bool_ty(),
            _ => promote(ctx, left, right)?,
        };
        let tag: IntrinsicTag = match (trait_, ctx.is_double(left) || ctx.is_double(right)) {
            (Trait::Add, true) => "float.add",
            (Trait::Add, false) => "int.add",
            (Trait::Sub, true) => "float.sub",
            (Trait::Sub, false) => "int.sub",
            (Trait::Mul, true) => "float.mul",
            (Trait::Mul, false) => "int.mul",
            (Trait::Div, true) => "float.div",
            (Trait::Div, false) => "int.div",
            (Trait::Rem, true) => "float.rem",
            (Trait::Rem, false) => "int.rem",
            (Trait::BitAnd, _) => "int.bitand",
            (Trait::BitOr, _) => "int.bitor",
            (Trait::BitXor, _) => "int.bitxor",
            (Trait::Shl, _) => "int.shl",
            (Trait::Shr, _) => "int.shr",
            (Trait::Eq, true) => "float.eq",
            (Trait::Eq, false) => "int.eq",
            (Trait::Ord, true) => "float.ord",
            (Trait::Ord, false) => "int.ord",
            _ => return None,
        };
        Some(BinaryMethod { method: MethodImpl::Intrinsic(tag), output })
    }

    /// Registers a synthetic implementation on first request, per spec.md
    /// §4.C: `Index<K>`/`RefIndex<K>` for arrays, `Length` for arrays and
    /// strings. For `Index<K>` with no direct `K` impl, substitutes a
    /// candidate `C` in `{Usize, I64, I32}` that has both an `Index<C>`
    /// impl and a registered `From<K>`, recording the conversion via the
    /// returned [`IndexSubstitution`].
    pub fn ensure_auto_impl(&mut self, ctx: &mut TypeContext, trait_: Trait, self_type: TypeId, bindings: &[TypeId]) {
        match trait_ {
            Trait::Index | Trait::RefIndex => {
                if let Some(element) = ctx.is_array(self_type) {
                    if self.find_impl(trait_, self_type, bindings).is_none() {
                        let method_name = if trait_ == Trait::Index { "index" } else { "ref_index" };
                        let tag: IntrinsicTag = if trait_ == Trait::Index { "array.index" } else { "array.ref_index" };
                        let mut methods = FxHashMap::default();
                        methods.insert(method_name.to_string(), MethodImpl::Intrinsic(tag));
                        let mut assoc = FxHashMap::default();
                        assoc.insert("Output".to_string(), element);
                        self.register(TraitImpl {
                            trait_,
                            self_type,
                            type_param_bindings: bindings.to_vec(),
                            assoc_type_bindings: assoc,
                            methods,
                        });
                    }
                }
            }
            Trait::Length => {
                if self.find_impl(Trait::Length, self_type, &[]).is_none()
                    && (ctx.is_array(self_type).is_some() || ctx.is_string(self_type))
                {
                    let tag: IntrinsicTag = if ctx.is_string(self_type) { "str.length" } else { "array.length" };
                    let mut methods = FxHashMap::default();
                    methods.insert("length".to_string(), MethodImpl::Intrinsic(tag));
                    let mut assoc = FxHashMap::default();
                    assoc.insert("Output".to_string(), ctx.usize_ty());
                    self.register(TraitImpl {
                        trait_: Trait::Length,
                        self_type,
                        type_param_bindings: Vec::new(),
                        assoc_type_bindings: assoc,
                        methods,
                    });
                }
            }
            Trait::Add | Trait::Eq if ctx.is_string(self_type) && bindings.len() == 1 && ctx.is_string(bindings[0]) => {
                if self.find_impl(trait_, self_type, bindings).is_none() {
                    let (method_name, tag, output) = if trait_ == Trait::Add {
                        ("add", "str.concat", self_type)
                    } else {
                        ("eq", "str.eq", ctx.bool_ty())
                    };
                    let mut methods = FxHashMap::default();
                    methods.insert(method_name.to_string(), MethodImpl::Intrinsic(tag));
                    let mut assoc = FxHashMap::default();
                    assoc.insert("Output".to_string(), output);
                    self.register(TraitImpl {
                        trait_,
                        self_type,
                        type_param_bindings: bindings.to_vec(),
                        assoc_type_bindings: assoc,
                        methods,
                    });
                }
            }
            _ => {}
        }
    }

    /// Implements the `Index<K>` candidate-substitution rule: if no direct
    /// impl exists for `K` but one exists for some `C` in
    /// `{Usize, I64, I32}` with a registered `From<K>` for `C`, returns
    /// `C` and records that an implicit conversion is needed.
    pub fn find_index_candidate(&mut self, ctx: &mut TypeContext, self_type: TypeId, key: TypeId) -> Option<IndexSubstitution> {
        self.ensure_auto_impl(ctx, Trait::Index, self_type, &[key]);
        if self.find_impl(Trait::Index, self_type, &[key]).is_some() {
            return None;
        }
        for candidate_name in ["usize", "i64", "i32"] {
            let candidate = match candidate_name {
                "usize" => ctx.usize_ty(),
                "i64" => ctx.i64_ty(),
                _ => ctx.i32_ty(),
            };
            self.ensure_auto_impl(ctx, Trait::Index, self_type, &[candidate]);
            if self.find_impl(Trait::Index, self_type, &[candidate]).is_some()
                && self.find_impl(Trait::From, candidate, &[key]).is_some()
            {
                return Some(IndexSubstitution { candidate });
            }
        }
        None
    }

    pub fn register_from(&mut self, to: TypeId, from: TypeId, tag: IntrinsicTag) {
        let mut methods = FxHashMap::default();
        methods.insert("from".to_string(), MethodImpl::Intrinsic(tag));
        self.register(TraitImpl {
            trait_: Trait::From,
            self_type: to,
            type_param_bindings: vec![from],
            assoc_type_bindings: FxHashMap::default(),
            methods,
        });
    }

    pub fn find_display(&self, self_type: TypeId) -> Option<&TraitImpl> {
        self.find_impl(Trait::Display, self_type, &[])
    }
}

pub struct BinaryMethod {
    pub method: MethodImpl,
    pub output: TypeId,
}

pub struct IndexSubstitution {
    pub candidate: TypeId,
}

/// The fixed method name for each built-in binary trait (spec.md §4.C's
/// operator-to-trait-and-method map).
pub fn builtin_method_name(trait_: Trait) -> &'static str {
    match trait_ {
        Trait::Add => "add",
        Trait::Sub => "sub",
        Trait::Mul => "mul",
        Trait::Div => "div",
        Trait::Rem => "rem",
        Trait::BitAnd => "bitand",
        Trait::BitOr => "bitor",
        Trait::BitXor => "bitxor",
        Trait::Shl => "shl",
        Trait::Shr => "shr",
        Trait::Eq => "eq",
        Trait::Ord => "lt",
        Trait::Neg => "neg",
        Trait::Not => "not",
        Trait::AddAssign => "add_assign",
        Trait::SubAssign => "sub_assign",
        Trait::MulAssign => "mul_assign",
        Trait::DivAssign => "div_assign",
        Trait::Index => "index",
        Trait::RefIndex => "ref_index",
        Trait::Length => "length",
        Trait::Display => "display",
        Trait::From => "from",
        Trait::CStr => "as_cstr",
    }
}

/// The integer/double promotion law (spec.md §4.C, §8 laws):
/// `promoted(T, T) = T`; any operand `Double` promotes to `Double`;
/// otherwise both operands are integers and the wider width wins, ties
/// broken by unsigned, then by the left operand.
pub fn promote(ctx: &TypeContext, left: TypeId, right: TypeId) -> Option<TypeId> {
    if left == right {
        return Some(left);
    }
    if ctx.is_double(left) || ctx.is_double(right) {
        return Some(ctx.double_ty());
    }
    let (lw, rw) = (ctx.int_width(left)?, ctx.int_width(right)?);
    if lw != rw {
        return Some(if lw > rw { left } else { right });
    }
    match (ctx.is_signed(left), ctx.is_signed(right)) {
        (true, false) => Some(right),
        (false, true) => Some(left),
        _ => Some(left),
    }
}

/// Returns `true` for any [`TypeInfo`] that `Display`/`println` auto-wires
/// a runtime call for (spec.md §6: `display_i8..i64, display_u8..u64,
/// display_bool, display_string, display_f64`).
pub fn is_displayable_scalar(ctx: &TypeContext, id: TypeId) -> bool {
    matches!(
        ctx.get(id),
        TypeInfo::I8 | TypeInfo::I16 | TypeInfo::I32 | TypeInfo::I64
            | TypeInfo::U8 | TypeInfo::U16 | TypeInfo::U32 | TypeInfo::U64 | TypeInfo::Usize
            | TypeInfo::Bool
            | TypeInfo::Double
            | TypeInfo::Str
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promotion_same_type_is_identity() {
        let ctx = TypeContext::new();
        assert_eq!(promote(&ctx, ctx.i32_ty(), ctx.i32_ty()), Some(ctx.i32_ty()));
    }

    #[test]
    fn promotion_any_double_wins() {
        let ctx = TypeContext::new();
        assert_eq!(promote(&ctx, ctx.i32_ty(), ctx.double_ty()), Some(ctx.double_ty()));
        assert_eq!(promote(&ctx, ctx.double_ty(), ctx.i8_ty()), Some(ctx.double_ty()));
    }

    #[test]
    fn promotion_wider_integer_wins() {
        let ctx = TypeContext::new();
        assert_eq!(promote(&ctx, ctx.i16_ty(), ctx.i64_ty()), Some(ctx.i64_ty()));
    }

    #[test]
    fn promotion_same_width_unsigned_wins() {
        let ctx = TypeContext::new();
        assert_eq!(promote(&ctx, ctx.i32_ty(), ctx.u32_ty()), Some(ctx.u32_ty()));
        assert_eq!(promote(&ctx, ctx.u32_ty(), ctx.i32_ty()), Some(ctx.u32_ty()));
    }

    #[test]
    fn binary_add_resolves_for_matching_integers() {
        let mut ctx = TypeContext::new();
        let mut traits = TraitRegistry::new();
        let result = traits
            .get_binary_method(&mut ctx, Trait::Add, ctx.i32_ty(), ctx.i32_ty(), "add")
            .expect("i32 + i32 should resolve via the numeric fast path");
        assert_eq!(result.output, ctx.i32_ty());
    }

    #[test]
    fn length_auto_implements_on_first_request_for_arrays() {
        let mut ctx = TypeContext::new();
        let mut traits = TraitRegistry::new();
        let i32_ty = ctx.i32_ty();
        let arr = ctx.create_array(i32_ty);
        assert!(traits.find_impl(Trait::Length, arr, &[]).is_none());
        traits.ensure_auto_impl(&mut ctx, Trait::Length, arr, &[]);
        assert!(traits.find_impl(Trait::Length, arr, &[]).is_some());
    }

    #[test]
    fn index_substitution_finds_usize_candidate_via_from() {
        let mut ctx = TypeContext::new();
        let mut traits = TraitRegistry::new();
        let i32_ty = ctx.i32_ty();
        let arr = ctx.create_array(i32_ty);
        let usize_ty = ctx.usize_ty();
        traits.ensure_auto_impl(&mut ctx, Trait::Index, arr, &[usize_ty]);
        traits.register_from(usize_ty, i32_ty, "int.widen_to_usize");

        let substitution = traits
            .find_index_candidate(&mut ctx, arr, i32_ty)
            .expect("arr[i: i32] should substitute the Index<Usize> impl");
        assert_eq!(substitution.candidate, usize_ty);
    }
}
