//! TypeInfo registry -- component A (spec.md §3, §4.A).
//!
//! `TypeInfo` is interned in a per-module [`TypeContext`] arena and
//! referenced everywhere else (the AST, the symbol table, specializations)
//! by a [`TypeId`] index rather than a pointer. Index equality gives the
//! "primitive singletons are reference-compared" invariant (spec.md §3
//! invariant i) for free, and keeps the arena the sole owner -- nothing
//! ever deep-copies a `TypeInfo` across modules (spec.md §9).

use rustc_hash::FxHashMap;

use jsa_ast::ItemId;

/// Index into a [`TypeContext`]'s arena. Stable for the lifetime of the
/// owning module's `TypeContext`.
pub type TypeId = u32;

/// A canonical, interned type (spec.md §3).
#[derive(Debug, Clone)]
pub enum TypeInfo {
    Unknown,
    Void,
    Bool,
    I8,
    I16,
    I32,
    I64,
    U8,
    U16,
    U32,
    U64,
    Usize,
    Double,
    Str,
    CStr,
    Ref {
        target: TypeId,
        is_mutable: bool,
    },
    Array {
        element: TypeId,
    },
    Object {
        name: String,
        field_names: Vec<String>,
        field_types: Vec<TypeId>,
        decl: ItemId,
    },
    Enum {
        name: String,
        variant_names: Vec<String>,
        variant_field_names: Vec<Vec<String>>,
        variant_field_types: Vec<Vec<TypeId>>,
        decl: ItemId,
    },
    Function {
        name: String,
        params: Vec<TypeId>,
        ret: TypeId,
        /// `None` only for the handful of compiler-synthesized adapter
        /// functions that have no source declaration; every user function
        /// carries its declaring `ItemId`.
        decl: Option<ItemId>,
        is_variadic: bool,
        is_fully_typed: bool,
        specializations: Vec<crate::specialize::FunctionSpecialization>,
    },
}

impl TypeInfo {
    pub fn type_name(&self) -> &str {
        match self {
            TypeInfo::Unknown => "<unknown>",
            TypeInfo::Void => "void",
            TypeInfo::Bool => "bool",
            TypeInfo::I8 => "i8",
            TypeInfo::I16 => "i16",
            TypeInfo::I32 => "i32",
            TypeInfo::I64 => "i64",
            TypeInfo::U8 => "u8",
            TypeInfo::U16 => "u16",
            TypeInfo::U32 => "u32",
            TypeInfo::U64 => "u64",
            TypeInfo::Usize => "usize",
            TypeInfo::Double => "double",
            TypeInfo::Str => "str",
            TypeInfo::CStr => "cstr",
            TypeInfo::Ref { .. } => "ref",
            TypeInfo::Array { .. } => "array",
            TypeInfo::Object { name, .. } => name,
            TypeInfo::Enum { name, .. } => name,
            TypeInfo::Function { name, .. } => name,
        }
    }
}

/// Per-module owner of the `TypeInfo` arena (spec.md §3: "TypeContext
/// outlives AST during teardown").
#[derive(Debug)]
pub struct TypeContext {
    arena: Vec<TypeInfo>,
    primitives: FxHashMap<&'static str, TypeId>,
    ref_cache: FxHashMap<(TypeId, bool), TypeId>,
    structs_by_name: FxHashMap<String, TypeId>,
    enums_by_name: FxHashMap<String, TypeId>,
    functions_by_name: FxHashMap<String, TypeId>,
}

macro_rules! primitive_const {
    ($method:ident, $name:literal) => {
        pub fn $method(&self) -> TypeId {
            self.primitives[$name]
        }
    };
}

impl TypeContext {
    pub fn new() -> Self {
        let mut ctx = Self {
            arena: Vec::new(),
            primitives: FxHashMap::default(),
            ref_cache: FxHashMap::default(),
            structs_by_name: FxHashMap::default(),
            enums_by_name: FxHashMap::default(),
            functions_by_name: FxHashMap::default(),
        };
        for (name, info) in [
            ("unknown", TypeInfo::Unknown),
            ("void", TypeInfo::Void),
            ("bool", TypeInfo::Bool),
            ("i8", TypeInfo::I8),
            ("i16", TypeInfo::I16),
            ("i32", TypeInfo::I32),
            ("i64", TypeInfo::I64),
            ("u8", TypeInfo::U8),
            ("u16", TypeInfo::U16),
            ("u32", TypeInfo::U32),
            ("u64", TypeInfo::U64),
            ("usize", TypeInfo::Usize),
            ("double", TypeInfo::Double),
            ("str", TypeInfo::Str),
            ("cstr", TypeInfo::CStr),
        ] {
            let id = ctx.push(info);
            ctx.primitives.insert(name, id);
        }
        ctx
    }

    fn push(&mut self, info: TypeInfo) -> TypeId {
        let id = self.arena.len() as TypeId;
        self.arena.push(info);
        id
    }

    pub fn get(&self, id: TypeId) -> &TypeInfo {
        &self.arena[id as usize]
    }

    pub fn get_mut(&mut self, id: TypeId) -> &mut TypeInfo {
        &mut self.arena[id as usize]
    }

    primitive_const!(unknown, "unknown");
    primitive_const!(void, "void");
    primitive_const!(bool_ty, "bool");
    primitive_const!(i8_ty, "i8");
    primitive_const!(i16_ty, "i16");
    primitive_const!(i32_ty, "i32");
    primitive_const!(i64_ty, "i64");
    primitive_const!(u8_ty, "u8");
    primitive_const!(u16_ty, "u16");
    primitive_const!(u32_ty, "u32");
    primitive_const!(u64_ty, "u64");
    primitive_const!(usize_ty, "usize");
    primitive_const!(double_ty, "double");
    primitive_const!(str_ty, "str");
    primitive_const!(cstr_ty, "cstr");

    /// Deduplicates on `(target, mutability)` (spec.md §4.A).
    pub fn get_or_create_ref(&mut self, target: TypeId, is_mutable: bool) -> TypeId {
        if let Some(&id) = self.ref_cache.get(&(target, is_mutable)) {
            return id;
        }
        let id = self.push(TypeInfo::Ref { target, is_mutable });
        self.ref_cache.insert((target, is_mutable), id);
        id
    }

    pub fn create_array(&mut self, element: TypeId) -> TypeId {
        self.push(TypeInfo::Array { element })
    }

    pub fn create_object(
        &mut self,
        name: String,
        field_names: Vec<String>,
        field_types: Vec<TypeId>,
        decl: ItemId,
    ) -> TypeId {
        debug_assert_eq!(field_names.len(), field_types.len(), "parallel field arrays must match (spec.md §3 invariant iii)");
        let id = self.push(TypeInfo::Object { name: name.clone(), field_names, field_types, decl });
        self.structs_by_name.insert(name, id);
        id
    }

    pub fn create_enum(
        &mut self,
        name: String,
        variant_names: Vec<String>,
        variant_field_names: Vec<Vec<String>>,
        variant_field_types: Vec<Vec<TypeId>>,
        decl: ItemId,
    ) -> TypeId {
        let id = self.push(TypeInfo::Enum {
            name: name.clone(),
            variant_names,
            variant_field_names,
            variant_field_types,
            decl,
        });
        self.enums_by_name.insert(name, id);
        id
    }

    pub fn create_function(
        &mut self,
        name: String,
        params: Vec<TypeId>,
        ret: TypeId,
        decl: Option<ItemId>,
        is_variadic: bool,
        is_fully_typed: bool,
    ) -> TypeId {
        let id = self.push(TypeInfo::Function {
            name: name.clone(),
            params,
            ret,
            decl,
            is_variadic,
            is_fully_typed,
            specializations: Vec::new(),
        });
        self.functions_by_name.insert(name, id);
        id
    }

    pub fn find_struct(&self, name: &str) -> Option<TypeId> {
        self.structs_by_name.get(name).copied()
    }

    pub fn find_enum(&self, name: &str) -> Option<TypeId> {
        self.enums_by_name.get(name).copied()
    }

    pub fn find_function(&self, name: &str) -> Option<TypeId> {
        self.functions_by_name.get(name).copied()
    }

    pub fn iter_structs(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.structs_by_name.values().copied()
    }

    pub fn iter_enums(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.enums_by_name.values().copied()
    }

    /// Every registered `TypeInfo::Function`, for codegen's function-
    /// prototype predeclaration sweep (spec.md §4.H).
    pub fn iter_functions(&self) -> impl Iterator<Item = TypeId> + '_ {
        self.functions_by_name.values().copied()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn is_integer(&self, id: TypeId) -> bool {
        matches!(
            self.get(id),
            TypeInfo::I8 | TypeInfo::I16 | TypeInfo::I32 | TypeInfo::I64
                | TypeInfo::U8 | TypeInfo::U16 | TypeInfo::U32 | TypeInfo::U64 | TypeInfo::Usize
        )
    }

    /// Bit width of an integer type, or `None` for non-integers.
    pub fn int_width(&self, id: TypeId) -> Option<u32> {
        match self.get(id) {
            TypeInfo::I8 | TypeInfo::U8 => Some(8),
            TypeInfo::I16 | TypeInfo::U16 => Some(16),
            TypeInfo::I32 | TypeInfo::U32 => Some(32),
            TypeInfo::I64 | TypeInfo::U64 | TypeInfo::Usize => Some(64),
            _ => None,
        }
    }

    pub fn is_signed(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeInfo::I8 | TypeInfo::I16 | TypeInfo::I32 | TypeInfo::I64)
    }

    pub fn is_double(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeInfo::Double)
    }

    pub fn is_bool(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeInfo::Bool)
    }

    pub fn is_string(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeInfo::Str)
    }

    pub fn is_ref(&self, id: TypeId) -> Option<(TypeId, bool)> {
        match self.get(id) {
            TypeInfo::Ref { target, is_mutable } => Some((*target, *is_mutable)),
            _ => None,
        }
    }

    pub fn is_array(&self, id: TypeId) -> Option<TypeId> {
        match self.get(id) {
            TypeInfo::Array { element } => Some(*element),
            _ => None,
        }
    }

    pub fn is_object(&self, id: TypeId) -> bool {
        matches!(self.get(id), TypeInfo::Object { .. })
    }

    /// Index of a named property on a struct, or `-1` (spec.md §4.A).
    pub fn find_property(&self, id: TypeId, name: &str) -> i32 {
        match self.get(id) {
            TypeInfo::Object { field_names, .. } => field_names
                .iter()
                .position(|f| f == name)
                .map(|i| i as i32)
                .unwrap_or(-1),
            _ => -1,
        }
    }

    /// Human-readable name used uniformly by diagnostics across every
    /// pass and crate (spec.md §4.A addendum in SPEC_FULL.md).
    pub fn display_name(&self, id: TypeId) -> String {
        match self.get(id) {
            TypeInfo::Ref { target, is_mutable } => {
                let inner = self.display_name(*target);
                if *is_mutable { format!("ref mut {inner}") } else { format!("ref {inner}") }
            }
            TypeInfo::Array { element } => format!("{}[]", self.display_name(*element)),
            other => other.type_name().to_string(),
        }
    }
}

impl Default for TypeContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_are_singletons() {
        let ctx = TypeContext::new();
        assert_eq!(ctx.i32_ty(), ctx.i32_ty());
        assert_ne!(ctx.i32_ty(), ctx.i64_ty());
    }

    #[test]
    fn ref_creation_dedups_on_target_and_mutability() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.i32_ty();
        let a = ctx.get_or_create_ref(i32_ty, false);
        let b = ctx.get_or_create_ref(i32_ty, false);
        let c = ctx.get_or_create_ref(i32_ty, true);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn find_property_returns_negative_one_when_absent() {
        let mut ctx = TypeContext::new();
        let i32_ty = ctx.i32_ty();
        let point = ctx.create_object(
            "Point".into(),
            vec!["x".into(), "y".into()],
            vec![i32_ty, i32_ty],
            0,
        );
        assert_eq!(ctx.find_property(point, "y"), 1);
        assert_eq!(ctx.find_property(point, "z"), -1);
    }

    #[test]
    fn integer_promotion_queries() {
        let ctx = TypeContext::new();
        assert_eq!(ctx.int_width(ctx.i16_ty()), Some(16));
        assert!(ctx.is_signed(ctx.i16_ty()));
        assert!(!ctx.is_signed(ctx.u16_ty()));
        assert_eq!(ctx.int_width(ctx.double_ty()), None);
    }
}
