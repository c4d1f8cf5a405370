//! `TypeInfo` to LLVM type mapping (spec.md §4.H).
//!
//! | `TypeInfo`         | LLVM type                                   |
//! |---------------------|---------------------------------------------|
//! | `Void`               | `void` (only legal as a return type)        |
//! | `Bool`               | `i1`                                         |
//! | `I8`/`U8`             | `i8`                                         |
//! | `I16`/`U16`           | `i16`                                        |
//! | `I32`/`U32`           | `i32`                                        |
//! | `I64`/`U64`/`Usize`    | `i64`                                        |
//! | `Double`             | `double`                                     |
//! | `Str`                | `{ ptr, i64 }` value struct (data, length)   |
//! | `CStr`                | `ptr` (NUL-terminated C string)              |
//! | `Ref`                | `ptr`                                        |
//! | `Array`              | `ptr` (heap) or `[N x elem]` for locals      |
//! | `Object`             | named struct, predeclared opaque then filled |
//! | `Enum`               | `{ i32, [MAX x i8] }` tagged union           |
//! | `Function`           | never materialized as a value type directly  |

use inkwell::context::Context;
use inkwell::types::{BasicType, BasicTypeEnum, StructType};
use inkwell::AddressSpace;
use rustc_hash::FxHashMap;

use jsa_typeck::{TypeContext, TypeId, TypeInfo};

pub struct StructCache<'ctx> {
    pub structs: FxHashMap<TypeId, StructType<'ctx>>,
    pub enums: FxHashMap<TypeId, StructType<'ctx>>,
}

impl<'ctx> StructCache<'ctx> {
    pub fn new() -> Self {
        Self { structs: FxHashMap::default(), enums: FxHashMap::default() }
    }
}

impl Default for StructCache<'_> {
    fn default() -> Self {
        Self::new()
    }
}

/// Predeclares every struct as an opaque named type, then fills bodies in
/// a second sweep, so one struct's field can reference another declared
/// later in the source (spec.md §4.H "struct predeclaration in
/// dependency order" -- opaque-then-fill makes the order irrelevant).
pub fn predeclare_structs<'ctx>(context: &'ctx Context, ty_ctx: &TypeContext, cache: &mut StructCache<'ctx>) {
    for id in ty_ctx.iter_structs().collect::<Vec<_>>() {
        if let TypeInfo::Object { name, .. } = ty_ctx.get(id) {
            let opaque = context.opaque_struct_type(name);
            cache.structs.insert(id, opaque);
        }
    }
    for id in ty_ctx.iter_enums().collect::<Vec<_>>() {
        if let TypeInfo::Enum { name, .. } = ty_ctx.get(id) {
            let opaque = context.opaque_struct_type(&format!("{name}.repr"));
            cache.enums.insert(id, opaque);
        }
    }
    for id in ty_ctx.iter_structs().collect::<Vec<_>>() {
        let TypeInfo::Object { field_types, .. } = ty_ctx.get(id) else { continue };
        let field_llvm: Vec<BasicTypeEnum<'ctx>> = field_types.iter().map(|&f| llvm_type(context, ty_ctx, cache, f)).collect();
        cache.structs[&id].set_body(&field_llvm, false);
    }
    for id in ty_ctx.iter_enums().collect::<Vec<_>>() {
        let TypeInfo::Enum { variant_field_types, .. } = ty_ctx.get(id) else { continue };
        let max_payload = variant_field_types
            .iter()
            .map(|fields| fields.iter().map(|&f| llvm_size_hint(context, ty_ctx, cache, f)).sum::<u32>())
            .max()
            .unwrap_or(0);
        let payload = context.i8_type().array_type(max_payload);
        cache.enums[&id].set_body(&[context.i32_type().into(), payload.into()], false);
    }
}

/// A conservative per-field byte-size estimate used only to size an enum's
/// payload bytes; every scalar is rounded up to 8 bytes so nested structs
/// and pointers never overflow the reserved storage.
fn llvm_size_hint<'ctx>(context: &'ctx Context, ty_ctx: &TypeContext, cache: &StructCache<'ctx>, id: TypeId) -> u32 {
    let _ = llvm_type(context, ty_ctx, cache, id);
    8
}

/// The `Str` value struct named by spec.md §6: `{ data: *u8, length: usize }`.
/// Built fresh on each call rather than cached -- LLVM interns anonymous
/// struct types with identical field lists, so every call site already
/// gets the same `StructType`.
pub fn str_struct_type<'ctx>(context: &'ctx Context) -> StructType<'ctx> {
    context.struct_type(&[context.ptr_type(AddressSpace::default()).into(), context.i64_type().into()], false)
}

pub fn llvm_type<'ctx>(context: &'ctx Context, ty_ctx: &TypeContext, cache: &StructCache<'ctx>, id: TypeId) -> BasicTypeEnum<'ctx> {
    match ty_ctx.get(id) {
        TypeInfo::Unknown | TypeInfo::Void => context.struct_type(&[], false).into(),
        TypeInfo::Bool => context.bool_type().into(),
        TypeInfo::I8 | TypeInfo::U8 => context.i8_type().into(),
        TypeInfo::I16 | TypeInfo::U16 => context.i16_type().into(),
        TypeInfo::I32 | TypeInfo::U32 => context.i32_type().into(),
        TypeInfo::I64 | TypeInfo::U64 | TypeInfo::Usize => context.i64_type().into(),
        TypeInfo::Double => context.f64_type().into(),
        TypeInfo::Str => str_struct_type(context).into(),
        TypeInfo::CStr => context.ptr_type(AddressSpace::default()).into(),
        TypeInfo::Ref { .. } => context.ptr_type(AddressSpace::default()).into(),
        TypeInfo::Array { .. } => context.ptr_type(AddressSpace::default()).into(),
        TypeInfo::Object { .. } => cache.structs.get(&id).map(|s| s.as_basic_type_enum()).unwrap_or_else(|| context.struct_type(&[], false).into()),
        TypeInfo::Enum { .. } => cache.enums.get(&id).map(|s| s.as_basic_type_enum()).unwrap_or_else(|| context.struct_type(&[], false).into()),
        TypeInfo::Function { .. } => context.ptr_type(AddressSpace::default()).into(),
    }
}

/// The LLVM return type for a function whose return `TypeId` is `Void`
/// (`void` is not a `BasicTypeEnum` and needs its own function-type path).
pub fn is_void(ty_ctx: &TypeContext, id: TypeId) -> bool {
    matches!(ty_ctx.get(id), TypeInfo::Void)
}

/// A stack-local array's element storage size, for the two-index-vs-
/// single-index GEP split (spec.md §4.H: stack arrays need a leading `0`
/// index to step through the alloca itself before indexing elements;
/// heap arrays, already a bare pointer, need only one).
pub fn array_element_llvm_type<'ctx>(context: &'ctx Context, ty_ctx: &TypeContext, cache: &StructCache<'ctx>, array_ty: TypeId) -> BasicTypeEnum<'ctx> {
    let element = ty_ctx.is_array(array_ty).expect("array_element_llvm_type called on a non-array TypeId");
    llvm_type(context, ty_ctx, cache, element)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_types_lower_to_the_expected_llvm_widths() {
        let context = Context::create();
        let mut ty_ctx = TypeContext::new();
        let cache = StructCache::new();

        for (id, expected_bits) in [
            (ty_ctx.bool_ty(), 1u32),
            (ty_ctx.i8_ty(), 8),
            (ty_ctx.i16_ty(), 16),
            (ty_ctx.i32_ty(), 32),
            (ty_ctx.i64_ty(), 64),
            (ty_ctx.usize_ty(), 64),
        ] {
            let BasicTypeEnum::IntType(int_ty) = llvm_type(&context, &ty_ctx, &cache, id) else {
                panic!("expected an LLVM integer type for {id:?}");
            };
            pretty_assertions::assert_eq!(int_ty.get_bit_width(), expected_bits);
        }
    }

    #[test]
    fn struct_predeclaration_names_the_llvm_type_after_the_source_struct() {
        let context = Context::create();
        let mut ty_ctx = TypeContext::new();
        let i32_ty = ty_ctx.i32_ty();
        let double_ty = ty_ctx.double_ty();
        let point = ty_ctx.create_object("Point".to_string(), vec!["x".to_string(), "y".to_string()], vec![i32_ty, double_ty], 0);

        let mut cache = StructCache::new();
        predeclare_structs(&context, &ty_ctx, &mut cache);

        let lowered = cache.structs.get(&point).expect("Point was predeclared");
        insta::assert_snapshot!(lowered.get_name().unwrap().to_str().unwrap(), @"Point");
        pretty_assertions::assert_eq!(lowered.count_fields(), 2);
    }

    #[test]
    fn str_struct_is_a_data_pointer_paired_with_a_length() {
        let context = Context::create();
        let str_ty = str_struct_type(&context);
        pretty_assertions::assert_eq!(str_ty.count_fields(), 2);
        assert!(str_ty.get_field_type_at_index(0).unwrap().is_pointer_type());
        assert!(str_ty.get_field_type_at_index(1).unwrap().is_int_type());
    }
}
