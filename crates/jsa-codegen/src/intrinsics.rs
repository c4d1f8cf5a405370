//! Built-in operator lowering, keyed by the [`jsa_typeck::traits`] tags
//! picked during inference (spec.md §4.C, §4.H).
//!
//! `jsa-typeck` decides *which* built-in applies (numeric promotion,
//! `Index`/`RefIndex`/`Length` auto-impls); this module owns the concrete
//! LLVM instructions for each tag, the other half of the `Intrinsic`
//! layering split described in `traits.rs`.

use inkwell::values::{BasicValueEnum, IntValue, StructValue};
use inkwell::{FloatPredicate, IntPredicate};

use jsa_typeck::TypeId;

use crate::codegen::CodeGen;
use crate::error::CodegenError;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    /// Lowers a binary built-in by tag. `operand_ty` is the promoted type
    /// the numeric fast path already computed, used here only to pick
    /// signed vs. unsigned and int vs. float builder calls.
    pub(crate) fn build_binary_intrinsic(
        &mut self,
        tag: &str,
        lhs: BasicValueEnum<'ctx>,
        rhs: BasicValueEnum<'ctx>,
        operand_ty: TypeId,
    ) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let signed = self.ty_ctx.is_signed(operand_ty);
        match tag {
            "int.add" => Ok(self.builder.build_int_add(lhs.into_int_value(), rhs.into_int_value(), "iadd")?.into()),
            "int.sub" => Ok(self.builder.build_int_sub(lhs.into_int_value(), rhs.into_int_value(), "isub")?.into()),
            "int.mul" => Ok(self.builder.build_int_mul(lhs.into_int_value(), rhs.into_int_value(), "imul")?.into()),
            "int.div" => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let v = if signed { self.builder.build_int_signed_div(l, r, "idiv")? } else { self.builder.build_int_unsigned_div(l, r, "idiv")? };
                Ok(v.into())
            }
            "int.rem" => {
                let (l, r) = (lhs.into_int_value(), rhs.into_int_value());
                let v = if signed { self.builder.build_int_signed_rem(l, r, "irem")? } else { self.builder.build_int_unsigned_rem(l, r, "irem")? };
                Ok(v.into())
            }
            "int.bitand" => Ok(self.builder.build_and(lhs.into_int_value(), rhs.into_int_value(), "iand")?.into()),
            "int.bitor" => Ok(self.builder.build_or(lhs.into_int_value(), rhs.into_int_value(), "ior")?.into()),
            "int.bitxor" => Ok(self.builder.build_xor(lhs.into_int_value(), rhs.into_int_value(), "ixor")?.into()),
            "int.shl" => Ok(self.builder.build_left_shift(lhs.into_int_value(), rhs.into_int_value(), "ishl")?.into()),
            "int.shr" => Ok(self.builder.build_right_shift(lhs.into_int_value(), rhs.into_int_value(), signed, "ishr")?.into()),
            "int.eq" => Ok(self.builder.build_int_compare(IntPredicate::EQ, lhs.into_int_value(), rhs.into_int_value(), "ieq")?.into()),
            "int.ord" => self.build_int_ord(lhs.into_int_value(), rhs.into_int_value(), signed),

            "float.add" => Ok(self.builder.build_float_add(lhs.into_float_value(), rhs.into_float_value(), "fadd")?.into()),
            "float.sub" => Ok(self.builder.build_float_sub(lhs.into_float_value(), rhs.into_float_value(), "fsub")?.into()),
            "float.mul" => Ok(self.builder.build_float_mul(lhs.into_float_value(), rhs.into_float_value(), "fmul")?.into()),
            "float.div" => Ok(self.builder.build_float_div(lhs.into_float_value(), rhs.into_float_value(), "fdiv")?.into()),
            "float.rem" => Ok(self.builder.build_float_rem(lhs.into_float_value(), rhs.into_float_value(), "frem")?.into()),
            "float.eq" => Ok(self.builder.build_float_compare(FloatPredicate::OEQ, lhs.into_float_value(), rhs.into_float_value(), "feq")?.into()),
            "float.ord" => Ok(self.builder.build_float_compare(FloatPredicate::OLT, lhs.into_float_value(), rhs.into_float_value(), "flt")?.into()),

            "str.concat" => self.build_str_concat(lhs.into_struct_value(), rhs.into_struct_value(), operand_ty),
            "str.eq" => self.build_str_eq(lhs.into_struct_value(), rhs.into_struct_value()),

            other => panic!("no lowering registered for intrinsic tag `{other}` (inference and codegen have drifted)"),
        }
    }

    /// `Ord`'s one resolved method is `lt`; `le`/`gt`/`ge` are synthesized
    /// from it by the caller choosing operand order and negation, mirroring
    /// how `BinaryOp::trait_method` maps all four comparisons onto `Ord`
    /// (spec.md §4.C).
    fn build_int_ord(&mut self, l: IntValue<'ctx>, r: IntValue<'ctx>, signed: bool) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let pred = if signed { IntPredicate::SLT } else { IntPredicate::ULT };
        Ok(self.builder.build_int_compare(pred, l, r, "ilt")?.into())
    }

    pub(crate) fn build_unary_intrinsic(&mut self, trait_name: &str, operand: BasicValueEnum<'ctx>, operand_ty: TypeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match trait_name {
            "Neg" if self.ty_ctx.is_double(operand_ty) => Ok(self.builder.build_float_neg(operand.into_float_value(), "fneg")?.into()),
            "Neg" => Ok(self.builder.build_int_neg(operand.into_int_value(), "ineg")?.into()),
            "Not" if self.ty_ctx.is_bool(operand_ty) => Ok(self.builder.build_not(operand.into_int_value(), "bnot")?.into()),
            "Not" => Ok(self.builder.build_not(operand.into_int_value(), "inot")?.into()),
            other => panic!("no lowering registered for unary trait `{other}`"),
        }
    }

    /// `Str == Str` per spec.md §8's boundary behavior: compares lengths
    /// first and only reaches `memcmp` when they match.
    fn build_str_eq(&mut self, l: StructValue<'ctx>, r: StructValue<'ctx>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let function = self.current_fn.expect("string comparison requires an active function");
        let entry_block = self.builder.get_insert_block().unwrap();
        let cmp_block = self.context.append_basic_block(function, "streq.cmp");
        let merge_block = self.context.append_basic_block(function, "streq.merge");

        let l_len = self.builder.build_extract_value(l, 1, "l_len")?.into_int_value();
        let r_len = self.builder.build_extract_value(r, 1, "r_len")?.into_int_value();
        let len_eq = self.builder.build_int_compare(IntPredicate::EQ, l_len, r_len, "len_eq")?;
        self.builder.build_conditional_branch(len_eq, cmp_block, merge_block)?;

        self.builder.position_at_end(cmp_block);
        let l_data = self.builder.build_extract_value(l, 0, "l_data")?.into_pointer_value();
        let r_data = self.builder.build_extract_value(r, 0, "r_data")?.into_pointer_value();
        let i32_ty = self.ty_ctx.i32_ty();
        let cmp = self.build_runtime_call("memcmp", &[l_data.into(), r_data.into(), l_len.into()], i32_ty)?;
        let bytes_eq = self.builder.build_int_compare(IntPredicate::EQ, cmp.into_int_value(), self.context.i32_type().const_zero(), "bytes_eq")?;
        let cmp_exit_block = self.builder.get_insert_block().unwrap();
        self.builder.build_unconditional_branch(merge_block)?;

        self.builder.position_at_end(merge_block);
        let phi = self.builder.build_phi(self.context.bool_type(), "streq")?;
        let len_ne = self.context.bool_type().const_zero();
        phi.add_incoming(&[(&len_ne, entry_block), (&bytes_eq, cmp_exit_block)]);
        Ok(phi.as_basic_value())
    }

    /// Concatenation allocates a fresh `Str` via the runtime's
    /// `alloc_string`, then two `memcpy`s copy the operands into it
    /// (spec.md §4.H, §6).
    fn build_str_concat(&mut self, l: StructValue<'ctx>, r: StructValue<'ctx>, str_ty: TypeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let l_len = self.builder.build_extract_value(l, 1, "l_len")?.into_int_value();
        let r_len = self.builder.build_extract_value(r, 1, "r_len")?.into_int_value();
        let total_len = self.builder.build_int_add(l_len, r_len, "concat_len")?;

        let result = self.build_runtime_call("alloc_string", &[total_len.into()], str_ty)?.into_struct_value();
        let data = self.builder.build_extract_value(result, 0, "concat_data")?.into_pointer_value();
        let l_data = self.builder.build_extract_value(l, 0, "l_data")?.into_pointer_value();
        let r_data = self.builder.build_extract_value(r, 0, "r_data")?.into_pointer_value();

        self.builder.build_memcpy(data, 1, l_data, 1, l_len)?;
        let tail = unsafe { self.builder.build_gep(self.context.i8_type(), data, &[l_len], "concat_tail")? };
        self.builder.build_memcpy(tail, 1, r_data, 1, r_len)?;
        Ok(result.into())
    }

    pub(crate) fn build_str_length(&mut self, value: BasicValueEnum<'ctx>) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        Ok(self.builder.build_extract_value(value.into_struct_value(), 1, "str_len")?)
    }
}
