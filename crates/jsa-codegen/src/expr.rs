//! Expression lowering -- component H (spec.md §4.H).

use inkwell::values::{BasicValueEnum, PointerValue};
use inkwell::IntPredicate;

use jsa_ast::{BinaryOp, CompoundOp, EnumPattern, Expr, ExprKind, IncDecOp, PatternBinding, ScopeId, UnaryOp};
use jsa_typeck::{MethodImpl, Trait, TypeId, TypeInfo};

use crate::codegen::CodeGen;
use crate::error::CodegenError;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    fn expr_ty(&self, expr: &Expr) -> TypeId {
        expr.type_info.expect("inference must annotate every expression before lowering (spec.md §4.F invariant 1)")
    }

    pub(crate) fn lookup_local_ptr(&self, scope: ScopeId, name: &str) -> Option<PointerValue<'ctx>> {
        let mut current = Some(scope);
        while let Some(s) = current {
            if let Some(&ptr) = self.locals.get(&(s, name.to_string())) {
                return Some(ptr);
            }
            current = self.symbols.parent_of(s);
        }
        None
    }

    pub(crate) fn declare_local(&mut self, scope: ScopeId, name: &str, ty: TypeId) -> Result<PointerValue<'ctx>, CodegenError> {
        let llvm_ty = self.llvm_type_pub(ty);
        let ptr = self.alloca_in_entry(llvm_ty, name)?;
        self.locals.insert((scope, name.to_string()), ptr);
        Ok(ptr)
    }

    pub(crate) fn llvm_type_pub(&self, ty: TypeId) -> inkwell::types::BasicTypeEnum<'ctx> {
        crate::types::llvm_type(self.context, self.ty_ctx, &self.cache, ty)
    }

    /// A local's fixed element count, if the symbol table recorded one for
    /// this name (spec.md §4.H: stack arrays carry their size on the
    /// `Variable` symbol entry; zero means "not a known-size stack array",
    /// i.e. a heap array or a plain pointer parameter).
    fn stack_array_size(&self, scope: ScopeId, name: &str) -> Option<u32> {
        let entry = self.symbols.lookup(scope, name)?;
        match entry.kind {
            jsa_typeck::SymbolKind::Variable { array_size, .. } if array_size > 0 => Some(array_size as u32),
            _ => None,
        }
    }

    /// Resolves an assignable expression to its storage address. Array and
    /// struct rvalues that aren't themselves lvalues (e.g. a call result)
    /// are spilled to a fresh alloca first so the rest of lowering can
    /// treat "pointer to a place" uniformly.
    pub(crate) fn lower_lvalue(&mut self, expr: &Expr, scope: ScopeId) -> Result<PointerValue<'ctx>, CodegenError> {
        match &expr.kind {
            ExprKind::Identifier(name) => Ok(self
                .lookup_local_ptr(scope, name)
                .unwrap_or_else(|| panic!("undefined local `{name}` reached lowering (spec.md §7 should have caught this)"))),
            ExprKind::Paren(inner) => self.lower_lvalue(inner, scope),
            ExprKind::Member { base, name, .. } => {
                let base_ty = self.expr_ty(base);
                let base_ptr = self.lower_lvalue(base, scope)?;
                let TypeInfo::Object { field_names, .. } = self.ty_ctx.get(base_ty) else {
                    panic!("`{name}` accessed on a non-struct type at lowering");
                };
                let index = field_names.iter().position(|f| f == name).unwrap_or_else(|| panic!("unknown field `{name}` reached lowering"));
                let struct_ty = self.llvm_type_pub(base_ty).into_struct_type();
                Ok(self.builder.build_struct_gep(struct_ty, base_ptr, index as u32, "field")?)
            }
            ExprKind::Index { base, index } => {
                let base_ty = self.expr_ty(base);
                let element_ty = self.ty_ctx.is_array(base_ty).expect("index base must be an array type at lowering");
                let element_llvm = self.llvm_type_pub(element_ty);
                let index_val = self.lower_expr(index, scope)?.into_int_value();

                if let ExprKind::Identifier(name) = &base.kind {
                    if let Some(size) = self.stack_array_size(scope, name) {
                        let array_llvm = element_llvm.array_type(size);
                        let base_ptr = self.lower_lvalue(base, scope)?;
                        let zero = self.context.i32_type().const_zero();
                        return Ok(unsafe { self.builder.build_gep(array_llvm, base_ptr, &[zero, index_val], "stack_idx")? });
                    }
                }
                // Heap array: the base itself is a bare pointer value (not an
                // lvalue we GEP through), so a single index steps through it
                // directly (spec.md §4.H two-index-vs-single-index split).
                let base_ptr = self.lower_expr(base, scope)?.into_pointer_value();
                Ok(unsafe { self.builder.build_gep(element_llvm, base_ptr, &[index_val], "heap_idx")? })
            }
            other => panic!("expression kind {other:?} is not assignable at lowering"),
        }
    }

    pub(crate) fn lower_expr(&mut self, expr: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        match &expr.kind {
            ExprKind::IntLiteral(v) => {
                let ty = self.llvm_type_pub(self.expr_ty(expr)).into_int_type();
                Ok(ty.const_int(*v as u64, self.ty_ctx.is_signed(self.expr_ty(expr))).into())
            }
            ExprKind::FloatLiteral(v) => Ok(self.context.f64_type().const_float(*v).into()),
            ExprKind::BoolLiteral(v) => Ok(self.context.bool_type().const_int(*v as u64, false).into()),
            ExprKind::StringLiteral(s) => Ok(self.build_string_literal(s)?),
            ExprKind::CStringLiteral(s) => {
                let global = self.builder.build_global_string_ptr(s, "cstr")?;
                Ok(global.as_pointer_value().into())
            }
            ExprKind::Identifier(name) => {
                let ptr = self
                    .lookup_local_ptr(scope, name)
                    .unwrap_or_else(|| panic!("undefined local `{name}` reached lowering"));
                let llvm_ty = self.llvm_type_pub(self.expr_ty(expr));
                Ok(self.builder.build_load(llvm_ty, ptr, name)?)
            }
            ExprKind::Paren(inner) => self.lower_expr(inner, scope),
            ExprKind::Member { base, name, .. } if name == "length" && self.ty_ctx.is_string(self.expr_ty(base)) => {
                let base_val = self.lower_expr(base, scope)?;
                self.build_str_length(base_val)
            }
            ExprKind::Member { base, name, .. } if name == "length" && self.ty_ctx.is_array(self.expr_ty(base)).is_some() => {
                // Arrays carry no runtime length metadata (stack arrays are
                // sized at compile time; heap arrays are bare pointers), so
                // `.length` only resolves for a known-size stack array.
                let ExprKind::Identifier(base_name) = &base.kind else {
                    panic!("`.length` on a heap array has no runtime length to read");
                };
                let size = self
                    .stack_array_size(scope, base_name)
                    .unwrap_or_else(|| panic!("`.length` on a heap array has no runtime length to read"));
                Ok(self.context.i64_type().const_int(size as u64, false).into())
            }
            ExprKind::Member { .. } => {
                let ptr = self.lower_lvalue(expr, scope)?;
                let llvm_ty = self.llvm_type_pub(self.expr_ty(expr));
                Ok(self.builder.build_load(llvm_ty, ptr, "field_val")?)
            }
            ExprKind::Index { .. } => {
                let ptr = self.lower_lvalue(expr, scope)?;
                let llvm_ty = self.llvm_type_pub(self.expr_ty(expr));
                Ok(self.builder.build_load(llvm_ty, ptr, "idx_val")?)
            }
            ExprKind::Unary { op, operand, .. } => self.lower_unary(*op, operand, scope),
            ExprKind::Binary { op, lhs, rhs, .. } => self.lower_binary(*op, lhs, rhs, scope),
            ExprKind::Assign { target, value } => self.lower_assign(target, value, scope),
            ExprKind::CompoundAssign { op, target, value, .. } => self.lower_compound_assign(*op, target, value, scope),
            ExprKind::PreIncDec { op, operand } => self.lower_inc_dec(*op, operand, scope, true),
            ExprKind::PostIncDec { op, operand } => self.lower_inc_dec(*op, operand, scope, false),
            ExprKind::NewArray { size, .. } => self.lower_new_array(expr, size, scope),
            ExprKind::StructLiteral { fields, .. } => self.lower_struct_literal(expr, fields, scope),
            ExprKind::EnumLiteral { variant_name, fields, .. } => self.lower_enum_literal(expr, variant_name, fields, scope),
            ExprKind::IsPattern { scrutinee, pattern } => self.lower_is_pattern_expr(scrutinee, pattern, scope),
            ExprKind::Call { callee, args } => self.lower_call(expr, callee, args, scope),
        }
    }

    /// `Str` is the value struct named by spec.md §6: `{ data: *u8, length:
    /// usize }`. The bytes live in a constant global; the literal's value
    /// is the `{ptr, i64}` struct pointing at it.
    fn build_string_literal(&mut self, s: &str) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let bytes = s.as_bytes();
        let i64_ty = self.context.i64_type();
        let i8_ty = self.context.i8_type();
        let len = i64_ty.const_int(bytes.len() as u64, false);
        let data = i8_ty.const_array(&bytes.iter().map(|&b| i8_ty.const_int(b as u64, false)).collect::<Vec<_>>());
        let global = self.module.add_global(data.get_type(), None, "str_lit_data");
        global.set_constant(true);
        global.set_initializer(&data);
        let str_ty = crate::types::str_struct_type(self.context);
        Ok(str_ty.const_named_struct(&[global.as_pointer_value().into(), len.into()]).into())
    }

    fn lower_unary(&mut self, op: UnaryOp, operand: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let operand_ty = self.expr_ty(operand);
        let trait_name = match op {
            UnaryOp::Neg => "Neg",
            UnaryOp::Not => "Not",
        };
        let value = self.lower_expr(operand, scope)?;
        self.build_unary_intrinsic(trait_name, value, operand_ty)
    }

    fn lower_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        if matches!(op, BinaryOp::LogAnd | BinaryOp::LogOr) {
            return self.lower_short_circuit(op, lhs, rhs, scope);
        }
        let (trait_name, method_name) = op.trait_method().expect("non-short-circuit binary ops always map to a trait");
        let trait_ = Trait::from_name(trait_name).expect("trait_method names a registered Trait variant");
        let lhs_ty = self.expr_ty(lhs);
        let rhs_ty = self.expr_ty(rhs);
        let lv = self.lower_expr(lhs, scope)?;
        let rv = self.lower_expr(rhs, scope)?;

        let method = self
            .traits
            .get_binary_method(&mut *self.ty_ctx, trait_, lhs_ty, rhs_ty, method_name)
            .unwrap_or_else(|| panic!("no `{trait_name}::{method_name}` impl reached lowering for a resolved binary op"));

        let result = match method.method {
            MethodImpl::Intrinsic(tag) => self.build_binary_intrinsic(tag, lv, rv, lhs_ty)?,
            MethodImpl::External { linkage_name } => self.build_runtime_call(&linkage_name, &[lv, rv], method.output)?,
            MethodImpl::UserFunction { .. } => panic!("user-defined trait methods are not reachable from today's grammar"),
        };

        match op {
            BinaryOp::Ne => Ok(self.builder.build_not(result.into_int_value(), "ne")?.into()),
            BinaryOp::Le => {
                let swapped = self.lower_binary(BinaryOp::Lt, rhs, lhs, scope)?;
                Ok(self.builder.build_not(swapped.into_int_value(), "le")?.into())
            }
            BinaryOp::Gt => self.lower_binary(BinaryOp::Lt, rhs, lhs, scope),
            BinaryOp::Ge => {
                let swapped = self.lower_binary(BinaryOp::Lt, lhs, rhs, scope)?;
                Ok(self.builder.build_not(swapped.into_int_value(), "ge")?.into())
            }
            _ => Ok(result),
        }
    }

    /// `&&`/`||` as a basic-block diamond with a phi node, never eagerly
    /// evaluating the right operand (spec.md §4.C, §4.H).
    fn lower_short_circuit(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let function = self.current_fn.expect("short-circuit lowering requires an active function");
        let lhs_block = self.builder.get_insert_block().unwrap();
        let rhs_block = self.context.append_basic_block(function, "sc.rhs");
        let merge_block = self.context.append_basic_block(function, "sc.merge");

        let lv = self.lower_expr(lhs, scope)?.into_int_value();
        match op {
            BinaryOp::LogAnd => self.builder.build_conditional_branch(lv, rhs_block, merge_block)?,
            BinaryOp::LogOr => self.builder.build_conditional_branch(lv, merge_block, rhs_block)?,
            _ => unreachable!("lower_short_circuit only called for LogAnd/LogOr"),
        };

        self.builder.position_at_end(rhs_block);
        let rv = self.lower_expr(rhs, scope)?.into_int_value();
        let rhs_exit_block = self.builder.get_insert_block().unwrap();
        self.builder.build_unconditional_branch(merge_block)?;

        self.builder.position_at_end(merge_block);
        let phi = self.builder.build_phi(self.context.bool_type(), "sc.result")?;
        let short_circuit_value = self.context.bool_type().const_int(matches!(op, BinaryOp::LogOr) as u64, false);
        phi.add_incoming(&[(&short_circuit_value, lhs_block), (&rv, rhs_exit_block)]);
        Ok(phi.as_basic_value())
    }

    /// `RefIndex` is only ever auto-implemented for arrays (spec.md §4.C),
    /// so every `Index`-assignment that survives inference has an array
    /// base; `lower_lvalue`'s `Index` arm already resolves it to a GEP.
    fn lower_assign(&mut self, target: &Expr, value: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let target_ty = self.expr_ty(target);
        let value_val = self.lower_expr(value, scope)?;
        let target_ptr = self.lower_lvalue(target, scope)?;
        self.store_value(target_ptr, value_val, target_ty)?;
        Ok(value_val)
    }

    /// Struct-to-struct assignment copies via `llvm.memcpy` instead of a
    /// load+store of the whole aggregate (spec.md §4.H: "memcpy-based
    /// struct assignment"); every other type stores directly.
    fn store_value(&mut self, target_ptr: PointerValue<'ctx>, value: BasicValueEnum<'ctx>, ty: TypeId) -> Result<(), CodegenError> {
        if self.ty_ctx.is_object(ty) && value.is_pointer_value() {
            let llvm_ty = self.llvm_type_pub(ty);
            let size = self.target_machine().get_target_data().get_abi_size(&llvm_ty);
            self.builder
                .build_memcpy(target_ptr, 8, value.into_pointer_value(), 8, self.context.i64_type().const_int(size, false))?;
        } else {
            self.builder.build_store(target_ptr, value)?;
        }
        Ok(())
    }

    fn lower_compound_assign(&mut self, op: CompoundOp, target: &Expr, value: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let (trait_name, method_name) = op.trait_method();
        let trait_ = Trait::from_name(trait_name).expect("compound-assign trait names are always registered");
        let target_ty = self.expr_ty(target);
        let target_ptr = self.lower_lvalue(target, scope)?;
        let current = self.builder.build_load(self.llvm_type_pub(target_ty), target_ptr, "compound_lhs")?;
        let rhs_ty = self.expr_ty(value);
        let rhs_val = self.lower_expr(value, scope)?;

        let method = self
            .traits
            .get_binary_method(&mut *self.ty_ctx, trait_, target_ty, rhs_ty, method_name)
            .unwrap_or_else(|| panic!("no `{trait_name}` impl reached lowering for a resolved compound assignment"));
        let intrinsic_tag = match method.method {
            MethodImpl::Intrinsic(tag) => tag,
            _ => panic!("compound assignment only lowers the numeric fast path today"),
        };
        let arithmetic_tag = match op {
            CompoundOp::AddAssign => if self.ty_ctx.is_double(target_ty) { "float.add" } else { "int.add" },
            CompoundOp::SubAssign => if self.ty_ctx.is_double(target_ty) { "float.sub" } else { "int.sub" },
            CompoundOp::MulAssign => if self.ty_ctx.is_double(target_ty) { "float.mul" } else { "int.mul" },
            CompoundOp::DivAssign => if self.ty_ctx.is_double(target_ty) { "float.div" } else { "int.div" },
        };
        debug_assert_eq!(intrinsic_tag, arithmetic_tag, "compound-assign trait must resolve to the matching arithmetic intrinsic");
        let result = self.build_binary_intrinsic(arithmetic_tag, current, rhs_val, target_ty)?;
        self.builder.build_store(target_ptr, result)?;
        Ok(result)
    }

    fn lower_inc_dec(&mut self, op: IncDecOp, operand: &Expr, scope: ScopeId, is_pre: bool) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let ty = self.expr_ty(operand);
        let ptr = self.lower_lvalue(operand, scope)?;
        let llvm_ty = self.llvm_type_pub(ty);
        let current = self.builder.build_load(llvm_ty, ptr, "incdec_old")?.into_int_value();
        let one = current.get_type().const_int(1, false);
        let updated = match op {
            IncDecOp::Inc => self.builder.build_int_add(current, one, "inc")?,
            IncDecOp::Dec => self.builder.build_int_sub(current, one, "dec")?,
        };
        self.builder.build_store(ptr, updated)?;
        Ok(if is_pre { updated.into() } else { current.into() })
    }

    fn lower_new_array(&mut self, expr: &Expr, size: &Expr, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let array_ty = self.expr_ty(expr);
        let element_ty = self.ty_ctx.is_array(array_ty).expect("NewArray must carry an array TypeId");
        let element_llvm = self.llvm_type_pub(element_ty);
        let elem_size = self.target_machine().get_target_data().get_abi_size(&element_llvm);
        let count = self.lower_expr(size, scope)?.into_int_value();
        let count64 = self.builder.build_int_z_extend(count, self.context.i64_type(), "count64")?;
        let total = self.builder.build_int_mul(count64, self.context.i64_type().const_int(elem_size, false), "bytes")?;
        self.build_runtime_call("alloc", &[total.into()], array_ty)
    }

    fn lower_struct_literal(&mut self, expr: &Expr, fields: &[jsa_ast::StructLiteralField], scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let struct_ty = self.expr_ty(expr);
        let TypeInfo::Object { field_names, .. } = self.ty_ctx.get(struct_ty).clone() else {
            panic!("struct literal must resolve to TypeInfo::Object at lowering");
        };
        let llvm_struct_ty = self.llvm_type_pub(struct_ty);
        let tmp = self.alloca_in_entry(llvm_struct_ty, "struct_lit")?;
        let struct_llvm = llvm_struct_ty.into_struct_type();
        for field in fields {
            let index = field_names.iter().position(|f| f == &field.name).unwrap_or_else(|| panic!("unknown field `{}` reached lowering", field.name));
            let field_ptr = self.builder.build_struct_gep(struct_llvm, tmp, index as u32, "field_init")?;
            let value = self.lower_expr(&field.value, scope)?;
            self.builder.build_store(field_ptr, value)?;
        }
        Ok(self.builder.build_load(llvm_struct_ty, tmp, "struct_val")?)
    }

    fn lower_enum_literal(&mut self, expr: &Expr, variant_name: &str, fields: &[jsa_ast::StructLiteralField], scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let enum_ty = self.expr_ty(expr);
        let TypeInfo::Enum { variant_names, variant_field_names, variant_field_types, .. } = self.ty_ctx.get(enum_ty).clone() else {
            panic!("enum literal must resolve to TypeInfo::Enum at lowering");
        };
        let variant_index = variant_names.iter().position(|v| v == variant_name).unwrap_or_else(|| panic!("unknown variant `{variant_name}` reached lowering"));

        let enum_llvm = self.llvm_type_pub(enum_ty);
        let tmp = self.alloca_in_entry(enum_llvm, "enum_lit")?;
        let enum_struct = enum_llvm.into_struct_type();
        let tag_ptr = self.builder.build_struct_gep(enum_struct, tmp, 0, "tag_ptr")?;
        self.builder.build_store(tag_ptr, self.context.i32_type().const_int(variant_index as u64, false))?;

        let payload_ptr = self.builder.build_struct_gep(enum_struct, tmp, 1, "payload_ptr")?;
        let field_types = &variant_field_types[variant_index];
        let field_names = &variant_field_names[variant_index];
        let field_llvm: Vec<_> = field_types.iter().map(|&t| self.llvm_type_pub(t)).collect();
        let variant_struct = self.context.struct_type(&field_llvm, false);
        for field in fields {
            let index = field_names.iter().position(|f| f == &field.name).unwrap_or_else(|| panic!("unknown enum field `{}` reached lowering", field.name));
            let field_ptr = self.builder.build_struct_gep(variant_struct, payload_ptr, index as u32, "variant_field")?;
            let value = self.lower_expr(&field.value, scope)?;
            self.builder.build_store(field_ptr, value)?;
        }
        Ok(self.builder.build_load(enum_llvm, tmp, "enum_val")?)
    }

    /// `scrutinee is Enum.Variant(...)` used as a value (outside an `if`,
    /// e.g. as a loop condition) -- the same tag check `lower_if` uses,
    /// without binding extraction since there is no `then` block to
    /// publish bindings onto.
    fn lower_is_pattern_expr(&mut self, scrutinee: &Expr, pattern: &EnumPattern, scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let (tag_value, _) = self.lower_enum_tag_check(scrutinee, pattern, scope)?;
        Ok(tag_value.into())
    }

    /// Loads an enum scrutinee's tag and compares it against the pattern's
    /// variant index, returning the `i1` comparison plus the payload
    /// pointer for any caller that also needs to extract bindings.
    pub(crate) fn lower_enum_tag_check(&mut self, scrutinee: &Expr, pattern: &EnumPattern, scope: ScopeId) -> Result<(inkwell::values::IntValue<'ctx>, PointerValue<'ctx>), CodegenError> {
        let enum_ty = self.expr_ty(scrutinee);
        let TypeInfo::Enum { variant_names, .. } = self.ty_ctx.get(enum_ty).clone() else {
            panic!("`is` pattern scrutinee must be an enum type at lowering");
        };
        let variant_index = variant_names.iter().position(|v| v == &pattern.variant_name).unwrap_or_else(|| panic!("unknown variant `{}` reached lowering", pattern.variant_name));
        let scrutinee_ptr = self.lower_lvalue(scrutinee, scope)?;
        let enum_llvm = self.llvm_type_pub(enum_ty).into_struct_type();
        let tag_ptr = self.builder.build_struct_gep(enum_llvm, scrutinee_ptr, 0, "tag_ptr")?;
        let tag = self.builder.build_load(self.context.i32_type(), tag_ptr, "tag")?.into_int_value();
        let matches = self.builder.build_int_compare(IntPredicate::EQ, tag, self.context.i32_type().const_int(variant_index as u64, false), "tag_match")?;
        let payload_ptr = self.builder.build_struct_gep(enum_llvm, scrutinee_ptr, 1, "payload_ptr")?;
        Ok((matches, payload_ptr))
    }

    /// Recomputes the callee's mangled name the same way `jsa-typeck`
    /// built it during specialization (spec.md §4.G): lowering never
    /// records which specialization a call site picked, it recovers the
    /// same deterministic name from the (already-inferred) argument types.
    fn lower_call(&mut self, expr: &Expr, callee: &Expr, args: &[Expr], scope: ScopeId) -> Result<BasicValueEnum<'ctx>, CodegenError> {
        let ret_ty = self.expr_ty(expr);
        let (base_name, receiver) = match &callee.kind {
            ExprKind::Identifier(name) => (name.clone(), None),
            ExprKind::Member { base, name, .. } => {
                let base_ty = self.expr_ty(base);
                if self.ty_ctx.is_object(base_ty) {
                    let struct_name = self.ty_ctx.get(base_ty).type_name().to_string();
                    (format!("{struct_name}.{name}"), Some(base.as_ref()))
                } else {
                    (name.clone(), None)
                }
            }
            other => panic!("call target {other:?} did not resolve to a callable name during inference"),
        };

        let mut arg_values = Vec::with_capacity(args.len() + 1);
        let mut arg_types = Vec::with_capacity(args.len() + 1);
        if let Some(recv) = receiver {
            arg_types.push(self.expr_ty(recv));
            arg_values.push(self.lower_expr(recv, scope)?);
        }
        for arg in args {
            arg_types.push(self.expr_ty(arg));
            arg_values.push(self.lower_expr(arg, scope)?);
        }

        let mangled = jsa_typeck::specialize::mangle(&base_name, &arg_types, |id| self.ty_ctx.display_name(id));
        let function = *self
            .functions
            .get(&mangled)
            .or_else(|| self.functions.get(&base_name))
            .unwrap_or_else(|| panic!("call to `{base_name}` (mangled `{mangled}`) has no predeclared prototype at lowering"));

        let arg_metadata: Vec<inkwell::values::BasicMetadataValueEnum> = arg_values.iter().map(|&v| v.into()).collect();
        let call_name = if crate::types::is_void(self.ty_ctx, ret_ty) { "" } else { "call" };
        let call = self.builder.build_call(function, &arg_metadata, call_name)?;
        Ok(call
            .try_as_basic_value()
            .left()
            .unwrap_or_else(|| self.context.struct_type(&[], false).const_zero().into()))
    }

    /// Materializes an `is` pattern's bindings into fresh locals in
    /// `then_scope`, reading each bound field out of the payload pointer
    /// `lower_enum_tag_check` already computed (spec.md §4.F: bindings
    /// publish onto the `then_branch`'s scope, not the condition's).
    pub(crate) fn bind_pattern_locals(
        &mut self,
        enum_ty: TypeId,
        variant_name: &str,
        bindings: &[PatternBinding],
        payload_ptr: PointerValue<'ctx>,
        then_scope: ScopeId,
    ) -> Result<(), CodegenError> {
        let TypeInfo::Enum { variant_names, variant_field_names, variant_field_types, .. } = self.ty_ctx.get(enum_ty).clone() else {
            return Ok(());
        };
        let variant_index = variant_names.iter().position(|v| v == variant_name).expect("variant already validated by lower_enum_tag_check");
        let field_types = &variant_field_types[variant_index];
        let field_names = &variant_field_names[variant_index];
        let field_llvm: Vec<_> = field_types.iter().map(|&t| self.llvm_type_pub(t)).collect();
        let variant_struct = self.context.struct_type(&field_llvm, false);

        for (i, binding) in bindings.iter().enumerate() {
            let PatternBinding::Bind { name, .. } = binding else { continue };
            if i >= field_types.len() {
                continue;
            }
            let field_ptr = self.builder.build_struct_gep(variant_struct, payload_ptr, i as u32, "bound_field")?;
            let field_ty = field_types[i];
            let value = self.builder.build_load(self.llvm_type_pub(field_ty), field_ptr, &field_names[i])?;
            let local = self.declare_local(then_scope, name, field_ty)?;
            self.builder.build_store(local, value)?;
        }
        Ok(())
    }
}
