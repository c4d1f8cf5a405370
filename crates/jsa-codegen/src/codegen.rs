//! IR lowering entry point -- component H (spec.md §4.H).
//!
//! One LLVM function is emitted per [`jsa_typeck::FunctionSpecialization`],
//! not per source-level [`FunctionDecl`]: a generic function with three
//! call-site instantiations becomes three LLVM functions, each under its
//! mangled name. Struct bodies are predeclared before any function so a
//! field referencing a struct declared later in the file still resolves.

use inkwell::basic_block::BasicBlock;
use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage, Module};
use inkwell::targets::{CodeModel, InitializationConfig, RelocMode, Target, TargetMachine, TargetTriple};
use inkwell::types::BasicMetadataTypeEnum;
use inkwell::values::{FunctionValue, PointerValue};
use inkwell::OptimizationLevel;
use rustc_hash::FxHashMap;

use jsa_ast::{FunctionDecl, Item, ItemId, Program, ScopeId, StructDecl};
use jsa_common::DiagnosticContext;
use jsa_typeck::{SymbolTable, TraitRegistry, TypeContext, TypeId, TypeInfo};

use crate::error::CodegenError;
use crate::types::{self, StructCache};

pub(crate) struct LoopTargets<'ctx> {
    pub continue_block: BasicBlock<'ctx>,
    pub exit_block: BasicBlock<'ctx>,
}

pub struct CodeGen<'ctx, 'a> {
    pub(crate) context: &'ctx Context,
    pub(crate) module: Module<'ctx>,
    pub(crate) builder: Builder<'ctx>,
    target_machine: TargetMachine,
    pub(crate) cache: StructCache<'ctx>,
    pub(crate) ty_ctx: &'a mut TypeContext,
    pub(crate) traits: &'a mut TraitRegistry,
    pub(crate) symbols: &'a SymbolTable,
    pub(crate) program: &'a Program,
    pub(crate) diagnostics: &'a mut DiagnosticContext,
    pub(crate) functions: FxHashMap<String, FunctionValue<'ctx>>,
    pub(crate) locals: FxHashMap<(ScopeId, String), PointerValue<'ctx>>,
    pub(crate) current_fn: Option<FunctionValue<'ctx>>,
    pub(crate) loop_stack: Vec<LoopTargets<'ctx>>,
}

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub fn new(
        context: &'ctx Context,
        module_name: &str,
        ty_ctx: &'a mut TypeContext,
        traits: &'a mut TraitRegistry,
        symbols: &'a SymbolTable,
        program: &'a Program,
        diagnostics: &'a mut DiagnosticContext,
    ) -> Result<Self, CodegenError> {
        Target::initialize_native(&InitializationConfig::default()).map_err(CodegenError::NoTarget)?;
        let triple = TargetTriple::create(&TargetMachine::get_default_triple().to_string());
        let target = Target::from_triple(&triple).map_err(|e| CodegenError::NoTarget(e.to_string()))?;
        let target_machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| CodegenError::NoTargetMachine(triple.to_string()))?;

        let module = context.create_module(module_name);
        module.set_triple(&triple);
        module.set_data_layout(&target_machine.get_target_data().get_data_layout());

        Ok(Self {
            context,
            module,
            builder: context.create_builder(),
            target_machine,
            cache: StructCache::new(),
            ty_ctx,
            traits,
            symbols,
            program,
            diagnostics,
            functions: FxHashMap::default(),
            locals: FxHashMap::default(),
            current_fn: None,
            loop_stack: Vec::new(),
        })
    }

    pub fn target_machine(&self) -> &TargetMachine {
        &self.target_machine
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    pub fn into_module(self) -> Module<'ctx> {
        self.module
    }

    /// Runs the full pipeline: struct predeclaration, function-prototype
    /// predeclaration (so mutually recursive specializations can call each
    /// other before either body is lowered), then body lowering (spec.md
    /// §4.H).
    pub fn compile(&mut self) -> Result<(), CodegenError> {
        types::predeclare_structs(self.context, self.ty_ctx, &mut self.cache);
        self.predeclare_functions()?;
        self.lower_function_bodies()?;
        self.module
            .verify()
            .map_err(|e| CodegenError::Verification(e.to_string()))
    }

    fn llvm_type(&self, id: TypeId) -> inkwell::types::BasicTypeEnum<'ctx> {
        types::llvm_type(self.context, self.ty_ctx, &self.cache, id)
    }

    fn declare_fn(&mut self, name: &str, params: &[TypeId], ret: TypeId, is_variadic: bool, linkage: Option<Linkage>) -> FunctionValue<'ctx> {
        if let Some(existing) = self.module.get_function(name) {
            return existing;
        }
        let param_llvm: Vec<BasicMetadataTypeEnum> = params.iter().map(|&p| self.llvm_type(p).into()).collect();
        let fn_type = if types::is_void(self.ty_ctx, ret) {
            self.context.void_type().fn_type(&param_llvm, is_variadic)
        } else {
            self.llvm_type(ret).fn_type(&param_llvm, is_variadic)
        };
        self.module.add_function(name, fn_type, linkage)
    }

    /// Declares every extern function under its source name and every
    /// specialization under its mangled name, before any body is lowered
    /// (spec.md §4.H: "specialization prototype predeclaration for mutual
    /// recursion").
    fn predeclare_functions(&mut self) -> Result<(), CodegenError> {
        for id in self.ty_ctx.iter_functions().collect::<Vec<_>>() {
            let TypeInfo::Function { name, params, ret, decl, is_variadic, specializations, .. } = self.ty_ctx.get(id).clone() else { continue };
            let is_extern = decl.map(|d| self.is_extern_function(d)).unwrap_or(true);
            if is_extern {
                let f = self.declare_fn(&name, &params, ret, is_variadic, Some(Linkage::External));
                self.functions.insert(name.clone(), f);
                continue;
            }
            for spec in &specializations {
                let f = self.declare_fn(&spec.specialized_name, &spec.param_types, spec.return_type, false, None);
                self.functions.insert(spec.specialized_name.clone(), f);
            }
        }
        Ok(())
    }

    fn lower_function_bodies(&mut self) -> Result<(), CodegenError> {
        for id in self.ty_ctx.iter_functions().collect::<Vec<_>>() {
            let TypeInfo::Function { decl, specializations, .. } = self.ty_ctx.get(id).clone() else { continue };
            let param_names = decl.and_then(|d| self.find_function_decl(d)).map(|f| f.params.iter().map(|p| p.name.clone()).collect::<Vec<_>>());
            for spec in specializations {
                let Some(body) = spec.specialized_body.clone() else { continue };
                let function = *self
                    .functions
                    .get(&spec.specialized_name)
                    .ok_or_else(|| CodegenError::MissingFunction(spec.specialized_name.clone()))?;
                let names = self.param_names_for(param_names.as_deref(), spec.param_types.len());
                self.lower_one_function(function, &body, &spec, &names)?;
            }
        }
        Ok(())
    }

    /// Method calls pass the receiver as an implicit first argument (the
    /// method-call-convention assumption recorded in DESIGN.md), so a
    /// specialization can carry one more parameter than its source
    /// declaration; that extra leading slot is named `self`.
    fn param_names_for(&self, declared: Option<&[String]>, count: usize) -> Vec<String> {
        let declared = declared.unwrap_or(&[]);
        if declared.len() + 1 == count {
            let mut names = vec!["self".to_string()];
            names.extend(declared.iter().cloned());
            names
        } else if declared.len() == count {
            declared.to_vec()
        } else {
            (0..count).map(|i| format!("arg{i}")).collect()
        }
    }

    fn lower_one_function(
        &mut self,
        function: FunctionValue<'ctx>,
        body: &jsa_ast::Block,
        spec: &jsa_typeck::FunctionSpecialization,
        param_names: &[String],
    ) -> Result<(), CodegenError> {
        self.current_fn = Some(function);
        let entry = self.context.append_basic_block(function, "entry");
        self.builder.position_at_end(entry);

        let scope = body.scope.expect("inference must assign a scope to every function body (spec.md §4.H)");
        self.bind_params(function, scope, &spec.param_types, param_names)?;

        self.lower_block(body)?;

        // Every path inference accepted must already end in a terminator
        // for a non-void function (`MissingReturn`, E208, is an inference-
        // time diagnostic); a void function may simply fall off the end.
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            if types::is_void(self.ty_ctx, spec.return_type) {
                self.builder.build_return(None)?;
            } else {
                self.builder.build_unreachable()?;
            }
        }
        self.current_fn = None;
        Ok(())
    }

    /// Entry-block alloca hoisting: every parameter and every `var`/`const`
    /// gets its alloca in the function's entry block regardless of where
    /// lexically it is declared, by saving and restoring the builder's
    /// insertion point around each `build_alloca` call (spec.md §4.H).
    pub(crate) fn alloca_in_entry(&mut self, llvm_ty: inkwell::types::BasicTypeEnum<'ctx>, name: &str) -> Result<PointerValue<'ctx>, CodegenError> {
        let current_block = self.builder.get_insert_block().expect("alloca_in_entry called outside a function body");
        let function = self.current_fn.expect("alloca_in_entry called outside a function body");
        let entry = function.get_first_basic_block().expect("function must have an entry block");
        match entry.get_first_instruction() {
            Some(first) => self.builder.position_before(&first),
            None => self.builder.position_at_end(entry),
        }
        let ptr = self.builder.build_alloca(llvm_ty, name)?;
        self.builder.position_at_end(current_block);
        Ok(ptr)
    }

    fn bind_params(&mut self, function: FunctionValue<'ctx>, scope: ScopeId, param_types: &[TypeId], names: &[String]) -> Result<(), CodegenError> {
        for (i, name) in names.iter().enumerate() {
            let Some(value) = function.get_nth_param(i as u32) else { continue };
            value.set_name(name);
            let llvm_ty = self.llvm_type(param_types[i]);
            let ptr = self.alloca_in_entry(llvm_ty, name)?;
            self.builder.build_store(ptr, value)?;
            self.locals.insert((scope, name.clone()), ptr);
        }
        Ok(())
    }

    fn is_extern_function(&self, decl_id: ItemId) -> bool {
        self.find_function_decl(decl_id).map(|f| f.is_extern).unwrap_or(true)
    }

    pub(crate) fn find_function_decl(&self, id: ItemId) -> Option<&'a FunctionDecl> {
        for item in &self.program.items {
            match item {
                Item::Function(f) if f.id == id => return Some(f),
                Item::Struct(s) => {
                    if let Some(m) = s.methods.iter().find(|m| m.id == id) {
                        return Some(m);
                    }
                }
                _ => {}
            }
        }
        None
    }

    /// Calls a runtime symbol from the fixed set spec.md §6 names (`alloc`,
    /// `free`, `alloc_string`, `memcmp`, ...), declaring its prototype from
    /// the actual argument values on first use -- a lazily-declared
    /// external is simpler than threading every signature through from
    /// the start.
    pub(crate) fn build_runtime_call(
        &mut self,
        name: &str,
        args: &[inkwell::values::BasicValueEnum<'ctx>],
        ret_ty: TypeId,
    ) -> Result<inkwell::values::BasicValueEnum<'ctx>, CodegenError> {
        let function = match self.module.get_function(name) {
            Some(f) => f,
            None => {
                let param_llvm: Vec<inkwell::types::BasicMetadataTypeEnum> = args.iter().map(|a| a.get_type().into()).collect();
                let fn_type = if types::is_void(self.ty_ctx, ret_ty) {
                    self.context.void_type().fn_type(&param_llvm, false)
                } else {
                    self.llvm_type(ret_ty).fn_type(&param_llvm, false)
                };
                self.module.add_function(name, fn_type, Some(Linkage::External))
            }
        };
        let arg_metadata: Vec<inkwell::values::BasicMetadataValueEnum> = args.iter().map(|&a| a.into()).collect();
        let call = self.builder.build_call(function, &arg_metadata, if types::is_void(self.ty_ctx, ret_ty) { "" } else { "rt_call" })?;
        Ok(call
            .try_as_basic_value()
            .left()
            .unwrap_or_else(|| self.context.struct_type(&[], false).const_zero().into()))
    }

    pub(crate) fn find_struct_decl(&self, id: ItemId) -> Option<&'a StructDecl> {
        self.program.items.iter().find_map(|item| match item {
            Item::Struct(s) if s.id == id => Some(s),
            _ => None,
        })
    }
}
