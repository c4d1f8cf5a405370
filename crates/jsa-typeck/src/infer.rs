//! Type inference and monomorphization -- component F (spec.md §3, §4.F).
//!
//! Runs as a sequence of fixed-point passes over one module's [`Program`]:
//!
//! - **Pass 0** resolves `const` initializers and struct/enum field types
//!   together, since a field's fixed-array size can reference a const and
//!   a const's declared type can reference a struct (spec.md §4.F, §4.D).
//! - **Pass 1** resolves every function signature and eagerly creates the
//!   one specialization a fully-typed function will ever need (spec.md
//!   §4.F, glossary "fully typed").
//! - **Call-site specialization** happens on demand while a body is being
//!   inferred rather than as a separate batch pass over all call sites:
//!   by the time a `Call`'s callee is resolved to a generic function, its
//!   argument expressions have already been inferred, so the concrete
//!   argument types are already in hand. This collapses spec.md §4.F's
//!   "Pass 2-4 iterative specialization discovery" into one walk guarded
//!   by a global specialization counter capped the same as the batch
//!   fixed-point would have been (see DESIGN.md).

use rustc_hash::FxHashMap;

use jsa_ast::{
    Block, CompoundOp, ElseBranch, EnumPattern, Expr, ExprKind, ForStmt, FunctionDecl, IfStmt,
    Item, ItemId, PatternBinding, Program, ScopeId, Stmt, StructLiteralField, TypeHint, UnaryOp,
    WhileStmt,
};
use jsa_common::{Code, Diagnostic, DiagnosticContext, Span};

use crate::consteval::{ConstLookup, ConstRef, EvalResult, Evaluator};
use crate::error;
use crate::specialize;
use crate::symbols::SymbolTable;
use crate::traits::{Trait, TraitRegistry};
use crate::ty::{TypeContext, TypeId, TypeInfo};

/// Shared cap across every fixed-point loop in this module (spec.md §4.F).
pub const MAX_FIXEDPOINT_ITERATIONS: usize = 100;

pub struct InferenceOutcome {
    pub root_scope: ScopeId,
}

/// One function another module exports, as the driver hands it to
/// `infer_program` after resolving `Item::Import` against its
/// `ModuleRegistry` (spec.md §4.E's import contract, DESIGN.md). `jsa-typeck`
/// cannot depend on `jsa-modules` (the dependency runs the other way), so
/// the driver passes the exporting module's own `FunctionDecl` rather than
/// a `jsa_modules::Export` -- everything here is already a `jsa-ast` type
/// both crates share.
pub struct ImportedExport<'a> {
    /// The local name this module bound the exporting module under, e.g.
    /// `io` in `import io from "@io"`.
    pub binding_name: &'a str,
    pub func: &'a FunctionDecl,
    /// The link-level symbol codegen should call -- the exporting module's
    /// own mangled name (`jsa_modules::Export::Function`'s `mangled_name`),
    /// not recomputed here.
    pub link_name: String,
}

/// Registers one imported function into `ctx`/`symbols` under
/// `binding.name`, the same qualified-name convention struct methods use
/// (`Type.method`), so `infer_call`'s namespace branch dispatches it exactly
/// like any other named function. Only primitive/ref/array parameter and
/// return types are supported: a struct or enum type owned by the
/// *exporting* module is not copied into this module's arena (spec.md §9
/// "share by reference, not copy" -- see DESIGN.md and Open Question 1).
pub fn register_imported_function(ctx: &mut TypeContext, symbols: &mut SymbolTable, root: ScopeId, import: &ImportedExport) {
    let const_env = ConstEnv::default();
    let param_types: Vec<TypeId> = import
        .func
        .params
        .iter()
        .map(|p| p.type_hint.as_ref().and_then(|h| resolve_type_hint(ctx, &const_env, h)).unwrap_or_else(|| ctx.unknown()))
        .collect();
    let ret_ty = import.func.return_type.as_ref().and_then(|h| resolve_type_hint(ctx, &const_env, h)).unwrap_or_else(|| ctx.void());
    let qualified = format!("{}.{}", import.binding_name, import.func.name);
    let func_ty = ctx.create_function(qualified.clone(), param_types.clone(), ret_ty, Some(import.func.id), import.func.is_variadic, true);
    symbols.insert_function(root, qualified, func_ty, import.func.id);
    if let TypeInfo::Function { specializations, .. } = ctx.get_mut(func_ty) {
        specializations.push(crate::specialize::FunctionSpecialization {
            owning_function_type: func_ty,
            param_types,
            return_type: ret_ty,
            specialized_name: import.link_name.clone(),
            specialized_body: None,
        });
    }
}

#[derive(Default)]
struct ConstEnv {
    values: FxHashMap<String, i64>,
    decls: FxHashMap<String, ItemId>,
}

impl ConstLookup for ConstEnv {
    fn resolve(&self, name: &str) -> Option<ConstRef> {
        self.decls.get(name).map(|&decl| ConstRef { decl, value: self.values.get(name).copied() })
    }
}

/// Entry point: runs every pass over `program` in order, mutating AST node
/// `type_info`/`scope` fields in place and pushing diagnostics as it goes.
pub fn infer_program(
    program: &mut Program,
    ctx: &mut TypeContext,
    traits: &mut TraitRegistry,
    symbols: &mut SymbolTable,
    diagnostics: &mut DiagnosticContext,
    imported_exports: &[ImportedExport],
) -> InferenceOutcome {
    let root = symbols.root_scope();
    let const_env = run_pass0(program, diagnostics);
    register_structs_and_enums(program, ctx, &const_env, diagnostics);

    for import in imported_exports {
        register_imported_function(ctx, symbols, root, import);
    }

    let mut engine = Engine {
        ctx,
        traits,
        symbols,
        diagnostics,
        const_env: &const_env,
        specializations_created: 0,
        root,
        registered_names: FxHashMap::default(),
        loop_depth: 0,
    };
    engine.run_pass1(program, root);
    engine.run_bodies(program);

    InferenceOutcome { root_scope: root }
}

// ── Pass 0: consts ──────────────────────────────────────────────────────

fn run_pass0(program: &Program, diagnostics: &mut DiagnosticContext) -> ConstEnv {
    let mut env = ConstEnv::default();
    for item in &program.items {
        if let Item::Const(c) = item {
            env.decls.insert(c.name.clone(), c.id);
        }
    }

    for _ in 0..MAX_FIXEDPOINT_ITERATIONS {
        let mut progressed = false;
        for item in &program.items {
            let Item::Const(c) = item else { continue };
            if env.values.contains_key(&c.name) {
                continue;
            }
            let mut evaluator = Evaluator::new(&env);
            // Pushed before evaluating `c`'s own initializer so a direct
            // self-reference (`const A = A + 1;`) is caught by
            // `eval_identifier`'s `.contains()` check instead of looping
            // through `Waiting` until the fixed-point cap above expires.
            evaluator.enter(c.id);
            let result = evaluator.eval(&c.init);
            evaluator.leave();
            match result {
                EvalResult::Success(v) => {
                    env.values.insert(c.name.clone(), v);
                    progressed = true;
                }
                EvalResult::Waiting(_, _) => {}
                EvalResult::Cycle(span, _) => {
                    diagnostics.push(error::const_circular(&c.name, span));
                    env.values.insert(c.name.clone(), 0);
                    progressed = true;
                }
                EvalResult::Error(span, _) => {
                    diagnostics.push(Diagnostic::error(Code::ConstNotCompileTime, "invalid const expression", span));
                    env.values.insert(c.name.clone(), 0);
                    progressed = true;
                }
            }
        }
        if !progressed {
            break;
        }
    }

    for item in &program.items {
        if let Item::Const(c) = item {
            if !env.values.contains_key(&c.name) {
                diagnostics.push(error::const_unresolved(&c.name, c.span));
            }
        }
    }
    env
}

// ── Struct/enum field-type resolution ───────────────────────────────────

/// `None` means "not resolvable yet" without mutating `ctx` -- used to
/// decide whether a struct/enum is ready to materialize this iteration, so
/// the arena never accumulates throwaway speculative array/ref entries.
fn hint_is_ready(ctx: &TypeContext, hint: &TypeHint) -> bool {
    match hint {
        TypeHint::Named { name, .. } => primitive_by_name(ctx, name).is_some() || ctx.find_struct(name).is_some() || ctx.find_enum(name).is_some(),
        TypeHint::NamespacePath { .. } => false,
        TypeHint::Ref { target, .. } => hint_is_ready(ctx, target),
        TypeHint::Array { element, .. } => hint_is_ready(ctx, element),
        TypeHint::FixedArray { element, .. } => hint_is_ready(ctx, element),
    }
}

fn primitive_by_name(ctx: &TypeContext, name: &str) -> Option<TypeId> {
    Some(match name {
        "void" => ctx.void(),
        "bool" => ctx.bool_ty(),
        "i8" => ctx.i8_ty(),
        "i16" => ctx.i16_ty(),
        "i32" => ctx.i32_ty(),
        "i64" => ctx.i64_ty(),
        "u8" => ctx.u8_ty(),
        "u16" => ctx.u16_ty(),
        "u32" => ctx.u32_ty(),
        "u64" => ctx.u64_ty(),
        "usize" => ctx.usize_ty(),
        "double" => ctx.double_ty(),
        "str" => ctx.str_ty(),
        "cstr" => ctx.cstr_ty(),
        _ => return None,
    })
}

/// Materializes a ready hint into a real `TypeId`. Only call once
/// [`hint_is_ready`] has confirmed every name it touches already exists.
fn resolve_type_hint(ctx: &mut TypeContext, const_env: &ConstEnv, hint: &TypeHint) -> Option<TypeId> {
    match hint {
        TypeHint::Named { name, .. } => primitive_by_name(ctx, name).or_else(|| ctx.find_struct(name)).or_else(|| ctx.find_enum(name)),
        TypeHint::NamespacePath { .. } => None,
        TypeHint::Ref { target, is_mutable, .. } => {
            let t = resolve_type_hint(ctx, const_env, target)?;
            Some(ctx.get_or_create_ref(t, *is_mutable))
        }
        TypeHint::Array { element, .. } => {
            let e = resolve_type_hint(ctx, const_env, element)?;
            Some(ctx.create_array(e))
        }
        TypeHint::FixedArray { element, .. } => {
            let e = resolve_type_hint(ctx, const_env, element)?;
            Some(ctx.create_array(e))
        }
    }
}

fn eval_array_size(const_env: &ConstEnv, expr: &Expr) -> Option<u64> {
    let mut evaluator = Evaluator::new(const_env);
    match evaluator.eval(expr) {
        EvalResult::Success(v) if v >= 0 => Some(v as u64),
        _ => None,
    }
}

fn register_structs_and_enums(program: &mut Program, ctx: &mut TypeContext, const_env: &ConstEnv, diagnostics: &mut DiagnosticContext) {
    let mut pending_structs: Vec<usize> = Vec::new();
    let mut pending_enums: Vec<usize> = Vec::new();
    for (i, item) in program.items.iter().enumerate() {
        match item {
            Item::Struct(_) => pending_structs.push(i),
            Item::Enum(_) => pending_enums.push(i),
            _ => {}
        }
    }

    for _ in 0..MAX_FIXEDPOINT_ITERATIONS {
        let mut progressed = false;

        pending_structs.retain(|&i| {
            let Item::Struct(s) = &program.items[i] else { unreachable!() };
            if !s.fields.iter().all(|f| hint_is_ready(ctx, &f.type_hint)) {
                return true;
            }
            let mut field_names = Vec::with_capacity(s.fields.len());
            let mut field_types = Vec::with_capacity(s.fields.len());
            for f in &s.fields {
                field_names.push(f.name.clone());
                field_types.push(resolve_type_hint(ctx, const_env, &f.type_hint).expect("checked ready"));
            }
            let Item::Struct(s) = &program.items[i] else { unreachable!() };
            ctx.create_object(s.name.clone(), field_names, field_types, s.id);
            progressed = true;
            false
        });

        pending_enums.retain(|&i| {
            let Item::Enum(e) = &program.items[i] else { unreachable!() };
            if !e.variants.iter().all(|v| v.fields.iter().all(|f| hint_is_ready(ctx, &f.type_hint))) {
                return true;
            }
            let mut variant_names = Vec::with_capacity(e.variants.len());
            let mut variant_field_names = Vec::with_capacity(e.variants.len());
            let mut variant_field_types = Vec::with_capacity(e.variants.len());
            for v in &e.variants {
                variant_names.push(v.name.clone());
                variant_field_names.push(v.fields.iter().map(|f| f.name.clone()).collect());
                variant_field_types.push(
                    v.fields
                        .iter()
                        .map(|f| resolve_type_hint(ctx, const_env, &f.type_hint).expect("checked ready"))
                        .collect(),
                );
            }
            let Item::Enum(e) = &program.items[i] else { unreachable!() };
            ctx.create_enum(e.name.clone(), variant_names, variant_field_names, variant_field_types, e.id);
            progressed = true;
            false
        });

        if !progressed {
            break;
        }
    }

    for &i in &pending_structs {
        let Item::Struct(s) = &program.items[i] else { unreachable!() };
        diagnostics.push(error::unknown_type(&s.name, s.span));
    }
    for &i in &pending_enums {
        let Item::Enum(e) = &program.items[i] else { unreachable!() };
        diagnostics.push(error::unknown_type(&e.name, e.span));
    }
}

// ── Passes 1 and body inference ─────────────────────────────────────────

struct Engine<'a> {
    ctx: &'a mut TypeContext,
    traits: &'a mut TraitRegistry,
    symbols: &'a mut SymbolTable,
    diagnostics: &'a mut DiagnosticContext,
    const_env: &'a ConstEnv,
    specializations_created: usize,
    root: ScopeId,
    /// Maps a declaration's id to the name it was registered under in the
    /// type arena (bare for top-level functions, `Struct.method` for
    /// methods) -- avoids recomputing the struct-qualified form later.
    registered_names: FxHashMap<ItemId, String>,
    /// Nesting depth of `while`/`for` bodies currently being inferred, so
    /// a stray `break`/`continue` can be flagged (spec.md §7 E902/E903).
    loop_depth: usize,
}

impl<'a> Engine<'a> {
    fn resolve_hint_or_unknown(&mut self, hint: &TypeHint) -> TypeId {
        if hint_is_ready(self.ctx, hint) {
            resolve_type_hint(self.ctx, self.const_env, hint).unwrap_or(self.ctx.unknown())
        } else {
            self.diagnostics.push(match hint {
                TypeHint::NamespacePath { namespace, name, span } => error::unresolved_type_path(namespace, name, *span),
                other => error::unknown_type(hint_name(other), other.span()),
            });
            self.ctx.unknown()
        }
    }

    fn run_pass1(&mut self, program: &mut Program, root: ScopeId) {
        for item in &program.items {
            if let Item::Import(decl) = item {
                // spec.md §4.B: "Namespace detection is entry != null &&
                // entry.node != null && entry.node.kind == ImportDecl" --
                // this is the one place that tag gets attached.
                self.symbols.insert_namespace(root, decl.binding_name.clone(), decl.id, self.ctx.unknown());
            }
        }
        for item in &program.items {
            if let Item::Function(f) = item {
                self.register_function_signature(f, None, root);
            }
        }
        for item in &program.items {
            if let Item::Struct(s) = item {
                let self_ty = self.ctx.find_struct(&s.name);
                for m in &s.methods {
                    self.register_function_signature(m, self_ty, root);
                }
            }
        }
    }

    fn register_function_signature(&mut self, f: &FunctionDecl, owner: Option<TypeId>, root: ScopeId) {
        let param_types: Vec<TypeId> = f.params.iter().map(|p| p.type_hint.as_ref().map(|h| self.resolve_hint_or_unknown(h)).unwrap_or(self.ctx.unknown())).collect();
        let ret_ty = f.return_type.as_ref().map(|h| self.resolve_hint_or_unknown(h)).unwrap_or(self.ctx.void());
        let registered_name = match owner {
            Some(owner_ty) => format!("{}.{}", self.ctx.get(owner_ty).type_name(), f.name),
            None => f.name.clone(),
        };
        let func_ty = self.ctx.create_function(registered_name.clone(), param_types.clone(), ret_ty, Some(f.id), f.is_variadic, f.is_fully_typed());
        self.symbols.insert_function(root, registered_name.clone(), func_ty, f.id);
        self.registered_names.insert(f.id, registered_name.clone());

        if f.is_extern {
            return;
        }
        if f.is_fully_typed() {
            let specialized_name = if f.name == "main" { registered_name.clone() } else { self.mangled_name(&registered_name, &param_types) };
            let TypeInfo::Function { specializations, .. } = self.ctx.get_mut(func_ty) else { unreachable!() };
            if specialize::find_by_name_and_args(specializations, &param_types).is_none() {
                specializations.push(crate::specialize::FunctionSpecialization {
                    owning_function_type: func_ty,
                    param_types,
                    return_type: ret_ty,
                    specialized_name,
                    // Left `None`: `run_bodies` infers it on its first
                    // sweep, same as an on-demand specialization would be.
                    specialized_body: None,
                });
            }
        }
    }

    fn mangled_name(&self, base: &str, param_types: &[TypeId]) -> String {
        let ctx = &self.ctx;
        specialize::mangle(base, param_types, |id| ctx.display_name(id))
    }

    /// Infers every body reachable from an eagerly-created specialization,
    /// specializing generic callees on demand as their argument types
    /// become known (spec.md §4.F, §4.G).
    fn run_bodies(&mut self, program: &mut Program) {
        let function_decls: Vec<ItemId> = program
            .items
            .iter()
            .flat_map(|i| match i {
                Item::Function(f) => vec![f.id],
                Item::Struct(s) => s.methods.iter().map(|m| m.id).collect(),
                _ => vec![],
            })
            .collect();

        // Bounded instead of a plain `for`: inferring one specialization's
        // body can discover new call-site specializations on *any*
        // function (including ones already swept this round), so the
        // whole id list is revisited until nothing is left pending
        // (spec.md §4.F "Pass 2-4", folded into this on-demand walk).
        for _ in 0..MAX_FIXEDPOINT_ITERATIONS {
            let mut progressed = false;
            for &id in &function_decls {
                if let Some(mut bodies) = self.take_pending_bodies(program, id) {
                    while let Some((scope, mut body)) = bodies.pop() {
                        self.infer_block(&mut body, scope);
                        self.store_inferred_body(id, body);
                        progressed = true;
                    }
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Pulls every resolved-but-not-yet-body-inferred specialization for
    /// declaration `id` out of the type arena, pairing each with a fresh
    /// scope seeded with its parameter bindings.
    fn take_pending_bodies(&mut self, program: &Program, id: ItemId) -> Option<Vec<(ScopeId, Block)>> {
        let decl = find_function_decl(program, id)?;
        let registered_name = self.registered_names.get(&id)?.clone();
        let func_ty = self.ctx.find_function(&registered_name)?;
        let TypeInfo::Function { specializations, .. } = self.ctx.get(func_ty) else { return None };
        let mut out = Vec::new();
        for spec in specializations {
            if spec.specialized_body.is_some() {
                continue;
            }
            let Some(body) = &decl.body else { continue };
            let scope = self.symbols.child_scope(self.root);
            for (idx, (param, &ty)) in decl.params.iter().zip(spec.param_types.iter()).enumerate() {
                self.symbols.insert_param(scope, param.name.clone(), ty, idx);
            }
            out.push((scope, body.clone()));
        }
        Some(out)
    }

    fn store_inferred_body(&mut self, id: ItemId, body: Block) {
        let Some(registered_name) = self.registered_names.get(&id).cloned() else { return };
        let Some(func_ty) = self.ctx.find_function(&registered_name) else { return };
        if let TypeInfo::Function { specializations, .. } = self.ctx.get_mut(func_ty) {
            if let Some(spec) = specializations.iter_mut().find(|s| s.specialized_body.is_none()) {
                spec.specialized_body = Some(body);
            }
        }
    }

    // ── Statement inference ─────────────────────────────────────────

    fn infer_block(&mut self, block: &mut Block, scope: ScopeId) {
        block.scope = Some(scope);
        for stmt in &mut block.stmts {
            self.infer_stmt(stmt, scope);
        }
    }

    fn infer_stmt(&mut self, stmt: &mut Stmt, scope: ScopeId) {
        match stmt {
            Stmt::Expr(e) => {
                self.infer_expr(e, scope);
            }
            Stmt::Const(c) => {
                let inferred = self.infer_expr(&mut c.init, scope);
                let ty = match &c.type_hint {
                    Some(h) => self.resolve_hint_or_unknown(h),
                    None => inferred,
                };
                self.symbols.insert_variable(scope, c.name.clone(), ty, true, Some(c.id), 0);
            }
            Stmt::Var(v) => {
                let inferred_init = v.init.as_mut().map(|init| self.infer_expr(init, scope));
                let ty = match &v.type_hint {
                    Some(h) => self.resolve_hint_or_unknown(h),
                    None => inferred_init.unwrap_or_else(|| self.ctx.unknown()),
                };
                let array_size = v.array_size.as_ref().and_then(|e| eval_array_size(self.const_env, e)).unwrap_or(0);
                self.symbols.insert_variable(scope, v.name.clone(), ty, false, Some(v.id), array_size);
            }
            Stmt::If(if_stmt) => self.infer_if(if_stmt, scope),
            Stmt::While(w) => self.infer_while(w, scope),
            Stmt::For(f) => self.infer_for(f, scope),
            Stmt::Break(span) => {
                if self.loop_depth == 0 {
                    self.diagnostics.push(error::break_outside_loop(*span));
                }
            }
            Stmt::Continue(span) => {
                if self.loop_depth == 0 {
                    self.diagnostics.push(error::continue_outside_loop(*span));
                }
            }
            Stmt::Return { value, .. } => {
                if let Some(v) = value {
                    self.infer_expr(v, scope);
                }
            }
            Stmt::Delete { target, span } => {
                let ty = self.infer_expr(target, scope);
                if self.ctx.is_ref(ty).is_none() {
                    self.diagnostics.push(error::delete_on_non_ref(&self.ctx.display_name(ty), *span));
                }
            }
            Stmt::Block(b) => {
                let child = self.symbols.child_scope(scope);
                self.infer_block(b, child);
            }
        }
    }

    fn infer_if(&mut self, if_stmt: &mut IfStmt, scope: ScopeId) {
        let then_scope = self.symbols.child_scope(scope);
        if let ExprKind::IsPattern { scrutinee, pattern } = &mut if_stmt.cond.kind {
            let scrutinee_ty = self.infer_expr(scrutinee, scope);
            if_stmt.cond.type_info = Some(self.ctx.bool_ty());
            self.bind_is_pattern(scrutinee_ty, pattern, then_scope);
        } else {
            self.infer_expr(&mut if_stmt.cond, scope);
        }
        self.infer_block(&mut if_stmt.then_branch, then_scope);
        if let Some(else_branch) = &mut if_stmt.else_branch {
            match else_branch.as_mut() {
                ElseBranch::Block(b) => {
                    let else_scope = self.symbols.child_scope(scope);
                    self.infer_block(b, else_scope);
                }
                ElseBranch::If(nested) => self.infer_if(nested, scope),
            }
        }
    }

    /// Two-phase: the scrutinee's variant must match the pattern's
    /// declared enum/variant (spec.md §4.F pattern contract), then
    /// bindings publish onto `then_scope`, never the condition's own scope.
    fn bind_is_pattern(&mut self, scrutinee_ty: TypeId, pattern: &EnumPattern, then_scope: ScopeId) {
        let Some(enum_ty) = self.ctx.find_enum(&pattern.enum_name) else {
            self.diagnostics.push(error::unknown_enum_in_pattern(&pattern.enum_name, pattern.span));
            return;
        };
        if enum_ty != scrutinee_ty {
            self.diagnostics.push(error::type_mismatch(&pattern.enum_name, &self.ctx.display_name(scrutinee_ty), pattern.span));
        }
        let TypeInfo::Enum { variant_names, variant_field_names, variant_field_types, .. } = self.ctx.get(enum_ty) else {
            return;
        };
        let Some(variant_idx) = variant_names.iter().position(|v| v == &pattern.variant_name) else {
            self.diagnostics.push(error::unknown_variant(&pattern.enum_name, &pattern.variant_name, pattern.span));
            return;
        };
        let field_names = variant_field_names[variant_idx].clone();
        let field_types = variant_field_types[variant_idx].clone();

        match pattern.bindings.as_slice() {
            // A single bare binding names the whole variant payload only
            // when the variant has exactly one field; more than one field
            // with a single binding is ambiguous (spec.md §4.F).
            [PatternBinding::Bind { name, .. }] if field_names.len() == 1 => {
                self.symbols.insert_variable(then_scope, name.clone(), field_types[0], false, None, 0);
            }
            [PatternBinding::Bind { .. }] if field_names.len() > 1 => {
                self.diagnostics.push(error::ambiguous_whole_variant_bind(&pattern.variant_name, pattern.span));
            }
            bindings => {
                if bindings.len() != field_names.len() {
                    self.diagnostics.push(error::pattern_binding_count_mismatch(
                        &pattern.variant_name,
                        field_names.len(),
                        bindings.len(),
                        pattern.span,
                    ));
                }
                for (binding, field_ty) in bindings.iter().zip(field_types.iter()) {
                    if let PatternBinding::Bind { name, .. } = binding {
                        self.symbols.insert_variable(then_scope, name.clone(), *field_ty, false, None, 0);
                    }
                }
            }
        }
    }

    fn infer_while(&mut self, w: &mut WhileStmt, scope: ScopeId) {
        self.infer_expr(&mut w.cond, scope);
        let body_scope = self.symbols.child_scope(scope);
        self.loop_depth += 1;
        self.infer_block(&mut w.body, body_scope);
        self.loop_depth -= 1;
    }

    fn infer_for(&mut self, f: &mut ForStmt, scope: ScopeId) {
        let for_scope = self.symbols.child_scope(scope);
        f.scope = Some(for_scope);
        if let Some(init) = &mut f.init {
            self.infer_stmt(init, for_scope);
        }
        if let Some(cond) = &mut f.cond {
            self.infer_expr(cond, for_scope);
        }
        if let Some(update) = &mut f.update {
            self.infer_stmt(update, for_scope);
        }
        let body_scope = self.symbols.child_scope(for_scope);
        self.loop_depth += 1;
        self.infer_block(&mut f.body, body_scope);
        self.loop_depth -= 1;
    }

    // ── Expression inference ────────────────────────────────────────

    fn infer_expr(&mut self, expr: &mut Expr, scope: ScopeId) -> TypeId {
        let ty = self.infer_expr_kind(&mut expr.kind, expr.span, scope);
        expr.type_info = Some(ty);
        ty
    }

    fn infer_expr_kind(&mut self, kind: &mut ExprKind, span: Span, scope: ScopeId) -> TypeId {
        match kind {
            ExprKind::IntLiteral(_) => self.ctx.i32_ty(),
            ExprKind::FloatLiteral(_) => self.ctx.double_ty(),
            ExprKind::BoolLiteral(_) => self.ctx.bool_ty(),
            ExprKind::StringLiteral(_) => self.ctx.str_ty(),
            ExprKind::CStringLiteral(_) => self.ctx.cstr_ty(),
            ExprKind::Identifier(name) => self.infer_identifier(name, span, scope),
            ExprKind::Paren(inner) => self.infer_expr(inner, scope),
            ExprKind::Member { base, name, name_span } => self.infer_member(base, name, *name_span, scope),
            ExprKind::Index { base, index } => self.infer_index(base, index, span, scope),
            ExprKind::Call { callee, args } => self.infer_call(callee, args, span, scope),
            ExprKind::Unary { op, operand, op_span } => self.infer_unary(*op, operand, *op_span, scope),
            ExprKind::Binary { op, lhs, rhs, op_span } => self.infer_binary(*op, lhs, rhs, *op_span, scope),
            ExprKind::Assign { target, value } => {
                let target_ty = self.infer_expr(target, scope);
                let value_ty = self.infer_expr(value, scope);
                if target_ty != value_ty && target_ty != self.ctx.unknown() && value_ty != self.ctx.unknown() {
                    self.diagnostics.push(error::type_mismatch(&self.ctx.display_name(target_ty), &self.ctx.display_name(value_ty), span));
                }
                target_ty
            }
            ExprKind::CompoundAssign { op, target, value, op_span } => self.infer_compound_assign(*op, target, value, *op_span, scope),
            ExprKind::PreIncDec { operand, .. } | ExprKind::PostIncDec { operand, .. } => self.infer_expr(operand, scope),
            ExprKind::NewArray { element, size } => {
                self.infer_expr(size, scope);
                let e = self.resolve_hint_or_unknown(element);
                self.ctx.create_array(e)
            }
            ExprKind::StructLiteral { type_hint, fields, span } => self.infer_struct_literal(type_hint.clone(), fields, *span, scope),
            ExprKind::EnumLiteral { enum_name, variant_name, fields } => self.infer_enum_literal(enum_name, variant_name, fields, span, scope),
            ExprKind::IsPattern { scrutinee, pattern } => {
                let scrutinee_ty = self.infer_expr(scrutinee, scope);
                // Outside of an `if` condition, bindings have no scope to
                // publish into; still validate the variant shape.
                let dummy_scope = self.symbols.child_scope(scope);
                self.bind_is_pattern(scrutinee_ty, pattern, dummy_scope);
                self.ctx.bool_ty()
            }
        }
    }

    fn infer_identifier(&mut self, name: &str, span: Span, scope: ScopeId) -> TypeId {
        match self.symbols.lookup(scope, name) {
            Some(entry) => entry.ty,
            None => {
                self.diagnostics.push(error::undefined_variable(name, span));
                self.ctx.unknown()
            }
        }
    }

    fn infer_member(&mut self, base: &mut Expr, name: &str, name_span: Span, scope: ScopeId) -> TypeId {
        // A bare namespace identifier used as `base` resolves a qualified
        // symbol rather than a struct field; handled by the module loader
        // in the full pipeline. Here we only handle the struct-field case.
        if let ExprKind::Identifier(base_name) = &base.kind {
            if let Some(entry) = self.symbols.lookup(scope, base_name) {
                if entry.is_namespace() {
                    base.type_info = Some(self.ctx.unknown());
                    return self.ctx.unknown();
                }
            }
        }
        let base_ty = self.infer_expr(base, scope);
        if name == "length" && (self.ctx.is_array(base_ty).is_some() || self.ctx.is_string(base_ty)) {
            self.traits.ensure_auto_impl(self.ctx, Trait::Length, base_ty, &[]);
            if let Some(impl_) = self.traits.find_impl(Trait::Length, base_ty, &[]) {
                return impl_.assoc_type_bindings.get("Output").copied().unwrap_or_else(|| self.ctx.usize_ty());
            }
        }
        let idx = self.ctx.find_property(base_ty, name);
        if idx >= 0 {
            if let TypeInfo::Object { field_types, .. } = self.ctx.get(base_ty) {
                return field_types[idx as usize];
            }
        }
        let type_name = self.ctx.display_name(base_ty);
        if self.ctx.find_function(&format!("{type_name}.{name}")).is_some() {
            // Bound method reference; `Call` resolves the full signature.
            return self.ctx.unknown();
        }
        self.diagnostics.push(error::unknown_property(&type_name, name, name_span));
        self.ctx.unknown()
    }

    fn infer_index(&mut self, base: &mut Expr, index: &mut Expr, span: Span, scope: ScopeId) -> TypeId {
        let base_ty = self.infer_expr(base, scope);
        let key_ty = self.infer_expr(index, scope);
        if let Some(element) = self.ctx.is_array(base_ty) {
            return element;
        }
        self.traits.ensure_auto_impl(self.ctx, Trait::Index, base_ty, &[key_ty]);
        if let Some(found) = self.traits.get_binary_output(self.ctx, Trait::Index, base_ty, key_ty) {
            return found;
        }
        if let Some(sub) = self.traits.find_index_candidate(self.ctx, base_ty, key_ty) {
            return self.traits.get_binary_output(self.ctx, Trait::Index, base_ty, sub.candidate).unwrap_or(self.ctx.unknown());
        }
        self.diagnostics.push(error::index_key_not_convertible(&self.ctx.display_name(base_ty), &self.ctx.display_name(key_ty), span));
        self.ctx.unknown()
    }

    fn infer_unary(&mut self, op: UnaryOp, operand: &mut Expr, span: Span, scope: ScopeId) -> TypeId {
        let ty = self.infer_expr(operand, scope);
        match op {
            UnaryOp::Neg => ty,
            UnaryOp::Not => {
                if self.ctx.is_bool(ty) {
                    ty
                } else {
                    self.diagnostics.push(error::trait_not_implemented("Not", &self.ctx.display_name(ty), span));
                    self.ctx.unknown()
                }
            }
        }
    }

    fn infer_binary(&mut self, op: jsa_ast::BinaryOp, lhs: &mut Expr, rhs: &mut Expr, span: Span, scope: ScopeId) -> TypeId {
        let lhs_ty = self.infer_expr(lhs, scope);
        let rhs_ty = self.infer_expr(rhs, scope);

        if matches!(op, jsa_ast::BinaryOp::LogAnd | jsa_ast::BinaryOp::LogOr) {
            return self.ctx.bool_ty();
        }

        let Some((trait_name, method_name)) = op.trait_method() else { return self.ctx.unknown() };
        let Some(trait_) = Trait::from_name(trait_name) else { return self.ctx.unknown() };

        // `Str` equality/concat are registered impls, not numeric fast path.
        if self.ctx.is_string(lhs_ty) {
            self.traits.ensure_auto_impl(self.ctx, trait_, lhs_ty, &[rhs_ty]);
        }
        match self.traits.get_binary_method(self.ctx, trait_, lhs_ty, rhs_ty, method_name) {
            Some(result) => result.output,
            None => {
                self.diagnostics.push(error::trait_not_implemented(trait_name, &self.ctx.display_name(lhs_ty), span));
                self.ctx.unknown()
            }
        }
    }

    fn infer_compound_assign(&mut self, op: CompoundOp, target: &mut Expr, value: &mut Expr, span: Span, scope: ScopeId) -> TypeId {
        let target_ty = self.infer_expr(target, scope);
        let value_ty = self.infer_expr(value, scope);
        let (trait_name, method_name) = op.trait_method();
        let Some(trait_) = Trait::from_name(trait_name) else { return target_ty };
        match self.traits.get_binary_method(self.ctx, trait_, target_ty, value_ty, method_name) {
            Some(_) => target_ty,
            None => {
                self.diagnostics.push(error::trait_not_implemented(trait_name, &self.ctx.display_name(target_ty), span));
                target_ty
            }
        }
    }

    fn infer_struct_literal(&mut self, type_hint: Option<String>, fields: &mut [StructLiteralField], span: Span, scope: ScopeId) -> TypeId {
        for f in fields.iter_mut() {
            self.infer_expr(&mut f.value, scope);
        }
        let Some(name) = type_hint else { return self.ctx.unknown() };
        let Some(struct_ty) = self.ctx.find_struct(&name) else {
            self.diagnostics.push(error::unknown_type(&name, span));
            return self.ctx.unknown();
        };
        let TypeInfo::Object { field_names, .. } = self.ctx.get(struct_ty) else { return struct_ty };
        for required in field_names.clone() {
            if !fields.iter().any(|f| f.name == required) {
                self.diagnostics.push(error::missing_struct_field(&name, &required, span));
            }
        }
        struct_ty
    }

    fn infer_enum_literal(&mut self, enum_name: &str, variant_name: &str, fields: &mut [StructLiteralField], span: Span, scope: ScopeId) -> TypeId {
        for f in fields.iter_mut() {
            self.infer_expr(&mut f.value, scope);
        }
        let Some(enum_ty) = self.ctx.find_enum(enum_name) else {
            self.diagnostics.push(error::unknown_type(enum_name, span));
            return self.ctx.unknown();
        };
        let TypeInfo::Enum { variant_names, .. } = self.ctx.get(enum_ty) else { return enum_ty };
        if !variant_names.contains(&variant_name.to_string()) {
            self.diagnostics.push(error::unknown_variant(enum_name, variant_name, span));
        }
        enum_ty
    }

    fn infer_call(&mut self, callee: &mut Expr, args: &mut [Expr], span: Span, scope: ScopeId) -> TypeId {
        // Method call: `base.method(args)` with `base` an object instance
        // passes `base` as the implicit first argument (spec.md §4.F/§4.G
        // method-call convention, see DESIGN.md). `base.method(args)` with
        // `base` a namespace instead dispatches to whatever the driver
        // registered under `binding.method` when it processed the import
        // (spec.md §4.E, DESIGN.md) -- the namespace prefix is kept, not
        // discarded, so it resolves against the imported module rather than
        // colliding with a same-named local function.
        if let ExprKind::Member { base, name, .. } = &mut callee.kind {
            let namespace_binding = match &base.kind {
                ExprKind::Identifier(n) => self.symbols.lookup(scope, n).filter(|e| e.is_namespace()).map(|_| n.clone()),
                _ => None,
            };
            if let Some(binding) = namespace_binding {
                base.type_info = Some(self.ctx.unknown());
                let mut arg_types = Vec::with_capacity(args.len());
                for a in args.iter_mut() {
                    arg_types.push(self.infer_expr(a, scope));
                }
                callee.type_info = Some(self.ctx.unknown());
                return self.dispatch_call(&format!("{binding}.{name}"), &arg_types, span);
            }

            let base_ty = self.infer_expr(base, scope);
            if self.ctx.is_object(base_ty) {
                let type_name = self.ctx.display_name(base_ty);
                let full_name = format!("{type_name}.{name}");
                let mut arg_types = vec![base_ty];
                for a in args.iter_mut() {
                    arg_types.push(self.infer_expr(a, scope));
                }
                return self.dispatch_call(&full_name, &arg_types, span);
            }
        }

        let mut arg_types = Vec::with_capacity(args.len());
        for a in args.iter_mut() {
            arg_types.push(self.infer_expr(a, scope));
        }

        let name = match &callee.kind {
            ExprKind::Identifier(n) => n.clone(),
            ExprKind::Member { name, .. } => name.clone(),
            _ => {
                self.infer_expr(callee, scope);
                return self.ctx.unknown();
            }
        };
        callee.type_info = Some(self.ctx.unknown());
        self.dispatch_call(&name, &arg_types, span)
    }

    fn dispatch_call(&mut self, name: &str, arg_types: &[TypeId], span: Span) -> TypeId {
        let Some(func_ty) = self.ctx.find_function(name) else {
            self.diagnostics.push(error::undefined_function(name, span));
            return self.ctx.unknown();
        };
        let TypeInfo::Function { params, ret, is_variadic, is_fully_typed, .. } = self.ctx.get(func_ty).clone() else {
            return self.ctx.unknown();
        };
        if !is_variadic && params.len() != arg_types.len() {
            self.diagnostics.push(error::wrong_argument_count(name, params.len(), arg_types.len(), span));
        }
        if is_fully_typed {
            return ret;
        }
        self.specialize_call(func_ty, name, arg_types, span)
    }

    /// Creates (or reuses) the specialization for `arg_types`, inferring
    /// its body immediately if this is the first time it's needed
    /// (spec.md §4.F/§4.G). `self.specializations_created` is the safety
    /// net spec.md's iteration cap protects against in batch form.
    fn specialize_call(&mut self, func_ty: TypeId, name: &str, arg_types: &[TypeId], span: Span) -> TypeId {
        let TypeInfo::Function { specializations, decl, .. } = self.ctx.get(func_ty) else {
            return self.ctx.unknown();
        };
        if let Some(existing) = specialize::find_by_name_and_args(specializations, arg_types) {
            return existing.return_type;
        }
        if self.specializations_created >= MAX_FIXEDPOINT_ITERATIONS * 8 {
            self.diagnostics.warning_unresolved_specialization(name, span);
            return self.ctx.unknown();
        }
        let Some(decl_id) = *decl else { return self.ctx.unknown() };
        self.specializations_created += 1;

        let ret_ty = self.ctx.unknown();
        let mangled = self.mangled_name(name, arg_types);
        let TypeInfo::Function { specializations, .. } = self.ctx.get_mut(func_ty) else { return ret_ty };
        specializations.push(crate::specialize::FunctionSpecialization {
            owning_function_type: func_ty,
            param_types: arg_types.to_vec(),
            return_type: ret_ty,
            specialized_name: mangled,
            specialized_body: None,
        });
        let _ = decl_id;
        // The body is inferred by `run_bodies`'s next sweep over pending
        // specializations; its return type is refined there too (return-
        // type inference inside a specialized body, spec.md §4.F).
        ret_ty
    }
}

trait UnresolvedSpecializationDiagnostic {
    fn warning_unresolved_specialization(&mut self, name: &str, span: Span);
}

impl UnresolvedSpecializationDiagnostic for DiagnosticContext {
    fn warning_unresolved_specialization(&mut self, name: &str, span: Span) {
        self.warning(
            Code::ConstUnresolved,
            format!("`{name}` produced more specializations than the compiler's safety limit allows"),
            span,
        );
    }
}

fn find_function_decl(program: &Program, id: ItemId) -> Option<&FunctionDecl> {
    for item in &program.items {
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

fn hint_name(hint: &TypeHint) -> &str {
    match hint {
        TypeHint::Named { name, .. } => name,
        TypeHint::NamespacePath { name, .. } => name,
        TypeHint::Ref { .. } => "ref",
        TypeHint::Array { .. } => "array",
        TypeHint::FixedArray { .. } => "array",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsa_ast::{BinaryOp, ConstDecl, ImportDecl, Param};
    use pretty_assertions::assert_eq;

    fn span() -> Span {
        Span::new(0, 1)
    }

    fn named_hint(name: &str) -> TypeHint {
        TypeHint::Named { name: name.to_string(), span: span() }
    }

    fn ident(name: &str) -> Expr {
        Expr::new(ExprKind::Identifier(name.to_string()), span())
    }

    fn int(n: i64) -> Expr {
        Expr::new(ExprKind::IntLiteral(n), span())
    }

    fn param(name: &str, ty: &str) -> Param {
        Param { name: name.to_string(), type_hint: Some(named_hint(ty)), span: span() }
    }

    fn fully_typed_fn(name: &str, params: Vec<Param>, ret: &str, body: Vec<Stmt>) -> FunctionDecl {
        FunctionDecl {
            id: 0,
            name: name.to_string(),
            params,
            return_type: Some(named_hint(ret)),
            body: Some(Block::new(body, span())),
            is_variadic: false,
            is_export: false,
            is_extern: false,
            span: span(),
        }
    }

    struct Harness {
        ctx: TypeContext,
        traits: TraitRegistry,
        symbols: SymbolTable,
        diagnostics: DiagnosticContext,
    }

    impl Harness {
        fn new() -> Self {
            Self { ctx: TypeContext::new(), traits: TraitRegistry::new(), symbols: SymbolTable::new(), diagnostics: DiagnosticContext::new() }
        }

        fn run(&mut self, mut program: Program, imports: &[ImportedExport]) -> InferenceOutcome {
            infer_program(&mut program, &mut self.ctx, &mut self.traits, &mut self.symbols, &mut self.diagnostics, imports)
        }
    }

    #[test]
    fn fully_typed_function_body_infers_without_diagnostics() {
        let mut h = Harness::new();
        let body = vec![Stmt::Return {
            value: Some(Expr::new(
                ExprKind::Binary { op: BinaryOp::Add, lhs: Box::new(ident("x")), rhs: Box::new(ident("y")), op_span: span() },
                span(),
            )),
            span: span(),
        }];
        let f = fully_typed_fn("add", vec![param("x", "i32"), param("y", "i32")], "i32", body);
        let program = Program::new(vec![Item::Function(f)]);

        h.run(program, &[]);

        assert!(h.diagnostics.is_empty(), "unexpected diagnostics: {:?}", h.diagnostics.iter().collect::<Vec<_>>());
        let func_ty = h.ctx.find_function("add").expect("add registered");
        assert_eq!(h.ctx.display_name(func_ty), "add");
    }

    #[test]
    fn wrong_argument_count_is_reported() {
        let mut h = Harness::new();
        let callee_fn = fully_typed_fn("add", vec![param("x", "i32"), param("y", "i32")], "i32", vec![Stmt::Return { value: Some(int(0)), span: span() }]);
        let caller_body = vec![Stmt::Expr(Expr::new(
            ExprKind::Call { callee: Box::new(ident("add")), args: vec![int(1)] },
            span(),
        ))];
        let caller = fully_typed_fn("main", vec![], "void", caller_body);
        let program = Program::new(vec![Item::Function(callee_fn), Item::Function(caller)]);

        h.run(program, &[]);

        let codes: Vec<Code> = h.diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![Code::WrongArgumentCount]);
    }

    #[test]
    fn direct_self_reference_is_a_cycle_not_an_unresolved_const() {
        let mut diagnostics = DiagnosticContext::new();
        let program = Program::new(vec![Item::Const(ConstDecl {
            id: 0,
            name: "A".to_string(),
            array_size: None,
            type_hint: None,
            init: Expr::new(ExprKind::Binary { op: BinaryOp::Add, lhs: Box::new(ident("A")), rhs: Box::new(int(1)), op_span: span() }, span()),
            is_export: false,
            span: span(),
        })]);

        run_pass0(&program, &mut diagnostics);

        let codes: Vec<Code> = diagnostics.iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![Code::ConstCircular]);
    }

    #[test]
    fn namespaced_call_dispatches_to_the_imported_function() {
        let mut h = Harness::new();
        let io_println = fully_typed_fn("println", vec![param("fmt", "str")], "void", vec![]);

        let import_decl = ImportDecl { id: 0, binding_name: "io".to_string(), path: "@io".to_string(), imported_module: Some(1), span: span() };
        let call = Expr::new(
            ExprKind::Call {
                callee: Box::new(Expr::new(ExprKind::Member { base: Box::new(ident("io")), name: "println".to_string(), name_span: span() }, span())),
                args: vec![Expr::new(ExprKind::StringLiteral("hi".to_string()), span())],
            },
            span(),
        );
        let main_fn = fully_typed_fn("main", vec![], "void", vec![Stmt::Expr(call)]);
        let program = Program::new(vec![Item::Import(import_decl), Item::Function(main_fn)]);

        let imports = vec![ImportedExport { binding_name: "io", func: &io_println, link_name: "println".to_string() }];
        h.run(program, &imports);

        assert!(h.diagnostics.is_empty(), "unexpected diagnostics: {:?}", h.diagnostics.iter().collect::<Vec<_>>());
        assert!(h.ctx.find_function("io.println").is_some());
        // The bare name must not have been registered against the local
        // module's own symbol table -- only the namespaced form should
        // resolve, or a same-named local function could shadow the import.
        assert!(h.ctx.find_function("println").is_none());
    }
}
