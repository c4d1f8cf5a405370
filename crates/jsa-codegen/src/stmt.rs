//! Statement lowering -- component H (spec.md §4.H).

use jsa_ast::{Block, ElseBranch, ExprKind, ForStmt, IfStmt, Stmt, WhileStmt};

use crate::codegen::{CodeGen, LoopTargets};
use crate::error::CodegenError;

impl<'ctx, 'a> CodeGen<'ctx, 'a> {
    pub(crate) fn lower_block(&mut self, block: &Block) -> Result<(), CodegenError> {
        let scope = block.scope.expect("inference must assign a scope to every block (spec.md §4.B, §4.H)");
        for stmt in &block.stmts {
            self.lower_stmt(stmt, scope)?;
            // A `return`/`break`/`continue` already closed this block with a
            // terminator; anything lexically after it is dead and LLVM
            // requires exactly one terminator per block.
            if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_some() {
                break;
            }
        }
        Ok(())
    }

    fn lower_stmt(&mut self, stmt: &Stmt, scope: jsa_ast::ScopeId) -> Result<(), CodegenError> {
        match stmt {
            Stmt::Expr(e) => {
                self.lower_expr(e, scope)?;
                Ok(())
            }
            Stmt::Const(c) => {
                let ty = c.init.type_info.expect("const initializer must be typed before lowering");
                let local = self.declare_local(scope, &c.name, ty)?;
                let value = self.lower_expr(&c.init, scope)?;
                self.builder.build_store(local, value)?;
                Ok(())
            }
            Stmt::Var(v) => {
                let ty = v
                    .init
                    .as_ref()
                    .and_then(|i| i.type_info)
                    .unwrap_or_else(|| panic!("var `{}` has no resolved type at lowering", v.name));
                let local = self.declare_local(scope, &v.name, ty)?;
                if let Some(init) = &v.init {
                    let value = self.lower_expr(init, scope)?;
                    self.builder.build_store(local, value)?;
                }
                Ok(())
            }
            Stmt::If(if_stmt) => self.lower_if(if_stmt, scope),
            Stmt::While(w) => self.lower_while(w),
            Stmt::For(f) => self.lower_for(f),
            Stmt::Break(_) => {
                let target = self.loop_stack.last().ok_or(CodegenError::LoopStackEmpty)?;
                self.builder.build_unconditional_branch(target.exit_block)?;
                Ok(())
            }
            Stmt::Continue(_) => {
                let target = self.loop_stack.last().ok_or(CodegenError::LoopStackEmpty)?;
                self.builder.build_unconditional_branch(target.continue_block)?;
                Ok(())
            }
            Stmt::Return { value, .. } => {
                match value {
                    Some(v) => {
                        let val = self.lower_expr(v, scope)?;
                        self.builder.build_return(Some(&val))?;
                    }
                    None => {
                        self.builder.build_return(None)?;
                    }
                }
                Ok(())
            }
            Stmt::Delete { target, .. } => {
                let ptr = self.lower_expr(target, scope)?.into_pointer_value();
                self.build_runtime_call("free", &[ptr.into()], self.ty_ctx.void())?;
                Ok(())
            }
            Stmt::Block(b) => self.lower_block(b),
        }
    }

    /// `if`/`else if`/`else`, with the `is`-pattern two-phase contract:
    /// when `cond` is an `IsPattern`, its tag check runs in the outer
    /// scope and its bindings are materialized into `then_branch`'s own
    /// scope before the branch body lowers (spec.md §4.F, §9).
    fn lower_if(&mut self, if_stmt: &IfStmt, scope: jsa_ast::ScopeId) -> Result<(), CodegenError> {
        let function = self.current_fn.expect("lower_if requires an active function");
        let then_block = self.context.append_basic_block(function, "if.then");
        let else_block = self.context.append_basic_block(function, "if.else");
        let merge_block = self.context.append_basic_block(function, "if.merge");

        if let ExprKind::IsPattern { scrutinee, pattern } = &if_stmt.cond.kind {
            let (matches, payload_ptr) = self.lower_enum_tag_check(scrutinee, pattern, scope)?;
            let enum_ty = scrutinee.type_info.expect("scrutinee must be typed before lowering");
            self.builder.build_conditional_branch(matches, then_block, else_block)?;
            self.builder.position_at_end(then_block);
            let then_scope = if_stmt.then_branch.scope.expect("`is` pattern then-branch must have a scope");
            self.bind_pattern_locals(enum_ty, &pattern.variant_name, &pattern.bindings, payload_ptr, then_scope)?;
        } else {
            let cond = self.lower_expr(&if_stmt.cond, scope)?.into_int_value();
            self.builder.build_conditional_branch(cond, then_block, else_block)?;
            self.builder.position_at_end(then_block);
        };

        self.lower_block(&if_stmt.then_branch)?;
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder.build_unconditional_branch(merge_block)?;
        }

        self.builder.position_at_end(else_block);
        match &if_stmt.else_branch {
            Some(branch) => match branch.as_ref() {
                ElseBranch::Block(b) => self.lower_block(b)?,
                ElseBranch::If(nested) => self.lower_if(nested, scope)?,
            },
            None => {}
        }
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder.build_unconditional_branch(merge_block)?;
        }

        self.builder.position_at_end(merge_block);
        Ok(())
    }

    fn lower_while(&mut self, w: &WhileStmt) -> Result<(), CodegenError> {
        let function = self.current_fn.expect("lower_while requires an active function");
        let cond_block = self.context.append_basic_block(function, "while.cond");
        let body_block = self.context.append_basic_block(function, "while.body");
        let exit_block = self.context.append_basic_block(function, "while.exit");

        let outer_scope = w.body.scope.and_then(|s| self.symbols.parent_of(s)).unwrap_or(0);
        self.builder.build_unconditional_branch(cond_block)?;
        self.builder.position_at_end(cond_block);
        let cond = self.lower_expr(&w.cond, outer_scope)?.into_int_value();
        self.builder.build_conditional_branch(cond, body_block, exit_block)?;

        self.builder.position_at_end(body_block);
        self.loop_stack.push(LoopTargets { continue_block: cond_block, exit_block });
        self.lower_block(&w.body)?;
        self.loop_stack.pop();
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder.build_unconditional_branch(cond_block)?;
        }

        self.builder.position_at_end(exit_block);
        Ok(())
    }

    /// `continue` jumps to `update`, not straight back to `cond`, so the
    /// increment still runs on every iteration (spec.md §4.H: break/
    /// continue via `(exit_block, continue_block)` pairs).
    fn lower_for(&mut self, f: &ForStmt) -> Result<(), CodegenError> {
        let function = self.current_fn.expect("lower_for requires an active function");
        let init_scope = f.scope.expect("`for` must have a scope for its init binding");
        if let Some(init) = &f.init {
            self.lower_stmt(init, init_scope)?;
        }

        let cond_block = self.context.append_basic_block(function, "for.cond");
        let body_block = self.context.append_basic_block(function, "for.body");
        let update_block = self.context.append_basic_block(function, "for.update");
        let exit_block = self.context.append_basic_block(function, "for.exit");

        self.builder.build_unconditional_branch(cond_block)?;
        self.builder.position_at_end(cond_block);
        match &f.cond {
            Some(cond) => {
                let cond_val = self.lower_expr(cond, init_scope)?.into_int_value();
                self.builder.build_conditional_branch(cond_val, body_block, exit_block)?;
            }
            None => {
                self.builder.build_unconditional_branch(body_block)?;
            }
        }

        self.builder.position_at_end(body_block);
        self.loop_stack.push(LoopTargets { continue_block: update_block, exit_block });
        self.lower_block(&f.body)?;
        self.loop_stack.pop();
        if self.builder.get_insert_block().and_then(|b| b.get_terminator()).is_none() {
            self.builder.build_unconditional_branch(update_block)?;
        }

        self.builder.position_at_end(update_block);
        if let Some(update) = &f.update {
            self.lower_stmt(update, init_scope)?;
        }
        self.builder.build_unconditional_branch(cond_block)?;

        self.builder.position_at_end(exit_block);
        Ok(())
    }
}
