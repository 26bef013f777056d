//! The tree-walking interpreter: entry points, statements and calls.
//!
//! Expression and condition evaluation live in `eval_expr`.

use std::sync::Arc;

use yu_types::ast::*;

use crate::config::InterpreterConfig;
use crate::context::Context;
use crate::error::{EvalError, EvalResult};
use crate::pool::ContextPool;
use crate::registry::{FunctionRegistry, Module, NativeFunction};
use crate::store::SessionId;
use crate::value::Value;

/// What a call site resolved to.
enum Callee {
    Script(Arc<FunctionDef>),
    Registered(Arc<dyn NativeFunction>),
}

/// Evaluates parsed programs for one session.
///
/// Cloning is cheap; clones share the function registry and context pool.
/// The registry can only be changed while no clone is alive, which keeps it
/// fixed for the duration of any evaluation that could observe it.
#[derive(Debug, Clone)]
pub struct Interpreter {
    session: SessionId,
    registry: Arc<FunctionRegistry>,
    pool: Arc<ContextPool>,
    config: Arc<InterpreterConfig>,
}

impl Interpreter {
    pub fn new(session: SessionId) -> Self {
        Self::with_config(session, InterpreterConfig::default())
    }

    pub fn with_config(session: SessionId, config: InterpreterConfig) -> Self {
        Self {
            session,
            registry: Arc::new(FunctionRegistry::new()),
            pool: Arc::new(ContextPool::new(config.context_pool_capacity)),
            config: Arc::new(config),
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn config(&self) -> &InterpreterConfig {
        &self.config
    }

    pub fn registry(&self) -> &FunctionRegistry {
        &self.registry
    }

    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Registration
    // ══════════════════════════════════════════════════════════════════════════

    fn registry_mut(&mut self) -> EvalResult<&mut FunctionRegistry> {
        Arc::get_mut(&mut self.registry).ok_or(EvalError::RegistryInUse)
    }

    /// Add a global callable.
    pub fn register_function(&mut self, function: Arc<dyn NativeFunction>) -> EvalResult<()> {
        let name = function.name().to_string();
        let arity = function.arity();
        self.registry_mut()?.register(function);
        tracing::debug!(function = %name, %arity, "registered function");
        Ok(())
    }

    pub fn register_module(&mut self, module: Module) -> EvalResult<()> {
        let name = module.name().to_string();
        let count = module.len();
        self.registry_mut()?.register_module(module)?;
        tracing::debug!(module = %name, functions = count, "registered module");
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Entry points
    // ══════════════════════════════════════════════════════════════════════════

    /// A fresh context bound to this interpreter's session.
    pub fn new_context(&self) -> Context {
        Context::new(self.session)
    }

    /// Run `scope` on a pooled context that is discarded afterwards.
    pub fn eval(&self, scope: &Scope) -> EvalResult<()> {
        let mut ctx = self.pool.obtain(self.session);
        self.eval_with(scope, &mut ctx)
    }

    /// Run `scope` on a caller-supplied context, leaving its variables
    /// readable afterwards.
    pub fn eval_with(&self, scope: &Scope, ctx: &mut Context) -> EvalResult<()> {
        tracing::debug!(
            session = %ctx.session(),
            statements = scope.block.stmts.len(),
            functions = scope.functions().len(),
            "evaluating program"
        );
        self.exec_block(&scope.block, ctx)
    }

    /// Parse and run `source`.
    pub fn eval_source(&self, source: &str) -> EvalResult<()> {
        let scope = yu_parser::parse_source(&self.config.file_name, source)?;
        self.eval(&scope)
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Statements
    // ══════════════════════════════════════════════════════════════════════════

    /// Run a block's statements in order until the context terminates.
    ///
    /// Before each statement, a directly following `{ ... }` sibling is
    /// offered for attachment; if the statement claims it, it is skipped.
    pub fn exec_block(&self, block: &CodeBlock, ctx: &mut Context) -> EvalResult<()> {
        let has_functions = !block.functions.is_empty();
        if has_functions {
            ctx.push_lexical(block.functions.clone());
        }
        ctx.push_offer_frame();
        let result = self.run_statements(&block.stmts, ctx);
        ctx.pop_offer_frame();
        if has_functions {
            ctx.pop_lexical();
        }
        result
    }

    fn run_statements(&self, stmts: &[Stmt], ctx: &mut Context) -> EvalResult<()> {
        let mut index = 0;
        while index < stmts.len() && !ctx.is_terminated() {
            let following = match stmts.get(index + 1) {
                Some(Stmt::Block(block)) => Some(Arc::clone(block)),
                _ => None,
            };
            ctx.offer_block(following);
            self.exec_stmt(&stmts[index], ctx)?;
            index += if ctx.offer_claimed() { 2 } else { 1 };
        }
        Ok(())
    }

    fn exec_stmt(&self, stmt: &Stmt, ctx: &mut Context) -> EvalResult<()> {
        match stmt {
            Stmt::Block(block) => self.exec_block(block, ctx),
            Stmt::Assign(assign) => {
                let value = self.eval_expression(&assign.value, ctx)?;
                ctx.set(&assign.target, value);
                Ok(())
            }
            Stmt::If(tree) => {
                if self.eval_condition(&tree.condition, ctx)? {
                    self.exec_block(&tree.body, ctx)
                } else if let Some(else_body) = &tree.else_body {
                    self.exec_block(else_body, ctx)
                } else {
                    Ok(())
                }
            }
            Stmt::While(tree) => {
                ctx.enter_loop();
                let result = self.run_while(tree, ctx);
                ctx.exit_loop();
                result
            }
            Stmt::For(tree) => self.exec_for(tree, ctx),
            Stmt::Break(span) => {
                if ctx.break_loop() {
                    Ok(())
                } else {
                    Err(EvalError::BreakOutsideLoop(*span))
                }
            }
            Stmt::EndCode(_) => {
                ctx.set_early_exit();
                Ok(())
            }
            Stmt::Call(call) => self.call_function(call, ctx),
            Stmt::ModuleCall(call) => self.call_module_function(call, ctx),
        }
    }

    fn run_while(&self, tree: &WhileTree, ctx: &mut Context) -> EvalResult<()> {
        while !ctx.is_terminated() && self.eval_condition(&tree.condition, ctx)? {
            self.exec_block(&tree.body, ctx)?;
        }
        Ok(())
    }

    fn exec_for(&self, tree: &ForTree, ctx: &mut Context) -> EvalResult<()> {
        let dest = self.eval_term(&tree.dest, ctx)?;
        let src = self.eval_term(&tree.src, ctx)?;
        ctx.enter_loop();
        let result = self.run_for(tree, &dest, src, ctx);
        ctx.exit_loop();
        result
    }

    fn run_for(&self, tree: &ForTree, dest: &Value, src: Value, ctx: &mut Context) -> EvalResult<()> {
        if let (Some(from), Some(to)) = (dest.as_integer(), src.as_integer()) {
            for _ in from..=to {
                if ctx.is_terminated() {
                    break;
                }
                self.exec_block(&tree.body, ctx)?;
            }
            return Ok(());
        }

        let target = match &tree.dest.kind {
            TermKind::Var(var) if !tree.dest.invert && !tree.dest.negate => Some(var),
            _ => None,
        };
        match (target, src) {
            (Some(var), Value::Array(items)) => {
                for item in items {
                    if ctx.is_terminated() {
                        break;
                    }
                    ctx.set(var, item);
                    self.exec_block(&tree.body, ctx)?;
                }
            }
            (_, src) => {
                tracing::warn!(
                    span = %tree.span,
                    dest = dest.type_name(),
                    src = src.type_name(),
                    "for loop needs two integers or a variable and an array; skipping"
                );
            }
        }
        Ok(())
    }

    // ══════════════════════════════════════════════════════════════════════════
    // Calls
    // ══════════════════════════════════════════════════════════════════════════

    fn call_function(&self, call: &FunctionCall, ctx: &mut Context) -> EvalResult<()> {
        match self.resolve_call(call, ctx)? {
            Callee::Script(def) => self.call_user_function(&def, &call.args, ctx),
            Callee::Registered(function) => self.invoke(&function, &call.args, ctx),
        }
    }

    /// Cached resolution if still valid, then enclosing blocks innermost
    /// first, then the global registry.
    fn resolve_call(&self, call: &FunctionCall, ctx: &Context) -> EvalResult<Callee> {
        let arity = call.args.len();
        let generation = self.registry.generation();

        match call.cache.get() {
            Some(Resolution::Nested(def)) => {
                if let Some(def) = def.upgrade() {
                    return Ok(Callee::Script(def));
                }
            }
            Some(Resolution::Registry { generation: g, slot }) if *g == generation => {
                if let Some(function) = self.registry.slot(*slot) {
                    return Ok(Callee::Registered(Arc::clone(function)));
                }
            }
            _ => {}
        }

        if let Some(def) = ctx.find_function(&call.name, arity) {
            tracing::trace!(function = %call.name, arity, "resolved nested function");
            call.cache.fill(Resolution::Nested(Arc::downgrade(&def)));
            return Ok(Callee::Script(def));
        }
        if let Some(slot) = self.registry.resolve(&call.name, arity) {
            if let Some(function) = self.registry.slot(slot) {
                tracing::trace!(function = %call.name, arity, slot, "resolved registered function");
                call.cache.fill(Resolution::Registry { generation, slot });
                return Ok(Callee::Registered(Arc::clone(function)));
            }
        }
        Err(EvalError::UnresolvedFunction {
            name: call.name.clone(),
            arity,
            span: call.span,
        })
    }

    fn call_module_function(&self, call: &ModuleFunctionCall, ctx: &mut Context) -> EvalResult<()> {
        let generation = self.registry.generation();
        let unknown = || EvalError::UnknownModule {
            module: call.module.clone(),
            span: call.call.span,
        };

        let module_id = match call.module_cache.get() {
            Some(slot) if slot.generation == generation => slot.module,
            _ => {
                let id = self.registry.module_id(&call.module).ok_or_else(unknown)?;
                tracing::trace!(module = %call.module, id, "resolved module");
                call.module_cache.fill(ModuleSlot {
                    generation,
                    module: id,
                });
                id
            }
        };
        let module = self.registry.module(module_id).ok_or_else(unknown)?;

        let arity = call.call.args.len();
        let cached = match call.call.cache.get() {
            Some(Resolution::Registry { generation: g, slot }) if *g == generation => {
                module.function(*slot)
            }
            _ => None,
        };
        let function = match cached {
            Some(function) => function,
            None => {
                let index = module.resolve(&call.call.name, arity).ok_or_else(|| {
                    EvalError::UnresolvedModuleFunction {
                        module: call.module.clone(),
                        name: call.call.name.clone(),
                        arity,
                        span: call.call.span,
                    }
                })?;
                call.call.cache.fill(Resolution::Registry {
                    generation,
                    slot: index,
                });
                module.function(index).ok_or_else(unknown)?
            }
        };
        self.invoke(function, &call.call.args, ctx)
    }

    fn invoke(
        &self,
        function: &Arc<dyn NativeFunction>,
        args: &[Expression],
        ctx: &mut Context,
    ) -> EvalResult<()> {
        if let Some(def) = function.as_user_function() {
            return self.call_user_function(def, args, ctx);
        }
        function
            .invoke(args, ctx, self)
            .map_err(|source| EvalError::Native {
                function: function.name().to_string(),
                source,
            })
    }

    /// Run a script function on a fresh pooled context.
    ///
    /// Arguments are evaluated in the caller's context and bound to the
    /// parameters as locals. Afterwards each out-parameter is copied back
    /// into the caller's argument when that argument is a bare variable.
    pub fn call_user_function(
        &self,
        def: &FunctionDef,
        args: &[Expression],
        ctx: &mut Context,
    ) -> EvalResult<()> {
        let depth = ctx.depth() + 1;
        if depth > self.config.max_call_depth {
            return Err(EvalError::CallDepthExceeded(self.config.max_call_depth));
        }

        let mut callee = self.pool.obtain(ctx.session());
        callee.set_depth(depth);
        for (param, arg) in def.params.iter().zip(args) {
            let value = self.eval_expression(arg, ctx)?;
            callee.set_local(param, value);
        }

        self.exec_block(&def.body, &mut callee)?;

        for &position in &def.out_params {
            let target = args.get(position).and_then(Expression::as_bare_variable);
            if let (Some(var), Some(param)) = (target, def.params.get(position)) {
                ctx.set(var, callee.local(param));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Arity, NativeFn};

    fn run(interp: &Interpreter, source: &str) -> EvalResult<Context> {
        let scope = yu_parser::parse_source("test.yu", source)?;
        let mut ctx = interp.new_context();
        interp.eval_with(&scope, &mut ctx)?;
        Ok(ctx)
    }

    #[test]
    fn test_registration_blocked_while_shared() {
        let mut interp = Interpreter::new(SessionId(300));
        let clone = interp.clone();
        let f = Arc::new(NativeFn::new("f", Arity::Any, |_, _, _| Ok(())));
        assert!(matches!(
            interp.register_function(f.clone()),
            Err(EvalError::RegistryInUse)
        ));
        drop(clone);
        interp.register_function(f).unwrap();
        assert_eq!(interp.registry().function_count(), 1);
    }

    #[test]
    fn test_while_counts() {
        let interp = Interpreter::new(SessionId(301));
        let ctx = run(&interp, "s i = 0\nwhile(i < 5) { s i = i + 1 }").unwrap();
        assert_eq!(ctx.local("i"), Value::Int(5));
        assert!(!ctx.in_loop());
    }

    #[test]
    fn test_call_depth_limit() {
        let config = InterpreterConfig {
            max_call_depth: 8,
            ..InterpreterConfig::default()
        };
        let mut interp = Interpreter::with_config(SessionId(302), config);
        let scope =
            yu_parser::parse_source("deep.yu", "fn dive(n)\n rec.dive(n)\nend fn").unwrap();
        let mut module = Module::new("rec");
        module.add_scope(&scope);
        interp.register_module(module).unwrap();
        let err = run(&interp, "rec.dive(1)").unwrap_err();
        assert!(matches!(err, EvalError::CallDepthExceeded(8)));
    }

    #[test]
    fn test_pool_reuses_callee_contexts() {
        let interp = Interpreter::new(SessionId(303));
        run(&interp, "fn g(a)\n s b = a\nend fn\ng(1)\ng(2)").unwrap();
        assert_eq!(interp.pool().idle(), 1);
    }
}
