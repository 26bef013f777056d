//! Callable registry: the native-function contract, modules, and the
//! interpreter-wide function table.
//!
//! Callables are identified by `(name, arity)`. A callable declaring
//! [`Arity::Any`] matches every argument count but is only consulted after
//! all exact-arity candidates fail.
//!
//! Resolutions are cached on call sites together with the registry
//! generation they were made under. Every mutation draws a new generation
//! from a process-wide counter, so a cache filled against an older or a
//! different registry is recognised as stale and ignored.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use yu_types::ast::{Expression, FunctionDef, Scope};

use crate::context::Context;
use crate::error::{EvalError, EvalResult, NativeError};
use crate::interpreter::Interpreter;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Declared argument count of a callable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Exact(usize),
    /// Matches any argument count.
    Any,
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::Any => f.write_str("-1"),
        }
    }
}

/// A callable the interpreter can invoke.
///
/// Arguments arrive unevaluated. The callee decides which to evaluate (via
/// [`Interpreter::eval_expression`]) and may treat a bare-variable argument
/// as an assignment target. The block written right after the call, if
/// any, is reachable through [`Context::attached_block`] and
/// [`Context::claim_attached_block`].
pub trait NativeFunction: Send + Sync {
    fn name(&self) -> &str;

    fn arity(&self) -> Arity;

    fn invoke(
        &self,
        args: &[Expression],
        ctx: &mut Context,
        interp: &Interpreter,
    ) -> Result<(), NativeError>;

    /// The script definition behind this callable, when it is one.
    fn as_user_function(&self) -> Option<&Arc<FunctionDef>> {
        None
    }
}

impl fmt::Debug for dyn NativeFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<fn {}/{}>", self.name(), self.arity())
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Adapters
// ══════════════════════════════════════════════════════════════════════════════

type NativeBody =
    dyn Fn(&[Expression], &mut Context, &Interpreter) -> Result<(), NativeError> + Send + Sync;

/// A native function backed by a closure.
pub struct NativeFn {
    name: String,
    arity: Arity,
    body: Box<NativeBody>,
}

impl NativeFn {
    pub fn new<F>(name: impl Into<String>, arity: Arity, body: F) -> Self
    where
        F: Fn(&[Expression], &mut Context, &Interpreter) -> Result<(), NativeError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            name: name.into(),
            arity,
            body: Box::new(body),
        }
    }
}

impl NativeFunction for NativeFn {
    fn name(&self) -> &str {
        &self.name
    }

    fn arity(&self) -> Arity {
        self.arity
    }

    fn invoke(
        &self,
        args: &[Expression],
        ctx: &mut Context,
        interp: &Interpreter,
    ) -> Result<(), NativeError> {
        (self.body)(args, ctx, interp)
    }
}

/// A script-defined function exposed through the registry.
#[derive(Debug, Clone)]
pub struct UserFunction {
    def: Arc<FunctionDef>,
}

impl UserFunction {
    pub fn new(def: Arc<FunctionDef>) -> Self {
        Self { def }
    }
}

impl NativeFunction for UserFunction {
    fn name(&self) -> &str {
        &self.def.name
    }

    fn arity(&self) -> Arity {
        Arity::Exact(self.def.params.len())
    }

    fn invoke(
        &self,
        args: &[Expression],
        ctx: &mut Context,
        interp: &Interpreter,
    ) -> Result<(), NativeError> {
        interp
            .call_user_function(&self.def, args, ctx)
            .map_err(NativeError::from)
    }

    fn as_user_function(&self) -> Option<&Arc<FunctionDef>> {
        Some(&self.def)
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Modules
// ══════════════════════════════════════════════════════════════════════════════

/// A named table of callables, immutable once registered.
#[derive(Clone)]
pub struct Module {
    name: String,
    functions: Vec<Arc<dyn NativeFunction>>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_function(&mut self, function: Arc<dyn NativeFunction>) -> &mut Self {
        self.functions.push(function);
        self
    }

    /// Add every top-level `fn` of a parsed program.
    pub fn add_scope(&mut self, scope: &Scope) -> &mut Self {
        for def in scope.functions().iter() {
            self.functions
                .push(Arc::new(UserFunction::new(Arc::clone(def))));
        }
        self
    }

    /// Index of the callable for `(name, arity)`: exact arity first, then
    /// any-arity.
    pub fn resolve(&self, name: &str, arity: usize) -> Option<usize> {
        let matching = |wanted: Arity| {
            self.functions
                .iter()
                .position(|f| f.name() == name && f.arity() == wanted)
        };
        matching(Arity::Exact(arity)).or_else(|| matching(Arity::Any))
    }

    /// The callable for `(name, arity)`.
    pub fn lookup(&self, name: &str, arity: usize) -> Option<&Arc<dyn NativeFunction>> {
        self.resolve(name, arity).and_then(|index| self.function(index))
    }

    pub fn function(&self, index: usize) -> Option<&Arc<dyn NativeFunction>> {
        self.functions.get(index)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("functions", &self.functions)
            .finish()
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// Registry
// ══════════════════════════════════════════════════════════════════════════════

/// Global callables plus registered modules.
///
/// Global callables live in slots so call sites can cache a slot index.
#[derive(Debug)]
pub struct FunctionRegistry {
    generation: u64,
    slots: Vec<Arc<dyn NativeFunction>>,
    by_name: HashMap<String, Vec<usize>>,
    modules: Vec<Module>,
    module_ids: HashMap<String, usize>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl FunctionRegistry {
    pub fn new() -> Self {
        Self {
            generation: next_generation(),
            slots: Vec::new(),
            by_name: HashMap::new(),
            modules: Vec::new(),
            module_ids: HashMap::new(),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Add a global callable. A later registration with the same name and
    /// arity shadows the earlier one.
    pub fn register(&mut self, function: Arc<dyn NativeFunction>) {
        let slot = self.slots.len();
        self.by_name
            .entry(function.name().to_string())
            .or_default()
            .insert(0, slot);
        self.slots.push(function);
        self.generation = next_generation();
    }

    pub fn register_module(&mut self, module: Module) -> EvalResult<()> {
        if self.module_ids.contains_key(module.name()) {
            return Err(EvalError::DuplicateModule(module.name().to_string()));
        }
        self.module_ids
            .insert(module.name().to_string(), self.modules.len());
        self.modules.push(module);
        self.generation = next_generation();
        Ok(())
    }

    /// Slot of the global callable for `(name, arity)`: exact arity first,
    /// then any-arity.
    pub fn resolve(&self, name: &str, arity: usize) -> Option<usize> {
        let candidates = self.by_name.get(name)?;
        let matching = |wanted: Arity| {
            candidates
                .iter()
                .copied()
                .find(|&slot| self.slots[slot].arity() == wanted)
        };
        matching(Arity::Exact(arity)).or_else(|| matching(Arity::Any))
    }

    pub fn slot(&self, slot: usize) -> Option<&Arc<dyn NativeFunction>> {
        self.slots.get(slot)
    }

    pub fn module_id(&self, name: &str) -> Option<usize> {
        self.module_ids.get(name).copied()
    }

    pub fn module(&self, id: usize) -> Option<&Module> {
        self.modules.get(id)
    }

    pub fn function_count(&self) -> usize {
        self.slots.len()
    }

    pub fn module_count(&self) -> usize {
        self.modules.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(name: &str, arity: Arity) -> Arc<dyn NativeFunction> {
        Arc::new(NativeFn::new(name, arity, |_, _, _| Ok(())))
    }

    #[test]
    fn test_exact_arity_preferred_over_any() {
        let mut registry = FunctionRegistry::new();
        registry.register(noop("f", Arity::Any));
        registry.register(noop("f", Arity::Exact(1)));
        let one = registry.resolve("f", 1).unwrap();
        let two = registry.resolve("f", 2).unwrap();
        assert_eq!(registry.slot(one).unwrap().arity(), Arity::Exact(1));
        assert_eq!(registry.slot(two).unwrap().arity(), Arity::Any);
        assert!(registry.resolve("g", 1).is_none());
    }

    #[test]
    fn test_later_registration_shadows() {
        let mut registry = FunctionRegistry::new();
        registry.register(noop("f", Arity::Exact(0)));
        registry.register(noop("f", Arity::Exact(0)));
        assert_eq!(registry.resolve("f", 0), Some(1));
    }

    #[test]
    fn test_mutation_bumps_generation() {
        let mut registry = FunctionRegistry::new();
        let before = registry.generation();
        registry.register(noop("f", Arity::Any));
        assert_ne!(registry.generation(), before);
        let other = FunctionRegistry::new();
        assert_ne!(other.generation(), registry.generation());
    }

    #[test]
    fn test_duplicate_module_rejected() {
        let mut registry = FunctionRegistry::new();
        registry.register_module(Module::new("math")).unwrap();
        assert!(matches!(
            registry.register_module(Module::new("math")),
            Err(EvalError::DuplicateModule(name)) if name == "math"
        ));
        assert_eq!(registry.module_count(), 1);
    }

    #[test]
    fn test_module_lookup_by_arity() {
        let mut module = Module::new("str");
        module
            .add_function(noop("join", Arity::Any))
            .add_function(noop("join", Arity::Exact(2)));
        assert_eq!(module.lookup("join", 2).unwrap().arity(), Arity::Exact(2));
        assert_eq!(module.lookup("join", 5).unwrap().arity(), Arity::Any);
        assert!(module.lookup("split", 1).is_none());
    }

    #[test]
    fn test_add_scope_wraps_definitions() {
        let scope = yu_parser::parse_source("lib.yu", "fn twice(a, *b)\n s b = a + a\nend fn")
            .unwrap();
        let mut module = Module::new("lib");
        module.add_scope(&scope);
        let f = module.lookup("twice", 2).unwrap();
        assert_eq!(f.name(), "twice");
        assert_eq!(f.as_user_function().unwrap().out_params, vec![1]);
    }
}
