//! Per-execution runtime state.
//!
//! A [`Context`] owns its local variables and the control stacks of one
//! evaluation: loop markers, the lexical function-lookup stack, block
//! attachment offers and the early-exit flag. Session and global stores
//! are shared handles.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use yu_types::ast::{CodeBlock, FunctionDef, FunctionTable, Tier, VarRef};

use crate::store::{global_store, session_store, SessionId, VariableStore};
use crate::value::Value;

#[derive(Debug, Default)]
struct LoopMarker {
    broken: bool,
}

/// The block following the running statement, offered for attachment.
#[derive(Debug, Default)]
struct BlockOffer {
    block: Option<Arc<CodeBlock>>,
    claimed: bool,
}

/// Runtime state threaded through an evaluation.
#[derive(Debug)]
pub struct Context {
    session: SessionId,
    locals: HashMap<String, Value>,
    session_vars: Arc<VariableStore>,
    global_vars: Arc<VariableStore>,
    loops: Vec<LoopMarker>,
    /// Function tables of the enclosing blocks, innermost last.
    lexical: Vec<FunctionTable>,
    /// One offer frame per running code block, innermost last.
    offers: Vec<BlockOffer>,
    early_exit: bool,
    /// User-function nesting depth of this context.
    depth: usize,
}

impl Context {
    /// A fresh context bound to `session`.
    pub fn new(session: SessionId) -> Self {
        Self {
            session,
            locals: HashMap::new(),
            session_vars: session_store(session),
            global_vars: global_store(),
            loops: Vec::new(),
            lexical: Vec::new(),
            offers: Vec::new(),
            early_exit: false,
            depth: 0,
        }
    }

    /// A context for a spawned task: same session and global stores, a copy
    /// of the locals, and empty control stacks.
    pub fn derive(&self) -> Self {
        Self {
            session: self.session,
            locals: self.locals.clone(),
            session_vars: Arc::clone(&self.session_vars),
            global_vars: Arc::clone(&self.global_vars),
            loops: Vec::new(),
            lexical: Vec::new(),
            offers: Vec::new(),
            early_exit: false,
            depth: 0,
        }
    }

    /// An empty context sharing this one's stores. Allocation-free.
    pub(crate) fn blank(&self) -> Self {
        Self {
            session: self.session,
            locals: HashMap::new(),
            session_vars: Arc::clone(&self.session_vars),
            global_vars: Arc::clone(&self.global_vars),
            loops: Vec::new(),
            lexical: Vec::new(),
            offers: Vec::new(),
            early_exit: false,
            depth: 0,
        }
    }

    /// Clear every piece of mutable state. The session binding is kept.
    pub fn reset(&mut self) {
        self.locals.clear();
        self.loops.clear();
        self.lexical.clear();
        self.offers.clear();
        self.early_exit = false;
        self.depth = 0;
    }

    /// Rebind to another session's store.
    pub(crate) fn rebind(&mut self, session: SessionId) {
        if self.session != session {
            self.session = session;
            self.session_vars = session_store(session);
        }
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    // ── Variables ─────────────────────────────────────────────────────────────

    pub fn get(&self, var: &VarRef) -> Value {
        self.get_var(var.tier, &var.name)
    }

    pub fn get_var(&self, tier: Tier, name: &str) -> Value {
        match tier {
            Tier::Local => self.locals.get(name).cloned().unwrap_or_default(),
            Tier::Session => self.session_vars.get(name),
            Tier::Global => self.global_vars.get(name),
        }
    }

    pub fn set(&mut self, var: &VarRef, value: Value) {
        self.set_var(var.tier, &var.name, value);
    }

    /// Write a variable; writing `Null` removes it.
    pub fn set_var(&mut self, tier: Tier, name: &str, value: Value) {
        match tier {
            Tier::Local => {
                if value.is_null() {
                    self.locals.remove(name);
                } else {
                    self.locals.insert(name.to_string(), value);
                }
            }
            Tier::Session => self.session_vars.set(name, value),
            Tier::Global => self.global_vars.set(name, value),
        }
    }

    pub fn local(&self, name: &str) -> Value {
        self.get_var(Tier::Local, name)
    }

    pub fn set_local(&mut self, name: &str, value: Value) {
        self.set_var(Tier::Local, name, value);
    }

    /// A sorted copy of the local variables.
    pub fn locals(&self) -> BTreeMap<String, Value> {
        self.locals
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    pub fn session_store(&self) -> &Arc<VariableStore> {
        &self.session_vars
    }

    // ── Loops & termination ───────────────────────────────────────────────────

    pub fn enter_loop(&mut self) {
        self.loops.push(LoopMarker::default());
    }

    pub fn exit_loop(&mut self) {
        self.loops.pop();
    }

    pub fn in_loop(&self) -> bool {
        !self.loops.is_empty()
    }

    /// Flag the innermost loop as broken. Returns `false` outside a loop.
    pub fn break_loop(&mut self) -> bool {
        match self.loops.last_mut() {
            Some(marker) => {
                marker.broken = true;
                true
            }
            None => false,
        }
    }

    /// Stop everything left on this context.
    pub fn set_early_exit(&mut self) {
        self.early_exit = true;
    }

    pub fn early_exit(&self) -> bool {
        self.early_exit
    }

    /// Allow a context that ran `endcode` to evaluate again.
    pub fn clear_early_exit(&mut self) {
        self.early_exit = false;
    }

    /// True once `endcode` ran, or the innermost loop was broken.
    pub fn is_terminated(&self) -> bool {
        self.early_exit || self.loops.last().is_some_and(|m| m.broken)
    }

    // ── Lexical function lookup ───────────────────────────────────────────────

    pub(crate) fn push_lexical(&mut self, table: FunctionTable) {
        self.lexical.push(table);
    }

    pub(crate) fn pop_lexical(&mut self) {
        self.lexical.pop();
    }

    /// Find a nested function by exact arity, innermost block first.
    pub fn find_function(&self, name: &str, arity: usize) -> Option<Arc<FunctionDef>> {
        self.lexical
            .iter()
            .rev()
            .find_map(|table| table.lookup(name, arity))
            .cloned()
    }

    // ── Block attachment ──────────────────────────────────────────────────────

    pub(crate) fn push_offer_frame(&mut self) {
        self.offers.push(BlockOffer::default());
    }

    pub(crate) fn pop_offer_frame(&mut self) {
        self.offers.pop();
    }

    pub(crate) fn offer_block(&mut self, block: Option<Arc<CodeBlock>>) {
        if let Some(frame) = self.offers.last_mut() {
            frame.block = block;
            frame.claimed = false;
        }
    }

    pub(crate) fn offer_claimed(&self) -> bool {
        self.offers.last().is_some_and(|f| f.claimed)
    }

    /// The block following the running statement, if any, without
    /// claiming it.
    pub fn attached_block(&self) -> Option<&Arc<CodeBlock>> {
        self.offers.last().and_then(|f| f.block.as_ref())
    }

    /// Take the block following the running statement. The interpreter then
    /// skips it instead of running it as the next statement.
    pub fn claim_attached_block(&mut self) -> Option<Arc<CodeBlock>> {
        let frame = self.offers.last_mut()?;
        let block = frame.block.take()?;
        frame.claimed = true;
        Some(block)
    }

    // ── Call depth ────────────────────────────────────────────────────────────

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn set_depth(&mut self, depth: usize) {
        self.depth = depth;
    }
}
