//! Fire-and-forget tasks.
//!
//! A task runs a code block on its own OS thread with a context derived from
//! the spawner's: local variables are copied, session and global stores are
//! shared, and loop and lexical stacks start empty. Nothing flows back to
//! the spawner; there is no join or cancellation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use yu_types::ast::{CodeBlock, Expression};

use crate::context::Context;
use crate::error::{EvalError, EvalResult, NativeError};
use crate::interpreter::Interpreter;
use crate::registry::{Arity, NativeFunction};

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Observes a spawned task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: u64,
    finished: Arc<AtomicBool>,
}

impl TaskHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// True once the task's block has returned, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

impl Interpreter {
    /// Run `block` on a new thread with a context derived from `ctx`.
    ///
    /// The task holds a clone of this interpreter, so the registry cannot be
    /// modified until it finishes. Errors inside the task are logged.
    pub fn spawn(&self, block: Arc<CodeBlock>, ctx: &Context) -> EvalResult<TaskHandle> {
        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let finished = Arc::new(AtomicBool::new(false));
        let handle = TaskHandle {
            id,
            finished: Arc::clone(&finished),
        };

        let interp = self.clone();
        let mut derived = ctx.derive();
        thread::Builder::new()
            .name(format!("yu-task-{id}"))
            .spawn(move || {
                tracing::debug!(task = id, session = %derived.session(), "task started");
                if let Err(err) = interp.exec_block(&block, &mut derived) {
                    tracing::error!(task = id, error = %err, "task failed");
                }
                finished.store(true, Ordering::Release);
            })
            .map_err(EvalError::Spawn)?;
        Ok(handle)
    }
}

/// `spawn()` followed by a block: runs that block as a task.
///
/// A call with no following block does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnFunction;

impl NativeFunction for SpawnFunction {
    fn name(&self) -> &str {
        "spawn"
    }

    fn arity(&self) -> Arity {
        Arity::Exact(0)
    }

    fn invoke(
        &self,
        _args: &[Expression],
        ctx: &mut Context,
        interp: &Interpreter,
    ) -> Result<(), NativeError> {
        if let Some(block) = ctx.claim_attached_block() {
            let handle = interp.spawn(block, ctx)?;
            tracing::debug!(task = handle.id(), "spawned attached block");
        }
        Ok(())
    }
}
