//! Reusable contexts for user-function calls.

use parking_lot::Mutex;
use std::ops::{Deref, DerefMut};

use crate::context::Context;
use crate::store::SessionId;

/// A bounded free list of [`Context`]s.
///
/// Each user-function call borrows a context through [`ContextPool::obtain`];
/// the returned guard resets the context and hands it back when dropped, on
/// success and error paths alike.
#[derive(Debug)]
pub struct ContextPool {
    free: Mutex<Vec<Context>>,
    capacity: usize,
}

impl ContextPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::with_capacity(capacity)),
            capacity,
        }
    }

    /// A clean context bound to `session`.
    pub fn obtain(&self, session: SessionId) -> PooledContext<'_> {
        let context = match self.free.lock().pop() {
            Some(mut ctx) => {
                ctx.rebind(session);
                ctx
            }
            None => Context::new(session),
        };
        PooledContext {
            pool: self,
            context,
        }
    }

    /// Contexts currently waiting for reuse.
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn release(&self, mut context: Context) {
        context.reset();
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(context);
        }
    }
}

impl Default for ContextPool {
    fn default() -> Self {
        Self::new(32)
    }
}

/// A context on loan from a [`ContextPool`].
#[derive(Debug)]
pub struct PooledContext<'p> {
    pool: &'p ContextPool,
    context: Context,
}

impl Deref for PooledContext<'_> {
    type Target = Context;

    fn deref(&self) -> &Context {
        &self.context
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Context {
        &mut self.context
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        let blank = self.context.blank();
        self.pool.release(std::mem::replace(&mut self.context, blank));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    #[test]
    fn test_released_context_is_clean() {
        let pool = ContextPool::new(4);
        {
            let mut ctx = pool.obtain(SessionId(200));
            ctx.set_local("x", Value::Int(1));
            ctx.enter_loop();
            ctx.set_early_exit();
        }
        assert_eq!(pool.idle(), 1);
        let ctx = pool.obtain(SessionId(200));
        assert!(ctx.locals().is_empty());
        assert!(!ctx.in_loop());
        assert!(!ctx.is_terminated());
        assert_eq!(pool.idle(), 0);
    }

    #[test]
    fn test_capacity_bounds_free_list() {
        let pool = ContextPool::new(1);
        let a = pool.obtain(SessionId(201));
        let b = pool.obtain(SessionId(201));
        drop(a);
        drop(b);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_reused_context_rebinds_session() {
        let pool = ContextPool::new(2);
        drop(pool.obtain(SessionId(202)));
        let ctx = pool.obtain(SessionId(203));
        assert_eq!(ctx.session(), SessionId(203));
    }
}
