//! yu tree-walking interpreter.
//!
//! Executes parsed yu programs against an evaluation [`Context`]. Variables
//! live in three tiers: locals private to a context, session variables
//! shared by every context of one [`SessionId`], and process-wide globals.
//! Calls resolve through nested script functions and the interpreter's
//! [`FunctionRegistry`] of native callables and modules.

pub mod config;
pub mod context;
pub mod error;
mod eval_expr;
pub mod interpreter;
pub mod logging;
pub mod pool;
pub mod registry;
pub mod store;
pub mod task;
pub mod value;

pub use config::InterpreterConfig;
pub use context::Context;
pub use error::{EvalError, EvalResult, NativeError};
pub use eval_expr::{compare, fold_numeric};
pub use interpreter::Interpreter;
pub use logging::init_logging;
pub use pool::{ContextPool, PooledContext};
pub use registry::{Arity, FunctionRegistry, Module, NativeFn, NativeFunction, UserFunction};
pub use store::{clear_session, global_store, session_store, SessionId, VariableStore};
pub use task::{SpawnFunction, TaskHandle};
pub use value::{parse_number, Number, Value};
