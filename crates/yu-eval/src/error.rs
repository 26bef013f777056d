//! Runtime error types for the yu interpreter.

use thiserror::Error;
use yu_types::{Span, YuError};

/// Error type a native function may fail with. The interpreter wraps it in
/// [`EvalError::Native`].
pub type NativeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Evaluation error. Every variant aborts the evaluation it occurs in.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Source text handed to [`crate::Interpreter::eval_source`] did not parse.
    #[error(transparent)]
    Syntax(#[from] YuError),

    /// No function matches the call's name and argument count.
    #[error("{span}: no such function: {name} with {arity} argument(s)")]
    UnresolvedFunction {
        name: String,
        arity: usize,
        span: Span,
    },

    #[error("{span}: module '{module}' is not registered")]
    UnknownModule { module: String, span: Span },

    #[error("{span}: module '{module}' has no function {name} with {arity} argument(s)")]
    UnresolvedModuleFunction {
        module: String,
        name: String,
        arity: usize,
        span: Span,
    },

    #[error("{0}: 'break' outside of a loop")]
    BreakOutsideLoop(Span),

    /// A native function failed; `source` is its own error.
    #[error("native function '{function}' failed: {source}")]
    Native {
        function: String,
        #[source]
        source: NativeError,
    },

    /// A value could not be used the way an operator needs it.
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// Integer division by zero.
    #[error("arithmetic trap: {0}")]
    ArithmeticTrap(String),

    #[error("call depth limit of {0} exceeded")]
    CallDepthExceeded(usize),

    #[error("module '{0}' is already registered")]
    DuplicateModule(String),

    /// The registry is shared with a clone of the interpreter (for example
    /// a running task) and cannot be changed.
    #[error("function registry is shared with a running evaluation and cannot be modified")]
    RegistryInUse,

    #[error("failed to spawn task: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result alias for evaluator operations.
pub type EvalResult<T> = Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_native_error_keeps_cause() {
        let cause: NativeError = "disk on fire".into();
        let err = EvalError::Native {
            function: "save".into(),
            source: cause,
        };
        assert_eq!(
            err.to_string(),
            "native function 'save' failed: disk on fire"
        );
        assert_eq!(err.source().map(|s| s.to_string()).as_deref(), Some("disk on fire"));
    }

    #[test]
    fn test_unresolved_function_message() {
        let err = EvalError::UnresolvedFunction {
            name: "fib".into(),
            arity: 3,
            span: Span::point(4, 2),
        };
        assert_eq!(err.to_string(), "4:2: no such function: fib with 3 argument(s)");
    }
}
