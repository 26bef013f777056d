//! Shared types for the yu interpreter.
//!
//! This crate defines the AST node types, source spans and the structured
//! lexical/syntax error used by every stage of the pipeline.

mod error;
mod span;
pub mod ast;

pub use error::{ErrorCategory, ErrorCode, YuError};
pub use span::{SourceFile, Span};

/// Result type used by the lexer and parser.
pub type Result<T> = std::result::Result<T, YuError>;
