//! yu parser: converts a token stream into an AST.

mod parse_expr;
mod parse_stmt;
mod parser;

pub use parser::{ParseResult, Parser};

use yu_types::ast::Scope;
use yu_types::SourceFile;

/// Parse `source` (named `name` in diagnostics) into a [`Scope`].
pub fn parse_source(name: &str, source: &str) -> ParseResult<Scope> {
    let file = SourceFile::new(name, source);
    Parser::new(&file).parse()
}
