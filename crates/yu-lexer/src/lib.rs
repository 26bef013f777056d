//! yu lexer: converts source text into a lazy token stream.

pub mod lexer;
pub mod token;

pub use lexer::{tokenize, unescape, Lexer};
pub use token::{KeywordTrie, Token, TokenKind, KEYWORDS, KEYWORD_TRIE};
