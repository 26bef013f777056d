//! Token types for the yu lexer.
//!
//! Defines [`TokenKind`], [`Token`] (a kind plus its borrowed lexeme and
//! position) and the keyword trie consulted while scanning identifiers.

use once_cell::sync::Lazy;
use std::fmt;
use yu_types::ast::{ArithOp, RelOp, Tier};
use yu_types::Span;

/// Every reserved spelling and the token it scans as.
///
/// `if`/`f`, `while`/`w` and the tier prefixes are contextual: the lexer
/// downgrades them to identifiers when the following character does not
/// fit (see [`crate::Lexer`]).
pub const KEYWORDS: &[(&str, TokenKind)] = &[
    ("s", TokenKind::VariablePrefix(Tier::Local)),
    ("ss", TokenKind::VariablePrefix(Tier::Session)),
    ("sss", TokenKind::VariablePrefix(Tier::Global)),
    ("if", TokenKind::If),
    ("f", TokenKind::If),
    ("while", TokenKind::While),
    ("w", TokenKind::While),
    ("for", TokenKind::For),
    ("else", TokenKind::Else),
    ("break", TokenKind::Break),
    ("endcode", TokenKind::EndCode),
    ("fn", TokenKind::Fn),
    ("end", TokenKind::End),
    ("true", TokenKind::True),
    ("false", TokenKind::False),
    ("null", TokenKind::Null),
];

// ─────────────────────────────────────────────────────────────────────
// Token
// ─────────────────────────────────────────────────────────────────────

/// A single token, borrowing its lexeme from the source text.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Token<'src> {
    pub kind: TokenKind,
    /// The exact source text of the token, quotes and comment markers
    /// included.
    pub lexeme: &'src str,
    /// Byte offset of the lexeme in the source.
    pub offset: usize,
    pub span: Span,
}

impl<'src> Token<'src> {
    /// Byte length of the lexeme.
    pub fn len(&self) -> usize {
        self.lexeme.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lexeme.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────
// TokenKind
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // ── Punctuation ──
    Dot,
    Comma,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Semi,

    // ── Operators ──
    AndAnd,
    OrOr,
    /// `?*`
    StartsWith,
    /// `*?`
    EndsWith,
    /// `?`
    Contains,
    EqEq,
    NotEq,
    LtEq,
    GtEq,
    Eq,
    Not,
    Lt,
    Gt,
    Plus,
    Minus,
    Star,
    Slash,

    // ── Literals ──
    Str,
    Number,
    True,
    False,
    Null,

    // ── Keywords ──
    VariablePrefix(Tier),
    If,
    Else,
    While,
    For,
    Break,
    EndCode,
    Fn,
    End,

    Identifier,

    // ── Trivia ──
    Comment,
    Whitespace,
    Newline,

    Eof,
}

impl TokenKind {
    /// Whitespace, newlines and comments.
    pub fn is_trivia(self) -> bool {
        matches!(
            self,
            TokenKind::Comment | TokenKind::Whitespace | TokenKind::Newline
        )
    }

    /// The arithmetic operator this token spells, if any.
    pub fn arith_op(self) -> Option<ArithOp> {
        match self {
            TokenKind::Plus => Some(ArithOp::Add),
            TokenKind::Minus => Some(ArithOp::Sub),
            TokenKind::Star => Some(ArithOp::Mul),
            TokenKind::Slash => Some(ArithOp::Div),
            _ => None,
        }
    }

    /// The relational operator this token spells, if any.
    pub fn rel_op(self) -> Option<RelOp> {
        match self {
            TokenKind::EqEq => Some(RelOp::Eq),
            TokenKind::NotEq => Some(RelOp::NotEq),
            TokenKind::Lt => Some(RelOp::Lt),
            TokenKind::Gt => Some(RelOp::Gt),
            TokenKind::LtEq => Some(RelOp::LtEq),
            TokenKind::GtEq => Some(RelOp::GtEq),
            TokenKind::StartsWith => Some(RelOp::StartsWith),
            TokenKind::Contains => Some(RelOp::Contains),
            TokenKind::EndsWith => Some(RelOp::EndsWith),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Dot => f.write_str("."),
            TokenKind::Comma => f.write_str(","),
            TokenKind::LParen => f.write_str("("),
            TokenKind::RParen => f.write_str(")"),
            TokenKind::LBrace => f.write_str("{"),
            TokenKind::RBrace => f.write_str("}"),
            TokenKind::Semi => f.write_str(";"),
            TokenKind::AndAnd => f.write_str("&&"),
            TokenKind::OrOr => f.write_str("||"),
            TokenKind::StartsWith => f.write_str("?*"),
            TokenKind::EndsWith => f.write_str("*?"),
            TokenKind::Contains => f.write_str("?"),
            TokenKind::EqEq => f.write_str("=="),
            TokenKind::NotEq => f.write_str("!="),
            TokenKind::LtEq => f.write_str("<="),
            TokenKind::GtEq => f.write_str(">="),
            TokenKind::Eq => f.write_str("="),
            TokenKind::Not => f.write_str("!"),
            TokenKind::Lt => f.write_str("<"),
            TokenKind::Gt => f.write_str(">"),
            TokenKind::Plus => f.write_str("+"),
            TokenKind::Minus => f.write_str("-"),
            TokenKind::Star => f.write_str("*"),
            TokenKind::Slash => f.write_str("/"),
            TokenKind::Str => f.write_str("string"),
            TokenKind::Number => f.write_str("number"),
            TokenKind::True => f.write_str("true"),
            TokenKind::False => f.write_str("false"),
            TokenKind::Null => f.write_str("null"),
            TokenKind::VariablePrefix(tier) => write!(f, "{tier}"),
            TokenKind::If => f.write_str("if"),
            TokenKind::Else => f.write_str("else"),
            TokenKind::While => f.write_str("while"),
            TokenKind::For => f.write_str("for"),
            TokenKind::Break => f.write_str("break"),
            TokenKind::EndCode => f.write_str("endcode"),
            TokenKind::Fn => f.write_str("fn"),
            TokenKind::End => f.write_str("end"),
            TokenKind::Identifier => f.write_str("identifier"),
            TokenKind::Comment => f.write_str("comment"),
            TokenKind::Whitespace => f.write_str("whitespace"),
            TokenKind::Newline => f.write_str("newline"),
            TokenKind::Eof => f.write_str("end of input"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────
// Keyword trie
// ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct TrieNode {
    children: Vec<(char, usize)>,
    kind: Option<TokenKind>,
}

/// Character trie over [`KEYWORDS`].
#[derive(Debug)]
pub struct KeywordTrie {
    nodes: Vec<TrieNode>,
}

impl KeywordTrie {
    fn build(entries: &[(&str, TokenKind)]) -> Self {
        let mut nodes = vec![TrieNode::default()];
        for (word, kind) in entries {
            let mut at = 0;
            for ch in word.chars() {
                let existing = nodes[at]
                    .children
                    .iter()
                    .find(|(c, _)| *c == ch)
                    .map(|&(_, idx)| idx);
                at = match existing {
                    Some(idx) => idx,
                    None => {
                        nodes.push(TrieNode::default());
                        let idx = nodes.len() - 1;
                        nodes[at].children.push((ch, idx));
                        idx
                    }
                };
            }
            nodes[at].kind = Some(*kind);
        }
        Self { nodes }
    }

    /// The keyword token for `word`, or `None` for ordinary identifiers.
    pub fn lookup(&self, word: &str) -> Option<TokenKind> {
        let mut at = 0;
        for ch in word.chars() {
            at = self.nodes[at]
                .children
                .iter()
                .find(|(c, _)| *c == ch)
                .map(|&(_, idx)| idx)?;
        }
        self.nodes[at].kind
    }
}

/// The process-wide keyword trie.
pub static KEYWORD_TRIE: Lazy<KeywordTrie> = Lazy::new(|| KeywordTrie::build(KEYWORDS));
