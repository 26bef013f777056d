//! Core parser infrastructure: token cursor, error reporting, helpers.
//!
//! The parser pulls tokens lazily from the lexer and gets its single token
//! of lookahead by pushing the last token back, so the lexer is always
//! exactly one token ahead at most.

use yu_lexer::{Lexer, Token, TokenKind};
use yu_types::ast::Scope;
use yu_types::{ErrorCode, SourceFile, Span, YuError};

/// Result type of every parse function.
pub type ParseResult<T> = Result<T, YuError>;

/// The yu parser.
///
/// Fail-fast: the first lexical or syntax error aborts the parse.
pub struct Parser<'src> {
    lexer: Lexer<'src>,
    source_file: &'src SourceFile,
    /// Span of the most recently consumed token.
    last_span: Span,
    /// `last_span` as it was before that token, restored on unread.
    prior_span: Span,
}

impl<'src> Parser<'src> {
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            lexer: Lexer::new(source_file).skipping_trivia(),
            source_file,
            last_span: Span::default(),
            prior_span: Span::default(),
        }
    }

    /// Parse the whole source into a [`Scope`].
    pub fn parse(mut self) -> ParseResult<Scope> {
        let block = self.parse_top_level()?;
        Ok(Scope { block })
    }

    // ── Token Cursor ──────────────────────────────────────────────────────────

    /// Consume and return the next token.
    pub(crate) fn advance(&mut self) -> ParseResult<Token<'src>> {
        let token = self.lexer.next_token()?;
        self.prior_span = self.last_span;
        self.last_span = token.span;
        Ok(token)
    }

    /// Give back `token`, which must be the one just returned by
    /// [`advance`](Self::advance).
    pub(crate) fn unread(&mut self, token: &Token<'src>) {
        self.lexer.unread(token);
        self.last_span = self.prior_span;
    }

    /// Look at the next token without consuming it.
    pub(crate) fn peek(&mut self) -> ParseResult<Token<'src>> {
        let token = self.advance()?;
        self.unread(&token);
        Ok(token)
    }

    /// Span of the most recently consumed token.
    pub(crate) fn previous_span(&self) -> Span {
        self.last_span
    }

    /// If the next token has `kind`, consume it and return `true`.
    pub(crate) fn eat(&mut self, kind: TokenKind) -> ParseResult<bool> {
        let token = self.advance()?;
        if token.kind == kind {
            Ok(true)
        } else {
            self.unread(&token);
            Ok(false)
        }
    }

    // ── Expect Helpers ────────────────────────────────────────────────────────

    /// Consume a token of the given kind or fail.
    pub(crate) fn expect(&mut self, expected: TokenKind) -> ParseResult<Token<'src>> {
        let token = self.advance()?;
        if token.kind == expected {
            Ok(token)
        } else {
            Err(self.unexpected(&token, &format!("'{expected}'")))
        }
    }

    /// Consume an identifier and return it.
    pub(crate) fn expect_identifier(&mut self) -> ParseResult<Token<'src>> {
        let token = self.advance()?;
        if token.kind == TokenKind::Identifier {
            Ok(token)
        } else {
            Err(self.unexpected(&token, "identifier"))
        }
    }

    /// Fail if the next token is a `.`: names carry at most one dot.
    pub(crate) fn reject_second_dot(&mut self, qualified: &str) -> ParseResult<()> {
        let token = self.peek()?;
        if token.kind == TokenKind::Dot {
            return Err(self
                .error_at(
                    token.span,
                    ErrorCode::MALFORMED_NAME,
                    format!("'{qualified}' is followed by another '.'; a name may contain only one '.'"),
                )
                .with_suggestion("qualify a name with a single tier or module prefix"));
        }
        Ok(())
    }

    // ── Error Reporting ───────────────────────────────────────────────────────

    pub(crate) fn error_at(
        &self,
        span: Span,
        code: ErrorCode,
        message: impl Into<String>,
    ) -> YuError {
        YuError::at(self.source_file, code, message, span)
    }

    /// An "expected X, got Y" error at `token`.
    pub(crate) fn unexpected(&self, token: &Token<'_>, expected: &str) -> YuError {
        let found = describe(token);
        self.error_at(
            token.span,
            ErrorCode::UNEXPECTED_TOKEN,
            format!("expected {expected}, got {found}"),
        )
    }
}

/// How a token is named in diagnostics.
pub(crate) fn describe(token: &Token<'_>) -> String {
    match token.kind {
        TokenKind::Eof => "end of input".to_string(),
        TokenKind::Identifier | TokenKind::Number | TokenKind::Str => {
            format!("{} '{}'", token.kind, token.lexeme)
        }
        kind => format!("'{kind}'"),
    }
}
