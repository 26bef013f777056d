//! Core yu lexer: a lazy token stream with single-token pushback.
//!
//! Features:
//! - Tokens are scanned on demand; every byte of the source belongs to
//!   exactly one token, so concatenated lexemes reproduce the input
//! - Contextual keywords: tier prefixes and `if`/`while`/`for` fall back to
//!   identifiers when the next character does not fit
//! - Three comment forms: `// ...`, `/. ... ./`, and a `.` in column 1
//! - Fail-fast: the first malformed token is returned as a [`YuError`]

use yu_types::{ErrorCode, SourceFile, Span, YuError};

use crate::token::{Token, TokenKind, KEYWORD_TRIE};

/// The yu lexer.
pub struct Lexer<'src> {
    source: &'src str,
    source_file: &'src SourceFile,
    /// Byte offset where the most recently returned token starts.
    start: usize,
    /// Byte length of the most recently returned token, after pushback.
    len: usize,
    /// Position of `start` (1-based).
    line: u32,
    col: u32,
    skip_trivia: bool,
}

impl<'src> Lexer<'src> {
    /// Create a lexer that returns every token, trivia included.
    pub fn new(source_file: &'src SourceFile) -> Self {
        Self {
            source: &source_file.source,
            source_file,
            start: 0,
            len: 0,
            line: 1,
            col: 1,
            skip_trivia: false,
        }
    }

    /// Silently skip whitespace, newlines and comments.
    pub fn skipping_trivia(mut self) -> Self {
        self.skip_trivia = true;
        self
    }

    /// Scan and return the next token. Returns [`TokenKind::Eof`] forever
    /// once the input is exhausted.
    pub fn next_token(&mut self) -> yu_types::Result<Token<'src>> {
        loop {
            self.commit();
            let token = self.scan()?;
            if !(self.skip_trivia && token.kind.is_trivia()) {
                return Ok(token);
            }
        }
    }

    /// Give back the trailing `n` bytes of the most recently returned
    /// token; the next call to [`next_token`](Self::next_token) rescans from
    /// there. Pushing back the full length unreads the token.
    pub fn push_back(&mut self, n: usize) {
        let mut keep = self.len.saturating_sub(n);
        while !self.source.is_char_boundary(self.start + keep) {
            keep -= 1;
        }
        self.len = keep;
    }

    /// Push back the whole of `token`, which must be the last one returned.
    pub fn unread(&mut self, token: &Token<'_>) {
        self.push_back(token.len());
    }

    /// The source this lexer reads.
    pub fn source_file(&self) -> &'src SourceFile {
        self.source_file
    }

    // ─────────────────────────────────────────────────────────────
    // Cursor helpers
    // ─────────────────────────────────────────────────────────────

    /// Move `start` past the current token, tracking line and column.
    fn commit(&mut self) {
        let end = self.start + self.len;
        for (offset, ch) in self.source[self.start..end].char_indices() {
            let breaks_line = match ch {
                '\n' => true,
                // A lone carriage return ends a line too; in `\r\n` the `\n` does.
                '\r' => self.char_at(self.start + offset + 1) != Some('\n'),
                _ => false,
            };
            if breaks_line {
                self.line += 1;
                self.col = 1;
            } else {
                self.col += 1;
            }
        }
        self.start += self.len;
        self.len = 0;
    }

    fn char_at(&self, offset: usize) -> Option<char> {
        self.source.get(offset..)?.chars().next()
    }

    /// Offset of the first character at or after `offset` that is not
    /// space, tab or form feed.
    fn skip_blanks_from(&self, mut offset: usize) -> usize {
        while let Some(ch) = self.char_at(offset) {
            if !is_blank(ch) {
                break;
            }
            offset += ch.len_utf8();
        }
        offset
    }

    /// Span of `lexeme` starting at the current position.
    fn span_of(&self, lexeme: &str) -> Span {
        let (mut line, mut col) = (self.line, self.col);
        let (mut end_line, mut end_col) = (line, col);
        for ch in lexeme.chars() {
            end_line = line;
            end_col = col;
            if ch == '\n' {
                line += 1;
                col = 1;
            } else {
                col += 1;
            }
        }
        Span::new(self.line, self.col, end_line, end_col)
    }

    fn emit(&mut self, kind: TokenKind, len: usize) -> Token<'src> {
        self.len = len;
        let source: &'src str = self.source;
        let lexeme = &source[self.start..self.start + len];
        Token {
            kind,
            lexeme,
            offset: self.start,
            span: self.span_of(lexeme),
        }
    }

    fn error(&self, code: ErrorCode, message: impl Into<String>, len: usize) -> YuError {
        let mut end = (self.start + len).min(self.source.len());
        while !self.source.is_char_boundary(end) {
            end -= 1;
        }
        let span = self.span_of(&self.source[self.start..end]);
        YuError::at(self.source_file, code, message, span)
    }

    /// One-character lookahead: `double` if the character after the
    /// current one is `expected`, `single` otherwise.
    fn operator_two(
        &mut self,
        expected: char,
        single: TokenKind,
        double: TokenKind,
    ) -> Token<'src> {
        if self.char_at(self.start + 1) == Some(expected) {
            self.emit(double, 1 + expected.len_utf8())
        } else {
            self.emit(single, 1)
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Scanning
    // ─────────────────────────────────────────────────────────────

    fn scan(&mut self) -> yu_types::Result<Token<'src>> {
        let Some(ch) = self.char_at(self.start) else {
            return Ok(self.emit(TokenKind::Eof, 0));
        };

        let token = match ch {
            ' ' | '\t' | '\x0c' => {
                let end = self.skip_blanks_from(self.start);
                self.emit(TokenKind::Whitespace, end - self.start)
            }
            '\n' => self.emit(TokenKind::Newline, 1),
            '\r' => self.operator_two('\n', TokenKind::Newline, TokenKind::Newline),

            '.' if self.col == 1 => self.scan_line_comment(),
            '.' => self.emit(TokenKind::Dot, 1),
            ',' => self.emit(TokenKind::Comma, 1),
            ';' => self.emit(TokenKind::Semi, 1),
            '(' => self.emit(TokenKind::LParen, 1),
            ')' => self.emit(TokenKind::RParen, 1),
            '{' => self.emit(TokenKind::LBrace, 1),
            '}' => self.emit(TokenKind::RBrace, 1),

            '&' | '|' => {
                if self.char_at(self.start + 1) != Some(ch) {
                    return Err(self
                        .error(
                            ErrorCode::INVALID_CHARACTER,
                            format!("unexpected character '{ch}'"),
                            1,
                        )
                        .with_suggestion(format!("use '{ch}{ch}'")));
                }
                let kind = if ch == '&' {
                    TokenKind::AndAnd
                } else {
                    TokenKind::OrOr
                };
                self.emit(kind, 2)
            }
            '?' => self.operator_two('*', TokenKind::Contains, TokenKind::StartsWith),
            '*' => self.operator_two('?', TokenKind::Star, TokenKind::EndsWith),
            '=' => self.operator_two('=', TokenKind::Eq, TokenKind::EqEq),
            '!' => self.operator_two('=', TokenKind::Not, TokenKind::NotEq),
            '<' => self.operator_two('=', TokenKind::Lt, TokenKind::LtEq),
            '>' => self.operator_two('=', TokenKind::Gt, TokenKind::GtEq),
            '+' => self.emit(TokenKind::Plus, 1),
            '-' => self.emit(TokenKind::Minus, 1),

            '/' => match self.char_at(self.start + 1) {
                Some('/') => self.scan_line_comment(),
                Some('.') => self.scan_block_comment()?,
                _ => self.emit(TokenKind::Slash, 1),
            },

            '"' => self.scan_string()?,
            '0'..='9' => {
                let digits = self.source[self.start..]
                    .bytes()
                    .take_while(u8::is_ascii_digit)
                    .count();
                self.emit(TokenKind::Number, digits)
            }
            c if is_ident_start(c) => self.scan_identifier(),

            other => {
                return Err(self.error(
                    ErrorCode::INVALID_CHARACTER,
                    format!("unexpected character '{}'", other.escape_default()),
                    other.len_utf8(),
                ))
            }
        };
        Ok(token)
    }

    /// `// ...` or a column-1 `. ...`, up to (not including) the line break.
    fn scan_line_comment(&mut self) -> Token<'src> {
        let len = self.source[self.start..]
            .find(['\n', '\r'])
            .unwrap_or(self.source.len() - self.start);
        self.emit(TokenKind::Comment, len)
    }

    /// `/. ... ./`
    fn scan_block_comment(&mut self) -> yu_types::Result<Token<'src>> {
        match self.source[self.start + 2..].find("./") {
            Some(idx) => Ok(self.emit(TokenKind::Comment, 2 + idx + 2)),
            None => Err(self
                .error(
                    ErrorCode::UNTERMINATED_COMMENT,
                    "unterminated block comment",
                    2,
                )
                .with_suggestion("close the comment with './'")),
        }
    }

    fn scan_string(&mut self) -> yu_types::Result<Token<'src>> {
        let mut chars = self.source[self.start + 1..].char_indices();
        while let Some((idx, ch)) = chars.next() {
            match ch {
                '"' => return Ok(self.emit(TokenKind::Str, idx + 2)),
                '\n' | '\r' => {
                    return Err(self.error(
                        ErrorCode::UNTERMINATED_STRING,
                        "line break inside string literal",
                        idx + 1,
                    ))
                }
                '\\' => match chars.next() {
                    Some((_, 'n' | 't' | 'r' | 'f' | 'b' | '0' | '"' | '\'' | '\\')) => {}
                    Some((_, 'u')) => {
                        let hex = (0..4).filter_map(|_| chars.next()).map(|(_, c)| c);
                        if hex.filter(char::is_ascii_hexdigit).count() != 4 {
                            return Err(self.error(
                                ErrorCode::INVALID_ESCAPE,
                                "'\\u' must be followed by four hex digits",
                                idx + 3,
                            ));
                        }
                    }
                    Some((_, other)) => {
                        return Err(self.error(
                            ErrorCode::INVALID_ESCAPE,
                            format!("invalid escape sequence '\\{}'", other.escape_default()),
                            idx + 3,
                        ))
                    }
                    None => break,
                },
                _ => {}
            }
        }
        Err(self.error(
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            self.source.len() - self.start,
        ))
    }

    fn scan_identifier(&mut self) -> Token<'src> {
        let source: &'src str = self.source;
        let rest = &source[self.start..];
        let len = rest
            .char_indices()
            .find(|&(_, c)| !is_ident_part(c))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let word = &rest[..len];
        let after = self.start + len;

        let kind = match KEYWORD_TRIE.lookup(word) {
            Some(TokenKind::VariablePrefix(_)) if word == "s" && self.is_arith_name(after) => {
                return self.emit(TokenKind::Identifier, len + 1);
            }
            Some(kind @ TokenKind::VariablePrefix(_)) => {
                match self.char_at(self.skip_blanks_from(after)) {
                    Some(c) if c == '.' || is_ident_start(c) => kind,
                    _ => TokenKind::Identifier,
                }
            }
            Some(kind @ (TokenKind::If | TokenKind::While | TokenKind::For)) => {
                if self.char_at(self.skip_blanks_from(after)) == Some('(') {
                    kind
                } else {
                    TokenKind::Identifier
                }
            }
            Some(kind) => kind,
            None => TokenKind::Identifier,
        };
        self.emit(kind, len)
    }

    /// `s2(`, `s+(`, `s-(`, `s*(`, `s/(`: the arithmetic native names.
    fn is_arith_name(&self, after: usize) -> bool {
        matches!(self.char_at(after), Some('2' | '+' | '-' | '*' | '/'))
            && self.char_at(self.skip_blanks_from(after + 1)) == Some('(')
    }
}

/// Scan the whole source, trivia included, ending with the `Eof` token.
pub fn tokenize(source_file: &SourceFile) -> yu_types::Result<Vec<Token<'_>>> {
    let mut lexer = Lexer::new(source_file);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

/// Decode the body of a string lexeme (quotes included) into its value.
///
/// The lexer has already validated every escape; an escape naming a
/// surrogate code point decodes to U+FFFD.
pub fn unescape(lexeme: &str) -> String {
    let body = lexeme
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lexeme);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\x0c'),
            Some('b') => out.push('\x08'),
            Some('0') => out.push('\0'),
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                let decoded = u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .unwrap_or(char::REPLACEMENT_CHARACTER);
                out.push(decoded);
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn is_blank(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\x0c')
}

fn is_ident_start(ch: char) -> bool {
    ch.is_alphabetic() || ch == '_' || ch == '$'
}

fn is_ident_part(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_simple_escapes() {
        assert_eq!(unescape(r#""a\nb\tc""#), "a\nb\tc");
        assert_eq!(unescape(r#""say \"hi\"""#), "say \"hi\"");
        assert_eq!(unescape(r#""back\\slash""#), "back\\slash");
        assert_eq!(unescape(r#""nul\0""#), "nul\0");
    }

    #[test]
    fn test_unescape_unicode() {
        assert_eq!(unescape(r#""\u0041\u00e9""#), "Aé");
        assert_eq!(unescape(r#""\ud800""#), "\u{FFFD}");
    }

    #[test]
    fn test_span_of_multiline_lexeme() {
        let sf = SourceFile::new("t.yu", "/. a\nb ./");
        let mut lexer = Lexer::new(&sf);
        let token = lexer.next_token().unwrap();
        assert_eq!(token.kind, TokenKind::Comment);
        assert_eq!(token.span, Span::new(1, 1, 2, 4));
    }
}
