use crate::{SourceFile, Span};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Error category, determined by error code range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorCategory {
    Lexical,
    Syntax,
}

/// Numeric error code (E100–E299).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ErrorCode(pub u16);

impl ErrorCode {
    // ── Lexical errors (E100–E199) ──
    pub const INVALID_CHARACTER: Self = Self(100);
    pub const UNTERMINATED_STRING: Self = Self(101);
    pub const INVALID_ESCAPE: Self = Self(102);
    pub const UNTERMINATED_COMMENT: Self = Self(103);
    pub const NUMBER_OUT_OF_RANGE: Self = Self(104);

    // ── Syntax errors (E200–E299) ──
    pub const UNEXPECTED_TOKEN: Self = Self(200);
    pub const UNCLOSED_BRACE: Self = Self(201);
    pub const UNEXPECTED_CLOSE_BRACE: Self = Self(202);
    pub const MALFORMED_NAME: Self = Self(203);
    pub const MISSING_END: Self = Self(204);
    pub const UNEXPECTED_END: Self = Self(205);

    pub fn category(self) -> ErrorCategory {
        match self.0 {
            100..=199 => ErrorCategory::Lexical,
            _ => ErrorCategory::Syntax,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "E{}", self.0)
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Syntax => write!(f, "syntax"),
        }
    }
}

/// A structured lexical or syntax error.
///
/// Parsing is fail-fast: the first `YuError` aborts the parse and no
/// partial tree is returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YuError {
    /// Source file name.
    pub file: String,
    /// Error code (e.g., E101).
    pub code: ErrorCode,
    /// Error category (derived from code).
    pub category: ErrorCategory,
    /// Human-readable error message.
    pub message: String,
    /// Source location.
    #[serde(flatten)]
    pub span: Span,
    /// The offending source line, for context.
    pub source_line: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl YuError {
    pub fn new(
        file: impl Into<String>,
        code: ErrorCode,
        message: impl Into<String>,
        span: Span,
        source_line: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            code,
            category: code.category(),
            message: message.into(),
            span,
            source_line: source_line.into(),
            suggestion: None,
        }
    }

    /// Build an error, quoting the line `span` starts on from `source`.
    pub fn at(source: &SourceFile, code: ErrorCode, message: impl Into<String>, span: Span) -> Self {
        let line = source.line(span.start_line).unwrap_or("");
        Self::new(source.name.clone(), code, message, span, line)
    }

    /// Attach a fix suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl fmt::Display for YuError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} [{}] {}",
            self.span, self.code, self.category, self.message
        )
    }
}

impl std::error::Error for YuError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_category() {
        assert_eq!(
            ErrorCode::UNTERMINATED_STRING.category(),
            ErrorCategory::Lexical
        );
        assert_eq!(
            ErrorCode::UNEXPECTED_TOKEN.category(),
            ErrorCategory::Syntax
        );
        assert_eq!(ErrorCode::MALFORMED_NAME.category(), ErrorCategory::Syntax);
    }

    #[test]
    fn test_error_code_display() {
        assert_eq!(ErrorCode::INVALID_ESCAPE.to_string(), "E102");
        assert_eq!(ErrorCode::UNCLOSED_BRACE.to_string(), "E201");
    }

    #[test]
    fn test_error_at_quotes_source_line() {
        let src = SourceFile::new("demo.yu", "s a = 1\ns b = \"oops\n");
        let err = YuError::at(
            &src,
            ErrorCode::UNTERMINATED_STRING,
            "unterminated string literal",
            Span::point(2, 7),
        );
        assert_eq!(err.file, "demo.yu");
        assert_eq!(err.source_line, "s b = \"oops");
        assert_eq!(err.category, ErrorCategory::Lexical);
        assert_eq!(
            err.to_string(),
            "2:7: E101 [lexical] unterminated string literal"
        );
    }

    #[test]
    fn test_error_json_serialization() {
        let err = YuError::new(
            "demo.yu",
            ErrorCode::UNEXPECTED_CLOSE_BRACE,
            "unexpected '}'",
            Span::new(4, 1, 4, 1),
            "}",
        )
        .with_suggestion("remove the extra '}'");

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("\"line\":4"));
        assert!(json.contains("\"column\":1"));
        assert!(json.contains("\"end_column\":1"));
        assert!(json.contains("\"category\":\"syntax\""));
        assert!(json.contains("\"suggestion\""));

        let back: YuError = serde_json::from_str(&json).unwrap();
        assert_eq!(back, err);
    }

    #[test]
    fn test_error_without_suggestion_omits_field() {
        let err = YuError::new(
            "demo.yu",
            ErrorCode::MISSING_END,
            "'end' expected",
            Span::point(1, 1),
            "",
        );
        let json = serde_json::to_string(&err).unwrap();
        assert!(!json.contains("suggestion"));
    }
}
