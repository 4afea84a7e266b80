//! Expression parsing errors
//!
//! Error codes:
//! - SQ_PARSE_FAILURE (REJECT)

use std::fmt;

/// Severity levels for query errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Query rejected before any scan
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Parse error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorCode {
    /// Malformed query text
    SqParseFailure,
}

impl ParseErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ParseErrorCode::SqParseFailure => "SQ_PARSE_FAILURE",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Reject
    }
}

impl fmt::Display for ParseErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Parse error with the byte offset where it was detected
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    code: ParseErrorCode,
    message: String,
    position: usize,
}

impl ParseError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            code: ParseErrorCode::SqParseFailure,
            message: message.into(),
            position,
        }
    }

    /// Query text is empty or whitespace
    pub fn empty_query() -> Self {
        Self::new("query is empty", 0)
    }

    pub fn unexpected_token(found: impl fmt::Display, expected: &str, position: usize) -> Self {
        Self::new(format!("expected {}, found '{}'", expected, found), position)
    }

    pub fn unexpected_end(position: usize) -> Self {
        Self::new("unexpected end of query", position)
    }

    pub fn unterminated_string(position: usize) -> Self {
        Self::new("unterminated string literal", position)
    }

    pub fn invalid_character(c: char, position: usize) -> Self {
        Self::new(format!("invalid character '{}'", c), position)
    }

    /// A construct that parsed but has an unusable shape
    pub fn invalid(reason: impl Into<String>, position: usize) -> Self {
        Self::new(reason, position)
    }

    pub fn code(&self) -> ParseErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Byte offset into the query text
    pub fn position(&self) -> usize {
        self.position
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} at offset {}",
            self.code.severity(),
            self.code.code(),
            self.message,
            self.position
        )
    }
}

impl std::error::Error for ParseError {}

/// Result type for parsing
pub type ParseResult<T> = Result<T, ParseError>;
