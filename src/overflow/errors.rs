//! Overflow marker error types
//!
//! Error codes:
//! - SQ_MARKER_DECODE_FAILURE (RECOVERABLE)
//! - SQ_RANGE_LITERAL_MALFORMED (RECOVERABLE)
//! - SQ_MARKER_ENCODE_FAILURE (REJECT)

use std::fmt;

/// Severity levels for overflow errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Caller may drop the marker or literal and continue
    Recoverable,
    /// The rewrite cannot produce a marker
    Reject,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Recoverable => write!(f, "RECOVERABLE"),
            Severity::Reject => write!(f, "REJECT"),
        }
    }
}

/// Overflow error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowErrorCode {
    /// Marker-shaped subtree whose payload does not decode
    SqMarkerDecodeFailure,
    /// Range literal fails bracket or length validation
    SqRangeLiteralMalformed,
    /// Marker cannot be built from the given inputs
    SqMarkerEncodeFailure,
}

impl OverflowErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            OverflowErrorCode::SqMarkerDecodeFailure => "SQ_MARKER_DECODE_FAILURE",
            OverflowErrorCode::SqRangeLiteralMalformed => "SQ_RANGE_LITERAL_MALFORMED",
            OverflowErrorCode::SqMarkerEncodeFailure => "SQ_MARKER_ENCODE_FAILURE",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            OverflowErrorCode::SqMarkerDecodeFailure
            | OverflowErrorCode::SqRangeLiteralMalformed => Severity::Recoverable,
            OverflowErrorCode::SqMarkerEncodeFailure => Severity::Reject,
        }
    }
}

impl fmt::Display for OverflowErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Overflow error with context
#[derive(Debug, Clone, PartialEq)]
pub struct OverflowError {
    code: OverflowErrorCode,
    message: String,
}

impl OverflowError {
    pub fn marker_decode_failure(reason: impl Into<String>) -> Self {
        Self {
            code: OverflowErrorCode::SqMarkerDecodeFailure,
            message: reason.into(),
        }
    }

    pub fn range_literal_malformed(literal: &[String]) -> Self {
        Self {
            code: OverflowErrorCode::SqRangeLiteralMalformed,
            message: format!("malformed range literal {:?}", literal),
        }
    }

    pub fn marker_encode_failure(reason: impl Into<String>) -> Self {
        Self {
            code: OverflowErrorCode::SqMarkerEncodeFailure,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> OverflowErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for OverflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {}",
            self.code.severity(),
            self.code.code(),
            self.message
        )
    }
}

impl std::error::Error for OverflowError {}

/// Result type for overflow operations
pub type OverflowResult<T> = Result<T, OverflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        assert_eq!(
            OverflowErrorCode::SqMarkerDecodeFailure.code(),
            "SQ_MARKER_DECODE_FAILURE"
        );
        assert_eq!(
            OverflowErrorCode::SqRangeLiteralMalformed.code(),
            "SQ_RANGE_LITERAL_MALFORMED"
        );
        assert_eq!(
            OverflowErrorCode::SqMarkerEncodeFailure.code(),
            "SQ_MARKER_ENCODE_FAILURE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = OverflowError::range_literal_malformed(&["b".to_string(), "c".to_string()]);
        let display = err.to_string();
        assert!(display.contains("RECOVERABLE"));
        assert!(display.contains("SQ_RANGE_LITERAL_MALFORMED"));
    }
}
