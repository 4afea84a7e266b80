//! Rewrite error types
//!
//! Error codes:
//! - SQ_EXTERNALIZATION_FAILED (REJECT)
//! - SQ_MARKER_ENCODE_FAILURE (REJECT)

use std::fmt;

use crate::overflow::OverflowError;

/// Rewrite error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteErrorCode {
    /// The externalization service did not store a value set
    SqExternalizationFailed,
    /// An overflow marker could not be built
    SqMarkerEncodeFailure,
}

impl RewriteErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            RewriteErrorCode::SqExternalizationFailed => "SQ_EXTERNALIZATION_FAILED",
            RewriteErrorCode::SqMarkerEncodeFailure => "SQ_MARKER_ENCODE_FAILURE",
        }
    }
}

impl fmt::Display for RewriteErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Rewrite error with the visitor that raised it
#[derive(Debug, Clone, PartialEq)]
pub struct RewriteError {
    code: RewriteErrorCode,
    message: String,
    visitor: Option<&'static str>,
}

impl RewriteError {
    pub fn externalization_failed(field: &str, reason: impl Into<String>) -> Self {
        Self {
            code: RewriteErrorCode::SqExternalizationFailed,
            message: format!("storing values for '{}' failed: {}", field, reason.into()),
            visitor: None,
        }
    }

    /// Attach the name of the visitor that failed
    pub fn in_visitor(mut self, visitor: &'static str) -> Self {
        self.visitor = Some(visitor);
        self
    }

    pub fn code(&self) -> RewriteErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn visitor(&self) -> Option<&'static str> {
        self.visitor
    }
}

impl From<OverflowError> for RewriteError {
    fn from(err: OverflowError) -> Self {
        Self {
            code: RewriteErrorCode::SqMarkerEncodeFailure,
            message: err.message().to_string(),
            visitor: None,
        }
    }
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REJECT] {}: {}", self.code.code(), self.message)?;
        if let Some(visitor) = self.visitor {
            write!(f, " (in {})", visitor)?;
        }
        Ok(())
    }
}

impl std::error::Error for RewriteError {}

/// Result type for rewrites
pub type RewriteResult<T> = Result<T, RewriteError>;
