//! Chained query error types
//!
//! Error codes:
//! - SQ_FATAL_QUERY (FATAL)

use std::fmt;

/// Chained query error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainErrorCode {
    /// Configuring or running a latter query failed
    SqFatalQuery,
}

impl ChainErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            ChainErrorCode::SqFatalQuery => "SQ_FATAL_QUERY",
        }
    }
}

impl fmt::Display for ChainErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Chained query error; always terminates the chain
#[derive(Debug, Clone, PartialEq)]
pub struct ChainError {
    code: ChainErrorCode,
    message: String,
}

impl ChainError {
    pub fn fatal_query(reason: impl Into<String>) -> Self {
        Self {
            code: ChainErrorCode::SqFatalQuery,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> ChainErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[FATAL] {}: {}", self.code.code(), self.message)
    }
}

impl std::error::Error for ChainError {}

/// Result type for chained queries
pub type ChainResult<T> = Result<T, ChainError>;
