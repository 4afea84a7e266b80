//! Scheduler error types
//!
//! Error codes:
//! - SQ_SCAN_LIMIT_REACHED (ERROR)
//! - SQ_CONNECTION_FAILURE (ERROR)
//! - SQ_SCAN_FAILED (ERROR)

use std::fmt;

/// Severity levels for scheduler errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The scan stopped; nothing is retried
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Scheduler error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerErrorCode {
    /// Configured range cap exceeded
    SqScanLimitReached,
    /// Session could not be acquired or returned
    SqConnectionFailure,
    /// An open session failed while reading
    SqScanFailed,
}

impl SchedulerErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            SchedulerErrorCode::SqScanLimitReached => "SQ_SCAN_LIMIT_REACHED",
            SchedulerErrorCode::SqConnectionFailure => "SQ_CONNECTION_FAILURE",
            SchedulerErrorCode::SqScanFailed => "SQ_SCAN_FAILED",
        }
    }

    pub fn severity(&self) -> Severity {
        Severity::Error
    }
}

impl fmt::Display for SchedulerErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Scheduler error type
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerError {
    code: SchedulerErrorCode,
    message: String,
}

impl SchedulerError {
    pub fn scan_limit_reached(limit: u64, seen: u64) -> Self {
        Self {
            code: SchedulerErrorCode::SqScanLimitReached,
            message: format!("{} ranges seen, limit is {}", seen, limit),
        }
    }

    pub fn connection_failure(reason: impl Into<String>) -> Self {
        Self {
            code: SchedulerErrorCode::SqConnectionFailure,
            message: reason.into(),
        }
    }

    pub fn scan_failed(reason: impl Into<String>) -> Self {
        Self {
            code: SchedulerErrorCode::SqScanFailed,
            message: reason.into(),
        }
    }

    pub fn code(&self) -> SchedulerErrorCode {
        self.code
    }

    pub fn severity(&self) -> Severity {
        self.code.severity()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.severity(), self.code.code(), self.message)
    }
}

impl std::error::Error for SchedulerError {}

/// Result type for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
