//! Crate-level error type
//!
//! Every subsystem keeps its own coded error; `EngineError` wraps them so a
//! caller driving the whole pipeline can use one `?`.

use thiserror::Error;

use crate::chain::ChainError;
use crate::config::ConfigError;
use crate::expression::ParseError;
use crate::overflow::OverflowError;
use crate::rewrite::RewriteError;
use crate::scheduler::SchedulerError;

/// Result type for pipeline operations
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors surfaced by the engine
#[derive(Debug, Clone, Error)]
pub enum EngineError {
    // ==================
    // Planning
    // ==================
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Overflow(#[from] OverflowError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    // ==================
    // Execution
    // ==================
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl EngineError {
    /// Stable error code of the wrapped error
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::Config(e) => e.code(),
            EngineError::Parse(e) => e.code().code(),
            EngineError::Overflow(e) => e.code().code(),
            EngineError::Rewrite(e) => e.code().code(),
            EngineError::Scheduler(e) => e.code().code(),
            EngineError::Chain(e) => e.code().code(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_code_is_preserved() {
        let err: EngineError = ParseError::unexpected_end(3).into();
        assert_eq!(err.code(), "SQ_PARSE_FAILURE");

        let err: EngineError = SchedulerError::scan_limit_reached(10, 12).into();
        assert_eq!(err.code(), "SQ_SCAN_LIMIT_REACHED");
    }

    #[test]
    fn test_display_is_transparent() {
        let err: EngineError = ChainError::fatal_query("latter setup failed").into();
        assert!(err.to_string().contains("SQ_FATAL_QUERY"));
        assert!(err.to_string().contains("latter setup failed"));
    }
}
