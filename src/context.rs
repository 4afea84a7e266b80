//! Query Context
//!
//! Context carried through planning and scheduling.
//! Contains configuration, the logger, counters, and the cancellation token.

use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use crate::config::EngineConfig;
use crate::observability::{Logger, MetricsRegistry};
use crate::scheduler::CancellationToken;

/// Context carried through one query's lifetime
#[derive(Debug, Clone)]
pub struct QueryContext {
    /// Query ID for tracing
    pub query_id: Uuid,

    /// Engine configuration
    pub config: Arc<EngineConfig>,

    /// Structured logger
    pub logger: Logger,

    /// Counters
    pub metrics: Arc<MetricsRegistry>,

    /// Cooperative cancellation, checked between results
    pub cancel: CancellationToken,

    started_at: Instant,
}

impl QueryContext {
    /// Create a context with a console logger at the configured level
    pub fn new(config: EngineConfig) -> Self {
        let logger = config.logger();
        Self::with_logger(config, logger)
    }

    /// Create a context with an explicit logger
    pub fn with_logger(config: EngineConfig, logger: Logger) -> Self {
        Self {
            query_id: Uuid::new_v4(),
            config: Arc::new(config),
            logger,
            metrics: Arc::new(MetricsRegistry::new()),
            cancel: CancellationToken::new(),
            started_at: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds
    pub fn elapsed_ms(&self) -> u128 {
        self.started_at.elapsed().as_millis()
    }

    /// Query id as a string, for log fields
    pub fn query_id_str(&self) -> String {
        self.query_id.to_string()
    }
}

impl Default for QueryContext {
    fn default() -> Self {
        Self::with_logger(EngineConfig::default(), Logger::null())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contexts_get_distinct_ids() {
        let a = QueryContext::default();
        let b = QueryContext::default();
        assert_ne!(a.query_id, b.query_id);
    }

    #[test]
    fn test_clones_share_cancellation() {
        let ctx = QueryContext::default();
        let clone = ctx.clone();
        clone.cancel.cancel();
        assert!(ctx.cancel.is_cancelled());
    }
}
