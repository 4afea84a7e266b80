//! Metrics registry
//!
//! - Counters only
//! - Monotonic increase
//! - Fire-and-forget: nothing in the core reads these back

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Metrics registry containing the engine counters
///
/// All counters use Relaxed atomics; exactness across threads is not required.
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    queries_planned: AtomicU64,
    parse_failures: AtomicU64,
    terms_delayed: AtomicU64,
    overflow_markers: AtomicU64,
    terms_externalized: AtomicU64,
    descriptors_built: AtomicU64,
    sessions_opened: AtomicU64,
    sessions_closed: AtomicU64,
    session_close_failures: AtomicU64,
    latter_runs: AtomicU64,
}

/// Point-in-time copy of every counter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub queries_planned: u64,
    pub parse_failures: u64,
    pub terms_delayed: u64,
    pub overflow_markers: u64,
    pub terms_externalized: u64,
    pub descriptors_built: u64,
    pub sessions_opened: u64,
    pub sessions_closed: u64,
    pub session_close_failures: u64,
    pub latter_runs: u64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    // Planning

    pub fn increment_queries_planned(&self) {
        self.queries_planned.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_parse_failures(&self) {
        self.parse_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_terms_delayed(&self) {
        self.terms_delayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_overflow_markers(&self) {
        self.overflow_markers.fetch_add(1, Ordering::Relaxed);
    }

    /// Add the number of values handed to the externalization service
    pub fn add_terms_externalized(&self, count: u64) {
        self.terms_externalized.fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_descriptors_built(&self) {
        self.descriptors_built.fetch_add(1, Ordering::Relaxed);
    }

    // Scheduling

    pub fn increment_sessions_opened(&self) {
        self.sessions_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_sessions_closed(&self) {
        self.sessions_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_session_close_failures(&self) {
        self.session_close_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_latter_runs(&self) {
        self.latter_runs.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current values of all counters
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_planned: self.queries_planned.load(Ordering::Relaxed),
            parse_failures: self.parse_failures.load(Ordering::Relaxed),
            terms_delayed: self.terms_delayed.load(Ordering::Relaxed),
            overflow_markers: self.overflow_markers.load(Ordering::Relaxed),
            terms_externalized: self.terms_externalized.load(Ordering::Relaxed),
            descriptors_built: self.descriptors_built.load(Ordering::Relaxed),
            sessions_opened: self.sessions_opened.load(Ordering::Relaxed),
            sessions_closed: self.sessions_closed.load(Ordering::Relaxed),
            session_close_failures: self.session_close_failures.load(Ordering::Relaxed),
            latter_runs: self.latter_runs.load(Ordering::Relaxed),
        }
    }

    /// Current counters as a JSON object
    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }
}
