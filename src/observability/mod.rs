//! Observability subsystem
//!
//! Provides:
//! - Structured logging (JSON lines)
//! - Counters for planning and scheduling
//! - Typed events
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on rewriting or scheduling
//! 3. No background threads
//! 4. Loggers are owned values passed in at construction, never globals

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{LogSink, Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
