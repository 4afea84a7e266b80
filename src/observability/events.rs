//! Observable events emitted by the rewrite and scheduling core
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Parsing
    /// Query text parsed into a tree
    QueryParsed,
    /// Query text rejected by the parser
    QueryParseFailed,
    /// A marker-shaped subtree failed to decode
    MarkerDecodeFailed,
    /// A malformed range literal was dropped from a marker
    RangeLiteralDropped,

    // Rewriting
    /// Query-model aliases expanded
    ModelExpanded,
    /// An OR list was pushed into an overflow marker
    OverflowMarkerCreated,
    /// An OR list was externalized to an FST reference
    TermsExternalized,
    /// An OR list passed the FST threshold with no externalizer configured
    ExternalizerMissing,
    /// A term was wrapped in a delay marker
    TermDelayed,
    /// All rewrite visitors ran
    RewriteComplete,

    // Descriptor building
    /// A scan descriptor was built
    DescriptorBuilt,
    /// The planned query text replaced a longer shard text
    OriginalQuerySubstituted,

    // Scheduling
    /// A scan session was opened
    ScanSessionOpened,
    /// A scan session was closed
    ScanSessionClosed,
    /// Closing a scan session failed (swallowed)
    ScanSessionCloseFailed,
    /// Opening a scan session failed
    ConnectionFailed,
    /// Iteration stopped by a cancellation request
    ScanCancelled,
    /// The scheduler ran out of descriptors
    SchedulerExhausted,
    /// The configured range cap was hit
    ScanLimitReached,

    // Chained queries
    /// A batch of harvested terms started a latter query run
    ChainBatchDispatched,
    /// A latter query run was closed
    ChainLatterClosed,
    /// The chained iteration finished
    ChainExhausted,
    /// A latter query failed to configure or run
    ChainFatal,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::QueryParsed => "QUERY_PARSED",
            Event::QueryParseFailed => "QUERY_PARSE_FAILED",
            Event::MarkerDecodeFailed => "MARKER_DECODE_FAILED",
            Event::RangeLiteralDropped => "RANGE_LITERAL_DROPPED",

            Event::ModelExpanded => "MODEL_EXPANDED",
            Event::OverflowMarkerCreated => "OVERFLOW_MARKER_CREATED",
            Event::TermsExternalized => "TERMS_EXTERNALIZED",
            Event::ExternalizerMissing => "EXTERNALIZER_MISSING",
            Event::TermDelayed => "TERM_DELAYED",
            Event::RewriteComplete => "REWRITE_COMPLETE",

            Event::DescriptorBuilt => "DESCRIPTOR_BUILT",
            Event::OriginalQuerySubstituted => "ORIGINAL_QUERY_SUBSTITUTED",

            Event::ScanSessionOpened => "SCAN_SESSION_OPENED",
            Event::ScanSessionClosed => "SCAN_SESSION_CLOSED",
            Event::ScanSessionCloseFailed => "SCAN_SESSION_CLOSE_FAILED",
            Event::ConnectionFailed => "CONNECTION_FAILED",
            Event::ScanCancelled => "SCAN_CANCELLED",
            Event::SchedulerExhausted => "SCHEDULER_EXHAUSTED",
            Event::ScanLimitReached => "SCAN_LIMIT_REACHED",

            Event::ChainBatchDispatched => "CHAIN_BATCH_DISPATCHED",
            Event::ChainLatterClosed => "CHAIN_LATTER_CLOSED",
            Event::ChainExhausted => "CHAIN_EXHAUSTED",
            Event::ChainFatal => "CHAIN_FATAL",
        }
    }

    /// Returns the severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::TermDelayed
            | Event::DescriptorBuilt
            | Event::ScanSessionOpened
            | Event::ScanSessionClosed => Severity::Trace,
            Event::MarkerDecodeFailed
            | Event::RangeLiteralDropped
            | Event::ExternalizerMissing
            | Event::ScanSessionCloseFailed
            | Event::ScanCancelled => Severity::Warn,
            Event::QueryParseFailed | Event::ConnectionFailed | Event::ScanLimitReached => {
                Severity::Error
            }
            Event::ChainFatal => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event ends the query
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
