//! Collaborator contracts for chained queries

use std::collections::BTreeSet;

use crate::errors::{EngineError, EngineResult};
use crate::scan::QueryData;
use crate::scheduler::{ResultRecord, ScanScheduler, VisibilityLabels};

/// A lazily produced sequence of result records
pub type ResultStream = Box<dyn Iterator<Item = EngineResult<ResultRecord>>>;

/// Records of a scan scheduler as a result stream
pub fn scheduler_stream<I>(scheduler: ScanScheduler<I>) -> ResultStream
where
    I: Iterator<Item = QueryData> + 'static,
{
    Box::new(scheduler.map(|record| record.map_err(EngineError::from)))
}

/// A configurable query that can be cloned from a template and run
pub trait QueryLogic {
    /// Fresh, unconfigured copy of this logic
    fn clone_logic(&self) -> Box<dyn QueryLogic>;

    /// Configure against the backing store for `query`
    fn initialize(&mut self, query: &str, labels: &VisibilityLabels) -> EngineResult<()>;

    /// Result sequence of the configured query
    fn results(&mut self) -> EngineResult<ResultStream>;

    /// Release anything held by this run
    fn close(&mut self);
}

/// Caller-supplied hooks that turn initial results into latter queries
pub trait ChainStrategy {
    /// Terms harvested from one initial result.
    ///
    /// `None` means no more terms are available and stops the current batch;
    /// an empty set means keep going without adding anything.
    fn extract_terms(&mut self, record: &ResultRecord) -> Option<BTreeSet<String>>;

    /// Query text for one batch of terms
    fn build_query(&self, terms: &BTreeSet<String>) -> String;
}
