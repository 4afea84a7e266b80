//! Scan session contracts
//!
//! Sessions come from an external provider (connection pooling, priority and
//! credentials live there). The scheduler only opens, drains and returns
//! them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::scan::QueryData;

use super::errors::SchedulerResult;

/// One serialized document returned by a scan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub row: String,
    pub document: serde_json::Value,
}

impl ResultRecord {
    pub fn new(row: impl Into<String>, document: serde_json::Value) -> Self {
        Self {
            row: row.into(),
            document,
        }
    }

    /// String value of a top-level document field
    pub fn field(&self, name: &str) -> Option<&str> {
        self.document.get(name)?.as_str()
    }
}

/// Pre-computed visibility labels of the caller
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibilityLabels(BTreeSet<String>);

impl VisibilityLabels {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(labels.into_iter().map(Into::into).collect())
    }

    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An open scan yielding records until exhausted
pub trait ScanSession {
    fn next_record(&mut self) -> SchedulerResult<Option<ResultRecord>>;
}

/// Acquires and returns scan sessions
pub trait ScanSessionProvider {
    fn open(
        &self,
        data: &QueryData,
        labels: &VisibilityLabels,
    ) -> SchedulerResult<Box<dyn ScanSession>>;

    fn close(&self, session: Box<dyn ScanSession>) -> SchedulerResult<()>;
}
