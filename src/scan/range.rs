//! Row ranges
//!
//! Rows are shard ids (`YYYYMMDD_N`) or whole days (`YYYYMMDD`). A range can
//! be narrowed to one datatype inside a shard, or to one document with a
//! `datatype\0uid` column.

use std::fmt;

/// Granularity of a row range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RangeKind {
    /// Every shard of one day
    Day,
    /// One shard
    Shard,
    /// One datatype within a shard
    ShardDatatype,
    /// One document
    Document,
}

impl RangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RangeKind::Day => "day",
            RangeKind::Shard => "shard",
            RangeKind::ShardDatatype => "shard_datatype",
            RangeKind::Document => "document",
        }
    }
}

/// A row plus an optional column restriction
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowRange {
    row: String,
    column: Option<String>,
}

impl RowRange {
    /// Whole row: a day or a shard, depending on the row id
    pub fn row(row: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: None,
        }
    }

    pub fn datatype(row: impl Into<String>, datatype: impl Into<String>) -> Self {
        Self {
            row: row.into(),
            column: Some(datatype.into()),
        }
    }

    pub fn document(
        row: impl Into<String>,
        datatype: impl Into<String>,
        uid: impl Into<String>,
    ) -> Self {
        Self {
            row: row.into(),
            column: Some(format!("{}\0{}", datatype.into(), uid.into())),
        }
    }

    pub fn row_id(&self) -> &str {
        &self.row
    }

    pub fn column(&self) -> Option<&str> {
        self.column.as_deref()
    }

    pub fn kind(&self) -> RangeKind {
        match &self.column {
            Some(column) if column.contains('\0') => RangeKind::Document,
            Some(_) => RangeKind::ShardDatatype,
            None if self.row.contains('_') => RangeKind::Shard,
            None => RangeKind::Day,
        }
    }

    pub fn is_document(&self) -> bool {
        self.kind() == RangeKind::Document
    }
}

impl fmt::Display for RowRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.column {
            Some(column) => write!(f, "{}/{}", self.row, column.replace('\0', "/")),
            None => write!(f, "{}", self.row),
        }
    }
}

/// Number of ranges of each kind seen by a builder
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RangeCounts {
    pub day: u64,
    pub shard: u64,
    pub shard_datatype: u64,
    pub document: u64,
}

impl RangeCounts {
    pub fn record(&mut self, kind: RangeKind) {
        match kind {
            RangeKind::Day => self.day += 1,
            RangeKind::Shard => self.shard += 1,
            RangeKind::ShardDatatype => self.shard_datatype += 1,
            RangeKind::Document => self.document += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.day + self.shard + self.shard_datatype + self.document
    }
}
