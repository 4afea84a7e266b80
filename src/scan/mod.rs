//! Scan descriptors
//!
//! Turns a rewritten tree plus the row ranges it must cover into the
//! `QueryData` units submitted to the backing store.

mod builder;
mod descriptor;
mod range;

pub use builder::{ScanDescriptorBuilder, EXCEEDED_OR_SETTING_PREFIX, QUERY_SETTING};
pub use descriptor::{QueryData, ScanSetting};
pub use range::{RangeCounts, RangeKind, RowRange};
