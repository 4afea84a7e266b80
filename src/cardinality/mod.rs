//! Cardinality statistics
//!
//! Per-field, per-value occurrence counts consumed by the selectivity
//! rewrite. The lookup is an external collaborator; this module defines its
//! contract and an in-memory implementation.

mod counts;
mod lookup;

pub use counts::CardinalityCounts;
pub use lookup::{CardinalityLookup, StaticCardinalityLookup};
