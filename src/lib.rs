//! shardquery - boolean-query rewrite and scan scheduling engine
//!
//! Sits in front of a sharded, range-queryable sorted key-value store.
//!
//! # Pipeline
//!
//! 1. Parse the query text into an `ExpressionNode` tree
//! 2. Decode legacy marker subtrees into typed markers
//! 3. Expand query-model aliases onto on-disk fields
//! 4. Push oversized fielded lists into overflow markers
//! 5. Delay low-selectivity terms
//! 6. Build scan descriptors
//! 7. Schedule scans and stream result records
//! 8. Optionally chain the results into a second query

pub mod cardinality;
pub mod chain;
pub mod config;
pub mod context;
pub mod errors;
pub mod expression;
pub mod model;
pub mod observability;
pub mod overflow;
pub mod planner;
pub mod rewrite;
pub mod scan;
pub mod scheduler;

pub use config::EngineConfig;
pub use context::QueryContext;
pub use errors::{EngineError, EngineResult};
