//! Query planner
//!
//! Runs one query through the whole planning pipeline:
//!
//! 1. Parse the text
//! 2. Decode legacy marker subtrees
//! 3. Expand query-model aliases
//! 4. Push oversized fielded lists into overflow markers
//! 5. Delay low-selectivity terms
//! 6. Build scan descriptors for the requested row ranges
//!
//! Planning is deterministic for a fixed configuration, statistics and
//! externalizer, apart from the generated overflow marker ids.

mod explain;
mod planner;

pub use explain::ExplainPlan;
pub use planner::{QueryPlan, QueryPlanner, RewrittenQuery};
