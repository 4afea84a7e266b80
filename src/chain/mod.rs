//! Chained queries
//!
//! Results of an initial query are harvested for terms; each batch of terms
//! becomes a new run of a second ("latter") query. At most one latter run is
//! active at a time and the initial results are never drained more than one
//! batch ahead of the latter results.

mod errors;
mod iterator;
mod logic;

pub use errors::{ChainError, ChainErrorCode, ChainResult};
pub use iterator::ChainedQueryIterator;
pub use logic::{scheduler_stream, ChainStrategy, QueryLogic, ResultStream};
