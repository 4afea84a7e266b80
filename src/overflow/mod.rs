//! Overflow markers
//!
//! Compact encodings for OR lists too large to carry term by term:
//! externalized FST references, inline value sets, and merged row ranges.

mod errors;
mod marker;
mod range_literal;

pub use errors::{OverflowError, OverflowErrorCode, OverflowResult, Severity};
pub use marker::{
    DecodedOverflow, OverflowMarker, OverflowPayload, FIELD_ASSIGNMENT, ID_ASSIGNMENT,
    PARAMS_ASSIGNMENT,
};
pub use range_literal::{merge_ranges, RangeLiteral};
