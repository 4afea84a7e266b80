//! Scan scheduling
//!
//! A pull-based, single-pass iterator over result records. Consecutive scan
//! descriptors that share settings are coalesced into one scan session; one
//! session is open at a time.
//!
//! The scheduler is owned by one consuming thread. Cancellation is
//! cooperative and observed between records.

mod cancel;
mod errors;
mod scheduler;
mod session;

pub use cancel::CancellationToken;
pub use errors::{SchedulerError, SchedulerErrorCode, SchedulerResult, Severity};
pub use scheduler::{ScanScheduler, SchedulerPhase};
pub use session::{ResultRecord, ScanSession, ScanSessionProvider, VisibilityLabels};
