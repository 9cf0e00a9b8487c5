//! The sync engine: candidate selection, payload transforms and the
//! per-job loop that ties quota, checkpoint and store together.

pub mod orchestrator;
pub mod rating;
pub mod report;
pub mod selector;
pub mod transform;

pub use orchestrator::{SyncOptions, SyncOrchestrator, DEFAULT_MAX_CALLS};
pub use rating::RatingPolicy;
pub use report::{RunSummary, StopReason};
pub use selector::{SelectionPolicy, Staleness};
