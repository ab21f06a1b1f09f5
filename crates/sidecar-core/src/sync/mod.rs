//! Content synchronization
//!
//! - [`ContentSynchronizer`]: digest-compared writes and deletions per data key
//! - [`SyncTarget`]: directory, filename, decoded content and mode for one key
//! - [`SyncReport`]: what happened to each key of one event

mod report;
mod synchronizer;
mod target;

pub use report::{SyncFailure, SyncReport, WriteOutcome};
pub use synchronizer::ContentSynchronizer;
pub use synchronizer::prepare_directory;
pub use target::SyncTarget;
