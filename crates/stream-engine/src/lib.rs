//! Stream Engine - signal reconciliation for time-limited voice notes
//!
//! This crate holds the core of the service:
//! - `Note` data model shared by every component
//! - Ephemeral Queue: bounded, newest-first holding area for notes
//!   confirmed by clients but not yet discoverable via chain indexing
//! - Chain Reconciler: historical note reconstruction from mint events
//! - Stream Merger: one deduplicated live view over both sources

pub mod error;
pub mod merger;
pub mod metadata;
pub mod note;
pub mod queue;
pub mod reconciler;

pub use error::StreamError;
pub use merger::StreamMerger;
pub use metadata::MetadataClient;
pub use note::Note;
pub use queue::{EphemeralQueue, QueueStats};
pub use reconciler::ChainReconciler;

/// Notes live for 24 hours after creation
pub const NOTE_TTL_MS: i64 = 24 * 60 * 60 * 1000;

/// Ephemeral queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Default number of notes returned by a stream listing
pub const DEFAULT_STREAM_LIMIT: usize = 50;

/// Current time in epoch milliseconds
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
