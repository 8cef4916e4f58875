//! Collection sync
//!
//! Clients push the documents they changed since their last sync and
//! pull whatever the server holds that is newer than their watermark.
//! Conflicts are settled per document by `updatedAt`: the newest copy
//! wins and ties keep what is already stored.
//!
//! ## Usage
//!
//! ```ignore
//! let engine = SyncEngine::new(store);
//! let response = engine.sync("tasks", &request)?;
//! // hand response.server_time back as the next lastSyncTime
//! ```

mod engine;
mod message;

pub use engine::{SyncEngine, SyncError, UpsertOutcome};
pub use message::{SyncRequest, SyncResponse, LEGACY_NOTES_COLLECTION};
