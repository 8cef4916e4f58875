//! Storage layer
//!
//! Pluggable persistence for collections of JSON documents and their
//! schemas.
//!
//! ## Backends
//!
//! - **json**: one pretty-printed JSON file per collection (default)
//! - **sqlite**: a single `sync.db` database in WAL mode
//! - **memory**: process memory only, for tests and throwaway servers
//!
//! [`BackendKind`] maps configuration names to constructors; everything
//! above this module only sees `Arc<dyn DocumentBackend>`.

pub mod backend;
pub mod error;
pub mod factory;
pub mod json_file;
pub mod memory;
pub mod sqlite;

pub use backend::DocumentBackend;
pub use error::{StorageError, StorageResult};
pub use factory::{BackendKind, UnknownBackend};
pub use json_file::JsonFileBackend;
pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;
