//! docsync Core Library
//!
//! This crate provides the core functionality for docsync, a document
//! store that keeps named collections of JSON documents, validates them
//! against per-collection schemas and syncs them with clients by
//! last-write-wins on `updatedAt`.
//!
//! # Architecture
//!
//! - **Storage**: one contract ([`DocumentBackend`]), three backends
//!   (JSON files, SQLite, memory) chosen by configuration
//! - **Validation**: a JSON-Schema subset checked before every write
//! - **Sync**: batch merge plus delta computation over one collection
//!
//! # Quick Start
//!
//! ```text
//! let store = Store::open(&Config::load()?)?;
//! let engine = SyncEngine::new(store);
//!
//! let response = engine.sync("tasks", &request)?;
//! ```
//!
//! # Modules
//!
//! - `store`: Backend handle (main entry point)
//! - `sync`: Sync engine and wire types
//! - `validation`: Schema validator
//! - `document`: Document model and key resolution
//! - `timestamp`: Lenient timestamp parsing
//! - `storage`: Backend contract and implementations
//! - `config`: Application configuration

pub mod config;
pub mod document;
pub mod storage;
pub mod store;
pub mod sync;
pub mod timestamp;
pub mod validation;

pub use config::Config;
pub use document::{Collection, Document, Schema, SchemaRegistry};
pub use storage::{BackendKind, DocumentBackend, StorageError, UnknownBackend};
pub use store::Store;
pub use sync::{SyncEngine, SyncError, SyncRequest, SyncResponse, UpsertOutcome};
pub use timestamp::InvalidTimestamp;
pub use validation::{validate, SchemaViolation};
