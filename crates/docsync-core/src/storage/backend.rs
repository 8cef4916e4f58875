//! Storage contract shared by every backend
//!
//! Backends know nothing about schemas beyond storing them: validation
//! happens in the sync engine before anything reaches `put`.

use std::fmt::Debug;

use crate::document::{Collection, Document, Schema, SchemaRegistry};

use super::error::StorageResult;

/// A store of named collections of JSON documents plus a parallel
/// registry of one schema per collection name.
///
/// Implementations must be safe to call from many threads at once with
/// no locking on the caller's side. Each implementation guards its
/// resource with a single lock per instance, so operations on different
/// collections still contend with each other.
pub trait DocumentBackend: Send + Sync + Debug {
    /// All documents of a collection. Unknown collections are empty, not errors.
    fn get_all(&self, collection: &str) -> StorageResult<Collection>;

    /// One document, or `None` if the key is not present.
    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>>;

    /// Insert or replace a document unconditionally.
    fn put(&self, collection: &str, key: &str, doc: &Document) -> StorageResult<()>;

    /// Remove a document. Returns whether it existed.
    fn delete(&self, collection: &str, key: &str) -> StorageResult<bool>;

    /// Sorted names of collections holding at least one document.
    fn list_collections(&self) -> StorageResult<Vec<String>>;

    /// Schema attached to a collection, if any.
    fn get_schema(&self, collection: &str) -> StorageResult<Option<Schema>>;

    /// Attach or replace the schema of a collection.
    fn put_schema(&self, collection: &str, schema: &Schema) -> StorageResult<()>;

    /// Detach a schema. Returns whether one existed. Documents are untouched.
    fn delete_schema(&self, collection: &str) -> StorageResult<bool>;

    /// Every registered schema, keyed by collection name.
    fn list_schemas(&self) -> StorageResult<SchemaRegistry>;
}
