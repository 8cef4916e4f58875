//! Last-write-wins sync engine
//!
//! A sync call runs in three passes over one collection:
//!
//! 1. **Stage**: resolve each candidate's key (keyless candidates are
//!    dropped) and validate it against the collection schema. One
//!    violation rejects the batch before anything is written.
//! 2. **Merge**: compare each staged candidate with a snapshot of the
//!    collection and write the ones that win. The snapshot is updated as
//!    the batch proceeds, so a repeated key competes with the batch's own
//!    earlier winner.
//! 3. **Delta**: return what is newer than the client's watermark.
//!
//! The read-compare-write is not atomic against other writers of the
//! same key: two concurrent syncs can both decide to write and the last
//! `put` lands. Writes are whole-document, so no document is ever torn.

use thiserror::Error;
use tracing::{debug, info};

use crate::document::{
    document_key, is_newer_than, updated_at, Collection, Document, Schema, SchemaRegistry,
};
use crate::storage::StorageError;
use crate::store::Store;
use crate::timestamp::{parse_timestamp, server_time, InvalidTimestamp};
use crate::validation::{validate, SchemaViolation};

use super::message::{SyncRequest, SyncResponse};

/// Errors that can occur while syncing or writing documents
#[derive(Error, Debug)]
pub enum SyncError {
    /// A document does not satisfy its collection schema
    #[error("schema validation failed: {0}")]
    Validation(#[from] SchemaViolation),

    /// A caller-supplied timestamp could not be parsed
    #[error(transparent)]
    InvalidTimestamp(#[from] InvalidTimestamp),

    /// The backend failed
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result of a direct upsert
#[derive(Debug, Clone, PartialEq)]
pub enum UpsertOutcome {
    /// The incoming document was written
    Stored(Document),
    /// The stored document is at least as new and was kept
    Kept(Document),
}

impl UpsertOutcome {
    /// The document now in the store
    pub fn document(&self) -> &Document {
        match self {
            UpsertOutcome::Stored(doc) | UpsertOutcome::Kept(doc) => doc,
        }
    }

    pub fn was_stored(&self) -> bool {
        matches!(self, UpsertOutcome::Stored(_))
    }
}

/// Applies sync batches and direct writes to a [`Store`]
#[derive(Debug, Clone)]
pub struct SyncEngine {
    store: Store,
}

impl SyncEngine {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Merge a client's batch into `collection` and compute its delta
    pub fn sync(&self, collection: &str, request: &SyncRequest) -> Result<SyncResponse, SyncError> {
        let server_time = server_time();
        let since = request
            .last_sync_time
            .as_deref()
            .and_then(|raw| parse_timestamp(raw).ok());

        let staged = self.stage(collection, request.candidates())?;

        let mut snapshot = self.store.get_all(collection)?;
        let mut written = 0;
        for (key, doc) in &staged {
            if !incoming_wins(snapshot.get(*key), doc) {
                debug!("sync {}/{}: stored copy kept", collection, key);
                continue;
            }
            self.store.put(collection, key, doc)?;
            snapshot.insert((*key).to_string(), (*doc).clone());
            written += 1;
        }

        let items = delta(snapshot, since);
        info!(
            "Synced {}: {} received, {} written, {} returned",
            collection,
            request.candidates().len(),
            written,
            items.len()
        );
        Ok(SyncResponse::new(collection, items, server_time))
    }

    /// Resolve keys and validate every candidate before anything is written
    fn stage<'a>(
        &self,
        collection: &str,
        candidates: &'a [Document],
    ) -> Result<Vec<(&'a str, &'a Document)>, SyncError> {
        let schema = self.store.get_schema(collection)?;
        let mut staged = Vec::with_capacity(candidates.len());
        for doc in candidates {
            let Some(key) = document_key(doc) else {
                debug!("sync {}: dropping candidate without a key", collection);
                continue;
            };
            validate(schema.as_ref(), doc)?;
            staged.push((key, doc));
        }
        Ok(staged)
    }

    /// Write one document under `key`, unless the stored copy is at least as new
    ///
    /// Unlike a sync batch, a document without a usable `updatedAt` is
    /// written: the stored copy is only kept when both timestamps parse
    /// and the incoming one is not strictly newer.
    pub fn upsert(
        &self,
        collection: &str,
        key: &str,
        doc: Document,
    ) -> Result<UpsertOutcome, SyncError> {
        self.validate_against_schema(collection, &doc)?;

        if let Some(existing) = self.store.get(collection, key)? {
            if let (Some(stored), Some(incoming)) = (updated_at(&existing), updated_at(&doc)) {
                if incoming <= stored {
                    debug!("upsert {}/{}: stored copy kept", collection, key);
                    return Ok(UpsertOutcome::Kept(existing));
                }
            }
        }

        self.store.put(collection, key, &doc)?;
        Ok(UpsertOutcome::Stored(doc))
    }

    /// Documents modified strictly after `since`
    pub fn items_since(&self, collection: &str, since: &str) -> Result<Vec<Document>, SyncError> {
        let since = parse_timestamp(since)?;
        Ok(delta(self.store.get_all(collection)?, Some(since)))
    }

    /// Check `doc` against the schema registered for `collection`, if any
    pub fn validate_against_schema(&self, collection: &str, doc: &Document) -> Result<(), SyncError> {
        let schema = self.store.get_schema(collection)?;
        validate(schema.as_ref(), doc)?;
        Ok(())
    }

    pub fn get(&self, collection: &str, key: &str) -> Result<Option<Document>, SyncError> {
        Ok(self.store.get(collection, key)?)
    }

    pub fn get_all(&self, collection: &str) -> Result<Collection, SyncError> {
        Ok(self.store.get_all(collection)?)
    }

    pub fn delete(&self, collection: &str, key: &str) -> Result<bool, SyncError> {
        Ok(self.store.delete(collection, key)?)
    }

    pub fn list_collections(&self) -> Result<Vec<String>, SyncError> {
        Ok(self.store.list_collections()?)
    }

    pub fn get_schema(&self, collection: &str) -> Result<Option<Schema>, SyncError> {
        Ok(self.store.get_schema(collection)?)
    }

    pub fn put_schema(&self, collection: &str, schema: &Schema) -> Result<(), SyncError> {
        Ok(self.store.put_schema(collection, schema)?)
    }

    pub fn delete_schema(&self, collection: &str) -> Result<bool, SyncError> {
        Ok(self.store.delete_schema(collection)?)
    }

    pub fn list_schemas(&self) -> Result<SchemaRegistry, SyncError> {
        Ok(self.store.list_schemas()?)
    }
}

/// Last-write-wins for one sync candidate
///
/// A candidate without a parseable `updatedAt` never wins. A stored copy
/// without one always loses. Ties keep the stored copy.
fn incoming_wins(stored: Option<&Document>, incoming: &Document) -> bool {
    let Some(incoming) = updated_at(incoming) else {
        return false;
    };
    match stored.map(updated_at) {
        None | Some(None) => true,
        Some(Some(stored)) => incoming > stored,
    }
}

/// Documents of `docs` newer than `since`, or all of them without a watermark
fn delta(docs: Collection, since: Option<chrono::DateTime<chrono::Utc>>) -> Vec<Document> {
    match since {
        None => docs.into_values().collect(),
        Some(since) => docs
            .into_values()
            .filter(|doc| is_newer_than(doc, since))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::sync::Arc;
    use std::thread;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn engine() -> SyncEngine {
        SyncEngine::new(Store::in_memory())
    }

    fn request(items: Vec<Value>, last_sync_time: Option<&str>) -> SyncRequest {
        SyncRequest::new(
            items.into_iter().map(doc).collect(),
            last_sync_time.map(String::from),
        )
    }

    #[test]
    fn test_last_write_wins() {
        let engine = engine();
        engine
            .sync(
                "notes",
                &request(
                    vec![json!({"dateKey": "2024-01-15", "body": "new", "updatedAt": "2024-01-15T12:00:00Z"})],
                    None,
                ),
            )
            .unwrap();

        // Older copy loses
        let resp = engine
            .sync(
                "notes",
                &request(
                    vec![json!({"dateKey": "2024-01-15", "body": "old", "updatedAt": "2024-01-15T10:00:00Z"})],
                    None,
                ),
            )
            .unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0]["body"], json!("new"));

        // Equal timestamp loses too
        engine
            .sync(
                "notes",
                &request(
                    vec![json!({"dateKey": "2024-01-15", "body": "tie", "updatedAt": "2024-01-15T12:00:00Z"})],
                    None,
                ),
            )
            .unwrap();
        let stored = engine.get("notes", "2024-01-15").unwrap().unwrap();
        assert_eq!(stored["body"], json!("new"));

        // Newer copy wins, whatever the offset notation
        engine
            .sync(
                "notes",
                &request(
                    vec![json!({"dateKey": "2024-01-15", "body": "newer", "updatedAt": "2024-01-15T14:00:00+01:00"})],
                    None,
                ),
            )
            .unwrap();
        let stored = engine.get("notes", "2024-01-15").unwrap().unwrap();
        assert_eq!(stored["body"], json!("newer"));
    }

    #[test]
    fn test_delta_since_watermark() {
        let engine = engine();
        engine
            .sync(
                "tasks",
                &request(
                    vec![
                        json!({"id": "a", "updatedAt": "2024-01-01"}),
                        json!({"id": "b", "updatedAt": "2024-06-01"}),
                    ],
                    None,
                ),
            )
            .unwrap();

        let resp = engine
            .sync("tasks", &request(vec![], Some("2024-03-01")))
            .unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.items[0]["id"], json!("b"));
        assert!(resp.notes.is_none());
    }

    #[test]
    fn test_unparseable_watermark_returns_everything() {
        let engine = engine();
        engine
            .sync(
                "tasks",
                &request(vec![json!({"id": "a", "updatedAt": "2024-01-01"})], None),
            )
            .unwrap();

        for watermark in ["", "yesterday"] {
            let resp = engine
                .sync("tasks", &request(vec![], Some(watermark)))
                .unwrap();
            assert_eq!(resp.items.len(), 1, "watermark {watermark:?}");
        }
    }

    #[test]
    fn test_batch_rejected_as_a_whole() {
        let engine = engine();
        engine
            .put_schema("users", &doc(json!({"required": ["name"]})))
            .unwrap();

        let err = engine
            .sync(
                "users",
                &request(
                    vec![
                        json!({"id": "u1", "name": "Ada", "updatedAt": "2024-01-01T00:00:00Z"}),
                        json!({"id": "u2", "updatedAt": "2024-01-01T00:00:00Z"}),
                    ],
                    None,
                ),
            )
            .unwrap_err();

        match err {
            SyncError::Validation(violation) => {
                assert_eq!(violation.path, "$");
                assert!(violation.message.contains("name"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
        assert!(engine.get("users", "u1").unwrap().is_none());
        assert!(engine.get("users", "u2").unwrap().is_none());
    }

    #[test]
    fn test_keyless_candidates_are_dropped() {
        let engine = engine();
        engine
            .put_schema("tasks", &doc(json!({"required": ["title"]})))
            .unwrap();

        let resp = engine
            .sync(
                "tasks",
                &request(
                    vec![
                        // No key: dropped before validation
                        json!({"updatedAt": "2024-01-01T00:00:00Z"}),
                        json!({"key": "", "id": "t1", "title": "x", "updatedAt": "2024-01-01T00:00:00Z"}),
                    ],
                    None,
                ),
            )
            .unwrap();

        assert_eq!(resp.items.len(), 1);
        assert!(engine.get("tasks", "t1").unwrap().is_some());
    }

    #[test]
    fn test_key_resolution_order() {
        let engine = engine();
        engine
            .sync(
                "notes",
                &request(
                    vec![json!({"dateKey": "d", "key": "k", "id": "i", "updatedAt": "2024-01-01"})],
                    None,
                ),
            )
            .unwrap();

        assert!(engine.get("notes", "d").unwrap().is_some());
        assert!(engine.get("notes", "k").unwrap().is_none());
    }

    #[test]
    fn test_candidate_without_timestamp_is_not_written() {
        let engine = engine();
        let resp = engine
            .sync("tasks", &request(vec![json!({"id": "a"})], None))
            .unwrap();

        assert!(resp.items.is_empty());
        assert!(engine.get("tasks", "a").unwrap().is_none());
    }

    #[test]
    fn test_stored_copy_without_timestamp_is_replaced() {
        let engine = engine();
        engine.store().put("tasks", "a", &doc(json!({"id": "a"}))).unwrap();

        engine
            .sync(
                "tasks",
                &request(vec![json!({"id": "a", "updatedAt": "2024-01-01"})], None),
            )
            .unwrap();
        assert!(engine.get("tasks", "a").unwrap().unwrap().contains_key("updatedAt"));
    }

    #[test]
    fn test_duplicate_keys_in_one_batch() {
        let engine = engine();
        engine
            .sync(
                "tasks",
                &request(
                    vec![
                        json!({"id": "a", "v": 2, "updatedAt": "2024-02-01T00:00:00Z"}),
                        json!({"id": "a", "v": 1, "updatedAt": "2024-01-01T00:00:00Z"}),
                        json!({"id": "a", "v": 3, "updatedAt": "2024-03-01T00:00:00Z"}),
                    ],
                    None,
                ),
            )
            .unwrap();

        assert_eq!(engine.get("tasks", "a").unwrap().unwrap()["v"], json!(3));
    }

    #[test]
    fn test_legacy_notes_round_trip() {
        let engine = engine();
        let req: SyncRequest = serde_json::from_value(json!({
            "notes": [{"dateKey": "2024-01-15", "updatedAt": "2024-01-15T12:00:00Z"}]
        }))
        .unwrap();

        let resp = engine.sync("notes", &req).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.notes.as_ref(), Some(&resp.items));
    }

    #[test]
    fn test_server_time_is_a_usable_watermark() {
        let engine = engine();
        let resp = engine.sync("tasks", &request(vec![], None)).unwrap();
        assert!(parse_timestamp(&resp.server_time).is_ok());
        assert!(resp.server_time.ends_with('Z'));
    }

    #[test]
    fn test_upsert_last_write_wins() {
        let engine = engine();
        let first = engine
            .upsert(
                "notes",
                "2024-01-15",
                doc(json!({"body": "v2", "updatedAt": "2024-01-15T12:00:00Z"})),
            )
            .unwrap();
        assert!(first.was_stored());

        let older = engine
            .upsert(
                "notes",
                "2024-01-15",
                doc(json!({"body": "v1", "updatedAt": "2024-01-15T10:00:00Z"})),
            )
            .unwrap();
        assert!(!older.was_stored());
        assert_eq!(older.document()["body"], json!("v2"));

        // Without a timestamp the upsert is unconditional
        let untimed = engine
            .upsert("notes", "2024-01-15", doc(json!({"body": "plain"})))
            .unwrap();
        assert!(untimed.was_stored());
        assert_eq!(
            engine.get("notes", "2024-01-15").unwrap().unwrap()["body"],
            json!("plain")
        );
    }

    #[test]
    fn test_upsert_validates() {
        let engine = engine();
        engine
            .put_schema(
                "users",
                &doc(json!({"properties": {"age": {"type": "integer"}}})),
            )
            .unwrap();

        assert!(engine
            .upsert("users", "u1", doc(json!({"age": 5.0})))
            .is_ok());
        let err = engine
            .upsert("users", "u2", doc(json!({"age": 5.5})))
            .unwrap_err();
        assert!(matches!(err, SyncError::Validation(_)));
        assert!(engine.get("users", "u2").unwrap().is_none());
    }

    #[test]
    fn test_items_since() {
        let engine = engine();
        for (id, ts) in [("a", "2024-01-01"), ("b", "2024-06-01"), ("c", "garbage")] {
            engine
                .upsert("tasks", id, doc(json!({"id": id, "updatedAt": ts})))
                .unwrap();
        }

        let items = engine.items_since("tasks", "2024-03-01").unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], json!("b"));

        let err = engine.items_since("tasks", "not-a-date").unwrap_err();
        assert!(matches!(err, SyncError::InvalidTimestamp(_)));
    }

    #[test]
    fn test_concurrent_syncs_on_distinct_keys() {
        let engine = Arc::new(engine());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let engine = Arc::clone(&engine);
                thread::spawn(move || {
                    let items = (0..10)
                        .map(|i| json!({"id": format!("t{t}-{i}"), "updatedAt": "2024-01-01T00:00:00Z"}))
                        .collect();
                    engine.sync("tasks", &request(items, None)).unwrap();
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(engine.get_all("tasks").unwrap().len(), 80);
    }
}
