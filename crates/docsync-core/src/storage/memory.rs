//! In-memory backend
//!
//! Everything lives in process memory and is lost on restart. Stored
//! documents are never handed out by reference: every read returns a
//! structural clone, so callers can mutate what they get back.

use std::collections::HashMap;

use parking_lot::RwLock;
use tracing::debug;

use crate::document::{Collection, Document, Schema, SchemaRegistry};

use super::backend::DocumentBackend;
use super::error::StorageResult;

#[derive(Debug, Default)]
struct MemoryState {
    collections: HashMap<String, HashMap<String, Document>>,
    schemas: HashMap<String, Schema>,
}

/// Process-resident document store
#[derive(Debug, Default)]
pub struct MemoryBackend {
    state: RwLock<MemoryState>,
}

impl MemoryBackend {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    fn get_all(&self, collection: &str) -> StorageResult<Collection> {
        let state = self.state.read();
        Ok(state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(key, doc)| (key.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }

    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        let state = self.state.read();
        Ok(state
            .collections
            .get(collection)
            .and_then(|docs| docs.get(key))
            .cloned())
    }

    fn put(&self, collection: &str, key: &str, doc: &Document) -> StorageResult<()> {
        debug!("memory put {}/{}", collection, key);
        let mut state = self.state.write();
        state
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(key.to_string(), doc.clone());
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        debug!("memory delete {}/{}", collection, key);
        let mut state = self.state.write();
        let Some(docs) = state.collections.get_mut(collection) else {
            return Ok(false);
        };
        let existed = docs.remove(key).is_some();
        if docs.is_empty() {
            state.collections.remove(collection);
        }
        Ok(existed)
    }

    fn list_collections(&self) -> StorageResult<Vec<String>> {
        let state = self.state.read();
        let mut names: Vec<String> = state
            .collections
            .iter()
            .filter(|(_, docs)| !docs.is_empty())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    fn get_schema(&self, collection: &str) -> StorageResult<Option<Schema>> {
        Ok(self.state.read().schemas.get(collection).cloned())
    }

    fn put_schema(&self, collection: &str, schema: &Schema) -> StorageResult<()> {
        debug!("memory put_schema {}", collection);
        self.state
            .write()
            .schemas
            .insert(collection.to_string(), schema.clone());
        Ok(())
    }

    fn delete_schema(&self, collection: &str) -> StorageResult<bool> {
        debug!("memory delete_schema {}", collection);
        Ok(self.state.write().schemas.remove(collection).is_some())
    }

    fn list_schemas(&self) -> StorageResult<SchemaRegistry> {
        let state = self.state.read();
        Ok(state
            .schemas
            .iter()
            .map(|(name, schema)| (name.clone(), schema.clone()))
            .collect())
    }
}
