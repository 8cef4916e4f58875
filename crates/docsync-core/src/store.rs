//! Unified storage interface
//!
//! The `Store` wraps whichever backend the configuration selected and is
//! what the rest of the crate holds on to. It is cheap to clone: every
//! clone shares the same backend.
//!
//! ## Usage
//!
//! ```ignore
//! let store = Store::open(&Config::load()?)?;
//!
//! store.put("tasks", "t1", &doc)?;
//! let tasks = store.get_all("tasks")?;
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::debug;

use crate::config::Config;
use crate::document::{Collection, Document, Schema, SchemaRegistry};
use crate::storage::{BackendKind, DocumentBackend, MemoryBackend, StorageResult};

/// Handle to the configured document backend
#[derive(Debug, Clone)]
pub struct Store {
    backend: Arc<dyn DocumentBackend>,
    kind: BackendKind,
}

impl Store {
    /// Open the backend named in `config`
    pub fn open(config: &Config) -> Result<Self> {
        let backend = config
            .store_backend
            .open(config)
            .with_context(|| format!("Failed to open {} store", config.store_backend))?;
        Ok(Self {
            backend,
            kind: config.store_backend,
        })
    }

    /// Wrap an already constructed backend
    pub fn with_backend(backend: Arc<dyn DocumentBackend>, kind: BackendKind) -> Self {
        Self { backend, kind }
    }

    /// A fresh, empty in-memory store
    pub fn in_memory() -> Self {
        Self::with_backend(Arc::new(MemoryBackend::new()), BackendKind::Memory)
    }

    /// Which backend this store runs on
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    pub fn get_all(&self, collection: &str) -> StorageResult<Collection> {
        debug!("get_all {}", collection);
        self.backend.get_all(collection)
    }

    pub fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        debug!("get {}/{}", collection, key);
        self.backend.get(collection, key)
    }

    pub fn put(&self, collection: &str, key: &str, doc: &Document) -> StorageResult<()> {
        self.backend.put(collection, key, doc)
    }

    pub fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        self.backend.delete(collection, key)
    }

    pub fn list_collections(&self) -> StorageResult<Vec<String>> {
        self.backend.list_collections()
    }

    pub fn get_schema(&self, collection: &str) -> StorageResult<Option<Schema>> {
        self.backend.get_schema(collection)
    }

    pub fn put_schema(&self, collection: &str, schema: &Schema) -> StorageResult<()> {
        self.backend.put_schema(collection, schema)
    }

    pub fn delete_schema(&self, collection: &str) -> StorageResult<bool> {
        self.backend.delete_schema(collection)
    }

    pub fn list_schemas(&self) -> StorageResult<SchemaRegistry> {
        self.backend.list_schemas()
    }
}
