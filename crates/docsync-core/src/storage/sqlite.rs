//! SQLite backend
//!
//! All collections share one database file. Documents are stored as JSON
//! text keyed by `(collection, key)`; schemas live in their own table.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::Value;
use tracing::{debug, warn};

use crate::document::{Collection, Document, Schema, SchemaRegistry};

use super::backend::DocumentBackend;
use super::error::{StorageError, StorageResult};

/// Create the `documents` and `schemas` tables if they are missing
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        -- One row per document, body stored as JSON text
        CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            key TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (collection, key)
        );

        -- One schema per collection name
        CREATE TABLE IF NOT EXISTS schemas (
            collection TEXT PRIMARY KEY,
            schema TEXT NOT NULL
        );
        "#,
    )
}

/// Document store backed by a single SQLite database
///
/// A `Connection` cannot be shared between threads, so every operation
/// takes the mutex for its duration.
#[derive(Debug)]
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    /// Open (or create) the database at `path` and enable WAL journaling
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let conn = Connection::open(path)?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        debug!("Opened SQLite store at {:?} (journal_mode={})", path, mode);
        Self::from_connection(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StorageResult<Self> {
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

/// Decode a stored JSON text into an object
fn decode_object(collection: &str, key: &str, raw: &str) -> StorageResult<Document> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(other) => Err(StorageError::CorruptRecord {
            collection: collection.to_string(),
            key: key.to_string(),
            details: format!("expected a JSON object, found {}", other),
        }),
        Err(e) => Err(StorageError::CorruptRecord {
            collection: collection.to_string(),
            key: key.to_string(),
            details: e.to_string(),
        }),
    }
}

impl DocumentBackend for SqliteBackend {
    fn get_all(&self, collection: &str) -> StorageResult<Collection> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key, data FROM documents WHERE collection = ?1")?;
        let rows = stmt.query_map([collection], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut docs = Collection::new();
        for row in rows {
            let (key, raw) = row?;
            match decode_object(collection, &key, &raw) {
                Ok(doc) => {
                    docs.insert(key, doc);
                }
                Err(e) => warn!("Skipping row: {}", e),
            }
        }
        Ok(docs)
    }

    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM documents WHERE collection = ?1 AND key = ?2",
                params![collection, key],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| decode_object(collection, key, &raw))
            .transpose()
    }

    fn put(&self, collection: &str, key: &str, doc: &Document) -> StorageResult<()> {
        debug!("sqlite put {}/{}", collection, key);
        let data = serde_json::to_string(doc)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO documents (collection, key, data) VALUES (?1, ?2, ?3)
             ON CONFLICT(collection, key) DO UPDATE SET data = excluded.data",
            params![collection, key, data],
        )?;
        Ok(())
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        debug!("sqlite delete {}/{}", collection, key);
        let conn = self.conn.lock();
        let removed = conn.execute(
            "DELETE FROM documents WHERE collection = ?1 AND key = ?2",
            params![collection, key],
        )?;
        Ok(removed > 0)
    }

    /// Collections with at least one decodable row, matching what `get_all` returns
    fn list_collections(&self) -> StorageResult<Vec<String>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT collection, key, data FROM documents")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut names = BTreeSet::new();
        for row in rows {
            let (collection, key, raw) = row?;
            if names.contains(&collection) {
                continue;
            }
            if decode_object(&collection, &key, &raw).is_ok() {
                names.insert(collection);
            }
        }
        Ok(names.into_iter().collect())
    }

    fn get_schema(&self, collection: &str) -> StorageResult<Option<Schema>> {
        let conn = self.conn.lock();
        let raw: Option<String> = conn
            .query_row(
                "SELECT schema FROM schemas WHERE collection = ?1",
                [collection],
                |row| row.get(0),
            )
            .optional()?;
        raw.map(|raw| decode_object(collection, "$schema", &raw))
            .transpose()
    }

    fn put_schema(&self, collection: &str, schema: &Schema) -> StorageResult<()> {
        debug!("sqlite put_schema {}", collection);
        let data = serde_json::to_string(schema)?;
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO schemas (collection, schema) VALUES (?1, ?2)
             ON CONFLICT(collection) DO UPDATE SET schema = excluded.schema",
            params![collection, data],
        )?;
        Ok(())
    }

    fn delete_schema(&self, collection: &str) -> StorageResult<bool> {
        debug!("sqlite delete_schema {}", collection);
        let conn = self.conn.lock();
        let removed = conn.execute("DELETE FROM schemas WHERE collection = ?1", [collection])?;
        Ok(removed > 0)
    }

    fn list_schemas(&self) -> StorageResult<SchemaRegistry> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT collection, schema FROM schemas")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut schemas = SchemaRegistry::new();
        for row in rows {
            let (collection, raw) = row?;
            match decode_object(&collection, "$schema", &raw) {
                Ok(schema) => {
                    schemas.insert(collection, schema);
                }
                Err(e) => warn!("Skipping schema: {}", e),
            }
        }
        Ok(schemas)
    }
}
