//! File-per-collection backend
//!
//! Layout:
//!
//! ```text
//! data_dir/
//!   _schemas.json   # schema registry, collection -> schema
//!   notes.json      # "notes" collection, key -> document
//!   %5Fprivate.json # "_private" collection
//!   %.json          # "" collection
//! ```
//!
//! Any string is a valid collection name. Names are percent-encoded into
//! file stems, so a stem never holds a path separator, never starts with
//! `_` or `.` and never collides with the schema registry.
//!
//! Every write reads the whole collection file, mutates it in memory and
//! rewrites the whole file (temp file + rename). A missing file is an
//! empty collection. So is a malformed one: the read logs a warning and
//! the next write replaces the damaged file, losing whatever it held.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::document::{Collection, Document, Schema, SchemaRegistry};

use super::backend::DocumentBackend;
use super::error::{StorageError, StorageResult};

/// Reserved file name of the schema registry
pub const SCHEMAS_FILE: &str = "_schemas.json";

/// Stem used for the empty collection name
const EMPTY_NAME_STEM: &str = "%";

/// Stores each collection as one JSON object file
#[derive(Debug)]
pub struct JsonFileBackend {
    dir: PathBuf,
    /// Guards every file in `dir`; held shared for reads, exclusive for writes
    lock: RwLock<()>,
}

impl JsonFileBackend {
    /// Open the store rooted at `dir`, creating the directory if needed
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir).map_err(|source| StorageError::CreateDirectory {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            lock: RwLock::new(()),
        })
    }

    /// Directory holding the collection files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a collection
    pub fn collection_path(&self, collection: &str) -> PathBuf {
        self.dir
            .join(format!("{}.json", encode_collection_name(collection)))
    }

    /// File holding the schema registry
    pub fn schemas_path(&self) -> PathBuf {
        self.dir.join(SCHEMAS_FILE)
    }

    /// Load a key -> object map, skipping entries that are not objects
    fn load_objects(&self, path: &Path) -> StorageResult<Collection> {
        Ok(load_file(path)?
            .into_iter()
            .filter_map(|(key, value)| match value {
                Value::Object(doc) => Some((key, doc)),
                _ => None,
            })
            .collect())
    }

    fn save_objects(&self, path: &Path, objects: &Collection) -> StorageResult<()> {
        let bytes = serde_json::to_vec_pretty(objects)?;
        atomic_write(path, &bytes)
    }
}

impl DocumentBackend for JsonFileBackend {
    fn get_all(&self, collection: &str) -> StorageResult<Collection> {
        let path = self.collection_path(collection);
        let _guard = self.lock.read();
        self.load_objects(&path)
    }

    fn get(&self, collection: &str, key: &str) -> StorageResult<Option<Document>> {
        let path = self.collection_path(collection);
        let _guard = self.lock.read();
        Ok(self.load_objects(&path)?.remove(key))
    }

    fn put(&self, collection: &str, key: &str, doc: &Document) -> StorageResult<()> {
        let path = self.collection_path(collection);
        debug!("file put {}/{}", collection, key);
        let _guard = self.lock.write();
        let mut docs = self.load_objects(&path)?;
        docs.insert(key.to_string(), doc.clone());
        self.save_objects(&path, &docs)
    }

    fn delete(&self, collection: &str, key: &str) -> StorageResult<bool> {
        let path = self.collection_path(collection);
        debug!("file delete {}/{}", collection, key);
        let _guard = self.lock.write();
        let mut docs = self.load_objects(&path)?;
        if docs.remove(key).is_none() {
            return Ok(false);
        }
        if docs.is_empty() {
            fs::remove_file(&path).map_err(|e| StorageError::from_io(e, path.clone()))?;
        } else {
            self.save_objects(&path, &docs)?;
        }
        Ok(true)
    }

    fn list_collections(&self) -> StorageResult<Vec<String>> {
        let _guard = self.lock.read();
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StorageError::from_read(e, self.dir.clone())),
        };

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StorageError::from_read(e, self.dir.clone()))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            let Some(name) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(decode_collection_name)
            else {
                continue;
            };
            // Emptied or unreadable files hold no documents.
            if !self.load_objects(&path)?.is_empty() {
                names.push(name);
            }
        }
        names.sort();
        Ok(names)
    }

    fn get_schema(&self, collection: &str) -> StorageResult<Option<Schema>> {
        let _guard = self.lock.read();
        Ok(self.load_objects(&self.schemas_path())?.remove(collection))
    }

    fn put_schema(&self, collection: &str, schema: &Schema) -> StorageResult<()> {
        debug!("file put_schema {}", collection);
        let path = self.schemas_path();
        let _guard = self.lock.write();
        let mut schemas = load_file(&path)?;
        schemas.insert(collection.to_string(), Value::Object(schema.clone()));
        let bytes = serde_json::to_vec_pretty(&schemas)?;
        atomic_write(&path, &bytes)
    }

    fn delete_schema(&self, collection: &str) -> StorageResult<bool> {
        debug!("file delete_schema {}", collection);
        let path = self.schemas_path();
        let _guard = self.lock.write();
        let mut schemas = load_file(&path)?;
        if schemas.remove(collection).is_none() {
            return Ok(false);
        }
        let bytes = serde_json::to_vec_pretty(&schemas)?;
        atomic_write(&path, &bytes)?;
        Ok(true)
    }

    fn list_schemas(&self) -> StorageResult<SchemaRegistry> {
        let _guard = self.lock.read();
        self.load_objects(&self.schemas_path())
    }
}

/// File stem for a collection name
///
/// ASCII letters, digits and `-` are kept, as are `_` and `.` after the
/// first byte. Every other byte becomes `%XX` (upper-case hex). The empty
/// name maps to a lone `%`, which no other name produces.
fn encode_collection_name(name: &str) -> String {
    if name.is_empty() {
        return EMPTY_NAME_STEM.to_string();
    }
    let mut stem = String::with_capacity(name.len());
    for (i, byte) in name.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'-'
            || (i > 0 && (byte == b'_' || byte == b'.'));
        if keep {
            stem.push(char::from(byte));
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

/// Collection name for a file stem, if the stem is one we would write
///
/// Stems that are not in canonical encoded form (the registry, temp or
/// hand-made files) are not collections.
fn decode_collection_name(stem: &str) -> Option<String> {
    if stem == EMPTY_NAME_STEM {
        return Some(String::new());
    }
    let bytes = stem.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = stem.get(i + 1..i + 3)?;
            decoded.push(u8::from_str_radix(hex, 16).ok()?);
            i += 3;
        } else {
            decoded.push(bytes[i]);
            i += 1;
        }
    }
    let name = String::from_utf8(decoded).ok()?;
    (encode_collection_name(&name) == stem).then_some(name)
}

/// Read a JSON object file
///
/// Missing and malformed files both come back as an empty object.
fn load_file(path: &Path) -> StorageResult<Map<String, Value>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Map::new()),
        Err(e) => return Err(StorageError::from_read(e, path.to_path_buf())),
    };

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            warn!("{:?} does not hold a JSON object, treating it as empty", path);
            Ok(Map::new())
        }
        Err(e) => {
            warn!("{:?} is malformed ({}), treating it as empty", path, e);
            Ok(Map::new())
        }
    }
}

/// Write data to a file atomically
///
/// 1. Write to a temporary file in the same directory
/// 2. Sync the file to disk
/// 3. Rename the temp file to the target path
fn atomic_write(path: &Path, data: &[u8]) -> StorageResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| StorageError::CreateDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let temp_path = path.with_extension("json.tmp");

    let mut file =
        File::create(&temp_path).map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.write_all(data)
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;
    file.sync_all()
        .map_err(|e| StorageError::from_io(e, temp_path.clone()))?;

    fs::rename(&temp_path, path).map_err(|source| StorageError::AtomicWriteFailed {
        from: temp_path.clone(),
        to: path.to_path_buf(),
        source,
    })?;

    Ok(())
}
