//! Backend registry
//!
//! The one place that maps configuration names to backend constructors.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;
use tracing::info;

use crate::config::Config;

use super::backend::DocumentBackend;
use super::error::StorageResult;
use super::json_file::JsonFileBackend;
use super::memory::MemoryBackend;
use super::sqlite::SqliteBackend;

/// Selectable storage backends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// One JSON file per collection
    #[default]
    Json,
    /// Single SQLite database
    Sqlite,
    /// Process memory, lost on restart
    Memory,
}

/// Configuration names, including aliases. The first entry per kind is canonical.
const REGISTRY: &[(&str, BackendKind)] = &[
    ("json", BackendKind::Json),
    ("file", BackendKind::Json),
    ("", BackendKind::Json),
    ("sqlite", BackendKind::Sqlite),
    ("db", BackendKind::Sqlite),
    ("memory", BackendKind::Memory),
];

/// Configuration named a backend that does not exist
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown store backend: {name:?} (supported: json, sqlite, memory)")]
pub struct UnknownBackend {
    pub name: String,
}

impl BackendKind {
    /// Every backend, in registry order
    pub const ALL: [BackendKind; 3] = [BackendKind::Json, BackendKind::Sqlite, BackendKind::Memory];

    /// Canonical configuration name
    pub fn name(self) -> &'static str {
        REGISTRY
            .iter()
            .find(|(_, kind)| *kind == self)
            .map(|(name, _)| *name)
            .unwrap_or("json")
    }

    /// Construct the backend described by `config`
    pub fn open(self, config: &Config) -> StorageResult<Arc<dyn DocumentBackend>> {
        info!(
            "Opening {} store backend (data_dir={:?})",
            self.name(),
            config.data_dir
        );
        let backend: Arc<dyn DocumentBackend> = match self {
            BackendKind::Json => Arc::new(JsonFileBackend::open(&config.data_dir)?),
            BackendKind::Sqlite => Arc::new(SqliteBackend::open(&config.sqlite_path())?),
            BackendKind::Memory => Arc::new(MemoryBackend::new()),
        };
        Ok(backend)
    }
}

impl FromStr for BackendKind {
    type Err = UnknownBackend;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        REGISTRY
            .iter()
            .find(|(name, _)| *name == wanted)
            .map(|(_, kind)| *kind)
            .ok_or_else(|| UnknownBackend {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for BackendKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for BackendKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
