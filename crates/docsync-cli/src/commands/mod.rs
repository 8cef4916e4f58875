//! Command handlers

pub mod config;
pub mod document;
pub mod schema;
pub mod status;
pub mod sync;

use std::io::{self, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

use docsync_core::Document;

/// Read a JSON body from `file`, or from stdin when no file is given
pub fn read_json<T: DeserializeOwned>(file: Option<&Path>) -> Result<T> {
    let raw = match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            buf
        }
    };
    parse_json(&raw)
}

fn parse_json<T: DeserializeOwned>(raw: &str) -> Result<T> {
    serde_json::from_str(raw).context("Invalid JSON")
}

/// Read a JSON object (a document or a schema)
pub fn read_object(file: Option<&Path>) -> Result<Document> {
    match read_json::<Value>(file)? {
        Value::Object(map) => Ok(map),
        other => bail!("Expected a JSON object, got: {}", other),
    }
}
