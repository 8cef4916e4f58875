//! Schema command handlers

use std::path::PathBuf;

use anyhow::{bail, Result};

use docsync_core::SyncEngine;

use crate::output::Output;

use super::read_object;

pub fn list(engine: &SyncEngine, output: &Output) -> Result<()> {
    let schemas = engine.list_schemas()?;
    output.print_schemas(&schemas);
    Ok(())
}

pub fn get(engine: &SyncEngine, collection: String, output: &Output) -> Result<()> {
    let Some(schema) = engine.get_schema(&collection)? else {
        bail!("No schema registered for {}", collection);
    };
    output.print_schema(&collection, &schema);
    Ok(())
}

/// Attach a schema; documents already stored are not re-checked
pub fn put(
    engine: &SyncEngine,
    collection: String,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let schema = read_object(file.as_deref())?;
    engine.put_schema(&collection, &schema)?;
    output.success(&format!("Schema set for {}", collection));
    Ok(())
}

pub fn delete(engine: &SyncEngine, collection: String, output: &Output) -> Result<()> {
    if engine.delete_schema(&collection)? {
        output.success(&format!("Schema removed from {}", collection));
    } else {
        output.message(&format!("No schema registered for {}", collection));
    }
    Ok(())
}
