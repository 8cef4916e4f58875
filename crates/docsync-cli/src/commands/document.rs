//! Document command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use docsync_core::{SyncEngine, UpsertOutcome};

use crate::output::Output;

use super::read_object;

/// List collections that hold documents
pub fn collections(engine: &SyncEngine, output: &Output) -> Result<()> {
    let names = engine.list_collections()?;
    let mut counted = Vec::with_capacity(names.len());
    for name in names {
        let count = engine.get_all(&name)?.len();
        counted.push((name, count));
    }
    output.print_collections(&counted);
    Ok(())
}

/// List every document of a collection
pub fn items(engine: &SyncEngine, collection: String, output: &Output) -> Result<()> {
    let docs = engine.get_all(&collection)?;
    output.print_collection(&docs);
    Ok(())
}

/// Show a single document
pub fn get(engine: &SyncEngine, collection: String, key: String, output: &Output) -> Result<()> {
    let Some(doc) = engine.get(&collection, &key)? else {
        bail!("Not found: {}/{}", collection, key);
    };
    output.print_document(&key, &doc);
    Ok(())
}

/// Write a document, keeping the stored copy if it is at least as new
pub fn put(
    engine: &SyncEngine,
    collection: String,
    key: String,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let doc = read_object(file.as_deref())?;

    match engine
        .upsert(&collection, &key, doc)
        .with_context(|| format!("Failed to store {}/{}", collection, key))?
    {
        UpsertOutcome::Stored(doc) => {
            output.success(&format!("Stored {}/{}", collection, key));
            if !output.is_quiet() {
                output.print_document(&key, &doc);
            }
        }
        UpsertOutcome::Kept(existing) => {
            output.message(&format!(
                "Stored copy of {}/{} is newer, keeping it",
                collection, key
            ));
            output.print_document(&key, &existing);
        }
    }
    Ok(())
}

/// Delete a document
pub fn delete(engine: &SyncEngine, collection: String, key: String, output: &Output) -> Result<()> {
    if engine.delete(&collection, &key)? {
        output.success(&format!("Deleted {}/{}", collection, key));
    } else {
        output.message(&format!("Nothing to delete at {}/{}", collection, key));
    }
    Ok(())
}

/// List documents modified after a timestamp
pub fn since(
    engine: &SyncEngine,
    collection: String,
    timestamp: String,
    output: &Output,
) -> Result<()> {
    let docs = engine.items_since(&collection, &timestamp)?;
    output.print_documents(&docs);
    Ok(())
}
