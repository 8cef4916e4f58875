//! Sync command handler

use std::path::PathBuf;

use anyhow::{Context, Result};

use docsync_core::{SyncEngine, SyncRequest};

use crate::output::Output;

use super::read_json;

/// Apply a sync request read from `file` (or stdin) and print the response
pub fn sync(
    engine: &SyncEngine,
    collection: String,
    file: Option<PathBuf>,
    output: &Output,
) -> Result<()> {
    let request: SyncRequest = read_json(file.as_deref())?;
    let response = engine
        .sync(&collection, &request)
        .with_context(|| format!("Failed to sync {}", collection))?;
    output.print_sync_response(&response);
    Ok(())
}
