//! Status command handler

use anyhow::Result;

use docsync_core::{BackendKind, Config, SyncEngine};

use crate::output::{Output, OutputFormat};

/// Where the active backend keeps its data
fn data_location(config: &Config, kind: BackendKind) -> String {
    match kind {
        BackendKind::Json => config.data_dir.display().to_string(),
        BackendKind::Sqlite => config.sqlite_path().display().to_string(),
        BackendKind::Memory => "(in memory)".to_string(),
    }
}

/// Show status information
pub fn show(engine: &SyncEngine, config: &Config, output: &Output) -> Result<()> {
    let kind = engine.store().kind();
    let location = data_location(config, kind);

    let mut counts = Vec::new();
    for name in engine.list_collections()? {
        let count = engine.get_all(&name)?.len();
        counts.push((name, count));
    }
    let total: usize = counts.iter().map(|(_, count)| count).sum();
    let schema_count = engine.list_schemas()?.len();

    match output.format {
        OutputFormat::Json => {
            let collections: serde_json::Map<String, serde_json::Value> = counts
                .iter()
                .map(|(name, count)| (name.clone(), (*count).into()))
                .collect();
            println!(
                "{}",
                serde_json::json!({
                    "backend": kind.name(),
                    "location": location,
                    "collections": collections,
                    "documents": total,
                    "schemas": schema_count
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", kind);
        }
        OutputFormat::Human => {
            println!("docsync Status");
            println!("==============");
            println!();
            println!("Storage:");
            println!("  Backend:  {}", kind);
            println!("  Location: {}", location);
            println!();
            println!("Contents:");
            if counts.is_empty() {
                println!("  (no collections)");
            }
            for (name, count) in &counts {
                println!("  {}: {}", name, count);
            }
            println!("  Documents: {}", total);
            println!("  Schemas:   {}", schema_count);
        }
    }

    Ok(())
}
