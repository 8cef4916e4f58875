//! Output formatting for CLI
//!
//! Provides consistent output formatting across all commands:
//! - Human-readable default output
//! - JSON output (--json flag)
//! - Quiet mode for scripting (--quiet flag)

use serde::Serialize;
use serde_json::Value;

use docsync_core::document::{document_key, UPDATED_AT};
use docsync_core::{Collection, Document, Schema, SchemaRegistry, SyncResponse};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable output (default)
    Human,
    /// JSON output
    Json,
    /// Quiet mode - minimal output
    Quiet,
}

impl OutputFormat {
    /// Create format from CLI flags
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if quiet {
            OutputFormat::Quiet
        } else if json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        }
    }
}

/// Output helper for consistent formatting
pub struct Output {
    /// The output format
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Check if output is in quiet mode
    pub fn is_quiet(&self) -> bool {
        matches!(self.format, OutputFormat::Quiet)
    }

    /// Print a single document
    pub fn print_document(&self, key: &str, doc: &Document) {
        match self.format {
            OutputFormat::Human | OutputFormat::Json => print_json(doc),
            OutputFormat::Quiet => println!("{}", key),
        }
    }

    /// Print a whole collection, ordered by key
    pub fn print_collection(&self, docs: &Collection) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No items found.");
                    return;
                }
                for (key, doc) in docs {
                    print_summary_line(key, doc);
                }
                println!("\n{} item(s)", docs.len());
            }
            OutputFormat::Json => {
                let items: Vec<&Document> = docs.values().collect();
                print_json(&items);
            }
            OutputFormat::Quiet => {
                for key in docs.keys() {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print documents that are not keyed, such as a since-query result
    pub fn print_documents(&self, docs: &[Document]) {
        match self.format {
            OutputFormat::Human => {
                if docs.is_empty() {
                    println!("No items found.");
                    return;
                }
                for doc in docs {
                    print_summary_line(document_key(doc).unwrap_or("-"), doc);
                }
                println!("\n{} item(s)", docs.len());
            }
            OutputFormat::Json => print_json(&docs),
            OutputFormat::Quiet => {
                for key in docs.iter().filter_map(document_key) {
                    println!("{}", key);
                }
            }
        }
    }

    /// Print the result of a sync call
    pub fn print_sync_response(&self, response: &SyncResponse) {
        match self.format {
            OutputFormat::Human => {
                self.print_documents(&response.items);
                println!("Server time: {}", response.server_time);
            }
            OutputFormat::Json => print_json(response),
            OutputFormat::Quiet => println!("{}", response.server_time),
        }
    }

    /// Print a list of collection names with their document counts
    pub fn print_collections(&self, collections: &[(String, usize)]) {
        match self.format {
            OutputFormat::Human => {
                if collections.is_empty() {
                    println!("No collections found.");
                    return;
                }
                for (name, count) in collections {
                    println!("{} ({})", name, count);
                }
                println!("\n{} collection(s)", collections.len());
            }
            OutputFormat::Json => {
                let json_collections: Vec<_> = collections
                    .iter()
                    .map(|(name, count)| serde_json::json!({"name": name, "count": count}))
                    .collect();
                print_json(&json_collections);
            }
            OutputFormat::Quiet => {
                for (name, _) in collections {
                    println!("{}", name);
                }
            }
        }
    }

    /// Print one schema
    pub fn print_schema(&self, collection: &str, schema: &Schema) {
        match self.format {
            OutputFormat::Human | OutputFormat::Json => print_json(schema),
            OutputFormat::Quiet => println!("{}", collection),
        }
    }

    /// Print the schema registry
    pub fn print_schemas(&self, schemas: &SchemaRegistry) {
        match self.format {
            OutputFormat::Human => {
                if schemas.is_empty() {
                    println!("No schemas registered.");
                    return;
                }
                for (collection, schema) in schemas {
                    let kind = schema.get("type").and_then(Value::as_str).unwrap_or("any");
                    let required = schema
                        .get("required")
                        .and_then(Value::as_array)
                        .map(|fields| fields.len())
                        .unwrap_or(0);
                    println!("{} | type: {} | {} required field(s)", collection, kind, required);
                }
                println!("\n{} schema(s)", schemas.len());
            }
            OutputFormat::Json => print_json(schemas),
            OutputFormat::Quiet => {
                for collection in schemas.keys() {
                    println!("{}", collection);
                }
            }
        }
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        match self.format {
            OutputFormat::Human => println!("✓ {}", message),
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({"status": "success", "message": message})
                );
            }
            OutputFormat::Quiet => {}
        }
    }

    /// Print an informational message
    pub fn message(&self, msg: &str) {
        match self.format {
            OutputFormat::Human => println!("{}", msg),
            OutputFormat::Json => {
                println!("{}", serde_json::json!({"message": msg}));
            }
            OutputFormat::Quiet => {}
        }
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to encode output: {}", e),
    }
}

fn print_summary_line(key: &str, doc: &Document) {
    let updated = doc
        .get(UPDATED_AT)
        .and_then(Value::as_str)
        .unwrap_or("(no timestamp)");
    let preview = Value::Object(doc.clone()).to_string();
    println!("{} | {} | {}", truncate(key, 24), updated, truncate(&preview, 60));
}

/// Truncate a string to max length in characters, adding "..." if truncated
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
