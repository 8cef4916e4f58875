//! docsync CLI
//!
//! Command-line interface for docsync - document collections, schemas and sync.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use docsync_core::{BackendKind, Config, Store, SyncEngine};

mod commands;
mod output;

use output::{Output, OutputFormat};

/// Environment variable holding the log filter
const LOG_ENV: &str = "DOCSYNC_LOG";

#[derive(Parser)]
#[command(name = "docsync")]
#[command(about = "docsync - JSON document store with schemas and last-write-wins sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Store backend to use (json, sqlite, memory), overriding the config
    #[arg(long, global = true)]
    backend: Option<BackendKind>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List collections that hold documents
    #[command(alias = "ls")]
    Collections,
    /// List every document of a collection
    Items {
        collection: String,
    },
    /// Show one document
    Get {
        collection: String,
        key: String,
    },
    /// Write a document (last write wins on updatedAt)
    Put {
        collection: String,
        key: String,
        /// Read the document from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Delete a document
    #[command(alias = "rm")]
    Delete {
        collection: String,
        key: String,
    },
    /// List documents modified after a timestamp
    Since {
        collection: String,
        timestamp: String,
    },
    /// Apply a sync request and print the response
    Sync {
        collection: String,
        /// Read the request from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Manage collection schemas
    Schema {
        #[command(subcommand)]
        command: SchemaCommands,
    },
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show backend, data location and collection counts
    Status,
}

#[derive(Subcommand)]
enum SchemaCommands {
    /// List registered schemas
    #[command(alias = "ls")]
    List,
    /// Show the schema of a collection
    Get { collection: String },
    /// Attach or replace the schema of a collection
    Put {
        collection: String,
        /// Read the schema from a file instead of stdin
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
    /// Remove the schema of a collection
    #[command(alias = "rm")]
    Delete { collection: String },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, store_backend)
        key: String,
        /// Configuration value
        value: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    // Config commands don't need the store
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), &output);
    }

    let mut config = Config::load().context("Failed to load configuration")?;
    if let Some(backend) = cli.backend {
        config.store_backend = backend;
    }
    debug!("Using {} backend at {:?}", config.store_backend, config.data_dir);

    let store = Store::open(&config)?;
    let engine = SyncEngine::new(store);

    match cli.command {
        Commands::Collections => commands::document::collections(&engine, &output),
        Commands::Items { collection } => commands::document::items(&engine, collection, &output),
        Commands::Get { collection, key } => {
            commands::document::get(&engine, collection, key, &output)
        }
        Commands::Put {
            collection,
            key,
            file,
        } => commands::document::put(&engine, collection, key, file, &output),
        Commands::Delete { collection, key } => {
            commands::document::delete(&engine, collection, key, &output)
        }
        Commands::Since {
            collection,
            timestamp,
        } => commands::document::since(&engine, collection, timestamp, &output),
        Commands::Sync { collection, file } => {
            commands::sync::sync(&engine, collection, file, &output)
        }
        Commands::Schema { command } => handle_schema_command(command, &engine, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => commands::status::show(&engine, &config, &output),
    }
}

fn handle_schema_command(
    command: SchemaCommands,
    engine: &SyncEngine,
    output: &Output,
) -> Result<()> {
    match command {
        SchemaCommands::List => commands::schema::list(engine, output),
        SchemaCommands::Get { collection } => commands::schema::get(engine, collection, output),
        SchemaCommands::Put { collection, file } => {
            commands::schema::put(engine, collection, file, output)
        }
        SchemaCommands::Delete { collection } => {
            commands::schema::delete(engine, collection, output)
        }
    }
}

fn handle_config_command(command: Option<ConfigCommands>, output: &Output) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(output),
        Some(ConfigCommands::Set { key, value }) => commands::config::set(key, value, output),
    }
}

/// Log to stderr when DOCSYNC_LOG is set
///
/// A bare level such as `debug` applies to both docsync crates; anything
/// else is passed through as a filter directive.
fn init_logging() {
    let Ok(filter) = std::env::var(LOG_ENV) else {
        return;
    };
    if filter.trim().is_empty() {
        return;
    }

    let env_filter = EnvFilter::new(filter_directives(&filter));

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_directives(filter: &str) -> String {
    let filter = filter.trim();
    if filter.contains('=') || filter.contains(',') {
        filter.to_string()
    } else {
        format!("docsync_core={},docsync={}", filter, filter)
    }
}
