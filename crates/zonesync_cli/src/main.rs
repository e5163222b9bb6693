//! zonesync CLI
//!
//! Drives a local record cache against a file-backed reference remote.
//!
//! # Commands
//!
//! - `init` - Provision the zone and subscription, then pull
//! - `pull` - Fetch pending changes
//! - `add` / `delete` - Mutate records through the remote
//! - `list` - Print cached names
//! - `status` - Show cursor, bootstrap flags and counts
//! - `remote-put` - Write as another device and deliver the push signal

mod commands;

use clap::{Parser, Subcommand};
use commands::Workspace;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use zonesync_engine::{SyncConfig, DEFAULT_SUBSCRIPTION, DEFAULT_ZONE};

/// zonesync command-line client.
#[derive(Parser)]
#[command(name = "zonesync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// State directory (local cache in `local/`, simulated remote in `remote/`)
    #[arg(global = true, short, long, default_value = ".zonesync")]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Remote zone to sync
    #[arg(global = true, long, default_value = DEFAULT_ZONE)]
    zone: String,

    /// Subscription identity for push signals
    #[arg(global = true, long, default_value = DEFAULT_SUBSCRIPTION)]
    subscription: String,

    /// Change-log entries per page served by the simulated remote
    #[arg(global = true, long, default_value = "100")]
    page_size: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision the zone and subscription if needed, then pull
    Init,

    /// Fetch and apply all pending changes
    Pull {
        /// Retry transient failures with backoff
        #[arg(short, long)]
        retry: bool,
    },

    /// Add a record with the given name
    Add {
        /// Display name
        name: String,
    },

    /// Delete a record by name
    Delete {
        /// Display name
        name: String,
    },

    /// List cached names
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show sync status
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Write a record as another device, then deliver the push signal
    RemotePut {
        /// Display name
        name: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = SyncConfig::new(cli.zone, cli.subscription);
    let workspace = Workspace::open(&cli.path, config, cli.page_size)?;

    let result = match cli.command {
        Commands::Init => commands::sync::init(&workspace),
        Commands::Pull { retry } => commands::sync::pull(&workspace, retry),
        Commands::Add { name } => commands::records::add(&workspace, &name),
        Commands::Delete { name } => commands::records::delete(&workspace, &name),
        Commands::List { format } => commands::records::list(&workspace, &format),
        Commands::Status { format } => commands::status::run(&workspace, &format),
        Commands::RemotePut { name } => commands::remote_put::run(&workspace, &name),
    };

    workspace.save_remote()?;
    result
}
