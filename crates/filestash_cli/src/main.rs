//! filestash CLI
//!
//! Command-line access to a local file store.
//!
//! # Commands
//!
//! - `probe` - Check whether the environment can host the store
//! - `store` - Store files from disk as one batch
//! - `list` - List stored records

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Local durable file storage.
#[derive(Parser)]
#[command(name = "filestash")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the data directory
    #[arg(global = true, short, long)]
    path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check whether local file storage is supported
    Probe {
        /// Origin the store is served from
        #[arg(short, long, default_value = filestash_core::DEFAULT_ORIGIN)]
        origin: String,
    },

    /// Store files as one batch
    Store {
        /// Files to store
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Media type for every file (guessed from the extension if omitted)
        #[arg(short, long)]
        media_type: Option<String>,
    },

    /// List stored records
    List {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Probe { origin } => {
            commands::probe::run(cli.path.as_deref(), &origin)?;
        }
        Commands::Store { files, media_type } => {
            let path = cli.path.ok_or("Data path required for store")?;
            commands::store::run(&path, &files, media_type.as_deref()).await?;
        }
        Commands::List { format } => {
            let path = cli.path.ok_or("Data path required for list")?;
            commands::list::run(&path, &format).await?;
        }
        Commands::Version => {
            println!("filestash CLI v{}", env!("CARGO_PKG_VERSION"));
            println!("filestash core v{}", filestash_core::VERSION);
        }
    }

    Ok(())
}
