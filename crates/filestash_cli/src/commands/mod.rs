//! CLI command implementations.

pub mod list;
pub mod probe;
pub mod store;

use filestash_core::{probe as capability, Config, Environment, Factory, ProbeFailure, StorageHandle};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// Failures specific to the CLI.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The environment cannot host the store.
    #[error("local file storage unsupported: {0}")]
    Unsupported(ProbeFailure),

    /// An input file could not be read.
    #[error("failed to read {path}: {source}")]
    ReadFile {
        /// File that failed.
        path: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Opens the file store under `root`, probing the environment first.
pub async fn open_store(root: &Path) -> Result<StorageHandle, Box<dyn std::error::Error>> {
    let config = Config::default();
    let factory = Factory::on_disk(root).with_options(config.engine_options());
    let mut env = Environment::native(Arc::new(factory), &config.origin);
    capability::check(&mut env).map_err(CommandError::Unsupported)?;

    let handle = StorageHandle::from_environment(&env, config)?;
    handle.open().await?;
    Ok(handle)
}
