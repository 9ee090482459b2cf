//! The database factory.

use crate::engine::dir::{directory_name, DatabaseDir};
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::open::OpenRequest;
use crate::engine::shared::DbShared;
use filestash_storage::{FileBackend, InMemoryBackend};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

/// Tuning knobs of a [`Factory`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineOptions {
    /// Fsync the record log on every commit (safer but slower).
    pub sync_on_commit: bool,
    /// Largest value a single put accepts, in bytes.
    pub max_value_size: usize,
    /// Whether the factory offers [`Factory::delete_database`].
    pub delete_database: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            sync_on_commit: true,
            max_value_size: 64 * 1024 * 1024, // 64 MiB
            delete_database: true,
        }
    }
}

impl EngineOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether to fsync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the largest accepted value size.
    #[must_use]
    pub const fn max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = bytes;
        self
    }

    /// Enables or disables database deletion.
    #[must_use]
    pub const fn delete_database(mut self, value: bool) -> Self {
        self.delete_database = value;
        self
    }
}

#[derive(Debug, Clone)]
enum Location {
    Memory,
    Directory(PathBuf),
}

/// Entry point of the engine: opens and deletes named databases.
///
/// A factory keeps every database it has touched loaded, so connections
/// opened through the same factory share state. On disk, each database
/// lives in its own locked directory under the factory root.
///
/// ```rust
/// # futures::executor::block_on(async {
/// use filestash_core::engine::{Factory, OpenEvent};
///
/// let factory = Factory::in_memory();
/// let mut request = factory.open("scratch", 1);
/// assert!(matches!(request.next_event().await, OpenEvent::UpgradeNeeded { .. }));
/// assert!(matches!(request.next_event().await, OpenEvent::Success(_)));
/// # });
/// ```
pub struct Factory {
    location: Location,
    options: EngineOptions,
    databases: Mutex<HashMap<String, Arc<DbShared>>>,
}

impl Factory {
    /// A factory whose databases live in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_location(Location::Memory)
    }

    /// A factory storing databases under `root`.
    #[must_use]
    pub fn on_disk(root: impl Into<PathBuf>) -> Self {
        Self::with_location(Location::Directory(root.into()))
    }

    fn with_location(location: Location) -> Self {
        Self {
            location,
            options: EngineOptions::default(),
            databases: Mutex::new(HashMap::new()),
        }
    }

    /// Replaces the engine options.
    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Starts opening `name` at `version`.
    ///
    /// Nothing happens until the request is polled.
    #[must_use]
    pub fn open(&self, name: &str, version: u32) -> OpenRequest<'_> {
        OpenRequest::new(self, name, version)
    }

    /// Whether [`Factory::delete_database`] is available.
    #[must_use]
    pub fn supports_delete_database(&self) -> bool {
        self.options.delete_database
    }

    /// Destroys a database and everything in it.
    ///
    /// Deleting a database that does not exist succeeds.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Unsupported`] if the factory was built without it
    /// - [`EngineError::InvalidState`] while connections are open
    /// - I/O errors removing the directory
    pub async fn delete_database(&self, name: &str) -> EngineResult<()> {
        if !self.supports_delete_database() {
            return Err(EngineError::Unsupported("delete_database".into()));
        }

        let mut databases = self.databases.lock();
        if let Some(shared) = databases.get(name) {
            if shared.open_connections() > 0 {
                return Err(EngineError::invalid_state(format!(
                    "database {name} has open connections"
                )));
            }
        }
        // Releases the directory lock before removal.
        drop(databases.remove(name));

        if let Location::Directory(root) = &self.location {
            let path = root.join(directory_name(name));
            if path.exists() {
                std::fs::remove_dir_all(&path)?;
            }
        }
        info!(db = name, "database deleted");
        Ok(())
    }

    /// Returns the loaded state of `name`, loading it on first use.
    pub(crate) fn acquire(&self, name: &str) -> EngineResult<Arc<DbShared>> {
        let mut databases = self.databases.lock();
        if let Some(shared) = databases.get(name) {
            return Ok(Arc::clone(shared));
        }

        let shared = match &self.location {
            Location::Memory => DbShared::load(
                name,
                None,
                Box::new(InMemoryBackend::new()),
                self.options.clone(),
            )?,
            Location::Directory(root) => {
                let dir = DatabaseDir::open(&root.join(directory_name(name)))?;
                let backend = FileBackend::open(&dir.log_path())?;
                debug!(db = name, log = %backend.path().display(), "record log opened");
                DbShared::load(name, Some(dir), Box::new(backend), self.options.clone())?
            }
        };

        let shared = Arc::new(shared);
        databases.insert(name.to_owned(), Arc::clone(&shared));
        Ok(shared)
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("location", &self.location)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
