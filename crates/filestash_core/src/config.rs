//! File store configuration.

use crate::engine::EngineOptions;

/// Default database name.
pub const DEFAULT_DB_NAME: &str = "localFileStorage";
/// Default record store name.
pub const DEFAULT_STORE_NAME: &str = "fileObjects";
/// Default key path of the record store.
pub const DEFAULT_KEY_PATH: &str = "ID";
/// Default schema version.
pub const DEFAULT_VERSION: u32 = 1;
/// Default origin the environment reports.
pub const DEFAULT_ORIGIN: &str = "https://localhost";

/// Configuration for a [`crate::StorageHandle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Name of the database.
    pub db_name: String,

    /// Name of the record store inside the database.
    pub store_name: String,

    /// Key path the record store is created with.
    ///
    /// Recorded in the schema only. Stored values never carry the key;
    /// listed records expose it as `Record::id`.
    pub key_path: String,

    /// Schema version to open.
    pub version: u32,

    /// Origin of the native environment, e.g. `https://localhost`.
    pub origin: String,

    /// Whether to sync the record log on every commit (safer but slower).
    pub sync_on_commit: bool,

    /// Largest record the engine accepts, in encoded bytes.
    pub max_value_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        let engine = EngineOptions::default();
        Self {
            db_name: DEFAULT_DB_NAME.to_owned(),
            store_name: DEFAULT_STORE_NAME.to_owned(),
            key_path: DEFAULT_KEY_PATH.to_owned(),
            version: DEFAULT_VERSION,
            origin: DEFAULT_ORIGIN.to_owned(),
            sync_on_commit: engine.sync_on_commit,
            max_value_size: engine.max_value_size,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the database name.
    #[must_use]
    pub fn db_name(mut self, name: impl Into<String>) -> Self {
        self.db_name = name.into();
        self
    }

    /// Sets the record store name.
    #[must_use]
    pub fn store_name(mut self, name: impl Into<String>) -> Self {
        self.store_name = name.into();
        self
    }

    /// Sets the key path of the record store.
    #[must_use]
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = path.into();
        self
    }

    /// Sets the schema version.
    #[must_use]
    pub const fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    /// Sets the origin of the native environment.
    #[must_use]
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Sets whether to sync on every commit.
    #[must_use]
    pub const fn sync_on_commit(mut self, value: bool) -> Self {
        self.sync_on_commit = value;
        self
    }

    /// Sets the largest accepted record size.
    #[must_use]
    pub const fn max_value_size(mut self, bytes: usize) -> Self {
        self.max_value_size = bytes;
        self
    }

    /// Engine options derived from this configuration.
    #[must_use]
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions::new()
            .sync_on_commit(self.sync_on_commit)
            .max_value_size(self.max_value_size)
    }
}
