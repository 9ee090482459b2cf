//! Lifecycle of the file database.

use crate::config::Config;
use crate::engine::{Connection, EngineError, Factory, OpenEvent, StoreParams};
use crate::env::Environment;
use crate::error::{StashError, StashResult};
use crate::record::{NewFile, Record};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

/// Where a [`StorageHandle`] is in opening its database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenState {
    /// `open` was never called, or the last attempt failed before starting.
    Unopened,
    /// An open request is in flight.
    Opening,
    /// The last attempt was blocked by another session.
    Blocked,
    /// The record store is being created.
    Upgrading,
    /// The database is open. Terminal.
    Open,
    /// The last attempt failed.
    Failed,
}

/// An open file database.
///
/// Obtained from [`StorageHandle::open`]. Writes go through
/// [`Database::store`], reads through [`Database::list_all`].
#[derive(Debug)]
pub struct Database {
    pub(crate) connection: Connection,
    pub(crate) store_name: String,
}

impl Database {
    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.connection.name()
    }

    /// Schema version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.connection.version()
    }

    /// Name of the record store.
    #[must_use]
    pub fn store_name(&self) -> &str {
        &self.store_name
    }

    /// Key path recorded for the record store.
    ///
    /// Informational: record ids come from the store's key generator and
    /// are reported as [`Record::id`], not written into stored values.
    #[must_use]
    pub fn key_path(&self) -> Option<String> {
        self.connection
            .store_params(&self.store_name)
            .and_then(|params| params.key_path)
    }
}

/// Owns one named, versioned database and its record store.
///
/// The database is opened once by [`StorageHandle::open`] and lives as long
/// as the handle. Concurrent callers of `open` share the same attempt.
#[derive(Debug)]
pub struct StorageHandle {
    factory: Arc<Factory>,
    config: Config,
    database: OnceCell<Database>,
    state: Mutex<OpenState>,
}

impl StorageHandle {
    /// A handle opening databases through `factory`.
    #[must_use]
    pub fn new(factory: Arc<Factory>, config: Config) -> Self {
        Self {
            factory,
            config,
            database: OnceCell::new(),
            state: Mutex::new(OpenState::Unopened),
        }
    }

    /// A handle using the factory installed in `env`.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::Unsupported`] if `env` has no factory under the
    /// canonical name. Run [`crate::probe::supported`] first to install a
    /// vendor alias.
    pub fn from_environment(env: &Environment, config: Config) -> StashResult<Self> {
        let factory = env.factory().ok_or(StashError::Unsupported)?;
        Ok(Self::new(factory, config))
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Current open state.
    #[must_use]
    pub fn state(&self) -> OpenState {
        *self.state.lock()
    }

    /// Opens the database, creating it and its record store if needed.
    ///
    /// Resolves immediately once open. After a failure the next call starts
    /// a fresh attempt.
    ///
    /// # Errors
    ///
    /// - [`StashError::OpenBlocked`] while another session holds an older
    ///   version open
    /// - [`StashError::UpgradeSchema`] if the record store cannot be created
    /// - [`StashError::OpenFailed`] for any other engine failure, including
    ///   a database at the configured version that lacks the record store
    pub async fn open(&self) -> StashResult<&Database> {
        self.database.get_or_try_init(|| self.open_database()).await
    }

    /// The database, if [`StorageHandle::open`] succeeded.
    ///
    /// # Errors
    ///
    /// Returns [`StashError::NotOpen`] before a successful open.
    pub fn database(&self) -> StashResult<&Database> {
        self.database.get().ok_or(StashError::NotOpen)
    }

    /// Stores `files` as one batch. See [`Database::store`].
    ///
    /// # Errors
    ///
    /// [`StashError::Validation`] for an empty batch, [`StashError::NotOpen`]
    /// before a successful open, otherwise as [`Database::store`].
    pub async fn store(&self, files: Vec<NewFile>) -> StashResult<()> {
        if files.is_empty() {
            return Err(StashError::Validation("no files to store".into()));
        }
        self.database()?.store(files).await
    }

    /// Lists every record. See [`Database::list_all`].
    ///
    /// # Errors
    ///
    /// [`StashError::NotOpen`] before a successful open, otherwise as
    /// [`Database::list_all`].
    pub async fn list_all(&self) -> StashResult<Vec<Record>> {
        self.database()?.list_all().await
    }

    fn set_state(&self, state: OpenState) {
        *self.state.lock() = state;
    }

    fn fail(&self, err: StashError) -> StashError {
        error!(db = %self.config.db_name, error = %err, "open failed");
        self.set_state(OpenState::Failed);
        err
    }

    async fn open_database(&self) -> StashResult<Database> {
        let Config {
            db_name,
            store_name,
            key_path,
            version,
            ..
        } = &self.config;

        debug!(db = %db_name, version, "opening database");
        self.set_state(OpenState::Opening);
        let mut request = self.factory.open(db_name, *version);

        loop {
            match request.next_event().await {
                OpenEvent::Blocked {
                    old_version,
                    new_version,
                } => {
                    warn!(db = %db_name, old_version, new_version, "open blocked by another session");
                    request.abort();
                    self.set_state(OpenState::Blocked);
                    return Err(StashError::OpenBlocked {
                        name: db_name.clone(),
                        old_version,
                        new_version,
                    });
                }
                OpenEvent::UpgradeNeeded {
                    old_version,
                    new_version,
                } => {
                    info!(db = %db_name, old_version, new_version, "upgrading database");
                    self.set_state(OpenState::Upgrading);
                    let Some(change) = request.upgrade() else {
                        continue;
                    };
                    if change.contains_object_store(store_name) {
                        continue;
                    }
                    if let Err(err) = change
                        .create_object_store(store_name, StoreParams::auto_increment(key_path))
                    {
                        request.abort();
                        return Err(self.fail(StashError::UpgradeSchema(err)));
                    }
                    debug!(store = %store_name, "record store created");
                }
                OpenEvent::Success(connection) => {
                    if !connection
                        .object_store_names()
                        .iter()
                        .any(|name| name == store_name)
                    {
                        let missing = EngineError::NotFound(store_name.clone());
                        return Err(self.fail(StashError::OpenFailed(missing)));
                    }
                    info!(db = %db_name, version = connection.version(), "database open");
                    self.set_state(OpenState::Open);
                    return Ok(Database {
                        connection,
                        store_name: store_name.clone(),
                    });
                }
                OpenEvent::Error(err) => return Err(self.fail(StashError::OpenFailed(err))),
            }
        }
    }
}
