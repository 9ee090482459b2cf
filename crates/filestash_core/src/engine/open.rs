//! Open requests and the version-change step.

use crate::engine::connection::Connection;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::factory::Factory;
use crate::engine::schema::{Schema, StoreParams};
use crate::engine::shared::DbShared;
use std::sync::Arc;
use tracing::{debug, warn};

/// Something an [`OpenRequest`] reports.
///
/// A request yields zero or more `Blocked`, at most one `UpgradeNeeded`, and
/// then exactly one `Success` or `Error`.
#[derive(Debug)]
pub enum OpenEvent {
    /// Connections to an older version are still open, or another request
    /// is running a version change.
    Blocked {
        /// Version those connections use.
        old_version: u32,
        /// Version the request asks for.
        new_version: u32,
    },
    /// The database must be created or upgraded.
    ///
    /// Change the schema through [`OpenRequest::upgrade`], then ask for the
    /// next event to commit it.
    UpgradeNeeded {
        /// Current version, 0 for a database that does not exist yet.
        old_version: u32,
        /// Version being upgraded to.
        new_version: u32,
    },
    /// The database is open at the requested version.
    Success(Connection),
    /// The open failed.
    Error(EngineError),
}

/// Schema changes staged during an upgrade.
#[derive(Debug)]
pub struct VersionChange {
    old_version: u32,
    schema: Schema,
}

impl VersionChange {
    /// Version before the upgrade.
    #[must_use]
    pub fn old_version(&self) -> u32 {
        self.old_version
    }

    /// Version after the upgrade.
    #[must_use]
    pub fn new_version(&self) -> u32 {
        self.schema.version
    }

    /// Names of the stores the database will have, including staged ones.
    #[must_use]
    pub fn object_store_names(&self) -> Vec<String> {
        self.schema.stores.keys().cloned().collect()
    }

    /// Whether `name` exists or was staged.
    #[must_use]
    pub fn contains_object_store(&self, name: &str) -> bool {
        self.schema.stores.contains_key(name)
    }

    /// Stages a new object store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Constraint`] if the store already exists and
    /// [`EngineError::InvalidArgument`] for names or key paths the schema
    /// file cannot hold.
    pub fn create_object_store(&mut self, name: &str, params: StoreParams) -> EngineResult<()> {
        if self.schema.stores.contains_key(name) {
            return Err(EngineError::Constraint(format!(
                "object store {name} already exists"
            )));
        }
        let too_long = |s: &str| s.len() > u16::MAX as usize;
        if too_long(name) || params.key_path.as_deref().is_some_and(too_long) {
            return Err(EngineError::InvalidArgument(
                "object store name or key path too long".into(),
            ));
        }

        debug!(store = name, ?params, "creating object store");
        self.schema.stores.insert(name.to_owned(), params);
        Ok(())
    }
}

enum Phase {
    Pending,
    Upgrading {
        shared: Arc<DbShared>,
        change: VersionChange,
    },
    Settled,
}

/// A pending open of a named, versioned database.
///
/// Created by [`Factory::open`]; drive it with [`OpenRequest::next_event`].
/// Dropping a request mid-upgrade abandons the upgrade.
pub struct OpenRequest<'f> {
    factory: &'f Factory,
    name: String,
    version: u32,
    phase: Phase,
}

impl<'f> OpenRequest<'f> {
    pub(crate) fn new(factory: &'f Factory, name: &str, version: u32) -> Self {
        Self {
            factory,
            name: name.to_owned(),
            version,
            phase: Phase::Pending,
        }
    }

    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requested version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version
    }

    /// The staged schema while an upgrade is in progress.
    pub fn upgrade(&mut self) -> Option<&mut VersionChange> {
        match &mut self.phase {
            Phase::Upgrading { change, .. } => Some(change),
            _ => None,
        }
    }

    /// Abandons the request. An in-progress upgrade is discarded.
    pub fn abort(&mut self) {
        if let Phase::Upgrading { shared, .. } = std::mem::replace(&mut self.phase, Phase::Settled) {
            warn!(db = %self.name, version = self.version, "upgrade aborted");
            shared.end_upgrade();
        }
    }

    /// Waits for the next event of the request.
    ///
    /// After a `Blocked` event the request may be polled again; it proceeds
    /// once the older connections are gone. After `Success` or `Error`,
    /// further calls return an [`EngineError::InvalidState`] error event.
    pub async fn next_event(&mut self) -> OpenEvent {
        match std::mem::replace(&mut self.phase, Phase::Settled) {
            Phase::Pending => self.start(),
            Phase::Upgrading { shared, change } => Self::finish_upgrade(shared, change),
            Phase::Settled => {
                OpenEvent::Error(EngineError::invalid_state("open request already settled"))
            }
        }
    }

    fn start(&mut self) -> OpenEvent {
        if self.version == 0 {
            return OpenEvent::Error(EngineError::InvalidArgument(
                "database version must be at least 1".into(),
            ));
        }
        let shared = match self.factory.acquire(&self.name) {
            Ok(shared) => shared,
            Err(err) => return OpenEvent::Error(err),
        };

        let mut state = shared.state.write();
        let existing = state.schema.version;
        if self.version < existing {
            return OpenEvent::Error(EngineError::Version {
                requested: self.version,
                existing,
            });
        }
        if state.upgrading {
            self.phase = Phase::Pending;
            return OpenEvent::Blocked {
                old_version: existing,
                new_version: self.version,
            };
        }
        if self.version == existing {
            // Counted before the state lock is released so a concurrent
            // upgrade sees this connection.
            let connection = Connection::new(Arc::clone(&shared));
            drop(state);
            return OpenEvent::Success(connection);
        }

        if shared.open_connections() > 0 {
            self.phase = Phase::Pending;
            return OpenEvent::Blocked {
                old_version: existing,
                new_version: self.version,
            };
        }

        state.upgrading = true;
        let mut schema = state.schema.clone();
        schema.version = self.version;
        drop(state);

        debug!(db = %self.name, old_version = existing, new_version = self.version, "upgrade needed");
        self.phase = Phase::Upgrading {
            shared,
            change: VersionChange {
                old_version: existing,
                schema,
            },
        };
        OpenEvent::UpgradeNeeded {
            old_version: existing,
            new_version: self.version,
        }
    }

    fn finish_upgrade(shared: Arc<DbShared>, change: VersionChange) -> OpenEvent {
        if shared.open_connections() > 0 {
            shared.end_upgrade();
            return OpenEvent::Error(EngineError::invalid_state(
                "a connection opened during the version change",
            ));
        }
        match shared.commit_schema(change.schema) {
            Ok(()) => OpenEvent::Success(Connection::new(shared)),
            Err(err) => OpenEvent::Error(err),
        }
    }
}

impl Drop for OpenRequest<'_> {
    fn drop(&mut self) {
        self.abort();
    }
}
