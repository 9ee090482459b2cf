//! Database connections.

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::StoreParams;
use crate::engine::shared::DbShared;
use crate::engine::transaction::{Transaction, TransactionMode};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An open connection to one database.
///
/// While any connection is open, requests for a higher version are blocked.
/// The connection closes on [`Connection::close`] or when dropped.
pub struct Connection {
    shared: Arc<DbShared>,
    closed: AtomicBool,
}

impl Connection {
    pub(crate) fn new(shared: Arc<DbShared>) -> Self {
        shared.connection_opened();
        Self {
            shared,
            closed: AtomicBool::new(false),
        }
    }

    /// Database name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.shared.name()
    }

    /// Database version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.shared.version()
    }

    /// Names of the object stores, sorted.
    #[must_use]
    pub fn object_store_names(&self) -> Vec<String> {
        self.shared.state.read().stores.keys().cloned().collect()
    }

    /// Parameters of the store `name`, if it exists.
    #[must_use]
    pub fn store_params(&self, name: &str) -> Option<StoreParams> {
        self.shared
            .state
            .read()
            .stores
            .get(name)
            .map(|data| data.params.clone())
    }

    /// Starts a transaction over the stores in `scope`.
    ///
    /// Reads inside the transaction see the committed state as of this call
    /// plus the transaction's own writes.
    ///
    /// # Errors
    ///
    /// - [`EngineError::InvalidState`] if the connection is closed
    /// - [`EngineError::InvalidArgument`] for an empty scope
    /// - [`EngineError::NotFound`] if a store does not exist
    pub fn transaction(&self, scope: &[&str], mode: TransactionMode) -> EngineResult<Transaction> {
        if self.is_closed() {
            return Err(EngineError::invalid_state("connection is closed"));
        }
        if scope.is_empty() {
            return Err(EngineError::InvalidArgument(
                "transaction scope is empty".into(),
            ));
        }

        let mut stores = Vec::with_capacity(scope.len());
        for &name in scope {
            let params = self
                .shared
                .state
                .read()
                .stores
                .get(name)
                .map(|data| data.params.clone())
                .ok_or_else(|| EngineError::NotFound(name.to_owned()))?;
            stores.push((name.to_owned(), params));
        }

        Ok(Transaction::new(Arc::clone(&self.shared), mode, stores))
    }

    /// Closes the connection. Idempotent.
    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            self.shared.connection_closed();
        }
    }

    /// Whether [`Connection::close`] was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.close();
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("name", &self.name())
            .field("version", &self.version())
            .field("closed", &self.is_closed())
            .finish()
    }
}
