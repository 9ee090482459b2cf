//! Transactions and object store handles.

use crate::engine::cursor::Cursor;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::StoreParams;
use crate::engine::shared::{DbShared, PendingPut, StoreMap};
use crate::engine::Key;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionMode {
    /// Cursors only.
    ReadOnly,
    /// Cursors and puts.
    ReadWrite,
}

/// Lifecycle of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Accepting requests.
    Active,
    /// Writes are durable and visible.
    Committed,
    /// Writes were discarded.
    Aborted,
}

struct Inner {
    state: TransactionState,
    writes: Vec<PendingPut>,
}

struct ScopedStore {
    params: StoreParams,
    snapshot: Arc<StoreMap>,
}

/// A unit of work over a fixed set of object stores.
///
/// Writes are staged and reach the log only on [`Transaction::commit`].
/// A failed put aborts the whole transaction. Dropping an active
/// transaction aborts it.
pub struct Transaction {
    shared: Arc<DbShared>,
    id: u64,
    mode: TransactionMode,
    scope: BTreeMap<String, ScopedStore>,
    inner: Mutex<Inner>,
}

impl Transaction {
    pub(crate) fn new(
        shared: Arc<DbShared>,
        mode: TransactionMode,
        stores: Vec<(String, StoreParams)>,
    ) -> Self {
        let id = shared.next_txid();
        let scope = stores
            .into_iter()
            .map(|(name, params)| {
                let snapshot = shared.snapshot(&name).unwrap_or_default();
                (name, ScopedStore { params, snapshot })
            })
            .collect();
        debug!(txid = id, ?mode, "transaction started");

        Self {
            shared,
            id,
            mode,
            scope,
            inner: Mutex::new(Inner {
                state: TransactionState::Active,
                writes: Vec::new(),
            }),
        }
    }

    /// Transaction id, unique within the database.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Access mode.
    #[must_use]
    pub fn mode(&self) -> TransactionMode {
        self.mode
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TransactionState {
        self.inner.lock().state
    }

    /// Returns a handle to a store in the transaction's scope.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotFound`] for a store outside the scope.
    pub fn object_store(&self, name: &str) -> EngineResult<ObjectStore<'_>> {
        let (name, scoped) = self
            .scope
            .get_key_value(name)
            .ok_or_else(|| EngineError::NotFound(name.to_owned()))?;
        Ok(ObjectStore {
            tx: self,
            name,
            params: &scoped.params,
        })
    }

    /// Makes the staged writes durable and visible.
    ///
    /// # Errors
    ///
    /// - [`EngineError::Aborted`] if a failed request already aborted it
    /// - [`EngineError::TransactionInactive`] if it was already committed
    /// - storage errors from writing the log, after which the transaction
    ///   is aborted and nothing of it is visible
    pub async fn commit(self) -> EngineResult<()> {
        let writes = {
            let mut inner = self.inner.lock();
            match inner.state {
                TransactionState::Active => {}
                TransactionState::Aborted => {
                    return Err(EngineError::Aborted(format!(
                        "transaction {} was aborted",
                        self.id
                    )))
                }
                TransactionState::Committed => {
                    return Err(EngineError::TransactionInactive(self.id))
                }
            }
            std::mem::take(&mut inner.writes)
        };

        let count = writes.len();
        // On-disk commits block on file I/O; keep that off the async workers.
        let committed = match tokio::runtime::Handle::try_current() {
            Ok(runtime) if self.shared.is_persistent() => {
                let shared = Arc::clone(&self.shared);
                let id = self.id;
                runtime
                    .spawn_blocking(move || shared.commit_writes(id, writes))
                    .await
                    .unwrap_or_else(|err| {
                        Err(EngineError::Aborted(format!("commit task failed: {err}")))
                    })
            }
            _ => self.shared.commit_writes(self.id, writes),
        };
        match committed {
            Ok(()) => {
                self.inner.lock().state = TransactionState::Committed;
                debug!(txid = self.id, writes = count, "transaction committed");
                Ok(())
            }
            Err(err) => {
                self.inner.lock().state = TransactionState::Aborted;
                warn!(txid = self.id, error = %err, "transaction aborted during commit");
                Err(err)
            }
        }
    }

    /// Discards the staged writes.
    pub fn abort(self) {
        self.abort_with("aborted by caller");
    }

    fn abort_with(&self, reason: &str) {
        let mut inner = self.inner.lock();
        if inner.state == TransactionState::Active {
            inner.state = TransactionState::Aborted;
            let dropped = std::mem::take(&mut inner.writes).len();
            warn!(txid = self.id, dropped, reason, "transaction aborted");
        }
    }

    pub(crate) fn ensure_active(&self) -> EngineResult<()> {
        match self.inner.lock().state {
            TransactionState::Active => Ok(()),
            _ => Err(EngineError::TransactionInactive(self.id)),
        }
    }
}

impl Drop for Transaction {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if inner.state == TransactionState::Active {
            if !inner.writes.is_empty() {
                debug!(txid = self.id, "transaction dropped without commit");
            }
            inner.state = TransactionState::Aborted;
            inner.writes.clear();
        }
    }
}

impl fmt::Debug for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("mode", &self.mode)
            .field("state", &self.state())
            .finish()
    }
}

/// An object store as seen through one transaction.
#[derive(Clone, Copy)]
pub struct ObjectStore<'t> {
    tx: &'t Transaction,
    name: &'t str,
    params: &'t StoreParams,
}

impl<'t> ObjectStore<'t> {
    /// Store name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name
    }

    /// Key path the store was created with.
    #[must_use]
    pub fn key_path(&self) -> Option<&str> {
        self.params.key_path.as_deref()
    }

    /// Whether the store generates keys.
    #[must_use]
    pub fn auto_increment(&self) -> bool {
        self.params.auto_increment
    }

    /// Stores `value`, replacing any value under the same key.
    ///
    /// Without `key` the store's generator assigns one. Returns the key.
    ///
    /// # Errors
    ///
    /// - [`EngineError::TransactionInactive`] once committed or aborted
    /// - [`EngineError::ReadOnly`] in a read-only transaction
    /// - [`EngineError::QuotaExceeded`] for values over the engine limit
    /// - [`EngineError::Data`] when no key is given and the store has no
    ///   generator
    ///
    /// Quota and key failures abort the transaction.
    pub async fn put(&self, value: Vec<u8>, key: Option<Key>) -> EngineResult<Key> {
        let tx = self.tx;
        tx.ensure_active()?;
        if tx.mode == TransactionMode::ReadOnly {
            return Err(EngineError::ReadOnly(tx.id));
        }

        let limit = tx.shared.options.max_value_size;
        if value.len() > limit {
            let err = EngineError::QuotaExceeded {
                size: value.len(),
                limit,
            };
            tx.abort_with("put exceeded value size limit");
            return Err(err);
        }

        let key = match tx.shared.allocate_key(self.name, key) {
            Ok(key) => key,
            Err(err) => {
                tx.abort_with("put could not be keyed");
                return Err(err);
            }
        };

        let mut inner = tx.inner.lock();
        if inner.state != TransactionState::Active {
            return Err(EngineError::TransactionInactive(tx.id));
        }
        inner.writes.push(PendingPut {
            store: self.name.to_owned(),
            key,
            value: Arc::from(value),
        });
        Ok(key)
    }

    /// Opens a cursor positioned on the lowest key.
    ///
    /// Returns `None` when the store is empty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::TransactionInactive`] once the transaction
    /// committed or aborted.
    pub async fn open_cursor(&self) -> EngineResult<Option<Cursor<'t>>> {
        let tx = self.tx;
        tx.ensure_active()?;
        let snapshot = Arc::clone(&tx.scope[self.name].snapshot);

        let view = {
            let inner = tx.inner.lock();
            let own: Vec<&PendingPut> = inner
                .writes
                .iter()
                .filter(|w| w.store == self.name)
                .collect();
            if own.is_empty() {
                snapshot
            } else {
                let mut merged = (*snapshot).clone();
                for w in own {
                    merged.insert(w.key, Arc::clone(&w.value));
                }
                Arc::new(merged)
            }
        };

        Ok(Cursor::first(tx, view))
    }
}
