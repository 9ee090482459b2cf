//! Forward cursors over an object store.

use crate::engine::error::EngineResult;
use crate::engine::shared::StoreMap;
use crate::engine::transaction::Transaction;
use crate::engine::Key;
use std::fmt;
use std::ops::Bound;
use std::sync::Arc;

/// A forward cursor in ascending key order.
///
/// The cursor walks the view its transaction had when it was opened and is
/// only usable while that transaction is active.
pub struct Cursor<'t> {
    tx: &'t Transaction,
    view: Arc<StoreMap>,
    key: Key,
    value: Arc<[u8]>,
}

impl<'t> Cursor<'t> {
    pub(crate) fn first(tx: &'t Transaction, view: Arc<StoreMap>) -> Option<Self> {
        let (key, value) = view
            .iter()
            .next()
            .map(|(k, v)| (*k, Arc::clone(v)))?;
        Some(Self {
            tx,
            view,
            key,
            value,
        })
    }

    /// Key of the current entry.
    #[must_use]
    pub fn key(&self) -> Key {
        self.key
    }

    /// Value of the current entry.
    #[must_use]
    pub fn value(&self) -> &[u8] {
        &self.value
    }

    /// Moves to the next entry.
    ///
    /// Returns `false` once the end is reached; the cursor then keeps
    /// pointing at the last entry and should be dropped.
    ///
    /// # Errors
    ///
    /// Returns [`crate::engine::EngineError::TransactionInactive`] if the
    /// transaction is no longer active.
    pub async fn advance(&mut self) -> EngineResult<bool> {
        self.tx.ensure_active()?;
        let next = self
            .view
            .range((Bound::Excluded(self.key), Bound::Unbounded))
            .next()
            .map(|(k, v)| (*k, Arc::clone(v)));
        match next {
            Some((key, value)) => {
                self.key = key;
                self.value = value;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

impl fmt::Debug for Cursor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("txid", &self.tx.id())
            .field("key", &self.key)
            .field("value_len", &self.value.len())
            .finish()
    }
}
