//! Full scans of the record store.

use crate::engine::{EngineResult, Transaction, TransactionMode};
use crate::error::{StashError, StashResult};
use crate::handle::Database;
use crate::record::{self, Record};
use tracing::debug;

impl Database {
    /// Returns every record in ascending id order.
    ///
    /// Reads a snapshot taken when the call starts; writes committing during
    /// the scan are not seen. An empty store yields an empty list.
    ///
    /// # Errors
    ///
    /// [`StashError::ReadFailure`] if the scan or decoding fails. No partial
    /// result is returned.
    pub async fn list_all(&self) -> StashResult<Vec<Record>> {
        let tx = self.read_transaction()?;
        let records = scan(&tx, &self.store_name)
            .await
            .map_err(StashError::ReadFailure)?;
        tx.commit().await.map_err(StashError::ReadFailure)?;
        debug!(count = records.len(), "records listed");
        Ok(records)
    }

    /// Whether the record store holds no records.
    ///
    /// # Errors
    ///
    /// As [`Database::list_all`].
    pub async fn is_empty(&self) -> StashResult<bool> {
        let tx = self.read_transaction()?;
        let empty = tx
            .object_store(&self.store_name)
            .map_err(StashError::ReadFailure)?
            .open_cursor()
            .await
            .map_err(StashError::ReadFailure)?
            .is_none();
        Ok(empty)
    }

    fn read_transaction(&self) -> StashResult<Transaction> {
        self.connection
            .transaction(&[self.store_name.as_str()], TransactionMode::ReadOnly)
            .map_err(StashError::ReadFailure)
    }
}

async fn scan(tx: &Transaction, store_name: &str) -> EngineResult<Vec<Record>> {
    let mut records = Vec::new();
    let Some(mut cursor) = tx.object_store(store_name)?.open_cursor().await? else {
        return Ok(records);
    };
    loop {
        records.push(record::decode(cursor.key(), cursor.value())?);
        if !cursor.advance().await? {
            break;
        }
    }
    Ok(records)
}
