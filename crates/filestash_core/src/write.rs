//! Batch writes.

use crate::engine::TransactionMode;
use crate::error::{StashError, StashResult};
use crate::handle::Database;
use crate::record::{self, NewFile};
use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, info, warn};

impl Database {
    /// Stores `files` in one read-write transaction.
    ///
    /// Every file becomes its own record under a generated id. All records of
    /// a batch share one `last_modified` stamp taken at call time. The batch
    /// succeeds only if every record is written; otherwise the transaction is
    /// aborted and none of the batch becomes visible.
    ///
    /// # Errors
    ///
    /// - [`StashError::Validation`] for an empty batch
    /// - [`StashError::WriteFailure`] if a put or the commit failed
    pub async fn store(&self, files: Vec<NewFile>) -> StashResult<()> {
        if files.is_empty() {
            return Err(StashError::Validation("no files to store".into()));
        }

        let total = files.len();
        let failure = |failed: usize| {
            move |source| StashError::WriteFailure {
                failed,
                total,
                source,
            }
        };

        let tx = self
            .connection
            .transaction(&[self.store_name.as_str()], TransactionMode::ReadWrite)
            .map_err(failure(total))?;
        let store = tx.object_store(&self.store_name).map_err(failure(total))?;
        let last_modified = Utc::now().timestamp_millis();

        let puts = files.into_iter().map(|file| async move {
            let value = record::encode(file, last_modified)?;
            store.put(value, None).await
        });
        let results = join_all(puts).await;

        let mut failed = 0;
        let mut first_error = None;
        for result in results {
            match result {
                Ok(id) => debug!(id, "record staged"),
                Err(err) => {
                    failed += 1;
                    first_error.get_or_insert(err);
                }
            }
        }
        if let Some(source) = first_error {
            warn!(failed, total, error = %source, "batch rejected");
            tx.abort();
            return Err(StashError::WriteFailure {
                failed,
                total,
                source,
            });
        }

        tx.commit().await.map_err(failure(total))?;
        info!(count = total, "records stored");
        Ok(())
    }
}
