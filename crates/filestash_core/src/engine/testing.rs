//! Storage doubles for exercising failure paths.

use crate::engine::connection::Connection;
use crate::engine::log::{self, LogFrame};
use crate::engine::schema::{Schema, StoreParams};
use crate::engine::shared::DbShared;
use crate::engine::EngineOptions;
use filestash_storage::{InMemoryBackend, StorageBackend, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::io;
use std::sync::Arc;

/// How a [`FailingBackend`] misbehaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Fault {
    #[default]
    None,
    /// `append` writes the first half of its bytes, then errors.
    HalfAppend,
    /// `sync` errors.
    Sync,
}

/// In-memory backend that fails on demand. Clones share bytes and fault.
#[derive(Clone, Default)]
pub(crate) struct FailingBackend {
    inner: Arc<Mutex<InMemoryBackend>>,
    fault: Arc<Mutex<Fault>>,
}

impl FailingBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_with(&self, fault: Fault) {
        *self.fault.lock() = fault;
    }

    pub(crate) fn bytes(&self) -> Vec<u8> {
        self.inner.lock().data()
    }

    fn fault(&self) -> Fault {
        *self.fault.lock()
    }
}

fn injected(op: &str) -> StorageError {
    StorageError::Io(io::Error::other(format!("{op} failed")))
}

impl StorageBackend for FailingBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.lock().read_at(offset, len)
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        if self.fault() == Fault::HalfAppend {
            self.inner.lock().append(&bytes[..bytes.len() / 2])?;
            return Err(injected("append"));
        }
        self.inner.lock().append(bytes)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.lock().flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.lock().size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.fault() == Fault::Sync {
            return Err(injected("sync"));
        }
        self.inner.lock().sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.inner.lock().truncate(new_size)
    }
}

/// A connection to a version 1 database whose record log is `backend`,
/// holding one auto-increment store named `store`.
pub(crate) fn connection_with_store(backend: &FailingBackend, store: &str) -> Connection {
    let options = EngineOptions::new().sync_on_commit(true);
    let shared = DbShared::load("failing", None, Box::new(backend.clone()), options).unwrap();
    let mut schema = Schema {
        version: 1,
        ..Schema::default()
    };
    schema
        .stores
        .insert(store.to_owned(), StoreParams::auto_increment("ID"));
    shared.commit_schema(schema).unwrap();
    Connection::new(Arc::new(shared))
}

/// Number of puts in a log image whose transaction committed.
pub(crate) fn committed_puts(bytes: &[u8]) -> usize {
    let frames = log::parse(bytes).unwrap().frames;
    let committed: HashSet<u64> = frames
        .iter()
        .filter_map(|frame| match frame {
            LogFrame::Commit { txid } => Some(*txid),
            LogFrame::Put { .. } => None,
        })
        .collect();
    frames
        .iter()
        .filter(|frame| matches!(frame, LogFrame::Put { txid, .. } if committed.contains(txid)))
        .count()
}
