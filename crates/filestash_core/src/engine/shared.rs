//! In-process state of one database, shared by its connections.

use crate::engine::dir::DatabaseDir;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::log::{LogFrame, RecordLog};
use crate::engine::schema::{Schema, StoreParams};
use crate::engine::{EngineOptions, Key};
use filestash_storage::StorageBackend;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Committed values of one store, ordered by key.
pub(crate) type StoreMap = BTreeMap<Key, Arc<[u8]>>;

pub(crate) struct StoreData {
    pub params: StoreParams,
    /// Next generated key. Only ever grows.
    pub next_key: Key,
    /// Copy-on-write so read transactions can hold a snapshot.
    pub records: Arc<StoreMap>,
}

impl StoreData {
    fn new(params: StoreParams) -> Self {
        Self {
            params,
            next_key: 1,
            records: Arc::new(StoreMap::new()),
        }
    }
}

pub(crate) struct DbState {
    pub schema: Schema,
    pub stores: BTreeMap<String, StoreData>,
    /// Set while an open request holds the version-change step.
    pub upgrading: bool,
}

/// A write staged by a read-write transaction.
pub(crate) struct PendingPut {
    pub store: String,
    pub key: Key,
    pub value: Arc<[u8]>,
}

pub(crate) struct DbShared {
    name: String,
    pub state: RwLock<DbState>,
    log: Mutex<RecordLog>,
    dir: Option<DatabaseDir>,
    connections: AtomicUsize,
    next_txid: AtomicU64,
    pub options: EngineOptions,
}

impl DbShared {
    /// Loads schema and replays the record log.
    pub(crate) fn load(
        name: &str,
        dir: Option<DatabaseDir>,
        backend: Box<dyn StorageBackend>,
        options: EngineOptions,
    ) -> EngineResult<Self> {
        let schema = match &dir {
            Some(dir) => dir.load_schema()?.unwrap_or_default(),
            None => Schema::default(),
        };
        let mut stores: BTreeMap<String, StoreData> = schema
            .stores
            .iter()
            .map(|(name, params)| (name.clone(), StoreData::new(params.clone())))
            .collect();

        let mut log = RecordLog::new(backend, options.sync_on_commit);
        let frames = log.replay()?;

        let mut staged: HashMap<u64, Vec<(String, Key, Vec<u8>)>> = HashMap::new();
        let mut max_txid = 0u64;
        let mut applied = 0usize;
        for frame in frames {
            match frame {
                LogFrame::Put {
                    txid,
                    store,
                    key,
                    value,
                } => {
                    max_txid = max_txid.max(txid);
                    staged.entry(txid).or_default().push((store, key, value));
                }
                LogFrame::Commit { txid } => {
                    max_txid = max_txid.max(txid);
                    for (store, key, value) in staged.remove(&txid).unwrap_or_default() {
                        let Some(data) = stores.get_mut(&store) else {
                            warn!(db = name, store = %store, "log entry for unknown object store");
                            continue;
                        };
                        data.next_key = data.next_key.max(key.saturating_add(1));
                        Arc::make_mut(&mut data.records).insert(key, Arc::from(value));
                        applied += 1;
                    }
                }
            }
        }
        if !staged.is_empty() {
            debug!(
                db = name,
                transactions = staged.len(),
                "discarding uncommitted log entries"
            );
        }
        debug!(db = name, version = schema.version, applied, "database loaded");

        Ok(Self {
            name: name.to_owned(),
            state: RwLock::new(DbState {
                schema,
                stores,
                upgrading: false,
            }),
            log: Mutex::new(log),
            dir,
            connections: AtomicUsize::new(0),
            next_txid: AtomicU64::new(max_txid + 1),
            options,
        })
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn version(&self) -> u32 {
        self.state.read().schema.version
    }

    pub(crate) fn open_connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub(crate) fn connection_opened(&self) {
        self.connections.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn connection_closed(&self) {
        self.connections.fetch_sub(1, Ordering::SeqCst);
    }

    pub(crate) fn next_txid(&self) -> u64 {
        self.next_txid.fetch_add(1, Ordering::SeqCst)
    }

    /// Releases the version-change step without applying it.
    pub(crate) fn end_upgrade(&self) {
        self.state.write().upgrading = false;
    }

    /// Persists `schema` and makes it current, ending the version change.
    pub(crate) fn commit_schema(&self, schema: Schema) -> EngineResult<()> {
        let mut state = self.state.write();
        state.upgrading = false;
        if let Some(dir) = &self.dir {
            dir.save_schema(&schema)?;
        }

        for (name, params) in &schema.stores {
            state
                .stores
                .entry(name.clone())
                .or_insert_with(|| StoreData::new(params.clone()));
        }
        state.schema = schema;
        Ok(())
    }

    /// Returns the committed contents of `store`.
    pub(crate) fn snapshot(&self, store: &str) -> Option<Arc<StoreMap>> {
        self.state
            .read()
            .stores
            .get(store)
            .map(|data| Arc::clone(&data.records))
    }

    /// Hands out the key a put will be stored under.
    ///
    /// Generated keys are taken from the store's generator and never handed
    /// out twice. An explicit key at or above the generator pushes it past.
    pub(crate) fn allocate_key(&self, store: &str, explicit: Option<Key>) -> EngineResult<Key> {
        let mut state = self.state.write();
        let data = state
            .stores
            .get_mut(store)
            .ok_or_else(|| EngineError::NotFound(store.to_owned()))?;

        match explicit {
            Some(key) => {
                if data.params.auto_increment && key >= data.next_key {
                    data.next_key = key.saturating_add(1);
                }
                Ok(key)
            }
            None if data.params.auto_increment => {
                let key = data.next_key;
                data.next_key = key
                    .checked_add(1)
                    .ok_or_else(|| EngineError::Constraint("key generator exhausted".into()))?;
                Ok(key)
            }
            None => Err(EngineError::Data(format!(
                "object store {store} has no key generator and no key was given"
            ))),
        }
    }

    /// Whether the database lives in a directory rather than in memory.
    pub(crate) fn is_persistent(&self) -> bool {
        self.dir.is_some()
    }

    /// Logs and applies the writes of transaction `txid`.
    ///
    /// Blocks for the log append and, with `sync_on_commit`, the fsync. The
    /// log lock is taken before the state lock and held until the writes are
    /// applied, so memory sees commits in log order while snapshots and
    /// opens proceed during the sync.
    pub(crate) fn commit_writes(&self, txid: u64, writes: Vec<PendingPut>) -> EngineResult<()> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut frames: Vec<LogFrame> = writes
            .iter()
            .map(|w| LogFrame::Put {
                txid,
                store: w.store.clone(),
                key: w.key,
                value: w.value.to_vec(),
            })
            .collect();
        frames.push(LogFrame::Commit { txid });

        let mut log = self.log.lock();
        log.append_all(&frames)?;

        let mut state = self.state.write();
        for write in writes {
            if let Some(data) = state.stores.get_mut(&write.store) {
                Arc::make_mut(&mut data.records).insert(write.key, write.value);
            }
        }
        Ok(())
    }
}
