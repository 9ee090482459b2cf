//! On-disk layout of one database.
//!
//! ```text
//! <root>/<database>/
//! ├─ LOCK          # Advisory lock, one process at a time
//! ├─ SCHEMA        # Version and object stores
//! └─ records.log   # Framed put/commit log
//! ```

use crate::engine::error::{EngineError, EngineResult};
use crate::engine::schema::Schema;
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOCK_FILE: &str = "LOCK";
const SCHEMA_FILE: &str = "SCHEMA";
const SCHEMA_TEMP: &str = "SCHEMA.tmp";
const LOG_FILE: &str = "records.log";

/// A locked database directory.
///
/// The lock is released when the value is dropped.
#[derive(Debug)]
pub(crate) struct DatabaseDir {
    path: PathBuf,
    _lock_file: File,
}

impl DatabaseDir {
    /// Opens (creating if needed) and locks the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Locked`] when another process holds the lock.
    pub(crate) fn open(path: &Path) -> EngineResult<Self> {
        fs::create_dir_all(path)?;
        if !path.is_dir() {
            return Err(EngineError::invalid_state(format!(
                "not a directory: {}",
                path.display()
            )));
        }

        let lock_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path.join(LOCK_FILE))?;
        if lock_file.try_lock_exclusive().is_err() {
            return Err(EngineError::Locked);
        }

        Ok(Self {
            path: path.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    pub(crate) fn log_path(&self) -> PathBuf {
        self.path.join(LOG_FILE)
    }

    fn schema_path(&self) -> PathBuf {
        self.path.join(SCHEMA_FILE)
    }

    /// Loads the schema, or `None` for a database that was never created.
    pub(crate) fn load_schema(&self) -> EngineResult<Option<Schema>> {
        let path = self.schema_path();
        if !path.exists() {
            return Ok(None);
        }
        let data = fs::read(&path)?;
        if data.is_empty() {
            return Ok(None);
        }
        Schema::decode(&data).map(Some)
    }

    /// Replaces the schema file atomically (write, sync, rename, sync dir).
    pub(crate) fn save_schema(&self, schema: &Schema) -> EngineResult<()> {
        let temp = self.path.join(SCHEMA_TEMP);
        let mut file = File::create(&temp)?;
        file.write_all(&schema.encode()?)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp, self.schema_path())?;
        self.sync_directory()
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> EngineResult<()> {
        File::open(&self.path)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> EngineResult<()> {
        // NTFS journals metadata; directories cannot be fsynced on Windows.
        Ok(())
    }
}

/// Maps a database name to a directory name.
///
/// Plain names are used as-is; anything that could escape the root or is
/// not portable is hex-encoded behind an `x-` prefix.
pub(crate) fn directory_name(db_name: &str) -> String {
    let plain = !db_name.is_empty()
        && !db_name.starts_with('.')
        && !db_name.starts_with("x-")
        && db_name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'));
    if plain {
        return db_name.to_owned();
    }

    let mut out = String::with_capacity(2 + db_name.len() * 2);
    out.push_str("x-");
    for b in db_name.bytes() {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
