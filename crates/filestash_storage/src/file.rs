//! File backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// A backend that keeps the log in one file.
///
/// `flush` hands buffered bytes to the OS, `sync` calls `sync_all` so the
/// log survives power loss.
///
/// ```no_run
/// use filestash_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut log = FileBackend::open(Path::new("records.log")).unwrap();
/// log.append(b"frame").unwrap();
/// log.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    inner: Mutex<Inner>,
}

#[derive(Debug)]
struct Inner {
    file: File,
    size: u64,
}

impl FileBackend {
    /// Opens the file at `path`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or its metadata read.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path: path.to_path_buf(),
            inner: Mutex::new(Inner { file, size }),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut inner = self.inner.lock();
        let size = inner.size;
        let end = offset.saturating_add(len as u64);
        if offset > size || end > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }
        if len == 0 {
            return Ok(Vec::new());
        }

        inner.file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; len];
        inner.file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        let inner = self.inner.get_mut();
        let offset = inner.size;
        if data.is_empty() {
            return Ok(offset);
        }

        inner.file.seek(SeekFrom::End(0))?;
        inner.file.write_all(data)?;
        inner.size += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.inner.lock().size)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.inner.get_mut().file.sync_all()?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let inner = self.inner.get_mut();
        if new_size > inner.size {
            return Err(StorageError::TruncateBeyondEnd {
                requested: new_size,
                size: inner.size,
            });
        }
        inner.file.set_len(new_size)?;
        inner.file.sync_all()?;
        inner.size = new_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn open_creates_empty_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");
        let log = FileBackend::open(&path).unwrap();
        assert_eq!(log.size().unwrap(), 0);
        assert!(path.exists());
        assert_eq!(log.path(), path);
    }

    #[test]
    fn appended_frames_survive_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");

        {
            let mut log = FileBackend::open(&path).unwrap();
            log.append(b"one").unwrap();
            log.append(b"two").unwrap();
            log.sync().unwrap();
        }

        let log = FileBackend::open(&path).unwrap();
        assert_eq!(log.size().unwrap(), 6);
        assert_eq!(log.read_at(3, 3).unwrap(), b"two");
    }

    #[test]
    fn read_past_end_fails() {
        let dir = tempdir().unwrap();
        let mut log = FileBackend::open(&dir.path().join("records.log")).unwrap();
        log.append(b"abc").unwrap();
        assert!(matches!(
            log.read_at(1, 5),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn empty_append_keeps_offset() {
        let dir = tempdir().unwrap();
        let mut log = FileBackend::open(&dir.path().join("records.log")).unwrap();
        log.append(b"x").unwrap();
        assert_eq!(log.append(b"").unwrap(), 1);
    }

    #[test]
    fn truncate_is_persisted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("records.log");
        {
            let mut log = FileBackend::open(&path).unwrap();
            log.append(b"completetorn").unwrap();
            log.truncate(8).unwrap();
            assert!(log.truncate(100).is_err());
        }
        let log = FileBackend::open(&path).unwrap();
        assert_eq!(log.size().unwrap(), 8);
        assert_eq!(log.read_at(0, 8).unwrap(), b"complete");
    }
}
