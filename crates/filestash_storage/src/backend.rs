//! The backend trait.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The engine writes its record log through this trait. A backend never
/// interprets the bytes it holds.
///
/// # Invariants
///
/// - `append` returns the offset the bytes landed at, which is the size
///   before the call
/// - `read_at` returns exactly what was appended at that offset
/// - after `sync` returns, everything appended so far survives a crash
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::ReadPastEnd`] when the range is not
    /// fully inside the store, or on I/O failure.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    ///
    /// # Errors
    ///
    /// Fails on I/O failure.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Fails on I/O failure.
    fn flush(&mut self) -> StorageResult<()>;

    /// Current size in bytes, which is also the next append offset.
    ///
    /// # Errors
    ///
    /// Fails when the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Makes all appended data and the store's metadata durable.
    ///
    /// # Errors
    ///
    /// Fails on I/O failure.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store down to `new_size` bytes.
    ///
    /// The engine uses this to drop a partially written frame left behind
    /// by a crash.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::TruncateBeyondEnd`] if `new_size`
    /// is larger than the current size, or on I/O failure.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
