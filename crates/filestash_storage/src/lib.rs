//! # filestash storage
//!
//! Byte store backends underneath the filestash engine.
//!
//! Each database the engine manages keeps its record log in one backend.
//! Backends are **opaque**: they never look at the frames the engine writes,
//! they only read, append, flush and cut bytes.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral databases and tests
//! - [`FileBackend`] - a single file per database log
//!
//! ## Example
//!
//! ```rust
//! use filestash_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut log = InMemoryBackend::new();
//! let at = log.append(b"frame").unwrap();
//! assert_eq!(log.read_at(at, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
