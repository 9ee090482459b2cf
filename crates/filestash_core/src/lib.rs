//! # filestash core
//!
//! Local, durable storage of file-like records on top of an embedded,
//! transactional key-value engine.
//!
//! This crate provides:
//! - [`engine`]: named, versioned databases with object stores, transactions
//!   and cursors, persisted through a CRC-checked record log
//! - [`probe`]: checks that an [`Environment`] can host the store
//! - [`StorageHandle`]: opens the file database, creating its record store
//! - [`Database::store`] and [`Database::list_all`]: batch writes and full
//!   scans
//!
//! ```rust
//! # futures::executor::block_on(async {
//! use filestash_core::{probe, Config, Environment, Factory, NewFile, StorageHandle};
//! use std::sync::Arc;
//!
//! let mut env = Environment::native(Arc::new(Factory::in_memory()), "https://localhost");
//! assert!(probe::supported(&mut env));
//!
//! let handle = StorageHandle::from_environment(&env, Config::default())?;
//! let db = handle.open().await?;
//! db.store(vec![NewFile::new("notes.txt", b"hello".to_vec()).media_type("text/plain")])
//!     .await?;
//!
//! let records = db.list_all().await?;
//! assert_eq!(records[0].name, "notes.txt");
//! # Ok::<(), filestash_core::StashError>(())
//! # }).unwrap();
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
pub mod engine;
mod env;
mod error;
mod handle;
pub mod probe;
mod read;
mod record;
mod write;

pub use config::{
    Config, DEFAULT_DB_NAME, DEFAULT_KEY_PATH, DEFAULT_ORIGIN, DEFAULT_STORE_NAME, DEFAULT_VERSION,
};
pub use engine::{EngineError, EngineOptions, Factory};
pub use env::{Environment, Global, CANONICAL_FACTORY, FILE_PRIMITIVES, VENDOR_FACTORY_ALIASES};
pub use error::{StashError, StashResult};
pub use handle::{Database, OpenState, StorageHandle};
pub use probe::ProbeFailure;
pub use record::{NewFile, Record};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
