//! Embedded transactional key-value engine.
//!
//! The engine hosts named, versioned databases. Each database holds object
//! stores mapping [`Key`]s to opaque byte values. Access goes through:
//!
//! - [`Factory`]: opens and deletes databases
//! - [`OpenRequest`]: reports `Blocked`, `UpgradeNeeded`, `Success` or `Error`
//! - [`Connection`]: starts [`Transaction`]s over a set of stores
//! - [`ObjectStore`]: puts values and opens [`Cursor`]s
//!
//! Committed writes go to an append-only, CRC-checked record log. The schema
//! lives next to it in its own file and is replaced atomically on upgrade.

mod codec;
mod connection;
mod cursor;
mod dir;
mod error;
mod factory;
mod log;
mod open;
mod schema;
mod shared;
#[cfg(test)]
pub(crate) mod testing;
mod transaction;

pub use connection::Connection;
pub use cursor::Cursor;
pub use error::{EngineError, EngineResult};
pub use factory::{EngineOptions, Factory};
pub use open::{OpenEvent, OpenRequest, VersionChange};
pub use schema::{Schema, StoreParams};
pub use transaction::{ObjectStore, Transaction, TransactionMode, TransactionState};

/// Primary key of a record in an object store.
pub type Key = u64;
