//! Database schema manifest.
//!
//! The schema records the database version and its object stores. It only
//! changes inside a version-change (upgrade) step and is rewritten whole.

use crate::engine::codec::{put_short_str, ByteReader};
use crate::engine::error::{EngineError, EngineResult};
use std::collections::BTreeMap;

/// Magic bytes for the schema file.
pub const SCHEMA_MAGIC: [u8; 4] = *b"FSSC";

/// Current schema file format.
pub const SCHEMA_FORMAT: u16 = 1;

/// Parameters an object store is created with.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoreParams {
    /// Property name the key is exposed under, if any.
    ///
    /// Kept in the schema as metadata. Values are opaque bytes, so the
    /// engine never reads or writes this property.
    pub key_path: Option<String>,
    /// Whether the store generates keys for values put without one.
    pub auto_increment: bool,
}

impl StoreParams {
    /// Parameters for a store with generated keys exposed under `key_path`.
    #[must_use]
    pub fn auto_increment(key_path: impl Into<String>) -> Self {
        Self {
            key_path: Some(key_path.into()),
            auto_increment: true,
        }
    }
}

/// Version and object stores of one database.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Database version. Zero means the database was never created.
    pub version: u32,
    /// Object stores by name.
    pub stores: BTreeMap<String, StoreParams>,
}

impl Schema {
    /// Encodes the schema.
    ///
    /// # Errors
    ///
    /// Fails if a store name or key path is longer than `u16::MAX` bytes.
    pub fn encode(&self) -> EngineResult<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&SCHEMA_MAGIC);
        buf.extend_from_slice(&SCHEMA_FORMAT.to_le_bytes());
        buf.extend_from_slice(&self.version.to_le_bytes());

        let count = u32::try_from(self.stores.len())
            .map_err(|_| EngineError::InvalidArgument("too many object stores".into()))?;
        buf.extend_from_slice(&count.to_le_bytes());

        for (name, params) in &self.stores {
            put_short_str(&mut buf, name)?;
            buf.push(u8::from(params.auto_increment));
            match &params.key_path {
                Some(path) => {
                    buf.push(1);
                    put_short_str(&mut buf, path)?;
                }
                None => buf.push(0),
            }
        }

        Ok(buf)
    }

    /// Decodes a schema written by [`Schema::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Corrupted`] for bad magic, a newer format, or
    /// truncated input.
    pub fn decode(data: &[u8]) -> EngineResult<Self> {
        let mut r = ByteReader::new(data, "schema");
        if r.take(4)? != SCHEMA_MAGIC {
            return Err(EngineError::corrupted("invalid schema magic"));
        }
        let format = r.u16()?;
        if format > SCHEMA_FORMAT {
            return Err(EngineError::corrupted(format!(
                "unsupported schema format: {format}"
            )));
        }

        let version = r.u32()?;
        let count = r.u32()?;
        let mut stores = BTreeMap::new();
        for _ in 0..count {
            let name = r.short_str()?;
            let auto_increment = r.u8()? != 0;
            let key_path = match r.u8()? {
                0 => None,
                _ => Some(r.short_str()?),
            };
            stores.insert(
                name,
                StoreParams {
                    key_path,
                    auto_increment,
                },
            );
        }

        Ok(Self { version, stores })
    }
}
