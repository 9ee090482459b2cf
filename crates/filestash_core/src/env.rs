//! The host environment the store runs in.
//!
//! An [`Environment`] is a small registry of named globals plus the scheme
//! of the origin it serves. The capability probe inspects it; the storage
//! handle takes its database factory from it.

use crate::engine::Factory;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Canonical global name of the database factory.
pub const CANONICAL_FACTORY: &str = "indexedDB";

/// Vendor-prefixed factory names, in lookup order.
pub const VENDOR_FACTORY_ALIASES: [&str; 2] = ["mozIndexedDB", "webkitIndexedDB"];

/// File API primitives the store needs.
pub const FILE_PRIMITIVES: [&str; 4] = ["File", "FileReader", "FileList", "Blob"];

/// A value bound to a global name.
#[derive(Clone)]
pub enum Global {
    /// A primitive that is only checked for presence.
    Primitive,
    /// A database factory.
    Factory(Arc<Factory>),
}

impl fmt::Debug for Global {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Primitive => f.write_str("Primitive"),
            Self::Factory(factory) => f.debug_tuple("Factory").field(factory).finish(),
        }
    }
}

/// Globals and origin of the host.
#[derive(Debug, Clone)]
pub struct Environment {
    scheme: String,
    globals: BTreeMap<String, Global>,
}

impl Environment {
    /// An empty environment serving `origin`.
    #[must_use]
    pub fn new(origin: &str) -> Self {
        Self {
            scheme: scheme_of(origin),
            globals: BTreeMap::new(),
        }
    }

    /// A complete environment: every file primitive plus `factory` under
    /// the canonical name.
    #[must_use]
    pub fn native(factory: Arc<Factory>, origin: &str) -> Self {
        let env = FILE_PRIMITIVES
            .iter()
            .fold(Self::new(origin), |env, name| env.with_primitive(name));
        env.with_factory(CANONICAL_FACTORY, factory)
    }

    /// Adds a presence-only global.
    #[must_use]
    pub fn with_primitive(mut self, name: &str) -> Self {
        self.globals.insert(name.to_owned(), Global::Primitive);
        self
    }

    /// Binds a factory to `name`.
    #[must_use]
    pub fn with_factory(mut self, name: &str, factory: Arc<Factory>) -> Self {
        self.set(name, Global::Factory(factory));
        self
    }

    /// Binds `value` to `name`, replacing what was there.
    pub fn set(&mut self, name: &str, value: Global) {
        self.globals.insert(name.to_owned(), value);
    }

    /// Removes a global, returning it.
    pub fn remove(&mut self, name: &str) -> Option<Global> {
        self.globals.remove(name)
    }

    /// Returns the global bound to `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Global> {
        self.globals.get(name)
    }

    /// Whether `name` is bound.
    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.globals.contains_key(name)
    }

    /// The factory under the canonical name, if it is one.
    #[must_use]
    pub fn factory(&self) -> Option<Arc<Factory>> {
        match self.globals.get(CANONICAL_FACTORY) {
            Some(Global::Factory(factory)) => Some(Arc::clone(factory)),
            _ => None,
        }
    }

    /// Scheme of the origin, lowercase and without the colon.
    #[must_use]
    pub fn scheme(&self) -> &str {
        &self.scheme
    }
}

fn scheme_of(origin: &str) -> String {
    origin
        .split_once(':')
        .map(|(scheme, _)| scheme.to_ascii_lowercase())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheme_is_parsed_from_origin() {
        assert_eq!(Environment::new("https://localhost").scheme(), "https");
        assert_eq!(Environment::new("HTTP://example.com").scheme(), "http");
        assert_eq!(Environment::new("ms-wwa://app").scheme(), "ms-wwa");
        assert_eq!(Environment::new("localhost").scheme(), "");
    }

    #[test]
    fn native_environment_is_complete() {
        let env = Environment::native(Arc::new(Factory::in_memory()), "https://localhost");
        for name in FILE_PRIMITIVES {
            assert!(env.has(name));
        }
        assert!(env.factory().is_some());
    }

    #[test]
    fn primitive_under_factory_name_is_not_a_factory() {
        let env = Environment::new("https://localhost").with_primitive(CANONICAL_FACTORY);
        assert!(env.has(CANONICAL_FACTORY));
        assert!(env.factory().is_none());
    }
}
