//! Capability probe.
//!
//! Decides whether the environment can host the file store before any
//! database work starts. The checks run in order and the first unmet one
//! decides the outcome.

use crate::env::{Environment, Global, CANONICAL_FACTORY, FILE_PRIMITIVES, VENDOR_FACTORY_ALIASES};
use std::fmt;
use tracing::{debug, warn};

/// Schemes the store can be served from.
pub const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "ms-wwa-web", "ms-wwa"];

/// The first condition the environment failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeFailure {
    /// The origin's scheme cannot host a database.
    Scheme(String),
    /// A file API primitive is missing.
    MissingPrimitive(&'static str),
    /// No database factory under any known name.
    NoFactory,
    /// The factory cannot delete databases, which marks an outdated one.
    OutdatedFactory,
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scheme(scheme) => write!(
                f,
                "scheme {scheme:?} is not supported; serve over http or https"
            ),
            Self::MissingPrimitive(name) => write!(f, "file API primitive {name} is missing"),
            Self::NoFactory => f.write_str("no database factory is available"),
            Self::OutdatedFactory => {
                f.write_str("the database factory does not support deleting databases")
            }
        }
    }
}

/// Runs every check and reports the first failure.
///
/// When the factory only exists under a vendor alias, it is installed under
/// the canonical name as a side effect.
///
/// # Errors
///
/// Returns the first unmet condition.
pub fn check(env: &mut Environment) -> Result<(), ProbeFailure> {
    let scheme = env.scheme();
    if !SUPPORTED_SCHEMES.contains(&scheme) {
        return Err(ProbeFailure::Scheme(scheme.to_owned()));
    }

    if let Some(missing) = FILE_PRIMITIVES.iter().find(|name| !env.has(name)) {
        return Err(ProbeFailure::MissingPrimitive(*missing));
    }
    debug!("file API is supported");

    if !env.has(CANONICAL_FACTORY) {
        let alias = VENDOR_FACTORY_ALIASES
            .iter()
            .find_map(|alias| env.get(alias).cloned().map(|global| (*alias, global)));
        match alias {
            Some((alias, global)) => {
                debug!(alias, "installing vendor database factory");
                env.set(CANONICAL_FACTORY, global);
            }
            None => return Err(ProbeFailure::NoFactory),
        }
    }

    match env.get(CANONICAL_FACTORY) {
        Some(Global::Factory(factory)) if factory.supports_delete_database() => Ok(()),
        _ => Err(ProbeFailure::OutdatedFactory),
    }
}

/// Whether the environment supports the file store.
///
/// Never fails; the reason for a `false` is logged.
pub fn supported(env: &mut Environment) -> bool {
    match check(env) {
        Ok(()) => true,
        Err(failure) => {
            warn!(%failure, "local file storage unsupported");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{EngineOptions, Factory};
    use std::sync::Arc;

    fn factory() -> Arc<Factory> {
        Arc::new(Factory::in_memory())
    }

    fn complete() -> Environment {
        Environment::native(factory(), "https://localhost")
    }

    #[test]
    fn complete_environment_is_supported() {
        assert!(supported(&mut complete()));
    }

    #[test]
    fn every_supported_scheme_passes() {
        for origin in ["http://a", "https://a", "ms-wwa-web://a", "ms-wwa://a"] {
            let mut env = Environment::native(factory(), origin);
            assert_eq!(check(&mut env), Ok(()), "{origin}");
        }
    }

    #[test]
    fn file_scheme_fails_closed() {
        let mut env = Environment::native(factory(), "file:///index.html");
        assert_eq!(check(&mut env), Err(ProbeFailure::Scheme("file".into())));
        assert!(!supported(&mut env));
    }

    #[test]
    fn each_missing_primitive_fails() {
        for name in FILE_PRIMITIVES {
            let mut env = complete();
            env.remove(name);
            assert_eq!(check(&mut env), Err(ProbeFailure::MissingPrimitive(name)));
        }
    }

    #[test]
    fn missing_factory_fails() {
        let mut env = complete();
        env.remove(CANONICAL_FACTORY);
        assert_eq!(check(&mut env), Err(ProbeFailure::NoFactory));
    }

    #[test]
    fn vendor_alias_is_installed() {
        for alias in VENDOR_FACTORY_ALIASES {
            let mut env = complete();
            env.remove(CANONICAL_FACTORY);
            env.set(alias, Global::Factory(factory()));

            assert!(supported(&mut env));
            assert!(env.factory().is_some());
        }
    }

    #[test]
    fn moz_alias_wins_over_webkit() {
        let moz = factory();
        let mut env = complete();
        env.remove(CANONICAL_FACTORY);
        env.set("webkitIndexedDB", Global::Factory(factory()));
        env.set("mozIndexedDB", Global::Factory(Arc::clone(&moz)));

        check(&mut env).unwrap();
        assert!(Arc::ptr_eq(&env.factory().unwrap(), &moz));
    }

    #[test]
    fn factory_without_delete_is_outdated() {
        let old = Factory::in_memory().with_options(EngineOptions::new().delete_database(false));
        let mut env = Environment::native(Arc::new(old), "https://localhost");
        assert_eq!(check(&mut env), Err(ProbeFailure::OutdatedFactory));
    }

    #[test]
    fn non_factory_global_is_outdated() {
        let mut env = complete().with_primitive(CANONICAL_FACTORY);
        assert_eq!(check(&mut env), Err(ProbeFailure::OutdatedFactory));
    }
}
