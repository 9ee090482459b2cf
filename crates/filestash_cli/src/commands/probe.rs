//! Probe command implementation.

use filestash_core::{probe, Environment, Factory};
use std::path::Path;
use std::sync::Arc;

/// Runs the probe command.
///
/// Without a data path the probe runs against an in-memory factory.
pub fn run(path: Option<&Path>, origin: &str) -> Result<(), Box<dyn std::error::Error>> {
    let factory = match path {
        Some(path) => Factory::on_disk(path),
        None => Factory::in_memory(),
    };
    let mut env = Environment::native(Arc::new(factory), origin);

    match probe::check(&mut env) {
        Ok(()) => println!("supported: local file storage is available for {origin}"),
        Err(failure) => println!("unsupported: {failure}"),
    }
    Ok(())
}
