pub mod classes;
pub mod compile;
pub mod render;

use crate::error::Result;
use lmpib::core::units::UnitRegistry;
use std::path::Path;
use tracing::info;

/// Builds the unit registry, extended with the definitions file when one is given.
fn unit_registry(definitions: Option<&Path>) -> Result<UnitRegistry> {
    let mut registry = UnitRegistry::new();
    if let Some(path) = definitions {
        let count = registry.load_definitions(path)?;
        info!("Loaded {} unit definitions from {:?}.", count, path);
    }
    Ok(registry)
}
