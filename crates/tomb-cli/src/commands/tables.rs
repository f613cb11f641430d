//! `tomb tables` command implementation.

use anyhow::{Context, Result};
use std::path::PathBuf;

use tomb_core::TombConfig;
use tomb_rewrite::SoftDeleteRegistry;

/// Print the registered soft-delete tables, one per line.
pub fn run(config_path: PathBuf) -> Result<()> {
    let config = TombConfig::load_with_context(&config_path)
        .with_context(|| format!("Failed to load configuration from {:?}", config_path))?;

    let registry = SoftDeleteRegistry::from_config(&config.soft_delete);
    for table in registry.tables() {
        println!("{table}");
    }
    Ok(())
}
