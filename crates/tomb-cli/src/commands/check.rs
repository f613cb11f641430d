//! `tomb check` command implementation.
//!
//! Loads a configuration file (including any referenced tables file),
//! validates it and prints a summary.

use anyhow::{Context, Result};
use std::path::PathBuf;

use tomb_core::TombConfig;
use tomb_rewrite::SoftDeleteRewriter;

pub fn run(config_path: PathBuf) -> Result<()> {
    println!("🔍 Checking Tomb configuration {:?}...", config_path);

    let config = TombConfig::load_with_context(&config_path).with_context(|| {
        format!("❌ Configuration check failed for {:?}", config_path)
    })?;
    let rewriter = SoftDeleteRewriter::from_config(&config);
    let options = rewriter.options();

    println!();
    println!("  Flag column:   {}", options.column);
    println!("  Max depth:     {}", options.max_depth);
    println!("  Max joins:     {}", options.max_joins);
    println!("  Verify output: {}", options.verify_output);
    println!("  Tables ({}):", rewriter.registry().len());
    for table in rewriter.registry().tables() {
        println!("    - {table}");
    }
    println!();

    if rewriter.registry().is_empty() {
        println!("⚠️  No soft-delete tables configured; every statement will pass through.");
    } else {
        println!("✅ Configuration is valid.");
    }

    Ok(())
}
