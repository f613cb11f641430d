//! `tomb rewrite` command implementation.

use anyhow::{Context, Result};
use std::fs;
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use tomb_core::TombConfig;
use tomb_rewrite::SoftDeleteRewriter;

/// Rewrite one statement, a file of statements, or stdin.
pub fn run(
    sql: Option<String>,
    file: Option<PathBuf>,
    config_path: Option<PathBuf>,
    tables: Vec<String>,
    json: bool,
) -> Result<()> {
    let rewriter = build_rewriter(config_path.as_deref(), tables)?;
    if rewriter.registry().is_empty() {
        tracing::warn!("no soft-delete tables configured, statements will pass through unchanged");
    }

    let statements = match (sql, file) {
        (Some(sql), _) => vec![sql],
        (None, Some(path)) => {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read SQL file: {:?}", path))?;
            split_statements(&content)
        }
        (None, None) => {
            let mut lines = Vec::new();
            for line in io::stdin().lock().lines() {
                lines.push(line.context("Failed to read stdin")?);
            }
            split_statements(&lines.join("\n"))
        }
    };

    for statement in &statements {
        let report = rewriter.rewrite(statement);
        if json {
            println!("{}", serde_json::to_string(&report)?);
        } else {
            println!("{}", report.rewritten_sql);
        }
    }

    Ok(())
}

/// Build a rewriter from an optional config file plus extra table names.
fn build_rewriter(config_path: Option<&Path>, tables: Vec<String>) -> Result<SoftDeleteRewriter> {
    let mut config = match config_path {
        Some(path) => TombConfig::load_with_context(path)
            .with_context(|| format!("Failed to load configuration from {:?}", path))?,
        None => TombConfig::default(),
    };

    config.soft_delete.merge_tables(tables);
    config.validate().context("Invalid soft-delete table name")?;

    tracing::debug!(
        tables = config.soft_delete.tables.len(),
        column = %config.soft_delete.column,
        "rewriter ready"
    );
    Ok(SoftDeleteRewriter::from_config(&config))
}

/// One statement per non-blank line.
fn split_statements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_split_statements_skips_blank_lines() {
        let statements = split_statements("SELECT 1\n\n  SELECT * FROM t  \n");
        assert_eq!(statements, vec!["SELECT 1", "SELECT * FROM t"]);
    }

    #[test]
    fn test_tables_from_flags_and_config_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tomb.yaml");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "soft_delete:\n  tables: [adm_clients]").unwrap();

        let rewriter = build_rewriter(Some(&path), vec!["con_assets".to_string()]).unwrap();
        assert_eq!(rewriter.registry().tables(), vec!["adm_clients", "con_assets"]);
    }

    #[test]
    fn test_flag_only_rewriter() {
        let rewriter = build_rewriter(None, vec!["adm_clients".to_string()]).unwrap();
        assert_eq!(
            rewriter.rewrite_query("SELECT * FROM adm_clients"),
            "SELECT * FROM adm_clients WHERE (adm_clients.deleted = 0 OR adm_clients.deleted IS NULL)"
        );
    }

    #[test]
    fn test_bad_table_flag_is_rejected() {
        assert!(build_rewriter(None, vec!["two words".to_string()]).is_err());
    }

    #[test]
    fn test_missing_config_is_an_error() {
        let err = build_rewriter(Some(Path::new("/nonexistent/tomb.yaml")), Vec::new())
            .unwrap_err();
        assert!(err.to_string().contains("Failed to load configuration"));
    }
}
