//! Soft-delete table configuration.
//!
//! Lists the tables whose rows are never physically removed. Every such table
//! carries a flag column (default `deleted`); a row is live when the flag is
//! `0` or `NULL`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::ConfigError;

/// Configuration for soft-delete filtering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftDeleteConfig {
    /// Name of the flag column present on every soft-delete table.
    #[serde(default = "default_column")]
    pub column: String,

    /// Table names, matched exactly and case-sensitively.
    #[serde(default)]
    pub tables: Vec<String>,

    /// Optional YAML file holding an additional list of table names.
    #[serde(default)]
    pub tables_file: Option<PathBuf>,
}

impl Default for SoftDeleteConfig {
    fn default() -> Self {
        Self {
            column: default_column(),
            tables: Vec::new(),
            tables_file: None,
        }
    }
}

impl SoftDeleteConfig {
    /// Load a YAML list of table names from a file path relative to a base
    /// directory.
    ///
    /// If `tables_file` is absolute, it is used directly.
    pub fn load_tables_file(
        tables_file: impl AsRef<Path>,
        base_dir: impl AsRef<Path>,
    ) -> Result<Vec<String>, ConfigError> {
        let tables_file = tables_file.as_ref();
        let tables_path = if tables_file.is_absolute() {
            tables_file.to_path_buf()
        } else {
            base_dir.as_ref().join(tables_file)
        };

        if !tables_path.exists() {
            return Err(ConfigError::Config(format!(
                "Tables file not found: {}",
                tables_path.display()
            )));
        }

        let content = fs::read_to_string(&tables_path)?;
        serde_yaml::from_str(&content).map_err(ConfigError::from)
    }

    /// Append table names that are not already listed, keeping order.
    pub fn merge_tables(&mut self, extra: impl IntoIterator<Item = String>) {
        for table in extra {
            if !self.tables.contains(&table) {
                self.tables.push(table);
            }
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.column.is_empty() || !self.column.chars().all(is_identifier_char) {
            return Err(ConfigError::Config(format!(
                "soft_delete.column is not a plain identifier: {:?}",
                self.column
            )));
        }

        for table in &self.tables {
            if table.trim().is_empty() {
                return Err(ConfigError::Config(
                    "soft_delete.tables contains an empty name".to_string(),
                ));
            }
            if table.chars().any(char::is_whitespace) {
                return Err(ConfigError::Config(format!(
                    "soft_delete.tables entry contains whitespace: {table:?}"
                )));
            }
        }

        Ok(())
    }
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn default_column() -> String {
    "deleted".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_tables_skips_duplicates() {
        let mut config = SoftDeleteConfig {
            tables: vec!["a".to_string(), "b".to_string()],
            ..SoftDeleteConfig::default()
        };
        config.merge_tables(vec!["b".to_string(), "c".to_string()]);
        assert_eq!(config.tables, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let config = SoftDeleteConfig {
            tables: vec!["adm clients".to_string()],
            ..SoftDeleteConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SoftDeleteConfig {
            tables: vec!["  ".to_string()],
            ..SoftDeleteConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SoftDeleteConfig {
            column: "deleted = 1".to_string(),
            ..SoftDeleteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_default_column() {
        assert_eq!(SoftDeleteConfig::default().column, "deleted");
    }
}
