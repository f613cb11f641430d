//! Configuration types for Tomb.
//!
//! Configuration is loaded from a single YAML file (`tomb.yaml`). The list of
//! soft-delete tables may be kept inline or in a separate YAML file referenced
//! by `soft_delete.tables_file`.
//!
//! # Example
//!
//! ```yaml
//! soft_delete:
//!   column: deleted
//!   tables: [adm_clients, adm_locations]
//!   tables_file: hist_tables.yaml
//! rewrite:
//!   max_depth: 32
//!   max_joins: 64
//!   verify_output: false
//! logging:
//!   level: info
//! ```

pub mod logging;
pub mod rewrite;
pub mod soft_delete;

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub use logging::LoggingConfig;
pub use rewrite::RewriteLimits;
pub use soft_delete::SoftDeleteConfig;

/// Complete Tomb configuration loaded from a file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TombConfig {
    /// Which tables carry the soft-delete flag, and what the flag is called.
    #[serde(default)]
    pub soft_delete: SoftDeleteConfig,

    /// Resource bounds and safety switches for the rewriter.
    #[serde(default)]
    pub rewrite: RewriteLimits,

    /// Logging settings used by the CLI.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TombConfig {
    /// Load configuration from a YAML file.
    ///
    /// External references (`soft_delete.tables_file`) are not resolved; use
    /// [`TombConfig::load_with_context`] for that.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML content.
    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(ConfigError::from)
    }

    /// Load configuration and resolve all external references.
    ///
    /// Relative paths are resolved against the directory containing `path`.
    /// The loaded configuration is validated before it is returned.
    pub fn load_with_context(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Self::from_file(path)?;

        let base_dir = path
            .parent()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));

        if let Some(tables_file) = config.soft_delete.tables_file.clone() {
            let extra = SoftDeleteConfig::load_tables_file(&tables_file, &base_dir)?;
            config.soft_delete.merge_tables(extra);
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the configuration for values the rewriter cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.soft_delete.validate()?;
        self.rewrite.validate()?;
        Ok(())
    }
}
