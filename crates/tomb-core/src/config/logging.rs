//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Logging settings for binaries embedding the rewriter.
///
/// The library itself only emits `tracing` events; installing a subscriber is
/// left to the binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive (e.g. `info`, `tomb_rewrite=debug`).
    /// `RUST_LOG` takes precedence when set.
    #[serde(default = "default_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
