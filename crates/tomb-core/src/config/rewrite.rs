//! Rewriter limits.

use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Bounds applied while rewriting a single statement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewriteLimits {
    /// Maximum nesting depth of parenthesized sub-selects that are rewritten.
    /// Deeper sub-selects are left untouched.
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    /// Maximum number of join steps accepted in one `FROM` clause.
    #[serde(default = "default_max_joins")]
    pub max_joins: usize,

    /// Re-parse the rewritten statement and fall back to the original when
    /// the rewrite broke a statement that used to parse.
    #[serde(default)]
    pub verify_output: bool,
}

impl Default for RewriteLimits {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_joins: default_max_joins(),
            verify_output: false,
        }
    }
}

impl RewriteLimits {
    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        if self.max_depth == 0 {
            return Err(ConfigError::Config(
                "rewrite.max_depth must be at least 1".to_string(),
            ));
        }
        if self.max_joins == 0 {
            return Err(ConfigError::Config(
                "rewrite.max_joins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn default_max_depth() -> usize {
    32
}

fn default_max_joins() -> usize {
    64
}
