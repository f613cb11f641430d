//! The soft-delete rewriter.

use tomb_core::TombConfig;

use crate::error::RewriteError;
use crate::guard::compares_column;
use crate::lexer::{TokenKind, tokenize};
use crate::registry::SoftDeleteRegistry;
use crate::report::{Diagnostic, Outcome, RewriteReport};
use crate::subquery::Session;
use crate::verify::verify;

/// Settings for a [`SoftDeleteRewriter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOptions {
    /// Soft-delete flag column.
    pub column: String,
    /// Deepest sub-select nesting level that is rewritten.
    pub max_depth: usize,
    /// Most join steps accepted in one `FROM` clause.
    pub max_joins: usize,
    /// Re-parse the output and fall back to the input if it broke.
    pub verify_output: bool,
}

impl Default for RewriteOptions {
    fn default() -> Self {
        Self {
            column: "deleted".to_string(),
            max_depth: 32,
            max_joins: 64,
            verify_output: false,
        }
    }
}

impl RewriteOptions {
    pub fn from_config(config: &TombConfig) -> Self {
        Self {
            column: config.soft_delete.column.clone(),
            max_depth: config.rewrite.max_depth,
            max_joins: config.rewrite.max_joins,
            verify_output: config.rewrite.verify_output,
        }
    }
}

/// Adds soft-delete filters to `SELECT` statements.
///
/// The rewriter never fails: anything it cannot handle comes back unchanged,
/// with the reason in the [`RewriteReport`] diagnostics.
#[derive(Debug, Clone)]
pub struct SoftDeleteRewriter {
    registry: SoftDeleteRegistry,
    options: RewriteOptions,
}

impl SoftDeleteRewriter {
    /// Create a rewriter with default options.
    pub fn new(registry: SoftDeleteRegistry) -> Self {
        Self::with_options(registry, RewriteOptions::default())
    }

    pub fn with_options(registry: SoftDeleteRegistry, options: RewriteOptions) -> Self {
        Self { registry, options }
    }

    /// Create a rewriter from a loaded configuration.
    pub fn from_config(config: &TombConfig) -> Self {
        Self::with_options(
            SoftDeleteRegistry::from_config(&config.soft_delete),
            RewriteOptions::from_config(config),
        )
    }

    pub fn registry(&self) -> &SoftDeleteRegistry {
        &self.registry
    }

    pub fn options(&self) -> &RewriteOptions {
        &self.options
    }

    /// Rewrite `sql`, returning only the resulting text.
    pub fn rewrite_query(&self, sql: &str) -> String {
        self.rewrite(sql).rewritten_sql
    }

    /// Rewrite `sql` and report what happened.
    pub fn rewrite(&self, sql: &str) -> RewriteReport {
        if !is_select(sql) {
            return RewriteReport::passthrough(sql, Outcome::NotSelect);
        }
        if compares_column(sql, &self.options.column) {
            tracing::debug!(
                column = %self.options.column,
                "statement already filters on the soft-delete column"
            );
            return RewriteReport::passthrough(sql, Outcome::ExplicitCondition);
        }

        let mut session = Session::new(&self.registry, &self.options);
        let result = session
            .rewrite_level(sql, 0, 0)
            .and_then(|rewritten| self.check(sql, rewritten));
        let Session {
            diagnostics,
            constrained,
            ..
        } = session;

        match result {
            Ok(rewritten) => {
                let outcome = if rewritten != sql {
                    Outcome::Rewritten
                } else if diagnostics.is_empty() {
                    Outcome::Unchanged
                } else {
                    Outcome::FailedOpen
                };
                RewriteReport {
                    original_sql: sql.to_string(),
                    rewritten_sql: rewritten,
                    outcome,
                    constrained_tables: constrained,
                    diagnostics,
                }
            }
            Err(error) => {
                tracing::warn!(
                    kind = error.kind(),
                    error = %error,
                    "soft-delete rewrite failed, passing statement through"
                );
                let mut report = RewriteReport::passthrough(sql, Outcome::FailedOpen);
                report.diagnostics = diagnostics;
                report.diagnostics.push(Diagnostic::from_error(&error, 0));
                report
            }
        }
    }

    fn check(&self, original: &str, rewritten: String) -> Result<String, RewriteError> {
        if self.options.verify_output && rewritten != original {
            verify(original, &rewritten)?;
        }
        Ok(rewritten)
    }
}

/// Only statements that open with `SELECT` (possibly parenthesized) are
/// rewritten.
fn is_select(sql: &str) -> bool {
    let Ok(tokens) = tokenize(sql) else {
        // Let the rewrite report the lexing error.
        return true;
    };
    tokens
        .iter()
        .find(|t| t.kind != TokenKind::LParen)
        .is_some_and(|t| t.is_word(sql, "SELECT"))
}
