//! Rewrite reports.

use serde::Serialize;

use crate::error::RewriteError;

/// How a statement left the rewriter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// At least one soft-delete filter was added.
    Rewritten,
    /// Nothing needed filtering.
    Unchanged,
    /// The statement already filters on the soft-delete column.
    ExplicitCondition,
    /// Not a `SELECT` statement.
    NotSelect,
    /// Rewriting failed; the input was returned as is.
    FailedOpen,
}

/// A problem met while rewriting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Machine-readable error kind, see [`RewriteError::kind`].
    pub kind: &'static str,
    pub message: String,
    /// Sub-select nesting level where it happened (0 is the statement).
    pub depth: usize,
}

impl Diagnostic {
    pub fn from_error(error: &RewriteError, depth: usize) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            depth,
        }
    }
}

/// Full result of rewriting one statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewriteReport {
    pub original_sql: String,
    pub rewritten_sql: String,
    pub outcome: Outcome,
    /// Names (aliases where given) of the tables that received a filter.
    pub constrained_tables: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RewriteReport {
    /// A report that hands `sql` back unchanged.
    pub(crate) fn passthrough(sql: &str, outcome: Outcome) -> Self {
        Self {
            original_sql: sql.to_string(),
            rewritten_sql: sql.to_string(),
            outcome,
            constrained_tables: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn is_rewritten(&self) -> bool {
        self.outcome == Outcome::Rewritten
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_snake_case() {
        let mut report = RewriteReport::passthrough("SELECT 1", Outcome::FailedOpen);
        report.diagnostics.push(Diagnostic::from_error(
            &RewriteError::TooManyJoins { limit: 3 },
            1,
        ));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["outcome"], "failed_open");
        assert_eq!(json["diagnostics"][0]["kind"], "too_many_joins");
        assert_eq!(json["diagnostics"][0]["message"], "more than 3 joins in one FROM clause");
        assert_eq!(json["diagnostics"][0]["depth"], 1);
        assert!(!report.is_rewritten());
    }
}
