//! Error types for the rewrite crate.

use thiserror::Error;

/// Reasons a statement could not be rewritten.
///
/// None of these ever reach the caller of [`crate::SoftDeleteRewriter::rewrite_query`]:
/// every one of them makes the rewriter fall back to the input text (for the
/// whole statement or for one sub-select) and is reported as a
/// [`crate::Diagnostic`] instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewriteError {
    /// The table references after `FROM` do not fit the supported grammar.
    #[error("failed to match table references: {reason}")]
    ParseFailure { reason: String },

    /// A `(SELECT` has no matching closing parenthesis.
    #[error("sub-select opened at byte {offset} is never closed")]
    UnterminatedSubquery { offset: usize },

    /// A quoted identifier or literal has no closing quote.
    #[error("quoted text opened at byte {offset} is never closed")]
    UnterminatedLiteral { offset: usize },

    /// A constraint would have to be attached to a join that cannot take `ON`.
    #[error("cannot add an ON condition to a {join} join")]
    UnsupportedJoinCondition { join: String },

    /// One `FROM` clause holds more joins than allowed.
    #[error("more than {limit} joins in one FROM clause")]
    TooManyJoins { limit: usize },

    /// Sub-selects are nested deeper than allowed.
    #[error("sub-selects nested deeper than {limit} levels")]
    NestingTooDeep { limit: usize },

    /// The rewritten statement no longer parses.
    #[error("rewritten statement does not parse: {reason}")]
    VerificationFailed { reason: String },
}

impl RewriteError {
    /// Stable machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            RewriteError::ParseFailure { .. } => "parse_failure",
            RewriteError::UnterminatedSubquery { .. } => "unterminated_subquery",
            RewriteError::UnterminatedLiteral { .. } => "unterminated_literal",
            RewriteError::UnsupportedJoinCondition { .. } => "unsupported_join_condition",
            RewriteError::TooManyJoins { .. } => "too_many_joins",
            RewriteError::NestingTooDeep { .. } => "nesting_too_deep",
            RewriteError::VerificationFailed { .. } => "verification_failed",
        }
    }

    pub(crate) fn parse(reason: impl Into<String>) -> Self {
        RewriteError::ParseFailure {
            reason: reason.into(),
        }
    }
}
