//! Optional check that a rewrite still parses.

use sqlparser::dialect::MySqlDialect;
use sqlparser::parser::Parser;

use crate::error::RewriteError;

/// Parse `rewritten` with the MySQL dialect.
///
/// Statements the parser cannot read to begin with are not judged: the
/// rewrite is accepted as long as `original` fails to parse too.
pub(crate) fn verify(original: &str, rewritten: &str) -> Result<(), RewriteError> {
    let dialect = MySqlDialect {};
    if let Err(e) = Parser::parse_sql(&dialect, original) {
        tracing::debug!(error = %e, "original statement does not parse, skipping verification");
        return Ok(());
    }

    Parser::parse_sql(&dialect, rewritten)
        .map(|_| ())
        .map_err(|e| RewriteError::VerificationFailed {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_valid_rewrite() {
        assert!(
            verify(
                "SELECT * FROM hist_a",
                "SELECT * FROM hist_a WHERE (hist_a.deleted = 0 OR hist_a.deleted IS NULL)"
            )
            .is_ok()
        );
    }

    #[test]
    fn test_rejects_broken_rewrite() {
        let err = verify("SELECT * FROM hist_a", "SELECT * FROM hist_a WHERE (").unwrap_err();
        assert_eq!(err.kind(), "verification_failed");
    }

    #[test]
    fn test_skips_unparseable_original() {
        assert!(verify("SELECT * FROM t WHERE", "SELECT * FROM t WHERE (").is_ok());
    }
}
