//! Entry guard: detects statements that already filter on the soft-delete
//! column.

use crate::frame::{Frame, Item};
use crate::lexer::{TokenKind, tokenize};

const COMPARISON_OPERATORS: &[&str] = &["=", "<>", "!=", "<", ">", "<=", ">=", "<=>"];

/// Whether `sql` compares an identifier named `column` anywhere, sub-selects
/// included.
///
/// The identifier may be bare, backtick or double quoted and qualified
/// (`t.deleted`). Single-quoted text is a literal and never counts, and
/// neither do names that merely contain `column` (`is_deleted`).
pub fn compares_column(sql: &str, column: &str) -> bool {
    let Ok(tokens) = tokenize(sql) else {
        return false;
    };
    let frame = Frame::new(sql, tokens.into_iter().map(Item::Token).collect());

    (0..frame.len()).any(|i| names_column(&frame, i, column) && is_comparison(&frame, i + 1))
}

fn names_column(frame: &Frame<'_>, index: usize, column: &str) -> bool {
    let Some(Item::Token(token)) = frame.items.get(index) else {
        return false;
    };
    let column_like = matches!(
        token.kind,
        TokenKind::Word | TokenKind::Quoted('`') | TokenKind::Quoted('"')
    );
    // `deleted.x` is a table named deleted, not the column.
    column_like
        && token.unquoted(frame.src).eq_ignore_ascii_case(column)
        && frame.kind(index + 1) != Some(TokenKind::Dot)
}

fn is_comparison(frame: &Frame<'_>, index: usize) -> bool {
    if frame.kind(index) == Some(TokenKind::Operator) {
        return COMPARISON_OPERATORS.contains(&frame.text(index));
    }
    ["IS", "IN", "LIKE"].iter().any(|kw| frame.is_word(index, kw))
        || frame.is_words(index, &["NOT", "IN"])
        || frame.is_words(index, &["NOT", "LIKE"])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_comparisons() {
        for sql in [
            "SELECT * FROM t WHERE deleted = 0",
            "SELECT * FROM t WHERE t.deleted<>1",
            "SELECT * FROM t WHERE `deleted` IS NULL",
            "SELECT * FROM t WHERE t.`DELETED` is not null",
            "SELECT * FROM t WHERE deleted IN (0, 1)",
            "SELECT * FROM t WHERE deleted NOT IN (1)",
            "SELECT * FROM t WHERE deleted <=> NULL",
            "SELECT * FROM t WHERE deleted LIKE '0'",
            "SELECT * FROM t WHERE id IN (SELECT id FROM u WHERE u.deleted = 0)",
        ] {
            assert!(compares_column(sql, "deleted"), "{sql}");
        }
    }

    #[test]
    fn test_ignores_near_misses() {
        for sql in [
            "SELECT * FROM t WHERE is_deleted = 0",
            "SELECT * FROM t WHERE note = 'deleted = 0'",
            "SELECT deleted FROM t",
            "SELECT * FROM t WHERE 'deleted' = x",
            "SELECT * FROM deleted.t WHERE x = 1",
            "SELECT * FROM t ORDER BY deleted",
        ] {
            assert!(!compares_column(sql, "deleted"), "{sql}");
        }
    }

    #[test]
    fn test_uses_configured_column() {
        assert!(compares_column("SELECT * FROM t WHERE t.removed = 0", "removed"));
        assert!(!compares_column("SELECT * FROM t WHERE t.deleted = 0", "removed"));
    }
}
