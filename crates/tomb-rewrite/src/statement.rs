//! Statement-level orchestration for one frame.
//!
//! A frame holds one or more select bodies (several when joined by `UNION`).
//! For every body the first top-level `FROM` is located, its table references
//! are matched, planned and rebuilt, and the resulting `WHERE` condition is
//! either appended to an existing `WHERE` or inserted as a new one.

use std::ops::Range;

use crate::error::RewriteError;
use crate::frame::{Frame, Item, Splice};
use crate::lexer::TokenKind;
use crate::matcher::parse_table_refs;
use crate::placement::plan;
use crate::rebuild::rebuild;
use crate::registry::SoftDeleteRegistry;
use crate::rewriter::RewriteOptions;

/// Keyword sequences that end the `WHERE` condition (and, together with
/// `WHERE` itself, the table references).
const CLAUSE_ENDS: &[&[&str]] = &[
    &["GROUP", "BY"],
    &["HAVING"],
    &["ORDER", "BY"],
    &["LIMIT"],
    &["PROCEDURE"],
    &["INTO"],
    &["FOR", "UPDATE"],
    &["FOR", "SHARE"],
    &["LOCK", "IN", "SHARE", "MODE"],
];

/// Splices for one frame plus the tables that were constrained.
#[derive(Debug, Default)]
pub(crate) struct FrameEdit {
    pub splices: Vec<Splice>,
    pub constrained: Vec<String>,
}

/// Rewrite every select body of `frame`.
pub(crate) fn rewrite_frame(
    frame: &Frame<'_>,
    registry: &SoftDeleteRegistry,
    options: &RewriteOptions,
) -> Result<FrameEdit, RewriteError> {
    let depths = frame.depths();
    let mut edit = FrameEdit::default();

    for body in select_bodies(frame, &depths) {
        let Some(from) = body
            .clone()
            .find(|&i| depths[i] == 0 && frame.is_word(i, "FROM"))
        else {
            tracing::debug!(body = ?body, "select body has no FROM");
            continue;
        };

        let refs_start = from + 1;
        let refs_end = (refs_start..body.end)
            .find(|&i| depths[i] == 0 && (frame.is_word(i, "WHERE") || ends_clause(frame, i)))
            .unwrap_or(body.end);
        let refs = refs_start..refs_end;

        if !mentions_soft_delete_table(frame, &refs, registry) {
            continue;
        }

        let chain = parse_table_refs(frame, refs.clone(), options.max_joins)?;
        let plan = plan(&chain, registry);
        let rebuilt = rebuild(frame, &chain, &plan, &options.column)?;
        if rebuilt.is_unchanged() {
            continue;
        }

        edit.constrained
            .extend(plan.constrained_tables().map(str::to_string));
        edit.splices.extend(rebuilt.splices);

        if let Some(condition) = rebuilt.where_condition {
            // The matcher rejects empty table references, so `refs` is not empty.
            let refs_bytes = frame.byte_span(&refs);
            edit.splices.extend(where_splices(
                frame,
                &depths,
                refs_end,
                body.end,
                refs_bytes.end,
                &condition,
            ));
        }
    }

    Ok(edit)
}

/// Item ranges of the top-level select bodies, split at `UNION`.
fn select_bodies(frame: &Frame<'_>, depths: &[usize]) -> Vec<Range<usize>> {
    let mut bodies = Vec::new();
    let mut start = 0;
    for i in 0..frame.len() {
        if depths[i] == 0 && frame.is_word(i, "UNION") {
            bodies.push(start..i);
            start = i + 1;
        }
    }
    bodies.push(start..frame.len());
    bodies
}

fn ends_clause(frame: &Frame<'_>, index: usize) -> bool {
    frame.kind(index) == Some(TokenKind::Semicolon)
        || CLAUSE_ENDS.iter().any(|words| frame.is_words(index, words))
}

fn mentions_soft_delete_table(
    frame: &Frame<'_>,
    items: &Range<usize>,
    registry: &SoftDeleteRegistry,
) -> bool {
    frame.items[items.clone()].iter().any(|item| match item {
        Item::Token(token) if token.is_identifier() => {
            registry.is_soft_delete_table(token.text(frame.src))
        }
        _ => false,
    })
}

/// Edits that add `condition` to the `WHERE` of one body.
///
/// `at` is the index of the first item after the table references and
/// `refs_end_byte` the byte offset just past them.
fn where_splices(
    frame: &Frame<'_>,
    depths: &[usize],
    at: usize,
    body_end: usize,
    refs_end_byte: usize,
    condition: &str,
) -> Vec<Splice> {
    if at >= body_end || !frame.is_word(at, "WHERE") {
        return vec![Splice::insert(refs_end_byte, format!(" WHERE {condition}"))];
    }

    let where_end = frame.byte_span(&(at..at + 1)).end;
    let cond_end = (at + 1..body_end)
        .find(|&i| depths[i] == 0 && ends_clause(frame, i))
        .unwrap_or(body_end);
    if cond_end == at + 1 {
        return vec![Splice::insert(where_end, format!(" {condition}"))];
    }

    let existing = frame.byte_span(&(at + 1..cond_end));
    vec![
        Splice::insert(existing.start, "(".to_string()),
        Splice::insert(existing.end, format!(") AND {condition}")),
    ]
}
