//! Subquery isolation.
//!
//! Every outermost `( SELECT ... )` of a level is cut out, rewritten as an
//! independent statement one level deeper, and kept as a single
//! [`Item::Subquery`] of the enclosing frame. The enclosing level is then
//! rewritten without ever seeing the inside of its sub-selects.

use crate::error::RewriteError;
use crate::frame::{Frame, Item, Subquery};
use crate::lexer::{Token, TokenKind, tokenize};
use crate::registry::SoftDeleteRegistry;
use crate::report::Diagnostic;
use crate::rewriter::RewriteOptions;
use crate::statement::rewrite_frame;

/// State of one top-level rewrite.
pub(crate) struct Session<'r> {
    pub registry: &'r SoftDeleteRegistry,
    pub options: &'r RewriteOptions,
    pub diagnostics: Vec<Diagnostic>,
    pub constrained: Vec<String>,
}

impl<'r> Session<'r> {
    pub fn new(registry: &'r SoftDeleteRegistry, options: &'r RewriteOptions) -> Self {
        Self {
            registry,
            options,
            diagnostics: Vec::new(),
            constrained: Vec::new(),
        }
    }

    /// Rewrite `sql`, found at byte `offset` of the statement, as a statement
    /// nested `depth` sub-selects deep.
    pub fn rewrite_level(
        &mut self,
        sql: &str,
        depth: usize,
        offset: usize,
    ) -> Result<String, RewriteError> {
        let tokens = tokenize(sql)?;
        let (items, terminated) = self.isolate(sql, tokens, depth, offset)?;
        let frame = Frame::new(sql, items);

        // A level cut short by an unterminated sub-select has no reliable
        // clause boundaries, so only its complete sub-selects are rewritten.
        if !terminated || !frame.mentions_soft_delete_table(self.registry) {
            return Ok(frame.render(Vec::new()));
        }

        let edit = rewrite_frame(&frame, self.registry, self.options)?;
        if !edit.constrained.is_empty() {
            tracing::debug!(depth, tables = ?edit.constrained, "constrained tables");
        }
        self.constrained.extend(edit.constrained);
        Ok(frame.render(edit.splices))
    }

    /// Collapse each outermost sub-select of `tokens` into one item.
    ///
    /// The flag is `false` when an unterminated sub-select cut the items
    /// short.
    fn isolate(
        &mut self,
        sql: &str,
        tokens: Vec<Token>,
        depth: usize,
        offset: usize,
    ) -> Result<(Vec<Item>, bool), RewriteError> {
        let mut items = Vec::with_capacity(tokens.len());
        let mut i = 0;

        while i < tokens.len() {
            let opens_subquery = tokens[i].kind == TokenKind::LParen
                && tokens.get(i + 1).is_some_and(|t| t.is_word(sql, "SELECT"));
            if !opens_subquery {
                items.push(Item::Token(tokens[i].clone()));
                i += 1;
                continue;
            }

            let Some(close) = matching_paren(&tokens, i) else {
                self.report(
                    &RewriteError::UnterminatedSubquery {
                        offset: offset + tokens[i].span.start,
                    },
                    depth,
                );
                return Ok((items, false));
            };

            let inner = tokens[i].span.end..tokens[close].span.start;
            let body = self.rewrite_nested(&sql[inner.clone()], depth + 1, offset + inner.start)?;
            items.push(Item::Subquery(Subquery {
                span: tokens[i].span.start..tokens[close].span.end,
                body,
            }));
            i = close + 1;
        }

        Ok((items, true))
    }

    fn rewrite_nested(
        &mut self,
        body: &str,
        depth: usize,
        offset: usize,
    ) -> Result<String, RewriteError> {
        if depth > self.options.max_depth {
            self.report(
                &RewriteError::NestingTooDeep {
                    limit: self.options.max_depth,
                },
                depth,
            );
            return Ok(body.to_string());
        }
        self.rewrite_level(body, depth, offset)
    }

    fn report(&mut self, error: &RewriteError, depth: usize) {
        tracing::warn!(
            kind = error.kind(),
            depth,
            error = %error,
            "leaving part of the statement unchanged"
        );
        self.diagnostics.push(Diagnostic::from_error(error, depth));
    }
}

/// Index of the `)` closing the `(` at `open`.
fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, token) in tokens.iter().enumerate().skip(open) {
        match token.kind {
            TokenKind::LParen => depth += 1,
            TokenKind::RParen => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
