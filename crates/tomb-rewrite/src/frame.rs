//! Rewrite frames: one nesting level of a statement.
//!
//! A frame is the token stream of one level with every parenthesized
//! sub-select collapsed into a single [`Item::Subquery`] node holding the
//! already-rewritten body. Edits against a frame are collected as
//! [`Splice`]s over byte ranges and applied in a single [`Frame::render`]
//! pass, so nothing is ever searched for and replaced in the output text.

use std::ops::Range;

use crate::lexer::{Token, TokenKind};
use crate::registry::SoftDeleteRegistry;

/// A sub-select isolated from its enclosing frame.
#[derive(Debug, Clone)]
pub(crate) struct Subquery {
    /// Byte range of the sub-select in the frame source, parentheses included.
    pub span: Range<usize>,
    /// Rewritten text between the parentheses.
    pub body: String,
}

/// One element of a frame.
#[derive(Debug, Clone)]
pub(crate) enum Item {
    Token(Token),
    Subquery(Subquery),
}

impl Item {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Item::Token(token) => &token.span,
            Item::Subquery(sub) => &sub.span,
        }
    }

    pub fn kind(&self) -> Option<TokenKind> {
        match self {
            Item::Token(token) => Some(token.kind),
            Item::Subquery(_) => None,
        }
    }
}

/// Replace the source bytes in `bytes` with `text` when rendering.
///
/// An empty range is an insertion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Splice {
    pub bytes: Range<usize>,
    pub text: String,
}

impl Splice {
    pub fn insert(at: usize, text: String) -> Self {
        Self {
            bytes: at..at,
            text,
        }
    }
}

#[derive(Debug)]
pub(crate) struct Frame<'s> {
    pub src: &'s str,
    pub items: Vec<Item>,
}

impl<'s> Frame<'s> {
    pub fn new(src: &'s str, items: Vec<Item>) -> Self {
        Self { src, items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Source text of item `index` (the original text for sub-selects).
    pub fn text(&self, index: usize) -> &'s str {
        &self.src[self.items[index].span().clone()]
    }

    pub fn kind(&self, index: usize) -> Option<TokenKind> {
        self.items.get(index).and_then(Item::kind)
    }

    /// True if item `index` is the bare word `keyword` (case-insensitive).
    pub fn is_word(&self, index: usize, keyword: &str) -> bool {
        match self.items.get(index) {
            Some(Item::Token(token)) => token.is_word(self.src, keyword),
            _ => false,
        }
    }

    /// True if the items starting at `index` spell out `words`.
    pub fn is_words(&self, index: usize, words: &[&str]) -> bool {
        words
            .iter()
            .enumerate()
            .all(|(offset, word)| self.is_word(index + offset, word))
    }

    /// Byte range covered by the items in `items`.
    pub fn byte_span(&self, items: &Range<usize>) -> Range<usize> {
        debug_assert!(items.start < items.end, "empty item range");
        self.items[items.start].span().start..self.items[items.end - 1].span().end
    }

    /// Parenthesis depth in front of every item.
    pub fn depths(&self) -> Vec<usize> {
        let mut depth = 0usize;
        self.items
            .iter()
            .map(|item| match item.kind() {
                Some(TokenKind::LParen) => {
                    depth += 1;
                    depth - 1
                }
                Some(TokenKind::RParen) => {
                    depth = depth.saturating_sub(1);
                    depth
                }
                _ => depth,
            })
            .collect()
    }

    /// Whether any identifier at this level names a soft-delete table.
    pub fn mentions_soft_delete_table(&self, registry: &SoftDeleteRegistry) -> bool {
        self.items.iter().any(|item| match item {
            Item::Token(token) if token.is_identifier() => {
                registry.is_soft_delete_table(token.text(self.src))
            }
            _ => false,
        })
    }

    /// Source text of a byte range with sub-selects replaced by their
    /// rewritten bodies.
    pub fn render_range(&self, bytes: Range<usize>) -> String {
        let mut out = String::with_capacity(bytes.len());
        let mut pos = bytes.start;
        for item in &self.items {
            if let Item::Subquery(sub) = item {
                if sub.span.start >= pos && sub.span.end <= bytes.end {
                    out.push_str(&self.src[pos..sub.span.start]);
                    out.push('(');
                    out.push_str(&sub.body);
                    out.push(')');
                    pos = sub.span.end;
                }
            }
        }
        out.push_str(&self.src[pos..bytes.end]);
        out
    }

    /// Rendered text of the items in `items`.
    pub fn render_items(&self, items: &Range<usize>) -> String {
        self.render_range(self.byte_span(items))
    }

    /// Render the whole frame with `splices` applied.
    pub fn render(&self, mut splices: Vec<Splice>) -> String {
        splices.sort_by_key(|s| (s.bytes.start, s.bytes.end));

        let mut out = String::with_capacity(self.src.len() + 64 * splices.len());
        let mut pos = 0;
        for splice in splices {
            out.push_str(&self.render_range(pos..splice.bytes.start));
            out.push_str(&splice.text);
            pos = splice.bytes.end;
        }
        out.push_str(&self.render_range(pos..self.src.len()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn token_frame(src: &str) -> Frame<'_> {
        let items = tokenize(src).unwrap().into_iter().map(Item::Token).collect();
        Frame::new(src, items)
    }

    #[test]
    fn test_render_without_splices_is_identity() {
        let src = "SELECT  *\n FROM t -- done";
        assert_eq!(token_frame(src).render(Vec::new()), src);
    }

    #[test]
    fn test_render_applies_splices_in_order() {
        let src = "SELECT * FROM t ORDER BY x";
        let frame = token_frame(src);
        let t_end = frame.items[3].span().end;
        let splices = vec![
            Splice::insert(t_end, " WHERE ok".to_string()),
            Splice {
                bytes: frame.byte_span(&(3..4)),
                text: "u".to_string(),
            },
        ];
        assert_eq!(frame.render(splices), "SELECT * FROM u WHERE ok ORDER BY x");
    }

    #[test]
    fn test_render_substitutes_subquery_bodies() {
        let src = "SELECT * FROM ( SELECT 1 ) t";
        let mut items: Vec<Item> = tokenize(src).unwrap().into_iter().map(Item::Token).collect();
        let span = items[3].span().start..items[6].span().end;
        items.splice(
            3..7,
            [Item::Subquery(Subquery {
                span,
                body: " SELECT 2 ".to_string(),
            })],
        );
        let frame = Frame::new(src, items);
        assert_eq!(frame.render(Vec::new()), "SELECT * FROM ( SELECT 2 ) t");
        assert_eq!(frame.render_items(&(3..5)), "( SELECT 2 ) t");
    }

    #[test]
    fn test_depths() {
        let frame = token_frame("a ( b ( c ) ) d");
        assert_eq!(frame.depths(), vec![0, 0, 1, 1, 2, 1, 0, 0]);
    }

    #[test]
    fn test_is_words() {
        let frame = token_frame("x group   by y");
        assert!(frame.is_words(1, &["GROUP", "BY"]));
        assert!(!frame.is_words(2, &["GROUP", "BY"]));
    }
}
