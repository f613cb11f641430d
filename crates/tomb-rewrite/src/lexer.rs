//! SQL tokenizer.
//!
//! Produces just enough structure for the rewriter: words, quoted text,
//! numbers, operators and punctuation, each with its byte span in the source.
//! Whitespace and comments are not emitted; the gaps between token spans keep
//! them, so untouched regions of a statement can be copied back verbatim.

use std::ops::Range;

use crate::error::RewriteError;

/// Characters that may enclose an identifier or literal.
pub const QUOTE_CHARS: [char; 3] = ['`', '\'', '"'];

/// Kinds of tokens the rewriter distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Unquoted word: a keyword or a bare identifier.
    Word,
    /// Text enclosed in the given quote character, quotes included.
    Quoted(char),
    Number,
    /// Comparison or arithmetic operator such as `=`, `<>`, `<=>` or `+`.
    Operator,
    LParen,
    RParen,
    Comma,
    Dot,
    Semicolon,
    /// `?` bind parameter.
    Param,
    /// Any other single character (`@`, `:`, ...).
    Symbol,
}

/// A token and the byte range it occupies in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Range<usize>,
}

impl Token {
    /// Source text of the token.
    pub fn text<'s>(&self, src: &'s str) -> &'s str {
        &src[self.span.clone()]
    }

    /// True if this is the bare word `keyword`, compared case-insensitively.
    pub fn is_word(&self, src: &str, keyword: &str) -> bool {
        self.kind == TokenKind::Word && self.text(src).eq_ignore_ascii_case(keyword)
    }

    /// True if this token can name a table, column or alias.
    pub fn is_identifier(&self) -> bool {
        matches!(self.kind, TokenKind::Word | TokenKind::Quoted(_))
    }

    /// Identifier text with surrounding quotes removed.
    pub fn unquoted<'s>(&self, src: &'s str) -> &'s str {
        let text = self.text(src);
        match self.kind {
            TokenKind::Quoted(_) if text.len() >= 2 => &text[1..text.len() - 1],
            _ => text,
        }
    }
}

/// Split `src` into tokens.
pub fn tokenize(src: &str) -> Result<Vec<Token>, RewriteError> {
    let mut lexer = Lexer { src, pos: 0 };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

struct Lexer<'s> {
    src: &'s str,
    pos: usize,
}

impl<'s> Lexer<'s> {
    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.src[self.pos..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat_while(&mut self, predicate: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !predicate(c) {
                break;
            }
            self.pos += c.len_utf8();
        }
    }

    /// `--` opens a comment only when followed by whitespace, a control
    /// character or the end of input. `5--1` is `5 - -1`.
    fn dash_comment(&self) -> bool {
        self.peek_nth(2).is_none_or(|c| c.is_whitespace() || c.is_control())
    }

    /// Skip whitespace and comments.
    fn skip_trivia(&mut self) {
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some(c), _) if c.is_whitespace() => self.eat_while(char::is_whitespace),
                (Some('-'), Some('-')) if self.dash_comment() => self.eat_while(|c| c != '\n'),
                (Some('#'), _) => self.eat_while(|c| c != '\n'),
                (Some('/'), Some('*')) => {
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => self.pos += end + 2,
                        None => self.pos = self.src.len(),
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, RewriteError> {
        self.skip_trivia();
        let start = self.pos;
        let Some(c) = self.bump() else {
            return Ok(None);
        };

        let kind = match c {
            '`' | '\'' | '"' => {
                self.quoted(c, start)?;
                TokenKind::Quoted(c)
            }
            c if is_word_char(c) => self.word_or_number(c),
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            ',' => TokenKind::Comma,
            '.' => TokenKind::Dot,
            ';' => TokenKind::Semicolon,
            '?' => TokenKind::Param,
            '<' => {
                if self.src[self.pos..].starts_with("=>") {
                    self.pos += 2;
                } else if matches!(self.peek(), Some('=' | '>')) {
                    self.bump();
                }
                TokenKind::Operator
            }
            '>' => {
                if self.peek() == Some('=') {
                    self.bump();
                }
                TokenKind::Operator
            }
            '!' => {
                if self.peek() == Some('=') {
                    self.bump();
                    TokenKind::Operator
                } else {
                    TokenKind::Symbol
                }
            }
            '=' | '+' | '-' | '*' | '/' | '%' | '|' | '&' | '^' | '~' => {
                // `||` and `&&` are the MySQL spellings of OR and AND.
                if matches!(c, '|' | '&') && self.peek() == Some(c) {
                    self.bump();
                }
                TokenKind::Operator
            }
            _ => TokenKind::Symbol,
        };

        Ok(Some(Token {
            kind,
            span: start..self.pos,
        }))
    }

    /// Consume the rest of a quoted token whose opening quote was consumed.
    ///
    /// A doubled quote character is an escaped quote; inside `'` and `"`
    /// quotes a backslash escapes the next character.
    fn quoted(&mut self, quote: char, start: usize) -> Result<(), RewriteError> {
        loop {
            match self.bump() {
                None => return Err(RewriteError::UnterminatedLiteral { offset: start }),
                Some('\\') if quote != '`' => {
                    self.bump();
                }
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                    } else {
                        return Ok(());
                    }
                }
                Some(_) => {}
            }
        }
    }

    fn word_or_number(&mut self, first: char) -> TokenKind {
        let start = self.pos - first.len_utf8();
        self.eat_while(is_word_char);
        if !self.src[start..self.pos].bytes().all(|b| b.is_ascii_digit()) {
            return TokenKind::Word;
        }

        // Fractional part of a decimal literal.
        if self.peek() == Some('.') && self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
            self.eat_while(|c| c.is_ascii_digit());
        }
        TokenKind::Number
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds_and_text(src: &str) -> Vec<(TokenKind, &str)> {
        tokenize(src)
            .unwrap()
            .into_iter()
            .map(|t| (t.kind, &src[t.span]))
            .collect()
    }

    #[test]
    fn test_words_operators_and_punctuation() {
        let tokens = kinds_and_text("SELECT a.b, 1.5 FROM t WHERE x<>? AND y<=>2;");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "SELECT"),
                (TokenKind::Word, "a"),
                (TokenKind::Dot, "."),
                (TokenKind::Word, "b"),
                (TokenKind::Comma, ","),
                (TokenKind::Number, "1.5"),
                (TokenKind::Word, "FROM"),
                (TokenKind::Word, "t"),
                (TokenKind::Word, "WHERE"),
                (TokenKind::Word, "x"),
                (TokenKind::Operator, "<>"),
                (TokenKind::Param, "?"),
                (TokenKind::Word, "AND"),
                (TokenKind::Word, "y"),
                (TokenKind::Operator, "<=>"),
                (TokenKind::Number, "2"),
                (TokenKind::Semicolon, ";"),
            ]
        );
    }

    #[test]
    fn test_quoted_tokens_keep_parentheses_inside() {
        let tokens = kinds_and_text("`my tbl` 'it''s (' \"a\\\"b\"");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Quoted('`'), "`my tbl`"),
                (TokenKind::Quoted('\''), "'it''s ('"),
                (TokenKind::Quoted('"'), "\"a\\\"b\""),
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = kinds_and_text("SELECT -- note\n* /* block */ FROM # trailing\nt");
        let words: Vec<_> = tokens.iter().map(|(_, text)| *text).collect();
        assert_eq!(words, vec!["SELECT", "*", "FROM", "t"]);
    }

    #[test]
    fn test_double_dash_without_space_is_minus() {
        let tokens = kinds_and_text("x = 5--1");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "x"),
                (TokenKind::Operator, "="),
                (TokenKind::Number, "5"),
                (TokenKind::Operator, "-"),
                (TokenKind::Operator, "-"),
                (TokenKind::Number, "1"),
            ]
        );
    }

    #[test]
    fn test_double_dash_comment_forms() {
        fn words(src: &str) -> Vec<&str> {
            kinds_and_text(src).into_iter().map(|(_, text)| text).collect()
        }
        assert_eq!(words("a --\tnote\nb"), vec!["a", "b"]);
        assert_eq!(words("a --"), vec!["a"]);
        assert_eq!(words("a --x\nb"), vec!["a", "-", "-", "x", "b"]);
    }

    #[test]
    fn test_unterminated_quote() {
        let err = tokenize("SELECT 'abc").unwrap_err();
        assert_eq!(err, RewriteError::UnterminatedLiteral { offset: 7 });
    }

    #[test]
    fn test_unquoted_strips_quotes() {
        let src = "`hist_a`";
        let token = &tokenize(src).unwrap()[0];
        assert_eq!(token.unquoted(src), "hist_a");
        assert!(token.is_identifier());
    }

    #[test]
    fn test_digit_led_identifier_is_word() {
        let tokens = kinds_and_text("1abc 42");
        assert_eq!(
            tokens,
            vec![(TokenKind::Word, "1abc"), (TokenKind::Number, "42")]
        );
    }
}
