//! Table-reference matcher.
//!
//! Parses the table references of one `FROM` clause (everything between
//! `FROM` and the next clause keyword) into a [`JoinChain`]: the left-most
//! table followed by one [`JoinStep`] per join. The grammar is deliberately
//! small:
//!
//! ```text
//! table_refs := table_ref (join_op table_ref [join_condition])*
//! table_ref  := (name | sub-select) [[AS] alias]
//! join_op    := NATURAL LEFT OUTER JOIN | NATURAL RIGHT OUTER JOIN
//!             | NATURAL LEFT JOIN | NATURAL RIGHT JOIN
//!             | LEFT OUTER JOIN | RIGHT OUTER JOIN | INNER JOIN | CROSS JOIN
//!             | STRAIGHT_JOIN | LEFT JOIN | RIGHT JOIN | JOIN | ','
//! join_condition := ON expr | USING '(' column (',' column)* ')'
//! expr       := term ((AND | OR) term)*
//! term       := NOT term | '(' expr ')' | operand operator operand
//! ```
//!
//! Anything outside that shape is a [`RewriteError::ParseFailure`], as is a
//! join condition nested deeper than [`MAX_CONDITION_NESTING`].

use std::fmt;
use std::ops::Range;

use crate::error::RewriteError;
use crate::frame::{Frame, Item};
use crate::lexer::TokenKind;
use crate::placement::JoinCategory;

/// Deepest `NOT`, `(` or value-list nesting accepted in a join condition.
pub(crate) const MAX_CONDITION_NESTING: usize = 128;

/// Words that can never be an implicit alias or a table name.
const RESERVED: &[&str] = &[
    "SELECT", "FROM", "WHERE", "GROUP", "HAVING", "ORDER", "LIMIT", "PROCEDURE", "INTO", "FOR",
    "LOCK", "UNION", "ON", "USING", "AS", "INNER", "CROSS", "JOIN", "STRAIGHT_JOIN", "LEFT",
    "RIGHT", "NATURAL", "OUTER", "USE", "IGNORE", "FORCE", "AND", "OR", "NOT",
];

fn is_reserved(word: &str) -> bool {
    RESERVED.iter().any(|r| r.eq_ignore_ascii_case(word))
}

/// The join operators understood by the matcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Comma,
    Join,
    Inner,
    Cross,
    Straight,
    Left,
    LeftOuter,
    Right,
    RightOuter,
    NaturalLeft,
    NaturalLeftOuter,
    NaturalRight,
    NaturalRightOuter,
}

impl JoinKind {
    /// Keyword spellings, longest first so that a shorter form never shadows
    /// a longer one.
    const KEYWORD_FORMS: [(JoinKind, &'static [&'static str]); 12] = [
        (JoinKind::NaturalLeftOuter, &["NATURAL", "LEFT", "OUTER", "JOIN"]),
        (JoinKind::NaturalRightOuter, &["NATURAL", "RIGHT", "OUTER", "JOIN"]),
        (JoinKind::NaturalLeft, &["NATURAL", "LEFT", "JOIN"]),
        (JoinKind::NaturalRight, &["NATURAL", "RIGHT", "JOIN"]),
        (JoinKind::LeftOuter, &["LEFT", "OUTER", "JOIN"]),
        (JoinKind::RightOuter, &["RIGHT", "OUTER", "JOIN"]),
        (JoinKind::Inner, &["INNER", "JOIN"]),
        (JoinKind::Cross, &["CROSS", "JOIN"]),
        (JoinKind::Straight, &["STRAIGHT_JOIN"]),
        (JoinKind::Left, &["LEFT", "JOIN"]),
        (JoinKind::Right, &["RIGHT", "JOIN"]),
        (JoinKind::Join, &["JOIN"]),
    ];

    /// Placement category used by the join-placement state machine.
    pub fn category(self) -> JoinCategory {
        match self {
            JoinKind::Comma
            | JoinKind::Join
            | JoinKind::Inner
            | JoinKind::Cross
            | JoinKind::Straight => JoinCategory::CommaOrInner,
            JoinKind::Left
            | JoinKind::LeftOuter
            | JoinKind::NaturalLeft
            | JoinKind::NaturalLeftOuter => JoinCategory::Left,
            JoinKind::Right
            | JoinKind::RightOuter
            | JoinKind::NaturalRight
            | JoinKind::NaturalRightOuter => JoinCategory::Right,
        }
    }

    /// NATURAL joins take no explicit join condition.
    pub fn is_natural(self) -> bool {
        matches!(
            self,
            JoinKind::NaturalLeft
                | JoinKind::NaturalLeftOuter
                | JoinKind::NaturalRight
                | JoinKind::NaturalRightOuter
        )
    }

    /// Canonical SQL spelling.
    pub fn keyword(self) -> &'static str {
        match self {
            JoinKind::Comma => ",",
            JoinKind::Join => "JOIN",
            JoinKind::Inner => "INNER JOIN",
            JoinKind::Cross => "CROSS JOIN",
            JoinKind::Straight => "STRAIGHT_JOIN",
            JoinKind::Left => "LEFT JOIN",
            JoinKind::LeftOuter => "LEFT OUTER JOIN",
            JoinKind::Right => "RIGHT JOIN",
            JoinKind::RightOuter => "RIGHT OUTER JOIN",
            JoinKind::NaturalLeft => "NATURAL LEFT JOIN",
            JoinKind::NaturalLeftOuter => "NATURAL LEFT OUTER JOIN",
            JoinKind::NaturalRight => "NATURAL RIGHT JOIN",
            JoinKind::NaturalRightOuter => "NATURAL RIGHT OUTER JOIN",
        }
    }
}

impl fmt::Display for JoinKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// What a table reference points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableFactor {
    /// A named table, exactly as written (quotes and schema prefix included).
    Named(String),
    /// A derived table (parenthesized sub-select).
    Derived,
}

/// A table reference inside a `FROM` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub factor: TableFactor,
    pub alias: Option<String>,
    /// Frame items covering the reference, alias included.
    pub items: Range<usize>,
}

impl TableRef {
    /// Name used to qualify columns of this table: the alias if there is one,
    /// otherwise the table name.
    pub fn effective_name(&self) -> Option<&str> {
        match (&self.alias, &self.factor) {
            (Some(alias), _) => Some(alias),
            (None, TableFactor::Named(name)) => Some(name),
            (None, TableFactor::Derived) => None,
        }
    }

    pub fn table_name(&self) -> Option<&str> {
        match &self.factor {
            TableFactor::Named(name) => Some(name),
            TableFactor::Derived => None,
        }
    }
}

/// A user-written join condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinCondition {
    On {
        expr: Expr,
        /// Frame items of the expression (the `ON` keyword excluded).
        items: Range<usize>,
    },
    Using {
        columns: Vec<String>,
    },
}

/// One join: operator, right-hand table and optional condition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinStep {
    pub kind: JoinKind,
    pub table: TableRef,
    pub condition: Option<JoinCondition>,
    /// Frame items of the join keyword(s).
    pub keyword_items: Range<usize>,
    /// Frame items of the whole step.
    pub items: Range<usize>,
}

/// The parsed table references of one `FROM` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinChain {
    pub left: TableRef,
    pub steps: Vec<JoinStep>,
}

/// Comparison operators accepted in join conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    NullSafeEq,
    Like,
    NotLike,
    Is,
    IsNot,
    In,
    NotIn,
}

impl CompareOp {
    fn from_operator(text: &str) -> Option<Self> {
        Some(match text {
            "=" => CompareOp::Eq,
            "<>" | "!=" => CompareOp::NotEq,
            "<" => CompareOp::Lt,
            "<=" => CompareOp::LtEq,
            ">" => CompareOp::Gt,
            ">=" => CompareOp::GtEq,
            "<=>" => CompareOp::NullSafeEq,
            _ => return None,
        })
    }

    fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "=",
            CompareOp::NotEq => "<>",
            CompareOp::Lt => "<",
            CompareOp::LtEq => "<=",
            CompareOp::Gt => ">",
            CompareOp::GtEq => ">=",
            CompareOp::NullSafeEq => "<=>",
            CompareOp::Like => "LIKE",
            CompareOp::NotLike => "NOT LIKE",
            CompareOp::Is => "IS",
            CompareOp::IsNot => "IS NOT",
            CompareOp::In => "IN",
            CompareOp::NotIn => "NOT IN",
        }
    }
}

/// An operand of a comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Possibly qualified column reference, parts as written.
    Column(Vec<String>),
    /// String, number, `NULL`, `TRUE` or `FALSE`.
    Literal(String),
    /// `?` bind parameter.
    Param,
    /// Function call, arguments kept as written.
    Call { name: String, args: String },
    /// Parenthesized value list.
    List(Vec<Operand>),
    /// Parenthesized sub-select.
    Subquery,
}

/// A join condition expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Compare {
        lhs: Operand,
        op: CompareOp,
        rhs: Operand,
    },
    Not(Box<Expr>),
    Nested(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Column(parts) => f.write_str(&parts.join(".")),
            Operand::Literal(text) => f.write_str(text),
            Operand::Param => f.write_str("?"),
            Operand::Call { name, args } => write!(f, "{name}({args})"),
            Operand::List(values) => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
            Operand::Subquery => f.write_str("(<subquery>)"),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare { lhs, op, rhs } => write!(f, "{lhs} {} {rhs}", op.as_str()),
            Expr::Not(inner) => write!(f, "NOT {inner}"),
            Expr::Nested(inner) => write!(f, "({inner})"),
            Expr::And(lhs, rhs) => write!(f, "{lhs} AND {rhs}"),
            Expr::Or(lhs, rhs) => write!(f, "{lhs} OR {rhs}"),
        }
    }
}

/// Parse the table references occupying `items` of `frame`.
///
/// `max_joins` bounds the number of join steps accepted.
pub(crate) fn parse_table_refs(
    frame: &Frame<'_>,
    items: Range<usize>,
    max_joins: usize,
) -> Result<JoinChain, RewriteError> {
    let mut cursor = Cursor {
        frame,
        pos: items.start,
        end: items.end,
        nesting: 0,
    };

    let left = cursor.table_ref().map_err(|e| match e {
        RewriteError::ParseFailure { reason } => {
            RewriteError::parse(format!("left-most table: {reason}"))
        }
        other => other,
    })?;

    let mut steps = Vec::new();
    while !cursor.at_end() {
        if steps.len() == max_joins {
            return Err(RewriteError::TooManyJoins { limit: max_joins });
        }
        let step_start = cursor.pos;
        let Some(kind) = cursor.join_op() else {
            return Err(cursor.unexpected("expected a join"));
        };
        let keyword_items = step_start..cursor.pos;
        let table = cursor.table_ref()?;
        let condition = cursor.join_condition()?;
        steps.push(JoinStep {
            kind,
            table,
            condition,
            keyword_items,
            items: step_start..cursor.pos,
        });
    }

    Ok(JoinChain { left, steps })
}

struct Cursor<'f, 's> {
    frame: &'f Frame<'s>,
    pos: usize,
    end: usize,
    nesting: usize,
}

impl Cursor<'_, '_> {
    fn at_end(&self) -> bool {
        self.pos >= self.end
    }

    fn kind(&self) -> Option<TokenKind> {
        if self.at_end() {
            None
        } else {
            self.frame.kind(self.pos)
        }
    }

    fn is_word(&self, keyword: &str) -> bool {
        !self.at_end() && self.frame.is_word(self.pos, keyword)
    }

    fn eat_word(&mut self, keyword: &str) -> bool {
        let matched = self.is_word(keyword);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn eat_kind(&mut self, kind: TokenKind) -> bool {
        let matched = self.kind() == Some(kind);
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn is_subquery(&self) -> bool {
        !self.at_end() && matches!(self.frame.items[self.pos], Item::Subquery(_))
    }

    /// Run `parse` one nesting level down.
    fn nested<T>(
        &mut self,
        parse: impl FnOnce(&mut Self) -> Result<T, RewriteError>,
    ) -> Result<T, RewriteError> {
        if self.nesting == MAX_CONDITION_NESTING {
            return Err(RewriteError::parse(format!(
                "join condition nested deeper than {MAX_CONDITION_NESTING} levels"
            )));
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    fn unexpected(&self, what: &str) -> RewriteError {
        if self.at_end() {
            RewriteError::parse(format!("{what}, found end of table references"))
        } else {
            RewriteError::parse(format!("{what}, found `{}`", self.frame.text(self.pos)))
        }
    }

    /// Consume an identifier that is not a reserved word.
    fn identifier(&mut self) -> Option<String> {
        let kind = self.kind()?;
        let text = self.frame.text(self.pos);
        match kind {
            TokenKind::Quoted(_) => {}
            TokenKind::Word if !is_reserved(text) => {}
            _ => return None,
        }
        self.pos += 1;
        Some(text.to_string())
    }

    fn table_ref(&mut self) -> Result<TableRef, RewriteError> {
        let start = self.pos;
        let factor = if self.is_subquery() {
            self.pos += 1;
            TableFactor::Derived
        } else {
            let Some(mut name) = self.identifier() else {
                return Err(self.unexpected("expected a table name"));
            };
            while self.kind() == Some(TokenKind::Dot) {
                self.pos += 1;
                let Some(part) = self.identifier() else {
                    return Err(self.unexpected("expected a name after `.`"));
                };
                name.push('.');
                name.push_str(&part);
            }
            TableFactor::Named(name)
        };

        let alias = if self.eat_word("AS") {
            match self.identifier() {
                Some(alias) => Some(alias),
                None => return Err(self.unexpected("expected an alias after AS")),
            }
        } else {
            self.identifier()
        };

        Ok(TableRef {
            factor,
            alias,
            items: start..self.pos,
        })
    }

    fn join_op(&mut self) -> Option<JoinKind> {
        if self.eat_kind(TokenKind::Comma) {
            return Some(JoinKind::Comma);
        }
        let (kind, words) = JoinKind::KEYWORD_FORMS
            .iter()
            .find(|(_, words)| {
                self.pos + words.len() <= self.end && self.frame.is_words(self.pos, words)
            })
            .copied()?;
        self.pos += words.len();
        Some(kind)
    }

    fn join_condition(&mut self) -> Result<Option<JoinCondition>, RewriteError> {
        if self.eat_word("ON") {
            let start = self.pos;
            let expr = self.expr()?;
            return Ok(Some(JoinCondition::On {
                expr,
                items: start..self.pos,
            }));
        }

        if self.eat_word("USING") {
            if !self.eat_kind(TokenKind::LParen) {
                return Err(self.unexpected("expected `(` after USING"));
            }
            let mut columns = Vec::new();
            loop {
                match self.identifier() {
                    Some(column) => columns.push(column),
                    None => return Err(self.unexpected("expected a column in USING")),
                }
                if !self.eat_kind(TokenKind::Comma) {
                    break;
                }
            }
            if !self.eat_kind(TokenKind::RParen) {
                return Err(self.unexpected("expected `)` closing USING"));
            }
            return Ok(Some(JoinCondition::Using { columns }));
        }

        Ok(None)
    }

    fn expr(&mut self) -> Result<Expr, RewriteError> {
        let mut expr = self.term()?;
        loop {
            if self.eat_word("AND") || self.eat_operator("&&") {
                expr = Expr::And(Box::new(expr), Box::new(self.term()?));
            } else if self.eat_word("OR") || self.eat_operator("||") {
                expr = Expr::Or(Box::new(expr), Box::new(self.term()?));
            } else {
                return Ok(expr);
            }
        }
    }

    fn term(&mut self) -> Result<Expr, RewriteError> {
        if self.eat_word("NOT") {
            return Ok(Expr::Not(Box::new(self.nested(Self::term)?)));
        }
        if self.eat_kind(TokenKind::LParen) {
            let inner = self.nested(Self::expr)?;
            if !self.eat_kind(TokenKind::RParen) {
                return Err(self.unexpected("expected `)` in join condition"));
            }
            return Ok(Expr::Nested(Box::new(inner)));
        }

        let lhs = self.operand()?;
        let op = self.compare_op()?;
        let rhs = self.operand()?;
        Ok(Expr::Compare { lhs, op, rhs })
    }

    fn eat_operator(&mut self, op: &str) -> bool {
        let matched = self.kind() == Some(TokenKind::Operator) && self.frame.text(self.pos) == op;
        if matched {
            self.pos += 1;
        }
        matched
    }

    fn compare_op(&mut self) -> Result<CompareOp, RewriteError> {
        if self.kind() == Some(TokenKind::Operator) {
            if let Some(op) = CompareOp::from_operator(self.frame.text(self.pos)) {
                self.pos += 1;
                return Ok(op);
            }
        }
        if self.eat_word("IS") {
            return Ok(if self.eat_word("NOT") {
                CompareOp::IsNot
            } else {
                CompareOp::Is
            });
        }
        if self.eat_word("LIKE") {
            return Ok(CompareOp::Like);
        }
        if self.eat_word("IN") {
            return Ok(CompareOp::In);
        }
        if self.is_word("NOT") {
            let save = self.pos;
            self.pos += 1;
            if self.eat_word("LIKE") {
                return Ok(CompareOp::NotLike);
            }
            if self.eat_word("IN") {
                return Ok(CompareOp::NotIn);
            }
            self.pos = save;
        }
        Err(self.unexpected("expected a comparison operator"))
    }

    fn operand(&mut self) -> Result<Operand, RewriteError> {
        if self.is_subquery() {
            self.pos += 1;
            return Ok(Operand::Subquery);
        }

        let Some(kind) = self.kind() else {
            return Err(self.unexpected("expected an operand"));
        };
        let text = self.frame.text(self.pos);
        match kind {
            TokenKind::Number => {
                self.pos += 1;
                Ok(Operand::Literal(text.to_string()))
            }
            TokenKind::Param => {
                self.pos += 1;
                Ok(Operand::Param)
            }
            TokenKind::Operator if matches!(text, "-" | "+") => {
                if self.pos + 1 >= self.end || self.frame.kind(self.pos + 1) != Some(TokenKind::Number)
                {
                    return Err(self.unexpected("expected an operand"));
                }
                let number = self.frame.text(self.pos + 1);
                self.pos += 2;
                Ok(Operand::Literal(format!("{text}{number}")))
            }
            TokenKind::LParen => {
                self.pos += 1;
                let mut values = Vec::new();
                loop {
                    values.push(self.nested(Self::operand)?);
                    if !self.eat_kind(TokenKind::Comma) {
                        break;
                    }
                }
                if !self.eat_kind(TokenKind::RParen) {
                    return Err(self.unexpected("expected `)` closing value list"));
                }
                Ok(Operand::List(values))
            }
            TokenKind::Word
                if ["NULL", "TRUE", "FALSE", "UNKNOWN"]
                    .iter()
                    .any(|w| w.eq_ignore_ascii_case(text)) =>
            {
                self.pos += 1;
                Ok(Operand::Literal(text.to_ascii_uppercase()))
            }
            TokenKind::Quoted(quote)
                if quote != '`' && self.frame.kind(self.pos + 1) != Some(TokenKind::Dot) =>
            {
                self.pos += 1;
                Ok(Operand::Literal(text.to_string()))
            }
            TokenKind::Word | TokenKind::Quoted(_) => self.column_or_call(),
            _ => Err(self.unexpected("expected an operand")),
        }
    }

    fn column_or_call(&mut self) -> Result<Operand, RewriteError> {
        let Some(first) = self.identifier() else {
            return Err(self.unexpected("expected an operand"));
        };

        if self.kind() == Some(TokenKind::LParen) {
            let open = self.pos;
            let mut depth = 0usize;
            while !self.at_end() {
                match self.kind() {
                    Some(TokenKind::LParen) => depth += 1,
                    Some(TokenKind::RParen) => {
                        depth -= 1;
                        if depth == 0 {
                            break;
                        }
                    }
                    _ => {}
                }
                self.pos += 1;
            }
            if self.at_end() {
                return Err(self.unexpected("expected `)` closing function call"));
            }
            let args = if self.pos > open + 1 {
                self.frame.render_items(&(open + 1..self.pos))
            } else {
                String::new()
            };
            self.pos += 1;
            return Ok(Operand::Call { name: first, args });
        }

        let mut parts = vec![first];
        while self.kind() == Some(TokenKind::Dot) {
            self.pos += 1;
            match self.identifier() {
                Some(part) => parts.push(part),
                None => return Err(self.unexpected("expected a column name after `.`")),
            }
        }
        Ok(Operand::Column(parts))
    }
}
