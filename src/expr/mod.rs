mod parse;

use derive_more::Display;
use std::fmt;

///
/// FilterOp
///
/// Filter operator vocabulary. Logical operators are recognized so that
/// chained predicates have a shape the engine can detect and reject;
/// their evaluation semantics are out of scope.
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum FilterOp {
    #[display("eq")]
    Eq,
    #[display("ne")]
    Ne,
    #[display("co")]
    Co,
    #[display("sw")]
    Sw,
    #[display("ew")]
    Ew,
    #[display("pr")]
    Pr,
    #[display("and")]
    And,
    #[display("or")]
    Or,
}

impl FilterOp {
    // Operator words compare case-insensitively.
    pub(crate) fn from_word(word: &str) -> Option<Self> {
        const OPS: [FilterOp; 8] = [
            FilterOp::Eq,
            FilterOp::Ne,
            FilterOp::Co,
            FilterOp::Sw,
            FilterOp::Ew,
            FilterOp::Pr,
            FilterOp::And,
            FilterOp::Or,
        ];

        OPS.into_iter()
            .find(|op| op.to_string().eq_ignore_ascii_case(word))
    }
}

///
/// ExprKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ExprKind {
    Path,
    Operator(FilterOp),
    Literal,
}

///
/// Expression
///
/// One node of a parsed path-and-filter query. Path segments and filter
/// predicates share one linked structure: `next` is the next path segment,
/// or the next predicate of a conjunction inside a filter. `left`/`right`
/// are populated on operator nodes only. The first predicate of a
/// bracketed filter carries the filter-root mark.
///

#[derive(Clone, Debug)]
pub struct Expression {
    token: String,
    kind: ExprKind,
    filter_root: bool,
    next: Option<Box<Expression>>,
    left: Option<Box<Expression>>,
    right: Option<Box<Expression>>,
}

impl Expression {
    /// Parse a path-and-filter query such as `emails[type eq "work"].value`.
    pub fn parse(input: &str) -> Result<Self, crate::error::TraverseError> {
        parse::parse(input)
    }

    pub(crate) fn path(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: ExprKind::Path,
            filter_root: false,
            next: None,
            left: None,
            right: None,
        }
    }

    pub(crate) fn literal(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            kind: ExprKind::Literal,
            filter_root: false,
            next: None,
            left: None,
            right: None,
        }
    }

    pub(crate) fn operator(op: FilterOp, left: Self, right: Option<Self>) -> Self {
        Self {
            token: op.to_string(),
            kind: ExprKind::Operator(op),
            filter_root: false,
            next: None,
            left: Some(Box::new(left)),
            right: right.map(Box::new),
        }
    }

    pub(crate) const fn mark_filter_root(mut self) -> Self {
        self.filter_root = true;
        self
    }

    pub(crate) fn set_next(&mut self, next: Option<Self>) {
        self.next = next.map(Box::new);
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub const fn kind(&self) -> ExprKind {
        self.kind
    }

    #[must_use]
    pub fn next(&self) -> Option<&Self> {
        self.next.as_deref()
    }

    #[must_use]
    pub fn left(&self) -> Option<&Self> {
        self.left.as_deref()
    }

    #[must_use]
    pub fn right(&self) -> Option<&Self> {
        self.right.as_deref()
    }

    /// Whether this node begins a bracketed filter.
    #[must_use]
    pub const fn is_root_of_filter(&self) -> bool {
        self.filter_root
    }

    #[must_use]
    pub const fn is_path(&self) -> bool {
        matches!(self.kind, ExprKind::Path)
    }

    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self.kind, ExprKind::Literal)
    }

    #[must_use]
    pub const fn is_operator(&self, op: FilterOp) -> bool {
        matches!(self.kind, ExprKind::Operator(found) if found as u8 == op as u8)
    }
}

// Render a left-operand attribute path (path nodes linked via `next`).
fn render_attr_path(expr: &Expression) -> String {
    let mut out = String::from(expr.token());
    let mut node = expr.next();
    while let Some(seg) = node {
        if !seg.is_path() {
            break;
        }
        out.push('.');
        out.push_str(seg.token());
        node = seg.next();
    }

    out
}

/// Node-local rendering for error messages: a predicate displays as
/// `left op right`, without following the outer `next` chain.
impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ExprKind::Path | ExprKind::Literal => f.write_str(&self.token),
            ExprKind::Operator(op) => {
                let left = self
                    .left()
                    .map_or_else(|| "?".to_string(), render_attr_path);
                match self.right() {
                    Some(right) => write!(f, "{left} {op} {}", right.token()),
                    None => write!(f, "{left} {op}"),
                }
            }
        }
    }
}
