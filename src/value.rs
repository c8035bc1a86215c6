use crate::schema::AttributeKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

///
/// Value
///
/// Closed tagged value for scalar attributes. Every value flowing through
/// the engine after literal normalization carries a known kind; `Absent`
/// stands for an unassigned attribute (there is no untyped raw value).
///

#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum Value {
    String(String),
    Boolean(bool),
    Integer(i64),
    Decimal(f64),
    DateTime(DateTime<Utc>),
    Reference(String),
    Absent,
}

impl Value {
    #[must_use]
    pub const fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Whether the value is assignable to an attribute of the given kind.
    /// `Absent` conforms to every scalar kind; nothing conforms to
    /// `Complex`.
    #[must_use]
    pub const fn conforms_to(&self, kind: AttributeKind) -> bool {
        match self {
            Self::Absent => !matches!(kind, AttributeKind::Complex),
            Self::String(_) => matches!(kind, AttributeKind::String),
            Self::Boolean(_) => matches!(kind, AttributeKind::Boolean),
            Self::Integer(_) => matches!(kind, AttributeKind::Integer),
            Self::Decimal(_) => matches!(kind, AttributeKind::Decimal),
            Self::DateTime(_) => matches!(kind, AttributeKind::DateTime),
            Self::Reference(_) => matches!(kind, AttributeKind::Reference),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}
