use thiserror::Error as ThisError;

///
/// TraverseError
///
/// Error taxonomy for path traversal and filter evaluation. Each variant
/// carries the offending path or filter string plus a human-readable
/// detail, so protocol layers can map them to distinct responses.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum TraverseError {
    /// Navigator descent failed for a reason other than a missing
    /// attribute, e.g. indexing a non-collection.
    #[error("invalid path '{path}': {detail}")]
    InvalidPath { path: String, detail: String },

    /// The filter is malformed or not applicable at the current node.
    #[error("invalid filter '{filter}': {detail}")]
    InvalidFilter { filter: String, detail: String },

    /// A literal cannot be normalized to the target attribute's kind, or
    /// a value of the wrong kind was assigned to an attribute.
    #[error("invalid value for attribute '{attr}': {detail}")]
    InvalidType { attr: String, detail: String },

    /// A named path segment does not exist on the current complex node.
    #[error("no attribute '{name}' at '{path}'")]
    NoAttribute { name: String, path: String },

    /// A traversal invariant was broken. Programming-contract violation,
    /// not a data error.
    #[error("internal: {message}")]
    Internal { message: String },
}

impl TraverseError {
    pub(crate) fn invalid_path(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_filter(filter: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidFilter {
            filter: filter.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn invalid_type(attr: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::InvalidType {
            attr: attr.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn no_attribute(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::NoAttribute {
            name: name.into(),
            path: path.into(),
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn is_no_attribute(&self) -> bool {
        matches!(self, Self::NoAttribute { .. })
    }

    #[must_use]
    pub const fn is_invalid_filter(&self) -> bool {
        matches!(self, Self::InvalidFilter { .. })
    }
}
