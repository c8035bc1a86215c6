//! scimpath: a traversal-and-filter engine over schema-typed resource
//! documents, driven by path-and-filter queries such as
//! `emails[type eq "work"].value`. It is the core behind attribute-level
//! PATCH-style read/write operations: callers pick a traversal mode,
//! hand over a parsed query, and receive a navigator positioned at every
//! matched node.
#![warn(unreachable_pub)]

pub mod error;
pub mod expr;
pub mod filter;
pub mod navigate;
pub mod property;
pub mod schema;
pub mod traverse;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_fixtures;

///
/// Prelude
///
/// Domain vocabulary only; no helpers or internals are re-exported here.
///

pub mod prelude {
    pub use crate::{
        error::TraverseError,
        expr::Expression,
        navigate::Navigator,
        property::Property,
        schema::{Attribute, AttributeKind, annotation},
        traverse::{traverse, traverse_add_by_eq_filter, traverse_primary_or_first},
        value::Value,
    };
}
