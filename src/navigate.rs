use crate::{
    error::TraverseError,
    property::Property,
    schema::AttributeKind,
};
use tracing::trace;

///
/// PathSegment
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

// Render a base name plus descended segments as a dotted/bracketed path.
fn render_path(base: &str, segments: &[PathSegment]) -> String {
    use std::fmt::Write;

    let mut out = String::from(base);
    for seg in segments {
        match seg {
            PathSegment::Field(name) => {
                if !out.is_empty() {
                    out.push('.');
                }
                out.push_str(name);
            }
            PathSegment::Index(index) => {
                let _ = write!(out, "[{index}]");
            }
        }
    }

    out
}

///
/// Navigator
///
/// Stateful cursor over one property tree. Holds the exclusive borrow of
/// the root for the duration of a traversal; every recursion frame aliases
/// this one cursor, never concurrently. Descent pushes a segment, and the
/// returned [`Descent`] guard pops it again when the frame exits, on both
/// the success and the error path.
///

#[derive(Debug)]
pub struct Navigator<'p> {
    root: &'p mut Property,
    stack: Vec<PathSegment>,
}

impl<'p> Navigator<'p> {
    #[must_use]
    pub fn new(root: &'p mut Property) -> Self {
        Self {
            root,
            stack: Vec::new(),
        }
    }

    /// Current depth below the root.
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Rendered position, e.g. `emails[1].value`.
    #[must_use]
    pub fn path(&self) -> String {
        render_path(self.root.attribute().name(), &self.stack)
    }

    /// The property at the cursor position.
    #[must_use]
    pub fn current(&self) -> &Property {
        let mut node: &Property = &*self.root;
        for seg in &self.stack {
            node = match seg {
                PathSegment::Field(name) => node.sub_property(name),
                PathSegment::Index(index) => node.child_at(*index),
            }
            .unwrap_or_else(|| unreachable!("navigator stack desynced from property tree"));
        }

        node
    }

    /// Mutable access to the property at the cursor position.
    pub fn current_mut(&mut self) -> &mut Property {
        let mut node: &mut Property = &mut *self.root;
        for seg in &self.stack {
            node = match seg {
                PathSegment::Field(name) => node.sub_property_mut(name),
                PathSegment::Index(index) => node.child_at_mut(*index),
            }
            .unwrap_or_else(|| unreachable!("navigator stack desynced from property tree"));
        }

        node
    }

    /// Descend into the named sub-attribute of the current complex node.
    pub fn dot(&mut self, name: &str) -> Result<Descent<'_, 'p>, TraverseError> {
        let attr = self.current().attribute();
        if attr.multi_valued() || attr.kind() != AttributeKind::Complex {
            return Err(TraverseError::invalid_path(
                self.path(),
                format!("cannot descend by name '{name}' into a non-complex value"),
            ));
        }

        // canonical schema casing keeps rendered paths stable
        let Some(sub) = attr.sub_attribute(name) else {
            return Err(TraverseError::no_attribute(name, self.path()));
        };
        let canonical = sub.name().to_string();

        trace!(path = %self.path(), field = %canonical, "descend");
        self.stack.push(PathSegment::Field(canonical));

        Ok(Descent { nav: self })
    }

    /// Descend into the indexed element of the current multi-valued node.
    pub fn at(&mut self, index: usize) -> Result<Descent<'_, 'p>, TraverseError> {
        let current = self.current();
        if !current.attribute().multi_valued() {
            return Err(TraverseError::invalid_path(
                self.path(),
                format!("cannot index [{index}] into a singular attribute"),
            ));
        }
        if index >= current.child_count() {
            return Err(TraverseError::invalid_path(
                self.path(),
                format!(
                    "index {index} out of range for {} elements",
                    current.child_count()
                ),
            ));
        }

        trace!(path = %self.path(), index, "descend");
        self.stack.push(PathSegment::Index(index));

        Ok(Descent { nav: self })
    }

    /// Append a new element to the current multi-valued node, returning
    /// its index.
    pub fn add(&mut self, element: Property) -> Result<usize, TraverseError> {
        if !self.current().attribute().multi_valued() {
            return Err(TraverseError::invalid_path(
                self.path(),
                "cannot append to a singular attribute",
            ));
        }

        self.current_mut().add_element(element)
    }

    fn retract(&mut self) {
        debug_assert!(!self.stack.is_empty(), "retract below root");
        self.stack.pop();
    }
}

///
/// Descent
///
/// Scope guard pairing one successful descent with exactly one retract.
/// All navigation inside the guarded frame goes through [`Descent::nav`].
///

#[derive(Debug)]
pub struct Descent<'n, 'p> {
    nav: &'n mut Navigator<'p>,
}

impl<'p> Descent<'_, 'p> {
    pub fn nav(&mut self) -> &mut Navigator<'p> {
        self.nav
    }
}

impl Drop for Descent<'_, '_> {
    fn drop(&mut self) {
        self.nav.retract();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{email, emails_property};

    #[test]
    fn descent_guard_retracts_on_drop() {
        let mut root = emails_property(vec![email("home", "a@x", None)]);
        let mut nav = Navigator::new(&mut root);

        {
            let mut elem = nav.at(0).unwrap();
            assert_eq!(elem.nav().depth(), 1);
            let value = elem.nav().dot("value").unwrap();
            drop(value);
            assert_eq!(elem.nav().depth(), 1);
        }

        assert_eq!(nav.depth(), 0);
    }

    #[test]
    fn dot_reports_missing_attribute_with_position() {
        let mut root = emails_property(vec![email("home", "a@x", None)]);
        let mut nav = Navigator::new(&mut root);

        let mut elem = nav.at(0).unwrap();
        let err = elem.nav().dot("nope").unwrap_err();
        assert_eq!(
            err,
            TraverseError::no_attribute("nope", "emails[0]")
        );

        // failed descent leaves depth untouched
        assert_eq!(elem.nav().depth(), 1);
    }

    #[test]
    fn at_rejects_singular_and_out_of_range() {
        let mut root = emails_property(vec![email("home", "a@x", None)]);
        let mut nav = Navigator::new(&mut root);

        assert!(matches!(
            nav.at(3).unwrap_err(),
            TraverseError::InvalidPath { .. }
        ));

        let mut elem = nav.at(0).unwrap();
        assert!(matches!(
            elem.nav().at(0).unwrap_err(),
            TraverseError::InvalidPath { .. }
        ));
    }

    #[test]
    fn rendered_path_uses_canonical_casing() {
        let mut root = emails_property(vec![email("home", "a@x", None)]);
        let mut nav = Navigator::new(&mut root);

        let mut elem = nav.at(0).unwrap();
        let mut value = elem.nav().dot("VALUE").unwrap();
        assert_eq!(value.nav().path(), "emails[0].value");
    }
}
