use crate::{
    error::TraverseError,
    schema::{Attribute, AttributeKind},
    value::Value,
};
use std::sync::Arc;

///
/// Property
///
/// One value instance in the document tree, conforming to an attribute.
/// Complex nodes hold one child per sub-attribute in schema order;
/// multi-valued nodes hold their elements in insertion order. Index order
/// is stable across iterations until the node is mutated.
///

#[derive(Clone, Debug)]
pub struct Property {
    attr: Arc<Attribute>,
    node: Node,
}

#[derive(Clone, Debug)]
enum Node {
    Scalar(Value),
    Complex(Vec<Property>),
    Multi(Vec<Property>),
}

impl Property {
    /// Build an unassigned property conforming to `attr`. Complex nodes
    /// get an unassigned child for every sub-attribute; collections start
    /// empty.
    #[must_use]
    pub fn new(attr: Arc<Attribute>) -> Self {
        let node = if attr.multi_valued() {
            Node::Multi(Vec::new())
        } else if attr.kind() == AttributeKind::Complex {
            let children = attr
                .sub_attributes()
                .iter()
                .map(|sub| Self::new(Arc::clone(sub)))
                .collect();
            Node::Complex(children)
        } else {
            Node::Scalar(Value::Absent)
        };

        Self { attr, node }
    }

    #[must_use]
    pub const fn attribute(&self) -> &Arc<Attribute> {
        &self.attr
    }

    /// The scalar value, if this is a scalar node.
    #[must_use]
    pub const fn value(&self) -> Option<&Value> {
        match &self.node {
            Node::Scalar(v) => Some(v),
            Node::Complex(_) | Node::Multi(_) => None,
        }
    }

    /// Assign a scalar value, checking kind conformance.
    pub fn set_value(&mut self, value: Value) -> Result<(), TraverseError> {
        let kind = self.attr.kind();
        match &mut self.node {
            Node::Scalar(slot) => {
                if !value.conforms_to(kind) {
                    return Err(TraverseError::invalid_type(
                        self.attr.name(),
                        format!("value does not conform to {kind} attribute"),
                    ));
                }
                *slot = value;
                Ok(())
            }
            Node::Complex(_) | Node::Multi(_) => Err(TraverseError::invalid_type(
                self.attr.name(),
                "cannot assign a scalar to a complex or multi-valued attribute",
            )),
        }
    }

    /// Whether the property carries any data: a non-absent scalar, a
    /// complex node with an assigned child, or a non-empty collection.
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        match &self.node {
            Node::Scalar(v) => !v.is_absent(),
            Node::Complex(children) => children.iter().any(Self::is_assigned),
            Node::Multi(elements) => !elements.is_empty(),
        }
    }

    #[must_use]
    pub const fn child_count(&self) -> usize {
        match &self.node {
            Node::Scalar(_) => 0,
            Node::Complex(children) | Node::Multi(children) => children.len(),
        }
    }

    #[must_use]
    pub fn child_at(&self, index: usize) -> Option<&Self> {
        match &self.node {
            Node::Scalar(_) => None,
            Node::Complex(children) | Node::Multi(children) => children.get(index),
        }
    }

    pub(crate) fn child_at_mut(&mut self, index: usize) -> Option<&mut Self> {
        match &mut self.node {
            Node::Scalar(_) => None,
            Node::Complex(children) | Node::Multi(children) => children.get_mut(index),
        }
    }

    /// Look up a named child of a complex node, case-insensitively.
    #[must_use]
    pub fn sub_property(&self, name: &str) -> Option<&Self> {
        match &self.node {
            Node::Complex(children) => children
                .iter()
                .find(|child| child.attr.name().eq_ignore_ascii_case(name)),
            Node::Scalar(_) | Node::Multi(_) => None,
        }
    }

    pub fn sub_property_mut(&mut self, name: &str) -> Option<&mut Self> {
        match &mut self.node {
            Node::Complex(children) => children
                .iter_mut()
                .find(|child| child.attr.name().eq_ignore_ascii_case(name)),
            Node::Scalar(_) | Node::Multi(_) => None,
        }
    }

    /// Find the first child matching `pred`, with its index.
    #[must_use]
    pub fn find_child(&self, pred: impl Fn(&Self) -> bool) -> Option<(usize, &Self)> {
        match &self.node {
            Node::Scalar(_) => None,
            Node::Complex(children) | Node::Multi(children) => children
                .iter()
                .enumerate()
                .find(|&(_, child)| pred(child)),
        }
    }

    /// Build a fresh unassigned element for this collection.
    #[must_use]
    pub fn new_element(&self) -> Self {
        Self::new(self.attr.element_attr())
    }

    /// Append an element to a multi-valued node, returning its index.
    pub fn add_element(&mut self, element: Self) -> Result<usize, TraverseError> {
        match &mut self.node {
            Node::Multi(elements) => {
                elements.push(element);
                Ok(elements.len() - 1)
            }
            Node::Scalar(_) | Node::Complex(_) => Err(TraverseError::invalid_path(
                self.attr.name(),
                "cannot append to a singular attribute",
            )),
        }
    }
}
