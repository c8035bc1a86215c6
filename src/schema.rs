use derive_more::Display;
use serde::Serialize;
use std::{collections::BTreeSet, sync::Arc};

///
/// Annotations
///
/// Free-form markers attached to attribute definitions. The engine only
/// interprets [`PRIMARY`], which designates the boolean sub-attribute
/// marking the canonical element of a multi-valued collection.
///

pub mod annotation {
    pub const PRIMARY: &str = "@primary";
}

///
/// AttributeKind
///

#[derive(Clone, Copy, Debug, Display, Eq, PartialEq, Serialize)]
pub enum AttributeKind {
    #[display("string")]
    String,
    #[display("boolean")]
    Boolean,
    #[display("integer")]
    Integer,
    #[display("decimal")]
    Decimal,
    #[display("dateTime")]
    DateTime,
    #[display("reference")]
    Reference,
    #[display("complex")]
    Complex,
}

///
/// Attribute
///
/// Schema metadata for one value: name, kind, cardinality, sub-structure
/// and annotations. Immutable for the lifetime of a traversal; shared via
/// `Arc` between the schema and every property conforming to it.
///

#[derive(Clone, Debug, Serialize)]
pub struct Attribute {
    name: String,
    kind: AttributeKind,
    multi_valued: bool,
    sub_attributes: Vec<Arc<Attribute>>,
    annotations: BTreeSet<String>,
}

impl Attribute {
    #[must_use]
    pub fn new(name: impl Into<String>, kind: AttributeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            multi_valued: false,
            sub_attributes: Vec::new(),
            annotations: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn string(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::String)
    }

    #[must_use]
    pub fn boolean(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Boolean)
    }

    #[must_use]
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Integer)
    }

    #[must_use]
    pub fn decimal(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Decimal)
    }

    #[must_use]
    pub fn date_time(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::DateTime)
    }

    #[must_use]
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(name, AttributeKind::Reference)
    }

    #[must_use]
    pub fn complex(name: impl Into<String>, sub_attributes: Vec<Self>) -> Self {
        let mut attr = Self::new(name, AttributeKind::Complex);
        attr.sub_attributes = sub_attributes.into_iter().map(Arc::new).collect();
        attr
    }

    /// Mark the attribute as multi-valued. Consuming builder step.
    #[must_use]
    pub const fn multi(mut self) -> Self {
        self.multi_valued = true;
        self
    }

    /// Attach an annotation. Consuming builder step.
    #[must_use]
    pub fn annotate(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn kind(&self) -> AttributeKind {
        self.kind
    }

    #[must_use]
    pub const fn multi_valued(&self) -> bool {
        self.multi_valued
    }

    #[must_use]
    pub fn sub_attributes(&self) -> &[Arc<Self>] {
        &self.sub_attributes
    }

    #[must_use]
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// Look up a sub-attribute by name. Attribute names compare
    /// case-insensitively.
    #[must_use]
    pub fn sub_attribute(&self, name: &str) -> Option<&Arc<Self>> {
        self.find_sub_attribute(|sub| sub.name.eq_ignore_ascii_case(name))
    }

    #[must_use]
    pub fn find_sub_attribute(&self, pred: impl Fn(&Self) -> bool) -> Option<&Arc<Self>> {
        self.sub_attributes.iter().find(|sub| pred(sub.as_ref()))
    }

    /// The boolean sub-attribute carrying the primary annotation, if any.
    #[must_use]
    pub fn primary_marker(&self) -> Option<&Arc<Self>> {
        self.find_sub_attribute(|sub| {
            sub.kind == AttributeKind::Boolean && sub.has_annotation(annotation::PRIMARY)
        })
    }

    /// Derive the singular attribute that elements of a multi-valued
    /// collection conform to.
    #[must_use]
    pub fn element_attr(&self) -> Arc<Self> {
        Arc::new(Self {
            multi_valued: false,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emails() -> Attribute {
        Attribute::complex(
            "emails",
            vec![
                Attribute::string("type"),
                Attribute::string("value"),
                Attribute::boolean("primary").annotate(annotation::PRIMARY),
            ],
        )
        .multi()
    }

    #[test]
    fn sub_attribute_lookup_is_case_insensitive() {
        let attr = emails();

        assert_eq!(attr.sub_attribute("Value").map(|a| a.name()), Some("value"));
        assert!(attr.sub_attribute("missing").is_none());
    }

    #[test]
    fn primary_marker_requires_boolean_kind() {
        let attr = emails();
        assert_eq!(attr.primary_marker().map(|a| a.name()), Some("primary"));

        let no_marker = Attribute::complex(
            "emails",
            vec![
                Attribute::string("type"),
                // annotated but not boolean, so not a marker
                Attribute::string("primary").annotate(annotation::PRIMARY),
            ],
        )
        .multi();
        assert!(no_marker.primary_marker().is_none());
    }

    #[test]
    fn element_attr_drops_cardinality_only() {
        let attr = emails();
        let elem = attr.element_attr();

        assert!(!elem.multi_valued());
        assert_eq!(elem.name(), "emails");
        assert_eq!(elem.kind(), AttributeKind::Complex);
        assert_eq!(elem.sub_attributes().len(), 3);
    }
}
