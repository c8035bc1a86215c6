use crate::{
    error::TraverseError,
    expr::{Expression, FilterOp},
    filter,
    navigate::Navigator,
    property::Property,
    value::Value,
};
use tracing::{debug, trace};

///
/// Traversal entry points
///
/// A traversal recursively narrows the navigator's position along the
/// query, consulting the filter evaluator at bracketed predicates, and
/// invokes `on_reach` wherever the traverse strategy declares the query
/// satisfied. The first error from any point of the descent aborts the
/// whole traversal; a filter predicate that does not hold merely skips
/// that element. Mutations applied by `on_reach` to earlier matches are
/// not rolled back when a later match fails.
///

/// Default walk: `on_reach` fires once per fully matched node.
pub fn traverse(
    root: &mut Property,
    query: &Expression,
    mut on_reach: impl FnMut(&mut Navigator) -> Result<(), TraverseError>,
) -> Result<(), TraverseError> {
    let mut cb = |nav: &mut Navigator<'_>, _query: Option<&Expression>| on_reach(nav);
    let mut nav = Navigator::new(root);

    Traverser {
        callback: &mut cb,
        element_strategy: ElementStrategy::SelectAll,
        traverse_strategy: TraverseStrategy::All,
    }
    .traverse(&mut nav, Some(query))
}

/// A single Eq filter can be used to add a new element. When the walk
/// reaches a qualifying `[sub eq literal].target` filter, a fresh element
/// `{target: value, sub: literal}` is appended to the collection and
/// `on_reach` fires on the new target node:
///
/// ```text
/// add "foo@bar.com" at emails[type eq "work"].value
///   => emails: [{ "type": "work", "value": "foo@bar.com" }]
/// ```
pub fn traverse_add_by_eq_filter(
    value: Value,
    root: &mut Property,
    query: &Expression,
    mut on_reach: impl FnMut(&mut Navigator) -> Result<(), TraverseError>,
) -> Result<(), TraverseError> {
    validate_single_eq_chain(query)?;

    let mut cb = |nav: &mut Navigator<'_>, query: Option<&Expression>| {
        let composed = compose_value_by_eq_filter(&value, query, nav)?;
        debug!(path = %nav.path(), target = %composed.target, "implicit add");

        let index = nav.add(composed.element)?;
        let mut elem = nav.at(index)?;
        let mut target = elem.nav().dot(&composed.target)?;
        on_reach(target.nav())
    };
    let mut nav = Navigator::new(root);

    Traverser {
        callback: &mut cb,
        element_strategy: ElementStrategy::SelectAll,
        traverse_strategy: TraverseStrategy::SingleEqFilter,
    }
    .traverse(&mut nav, Some(query))
}

/// As [`traverse`], but multi-valued collections are narrowed to the
/// element marked primary, or the first element when none is marked.
pub fn traverse_primary_or_first(
    root: &mut Property,
    query: &Expression,
    mut on_reach: impl FnMut(&mut Navigator) -> Result<(), TraverseError>,
) -> Result<(), TraverseError> {
    let mut cb = |nav: &mut Navigator<'_>, _query: Option<&Expression>| on_reach(nav);
    let mut nav = Navigator::new(root);

    Traverser {
        callback: &mut cb,
        element_strategy: ElementStrategy::PrimaryOrFirst,
        traverse_strategy: TraverseStrategy::All,
    }
    .traverse(&mut nav, Some(query))
}

///
/// Traverser
///
/// Per-invocation configuration of the recursive descent. The config is
/// immutable across the call tree while the navigator it runs on is
/// mutated in place; every frame aliases the same cursor through an
/// exclusive borrow.
///

type TraverseCb<'c> =
    &'c mut dyn FnMut(&mut Navigator<'_>, Option<&Expression>) -> Result<(), TraverseError>;

struct Traverser<'c> {
    callback: TraverseCb<'c>,
    element_strategy: ElementStrategy,
    traverse_strategy: TraverseStrategy,
}

impl Traverser<'_> {
    fn traverse(
        &mut self,
        nav: &mut Navigator<'_>,
        query: Option<&Expression>,
    ) -> Result<(), TraverseError> {
        if self.traverse_strategy.done(nav, query) {
            trace!(path = %nav.path(), "target reached");
            return (self.callback)(nav, query);
        }

        // both strategies terminate on an exhausted query
        let Some(query) = query else {
            return Err(TraverseError::internal(
                "query exhausted before the traverse strategy terminated",
            ));
        };

        if query.is_root_of_filter() {
            if !nav.current().attribute().multi_valued() {
                return Err(TraverseError::invalid_filter(
                    query.to_string(),
                    "filter applied to singular attribute",
                ));
            }
            return self.traverse_qualified_elements(nav, query);
        }

        if nav.current().attribute().multi_valued() {
            return self.traverse_selected_elements(nav, query);
        }

        self.traverse_next(nav, query)
    }

    // Consume one named path segment.
    fn traverse_next(
        &mut self,
        nav: &mut Navigator<'_>,
        query: &Expression,
    ) -> Result<(), TraverseError> {
        let mut frame = nav.dot(query.token())?;

        self.traverse(frame.nav(), query.next())
    }

    // Fan out over the elements picked by the element strategy. The
    // multi-valued segment itself is not consumed; selection happens at
    // this level.
    fn traverse_selected_elements(
        &mut self,
        nav: &mut Navigator<'_>,
        query: &Expression,
    ) -> Result<(), TraverseError> {
        let selection = self.element_strategy.select(nav.current());
        let count = nav.current().child_count();

        for index in 0..count {
            if !selection.selects(index) {
                continue;
            }

            let mut frame = nav.at(index)?;
            self.traverse(frame.nav(), Some(query))?;
        }

        Ok(())
    }

    // Fan out over the elements satisfying the active filter. Evaluation
    // errors abort the traversal; a non-matching element is skipped.
    // Iteration short-circuits on the first failing match.
    fn traverse_qualified_elements(
        &mut self,
        nav: &mut Navigator<'_>,
        filter: &Expression,
    ) -> Result<(), TraverseError> {
        let count = nav.current().child_count();

        for index in 0..count {
            let mut frame = nav.at(index)?;
            if !filter::evaluate(frame.nav().current(), filter)? {
                continue;
            }

            self.traverse(frame.nav(), filter.next())?;
        }

        Ok(())
    }
}

///
/// ElementStrategy
///
/// Which sibling elements of a multi-valued node participate in the walk
/// when no filter is active. Stateless and deterministic; the two
/// policies are a closed set.
///

#[derive(Clone, Copy, Debug)]
pub(crate) enum ElementStrategy {
    SelectAll,
    PrimaryOrFirst,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Selection {
    All,
    Only(usize),
}

impl Selection {
    pub(crate) const fn selects(self, index: usize) -> bool {
        match self {
            Self::All => true,
            Self::Only(only) => only == index,
        }
    }
}

impl ElementStrategy {
    pub(crate) fn select(self, collection: &Property) -> Selection {
        match self {
            Self::SelectAll => Selection::All,
            Self::PrimaryOrFirst => {
                if let Some(marker) = collection.attribute().primary_marker()
                    && let Some((index, _)) = collection.find_child(|child| {
                        child.sub_property(marker.name()).and_then(Property::value)
                            == Some(&Value::Boolean(true))
                    })
                {
                    return Selection::Only(index);
                }

                Selection::Only(0)
            }
        }
    }
}

///
/// TraverseStrategy
///
/// When the recursive descent terminates and the callback fires.
///

#[derive(Clone, Copy, Debug)]
pub(crate) enum TraverseStrategy {
    /// Terminate once the query chain is fully consumed.
    All,
    /// Terminate on an exhausted query, or at the root of a qualifying
    /// single-Eq filter with exactly one trailing path segment. Any other
    /// shape falls through to ordinary filtered traversal.
    SingleEqFilter,
}

impl TraverseStrategy {
    pub(crate) fn done(self, nav: &Navigator<'_>, query: Option<&Expression>) -> bool {
        match self {
            Self::All => query.is_none(),
            Self::SingleEqFilter => {
                let Some(query) = query else {
                    return true;
                };
                if !query.is_root_of_filter() {
                    return false;
                }
                if !nav.current().attribute().multi_valued() {
                    return false;
                }
                if !query.is_operator(FilterOp::Eq) {
                    return false;
                }
                if !query.left().is_some_and(Expression::is_path) {
                    return false;
                }
                if !query
                    .next()
                    .is_some_and(|n| n.is_path() && n.next().is_none())
                {
                    return false;
                }

                query.right().is_some_and(Expression::is_literal)
            }
        }
    }
}

///
/// Implicit-add composition
///

struct ComposedElement {
    element: Property,
    target: String,
}

// Reject, before any traversal or mutation, an Eq-shaped filter root that
// chains into anything other than exactly one trailing path segment.
fn validate_single_eq_chain(query: &Expression) -> Result<(), TraverseError> {
    let mut node = Some(query);
    while let Some(current) = node {
        if current.is_root_of_filter() {
            let eq_shaped = current.is_operator(FilterOp::Eq)
                && current.left().is_some_and(Expression::is_path)
                && current.right().is_some_and(Expression::is_literal);

            if eq_shaped
                && let Some(next) = current.next()
                && !next.is_path()
            {
                return Err(TraverseError::invalid_filter(
                    current.to_string(),
                    "only a single Eq filter is applicable",
                ));
            }

            return Ok(());
        }
        node = current.next();
    }

    Ok(())
}

// Synthesize the new collection element described by a qualifying
// single-Eq filter: {target: value, comparison-sub-attribute: literal}.
// The literal's type is read from the collection's element attribute.
fn compose_value_by_eq_filter(
    value: &Value,
    query: Option<&Expression>,
    nav: &Navigator<'_>,
) -> Result<ComposedElement, TraverseError> {
    let Some(query) = query else {
        return Err(TraverseError::invalid_filter(nav.path(), "no filter found"));
    };

    // the traverse strategy only terminates here on the qualifying shape
    let unsupported = || TraverseError::invalid_filter(query.to_string(), "filter is not supported");
    let filter_key = query
        .left()
        .filter(|l| l.is_path())
        .map(Expression::token)
        .ok_or_else(unsupported)?;
    let target_key = query
        .next()
        .filter(|n| n.is_path())
        .map(Expression::token)
        .ok_or_else(unsupported)?;
    let literal = query
        .right()
        .filter(|r| r.is_literal())
        .ok_or_else(unsupported)?;

    let elem_attr = nav.current().attribute().element_attr();
    let Some(filter_attr) = elem_attr.sub_attribute(filter_key) else {
        return Err(TraverseError::invalid_filter(
            query.to_string(),
            format!("undefined attribute '{filter_key}' in filter"),
        ));
    };
    let normalized = filter::normalize(filter_attr, literal.token())?;
    let filter_name = filter_attr.name().to_string();

    // checked before the append so a bad target performs no mutation
    let Some(target_attr) = elem_attr.sub_attribute(target_key) else {
        return Err(TraverseError::no_attribute(target_key, nav.path()));
    };
    let target = target_attr.name().to_string();

    let mut element = Property::new(elem_attr);
    element
        .sub_property_mut(&filter_name)
        .ok_or_else(|| TraverseError::internal("composed element lost its comparison attribute"))?
        .set_value(normalized)?;
    element
        .sub_property_mut(&target)
        .ok_or_else(|| TraverseError::internal("composed element lost its target attribute"))?
        .set_value(value.clone())?;

    Ok(ComposedElement { element, target })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{email, emails_property};
    use proptest::prelude::*;

    fn eq_filter(query: &str) -> Expression {
        Expression::parse(query).unwrap().next().unwrap().clone()
    }

    #[test]
    fn single_eq_termination_accepts_exactly_the_qualifying_shape() {
        let mut root = emails_property(vec![email("home", "a@x", None)]);
        let mut nav = Navigator::new(&mut root);
        let strategy = TraverseStrategy::SingleEqFilter;

        // exhausted query terminates
        assert!(strategy.done(&nav, None));

        // qualifying single-Eq filter with one trailing segment
        let qualifying = eq_filter("emails[type eq \"work\"].value");
        assert!(strategy.done(&nav, Some(&qualifying)));

        // plain path segment is not a termination point
        let path = Expression::parse("emails.value").unwrap();
        assert!(!strategy.done(&nav, Some(&path)));

        // wrong operator
        let ne = eq_filter("emails[type ne \"work\"].value");
        assert!(!strategy.done(&nav, Some(&ne)));

        // no trailing segment
        let bare = eq_filter("emails[type eq \"work\"]");
        assert!(!strategy.done(&nav, Some(&bare)));

        // two trailing segments
        let deep = eq_filter("emails[type eq \"work\"].value.more");
        assert!(!strategy.done(&nav, Some(&deep)));

        // second chained predicate
        let chained = eq_filter("emails[type eq \"work\" and type eq \"other\"].value");
        assert!(!strategy.done(&nav, Some(&chained)));

        // current node must be multi-valued
        let mut frame = nav.at(0).unwrap();
        assert!(!strategy.done(frame.nav(), Some(&qualifying)));
    }

    #[test]
    fn primary_or_first_defaults_to_index_zero() {
        let unmarked = emails_property(vec![
            email("home", "a@x", Some(false)),
            email("work", "b@x", None),
        ]);
        assert_eq!(
            ElementStrategy::PrimaryOrFirst.select(&unmarked),
            Selection::Only(0)
        );

        // marker attribute missing from the schema entirely
        let no_marker = {
            use crate::schema::Attribute;
            use std::sync::Arc;

            let attr = Attribute::complex(
                "emails",
                vec![Attribute::string("type"), Attribute::string("value")],
            )
            .multi();
            let mut collection = Property::new(Arc::new(attr));
            let elem = collection.new_element();
            collection.add_element(elem).unwrap();
            collection
        };
        assert_eq!(
            ElementStrategy::PrimaryOrFirst.select(&no_marker),
            Selection::Only(0)
        );
    }

    #[test]
    fn depth_is_restored_on_success_and_error() {
        let mut root = emails_property(vec![
            email("home", "a@x", None),
            email("work", "b@x", None),
        ]);

        let query = Expression::parse("emails[type eq \"work\"].value").unwrap();
        // entry points run on a resource root; here the collection itself
        // is the root, so the leading segment is dropped
        let query = query.next().unwrap().clone();

        let mut nav = Navigator::new(&mut root);
        let mut cb =
            |_nav: &mut Navigator<'_>, _query: Option<&Expression>| Ok(());
        let mut tr = Traverser {
            callback: &mut cb,
            element_strategy: ElementStrategy::SelectAll,
            traverse_strategy: TraverseStrategy::All,
        };
        tr.traverse(&mut nav, Some(&query)).unwrap();
        assert_eq!(nav.depth(), 0);

        // error deep in the walk still unwinds to the root
        let bad = Expression::parse("emails[type eq \"work\"].missing")
            .unwrap()
            .next()
            .unwrap()
            .clone();
        let err = tr.traverse(&mut nav, Some(&bad)).unwrap_err();
        assert!(err.is_no_attribute());
        assert_eq!(nav.depth(), 0);
    }

    proptest! {
        #[test]
        fn select_all_selects_every_index(count in 0usize..8) {
            let elements = (0..count)
                .map(|i| email("home", &format!("{i}@x"), None))
                .collect();
            let collection = emails_property(elements);

            let selection = ElementStrategy::SelectAll.select(&collection);
            for index in 0..count {
                prop_assert!(selection.selects(index));
            }
        }

        #[test]
        fn primary_or_first_selects_the_marked_element(
            count in 1usize..6,
            marked in 0usize..6,
        ) {
            let marked = marked % count;
            let elements = (0..count)
                .map(|i| email("home", &format!("{i}@x"), Some(i == marked)))
                .collect();
            let collection = emails_property(elements);

            let selection = ElementStrategy::PrimaryOrFirst.select(&collection);
            prop_assert_eq!(selection, Selection::Only(marked));
            for index in 0..count {
                prop_assert_eq!(selection.selects(index), index == marked);
            }
        }
    }
}
