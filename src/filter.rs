use crate::{
    error::TraverseError,
    expr::{ExprKind, Expression, FilterOp},
    property::Property,
    schema::{Attribute, AttributeKind},
    value::Value,
};
use chrono::{DateTime, Utc};

///
/// Filter evaluation
///
/// Single-predicate evaluation against one candidate node. A predicate
/// that does not hold is a skip, never an error; malformed predicates and
/// unresolvable literals abort with the matching error kind. Logical
/// and/or chains are rejected: the full filter grammar is a non-goal.
///

pub fn evaluate(candidate: &Property, filter: &Expression) -> Result<bool, TraverseError> {
    let ExprKind::Operator(op) = filter.kind() else {
        return Err(TraverseError::invalid_filter(
            filter.to_string(),
            "filter root is not an operator",
        ));
    };

    // a non-path `next` is a chained predicate of a conjunction
    if let Some(next) = filter.next()
        && !next.is_path()
    {
        return Err(TraverseError::invalid_filter(
            filter.to_string(),
            "compound filters are not supported",
        ));
    }

    match op {
        FilterOp::And | FilterOp::Or => Err(TraverseError::invalid_filter(
            filter.to_string(),
            "logical operators are not supported",
        )),
        FilterOp::Pr => {
            let target = resolve_target(candidate, filter)?;
            Ok(target.is_assigned())
        }
        FilterOp::Eq | FilterOp::Ne | FilterOp::Co | FilterOp::Sw | FilterOp::Ew => {
            let target = resolve_target(candidate, filter)?;
            let Some(right) = filter.right().filter(|r| r.is_literal()) else {
                return Err(TraverseError::invalid_filter(
                    filter.to_string(),
                    "right operand must be a literal",
                ));
            };

            let Some(actual) = target.value() else {
                return Err(TraverseError::invalid_filter(
                    filter.to_string(),
                    "cannot compare a complex attribute",
                ));
            };

            let kind = target.attribute().kind();
            if matches!(op, FilterOp::Co | FilterOp::Sw | FilterOp::Ew)
                && !matches!(kind, AttributeKind::String | AttributeKind::Reference)
            {
                return Err(TraverseError::invalid_filter(
                    filter.to_string(),
                    format!("'{op}' is only applicable to string attributes"),
                ));
            }

            let expected = normalize(target.attribute(), right.token())?;

            compare(actual, op, &expected, filter)
        }
    }
}

// Resolve the left-operand attribute path on the candidate node.
fn resolve_target<'a>(
    candidate: &'a Property,
    filter: &Expression,
) -> Result<&'a Property, TraverseError> {
    let Some(left) = filter.left().filter(|l| l.is_path()) else {
        return Err(TraverseError::invalid_filter(
            filter.to_string(),
            "left operand must be an attribute path",
        ));
    };

    let mut node = candidate;
    let mut segment = Some(left);
    while let Some(seg) = segment {
        node = node.sub_property(seg.token()).ok_or_else(|| {
            TraverseError::invalid_filter(
                filter.to_string(),
                format!("undefined attribute '{}' in filter", seg.token()),
            )
        })?;
        segment = seg.next().filter(|n| n.is_path());
    }

    Ok(node)
}

fn compare(
    actual: &Value,
    op: FilterOp,
    expected: &Value,
    filter: &Expression,
) -> Result<bool, TraverseError> {
    match op {
        FilterOp::Eq => Ok(values_equal(actual, expected)),
        FilterOp::Ne => Ok(!values_equal(actual, expected)),
        FilterOp::Co | FilterOp::Sw | FilterOp::Ew => {
            let (Some(haystack), Some(needle)) = (text_of(actual), text_of(expected)) else {
                if actual.is_absent() {
                    return Ok(false);
                }
                return Err(TraverseError::invalid_filter(
                    filter.to_string(),
                    format!("'{op}' is only applicable to string attributes"),
                ));
            };

            let haystack = haystack.to_lowercase();
            let needle = needle.to_lowercase();
            Ok(match op {
                FilterOp::Co => haystack.contains(&needle),
                FilterOp::Sw => haystack.starts_with(&needle),
                _ => haystack.ends_with(&needle),
            })
        }
        FilterOp::Pr | FilterOp::And | FilterOp::Or => Err(TraverseError::internal(
            "compare invoked with a non-comparison operator",
        )),
    }
}

// SCIM string attributes default to caseExact=false.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::String(x), Value::String(y)) | (Value::Reference(x), Value::Reference(y)) => {
            x.eq_ignore_ascii_case(y)
        }
        _ => a == b,
    }
}

const fn text_of(value: &Value) -> Option<&String> {
    match value {
        Value::String(s) | Value::Reference(s) => Some(s),
        _ => None,
    }
}

///
/// Literal normalization
///
/// Turn a raw literal token into a value of the attribute's declared
/// kind. Tokens keep their JSON spelling, so serde_json does the lexical
/// work and the kind check happens here.
///

pub fn normalize(attr: &Attribute, literal: &str) -> Result<Value, TraverseError> {
    let json: serde_json::Value = serde_json::from_str(literal).map_err(|_| {
        TraverseError::invalid_type(attr.name(), format!("malformed literal {literal}"))
    })?;

    let mismatch = || {
        TraverseError::invalid_type(
            attr.name(),
            format!("literal {literal} does not conform to {} attribute", attr.kind()),
        )
    };

    match (attr.kind(), json) {
        (_, serde_json::Value::Null) => Ok(Value::Absent),
        (AttributeKind::Complex, _) => Err(TraverseError::invalid_type(
            attr.name(),
            "cannot normalize a literal against a complex attribute",
        )),
        (AttributeKind::String, serde_json::Value::String(s)) => Ok(Value::String(s)),
        (AttributeKind::Reference, serde_json::Value::String(s)) => Ok(Value::Reference(s)),
        (AttributeKind::DateTime, serde_json::Value::String(s)) => {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| Value::DateTime(dt.with_timezone(&Utc)))
                .map_err(|_| mismatch())
        }
        (AttributeKind::Boolean, serde_json::Value::Bool(b)) => Ok(Value::Boolean(b)),
        (AttributeKind::Integer, serde_json::Value::Number(n)) => {
            n.as_i64().map(Value::Integer).ok_or_else(mismatch)
        }
        (AttributeKind::Decimal, serde_json::Value::Number(n)) => {
            n.as_f64().map(Value::Decimal).ok_or_else(mismatch)
        }
        _ => Err(mismatch()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{email, emails_property};

    fn work_email() -> Property {
        let collection = emails_property(vec![email("work", "b@x", Some(true))]);
        collection.child_at(0).unwrap().clone()
    }

    fn filter_of(query: &str) -> Expression {
        let expr = Expression::parse(query).unwrap();
        expr.next().unwrap().clone()
    }

    #[test]
    fn eq_matches_case_insensitively() {
        let elem = work_email();

        assert!(evaluate(&elem, &filter_of("emails[type eq \"WORK\"]")).unwrap());
        assert!(!evaluate(&elem, &filter_of("emails[type eq \"home\"]")).unwrap());
        assert!(evaluate(&elem, &filter_of("emails[type ne \"home\"]")).unwrap());
    }

    #[test]
    fn string_operators_cover_contains_and_affixes() {
        let elem = work_email();

        assert!(evaluate(&elem, &filter_of("emails[value co \"@\"]")).unwrap());
        assert!(evaluate(&elem, &filter_of("emails[value sw \"b@\"]")).unwrap());
        assert!(evaluate(&elem, &filter_of("emails[value ew \"x\"]")).unwrap());
        assert!(!evaluate(&elem, &filter_of("emails[value sw \"zz\"]")).unwrap());
    }

    #[test]
    fn string_operators_reject_non_string_kinds() {
        let elem = work_email();

        let err = evaluate(&elem, &filter_of("emails[primary co \"tr\"]")).unwrap_err();
        assert!(err.is_invalid_filter());
    }

    #[test]
    fn presence_reflects_assignment() {
        let assigned = work_email();
        assert!(evaluate(&assigned, &filter_of("emails[value pr]")).unwrap());

        let collection = emails_property(vec![]);
        let empty = collection.new_element();
        assert!(!evaluate(&empty, &filter_of("emails[value pr]")).unwrap());
    }

    #[test]
    fn boolean_comparison_uses_normalized_literal() {
        let elem = work_email();

        assert!(evaluate(&elem, &filter_of("emails[primary eq true]")).unwrap());
        assert!(!evaluate(&elem, &filter_of("emails[primary eq false]")).unwrap());
    }

    #[test]
    fn undefined_attribute_is_an_invalid_filter() {
        let elem = work_email();

        let err = evaluate(&elem, &filter_of("emails[nope eq \"x\"]")).unwrap_err();
        assert!(err.is_invalid_filter());
    }

    #[test]
    fn chained_predicates_are_rejected() {
        let elem = work_email();
        let filter = filter_of("emails[type eq \"work\" and type eq \"other\"]");

        let err = evaluate(&elem, &filter).unwrap_err();
        assert!(err.is_invalid_filter());
    }

    #[test]
    fn mistyped_literal_is_an_invalid_type() {
        let elem = work_email();

        let err = evaluate(&elem, &filter_of("emails[type eq 5]")).unwrap_err();
        assert!(matches!(err, TraverseError::InvalidType { .. }));
    }

    #[test]
    fn normalize_covers_scalar_kinds() {
        use crate::schema::Attribute;

        let string = Attribute::string("type");
        assert_eq!(
            normalize(&string, "\"work\"").unwrap(),
            Value::from("work")
        );
        assert_eq!(normalize(&string, "null").unwrap(), Value::Absent);

        let int = Attribute::integer("count");
        assert_eq!(normalize(&int, "25").unwrap(), Value::Integer(25));
        assert!(normalize(&int, "2.5").is_err());

        let dec = Attribute::decimal("weight");
        assert_eq!(normalize(&dec, "-2.5").unwrap(), Value::Decimal(-2.5));

        let ts = Attribute::date_time("created");
        assert!(normalize(&ts, "\"2024-01-02T03:04:05Z\"").is_ok());
        assert!(normalize(&ts, "\"yesterday\"").is_err());

        let complex = Attribute::complex("name", vec![]);
        assert!(normalize(&complex, "\"x\"").is_err());
    }
}
