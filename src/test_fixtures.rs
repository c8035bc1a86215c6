//! Shared schema and data builders for unit tests. The canonical fixture
//! is the classic multi-valued `emails` collection with a primary marker.

use crate::{
    property::Property,
    schema::{Attribute, annotation},
    value::Value,
};
use std::sync::Arc;

pub(crate) fn emails_attr() -> Attribute {
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

pub(crate) fn email(kind: &str, address: &str, primary: Option<bool>) -> Property {
    let collection = Property::new(Arc::new(emails_attr()));
    let mut elem = collection.new_element();

    elem.sub_property_mut("type")
        .unwrap()
        .set_value(Value::from(kind))
        .unwrap();
    elem.sub_property_mut("value")
        .unwrap()
        .set_value(Value::from(address))
        .unwrap();
    if let Some(primary) = primary {
        elem.sub_property_mut("primary")
            .unwrap()
            .set_value(Value::from(primary))
            .unwrap();
    }

    elem
}

pub(crate) fn emails_property(elements: Vec<Property>) -> Property {
    let mut collection = Property::new(Arc::new(emails_attr()));
    for elem in elements {
        collection.add_element(elem).unwrap();
    }

    collection
}
