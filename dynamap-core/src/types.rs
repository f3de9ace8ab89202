/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The semantic type system and type resolution.
//!
//! An attribute declares one or more candidate [`AttributeType`]s. For a given value,
//! [`resolve_type`] picks the first declared candidate that accepts the value's runtime shape,
//! or fails with a type mismatch naming every candidate.

use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::DateTime;
use std::fmt;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::error::Error;
use crate::schema::Schema;
use crate::value::Value;
use crate::wire::wire_kind_name;

/// Unit a date is stored in on the wire.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DateStorage {
    /// Epoch milliseconds.
    #[default]
    Milliseconds,
    /// Epoch seconds, rounded to the nearest second.
    Seconds,
}

impl DateStorage {
    /// Encodes a date as an epoch integer in this unit.
    pub fn encode(&self, date: DateTime) -> Option<i64> {
        let millis = date.to_millis().ok()?;
        self.encode_millis(millis)
    }

    /// Encodes epoch milliseconds in this unit. Returns `None` when rounding overflows.
    pub fn encode_millis(&self, millis: i64) -> Option<i64> {
        match self {
            DateStorage::Milliseconds => Some(millis),
            DateStorage::Seconds => Some(millis.checked_add(500)?.div_euclid(1000)),
        }
    }

    /// Decodes an epoch integer in this unit.
    pub fn decode(&self, raw: i64) -> DateTime {
        match self {
            DateStorage::Milliseconds => DateTime::from_millis(raw),
            DateStorage::Seconds => DateTime::from_secs(raw),
        }
    }
}

/// Element type of a set attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetElement {
    /// Stored as `SS`.
    String,
    /// Stored as `NS`.
    Number,
    /// Stored as `NS` in the given unit.
    Date(DateStorage),
    /// Stored as `BS`.
    Binary,
}

impl SetElement {
    fn name(&self) -> &'static str {
        match self {
            SetElement::String => "string set",
            SetElement::Number => "number set",
            SetElement::Date(_) => "date set",
            SetElement::Binary => "binary set",
        }
    }

    pub(crate) fn accepts(&self, value: &Value) -> bool {
        matches!(
            (self, value),
            (SetElement::String, Value::String(_))
                | (SetElement::Number, Value::Number(_))
                | (SetElement::Date(_), Value::Date(_) | Value::Number(_))
                | (SetElement::Binary, Value::Binary(_))
        )
    }

    fn accepts_wire(&self, av: &AttributeValue) -> bool {
        matches!(
            (self, av),
            (SetElement::String, AttributeValue::Ss(_))
                | (SetElement::Number | SetElement::Date(_), AttributeValue::Ns(_))
                | (SetElement::Binary, AttributeValue::Bs(_))
        )
    }
}

/// A semantic attribute type.
#[derive(Debug, Clone)]
pub enum AttributeType {
    /// Stored as `S`.
    String,
    /// Stored as `N`.
    Number,
    /// Stored as `BOOL`.
    Boolean,
    /// Stored as `NULL`.
    Null,
    /// Stored as `N`, an epoch integer in the given unit. Accepts dates and numbers (epoch millis).
    Date(DateStorage),
    /// Stored as `B`.
    Binary,
    /// A homogeneous set. Accepts sets and lists.
    Set(SetElement),
    /// Stored as `L`, optionally with a definition every element must satisfy.
    List(Option<Box<Attribute>>),
    /// Stored as `M`, optionally with a nested schema.
    Map(Option<Arc<Schema>>),
    /// Any value; the wire type is inferred.
    Any,
    /// Always stores the given literal, whatever value is supplied.
    Constant(Value),
    /// A computed string joining the named sibling attributes.
    Combine {
        /// Source attribute names, in join order.
        attributes: Vec<String>,
        /// Separator placed between values.
        separator: String,
    },
    /// A reference to an item of the root schema, stored by key.
    This,
}

impl AttributeType {
    /// A date stored as epoch milliseconds.
    pub fn date() -> Self {
        AttributeType::Date(DateStorage::Milliseconds)
    }

    /// A list whose elements all have type `element`.
    pub fn list_of(element: AttributeType) -> Self {
        AttributeType::List(Some(Box::new(Attribute::builder("").ty(element).build())))
    }

    /// A list whose elements must satisfy `element`.
    pub fn list_of_attribute(element: Attribute) -> Self {
        AttributeType::List(Some(Box::new(element)))
    }

    /// A map holding an item of `schema`.
    pub fn map_of(schema: Schema) -> Self {
        AttributeType::Map(Some(Arc::new(schema)))
    }

    /// A combine attribute joining `attributes` with `,`.
    pub fn combine<I, S>(attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeType::Combine {
            attributes: attributes.into_iter().map(Into::into).collect(),
            separator: ",".to_string(),
        }
    }

    /// A combine attribute with a custom separator.
    pub fn combine_with<I, S>(attributes: I, separator: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AttributeType::Combine {
            attributes: attributes.into_iter().map(Into::into).collect(),
            separator: separator.into(),
        }
    }

    /// Returns the name used in type mismatch errors.
    pub fn name(&self) -> String {
        match self {
            AttributeType::String => "string".into(),
            AttributeType::Number => "number".into(),
            AttributeType::Boolean => "boolean".into(),
            AttributeType::Null => "null".into(),
            AttributeType::Date(_) => "date".into(),
            AttributeType::Binary => "binary".into(),
            AttributeType::Set(element) => element.name().into(),
            AttributeType::List(_) => "list".into(),
            AttributeType::Map(_) => "map".into(),
            AttributeType::Any => "any".into(),
            AttributeType::Constant(value) => format!("constant ({})", value),
            AttributeType::Combine { .. } => "combine".into(),
            AttributeType::This => "this".into(),
        }
    }

    /// True for types stored as a single scalar wire value.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            AttributeType::String
                | AttributeType::Number
                | AttributeType::Boolean
                | AttributeType::Date(_)
                | AttributeType::Binary
        )
    }

    /// True if a native value of this shape may be stored as this type.
    pub fn accepts(&self, value: &Value, root: &Schema) -> bool {
        match self {
            AttributeType::String => matches!(value, Value::String(_)),
            AttributeType::Number => matches!(value, Value::Number(_)),
            AttributeType::Boolean => matches!(value, Value::Bool(_)),
            AttributeType::Null => matches!(value, Value::Null),
            AttributeType::Date(_) => matches!(value, Value::Date(_) | Value::Number(_)),
            AttributeType::Binary => matches!(value, Value::Binary(_)),
            AttributeType::Set(_) => matches!(value, Value::Set(_) | Value::List(_)),
            AttributeType::List(_) => matches!(value, Value::List(_)),
            AttributeType::Map(_) => matches!(value, Value::Map(_)),
            AttributeType::Any | AttributeType::Constant(_) | AttributeType::Combine { .. } => {
                true
            }
            AttributeType::This => match value {
                Value::Map(_) => true,
                other => key_types(root)
                    .iter()
                    .any(|ty| ty.accepts(other, root)),
            },
        }
    }

    /// True if a wire value may be read back as this type.
    pub fn accepts_wire(&self, av: &AttributeValue, root: &Schema) -> bool {
        match self {
            AttributeType::String | AttributeType::Combine { .. } => {
                matches!(av, AttributeValue::S(_))
            }
            AttributeType::Number | AttributeType::Date(_) => matches!(av, AttributeValue::N(_)),
            AttributeType::Boolean => matches!(av, AttributeValue::Bool(_)),
            AttributeType::Null => matches!(av, AttributeValue::Null(_)),
            AttributeType::Binary => matches!(av, AttributeValue::B(_)),
            AttributeType::Set(element) => element.accepts_wire(av),
            AttributeType::List(_) => matches!(av, AttributeValue::L(_)),
            AttributeType::Map(_) => matches!(av, AttributeValue::M(_)),
            AttributeType::Any | AttributeType::Constant(_) => true,
            AttributeType::This => match av {
                AttributeValue::M(_) => true,
                other => key_types(root)
                    .iter()
                    .any(|ty| ty.accepts_wire(other, root)),
            },
        }
    }
}

// Candidate types of the root hash key, excluding self references.
fn key_types(root: &Schema) -> Vec<&AttributeType> {
    root.hash_key_attribute()
        .map(|attr| {
            attr.types()
                .iter()
                .filter(|ty| !matches!(ty, AttributeType::This))
                .collect()
        })
        .unwrap_or_default()
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name())
    }
}

/// Joins the names of the candidate types with `, `.
pub fn expected_names(types: &[AttributeType]) -> String {
    types
        .iter()
        .map(AttributeType::name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Picks the first candidate type accepting `value`.
pub fn resolve_type<'a>(
    types: &'a [AttributeType],
    value: &Value,
    path: impl fmt::Display,
    root: &Schema,
) -> Result<&'a AttributeType, Error> {
    types
        .iter()
        .find(|ty| ty.accepts(value, root))
        .ok_or_else(|| Error::type_mismatch(path, expected_names(types), value.kind().as_str()))
}

/// Picks the first candidate type able to read `av`.
pub fn resolve_wire_type<'a>(
    types: &'a [AttributeType],
    av: &AttributeValue,
    path: impl fmt::Display,
    root: &Schema,
) -> Result<&'a AttributeType, Error> {
    types
        .iter()
        .find(|ty| ty.accepts_wire(av, root))
        .ok_or_else(|| Error::type_mismatch(path, expected_names(types), wire_kind_name(av)))
}
