/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Native values that callers read and write through a schema.

use aws_smithy_types::date_time::Format;
use aws_smithy_types::{Blob, DateTime, Number};
use indexmap::IndexMap;
use std::fmt;

/// An ordered map of attribute names to values. Items and nested maps both use this type.
pub type Object = IndexMap<String, Value>;

/// A native value.
///
/// `Value` is the schema-agnostic representation that callers build items from. The schema
/// decides which wire type each value becomes, so a `Number` may be stored as a date and a
/// `List` may be stored as a set.
#[derive(Debug, Clone)]
pub enum Value {
    /// No value. Writes treat it as absent; in a flat update object it removes the attribute.
    Undefined,
    /// Explicit null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Number.
    Number(Number),
    /// String.
    String(String),
    /// Raw bytes.
    Binary(Blob),
    /// Point in time.
    Date(DateTime),
    /// Unordered, duplicate free collection of scalars.
    Set(Vec<Value>),
    /// Ordered list.
    List(Vec<Value>),
    /// Nested map.
    Map(Object),
}

/// The runtime kind of a [`Value`], used in type mismatch errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// [`Value::Undefined`]
    Undefined,
    /// [`Value::Null`]
    Null,
    /// [`Value::Bool`]
    Boolean,
    /// [`Value::Number`]
    Number,
    /// [`Value::String`]
    String,
    /// [`Value::Binary`]
    Binary,
    /// [`Value::Date`]
    Date,
    /// [`Value::Set`]
    Set,
    /// [`Value::List`]
    List,
    /// [`Value::Map`]
    Map,
}

impl ValueKind {
    /// Returns the lowercase name used in error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Binary => "binary",
            ValueKind::Date => "date",
            ValueKind::Set => "set",
            ValueKind::List => "list",
            ValueKind::Map => "map",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Builds a set, dropping duplicate elements while keeping first-seen order.
    pub fn set<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let mut out: Vec<Value> = Vec::new();
        for value in values {
            let value = value.into();
            if !out.contains(&value) {
                out.push(value);
            }
        }
        Value::Set(out)
    }

    /// Builds a list.
    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Value::List(values.into_iter().map(Into::into).collect())
    }

    /// Builds a binary value.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(Blob::new(bytes))
    }

    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Binary(_) => ValueKind::Binary,
            Value::Date(_) => ValueKind::Date,
            Value::Set(_) => ValueKind::Set,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
        }
    }

    /// Returns the string if this is a [`Value::String`].
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the number if this is a [`Value::Number`].
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the boolean if this is a [`Value::Bool`].
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the map if this is a [`Value::Map`].
    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns the elements if this is a [`Value::List`] or a [`Value::Set`].
    pub fn as_elements(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) | Value::Set(items) => Some(items),
            _ => None,
        }
    }

    /// Returns true for [`Value::Undefined`].
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Returns true for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true for sets (or lists standing in for sets) with no elements.
    pub(crate) fn is_empty_collection(&self) -> bool {
        matches!(self, Value::Set(items) | Value::List(items) if items.is_empty())
    }

    /// Renders this value as JSON, as used in validation messages.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Undefined | Value::Null => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Number(Number::PosInt(n)) => Json::from(*n),
            Value::Number(Number::NegInt(n)) => Json::from(*n),
            Value::Number(Number::Float(f)) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Value::String(s) => Json::String(s.clone()),
            Value::Binary(b) => Json::String(aws_smithy_types::base64::encode(b.as_ref())),
            Value::Date(d) => match d.fmt(Format::DateTime) {
                Ok(s) => Json::String(s),
                Err(_) => Json::from(d.secs()),
            },
            Value::Set(items) | Value::List(items) => {
                Json::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Map(map) => Json::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => number_eq(*a, *b),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Binary(a), Value::Binary(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Set(a), Value::Set(b)) => {
                a.len() == b.len() && a.iter().all(|item| b.contains(item))
            }
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len() && a.iter().all(|(k, v)| b.get(k) == Some(v))
            }
            _ => false,
        }
    }
}

/// Compares two numbers by value rather than by representation.
pub(crate) fn number_eq(a: Number, b: Number) -> bool {
    match (a, b) {
        (Number::PosInt(a), Number::PosInt(b)) => a == b,
        (Number::NegInt(a), Number::NegInt(b)) => a == b,
        (Number::PosInt(a), Number::NegInt(b)) | (Number::NegInt(b), Number::PosInt(a)) => {
            b >= 0 && a == b as u64
        }
        (a, b) => number_to_f64(a) == number_to_f64(b),
    }
}

pub(crate) fn number_to_f64(n: Number) -> f64 {
    match n {
        Number::PosInt(v) => v as f64,
        Number::NegInt(v) => v as f64,
        Number::Float(v) => v,
    }
}

/// Formats a number as a plain decimal string.
///
/// Returns `None` for NaN and infinities, which the wire format can't carry.
pub fn format_number(n: Number) -> Option<String> {
    match n {
        Number::PosInt(v) => Some(v.to_string()),
        Number::NegInt(v) => Some(v.to_string()),
        Number::Float(v) if v.is_finite() => Some(v.to_string()),
        Number::Float(_) => None,
    }
}

/// Parses a wire number, preferring integer representations.
pub fn parse_number(s: &str) -> Option<Number> {
    if let Ok(v) = s.parse::<u64>() {
        return Some(Number::PosInt(v));
    }
    if let Ok(v) = s.parse::<i64>() {
        return Some(Number::NegInt(v));
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(Number::Float(v)),
        _ => None,
    }
}

/// Interprets a number as whole milliseconds since the epoch.
pub(crate) fn number_to_millis(n: Number) -> Option<i64> {
    match n {
        Number::PosInt(v) => i64::try_from(v).ok(),
        Number::NegInt(v) => Some(v),
        // `as` saturates, so out of range floats are rejected first.
        Number::Float(v) if v.is_finite() && v.round().abs() < i64::MAX as f64 => {
            Some(v.round() as i64)
        }
        Number::Float(_) => None,
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        if value >= 0 {
            Value::Number(Number::PosInt(value as u64))
        } else {
            Value::Number(Number::NegInt(value))
        }
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::from(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        Value::Number(Number::PosInt(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Number(Number::PosInt(value as u64))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Number(Number::Float(value))
    }
}

impl From<Number> for Value {
    fn from(value: Number) -> Self {
        Value::Number(value)
    }
}

impl From<Blob> for Value {
    fn from(value: Blob) -> Self {
        Value::Binary(value)
    }
}

impl From<DateTime> for Value {
    fn from(value: DateTime) -> Self {
        Value::Date(value)
    }
}

impl From<Object> for Value {
    fn from(value: Object) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::List(values)
    }
}

/// Builds an [`Object`] from `key => value` pairs.
///
/// ```
/// use dynamap_core::object;
/// let item = object! { "id" => 1, "name" => "Charlie" };
/// assert_eq!(item.len(), 2);
/// ```
#[macro_export]
macro_rules! object {
    () => {
        $crate::value::Object::new()
    };
    ( $($key:expr => $value:expr),+ $(,)? ) => {{
        let mut map = $crate::value::Object::new();
        $( map.insert(::std::string::String::from($key), $crate::value::Value::from($value)); )+
        map
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_compare_by_value() {
        assert_eq!(Value::from(5i64), Value::Number(Number::NegInt(5)));
        assert_eq!(Value::from(5u64), Value::from(5.0f64));
        assert_ne!(Value::from(5u64), Value::from(5.5f64));
    }

    #[test]
    fn sets_ignore_order_and_duplicates() {
        let a = Value::set(["a", "b", "a"]);
        let b = Value::set(["b", "a"]);
        assert_eq!(a, b);
        assert_eq!(a.as_elements().unwrap().len(), 2);
        assert_ne!(Value::list(["a", "b"]), Value::list(["b", "a"]));
    }

    #[test]
    fn number_formatting_is_plain_decimal() {
        assert_eq!(format_number(Number::PosInt(5)).unwrap(), "5");
        assert_eq!(format_number(Number::NegInt(-12)).unwrap(), "-12");
        assert_eq!(format_number(Number::Float(1.5)).unwrap(), "1.5");
        assert_eq!(format_number(Number::Float(5.0)).unwrap(), "5");
        assert_eq!(
            format_number(Number::Float(1e21)).unwrap(),
            "1000000000000000000000"
        );
        assert_eq!(format_number(Number::Float(f64::NAN)), None);
    }

    #[test]
    fn parse_prefers_integers() {
        assert_eq!(parse_number("42"), Some(Number::PosInt(42)));
        assert_eq!(parse_number("-42"), Some(Number::NegInt(-42)));
        assert_eq!(parse_number("0.25"), Some(Number::Float(0.25)));
        assert_eq!(parse_number("abc"), None);
    }

    #[test]
    fn object_macro_preserves_order() {
        let item = object! { "b" => 1, "a" => "x" };
        let keys: Vec<_> = item.keys().cloned().collect();
        assert_eq!(keys, vec!["b".to_string(), "a".to_string()]);
        assert_eq!(Value::Map(object! { "a" => "x" }).to_string(), r#"{"a":"x"}"#);
    }
}
