/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Conversion between native values and wire values, guided by a schema.

use aws_sdk_dynamodb::types::AttributeValue;
use aws_smithy_types::Blob;
use std::collections::HashMap;

use crate::attribute::Attribute;
use crate::error::Error;
use crate::path::AttributePath;
use crate::schema::{SaveUnknown, Schema};
use crate::types::{resolve_type, resolve_wire_type, AttributeType, DateStorage, SetElement};
use crate::value::{format_number, number_to_millis, parse_number, Object, Value, ValueKind};
use crate::wire::WireItem;

/// Converts items and attribute values of one root schema.
///
/// The root schema is used to resolve self references (the `this` type) at any depth.
#[derive(Debug, Clone, Copy)]
pub struct Marshaller<'a> {
    root: &'a Schema,
}

impl<'a> Marshaller<'a> {
    /// Creates a marshaller for items of `root`.
    pub fn new(root: &'a Schema) -> Self {
        Self { root }
    }

    /// The root schema.
    pub fn schema(&self) -> &'a Schema {
        self.root
    }

    /// Converts a whole item.
    ///
    /// Declared attributes are converted in schema order. Empty sets are omitted. Undeclared
    /// attributes are kept with inferred types only when the schema allows them.
    pub fn to_item(&self, object: &Object) -> Result<WireItem, Error> {
        self.object_to_wire(self.root, object, &AttributePath::root())
    }

    /// Converts a whole item read from the database.
    ///
    /// Declared attributes come first in schema order, followed by allowed undeclared
    /// attributes sorted by name.
    pub fn from_item(&self, item: &WireItem) -> Result<Object, Error> {
        self.object_from_wire(self.root, item, &AttributePath::root())
    }

    /// Converts a value of a top-level attribute.
    pub fn to_wire(&self, attribute: &Attribute, value: &Value) -> Result<AttributeValue, Error> {
        self.to_wire_at(attribute, value, &AttributePath::attribute(attribute.name()))
    }

    /// Converts a value located at `path`, used in error messages.
    pub fn to_wire_at(
        &self,
        attribute: &Attribute,
        value: &Value,
        path: &AttributePath,
    ) -> Result<AttributeValue, Error> {
        let ty = resolve_type(attribute.types(), value, path, self.root)?;
        self.encode(ty, value, path)
    }

    /// Converts a wire value of a top-level attribute.
    pub fn from_wire(&self, attribute: &Attribute, av: &AttributeValue) -> Result<Value, Error> {
        self.from_wire_at(attribute, av, &AttributePath::attribute(attribute.name()))
    }

    /// Converts a wire value located at `path`.
    pub fn from_wire_at(
        &self,
        attribute: &Attribute,
        av: &AttributeValue,
        path: &AttributePath,
    ) -> Result<Value, Error> {
        let ty = resolve_wire_type(attribute.types(), av, path, self.root)?;
        self.decode(ty, av, path)
    }

    fn allows_unknown(&self, schema: &Schema, path: &AttributePath) -> bool {
        self.root.allows_unknown(path) || matches!(schema.save_unknown(), SaveUnknown::All)
    }

    fn object_to_wire(
        &self,
        schema: &Schema,
        object: &Object,
        path: &AttributePath,
    ) -> Result<WireItem, Error> {
        let mut out = HashMap::with_capacity(object.len());
        for attribute in schema.attributes() {
            let Some(value) = object.get(attribute.name()).filter(|v| !v.is_undefined()) else {
                continue;
            };
            let attribute_path = path.key(attribute.name());
            let ty = resolve_type(attribute.types(), value, &attribute_path, self.root)?;
            if matches!(ty, AttributeType::Set(_)) && value.is_empty_collection() {
                tracing::trace!(path = %attribute_path, "omitting empty set");
                continue;
            }
            let av = self.encode(ty, value, &attribute_path)?;
            out.insert(attribute.name().to_string(), av);
        }
        for (key, value) in object {
            if schema.attribute(key).is_some() || value.is_undefined() {
                continue;
            }
            let unknown_path = path.key(key.as_str());
            if self.allows_unknown(schema, &unknown_path) {
                out.insert(key.clone(), infer_wire(value, &unknown_path)?);
            } else {
                tracing::trace!(path = %unknown_path, "dropping undeclared attribute");
            }
        }
        Ok(out)
    }

    fn object_from_wire(
        &self,
        schema: &Schema,
        item: &WireItem,
        path: &AttributePath,
    ) -> Result<Object, Error> {
        let mut out = Object::with_capacity(item.len());
        for attribute in schema.attributes() {
            if let Some(av) = item.get(attribute.name()) {
                let value = self.from_wire_at(attribute, av, &path.key(attribute.name()))?;
                out.insert(attribute.name().to_string(), value);
            }
        }
        let mut unknown: Vec<&String> = item
            .keys()
            .filter(|key| schema.attribute(key).is_none())
            .collect();
        unknown.sort();
        for key in unknown {
            let unknown_path = path.key(key.as_str());
            if self.allows_unknown(schema, &unknown_path) {
                out.insert(key.clone(), infer_value(&item[key], &unknown_path)?);
            } else {
                tracing::trace!(path = %unknown_path, "ignoring undeclared attribute");
            }
        }
        Ok(out)
    }

    fn encode(
        &self,
        ty: &AttributeType,
        value: &Value,
        path: &AttributePath,
    ) -> Result<AttributeValue, Error> {
        match (ty, value) {
            (AttributeType::String, Value::String(s)) => Ok(AttributeValue::S(s.clone())),
            (AttributeType::Number, Value::Number(n)) => encode_number(*n, path),
            (AttributeType::Boolean, Value::Bool(b)) => Ok(AttributeValue::Bool(*b)),
            (AttributeType::Null, Value::Null) => Ok(AttributeValue::Null(true)),
            (AttributeType::Date(storage), value) => {
                Ok(AttributeValue::N(encode_date(*storage, value, path)?.to_string()))
            }
            (AttributeType::Binary, Value::Binary(b)) => Ok(AttributeValue::B(b.clone())),
            (AttributeType::Set(element), Value::Set(items) | Value::List(items)) => {
                encode_set(*element, items, path)
            }
            (AttributeType::List(element), Value::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = path.index(i);
                    out.push(match element {
                        Some(element) => self.to_wire_at(element, item, &item_path)?,
                        None => infer_wire(item, &item_path)?,
                    });
                }
                Ok(AttributeValue::L(out))
            }
            (AttributeType::Map(Some(schema)), Value::Map(map)) => {
                Ok(AttributeValue::M(self.object_to_wire(schema, map, path)?))
            }
            (AttributeType::Map(None), value @ Value::Map(_)) | (AttributeType::Any, value) => {
                infer_wire(value, path)
            }
            (AttributeType::Constant(constant), _) => infer_wire(constant, path),
            (AttributeType::Combine { .. }, Value::String(s)) => Ok(AttributeValue::S(s.clone())),
            (AttributeType::This, value) => self.encode_reference(value, path),
            (ty, value) => Err(Error::type_mismatch(path, ty.name(), value.kind().as_str())),
        }
    }

    fn decode(
        &self,
        ty: &AttributeType,
        av: &AttributeValue,
        path: &AttributePath,
    ) -> Result<Value, Error> {
        match (ty, av) {
            (AttributeType::String | AttributeType::Combine { .. }, AttributeValue::S(s)) => {
                Ok(Value::String(s.clone()))
            }
            (AttributeType::Number, AttributeValue::N(n)) => decode_number(n, path),
            (AttributeType::Boolean, AttributeValue::Bool(b)) => Ok(Value::Bool(*b)),
            (AttributeType::Null, AttributeValue::Null(_)) => Ok(Value::Null),
            (AttributeType::Date(storage), AttributeValue::N(n)) => {
                Ok(Value::Date(storage.decode(decode_epoch(n, path)?)))
            }
            (AttributeType::Binary, AttributeValue::B(b)) => Ok(Value::Binary(b.clone())),
            (AttributeType::Set(element), av) => decode_set(*element, av, path),
            (AttributeType::List(element), AttributeValue::L(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    let item_path = path.index(i);
                    out.push(match element {
                        Some(element) => self.from_wire_at(element, item, &item_path)?,
                        None => infer_value(item, &item_path)?,
                    });
                }
                Ok(Value::List(out))
            }
            (AttributeType::Map(Some(schema)), AttributeValue::M(map)) => {
                Ok(Value::Map(self.object_from_wire(schema, map, path)?))
            }
            (AttributeType::Map(None), av @ AttributeValue::M(_))
            | (AttributeType::Any | AttributeType::Constant(_), av) => infer_value(av, path),
            (AttributeType::This, av) => self.decode_reference(av, path),
            (ty, av) => Err(Error::type_mismatch(
                path,
                ty.name(),
                crate::wire::wire_kind_name(av),
            )),
        }
    }

    // References store the key: the bare hash key, or a key map when the root has a range key.
    fn encode_reference(
        &self,
        value: &Value,
        path: &AttributePath,
    ) -> Result<AttributeValue, Error> {
        let hash = self
            .root
            .hash_key_attribute()
            .ok_or_else(|| Error::conversion(path, "schema has no hash key"))?;
        match (value, self.root.range_key_attribute()) {
            (Value::Map(map), range) => {
                let hash_value = map.get(hash.name()).ok_or_else(|| {
                    Error::conversion(path, format!("referenced item is missing {}", hash.name()))
                })?;
                let hash_av = self.to_wire_at(hash, hash_value, &path.key(hash.name()))?;
                let Some(range) = range else {
                    return Ok(hash_av);
                };
                let range_value = map.get(range.name()).ok_or_else(|| {
                    Error::conversion(path, format!("referenced item is missing {}", range.name()))
                })?;
                let range_av = self.to_wire_at(range, range_value, &path.key(range.name()))?;
                Ok(AttributeValue::M(HashMap::from([
                    (hash.name().to_string(), hash_av),
                    (range.name().to_string(), range_av),
                ])))
            }
            (scalar, _) => self.to_wire_at(hash, scalar, path),
        }
    }

    fn decode_reference(&self, av: &AttributeValue, path: &AttributePath) -> Result<Value, Error> {
        let hash = self
            .root
            .hash_key_attribute()
            .ok_or_else(|| Error::conversion(path, "schema has no hash key"))?;
        match av {
            AttributeValue::M(map) => {
                let mut out = Object::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort_by_key(|k| !self.root.is_key(k));
                for key in keys {
                    let item_path = path.key(key.as_str());
                    let value = match self.root.attribute(key) {
                        Some(attribute) if self.root.is_key(key) => {
                            self.from_wire_at(attribute, &map[key], &item_path)?
                        }
                        _ => infer_value(&map[key], &item_path)?,
                    };
                    out.insert(key.clone(), value);
                }
                Ok(Value::Map(out))
            }
            scalar => self.from_wire_at(hash, scalar, path),
        }
    }
}

fn encode_number(
    n: aws_smithy_types::Number,
    path: &AttributePath,
) -> Result<AttributeValue, Error> {
    format_number(n)
        .map(AttributeValue::N)
        .ok_or_else(|| Error::conversion(path, "numbers must be finite"))
}

fn decode_number(n: &str, path: &AttributePath) -> Result<Value, Error> {
    parse_number(n)
        .map(Value::Number)
        .ok_or_else(|| Error::conversion(path, format!("cannot parse '{}' as a number", n)))
}

fn encode_date(storage: DateStorage, value: &Value, path: &AttributePath) -> Result<i64, Error> {
    let encoded = match value {
        Value::Date(date) => storage.encode(*date),
        Value::Number(n) => number_to_millis(*n).and_then(|ms| storage.encode_millis(ms)),
        other => {
            return Err(Error::type_mismatch(path, "date", other.kind().as_str()));
        }
    };
    encoded.ok_or_else(|| Error::conversion(path, "date is out of range"))
}

fn decode_epoch(n: &str, path: &AttributePath) -> Result<i64, Error> {
    parse_number(n)
        .and_then(number_to_millis)
        .ok_or_else(|| Error::conversion(path, format!("cannot parse '{}' as a date", n)))
}

fn set_element_name(element: SetElement) -> &'static str {
    match element {
        SetElement::String => "string",
        SetElement::Number => "number",
        SetElement::Date(_) => "date",
        SetElement::Binary => "binary",
    }
}

fn encode_set(
    element: SetElement,
    items: &[Value],
    path: &AttributePath,
) -> Result<AttributeValue, Error> {
    if items.is_empty() {
        return Err(Error::conversion(path, "sets must not be empty"));
    }
    for (i, item) in items.iter().enumerate() {
        if !element.accepts(item) {
            return Err(Error::type_mismatch(
                path.index(i),
                set_element_name(element),
                item.kind().as_str(),
            ));
        }
    }
    let av = match element {
        SetElement::String => {
            AttributeValue::Ss(dedup(items.iter().filter_map(Value::as_str).map(String::from)))
        }
        SetElement::Number => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                if let Value::Number(n) = item {
                    let formatted = format_number(*n).ok_or_else(|| {
                        Error::conversion(path.index(i), "numbers must be finite")
                    })?;
                    out.push(formatted);
                }
            }
            AttributeValue::Ns(dedup(out))
        }
        SetElement::Date(storage) => {
            let mut out = Vec::with_capacity(items.len());
            for (i, item) in items.iter().enumerate() {
                out.push(encode_date(storage, item, &path.index(i))?.to_string());
            }
            AttributeValue::Ns(dedup(out))
        }
        SetElement::Binary => {
            let mut out: Vec<Blob> = Vec::with_capacity(items.len());
            for item in items {
                if let Value::Binary(b) = item {
                    if !out.contains(b) {
                        out.push(b.clone());
                    }
                }
            }
            AttributeValue::Bs(out)
        }
    };
    Ok(av)
}

fn decode_set(
    element: SetElement,
    av: &AttributeValue,
    path: &AttributePath,
) -> Result<Value, Error> {
    match (element, av) {
        (SetElement::String, AttributeValue::Ss(items)) => {
            Ok(Value::Set(items.iter().cloned().map(Value::String).collect()))
        }
        (SetElement::Number, AttributeValue::Ns(items)) => items
            .iter()
            .enumerate()
            .map(|(i, n)| decode_number(n, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Set),
        (SetElement::Date(storage), AttributeValue::Ns(items)) => items
            .iter()
            .enumerate()
            .map(|(i, n)| Ok(Value::Date(storage.decode(decode_epoch(n, &path.index(i))?))))
            .collect::<Result<Vec<_>, Error>>()
            .map(Value::Set),
        (SetElement::Binary, AttributeValue::Bs(items)) => {
            Ok(Value::Set(items.iter().cloned().map(Value::Binary).collect()))
        }
        (element, av) => Err(Error::type_mismatch(
            path,
            AttributeType::Set(element).name(),
            crate::wire::wire_kind_name(av),
        )),
    }
}

fn dedup(items: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}

/// Converts a value without a schema, inferring its wire type from its runtime shape.
///
/// Dates become epoch milliseconds. Sets must be non-empty and homogeneous.
pub fn infer_wire(value: &Value, path: &AttributePath) -> Result<AttributeValue, Error> {
    match value {
        Value::Undefined => Err(Error::conversion(path, "undefined values can not be stored")),
        Value::Null => Ok(AttributeValue::Null(true)),
        Value::Bool(b) => Ok(AttributeValue::Bool(*b)),
        Value::Number(n) => encode_number(*n, path),
        Value::String(s) => Ok(AttributeValue::S(s.clone())),
        Value::Binary(b) => Ok(AttributeValue::B(b.clone())),
        Value::Date(_) => Ok(AttributeValue::N(
            encode_date(DateStorage::Milliseconds, value, path)?.to_string(),
        )),
        Value::Set(items) => {
            let element = match items.first().map(Value::kind) {
                Some(ValueKind::String) => SetElement::String,
                Some(ValueKind::Number) => SetElement::Number,
                Some(ValueKind::Date) => SetElement::Date(DateStorage::Milliseconds),
                Some(ValueKind::Binary) => SetElement::Binary,
                Some(other) => {
                    return Err(Error::conversion(
                        path,
                        format!("sets can not hold {} values", other),
                    ))
                }
                None => return Err(Error::conversion(path, "sets must not be empty")),
            };
            let first = items[0].kind();
            if items.iter().any(|item| item.kind() != first) {
                return Err(Error::conversion(path, "sets must hold values of a single type"));
            }
            encode_set(element, items, path)
        }
        Value::List(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| infer_wire(item, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(AttributeValue::L),
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), infer_wire(v, &path.key(k.as_str()))?)))
            .collect::<Result<HashMap<_, _>, Error>>()
            .map(AttributeValue::M),
    }
}

/// Converts a wire value without a schema. Map keys are sorted by name.
pub fn infer_value(av: &AttributeValue, path: &AttributePath) -> Result<Value, Error> {
    match av {
        AttributeValue::S(s) => Ok(Value::String(s.clone())),
        AttributeValue::N(n) => decode_number(n, path),
        AttributeValue::B(b) => Ok(Value::Binary(b.clone())),
        AttributeValue::Bool(b) => Ok(Value::Bool(*b)),
        AttributeValue::Null(_) => Ok(Value::Null),
        AttributeValue::Ss(_) => decode_set(SetElement::String, av, path),
        AttributeValue::Ns(_) => decode_set(SetElement::Number, av, path),
        AttributeValue::Bs(_) => decode_set(SetElement::Binary, av, path),
        AttributeValue::L(items) => items
            .iter()
            .enumerate()
            .map(|(i, item)| infer_value(item, &path.index(i)))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::List),
        AttributeValue::M(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut out = Object::with_capacity(map.len());
            for key in keys {
                out.insert(key.clone(), infer_value(&map[key], &path.key(key.as_str()))?);
            }
            Ok(Value::Map(out))
        }
        other => Err(Error::conversion(
            path,
            format!("unsupported wire type {}", crate::wire::wire_type_name(other)),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object;
    use aws_smithy_types::DateTime;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn friend_schema() -> Schema {
        Schema::builder()
            .attribute(Attribute::string("name").required())
            .build()
            .unwrap()
    }

    fn user_schema() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id").hash_key())
            .attribute(Attribute::string("name"))
            .attribute(Attribute::number("age"))
            .attribute(Attribute::set("tags", SetElement::String))
            .attribute(Attribute::date("born"))
            .attribute(
                Attribute::builder("friends")
                    .ty(AttributeType::list_of(AttributeType::map_of(friend_schema()))),
            )
            .attribute(
                Attribute::builder("address").ty(AttributeType::map_of(
                    Schema::builder()
                        .attribute(Attribute::string("country"))
                        .build()
                        .unwrap(),
                )),
            )
            .attribute(Attribute::builder("parent").ty(AttributeType::This))
            .build()
            .unwrap()
    }

    #[test]
    fn item_round_trip() {
        let schema = user_schema();
        let marshaller = Marshaller::new(&schema);
        let item = object! {
            "id" => 1,
            "name" => "Charlie",
            "age" => 5,
            "tags" => Value::set(["a", "b"]),
            "born" => DateTime::from_millis(1_000),
            "friends" => Value::list([object! { "name" => "Tim" }]),
            "address" => object! { "country" => "NZ" },
            "parent" => 7,
        };
        let wire = marshaller.to_item(&item).unwrap();
        assert_eq!(wire["id"], AttributeValue::N("1".into()));
        assert_eq!(wire["born"], AttributeValue::N("1000".into()));
        assert_eq!(wire["parent"], AttributeValue::N("7".into()));
        assert_eq!(marshaller.from_item(&wire).unwrap(), item);
    }

    #[test]
    fn nested_mismatches_report_paths() {
        let schema = user_schema();
        let marshaller = Marshaller::new(&schema);
        let err = marshaller
            .to_item(&object! { "id" => 1, "friends" => Value::list([object! { "name" => 5 }]) })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected friends.0.name to be of type string, instead found type number."
        );
        let err = marshaller
            .to_item(&object! { "id" => 1, "address" => object! { "country" => true } })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected address.country to be of type string, instead found type boolean."
        );
        let tags = Value::list([Value::from("a"), Value::from(1)]);
        let err = marshaller
            .to_item(&object! { "id" => 1, "tags" => tags })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected tags.1 to be of type string, instead found type number."
        );
    }

    #[test]
    fn wire_mismatch_names_wire_kind() {
        let schema = user_schema();
        let marshaller = Marshaller::new(&schema);
        let err = marshaller
            .from_item(&HashMap::from([(
                "name".to_string(),
                AttributeValue::N("1".into()),
            )]))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected name to be of type string, instead found type number."
        );
    }

    #[test]
    fn empty_sets_are_omitted_from_items() {
        let schema = user_schema();
        let marshaller = Marshaller::new(&schema);
        let wire = marshaller
            .to_item(&object! { "id" => 1, "tags" => Value::set(Vec::<Value>::new()) })
            .unwrap();
        assert!(!wire.contains_key("tags"));
        let tags = schema.attribute("tags").unwrap();
        assert!(marshaller.to_wire(tags, &Value::Set(vec![])).is_err());
    }

    #[test]
    fn unknown_attributes_follow_policy() {
        let item = object! { "id" => 1, "extra" => object! { "b" => 1, "a" => "x" } };
        let strict = Schema::builder()
            .attribute(Attribute::number("id"))
            .build()
            .unwrap();
        let wire = Marshaller::new(&strict).to_item(&item).unwrap();
        assert!(!wire.contains_key("extra"));

        let lenient = Schema::builder()
            .attribute(Attribute::number("id"))
            .save_unknown(SaveUnknown::All)
            .build()
            .unwrap();
        let marshaller = Marshaller::new(&lenient);
        let wire = marshaller.to_item(&item).unwrap();
        let back = marshaller.from_item(&wire).unwrap();
        assert_eq!(back, item);
        let keys: Vec<_> = back["extra"].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn references_to_ranged_items_are_maps() {
        let schema = Schema::builder()
            .attribute(Attribute::string("pk").hash_key())
            .attribute(Attribute::number("sk").range_key())
            .attribute(Attribute::builder("parent").ty(AttributeType::This))
            .build()
            .unwrap();
        let marshaller = Marshaller::new(&schema);
        let parent = schema.attribute("parent").unwrap();
        let av = marshaller
            .to_wire(parent, &Value::Map(object! { "pk" => "a", "sk" => 2, "other" => 1 }))
            .unwrap();
        assert_eq!(
            av,
            AttributeValue::M(HashMap::from([
                ("pk".to_string(), AttributeValue::S("a".into())),
                ("sk".to_string(), AttributeValue::N("2".into())),
            ]))
        );
        assert_eq!(
            marshaller.from_wire(parent, &av).unwrap(),
            Value::Map(object! { "pk" => "a", "sk" => 2 })
        );
    }

    #[test]
    fn seconds_storage_on_the_wire() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::builder("ttl").ty(AttributeType::Date(DateStorage::Seconds)))
            .build()
            .unwrap();
        let marshaller = Marshaller::new(&schema);
        let ttl = schema.attribute("ttl").unwrap();
        assert_eq!(
            marshaller.to_wire(ttl, &Value::from(DateTime::from_millis(10_600))).unwrap(),
            AttributeValue::N("11".into())
        );
        assert_eq!(
            marshaller.from_wire(ttl, &AttributeValue::N("11".into())).unwrap(),
            Value::Date(DateTime::from_secs(11))
        );
    }

    #[test]
    fn out_of_range_dates_are_conversion_errors() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::builder("ttl").ty(AttributeType::Date(DateStorage::Seconds)))
            .attribute(Attribute::date("born"))
            .build()
            .unwrap();
        let marshaller = Marshaller::new(&schema);
        let ttl = schema.attribute("ttl").unwrap();
        let born = schema.attribute("born").unwrap();
        for (attribute, value) in [
            (ttl, Value::from(i64::MAX)),
            (born, Value::from(1e300)),
            (born, Value::from(-1e19)),
        ] {
            match marshaller.to_wire(attribute, &value).unwrap_err() {
                Error::Conversion { message, .. } => assert_eq!(message, "date is out of range"),
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn constants_ignore_supplied_value() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::builder("kind").ty(AttributeType::Constant(Value::from("user"))))
            .build()
            .unwrap();
        let marshaller = Marshaller::new(&schema);
        let kind = schema.attribute("kind").unwrap();
        assert_eq!(
            marshaller.to_wire(kind, &Value::from(3)).unwrap(),
            AttributeValue::S("user".into())
        );
    }

    proptest! {
        #[test]
        fn declared_values_round_trip(
            name in ".*",
            age in any::<i64>(),
            tags in proptest::collection::hash_set("[a-z]{1,8}", 1..5),
            flag in any::<bool>(),
        ) {
            let schema = Schema::builder()
                .attribute(Attribute::number("id"))
                .attribute(Attribute::string("name"))
                .attribute(Attribute::number("age"))
                .attribute(Attribute::set("tags", SetElement::String))
                .attribute(Attribute::boolean("flag"))
                .build()
                .unwrap();
            let marshaller = Marshaller::new(&schema);
            let item = object! {
                "id" => 1,
                "name" => name,
                "age" => age,
                "tags" => Value::set(tags),
                "flag" => flag,
            };
            let wire = marshaller.to_item(&item).unwrap();
            prop_assert_eq!(marshaller.from_item(&wire).unwrap(), item);
        }
    }
}
