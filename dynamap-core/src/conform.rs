/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Preparing native values for writing.
//!
//! Conformance works on copies: caller input is never modified. For a new item the steps run
//! in this order, recursively for nested schemas:
//!
//! 1. defaults and constants,
//! 2. timestamps (root only),
//! 3. string modifiers, type resolution, enum and custom validation for every present attribute,
//! 4. required checks,
//! 5. combine attributes, computed from their sources.

use aws_smithy_types::DateTime;

use crate::attribute::Attribute;
use crate::error::{Error, ValidationError};
use crate::path::AttributePath;
use crate::schema::Schema;
use crate::types::{resolve_type, AttributeType};
use crate::value::{format_number, number_to_millis, Object, Value};

/// Validates and completes a new item of `root`.
pub fn conform_create(root: &Schema, item: &Object, now: DateTime) -> Result<Object, Error> {
    Conformer { root, now }.object(root, item.clone(), &AttributePath::root(), true)
}

/// Validates and normalizes a single value written to `path`.
///
/// Nested maps are conformed as new objects, so their defaults and required checks apply.
pub fn conform_value(
    root: &Schema,
    attribute: &Attribute,
    value: Value,
    path: &AttributePath,
    now: DateTime,
) -> Result<Value, Error> {
    Conformer { root, now }.value(attribute, value, path)
}

/// Computes a combine attribute from the sources present in `state`.
///
/// Returns `None` when the attribute is not a combine attribute or no source is present.
pub fn combine_value(attribute: &Attribute, state: &Object) -> Option<Value> {
    let (sources, separator) = attribute.combine()?;
    let parts: Vec<String> = sources
        .iter()
        .filter_map(|source| state.get(source).and_then(combine_part))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(Value::String(parts.join(separator)))
    }
}

fn combine_part(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => format_number(*n),
        Value::Bool(b) => Some(b.to_string()),
        Value::Date(d) => d.to_millis().ok().map(|ms| ms.to_string()),
        Value::Undefined | Value::Null => None,
        other => Some(other.to_string()),
    }
}

struct Conformer<'a> {
    root: &'a Schema,
    now: DateTime,
}

impl Conformer<'_> {
    fn object(
        &self,
        schema: &Schema,
        mut object: Object,
        path: &AttributePath,
        is_root: bool,
    ) -> Result<Object, Error> {
        object.retain(|_, value| !value.is_undefined());
        for attribute in schema.attributes() {
            let name = attribute.name();
            if let Some(constant) = attribute.constant() {
                if !object.contains_key(name)
                    || matches!(attribute.primary_type(), AttributeType::Constant(_))
                {
                    object.insert(name.to_string(), constant.clone());
                    continue;
                }
            }
            if let Some(default) = attribute.default_value() {
                let current = object.get(name);
                if current.is_none() || attribute.is_force_default() {
                    let value = default.resolve(current);
                    tracing::trace!(path = %path.key(name), "applying default");
                    object.insert(name.to_string(), value);
                }
            }
        }

        if is_root {
            if let Some(timestamps) = schema.timestamps() {
                for name in [&timestamps.created_at, &timestamps.updated_at]
                    .into_iter()
                    .flatten()
                {
                    object.insert(name.clone(), Value::Date(self.now));
                }
            }
        }

        for attribute in schema.attributes() {
            if attribute.combine().is_some() {
                continue;
            }
            let Some(value) = object.get(attribute.name()) else {
                continue;
            };
            let conformed =
                self.value(attribute, value.clone(), &path.key(attribute.name()))?;
            object.insert(attribute.name().to_string(), conformed);
        }

        for attribute in schema.attributes() {
            if attribute.is_required()
                && attribute.combine().is_none()
                && object.get(attribute.name()).map_or(true, Value::is_null)
            {
                return Err(Error::required(path.key(attribute.name())));
            }
        }

        for attribute in schema.attributes() {
            if attribute.combine().is_none() {
                continue;
            }
            match combine_value(attribute, &object) {
                Some(value) => {
                    object.insert(attribute.name().to_string(), value);
                }
                None => {
                    object.shift_remove(attribute.name());
                }
            }
        }

        Ok(object)
    }

    fn value(
        &self,
        attribute: &Attribute,
        value: Value,
        path: &AttributePath,
    ) -> Result<Value, Error> {
        let value = match value {
            Value::String(s) if !attribute.modifiers().is_empty() => Value::String(
                attribute
                    .modifiers()
                    .iter()
                    .fold(s, |acc, modifier| modifier.apply(&acc)),
            ),
            other => other,
        };

        let ty = resolve_type(attribute.types(), &value, path, self.root)?;
        let value = match (ty, value) {
            (AttributeType::Constant(constant), _) => constant.clone(),
            (AttributeType::Date(_), Value::Number(n)) => match number_to_millis(n) {
                Some(ms) => Value::Date(DateTime::from_millis(ms)),
                None => return Err(Error::conversion(path, "date is out of range")),
            },
            (AttributeType::Map(Some(schema)), Value::Map(map)) => {
                Value::Map(self.object(schema, map, path, false)?)
            }
            (AttributeType::List(Some(element)), Value::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(self.value(element, item, &path.index(i))?);
                }
                Value::List(out)
            }
            (_, value) => value,
        };

        if let Some(allowed) = attribute.enumeration() {
            if !allowed.contains(&value) {
                let allowed_json =
                    serde_json::Value::Array(allowed.iter().map(Value::to_json).collect());
                return Err(ValidationError::Enum {
                    path: path.to_string(),
                    allowed: allowed_json.to_string(),
                    actual: value.to_string(),
                }
                .into());
            }
        }

        if let Some(validator) = attribute.validator() {
            if !validator.check(&value) {
                return Err(ValidationError::Custom {
                    path: path.to_string(),
                    value: value.to_string(),
                }
                .into());
            }
        }

        Ok(value)
    }
}
