/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Resolution of self referencing attributes.
//!
//! An attribute of type [`AttributeType::This`] stores the key of another item of the same
//! model: the hash key value, or a map of the hash and range key. Populating replaces each
//! stored key with the item it refers to. Only one level is resolved; references inside the
//! fetched items are left as keys.

use dynamap_core::{Attribute, AttributeType, Object, Value};

use crate::config::GetSettings;
use crate::error::Error;
use crate::model::Model;

fn is_reference(attribute: &Attribute) -> bool {
    attribute
        .types()
        .iter()
        .any(|ty| matches!(ty, AttributeType::This))
}

fn is_reference_list(attribute: &Attribute) -> bool {
    attribute.types().iter().any(|ty| match ty {
        AttributeType::List(Some(element)) => is_reference(element),
        _ => false,
    })
}

impl Model {
    /// True when `value` is a stored key rather than an already populated item.
    fn is_key_value(&self, value: &Value) -> bool {
        match value {
            Value::Map(map) => {
                !map.is_empty() && map.keys().all(|name| self.schema().is_key(name))
            }
            Value::String(_) | Value::Number(_) | Value::Binary(_) => true,
            _ => false,
        }
    }

    async fn resolve(&self, value: Value) -> Result<Value, Error> {
        if !self.is_key_value(&value) {
            return Ok(value);
        }
        match self.fetch(value.clone(), &GetSettings::default()).await? {
            Some(item) => Ok(Value::Map(item)),
            None => {
                tracing::trace!(model = %self.name(), "referenced item not found");
                Ok(value)
            }
        }
    }

    /// Replaces every self reference in `object` with the item it refers to.
    ///
    /// References that point at missing items are left unchanged.
    pub async fn populate(&self, mut object: Object) -> Result<Object, Error> {
        let schema = self.schema_for(object.keys().map(String::as_str));
        for attribute in schema.attributes() {
            let Some(value) = object.get(attribute.name()).cloned() else {
                continue;
            };
            let value = match value {
                Value::List(items) if is_reference_list(attribute) => {
                    let mut resolved = Vec::with_capacity(items.len());
                    for item in items {
                        resolved.push(self.resolve(item).await?);
                    }
                    Value::List(resolved)
                }
                value if is_reference(attribute) => self.resolve(value).await?,
                _ => continue,
            };
            object.insert(attribute.name().to_string(), value);
        }
        Ok(object)
    }
}
