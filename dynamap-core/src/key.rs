/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Key projection.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

use crate::error::Error;
use crate::marshal::Marshaller;
use crate::schema::Schema;
use crate::value::{Object, Value};
use crate::wire::{fingerprint, WireItem};

/// The hash key, and range key if present, of one item.
#[derive(Debug, Clone, PartialEq)]
pub struct KeySpec {
    hash_key: (String, AttributeValue),
    range_key: Option<(String, AttributeValue)>,
}

impl KeySpec {
    /// Projects a caller supplied key.
    ///
    /// A bare scalar is the hash key. A map contributes its hash key and, when the schema has
    /// one, its range key; any other attributes are ignored so a whole item can be passed where
    /// only its key is needed.
    pub fn from_value(schema: &Schema, key: &Value) -> Result<Self, Error> {
        let marshaller = Marshaller::new(schema);
        let hash_attribute = schema
            .hash_key_attribute()
            .ok_or_else(|| Error::invalid_parameter("Schema has no hash key"))?;
        let map = match key {
            Value::Map(map) => map,
            scalar => {
                return Ok(Self {
                    hash_key: (
                        hash_attribute.name().to_string(),
                        marshaller.to_wire(hash_attribute, scalar)?,
                    ),
                    range_key: None,
                })
            }
        };
        let hash_value = map.get(hash_attribute.name()).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Key is missing the hash key attribute {}",
                hash_attribute.name()
            ))
        })?;
        let hash_key = (
            hash_attribute.name().to_string(),
            marshaller.to_wire(hash_attribute, hash_value)?,
        );
        let range_key = match schema.range_key_attribute() {
            Some(range) => match map.get(range.name()) {
                Some(value) => Some((range.name().to_string(), marshaller.to_wire(range, value)?)),
                None => None,
            },
            None => None,
        };
        let dropped = map.len() - 1 - usize::from(range_key.is_some());
        if dropped > 0 {
            tracing::trace!(dropped, "ignoring non-key attributes in key");
        }
        Ok(Self {
            hash_key,
            range_key,
        })
    }

    /// Extracts the key of an item read from, or written to, the database.
    pub fn from_wire_item(schema: &Schema, item: &WireItem) -> Result<Self, Error> {
        let hash_name = schema.hash_key();
        let hash_value = item.get(hash_name).ok_or_else(|| {
            Error::invalid_parameter(format!(
                "Item is missing the hash key attribute {}",
                hash_name
            ))
        })?;
        let range_key = schema
            .range_key()
            .and_then(|name| item.get(name).map(|av| (name.to_string(), av.clone())));
        Ok(Self {
            hash_key: (hash_name.to_string(), hash_value.clone()),
            range_key,
        })
    }

    /// The hash key name and wire value.
    pub fn hash_key(&self) -> (&str, &AttributeValue) {
        (&self.hash_key.0, &self.hash_key.1)
    }

    /// The range key name and wire value, if present.
    pub fn range_key(&self) -> Option<(&str, &AttributeValue)> {
        self.range_key.as_ref().map(|(n, v)| (n.as_str(), v))
    }

    /// Converts this KeySpec to a HashMap suitable for DynamoDB API calls.
    pub fn to_key_map(&self) -> HashMap<String, AttributeValue> {
        let mut map = HashMap::new();
        map.insert(self.hash_key.0.clone(), self.hash_key.1.clone());
        if let Some((name, value)) = &self.range_key {
            map.insert(name.clone(), value.clone());
        }
        map
    }

    /// A string identifying this key, used to match responses to requests.
    pub fn fingerprint(&self) -> String {
        match &self.range_key {
            Some((_, range)) => format!("{}|{}", fingerprint(&self.hash_key.1), fingerprint(range)),
            None => fingerprint(&self.hash_key.1),
        }
    }

    /// The native form of this key, in hash, range order.
    pub fn to_object(&self, schema: &Schema) -> Result<Object, Error> {
        Marshaller::new(schema).from_item(&self.to_key_map()).map(|mut object| {
            object.retain(|k, _| schema.is_key(k));
            object
        })
    }
}
