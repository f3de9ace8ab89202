/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

#![allow(dead_code)]

use aws_sdk_dynamodb::types::AttributeValue;
use dynamap::test_util::{FixedTimeSource, MockTransport};
use dynamap::{Attribute, ModelDefinition, Schema, Table, TableOptions};
use std::collections::HashMap;

pub type WireItem = HashMap<String, AttributeValue>;

pub fn wire(pairs: &[(&str, AttributeValue)]) -> WireItem {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

pub fn n(value: &str) -> AttributeValue {
    AttributeValue::N(value.to_string())
}

pub fn s(value: &str) -> AttributeValue {
    AttributeValue::S(value.to_string())
}

pub fn names(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// `id` (number hash key), `name` and `age`.
pub fn user_schema() -> Schema {
    Schema::builder()
        .attribute(Attribute::number("id").hash_key())
        .attribute(Attribute::string("name"))
        .attribute(Attribute::number("age"))
        .build()
        .unwrap()
}

pub fn table(transport: &MockTransport, schema: Schema) -> Table {
    table_with_options(transport, schema, TableOptions::default())
}

pub fn table_with_options(
    transport: &MockTransport,
    schema: Schema,
    options: TableOptions,
) -> Table {
    let table = Table::builder("users")
        .model(ModelDefinition::new("User", schema))
        .options(options)
        .transport(transport.clone())
        .time_source(FixedTimeSource::from_secs(1_000))
        .build()
        .unwrap();
    table.initialize();
    table
}
