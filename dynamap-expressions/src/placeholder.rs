/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Placeholder allocation for expression attribute names and values.

use aws_sdk_dynamodb::types::AttributeValue;
use dynamap_core::path::{AttributePath, PathSegment};
use indexmap::IndexMap;
use std::collections::HashMap;

/// Which family of placeholders an expression uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `#a<N>` and `:v<N>`, used by update and projection expressions.
    Update,
    /// `#ca<N>` and `:cv<N>`, used by condition expressions.
    Condition,
}

impl PlaceholderStyle {
    fn name_prefix(&self) -> &'static str {
        match self {
            PlaceholderStyle::Update => "#a",
            PlaceholderStyle::Condition => "#ca",
        }
    }

    fn value_prefix(&self) -> &'static str {
        match self {
            PlaceholderStyle::Update => ":v",
            PlaceholderStyle::Condition => ":cv",
        }
    }
}

/// Expression attribute names and values, in allocation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpressionAttributes {
    /// Name placeholders mapped to attribute names.
    pub names: IndexMap<String, String>,
    /// Value placeholders mapped to wire values.
    pub values: IndexMap<String, AttributeValue>,
}

impl ExpressionAttributes {
    /// True when no placeholders were allocated.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty() && self.values.is_empty()
    }

    /// Adds every placeholder of `other`.
    pub fn merge(&mut self, other: ExpressionAttributes) {
        self.names.extend(other.names);
        self.values.extend(other.values);
    }

    /// The names as a request map, or `None` when empty.
    pub fn names_map(&self) -> Option<HashMap<String, String>> {
        if self.names.is_empty() {
            None
        } else {
            Some(self.names.clone().into_iter().collect())
        }
    }

    /// The values as a request map, or `None` when empty.
    pub fn values_map(&self) -> Option<HashMap<String, AttributeValue>> {
        if self.values.is_empty() {
            None
        } else {
            Some(self.values.clone().into_iter().collect())
        }
    }
}

/// Allocates placeholders for one expression.
///
/// Name and value counters are independent and zero-based. A name used twice reuses its first
/// placeholder, so identical input always yields identical output.
#[derive(Debug, Clone)]
pub struct Placeholders {
    style: PlaceholderStyle,
    names: IndexMap<String, String>,
    name_lookup: HashMap<String, String>,
    values: IndexMap<String, AttributeValue>,
}

impl Placeholders {
    /// Creates an empty allocator.
    pub fn new(style: PlaceholderStyle) -> Self {
        Self {
            style,
            names: IndexMap::new(),
            name_lookup: HashMap::new(),
            values: IndexMap::new(),
        }
    }

    /// Returns the placeholder for a single attribute name.
    pub fn name(&mut self, name: &str) -> String {
        if let Some(existing) = self.name_lookup.get(name) {
            return existing.clone();
        }
        let placeholder = format!("{}{}", self.style.name_prefix(), self.names.len());
        self.names.insert(placeholder.clone(), name.to_string());
        self.name_lookup
            .insert(name.to_string(), placeholder.clone());
        placeholder
    }

    /// Returns the placeholder expression for a document path, such as `#a0.#a1[2]`.
    pub fn path(&mut self, path: &AttributePath) -> String {
        let mut out = String::new();
        for segment in path.segments() {
            match segment {
                PathSegment::Key(key) => {
                    if !out.is_empty() {
                        out.push('.');
                    }
                    out.push_str(&self.name(key));
                }
                PathSegment::Index(i) => {
                    out.push_str(&format!("[{}]", i));
                }
            }
        }
        out
    }

    /// Allocates a new value placeholder.
    pub fn value(&mut self, value: AttributeValue) -> String {
        let placeholder = format!("{}{}", self.style.value_prefix(), self.values.len());
        self.values.insert(placeholder.clone(), value);
        placeholder
    }

    /// Consumes the allocator and returns the allocated placeholders.
    pub fn into_attributes(self) -> ExpressionAttributes {
        ExpressionAttributes {
            names: self.names,
            values: self.values,
        }
    }
}
