/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Ordered collections of attribute definitions.

use std::collections::HashSet;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::error::Error;
use crate::path::{AttributePath, PathSegment};
use crate::types::{AttributeType, DateStorage};
use crate::value::{Object, Value};

/// Policy for attributes that are not declared in the schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SaveUnknown {
    /// Undeclared attributes are dropped.
    #[default]
    Off,
    /// Undeclared attributes are stored and read back with inferred types.
    All,
    /// Only undeclared attributes matching one of these dotted patterns are kept.
    ///
    /// `*` matches exactly one path segment and `**` matches any number of segments.
    Only(Vec<String>),
}

impl SaveUnknown {
    fn allows(&self, path: &AttributePath) -> bool {
        match self {
            SaveUnknown::Off => false,
            SaveUnknown::All => true,
            SaveUnknown::Only(patterns) => {
                let segments: Vec<String> = path
                    .segments()
                    .iter()
                    .map(|segment| match segment {
                        PathSegment::Key(k) => k.clone(),
                        PathSegment::Index(i) => i.to_string(),
                    })
                    .collect();
                patterns.iter().any(|pattern| {
                    let parts: Vec<&str> = pattern.split('.').collect();
                    glob_match(&parts, &segments)
                })
            }
        }
    }
}

fn glob_match(pattern: &[&str], segments: &[String]) -> bool {
    match pattern.split_first() {
        None => segments.is_empty(),
        Some((&"**", rest)) => {
            (0..=segments.len()).any(|skip| glob_match(rest, &segments[skip..]))
        }
        Some((part, rest)) => match segments.split_first() {
            Some((segment, remaining)) => {
                (*part == "*" || *part == segment.as_str()) && glob_match(rest, remaining)
            }
            None => false,
        },
    }
}

/// Names of the attributes holding creation and update times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamps {
    /// Attribute set when an item is created.
    pub created_at: Option<String>,
    /// Attribute set whenever an item is created or updated.
    pub updated_at: Option<String>,
}

impl Default for Timestamps {
    fn default() -> Self {
        Self {
            created_at: Some("createdAt".to_string()),
            updated_at: Some("updatedAt".to_string()),
        }
    }
}

/// An ordered, named collection of attribute definitions.
///
/// The hash key is the attribute marked with
/// [`hash_key`](crate::attribute::AttributeBuilder::hash_key), or the first attribute when none
/// is marked.
#[derive(Debug, Clone)]
pub struct Schema {
    attributes: Vec<Attribute>,
    hash_key: String,
    range_key: Option<String>,
    save_unknown: SaveUnknown,
    timestamps: Option<Timestamps>,
}

impl Schema {
    /// Creates a new builder-style object to manufacture a [`Schema`].
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// All attributes in declaration order.
    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Looks up a top-level attribute by name.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.iter().find(|a| a.name() == name)
    }

    /// Name of the hash key attribute.
    pub fn hash_key(&self) -> &str {
        &self.hash_key
    }

    /// Name of the range key attribute, if any.
    pub fn range_key(&self) -> Option<&str> {
        self.range_key.as_deref()
    }

    /// The hash key attribute.
    pub fn hash_key_attribute(&self) -> Option<&Attribute> {
        self.attribute(&self.hash_key)
    }

    /// The range key attribute, if any.
    pub fn range_key_attribute(&self) -> Option<&Attribute> {
        self.range_key.as_deref().and_then(|name| self.attribute(name))
    }

    /// True if `name` is the hash or range key.
    pub fn is_key(&self, name: &str) -> bool {
        self.hash_key == name || self.range_key.as_deref() == Some(name)
    }

    /// Attributes participating in the table key or an index.
    pub fn index_attributes(&self) -> Vec<&Attribute> {
        self.attributes
            .iter()
            .filter(|a| a.is_index() || self.is_key(a.name()))
            .collect()
    }

    /// The unknown-attribute policy.
    pub fn save_unknown(&self) -> &SaveUnknown {
        &self.save_unknown
    }

    /// The timestamp attribute names, if enabled.
    pub fn timestamps(&self) -> Option<&Timestamps> {
        self.timestamps.as_ref()
    }

    /// True if an undeclared attribute at `path` should be kept.
    pub fn allows_unknown(&self, path: &AttributePath) -> bool {
        self.save_unknown.allows(path)
    }

    /// Finds the attribute definition describing the value at `path`.
    ///
    /// List positions resolve to the list's element definition.
    pub fn attribute_at(&self, path: &AttributePath) -> Option<&Attribute> {
        let (first, rest) = path.segments().split_first()?;
        let PathSegment::Key(name) = first else {
            return None;
        };
        let mut current = self.attribute(name)?;
        for segment in rest {
            current = current.types().iter().find_map(|ty| match (ty, segment) {
                (AttributeType::Map(Some(schema)), PathSegment::Key(key)) => schema.attribute(key),
                (AttributeType::List(Some(element)), PathSegment::Index(_)) => Some(&**element),
                _ => None,
            })?;
        }
        Some(current)
    }

    /// Default values for every top-level attribute `existing` lacks.
    ///
    /// Attributes with a forced default are included even when present.
    pub fn default_values_for_create(&self, existing: &Object) -> Object {
        let mut out = Object::new();
        for attribute in &self.attributes {
            let Some(default) = attribute.default_value() else {
                continue;
            };
            let current = existing.get(attribute.name());
            if current.is_none() || attribute.is_force_default() {
                out.insert(attribute.name().to_string(), default.resolve(current));
            }
        }
        out
    }

    /// Checks the required attributes among `paths` against the effective state.
    ///
    /// A path is only checked when its parent exists in `state`, so nested required attributes
    /// of an absent optional map are not reported.
    pub fn validate_required(&self, paths: &[AttributePath], state: &Object) -> Result<(), Error> {
        for path in paths {
            let Some(attribute) = self.attribute_at(path) else {
                continue;
            };
            if !attribute.is_required() {
                continue;
            }
            let parent_present = match path.parent() {
                Some(parent) if !parent.is_empty() => parent.lookup(state).is_some(),
                _ => true,
            };
            if parent_present && path.lookup(state).map_or(true, Value::is_null) {
                return Err(Error::required(path));
            }
        }
        Ok(())
    }

    /// Number of top-level keys of `object` declared in this schema.
    pub fn correctness_score<'a, I>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = &'a str>,
    {
        keys.into_iter()
            .filter(|key| self.attribute(key).is_some())
            .count()
    }

    /// Adds an attribute after construction. Used by tables to add computed attributes.
    pub fn add_attribute(&mut self, attribute: Attribute) -> Result<(), Error> {
        if self.attribute(attribute.name()).is_some() {
            return Err(Error::invalid_parameter(format!(
                "Attribute {} is defined more than once",
                attribute.name()
            )));
        }
        self.attributes.push(attribute);
        Ok(())
    }
}

/// Picks the schema matching `keys` best. Ties resolve to the earliest schema.
pub fn select_schema<'a, 'k, I>(schemas: &'a [Arc<Schema>], keys: I) -> Option<&'a Arc<Schema>>
where
    I: IntoIterator<Item = &'k str> + Clone,
{
    let mut best: Option<(&Arc<Schema>, usize)> = None;
    for schema in schemas {
        let score = schema.correctness_score(keys.clone());
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((schema, score));
        }
    }
    best.map(|(schema, _)| schema)
}

/// Builder for [`Schema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaBuilder {
    attributes: Vec<Attribute>,
    save_unknown: SaveUnknown,
    timestamps: Option<Timestamps>,
}

impl SchemaBuilder {
    /// Appends an attribute.
    pub fn attribute(mut self, attribute: impl Into<Attribute>) -> Self {
        self.attributes.push(attribute.into());
        self
    }

    /// Sets the unknown-attribute policy.
    pub fn save_unknown(mut self, save_unknown: SaveUnknown) -> Self {
        self.save_unknown = save_unknown;
        self
    }

    /// Enables timestamp attributes.
    pub fn timestamps(mut self, timestamps: Timestamps) -> Self {
        self.timestamps = Some(timestamps);
        self
    }

    /// Sets or clears timestamp attributes.
    pub fn set_timestamps(mut self, timestamps: Option<Timestamps>) -> Self {
        self.timestamps = timestamps;
        self
    }

    /// Consumes the builder and constructs a [`Schema`].
    ///
    /// Fails when the schema is empty, declares more than one hash or range key, repeats an
    /// attribute name, or declares an invalid combine attribute.
    pub fn build(self) -> Result<Schema, Error> {
        let mut attributes = self.attributes;
        if attributes.is_empty() {
            return Err(Error::invalid_parameter(
                "Schema must contain at least one attribute",
            ));
        }

        let mut seen = HashSet::new();
        for attribute in &attributes {
            if !seen.insert(attribute.name().to_string()) {
                return Err(Error::invalid_parameter(format!(
                    "Attribute {} is defined more than once",
                    attribute.name()
                )));
            }
        }

        let hash_keys: Vec<&Attribute> = attributes.iter().filter(|a| a.is_hash_key()).collect();
        if hash_keys.len() > 1 {
            return Err(Error::invalid_parameter(
                "Only one attribute can be set as the hash key",
            ));
        }
        let hash_key = hash_keys
            .first()
            .map(|a| a.name().to_string())
            .unwrap_or_else(|| attributes[0].name().to_string());

        let range_keys: Vec<&Attribute> =
            attributes.iter().filter(|a| a.is_range_key()).collect();
        if range_keys.len() > 1 {
            return Err(Error::invalid_parameter(
                "Only one attribute can be set as the range key",
            ));
        }
        let range_key = range_keys.first().map(|a| a.name().to_string());

        for attribute in &attributes {
            let Some((sources, _)) = attribute.combine() else {
                continue;
            };
            if attribute.types().len() > 1 {
                return Err(Error::invalid_parameter(format!(
                    "Combine type is not allowed to be used with multiple types for attribute {}",
                    attribute.name()
                )));
            }
            for source in sources {
                let scalar = attributes
                    .iter()
                    .find(|a| a.name() == source)
                    .map(|a| a.types().iter().all(AttributeType::is_scalar));
                match scalar {
                    Some(true) => {}
                    Some(false) => {
                        return Err(Error::invalid_parameter(format!(
                            "Combine attribute {} can only reference scalar attributes, \
                             but {} is not",
                            attribute.name(),
                            source
                        )))
                    }
                    None => {
                        return Err(Error::invalid_parameter(format!(
                            "Combine attribute {} references unknown attribute {}",
                            attribute.name(),
                            source
                        )))
                    }
                }
            }
        }

        if let Some(timestamps) = &self.timestamps {
            for name in [&timestamps.created_at, &timestamps.updated_at]
                .into_iter()
                .flatten()
            {
                if !attributes.iter().any(|a| a.name() == name) {
                    attributes.push(
                        Attribute::builder(name.clone())
                            .ty(AttributeType::Date(DateStorage::Milliseconds))
                            .build(),
                    );
                }
            }
        }

        Ok(Schema {
            attributes,
            hash_key,
            range_key,
            save_unknown: self.save_unknown,
            timestamps: self.timestamps,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object;
    use pretty_assertions::assert_eq;

    fn user() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id").hash_key())
            .attribute(Attribute::string("name").default("Bob"))
            .attribute(Attribute::number("age").required())
            .build()
            .unwrap()
    }

    #[test]
    fn hash_key_defaults_to_first_attribute() {
        let schema = Schema::builder()
            .attribute(Attribute::string("pk"))
            .attribute(Attribute::string("sk").range_key())
            .build()
            .unwrap();
        assert_eq!(schema.hash_key(), "pk");
        assert_eq!(schema.range_key(), Some("sk"));
        assert_eq!(schema.index_attributes().len(), 2);
    }

    #[test]
    fn construction_errors() {
        let err = Schema::builder()
            .attribute(Attribute::string("a").hash_key())
            .attribute(Attribute::string("b").hash_key())
            .build()
            .unwrap_err();
        assert!(err.is_invalid_parameter());

        let err = Schema::builder()
            .attribute(Attribute::string("a"))
            .attribute(Attribute::string("a"))
            .build()
            .unwrap_err();
        assert_eq!(err.to_string(), "Attribute a is defined more than once");

        let err = Schema::builder()
            .attribute(Attribute::string("a"))
            .attribute(
                Attribute::builder("c")
                    .ty(AttributeType::combine(["a"]))
                    .ty(AttributeType::String),
            )
            .build()
            .unwrap_err();
        assert!(err.is_invalid_parameter());

        let err = Schema::builder()
            .attribute(Attribute::string("a"))
            .attribute(Attribute::builder("c").ty(AttributeType::combine(["a", "missing"])))
            .build()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Combine attribute c references unknown attribute missing"
        );

        assert!(Schema::builder().build().is_err());
    }

    #[test]
    fn defaults_for_create_skip_present_values() {
        let schema = user();
        let defaults = schema.default_values_for_create(&object! { "id" => 1 });
        assert_eq!(defaults, object! { "name" => "Bob" });
        let defaults = schema.default_values_for_create(&object! { "id" => 1, "name" => "Tim" });
        assert!(defaults.is_empty());
    }

    #[test]
    fn required_checks_only_touched_paths() {
        let schema = user();
        let state = object! { "id" => 1 };
        assert!(schema
            .validate_required(&[AttributePath::attribute("name")], &state)
            .is_ok());
        let err = schema
            .validate_required(&[AttributePath::attribute("age")], &state)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "age is a required property but has no value when trying to save item"
        );
    }

    #[test]
    fn nested_required_needs_parent() {
        let data = Schema::builder()
            .attribute(Attribute::number("age").required())
            .build()
            .unwrap();
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::builder("data").ty(AttributeType::map_of(data)))
            .build()
            .unwrap();
        let path = AttributePath::parse("data.age");
        assert!(schema.validate_required(&[path.clone()], &object! {}).is_ok());
        let err = schema
            .validate_required(&[path], &object! { "data" => object! {} })
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "data.age is a required property but has no value when trying to save item"
        );
    }

    #[test]
    fn correctness_score_ties_pick_first() {
        let a = Arc::new(user());
        let b = Arc::new(
            Schema::builder()
                .attribute(Attribute::number("id"))
                .attribute(Attribute::string("title"))
                .build()
                .unwrap(),
        );
        let schemas = vec![a.clone(), b.clone()];
        let picked = select_schema(&schemas, ["id", "title"]).unwrap();
        assert!(Arc::ptr_eq(picked, &b));
        let picked = select_schema(&schemas, ["id"]).unwrap();
        assert!(Arc::ptr_eq(picked, &a));
    }

    #[test]
    fn save_unknown_globs() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .save_unknown(SaveUnknown::Only(vec![
                "extra".into(),
                "meta.*".into(),
                "deep.**".into(),
            ]))
            .build()
            .unwrap();
        assert!(schema.allows_unknown(&AttributePath::parse("extra")));
        assert!(schema.allows_unknown(&AttributePath::parse("meta.a")));
        assert!(!schema.allows_unknown(&AttributePath::parse("meta.a.b")));
        assert!(schema.allows_unknown(&AttributePath::parse("deep.a.b.c")));
        assert!(!schema.allows_unknown(&AttributePath::parse("other")));
    }

    #[test]
    fn timestamps_add_date_attributes() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .timestamps(Timestamps::default())
            .build()
            .unwrap();
        let created = schema.attribute("createdAt").unwrap();
        assert!(matches!(created.primary_type(), AttributeType::Date(_)));
        assert!(schema.attribute("updatedAt").is_some());
    }

    #[test]
    fn attribute_at_walks_nested_definitions() {
        let friend = Schema::builder()
            .attribute(Attribute::string("name"))
            .build()
            .unwrap();
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(
                Attribute::builder("friends")
                    .ty(AttributeType::list_of(AttributeType::map_of(friend))),
            )
            .build()
            .unwrap();
        let attr = schema
            .attribute_at(&AttributePath::parse("friends.0.name"))
            .unwrap();
        assert_eq!(attr.name(), "name");
    }
}
