/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Update expressions.
//!
//! An [`UpdateSpec`] lists actions in caller order. [`UpdateBuilder`] routes each action to
//! one of the `ADD`, `SET`, `REMOVE` and `DELETE` sections, then appends computed `SET`
//! entries for forced defaults, the update timestamp and combine attributes.

use aws_smithy_types::DateTime;
use dynamap_core::conform::{combine_value, conform_value};
use dynamap_core::marshal::infer_wire;
use dynamap_core::types::resolve_type;
use dynamap_core::{
    Attribute, AttributePath, AttributeType, Error, Marshaller, Object, Schema, Value,
};
use std::collections::HashSet;

use crate::placeholder::{ExpressionAttributes, PlaceholderStyle, Placeholders};

/// One requested change to an attribute.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateAction {
    /// Assign a value.
    Set(Value),
    /// Add to a number, append to a list, or add elements to a set.
    Add(Value),
    /// Remove the attribute, or restore its default if it has one.
    Remove,
    /// Remove elements from a set.
    Delete(Value),
}

/// An ordered list of update actions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateSpec {
    actions: Vec<(AttributePath, UpdateAction)>,
}

impl UpdateSpec {
    /// Creates an empty update.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assigns `value` to `path`. [`Value::Undefined`] removes `path` instead.
    pub fn set(mut self, path: impl Into<AttributePath>, value: impl Into<Value>) -> Self {
        let action = match value.into() {
            Value::Undefined => UpdateAction::Remove,
            value => UpdateAction::Set(value),
        };
        self.actions.push((path.into(), action));
        self
    }

    /// Adds `value` to `path`.
    pub fn add(mut self, path: impl Into<AttributePath>, value: impl Into<Value>) -> Self {
        self.actions
            .push((path.into(), UpdateAction::Add(value.into())));
        self
    }

    /// Removes `path`.
    pub fn remove(mut self, path: impl Into<AttributePath>) -> Self {
        self.actions.push((path.into(), UpdateAction::Remove));
        self
    }

    /// Deletes the elements of `value` from the set at `path`.
    pub fn delete(mut self, path: impl Into<AttributePath>, value: impl Into<Value>) -> Self {
        self.actions
            .push((path.into(), UpdateAction::Delete(value.into())));
        self
    }

    /// The actions in caller order.
    pub fn actions(&self) -> &[(AttributePath, UpdateAction)] {
        &self.actions
    }

    /// True when no action was requested.
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Reads an update from an object.
    ///
    /// Keys `$SET`, `$ADD` and `$DELETE` hold maps of paths to values, `$REMOVE` holds a path
    /// or a list of paths. Any other key is a `SET` of that path, or a `REMOVE` when its value
    /// is [`Value::Undefined`].
    pub fn from_object(object: &Object) -> Result<Self, Error> {
        let mut spec = UpdateSpec::new();
        for (key, value) in object {
            match key.as_str() {
                "$SET" | "$ADD" | "$DELETE" => {
                    let Value::Map(entries) = value else {
                        return Err(Error::invalid_parameter(format!(
                            "{} must be a map of attribute names to values",
                            key
                        )));
                    };
                    for (path, value) in entries {
                        let path = AttributePath::parse(path);
                        let action = match key.as_str() {
                            "$SET" => UpdateAction::Set(value.clone()),
                            "$ADD" => UpdateAction::Add(value.clone()),
                            _ => UpdateAction::Delete(value.clone()),
                        };
                        spec.actions.push((path, action));
                    }
                }
                "$REMOVE" => {
                    let names: Vec<&Value> = match value {
                        Value::List(items) | Value::Set(items) => items.iter().collect(),
                        single => vec![single],
                    };
                    for name in names {
                        let Some(name) = name.as_str() else {
                            return Err(Error::invalid_parameter(
                                "$REMOVE must hold attribute names",
                            ));
                        };
                        spec.actions
                            .push((AttributePath::parse(name), UpdateAction::Remove));
                    }
                }
                _ => spec = spec.set(AttributePath::parse(key), value.clone()),
            }
        }
        Ok(spec)
    }
}

/// A compiled update expression.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateExpression {
    /// The update expression.
    pub expression: String,
    /// Placeholders used by `expression`.
    pub attributes: ExpressionAttributes,
}

#[derive(Default)]
struct Sections {
    add: Vec<String>,
    set: Vec<String>,
    remove: Vec<String>,
    delete: Vec<String>,
}

impl Sections {
    fn render(&self) -> String {
        [
            ("ADD", &self.add),
            ("SET", &self.set),
            ("REMOVE", &self.remove),
            ("DELETE", &self.delete),
        ]
        .into_iter()
        .filter(|(_, items)| !items.is_empty())
        .map(|(keyword, items)| format!("{} {}", keyword, items.join(", ")))
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Builds update expressions for items of one schema.
#[derive(Debug, Clone, Copy)]
pub struct UpdateBuilder<'a> {
    schema: &'a Schema,
    key: &'a Object,
    now: DateTime,
}

impl<'a> UpdateBuilder<'a> {
    /// Creates a builder for the item identified by `key`, a native key object.
    ///
    /// `now` is used for producer defaults and the update timestamp.
    pub fn new(schema: &'a Schema, key: &'a Object, now: DateTime) -> Self {
        Self { schema, key, now }
    }

    /// Compiles `spec`.
    ///
    /// Key attributes are never updated and are skipped. Undeclared attributes are skipped
    /// unless the schema keeps unknown attributes.
    pub fn build(&self, spec: &UpdateSpec) -> Result<UpdateExpression, Error> {
        let marshaller = Marshaller::new(self.schema);
        let mut placeholders = Placeholders::new(PlaceholderStyle::Update);
        let mut sections = Sections::default();
        let mut state = self.key.clone();
        let mut touched: HashSet<String> = HashSet::new();
        let mut written: Vec<AttributePath> = Vec::new();

        for (path, action) in spec.actions() {
            let Some(top) = path.top_level() else {
                return Err(Error::invalid_parameter(
                    "Update paths must start with an attribute name",
                ));
            };
            if self.schema.is_key(top) {
                tracing::trace!(path = %path, "skipping key attribute in update");
                continue;
            }
            let attribute = self.schema.attribute_at(path);
            if let Some(attribute) = attribute {
                if attribute.combine().is_some() || (self.is_computed(top) && path.is_top_level()) {
                    tracing::trace!(path = %path, "skipping computed attribute in update");
                    continue;
                }
            } else if !self.schema.allows_unknown(path) {
                tracing::trace!(path = %path, "dropping undeclared attribute from update");
                continue;
            }
            touched.insert(top.to_string());

            match action {
                UpdateAction::Set(value) if is_empty_set(attribute, value, self.schema) => {
                    let name = placeholders.path(path);
                    sections.remove.push(name);
                    path.remove(&mut state);
                    written.push(path.clone());
                }
                UpdateAction::Set(value) => {
                    let (value, av) = self.convert(&marshaller, attribute, value.clone(), path)?;
                    let name = placeholders.path(path);
                    let placeholder = placeholders.value(av);
                    sections.set.push(format!("{} = {}", name, placeholder));
                    path.insert(&mut state, value);
                    written.push(path.clone());
                }
                UpdateAction::Remove => {
                    let default = attribute.and_then(Attribute::default_value);
                    match (attribute, default) {
                        (Some(attribute), Some(default)) => {
                            let value = default.resolve(None);
                            let (value, av) =
                                self.convert(&marshaller, Some(attribute), value, path)?;
                            let name = placeholders.path(path);
                            let placeholder = placeholders.value(av);
                            sections.set.push(format!("{} = {}", name, placeholder));
                            path.insert(&mut state, value);
                        }
                        (Some(attribute), None) if attribute.is_required() => {
                            return Err(Error::required(path));
                        }
                        _ => {
                            let name = placeholders.path(path);
                            sections.remove.push(name);
                            path.remove(&mut state);
                        }
                    }
                }
                UpdateAction::Add(value) => {
                    let routed = match attribute {
                        Some(attribute) => {
                            resolve_type(attribute.types(), value, path, self.schema)?.clone()
                        }
                        None => match value {
                            Value::Number(_) => AttributeType::Number,
                            Value::List(_) => AttributeType::List(None),
                            _ => AttributeType::Any,
                        },
                    };
                    let av = match attribute {
                        Some(attribute) => marshaller.to_wire_at(attribute, value, path)?,
                        None => infer_wire(value, path)?,
                    };
                    match routed {
                        AttributeType::Number | AttributeType::Set(_) => {
                            let name = placeholders.path(path);
                            let placeholder = placeholders.value(av);
                            sections.add.push(format!("{} {}", name, placeholder));
                        }
                        AttributeType::List(_) => {
                            let name = placeholders.path(path);
                            let placeholder = placeholders.value(av);
                            sections
                                .set
                                .push(format!("{} = list_append({}, {})", name, name, placeholder));
                        }
                        other => {
                            return Err(Error::invalid_parameter(format!(
                                "$ADD can only be used with number, list or set attributes, \
                                 but {} is {}",
                                path,
                                other.name()
                            )));
                        }
                    }
                }
                UpdateAction::Delete(value) => {
                    let Some(attribute) = attribute else {
                        return Err(Error::invalid_parameter(format!(
                            "$DELETE can only be used with set attributes, but {} is not declared",
                            path
                        )));
                    };
                    let routed = resolve_type(attribute.types(), value, path, self.schema)?;
                    if !matches!(routed, AttributeType::Set(_)) {
                        return Err(Error::invalid_parameter(format!(
                            "$DELETE can only be used with set attributes, but {} is {}",
                            path,
                            routed.name()
                        )));
                    }
                    let av = marshaller.to_wire_at(attribute, value, path)?;
                    let name = placeholders.path(path);
                    let placeholder = placeholders.value(av);
                    sections.delete.push(format!("{} {}", name, placeholder));
                }
            }
        }

        self.schema.validate_required(&written, &state)?;

        for attribute in self.schema.attributes() {
            if !attribute.is_force_default() || self.schema.is_key(attribute.name()) {
                continue;
            }
            let Some(default) = attribute.default_value() else {
                continue;
            };
            let path = AttributePath::attribute(attribute.name());
            let (value, av) =
                self.convert(&marshaller, Some(attribute), default.resolve(None), &path)?;
            let name = placeholders.path(&path);
            let placeholder = placeholders.value(av);
            sections.set.push(format!("{} = {}", name, placeholder));
            state.insert(attribute.name().to_string(), value);
        }

        if let Some(updated_at) = self
            .schema
            .timestamps()
            .and_then(|t| t.updated_at.as_deref())
        {
            if let Some(attribute) = self.schema.attribute(updated_at) {
                let path = AttributePath::attribute(updated_at);
                let av = marshaller.to_wire_at(attribute, &Value::Date(self.now), &path)?;
                let name = placeholders.path(&path);
                let placeholder = placeholders.value(av);
                sections.set.push(format!("{} = {}", name, placeholder));
            }
        }

        for attribute in self.schema.attributes() {
            let Some((sources, _)) = attribute.combine() else {
                continue;
            };
            if !sources.iter().any(|source| touched.contains(source)) {
                continue;
            }
            let missing: Vec<&str> = sources
                .iter()
                .filter(|source| state.get(source.as_str()).map_or(true, Value::is_null))
                .map(String::as_str)
                .collect();
            if !missing.is_empty() {
                return Err(Error::invalid_parameter(format!(
                    "Attributes {} must be included when updating combine attribute {}",
                    missing.join(", "),
                    attribute.name()
                )));
            }
            if let Some(value) = combine_value(attribute, &state) {
                let path = AttributePath::attribute(attribute.name());
                let av = marshaller.to_wire_at(attribute, &value, &path)?;
                let name = placeholders.path(&path);
                let placeholder = placeholders.value(av);
                sections.set.push(format!("{} = {}", name, placeholder));
            }
        }

        let expression = sections.render();
        if expression.is_empty() {
            return Err(Error::invalid_parameter(
                "Update must contain at least one change",
            ));
        }
        Ok(UpdateExpression {
            expression,
            attributes: placeholders.into_attributes(),
        })
    }

    // Forced defaults and the update timestamp are always written by the builder itself.
    fn is_computed(&self, name: &str) -> bool {
        let forced = self
            .schema
            .attribute(name)
            .map_or(false, |a| a.is_force_default() && a.default_value().is_some());
        let timestamp = self
            .schema
            .timestamps()
            .and_then(|t| t.updated_at.as_deref())
            == Some(name);
        forced || timestamp
    }

    fn convert(
        &self,
        marshaller: &Marshaller<'_>,
        attribute: Option<&Attribute>,
        value: Value,
        path: &AttributePath,
    ) -> Result<(Value, aws_sdk_dynamodb::types::AttributeValue), Error> {
        match attribute {
            Some(attribute) => {
                let value = conform_value(self.schema, attribute, value, path, self.now)?;
                let av = marshaller.to_wire_at(attribute, &value, path)?;
                Ok((value, av))
            }
            None => {
                let av = infer_wire(&value, path)?;
                Ok((value, av))
            }
        }
    }
}

fn is_empty_set(attribute: Option<&Attribute>, value: &Value, schema: &Schema) -> bool {
    if !value.as_elements().map_or(false, <[Value]>::is_empty) {
        return false;
    }
    match attribute {
        Some(attribute) => {
            matches!(
                resolve_type(attribute.types(), value, "", schema),
                Ok(AttributeType::Set(_))
            )
        }
        None => matches!(value, Value::Set(_)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_dynamodb::types::AttributeValue;
    use dynamap_core::{object, SetElement, Timestamps};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn now() -> DateTime {
        DateTime::from_millis(1_000)
    }

    fn user() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id").hash_key())
            .attribute(Attribute::string("name").default("Bob"))
            .attribute(Attribute::number("age"))
            .attribute(Attribute::set("tags", SetElement::String))
            .attribute(
                Attribute::builder("friends").ty(AttributeType::list_of(AttributeType::String)),
            )
            .attribute(Attribute::string("nickname").required())
            .build()
            .unwrap()
    }

    fn build(schema: &Schema, spec: &UpdateSpec) -> Result<UpdateExpression, Error> {
        let key = object! { "id" => 1 };
        UpdateBuilder::new(schema, &key, now()).build(spec)
    }

    #[test]
    fn flat_sets() {
        let schema = user();
        let spec = UpdateSpec::from_object(&object! { "name" => "Charlie", "age" => 5 }).unwrap();
        let update = build(&schema, &spec).unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0, #a1 = :v1");
        assert_eq!(update.attributes.names["#a0"], "name");
        assert_eq!(update.attributes.names["#a1"], "age");
        assert_eq!(update.attributes.values[":v0"], AttributeValue::S("Charlie".into()));
        assert_eq!(update.attributes.values[":v1"], AttributeValue::N("5".into()));
    }

    #[test]
    fn remove_with_default_becomes_set() {
        let schema = user();
        let spec =
            UpdateSpec::from_object(&object! { "$REMOVE" => Value::list(["name"]) }).unwrap();
        let update = build(&schema, &spec).unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0");
        assert_eq!(update.attributes.values[":v0"], AttributeValue::S("Bob".into()));
    }

    #[test]
    fn undefined_values_remove() {
        let schema = user();
        let input = object! { "name" => Value::Undefined, "age" => Value::Undefined };
        let update = build(&schema, &UpdateSpec::from_object(&input).unwrap()).unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0 REMOVE #a1");
        assert_eq!(update.attributes.names["#a0"], "name");
        assert_eq!(update.attributes.names["#a1"], "age");
        assert_eq!(update.attributes.values.len(), 1);
        assert_eq!(update.attributes.values[":v0"], AttributeValue::S("Bob".into()));

        let update = build(&schema, &UpdateSpec::new().set("age", Value::Undefined)).unwrap();
        assert_eq!(update.expression, "REMOVE #a0");
    }

    #[test]
    fn remove_required_fails() {
        let schema = user();
        let err = build(&schema, &UpdateSpec::new().remove("nickname")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "nickname is a required property but has no value when trying to save item"
        );
    }

    #[test]
    fn sections_are_emitted_in_order() {
        let schema = user();
        let spec = UpdateSpec::new()
            .delete("tags", Value::set(["old"]))
            .remove("age")
            .set("name", "Tim")
            .add("friends", Value::list(["Ann"]));
        let update = build(&schema, &spec).unwrap();
        assert_eq!(
            update.expression,
            "SET #a2 = :v1, #a3 = list_append(#a3, :v2) REMOVE #a1 DELETE #a0 :v0"
        );
    }

    #[test]
    fn add_routes_by_type() {
        let schema = user();
        let update = build(
            &schema,
            &UpdateSpec::new().add("age", 1).add("tags", Value::list(["x"])),
        )
        .unwrap();
        assert_eq!(update.expression, "ADD #a0 :v0, #a1 :v1");
        assert_eq!(
            update.attributes.values[":v1"],
            AttributeValue::Ss(vec!["x".into()])
        );
        let err = build(&schema, &UpdateSpec::new().add("name", "x")).unwrap_err();
        assert!(err.is_invalid_parameter());
        let err = build(&schema, &UpdateSpec::new().delete("age", 1)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn keys_and_unknowns_are_skipped() {
        let schema = user();
        let update = build(
            &schema,
            &UpdateSpec::new().set("id", 2).set("other", 1).set("age", 3),
        )
        .unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0");
        assert_eq!(update.attributes.names["#a0"], "age");
        let err = build(&schema, &UpdateSpec::new().set("id", 2)).unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn empty_set_becomes_remove() {
        let schema = user();
        let update = build(&schema, &UpdateSpec::new().set("tags", Value::Set(vec![]))).unwrap();
        assert_eq!(update.expression, "REMOVE #a0");
    }

    #[test]
    fn type_mismatch_in_set() {
        let schema = user();
        let err = build(&schema, &UpdateSpec::new().set("age", "old")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Expected age to be of type number, instead found type string."
        );
    }

    fn combined() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::string("first"))
            .attribute(Attribute::string("last"))
            .attribute(Attribute::number("zip"))
            .attribute(
                Attribute::builder("full").ty(AttributeType::combine(["first", "last", "zip"])),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn combine_requires_every_source() {
        let schema = combined();
        let err = build(&schema, &UpdateSpec::new().set("first", "Ada")).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Attributes last, zip must be included when updating combine attribute full"
        );
        let update = build(
            &schema,
            &UpdateSpec::new().set("first", "Ada").set("last", "L").set("zip", 9),
        )
        .unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0, #a1 = :v1, #a2 = :v2, #a3 = :v3");
        assert_eq!(update.attributes.names["#a3"], "full");
        assert_eq!(update.attributes.values[":v3"], AttributeValue::S("Ada,L,9".into()));
    }

    #[test]
    fn combine_sources_in_the_key_count_as_present() {
        let schema = Schema::builder()
            .attribute(Attribute::string("pk").hash_key())
            .attribute(Attribute::string("name"))
            .attribute(Attribute::builder("label").ty(AttributeType::combine(["pk", "name"])))
            .build()
            .unwrap();
        let key = object! { "pk" => "a" };
        let update = UpdateBuilder::new(&schema, &key, now())
            .build(&UpdateSpec::new().set("name", "b"))
            .unwrap();
        assert_eq!(update.attributes.values[":v1"], AttributeValue::S("a,b".into()));
    }

    #[test]
    fn timestamps_and_forced_defaults_are_appended() {
        let schema = Schema::builder()
            .attribute(Attribute::number("id"))
            .attribute(Attribute::string("name"))
            .attribute(Attribute::number("rev").default(0).force_default())
            .timestamps(Timestamps::default())
            .build()
            .unwrap();
        let update = build(&schema, &UpdateSpec::new().set("name", "x").set("rev", 7)).unwrap();
        assert_eq!(update.expression, "SET #a0 = :v0, #a1 = :v1, #a2 = :v2");
        assert_eq!(update.attributes.names["#a1"], "rev");
        assert_eq!(update.attributes.values[":v1"], AttributeValue::N("0".into()));
        assert_eq!(update.attributes.names["#a2"], "updatedAt");
        assert_eq!(update.attributes.values[":v2"], AttributeValue::N("1000".into()));
    }

    #[test]
    fn caller_input_is_untouched() {
        let schema = user();
        let input = object! { "name" => "  Tim ", "$REMOVE" => "age" };
        let before = input.clone();
        let spec = UpdateSpec::from_object(&input).unwrap();
        build(&schema, &spec).unwrap();
        assert_eq!(input, before);
    }

    proptest! {
        #[test]
        fn placeholders_are_deterministic(
            name in "[a-z]{0,10}",
            age in any::<i32>(),
            remove_age in any::<bool>(),
        ) {
            let schema = user();
            let mut spec = UpdateSpec::new().set("name", name);
            spec = if remove_age { spec.remove("age") } else { spec.set("age", age) };
            let first = build(&schema, &spec).unwrap();
            let second = build(&schema, &spec).unwrap();
            prop_assert_eq!(first, second);
        }
    }
}
