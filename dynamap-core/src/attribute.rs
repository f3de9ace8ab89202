/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Attribute definitions.

use regex::Regex;
use std::fmt;
use std::sync::Arc;

use crate::hook::Hook;
use crate::types::{AttributeType, DateStorage, SetElement};
use crate::value::Value;

type Producer = Arc<dyn Fn(Option<&Value>) -> Value + Send + Sync>;
type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Default value of an attribute.
#[derive(Clone)]
pub enum DefaultValue {
    /// A fixed value.
    Static(Value),
    /// A function called each time a default is needed, given the current value if any.
    Producer(Producer),
}

impl DefaultValue {
    /// A default computed by a function that takes no input.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn() -> Value + Send + Sync + 'static,
    {
        DefaultValue::Producer(Arc::new(move |_| f()))
    }

    /// A default computed from the attribute's current value.
    pub fn from_fn_with<F>(f: F) -> Self
    where
        F: Fn(Option<&Value>) -> Value + Send + Sync + 'static,
    {
        DefaultValue::Producer(Arc::new(f))
    }

    /// Produces the default value.
    pub fn resolve(&self, current: Option<&Value>) -> Value {
        match self {
            DefaultValue::Static(value) => value.clone(),
            DefaultValue::Producer(f) => f(current),
        }
    }
}

impl fmt::Debug for DefaultValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Static(value) => f.debug_tuple("Static").field(value).finish(),
            DefaultValue::Producer(_) => f.write_str("Producer"),
        }
    }
}

/// Custom validation rule.
#[derive(Clone)]
pub enum Validator {
    /// The value must equal this value.
    Equals(Value),
    /// The value must be a string matching this pattern.
    Pattern(Regex),
    /// The predicate must return true.
    Predicate(Predicate),
}

impl Validator {
    /// A validator backed by a predicate.
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        Validator::Predicate(Arc::new(f))
    }

    /// Returns true if `value` passes.
    pub fn check(&self, value: &Value) -> bool {
        match self {
            Validator::Equals(expected) => expected == value,
            Validator::Pattern(re) => value.as_str().map(|s| re.is_match(s)).unwrap_or(false),
            Validator::Predicate(f) => f(value),
        }
    }
}

impl fmt::Debug for Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Validator::Equals(value) => f.debug_tuple("Equals").field(value).finish(),
            Validator::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            Validator::Predicate(_) => f.write_str("Predicate"),
        }
    }
}

/// A transformation applied to string values on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringModifier {
    /// Strip leading and trailing whitespace.
    Trim,
    /// Convert to lowercase.
    Lowercase,
    /// Convert to uppercase.
    Uppercase,
}

impl StringModifier {
    pub(crate) fn apply(&self, s: &str) -> String {
        match self {
            StringModifier::Trim => s.trim().to_string(),
            StringModifier::Lowercase => s.to_lowercase(),
            StringModifier::Uppercase => s.to_uppercase(),
        }
    }
}

/// One named attribute of a schema.
#[derive(Debug, Clone)]
pub struct Attribute {
    name: String,
    types: Vec<AttributeType>,
    required: bool,
    hash_key: bool,
    range_key: bool,
    index: bool,
    default: Option<DefaultValue>,
    force_default: bool,
    get: Option<Hook>,
    set: Option<Hook>,
    enumeration: Option<Vec<Value>>,
    validate: Option<Validator>,
    modifiers: Vec<StringModifier>,
}

impl Attribute {
    /// Creates a new builder-style object to manufacture an [`Attribute`].
    pub fn builder(name: impl Into<String>) -> AttributeBuilder {
        AttributeBuilder {
            name: name.into(),
            types: Vec::new(),
            required: false,
            hash_key: false,
            range_key: false,
            index: false,
            default: None,
            force_default: false,
            get: None,
            set: None,
            enumeration: None,
            validate: None,
            modifiers: Vec::new(),
        }
    }

    /// A string attribute.
    pub fn string(name: impl Into<String>) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::String)
    }

    /// A number attribute.
    pub fn number(name: impl Into<String>) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::Number)
    }

    /// A boolean attribute.
    pub fn boolean(name: impl Into<String>) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::Boolean)
    }

    /// A date attribute stored as epoch milliseconds.
    pub fn date(name: impl Into<String>) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::Date(DateStorage::Milliseconds))
    }

    /// A binary attribute.
    pub fn binary(name: impl Into<String>) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::Binary)
    }

    /// A set attribute.
    pub fn set(name: impl Into<String>, element: SetElement) -> AttributeBuilder {
        Self::builder(name).ty(AttributeType::Set(element))
    }

    /// The attribute name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Candidate types in declaration order.
    pub fn types(&self) -> &[AttributeType] {
        &self.types
    }

    /// The first declared type.
    pub fn primary_type(&self) -> &AttributeType {
        &self.types[0]
    }

    /// True if the attribute must have a value when saving.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// True if the attribute was declared as the hash key.
    pub fn is_hash_key(&self) -> bool {
        self.hash_key
    }

    /// True if the attribute was declared as the range key.
    pub fn is_range_key(&self) -> bool {
        self.range_key
    }

    /// True if the attribute participates in an index.
    pub fn is_index(&self) -> bool {
        self.index
    }

    /// The default value, if any.
    pub fn default_value(&self) -> Option<&DefaultValue> {
        self.default.as_ref()
    }

    /// True if the default always replaces supplied values.
    pub fn is_force_default(&self) -> bool {
        self.force_default
    }

    /// Hook applied after reading.
    pub fn get_hook(&self) -> Option<&Hook> {
        self.get.as_ref()
    }

    /// Hook applied before writing.
    pub fn set_hook(&self) -> Option<&Hook> {
        self.set.as_ref()
    }

    /// Allowed values, if constrained.
    pub fn enumeration(&self) -> Option<&[Value]> {
        self.enumeration.as_deref()
    }

    /// Custom validation rule.
    pub fn validator(&self) -> Option<&Validator> {
        self.validate.as_ref()
    }

    /// String modifiers in application order.
    pub fn modifiers(&self) -> &[StringModifier] {
        &self.modifiers
    }

    /// The combine definition, if this is a combine attribute.
    pub fn combine(&self) -> Option<(&[String], &str)> {
        self.types.iter().find_map(|ty| match ty {
            AttributeType::Combine {
                attributes,
                separator,
            } => Some((attributes.as_slice(), separator.as_str())),
            _ => None,
        })
    }

    /// The constant literal, if the attribute declares one.
    pub fn constant(&self) -> Option<&Value> {
        self.types.iter().find_map(|ty| match ty {
            AttributeType::Constant(value) => Some(value),
            _ => None,
        })
    }
}

/// Builder for [`Attribute`].
#[derive(Debug, Clone)]
pub struct AttributeBuilder {
    name: String,
    types: Vec<AttributeType>,
    required: bool,
    hash_key: bool,
    range_key: bool,
    index: bool,
    default: Option<DefaultValue>,
    force_default: bool,
    get: Option<Hook>,
    set: Option<Hook>,
    enumeration: Option<Vec<Value>>,
    validate: Option<Validator>,
    modifiers: Vec<StringModifier>,
}

impl AttributeBuilder {
    /// Adds a candidate type. Types are tried in the order they are added.
    pub fn ty(mut self, ty: AttributeType) -> Self {
        self.types.push(ty);
        self
    }

    /// Marks the attribute as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the attribute as the hash key.
    pub fn hash_key(mut self) -> Self {
        self.hash_key = true;
        self
    }

    /// Marks the attribute as the range key.
    pub fn range_key(mut self) -> Self {
        self.range_key = true;
        self
    }

    /// Marks the attribute as part of an index.
    pub fn index(mut self) -> Self {
        self.index = true;
        self
    }

    /// Sets a fixed default value.
    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(DefaultValue::Static(value.into()));
        self
    }

    /// Sets a default computed by a function.
    pub fn default_with(mut self, default: DefaultValue) -> Self {
        self.default = Some(default);
        self
    }

    /// Sets or clears the default value.
    pub fn set_default(mut self, default: Option<DefaultValue>) -> Self {
        self.default = default;
        self
    }

    /// Makes the default replace any supplied value.
    pub fn force_default(mut self) -> Self {
        self.force_default = true;
        self
    }

    /// Sets the hook applied after reading.
    pub fn get(mut self, hook: Hook) -> Self {
        self.get = Some(hook);
        self
    }

    /// Sets the hook applied before writing.
    pub fn set(mut self, hook: Hook) -> Self {
        self.set = Some(hook);
        self
    }

    /// Restricts values to the given list.
    pub fn enumeration<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.enumeration = Some(values.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the custom validation rule.
    pub fn validate(mut self, validator: Validator) -> Self {
        self.validate = Some(validator);
        self
    }

    /// Trims string values on write.
    pub fn trim(mut self) -> Self {
        self.modifiers.push(StringModifier::Trim);
        self
    }

    /// Lowercases string values on write.
    pub fn lowercase(mut self) -> Self {
        self.modifiers.push(StringModifier::Lowercase);
        self
    }

    /// Uppercases string values on write.
    pub fn uppercase(mut self) -> Self {
        self.modifiers.push(StringModifier::Uppercase);
        self
    }

    /// Consumes the builder and constructs an [`Attribute`].
    ///
    /// An attribute declared without any type is an `any` attribute.
    pub fn build(self) -> Attribute {
        let types = if self.types.is_empty() {
            vec![AttributeType::Any]
        } else {
            self.types
        };
        Attribute {
            name: self.name,
            types,
            required: self.required,
            hash_key: self.hash_key,
            range_key: self.range_key,
            index: self.index,
            default: self.default,
            force_default: self.force_default,
            get: self.get,
            set: self.set,
            enumeration: self.enumeration,
            validate: self.validate,
            modifiers: self.modifiers,
        }
    }
}

impl From<AttributeBuilder> for Attribute {
    fn from(builder: AttributeBuilder) -> Self {
        builder.build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untyped_attribute_is_any() {
        let attr = Attribute::builder("data").build();
        assert!(matches!(attr.primary_type(), AttributeType::Any));
    }

    #[test]
    fn producer_defaults_see_current_value() {
        let default = DefaultValue::from_fn_with(|current| match current {
            Some(Value::String(s)) => Value::from(format!("{}!", s)),
            _ => Value::from("none"),
        });
        assert_eq!(default.resolve(None), Value::from("none"));
        assert_eq!(default.resolve(Some(&Value::from("a"))), Value::from("a!"));
    }

    #[test]
    fn validators() {
        let pattern = Validator::Pattern(Regex::new("^[a-z]+$").unwrap());
        assert!(pattern.check(&Value::from("abc")));
        assert!(!pattern.check(&Value::from("ABC")));
        assert!(!pattern.check(&Value::from(1)));
        assert!(Validator::Equals(Value::from(5)).check(&Value::from(5.0)));
        assert!(Validator::predicate(|v| v.as_number().is_some()).check(&Value::from(1)));
    }

    #[test]
    fn combine_accessor() {
        let attr = Attribute::builder("full")
            .ty(AttributeType::combine(["first", "last"]))
            .build();
        let (sources, separator) = attr.combine().unwrap();
        assert_eq!(sources, ["first".to_string(), "last".to_string()]);
        assert_eq!(separator, ",");
    }
}
