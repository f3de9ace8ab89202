/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Table, model and per operation settings.

use aws_sdk_dynamodb::types::ReturnValue;
use dynamap_expressions::Condition;
use std::time::Duration;

/// Name of the expiry attribute when none is configured.
pub const DEFAULT_EXPIRY_ATTRIBUTE: &str = "ttl";

/// Item expiry (time to live) settings for a table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expires {
    ttl: Duration,
    attribute: String,
    return_expired: bool,
}

impl Expires {
    /// Items expire `ttl` after they are created.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            attribute: DEFAULT_EXPIRY_ATTRIBUTE.to_string(),
            return_expired: true,
        }
    }

    /// Stores the expiry time in `attribute` instead of `ttl`.
    pub fn attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = attribute.into();
        self
    }

    /// Whether reads return items whose expiry time has passed but that the database has not
    /// deleted yet. Defaults to `true`.
    pub fn return_expired(mut self, return_expired: bool) -> Self {
        self.return_expired = return_expired;
        self
    }

    /// How long items live.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The attribute holding the expiry time.
    pub fn attribute_name(&self) -> &str {
        &self.attribute
    }

    /// Whether expired items are returned by reads.
    pub fn returns_expired(&self) -> bool {
        self.return_expired
    }
}

/// Options applied to a whole table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableOptions {
    expires: Option<Expires>,
    prefix: Option<String>,
    suffix: Option<String>,
}

impl TableOptions {
    /// Creates a new builder.
    pub fn builder() -> TableOptionsBuilder {
        TableOptionsBuilder::default()
    }

    /// Expiry settings, if enabled.
    pub fn expires(&self) -> Option<&Expires> {
        self.expires.as_ref()
    }

    /// Applies the configured prefix and suffix to a table name.
    pub fn table_name(&self, name: &str) -> String {
        format!(
            "{}{}{}",
            self.prefix.as_deref().unwrap_or_default(),
            name,
            self.suffix.as_deref().unwrap_or_default()
        )
    }
}

/// Builder for [`TableOptions`].
#[derive(Debug, Clone, Default)]
pub struct TableOptionsBuilder {
    expires: Option<Expires>,
    prefix: Option<String>,
    suffix: Option<String>,
}

impl TableOptionsBuilder {
    /// Enables item expiry.
    pub fn expires(mut self, expires: Expires) -> Self {
        self.set_expires(Some(expires));
        self
    }

    /// Enables or disables item expiry.
    pub fn set_expires(&mut self, expires: Option<Expires>) -> &mut Self {
        self.expires = expires;
        self
    }

    /// Prepended to the table name.
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.set_prefix(Some(prefix.into()));
        self
    }

    /// Sets or clears the table name prefix.
    pub fn set_prefix(&mut self, prefix: Option<String>) -> &mut Self {
        self.prefix = prefix;
        self
    }

    /// Appended to the table name.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.set_suffix(Some(suffix.into()));
        self
    }

    /// Sets or clears the table name suffix.
    pub fn set_suffix(&mut self, suffix: Option<String>) -> &mut Self {
        self.suffix = suffix;
        self
    }

    /// Builds the options.
    pub fn build(self) -> TableOptions {
        TableOptions {
            expires: self.expires,
            prefix: self.prefix,
            suffix: self.suffix,
        }
    }
}

/// Options applied to one model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelOptions {
    auto_populate: bool,
}

impl ModelOptions {
    /// Creates a new builder.
    pub fn builder() -> ModelOptionsBuilder {
        ModelOptionsBuilder::default()
    }

    /// Whether reads resolve self references before returning.
    pub fn auto_populate(&self) -> bool {
        self.auto_populate
    }
}

/// Builder for [`ModelOptions`].
#[derive(Debug, Clone, Default)]
pub struct ModelOptionsBuilder {
    auto_populate: Option<bool>,
}

impl ModelOptionsBuilder {
    /// Resolve self references on every read.
    pub fn auto_populate(mut self, auto_populate: bool) -> Self {
        self.set_auto_populate(Some(auto_populate));
        self
    }

    /// Sets or clears auto populate.
    pub fn set_auto_populate(&mut self, auto_populate: Option<bool>) -> &mut Self {
        self.auto_populate = auto_populate;
        self
    }

    /// Builds the options.
    pub fn build(self) -> ModelOptions {
        ModelOptions {
            auto_populate: self.auto_populate.unwrap_or_default(),
        }
    }
}

/// Settings for `get`.
#[derive(Debug, Clone, Default)]
pub struct GetSettings {
    pub(crate) consistent: bool,
    pub(crate) attributes: Vec<String>,
}

impl GetSettings {
    /// Default settings: eventually consistent, every attribute.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a strongly consistent read.
    pub fn consistent(mut self, consistent: bool) -> Self {
        self.consistent = consistent;
        self
    }

    /// Only return these attributes.
    pub fn attributes<I, S>(mut self, attributes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.attributes = attributes.into_iter().map(Into::into).collect();
        self
    }
}

/// Settings for `batch_get`.
pub type BatchGetSettings = GetSettings;

/// Settings for `create`.
#[derive(Debug, Clone)]
pub struct CreateSettings {
    pub(crate) overwrite: bool,
    pub(crate) condition: Option<Condition>,
}

impl Default for CreateSettings {
    fn default() -> Self {
        Self {
            overwrite: true,
            condition: None,
        }
    }
}

impl CreateSettings {
    /// Default settings: overwrite any existing item.
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, the write fails if an item with the same key exists.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Only write when `condition` holds.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

/// Settings for `update`.
#[derive(Debug, Clone)]
pub struct UpdateSettings {
    pub(crate) condition: Option<Condition>,
    pub(crate) return_values: ReturnValue,
}

impl Default for UpdateSettings {
    fn default() -> Self {
        Self {
            condition: None,
            return_values: ReturnValue::AllNew,
        }
    }
}

impl UpdateSettings {
    /// Default settings: unconditional, returning the whole updated item.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only update when `condition` holds.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }

    /// Which attributes the database returns.
    pub fn return_values(mut self, return_values: ReturnValue) -> Self {
        self.return_values = return_values;
        self
    }
}

/// Settings for `delete`.
#[derive(Debug, Clone, Default)]
pub struct DeleteSettings {
    pub(crate) condition: Option<Condition>,
}

impl DeleteSettings {
    /// Default settings: unconditional.
    pub fn new() -> Self {
        Self::default()
    }

    /// Only delete when `condition` holds.
    pub fn condition(mut self, condition: Condition) -> Self {
        self.condition = Some(condition);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_are_decorated() {
        let options = TableOptions::builder()
            .prefix("dev_")
            .suffix("_v2")
            .build();
        assert_eq!(options.table_name("users"), "dev_users_v2");
        assert_eq!(TableOptions::default().table_name("users"), "users");
    }

    #[test]
    fn expiry_defaults() {
        let expires = Expires::new(Duration::from_secs(60));
        assert_eq!(expires.attribute_name(), "ttl");
        assert!(expires.returns_expired());
        let expires = expires.attribute("expiresAt").return_expired(false);
        assert_eq!(expires.attribute_name(), "expiresAt");
        assert!(!expires.returns_expired());
    }

    #[test]
    fn operation_defaults() {
        assert!(CreateSettings::new().overwrite);
        assert_eq!(UpdateSettings::new().return_values, ReturnValue::AllNew);
        assert!(!GetSettings::new().consistent);
    }
}
