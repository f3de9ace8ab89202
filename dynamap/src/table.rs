/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Tables and the models registered with them.

use aws_smithy_async::time::{SharedTimeSource, SystemTimeSource, TimeSource};
use aws_smithy_types::DateTime;
use dynamap_core::{Attribute, AttributeType, DateStorage, DefaultValue, Schema, Value};
use indexmap::IndexMap;
use std::sync::Arc;

use crate::config::{ModelOptions, TableOptions};
use crate::error::Error;
use crate::gate::ReadinessGate;
use crate::model::Model;
use crate::request::{Request, Response};
use crate::transaction::Transaction;
use crate::transport::{SharedTransport, Transport};

/// A model name, its schemas and options, before it is registered with a table.
#[derive(Debug, Clone)]
pub struct ModelDefinition {
    name: String,
    schemas: Vec<Schema>,
    options: ModelOptions,
}

impl ModelDefinition {
    /// Defines a model with a single schema.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schemas: vec![schema],
            options: ModelOptions::default(),
        }
    }

    /// Adds an alternative schema. Reads and writes pick the schema that best fits each item.
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schemas.push(schema);
        self
    }

    /// Sets the model options.
    pub fn options(mut self, options: ModelOptions) -> Self {
        self.options = options;
        self
    }
}

#[derive(Debug)]
pub(crate) struct ModelInner {
    pub(crate) name: String,
    pub(crate) schemas: Vec<Arc<Schema>>,
    pub(crate) options: ModelOptions,
}

#[derive(Debug)]
pub(crate) struct TableInner {
    pub(crate) name: String,
    pub(crate) options: TableOptions,
    pub(crate) models: IndexMap<String, Arc<ModelInner>>,
    transport: SharedTransport,
    gate: ReadinessGate,
    time_source: SharedTimeSource,
}

impl TableInner {
    pub(crate) fn now(&self) -> DateTime {
        DateTime::from(self.time_source.now())
    }

    pub(crate) async fn wait_ready(&self) {
        if !self.gate.is_ready() {
            tracing::debug!(table = %self.name, "waiting for table to become ready");
        }
        self.gate.wait_ready().await;
    }

    /// Sends a request once the table is ready. Every database facing operation goes through
    /// here exactly once.
    pub(crate) async fn send(&self, request: Request) -> Result<Response, Error> {
        self.wait_ready().await;
        self.send_ready(request).await
    }

    pub(crate) async fn send_ready(&self, request: Request) -> Result<Response, Error> {
        tracing::debug!(
            operation = request.operation_name(),
            table = %self.name,
            "sending request"
        );
        self.transport.send(request).await.map_err(Error::Transport)
    }
}

/// A DynamoDB table and the models stored in it.
///
/// Operations issued before [`initialize`](Table::initialize) is called are held and sent, in
/// the order they were issued, once it is.
#[derive(Clone, Debug)]
pub struct Table {
    pub(crate) inner: Arc<TableInner>,
}

impl Table {
    /// Creates a new builder for the table `name`.
    pub fn builder(name: impl Into<String>) -> TableBuilder {
        TableBuilder {
            name: name.into(),
            models: Vec::new(),
            options: TableOptions::default(),
            transport: None,
            time_source: None,
        }
    }

    /// The table name, including any configured prefix and suffix.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The table options.
    pub fn options(&self) -> &TableOptions {
        &self.inner.options
    }

    /// Marks the table ready and releases every held operation.
    ///
    /// Returns the number of operations released.
    pub fn initialize(&self) -> usize {
        let released = self.inner.gate.mark_ready();
        tracing::debug!(table = %self.inner.name, released, "table initialized");
        released
    }

    /// True once [`initialize`](Table::initialize) has been called.
    pub fn is_ready(&self) -> bool {
        self.inner.gate.is_ready()
    }

    /// Number of operations waiting for [`initialize`](Table::initialize).
    pub fn pending_operations(&self) -> usize {
        self.inner.gate.pending()
    }

    /// Returns the model registered under `name`.
    pub fn model(&self, name: &str) -> Option<Model> {
        self.inner.models.get(name).map(|model| Model {
            table: self.inner.clone(),
            inner: model.clone(),
        })
    }

    /// Names of the registered models, in registration order.
    pub fn model_names(&self) -> impl Iterator<Item = &str> {
        self.inner.models.keys().map(String::as_str)
    }

    /// Starts a transaction that may span the models of this table.
    pub fn transaction(&self) -> Transaction {
        Transaction::new().table(self)
    }
}

/// Builder for [`Table`].
#[derive(Debug)]
pub struct TableBuilder {
    name: String,
    models: Vec<ModelDefinition>,
    options: TableOptions,
    transport: Option<SharedTransport>,
    time_source: Option<SharedTimeSource>,
}

impl TableBuilder {
    /// Registers a model.
    pub fn model(mut self, model: ModelDefinition) -> Self {
        self.models.push(model);
        self
    }

    /// Sets the table options.
    pub fn options(mut self, options: TableOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the transport requests are sent through. Required.
    pub fn transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(SharedTransport::new(transport));
        self
    }

    /// Sets the clock used for timestamps, defaults and expiry. Defaults to the system clock.
    pub fn time_source(mut self, time_source: impl TimeSource + 'static) -> Self {
        self.time_source = Some(SharedTimeSource::new(time_source));
        self
    }

    /// Builds the table.
    ///
    /// Fails when no transport or no model is configured, when two models share a name, or when
    /// schemas stored in the table disagree on the key attributes.
    pub fn build(self) -> Result<Table, Error> {
        let transport = self
            .transport
            .ok_or_else(|| Error::invalid_parameter("A transport is required to build a table"))?;
        if self.models.is_empty() {
            return Err(Error::invalid_parameter(format!(
                "Table {} must have at least one model",
                self.name
            )));
        }
        let time_source = self
            .time_source
            .unwrap_or_else(|| SharedTimeSource::new(SystemTimeSource::new()));

        let mut key: Option<(String, Option<String>)> = None;
        let mut models = IndexMap::new();
        for definition in self.models {
            if models.contains_key(&definition.name) {
                return Err(Error::invalid_parameter(format!(
                    "Model {} is registered more than once",
                    definition.name
                )));
            }
            let mut schemas = Vec::with_capacity(definition.schemas.len());
            for mut schema in definition.schemas {
                let schema_key = (
                    schema.hash_key().to_string(),
                    schema.range_key().map(str::to_string),
                );
                match &key {
                    None => key = Some(schema_key),
                    Some(expected) if *expected != schema_key => {
                        return Err(Error::invalid_parameter(format!(
                            "All schemas of table {} must use the same hash and range key",
                            self.name
                        )));
                    }
                    Some(_) => {}
                }
                if let Some(expires) = self.options.expires() {
                    if schema.attribute(expires.attribute_name()).is_none() {
                        let time_source = time_source.clone();
                        let ttl = expires.ttl();
                        schema.add_attribute(
                            Attribute::builder(expires.attribute_name())
                                .ty(AttributeType::Date(DateStorage::Seconds))
                                .default_with(DefaultValue::from_fn(move || {
                                    Value::Date(DateTime::from(time_source.now() + ttl))
                                }))
                                .build(),
                        )?;
                    }
                }
                schemas.push(Arc::new(schema));
            }
            models.insert(
                definition.name.clone(),
                Arc::new(ModelInner {
                    name: definition.name,
                    schemas,
                    options: definition.options,
                }),
            );
        }

        let name = self.options.table_name(&self.name);
        tracing::debug!(table = %name, models = models.len(), "built table");
        Ok(Table {
            inner: Arc::new(TableInner {
                name,
                options: self.options,
                models,
                transport,
                gate: ReadinessGate::new(),
                time_source,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Expires;
    use crate::test_util::{FixedTimeSource, MockTransport, RuleBuilder};
    use aws_sdk_dynamodb::operation::get_item::{GetItemInput, GetItemOutput};
    use std::time::Duration;
    use tracing_test::traced_test;

    fn user_schema() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id").hash_key())
            .attribute(Attribute::string("name"))
            .build()
            .unwrap()
    }

    #[test]
    fn transport_is_required() {
        let err = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .build()
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn names_and_models() {
        let table = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .options(TableOptions::builder().prefix("test_").build())
            .transport(MockTransport::new())
            .build()
            .unwrap();
        assert_eq!(table.name(), "test_users");
        assert!(table.model("User").is_some());
        assert!(table.model("Missing").is_none());
        assert_eq!(table.model_names().collect::<Vec<_>>(), vec!["User"]);
        assert!(!table.is_ready());
        assert_eq!(table.initialize(), 0);
        assert!(table.is_ready());
    }

    #[test]
    fn schemas_must_share_keys() {
        let other = Schema::builder()
            .attribute(Attribute::string("pk").hash_key())
            .build()
            .unwrap();
        let err = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .model(ModelDefinition::new("Other", other))
            .transport(MockTransport::new())
            .build()
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn duplicate_models_are_rejected() {
        let err = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .model(ModelDefinition::new("User", user_schema()))
            .transport(MockTransport::new())
            .build()
            .unwrap_err();
        assert!(err.is_invalid_parameter());
    }

    #[test]
    fn expiry_adds_a_seconds_date_attribute() {
        let table = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .options(
                TableOptions::builder()
                    .expires(Expires::new(Duration::from_secs(60)))
                    .build(),
            )
            .transport(MockTransport::new())
            .time_source(FixedTimeSource::from_secs(1_000))
            .build()
            .unwrap();
        let model = table.model("User").unwrap();
        let ttl = model.schemas()[0].attribute("ttl").unwrap();
        assert!(matches!(
            ttl.types(),
            [AttributeType::Date(DateStorage::Seconds)]
        ));
        assert_eq!(
            ttl.default_value().unwrap().resolve(None),
            Value::Date(DateTime::from_secs(1_060))
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn sends_are_logged_with_operation_and_table() {
        let rule = RuleBuilder::new().then_output(|_| GetItemOutput::builder().build().into());
        let table = Table::builder("users")
            .model(ModelDefinition::new("User", user_schema()))
            .transport(MockTransport::new().with_rule(&rule))
            .build()
            .unwrap();
        table.initialize();
        let request = GetItemInput::builder()
            .table_name("users")
            .build()
            .unwrap();
        table.inner.send(request.into()).await.unwrap();
        assert!(logs_contain("sending request"));
        assert!(logs_contain("GetItem"));
        assert!(logs_contain("table=users"));
    }
}
