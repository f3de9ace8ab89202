/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Item operations for one model.
//!
//! Every operation has a `*_request` form that runs the same local pipeline (set hooks,
//! conformance, marshalling and expression building) and returns the request instead of
//! sending it. The sending form waits on the table's readiness gate once, then hands the
//! request to the transport.

use aws_sdk_dynamodb::operation::batch_get_item::BatchGetItemInput;
use aws_sdk_dynamodb::operation::batch_write_item::BatchWriteItemInput;
use aws_sdk_dynamodb::operation::delete_item::DeleteItemInput;
use aws_sdk_dynamodb::operation::get_item::GetItemInput;
use aws_sdk_dynamodb::operation::put_item::PutItemInput;
use aws_sdk_dynamodb::operation::update_item::UpdateItemInput;
use aws_sdk_dynamodb::types::{
    AttributeValue, DeleteRequest, KeysAndAttributes, PutRequest, WriteRequest,
};
use dynamap_core::conform::conform_create;
use dynamap_core::hook::{apply_get_hooks, apply_set_hooks, apply_set_hooks_at};
use dynamap_core::{select_schema, KeySpec, Marshaller, Object, Schema, Value, WireItem};
use dynamap_expressions::{
    CompiledCondition, Condition, ExpressionAttributes, Projection, UpdateAction, UpdateBuilder,
    UpdateSpec,
};
use std::collections::HashSet;
use std::sync::Arc;

use crate::batch::{correlate, BatchWriteResult, ItemArray};
use crate::config::{
    BatchGetSettings, CreateSettings, DeleteSettings, GetSettings, ModelOptions, UpdateSettings,
};
use crate::error::Error;
use crate::request::Response;
use crate::table::{ModelInner, TableInner};
use crate::transaction::ModelTransaction;

/// Name placeholder used by the `overwrite: false` create condition.
const HASH_KEY_PLACEHOLDER: &str = "#__hash_key";

/// A model registered with a [`Table`](crate::Table).
///
/// Cloning is cheap; clones share the table, its transport and its readiness gate.
#[derive(Clone, Debug)]
pub struct Model {
    pub(crate) table: Arc<TableInner>,
    pub(crate) inner: Arc<ModelInner>,
}

/// A create that has been through hooks, conformance and marshalling.
#[derive(Debug)]
pub(crate) struct PreparedPut {
    pub(crate) item: WireItem,
    pub(crate) object: Object,
    pub(crate) condition: Option<CompiledCondition>,
}

/// An update that has been through hooks and expression building.
#[derive(Debug)]
pub(crate) struct PreparedUpdate {
    pub(crate) key: WireItem,
    pub(crate) expression: String,
    pub(crate) condition: Option<String>,
    pub(crate) attributes: ExpressionAttributes,
}

impl Model {
    /// The model name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The name of the table the model is stored in.
    pub fn table_name(&self) -> &str {
        &self.table.name
    }

    /// The model's schemas, in declaration order.
    pub fn schemas(&self) -> &[Arc<Schema>] {
        &self.inner.schemas
    }

    /// The first schema. Every schema of a model shares its key attributes.
    pub fn schema(&self) -> &Schema {
        &self.inner.schemas[0]
    }

    /// The model options.
    pub fn options(&self) -> &ModelOptions {
        &self.inner.options
    }

    /// Builds transaction fragments for this model.
    pub fn transaction(&self) -> ModelTransaction<'_> {
        ModelTransaction::new(self)
    }

    pub(crate) fn schema_for<'k, I>(&self, names: I) -> &Schema
    where
        I: IntoIterator<Item = &'k str> + Clone,
    {
        match select_schema(&self.inner.schemas, names) {
            Some(schema) => schema.as_ref(),
            None => self.schema(),
        }
    }

    pub(crate) fn key_spec(&self, key: &Value) -> Result<KeySpec, Error> {
        Ok(KeySpec::from_value(self.schema(), key)?)
    }

    fn is_expired(&self, item: &WireItem) -> bool {
        let Some(expires) = self.table.options.expires() else {
            return false;
        };
        if expires.returns_expired() {
            return false;
        }
        match item.get(expires.attribute_name()) {
            Some(AttributeValue::N(secs)) => secs
                .parse::<i64>()
                .map(|secs| secs < self.table.now().secs())
                .unwrap_or(false),
            _ => false,
        }
    }

    /// Converts an item read from the database and runs the get hooks.
    pub(crate) async fn decode(&self, item: &WireItem) -> Result<Object, Error> {
        let schema = self.schema_for(item.keys().map(String::as_str));
        let object = Marshaller::new(schema).from_item(item)?;
        Ok(apply_get_hooks(schema, object).await?)
    }

    /// Like [`decode`](Self::decode), but drops expired items.
    pub(crate) async fn read(&self, item: &WireItem) -> Result<Option<Object>, Error> {
        if self.is_expired(item) {
            tracing::trace!(model = %self.inner.name, "dropping expired item");
            return Ok(None);
        }
        self.decode(item).await.map(Some)
    }

    /// Builds the `GetItem` request for `key` without sending it.
    ///
    /// `key` is either the hash key value or an object containing the key attributes; other
    /// attributes in the object are ignored.
    pub fn get_request(
        &self,
        key: impl Into<Value>,
        settings: &GetSettings,
    ) -> Result<GetItemInput, Error> {
        let key = self.key_spec(&key.into())?;
        let projection = Projection::new(settings.attributes.iter().map(String::as_str));
        GetItemInput::builder()
            .table_name(self.table_name())
            .set_key(Some(key.to_key_map()))
            .set_consistent_read(settings.consistent.then_some(true))
            .set_projection_expression(projection.as_ref().map(|p| p.expression.clone()))
            .set_expression_attribute_names(
                projection.and_then(|p| p.attributes.names_map()),
            )
            .build()
            .map_err(Error::build("GetItem"))
    }

    /// Reads one item. Returns `None` when no item has the key.
    pub async fn get(
        &self,
        key: impl Into<Value>,
        settings: &GetSettings,
    ) -> Result<Option<Object>, Error> {
        let item = self.fetch(key.into(), settings).await?;
        match item {
            Some(object) if self.inner.options.auto_populate() => {
                Ok(Some(self.populate(object).await?))
            }
            other => Ok(other),
        }
    }

    pub(crate) async fn fetch(
        &self,
        key: Value,
        settings: &GetSettings,
    ) -> Result<Option<Object>, Error> {
        let input = self.get_request(key, settings)?;
        match self.table.send(input.into()).await? {
            Response::GetItem(output) => match output.item() {
                Some(item) => self.read(item).await,
                None => Ok(None),
            },
            _ => Err(Error::UnexpectedResponse {
                operation: "GetItem",
            }),
        }
    }

    pub(crate) async fn prepare_put(
        &self,
        item: &Object,
        overwrite: bool,
        condition: Option<&Condition>,
    ) -> Result<PreparedPut, Error> {
        let schema = self.schema_for(item.keys().map(String::as_str));
        let hooked = apply_set_hooks(schema, item.clone()).await?;
        let object = conform_create(schema, &hooked, self.table.now())?;
        let wire = Marshaller::new(schema).to_item(&object)?;
        let condition = put_condition(schema, overwrite, condition)?;
        Ok(PreparedPut {
            item: wire,
            object,
            condition,
        })
    }

    fn put_input(&self, prepared: PreparedPut) -> Result<PutItemInput, Error> {
        let (expression, attributes) = split_condition(prepared.condition);
        PutItemInput::builder()
            .table_name(self.table_name())
            .set_item(Some(prepared.item))
            .set_condition_expression(expression)
            .set_expression_attribute_names(attributes.names_map())
            .set_expression_attribute_values(attributes.values_map())
            .build()
            .map_err(Error::build("PutItem"))
    }

    /// Builds the `PutItem` request for a new item without sending it.
    pub async fn create_request(
        &self,
        item: &Object,
        settings: &CreateSettings,
    ) -> Result<PutItemInput, Error> {
        let prepared = self
            .prepare_put(item, settings.overwrite, settings.condition.as_ref())
            .await?;
        self.put_input(prepared)
    }

    /// Writes a new item and returns it as stored, with defaults, timestamps and combine
    /// attributes filled in.
    ///
    /// `item` is never modified.
    pub async fn create(&self, item: &Object, settings: &CreateSettings) -> Result<Object, Error> {
        let prepared = self
            .prepare_put(item, settings.overwrite, settings.condition.as_ref())
            .await?;
        let object = prepared.object.clone();
        let input = self.put_input(prepared)?;
        match self.table.send(input.into()).await? {
            Response::PutItem(_) => Ok(object),
            _ => Err(Error::UnexpectedResponse {
                operation: "PutItem",
            }),
        }
    }

    pub(crate) async fn prepare_update(
        &self,
        key: Value,
        update: &UpdateSpec,
        condition: Option<&Condition>,
    ) -> Result<PreparedUpdate, Error> {
        let key = self.key_spec(&key)?;
        let key_object = key.to_object(self.schema())?;
        let names: Vec<&str> = key_object
            .keys()
            .map(String::as_str)
            .chain(update.actions().iter().filter_map(|(path, _)| path.top_level()))
            .collect();
        let schema = self.schema_for(names.iter().copied());

        let mut hooked = UpdateSpec::new();
        for (path, action) in update.actions() {
            hooked = match action {
                UpdateAction::Set(value) => {
                    let value = apply_set_hooks_at(schema, path, value.clone()).await?;
                    hooked.set(path.clone(), value)
                }
                UpdateAction::Add(value) => hooked.add(path.clone(), value.clone()),
                UpdateAction::Remove => hooked.remove(path.clone()),
                UpdateAction::Delete(value) => hooked.delete(path.clone(), value.clone()),
            };
        }

        let expression = UpdateBuilder::new(schema, &key_object, self.table.now()).build(&hooked)?;
        let mut attributes = expression.attributes;
        let condition = compile_condition(schema, condition)?.map(|compiled| {
            attributes.merge(compiled.attributes);
            compiled.expression
        });
        Ok(PreparedUpdate {
            key: key.to_key_map(),
            expression: expression.expression,
            condition,
            attributes,
        })
    }

    /// Builds the `UpdateItem` request without sending it.
    pub async fn update_request(
        &self,
        key: impl Into<Value>,
        update: &UpdateSpec,
        settings: &UpdateSettings,
    ) -> Result<UpdateItemInput, Error> {
        let prepared = self
            .prepare_update(key.into(), update, settings.condition.as_ref())
            .await?;
        UpdateItemInput::builder()
            .table_name(self.table_name())
            .set_key(Some(prepared.key))
            .update_expression(prepared.expression)
            .set_condition_expression(prepared.condition)
            .set_expression_attribute_names(prepared.attributes.names_map())
            .set_expression_attribute_values(prepared.attributes.values_map())
            .return_values(settings.return_values.clone())
            .build()
            .map_err(Error::build("UpdateItem"))
    }

    /// Updates one item.
    ///
    /// Returns the attributes selected by the settings' return values, or `None` when the
    /// database returned none.
    pub async fn update(
        &self,
        key: impl Into<Value>,
        update: &UpdateSpec,
        settings: &UpdateSettings,
    ) -> Result<Option<Object>, Error> {
        let input = self.update_request(key, update, settings).await?;
        match self.table.send(input.into()).await? {
            Response::UpdateItem(output) => match output.attributes() {
                Some(item) if !item.is_empty() => self.decode(item).await.map(Some),
                _ => Ok(None),
            },
            _ => Err(Error::UnexpectedResponse {
                operation: "UpdateItem",
            }),
        }
    }

    /// Builds the `DeleteItem` request without sending it.
    pub fn delete_request(
        &self,
        key: impl Into<Value>,
        settings: &DeleteSettings,
    ) -> Result<DeleteItemInput, Error> {
        let key = self.key_spec(&key.into())?;
        let condition = compile_condition(self.schema(), settings.condition.as_ref())?;
        let (expression, attributes) = split_condition(condition);
        DeleteItemInput::builder()
            .table_name(self.table_name())
            .set_key(Some(key.to_key_map()))
            .set_condition_expression(expression)
            .set_expression_attribute_names(attributes.names_map())
            .set_expression_attribute_values(attributes.values_map())
            .build()
            .map_err(Error::build("DeleteItem"))
    }

    /// Deletes one item.
    pub async fn delete(
        &self,
        key: impl Into<Value>,
        settings: &DeleteSettings,
    ) -> Result<(), Error> {
        let input = self.delete_request(key, settings)?;
        match self.table.send(input.into()).await? {
            Response::DeleteItem(_) => Ok(()),
            _ => Err(Error::UnexpectedResponse {
                operation: "DeleteItem",
            }),
        }
    }

    fn unique_keys(&self, keys: &[Value]) -> Result<Vec<KeySpec>, Error> {
        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(keys.len());
        for key in keys {
            let spec = self.key_spec(key)?;
            if seen.insert(spec.fingerprint()) {
                specs.push(spec);
            }
        }
        Ok(specs)
    }

    fn batch_get_input(
        &self,
        keys: &[KeySpec],
        settings: &BatchGetSettings,
    ) -> Result<BatchGetItemInput, Error> {
        let projection = Projection::new(settings.attributes.iter().map(String::as_str));
        let request = KeysAndAttributes::builder()
            .set_keys(Some(keys.iter().map(KeySpec::to_key_map).collect()))
            .set_consistent_read(settings.consistent.then_some(true))
            .set_projection_expression(projection.as_ref().map(|p| p.expression.clone()))
            .set_expression_attribute_names(
                projection.and_then(|p| p.attributes.names_map()),
            )
            .build()
            .map_err(Error::build("BatchGetItem"))?;
        BatchGetItemInput::builder()
            .request_items(self.table_name(), request)
            .build()
            .map_err(Error::build("BatchGetItem"))
    }

    /// Builds the `BatchGetItem` request without sending it. Duplicate keys are sent once.
    pub fn batch_get_request(
        &self,
        keys: &[Value],
        settings: &BatchGetSettings,
    ) -> Result<BatchGetItemInput, Error> {
        let specs = self.unique_keys(keys)?;
        self.batch_get_input(&specs, settings)
    }

    /// Reads several items.
    ///
    /// Items are returned in the order their keys were given. Keys the database did not process
    /// are reported by [`ItemArray::unprocessed_keys`]; keys with no item appear in neither.
    pub async fn batch_get(
        &self,
        keys: &[Value],
        settings: &BatchGetSettings,
    ) -> Result<ItemArray, Error> {
        let specs = self.unique_keys(keys)?;
        let input = self.batch_get_input(&specs, settings)?;
        let output = match self.table.send(input.into()).await? {
            Response::BatchGetItem(output) => output,
            _ => {
                return Err(Error::UnexpectedResponse {
                    operation: "BatchGetItem",
                })
            }
        };

        let schema = self.schema();
        let mut satisfied = Vec::new();
        if let Some(items) = output.responses().and_then(|r| r.get(self.table_name())) {
            for item in items {
                satisfied.push((KeySpec::from_wire_item(schema, item)?.fingerprint(), item));
            }
        }
        let mut unprocessed = Vec::new();
        let unprocessed_keys = output
            .unprocessed_keys()
            .and_then(|u| u.get(self.table_name()))
            .map(|request| request.keys())
            .unwrap_or_default();
        for key in unprocessed_keys {
            let spec = KeySpec::from_wire_item(schema, key)?;
            unprocessed.push((spec.fingerprint(), spec));
        }

        let requested: Vec<String> = specs.iter().map(KeySpec::fingerprint).collect();
        let correlation = correlate(&requested, satisfied, unprocessed);
        tracing::debug!(
            model = %self.inner.name,
            requested = requested.len(),
            returned = correlation.results.len(),
            unprocessed = correlation.unprocessed.len(),
            "correlated batch get"
        );

        let mut items = Vec::with_capacity(correlation.results.len());
        for item in correlation.results {
            if let Some(object) = self.read(item).await? {
                items.push(object);
            }
        }
        let unprocessed_keys = correlation
            .unprocessed
            .iter()
            .map(|spec| spec.to_object(schema))
            .collect::<Result<Vec<_>, _>>()?;
        let results = ItemArray::new(self.clone(), items, unprocessed_keys);
        if self.inner.options.auto_populate() {
            results.populate().await
        } else {
            Ok(results)
        }
    }

    async fn prepare_batch_put(&self, items: &[Object]) -> Result<Vec<WireItem>, Error> {
        let mut wire = Vec::with_capacity(items.len());
        for item in items {
            wire.push(self.prepare_put(item, true, None).await?.item);
        }
        Ok(wire)
    }

    fn batch_write_input(&self, requests: Vec<WriteRequest>) -> Result<BatchWriteItemInput, Error> {
        BatchWriteItemInput::builder()
            .request_items(self.table_name(), requests)
            .build()
            .map_err(Error::build("BatchWriteItem"))
    }

    fn put_requests(items: Vec<WireItem>) -> Result<Vec<WriteRequest>, Error> {
        items
            .into_iter()
            .map(|item| {
                let put = PutRequest::builder()
                    .set_item(Some(item))
                    .build()
                    .map_err(Error::build("BatchWriteItem"))?;
                Ok(WriteRequest::builder().put_request(put).build())
            })
            .collect()
    }

    fn delete_requests(keys: &[KeySpec]) -> Result<Vec<WriteRequest>, Error> {
        keys.iter()
            .map(|key| {
                let delete = DeleteRequest::builder()
                    .set_key(Some(key.to_key_map()))
                    .build()
                    .map_err(Error::build("BatchWriteItem"))?;
                Ok(WriteRequest::builder().delete_request(delete).build())
            })
            .collect()
    }

    /// Builds the `BatchWriteItem` request that creates `items`, without sending it.
    pub async fn batch_put_request(&self, items: &[Object]) -> Result<BatchWriteItemInput, Error> {
        let wire = self.prepare_batch_put(items).await?;
        self.batch_write_input(Self::put_requests(wire)?)
    }

    /// Creates several items. Items the database did not process are returned in
    /// [`BatchWriteResult::unprocessed_items`].
    pub async fn batch_put(&self, items: &[Object]) -> Result<BatchWriteResult, Error> {
        let wire = self.prepare_batch_put(items).await?;
        let requested = wire
            .iter()
            .map(|item| KeySpec::from_wire_item(self.schema(), item).map(|k| k.fingerprint()))
            .collect::<Result<Vec<_>, _>>()?;
        let input = self.batch_write_input(Self::put_requests(wire)?)?;
        self.send_batch_write(input, &requested).await
    }

    /// Builds the `BatchWriteItem` request that deletes `keys`, without sending it.
    pub fn batch_delete_request(&self, keys: &[Value]) -> Result<BatchWriteItemInput, Error> {
        let specs = self.unique_keys(keys)?;
        self.batch_write_input(Self::delete_requests(&specs)?)
    }

    /// Deletes several items. Keys the database did not process are returned in
    /// [`BatchWriteResult::unprocessed_items`].
    pub async fn batch_delete(&self, keys: &[Value]) -> Result<BatchWriteResult, Error> {
        let specs = self.unique_keys(keys)?;
        let requested: Vec<String> = specs.iter().map(KeySpec::fingerprint).collect();
        let input = self.batch_write_input(Self::delete_requests(&specs)?)?;
        self.send_batch_write(input, &requested).await
    }

    async fn send_batch_write(
        &self,
        input: BatchWriteItemInput,
        requested: &[String],
    ) -> Result<BatchWriteResult, Error> {
        let output = match self.table.send(input.into()).await? {
            Response::BatchWriteItem(output) => output,
            _ => {
                return Err(Error::UnexpectedResponse {
                    operation: "BatchWriteItem",
                })
            }
        };
        let schema = self.schema();
        let marshaller = Marshaller::new(schema);
        let mut unprocessed = Vec::new();
        let requests = output
            .unprocessed_items()
            .and_then(|u| u.get(self.table_name()))
            .map(Vec::as_slice)
            .unwrap_or_default();
        for request in requests {
            let object = if let Some(put) = request.put_request() {
                let key = KeySpec::from_wire_item(schema, put.item())?;
                (key.fingerprint(), marshaller.from_item(put.item())?)
            } else if let Some(delete) = request.delete_request() {
                let key = KeySpec::from_wire_item(schema, delete.key())?;
                (key.fingerprint(), key.to_object(schema)?)
            } else {
                continue;
            };
            unprocessed.push(object);
        }
        let correlation = correlate::<(), _>(requested, Vec::new(), unprocessed);
        Ok(BatchWriteResult::new(correlation.unprocessed))
    }
}

pub(crate) fn compile_condition(
    schema: &Schema,
    condition: Option<&Condition>,
) -> Result<Option<CompiledCondition>, Error> {
    match condition {
        Some(condition) if !condition.is_empty() => Ok(Some(condition.compile(Some(schema))?)),
        _ => Ok(None),
    }
}

/// The condition of a create: the caller's condition, combined with a hash key existence check
/// when existing items must not be overwritten.
fn put_condition(
    schema: &Schema,
    overwrite: bool,
    condition: Option<&Condition>,
) -> Result<Option<CompiledCondition>, Error> {
    let compiled = compile_condition(schema, condition)?;
    if overwrite {
        return Ok(compiled);
    }
    let mut attributes = ExpressionAttributes::default();
    attributes
        .names
        .insert(HASH_KEY_PLACEHOLDER.to_string(), schema.hash_key().to_string());
    let mut expression = format!("attribute_not_exists({})", HASH_KEY_PLACEHOLDER);
    if let Some(compiled) = compiled {
        expression = format!("{} AND ({})", expression, compiled.expression);
        attributes.merge(compiled.attributes);
    }
    Ok(Some(CompiledCondition {
        expression,
        attributes,
    }))
}

pub(crate) fn split_condition(
    condition: Option<CompiledCondition>,
) -> (Option<String>, ExpressionAttributes) {
    match condition {
        Some(compiled) => (Some(compiled.expression), compiled.attributes),
        None => (None, ExpressionAttributes::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dynamap_core::Attribute;

    fn schema() -> Schema {
        Schema::builder()
            .attribute(Attribute::number("id").hash_key())
            .attribute(Attribute::string("name"))
            .build()
            .unwrap()
    }

    #[test]
    fn overwrite_false_guards_the_hash_key() {
        let compiled = put_condition(&schema(), false, None).unwrap().unwrap();
        assert_eq!(compiled.expression, "attribute_not_exists(#__hash_key)");
        assert_eq!(compiled.attributes.names["#__hash_key"], "id");
    }

    #[test]
    fn overwrite_false_is_combined_with_caller_condition() {
        let condition = Condition::new().attribute("name").eq("Bob");
        let compiled = put_condition(&schema(), false, Some(&condition))
            .unwrap()
            .unwrap();
        assert_eq!(
            compiled.expression,
            "attribute_not_exists(#__hash_key) AND (#ca0 = :cv0)"
        );
        assert_eq!(compiled.attributes.names["#ca0"], "name");
        assert_eq!(
            compiled.attributes.values[":cv0"],
            AttributeValue::S("Bob".into())
        );
    }

    #[test]
    fn overwrite_true_keeps_only_caller_condition() {
        assert!(put_condition(&schema(), true, None).unwrap().is_none());
        let condition = Condition::new().attribute("name").exists();
        let compiled = put_condition(&schema(), true, Some(&condition))
            .unwrap()
            .unwrap();
        assert_eq!(compiled.expression, "attribute_exists (#ca0)");
    }
}
