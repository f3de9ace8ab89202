/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Transactions spanning several items and models.
//!
//! A model builds fragments through [`Model::transaction`]; a [`Transaction`] collects them,
//! checks that every fragment belongs to a registered model and sends them as a single
//! `TransactGetItems` (when every fragment is a get) or `TransactWriteItems` request.

use aws_sdk_dynamodb::operation::transact_get_items::TransactGetItemsInput;
use aws_sdk_dynamodb::operation::transact_write_items::TransactWriteItemsInput;
use aws_sdk_dynamodb::types::{
    ConditionCheck, Delete, Get, Put, TransactGetItem, TransactWriteItem, Update,
};
use dynamap_core::{Object, Value};
use dynamap_expressions::{Condition, Projection, UpdateSpec};
use std::fmt;
use std::sync::Arc;

use crate::config::{CreateSettings, DeleteSettings, GetSettings, UpdateSettings};
use crate::error::Error;
use crate::model::{compile_condition, split_condition, Model};
use crate::request::Response;
use crate::table::{Table, TableInner};

/// The operation a [`TransactionFragment`] performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentKind {
    /// Read an item.
    Get,
    /// Write a whole item.
    Put,
    /// Update an item.
    Update,
    /// Delete an item.
    Delete,
    /// Check a condition without writing.
    ConditionCheck,
}

impl fmt::Display for FragmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            FragmentKind::Get => "Get",
            FragmentKind::Put => "Put",
            FragmentKind::Update => "Update",
            FragmentKind::Delete => "Delete",
            FragmentKind::ConditionCheck => "ConditionCheck",
        })
    }
}

/// The wire ready body of a fragment.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum FragmentItem {
    Get(Get),
    Put(Put),
    Update(Update),
    Delete(Delete),
    ConditionCheck(ConditionCheck),
}

/// One operation of a transaction, tagged with the model that built it.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionFragment {
    model: String,
    table: String,
    item: FragmentItem,
}

impl TransactionFragment {
    /// The operation this fragment performs.
    pub fn kind(&self) -> FragmentKind {
        match self.item {
            FragmentItem::Get(_) => FragmentKind::Get,
            FragmentItem::Put(_) => FragmentKind::Put,
            FragmentItem::Update(_) => FragmentKind::Update,
            FragmentItem::Delete(_) => FragmentKind::Delete,
            FragmentItem::ConditionCheck(_) => FragmentKind::ConditionCheck,
        }
    }

    /// The name of the model that built this fragment.
    pub fn model_name(&self) -> &str {
        &self.model
    }

    /// The table the fragment operates on.
    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// The wire ready body.
    pub fn item(&self) -> &FragmentItem {
        &self.item
    }

    fn write_item(&self) -> Option<TransactWriteItem> {
        let builder = TransactWriteItem::builder();
        let builder = match &self.item {
            FragmentItem::Get(_) => return None,
            FragmentItem::Put(put) => builder.put(put.clone()),
            FragmentItem::Update(update) => builder.update(update.clone()),
            FragmentItem::Delete(delete) => builder.delete(delete.clone()),
            FragmentItem::ConditionCheck(check) => builder.condition_check(check.clone()),
        };
        Some(builder.build())
    }

    fn get_item(&self) -> Option<TransactGetItem> {
        match &self.item {
            FragmentItem::Get(get) => Some(TransactGetItem::builder().get(get.clone()).build()),
            _ => None,
        }
    }
}

/// Builds [`TransactionFragment`]s for one model.
#[derive(Debug, Clone, Copy)]
pub struct ModelTransaction<'a> {
    model: &'a Model,
}

impl<'a> ModelTransaction<'a> {
    pub(crate) fn new(model: &'a Model) -> Self {
        Self { model }
    }

    fn fragment(&self, item: FragmentItem) -> TransactionFragment {
        TransactionFragment {
            model: self.model.name().to_string(),
            table: self.model.table_name().to_string(),
            item,
        }
    }

    /// A fragment that reads the item with `key`.
    pub fn get(
        &self,
        key: impl Into<Value>,
        settings: &GetSettings,
    ) -> Result<TransactionFragment, Error> {
        let key = self.model.key_spec(&key.into())?;
        let projection = Projection::new(settings.attributes.iter().map(String::as_str));
        let get = Get::builder()
            .table_name(self.model.table_name())
            .set_key(Some(key.to_key_map()))
            .set_projection_expression(projection.as_ref().map(|p| p.expression.clone()))
            .set_expression_attribute_names(
                projection.and_then(|p| p.attributes.names_map()),
            )
            .build()
            .map_err(Error::build("TransactGetItems"))?;
        Ok(self.fragment(FragmentItem::Get(get)))
    }

    /// A fragment that creates `item`, running the same pipeline as
    /// [`Model::create`].
    pub async fn create(
        &self,
        item: &Object,
        settings: &CreateSettings,
    ) -> Result<TransactionFragment, Error> {
        let prepared = self
            .model
            .prepare_put(item, settings.overwrite, settings.condition.as_ref())
            .await?;
        let (expression, attributes) = split_condition(prepared.condition);
        let put = Put::builder()
            .table_name(self.model.table_name())
            .set_item(Some(prepared.item))
            .set_condition_expression(expression)
            .set_expression_attribute_names(attributes.names_map())
            .set_expression_attribute_values(attributes.values_map())
            .build()
            .map_err(Error::build("TransactWriteItems"))?;
        Ok(self.fragment(FragmentItem::Put(put)))
    }

    /// A fragment that updates the item with `key`.
    ///
    /// Return values do not apply inside a transaction and are ignored.
    pub async fn update(
        &self,
        key: impl Into<Value>,
        update: &UpdateSpec,
        settings: &UpdateSettings,
    ) -> Result<TransactionFragment, Error> {
        let prepared = self
            .model
            .prepare_update(key.into(), update, settings.condition.as_ref())
            .await?;
        let update = Update::builder()
            .table_name(self.model.table_name())
            .set_key(Some(prepared.key))
            .update_expression(prepared.expression)
            .set_condition_expression(prepared.condition)
            .set_expression_attribute_names(prepared.attributes.names_map())
            .set_expression_attribute_values(prepared.attributes.values_map())
            .build()
            .map_err(Error::build("TransactWriteItems"))?;
        Ok(self.fragment(FragmentItem::Update(update)))
    }

    /// A fragment that deletes the item with `key`.
    pub fn delete(
        &self,
        key: impl Into<Value>,
        settings: &DeleteSettings,
    ) -> Result<TransactionFragment, Error> {
        let key = self.model.key_spec(&key.into())?;
        let condition = compile_condition(self.model.schema(), settings.condition.as_ref())?;
        let (expression, attributes) = split_condition(condition);
        let delete = Delete::builder()
            .table_name(self.model.table_name())
            .set_key(Some(key.to_key_map()))
            .set_condition_expression(expression)
            .set_expression_attribute_names(attributes.names_map())
            .set_expression_attribute_values(attributes.values_map())
            .build()
            .map_err(Error::build("TransactWriteItems"))?;
        Ok(self.fragment(FragmentItem::Delete(delete)))
    }

    /// A fragment that fails the transaction unless `condition` holds for the item with `key`.
    pub fn condition(
        &self,
        key: impl Into<Value>,
        condition: &Condition,
    ) -> Result<TransactionFragment, Error> {
        let key = self.model.key_spec(&key.into())?;
        let Some(compiled) = compile_condition(self.model.schema(), Some(condition))? else {
            return Err(Error::invalid_parameter(
                "A condition check requires a non-empty condition",
            ));
        };
        let check = ConditionCheck::builder()
            .table_name(self.model.table_name())
            .set_key(Some(key.to_key_map()))
            .condition_expression(compiled.expression)
            .set_expression_attribute_names(compiled.attributes.names_map())
            .set_expression_attribute_values(compiled.attributes.values_map())
            .build()
            .map_err(Error::build("TransactWriteItems"))?;
        Ok(self.fragment(FragmentItem::ConditionCheck(check)))
    }
}

/// The request a [`Transaction`] sends.
#[derive(Debug, Clone)]
pub enum TransactionRequest {
    /// Every fragment is a get.
    Get(TransactGetItemsInput),
    /// Every fragment writes or checks.
    Write(TransactWriteItemsInput),
}

/// The outcome of [`Transaction::send`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionResult {
    /// The items read by a get transaction, in fragment order. Missing items are `None`.
    Items(Vec<Option<Object>>),
    /// A write transaction succeeded.
    Written,
}

/// A set of fragments sent as one atomic request.
#[derive(Debug, Clone, Default)]
pub struct Transaction {
    tables: Vec<Table>,
    fragments: Vec<TransactionFragment>,
}

impl Transaction {
    /// Creates an empty transaction with no registered tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the models of `table`. Fragments built by other models are rejected.
    pub fn table(mut self, table: &Table) -> Self {
        if !self
            .tables
            .iter()
            .any(|t| Arc::ptr_eq(&t.inner, &table.inner))
        {
            self.tables.push(table.clone());
        }
        self
    }

    /// Adds a fragment.
    pub fn fragment(mut self, fragment: TransactionFragment) -> Self {
        self.fragments.push(fragment);
        self
    }

    /// Adds several fragments.
    pub fn fragments(mut self, fragments: impl IntoIterator<Item = TransactionFragment>) -> Self {
        self.fragments.extend(fragments);
        self
    }

    /// The fragments, in the order they were added.
    pub fn fragment_list(&self) -> &[TransactionFragment] {
        &self.fragments
    }

    fn resolve(&self) -> Result<Vec<Model>, Error> {
        self.fragments
            .iter()
            .map(|fragment| {
                self.tables
                    .iter()
                    .filter(|table| table.name() == fragment.table_name())
                    .find_map(|table| table.model(fragment.model_name()))
                    .ok_or_else(|| {
                        Error::invalid_parameter(format!(
                            "Model {} is not registered with table {}",
                            fragment.model_name(),
                            fragment.table_name()
                        ))
                    })
            })
            .collect()
    }

    fn build_request(&self) -> Result<TransactionRequest, Error> {
        if self.fragments.is_empty() {
            return Err(Error::invalid_parameter(
                "Transaction must contain at least one fragment",
            ));
        }
        let gets: Vec<TransactGetItem> = self
            .fragments
            .iter()
            .filter_map(TransactionFragment::get_item)
            .collect();
        if gets.len() == self.fragments.len() {
            return TransactGetItemsInput::builder()
                .set_transact_items(Some(gets))
                .build()
                .map(TransactionRequest::Get)
                .map_err(Error::build("TransactGetItems"));
        }
        if !gets.is_empty() {
            return Err(Error::invalid_parameter(
                "Get fragments can not be mixed with write fragments in a transaction",
            ));
        }
        let writes = self
            .fragments
            .iter()
            .filter_map(TransactionFragment::write_item)
            .collect();
        TransactWriteItemsInput::builder()
            .set_transact_items(Some(writes))
            .build()
            .map(TransactionRequest::Write)
            .map_err(Error::build("TransactWriteItems"))
    }

    /// Builds the request without sending it.
    pub fn request(&self) -> Result<TransactionRequest, Error> {
        self.resolve()?;
        self.build_request()
    }

    /// Sends the transaction once every involved table is ready.
    pub async fn send(&self) -> Result<TransactionResult, Error> {
        let models = self.resolve()?;
        let request = self.build_request()?;

        let mut waited: Vec<&Arc<TableInner>> = Vec::new();
        for model in &models {
            if !waited.iter().any(|t| Arc::ptr_eq(t, &model.table)) {
                model.table.wait_ready().await;
                waited.push(&model.table);
            }
        }
        let table = &models[0].table;

        match request {
            TransactionRequest::Get(input) => match table.send_ready(input.into()).await? {
                Response::TransactGetItems(output) => {
                    let responses = output.responses();
                    let mut items = Vec::with_capacity(models.len());
                    for (i, model) in models.iter().enumerate() {
                        let item = match responses.get(i).and_then(|r| r.item()) {
                            Some(item) => model.read(item).await?,
                            None => None,
                        };
                        items.push(item);
                    }
                    Ok(TransactionResult::Items(items))
                }
                _ => Err(Error::UnexpectedResponse {
                    operation: "TransactGetItems",
                }),
            },
            TransactionRequest::Write(input) => match table.send_ready(input.into()).await? {
                Response::TransactWriteItems(_) => Ok(TransactionResult::Written),
                _ => Err(Error::UnexpectedResponse {
                    operation: "TransactWriteItems",
                }),
            },
        }
    }
}
