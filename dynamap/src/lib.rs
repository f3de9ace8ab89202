/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Document mapper for DynamoDB.
//!
//! Declare a [`Schema`] per kind of item, register it with a [`Table`] as a model, and read and
//! write native [`Value`]s. Items are validated, defaulted and marshalled locally; fully formed
//! requests are handed to a [`Transport`]. Nothing is sent until the table has been
//! [initialized](Table::initialize).
//!
//! # Example
//!
//! ```no_run
//! use dynamap::{object, Attribute, GetSettings, ModelDefinition, Schema, Table, UpdateSpec};
//! # async fn example(transport: impl dynamap::Transport + 'static) -> Result<(), dynamap::Error> {
//! let schema = Schema::builder()
//!     .attribute(Attribute::number("id").hash_key())
//!     .attribute(Attribute::string("name").required())
//!     .attribute(Attribute::number("age"))
//!     .build()?;
//! let table = Table::builder("users")
//!     .model(ModelDefinition::new("User", schema))
//!     .transport(transport)
//!     .build()?;
//! table.initialize();
//!
//! let users = table.model("User").expect("registered above");
//! users
//!     .create(&object! { "id" => 1, "name" => "Charlie" }, &Default::default())
//!     .await?;
//! users
//!     .update(1, &UpdateSpec::new().set("age", 5), &Default::default())
//!     .await?;
//! let charlie = users.get(1, &GetSettings::new()).await?;
//! # let _ = charlie;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod batch;
pub mod config;
pub mod error;
pub mod gate;
pub mod model;
mod populate;
pub mod request;
pub mod table;
pub mod transaction;
pub mod transport;

#[cfg(any(test, feature = "test-util"))]
pub mod test_util;

pub use batch::{BatchWriteResult, ItemArray};
pub use config::{
    BatchGetSettings, CreateSettings, DeleteSettings, Expires, GetSettings, ModelOptions,
    TableOptions, UpdateSettings,
};
pub use error::{Error, TransportError};
pub use gate::ReadinessGate;
pub use model::Model;
pub use table::{ModelDefinition, Table, TableBuilder};
pub use transaction::{
    FragmentKind, ModelTransaction, Transaction, TransactionFragment, TransactionResult,
};
pub use transport::{SharedTransport, Transport};

pub use aws_sdk_dynamodb::types::{AttributeValue, ReturnValue};
pub use dynamap_core::{
    object, Attribute, AttributePath, AttributeType, DateStorage, DefaultValue, Hook, Object,
    SaveUnknown, Schema, SetElement, Timestamps, Validator, Value,
};
pub use dynamap_expressions::{Condition, UpdateSpec};
