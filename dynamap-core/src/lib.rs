/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Schema, type system and marshalling for dynamap.
//!
//! This crate owns the pure transformation layer between native values and the DynamoDB wire
//! encoding:
//!
//! - [`Schema`] - Ordered attribute definitions with key designation and validation rules
//! - [`AttributeType`] - Semantic types and type resolution for multi-type attributes
//! - [`Marshaller`] - Convert values and items to and from `AttributeValue`s
//! - [`conform`] - Defaults, modifiers, validation and combine attributes for writes
//! - [`KeySpec`] - Project caller supplied keys onto the table key
//!
//! # Example
//!
//! ```
//! use dynamap_core::{object, Attribute, Marshaller, Schema};
//!
//! let schema = Schema::builder()
//!     .attribute(Attribute::number("id").hash_key())
//!     .attribute(Attribute::string("name"))
//!     .build()
//!     .unwrap();
//! let item = Marshaller::new(&schema)
//!     .to_item(&object! { "id" => 1, "name" => "Charlie" })
//!     .unwrap();
//! assert_eq!(item.len(), 2);
//! ```

#![warn(missing_docs)]

pub mod attribute;
pub mod conform;
pub mod error;
pub mod hook;
pub mod key;
pub mod marshal;
pub mod path;
pub mod schema;
pub mod types;
pub mod value;
pub mod wire;

pub use attribute::{Attribute, AttributeBuilder, DefaultValue, StringModifier, Validator};
pub use error::{BoxError, Error, HookKind, ValidationError};
pub use hook::Hook;
pub use key::KeySpec;
pub use marshal::Marshaller;
pub use path::{AttributePath, PathSegment};
pub use schema::{select_schema, SaveUnknown, Schema, SchemaBuilder, Timestamps};
pub use types::{AttributeType, DateStorage, SetElement};
pub use value::{Object, Value, ValueKind};
pub use wire::WireItem;
