/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Condition, update, and projection expression builders for dynamap.
//!
//! Every builder allocates its own placeholders: `#a<N>` / `:v<N>` for update and projection
//! expressions, `#ca<N>` / `:cv<N>` for conditions. Counters start at zero and follow the order
//! attributes are visited, so the same input always produces the same expression.

#![warn(missing_docs)]

pub mod condition;
pub mod placeholder;
pub mod projection;
pub mod update;

pub use condition::{CompiledCondition, Condition, Operator};
pub use placeholder::{ExpressionAttributes, PlaceholderStyle, Placeholders};
pub use projection::Projection;
pub use update::{UpdateAction, UpdateBuilder, UpdateExpression, UpdateSpec};
