/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Get and set transform hooks.
//!
//! Hooks may be asynchronous. They run one attribute at a time in declaration order, never
//! concurrently, so a later hook observes the results of earlier ones.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::attribute::Attribute;
use crate::error::{BoxError, Error, HookKind};
use crate::path::AttributePath;
use crate::schema::Schema;
use crate::types::AttributeType;
use crate::value::{Object, Value};

type HookFn = dyn Fn(Value) -> BoxFuture<'static, Result<Value, BoxError>> + Send + Sync;

/// A value transform attached to an attribute.
#[derive(Clone)]
pub struct Hook {
    inner: Arc<HookFn>,
}

impl Hook {
    /// Creates a hook from a synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(move |value| futures_util::future::ready(f(value)).boxed()),
        }
    }

    /// Creates a hook from an asynchronous function.
    pub fn from_async<F, Fut>(f: F) -> Self
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, BoxError>> + Send + 'static,
    {
        Self {
            inner: Arc::new(move |value| f(value).boxed()),
        }
    }

    /// Runs the hook.
    pub async fn call(&self, value: Value) -> Result<Value, BoxError> {
        (self.inner)(value).await
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Hook")
    }
}

/// Runs every set hook of `schema` over `object`, recursing into nested schemas.
///
/// Only attributes present in `object` with a defined value are transformed.
pub async fn apply_set_hooks(schema: &Schema, object: Object) -> Result<Object, Error> {
    apply_object(schema, object, AttributePath::root(), HookKind::Set).await
}

/// Runs every get hook of `schema` over `object`, recursing into nested schemas.
pub async fn apply_get_hooks(schema: &Schema, object: Object) -> Result<Object, Error> {
    apply_object(schema, object, AttributePath::root(), HookKind::Get).await
}

/// Runs the set hooks that apply to a single value written at `path`, such as the value of an
/// update action.
///
/// Values at undeclared paths are returned unchanged.
pub async fn apply_set_hooks_at(
    schema: &Schema,
    path: &AttributePath,
    value: Value,
) -> Result<Value, Error> {
    match schema.attribute_at(path) {
        Some(attribute) => apply_value(attribute, value, path.clone(), HookKind::Set).await,
        None => Ok(value),
    }
}

fn apply_object<'a>(
    schema: &'a Schema,
    mut object: Object,
    path: AttributePath,
    kind: HookKind,
) -> BoxFuture<'a, Result<Object, Error>> {
    async move {
        for attribute in schema.attributes() {
            let Some(value) = object.get(attribute.name()).filter(|v| !v.is_undefined()) else {
                continue;
            };
            let value = apply_value(
                attribute,
                value.clone(),
                path.key(attribute.name()),
                kind,
            )
            .await?;
            object.insert(attribute.name().to_string(), value);
        }
        Ok(object)
    }
    .boxed()
}

fn apply_value<'a>(
    attribute: &'a Attribute,
    mut value: Value,
    path: AttributePath,
    kind: HookKind,
) -> BoxFuture<'a, Result<Value, Error>> {
    async move {
        if kind == HookKind::Set {
            if let Some(hook) = attribute.set_hook() {
                tracing::trace!(path = %path, "running set hook");
                value = hook
                    .call(value)
                    .await
                    .map_err(|e| Error::hook(&path, kind, e))?;
            }
        }
        value = apply_nested(attribute, value, &path, kind).await?;
        if kind == HookKind::Get {
            if let Some(hook) = attribute.get_hook() {
                tracing::trace!(path = %path, "running get hook");
                value = hook
                    .call(value)
                    .await
                    .map_err(|e| Error::hook(&path, kind, e))?;
            }
        }
        Ok(value)
    }
    .boxed()
}

async fn apply_nested(
    attribute: &Attribute,
    mut value: Value,
    path: &AttributePath,
    kind: HookKind,
) -> Result<Value, Error> {
    for ty in attribute.types() {
        match (ty, value) {
            (AttributeType::Map(Some(schema)), Value::Map(map)) => {
                return Ok(Value::Map(
                    apply_object(schema, map, path.clone(), kind).await?,
                ));
            }
            (AttributeType::List(Some(element)), Value::List(items)) => {
                let mut out = Vec::with_capacity(items.len());
                for (i, item) in items.into_iter().enumerate() {
                    out.push(apply_value(element, item, path.index(i), kind).await?);
                }
                return Ok(Value::List(out));
            }
            (_, other) => value = other,
        }
    }
    Ok(value)
}
