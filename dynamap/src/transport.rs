/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! The seam between the mapper and whatever actually talks to DynamoDB.

use futures_util::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

use crate::error::TransportError;
use crate::request::{Request, Response};

/// Sends fully assembled requests to the database.
///
/// Implementations own retries, timeouts and credentials. The mapper never inspects a
/// [`TransportError`] and returns it to the caller unchanged.
pub trait Transport: fmt::Debug + Send + Sync {
    /// Sends one request.
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>>;
}

/// A reference counted [`Transport`].
#[derive(Clone, Debug)]
pub struct SharedTransport(Arc<dyn Transport>);

impl SharedTransport {
    /// Wraps `transport`.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self(Arc::new(transport))
    }
}

impl Transport for SharedTransport {
    fn send(&self, request: Request) -> BoxFuture<'_, Result<Response, TransportError>> {
        self.0.send(request)
    }
}
