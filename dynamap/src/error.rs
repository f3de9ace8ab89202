/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Errors returned by model, batch and transaction operations.

use aws_smithy_types::error::operation::BuildError;

/// An opaque error raised by a [`Transport`](crate::transport::Transport).
pub type TransportError = dynamap_core::BoxError;

/// Error returned by a database facing operation.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The item, key, condition or update was rejected before anything was sent.
    #[error(transparent)]
    Schema(#[from] dynamap_core::Error),
    /// A request could not be assembled from its parts.
    #[error("failed to build {operation} request")]
    Build {
        /// The operation being built.
        operation: &'static str,
        /// The underlying builder error.
        #[source]
        source: BuildError,
    },
    /// The transport failed. The error is passed through unchanged.
    #[error("transport error")]
    Transport(#[source] TransportError),
    /// The transport answered with a response for a different operation.
    #[error("unexpected response to {operation}")]
    UnexpectedResponse {
        /// The operation that was sent.
        operation: &'static str,
    },
}

impl Error {
    pub(crate) fn build(operation: &'static str) -> impl FnOnce(BuildError) -> Self {
        move |source| Error::Build { operation, source }
    }

    pub(crate) fn invalid_parameter(message: impl Into<String>) -> Self {
        Error::Schema(dynamap_core::Error::invalid_parameter(message))
    }

    /// Returns the underlying schema error, if this is one.
    pub fn as_schema_error(&self) -> Option<&dynamap_core::Error> {
        match self {
            Error::Schema(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if a value did not match its declared type.
    pub fn is_type_mismatch(&self) -> bool {
        self.as_schema_error()
            .map(dynamap_core::Error::is_type_mismatch)
            .unwrap_or(false)
    }

    /// Returns true if a required, enum or custom validation rule failed.
    pub fn is_validation(&self) -> bool {
        self.as_schema_error()
            .map(dynamap_core::Error::is_validation)
            .unwrap_or(false)
    }

    /// Returns true if the caller supplied an invalid parameter.
    pub fn is_invalid_parameter(&self) -> bool {
        self.as_schema_error()
            .map(dynamap_core::Error::is_invalid_parameter)
            .unwrap_or(false)
    }

    /// Returns true if the transport failed.
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_))
    }
}
