/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Error types for schema construction, validation and marshalling.

use std::fmt;

/// A boxed error used for failures raised by user supplied hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error raised while building a schema, validating a value or converting it to or from the wire.
///
/// Every variant is detected before a request is handed to the transport.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The value (or wire value) did not match any of the attribute's declared types.
    #[error("Expected {path} to be of type {expected}, instead found type {actual}.")]
    TypeMismatch {
        /// Dotted path of the attribute.
        path: String,
        /// Comma separated list of the declared types.
        expected: String,
        /// Runtime kind of the supplied value.
        actual: String,
    },
    /// A required, enum or custom validation rule failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The caller supplied an invalid schema, condition or update.
    #[error("{0}")]
    InvalidParameter(String),
    /// A value had the right shape but could not be represented, such as a malformed number.
    #[error("invalid value for '{path}': {message}")]
    Conversion {
        /// Dotted path of the attribute.
        path: String,
        /// Description of why the value was invalid.
        message: String,
    },
    /// A get or set hook returned an error.
    #[error("{kind} hook for '{path}' failed")]
    Hook {
        /// Dotted path of the attribute.
        path: String,
        /// Which hook failed.
        kind: HookKind,
        /// The error returned by the hook.
        #[source]
        source: BoxError,
    },
}

/// Which transform hook raised an [`Error::Hook`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookKind {
    /// The hook run before values are written.
    Set,
    /// The hook run after values are read.
    Get,
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookKind::Set => f.write_str("set"),
            HookKind::Get => f.write_str("get"),
        }
    }
}

/// A validation rule that failed for a specific attribute.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A required attribute has no value in the effective state.
    #[error("{path} is a required property but has no value when trying to save item")]
    Required {
        /// Dotted path of the attribute.
        path: String,
    },
    /// The value is not one of the attribute's enumerated values.
    #[error("{path} must equal {allowed}, but is set to {actual}")]
    Enum {
        /// Dotted path of the attribute.
        path: String,
        /// JSON rendering of the allowed values.
        allowed: String,
        /// JSON rendering of the supplied value.
        actual: String,
    },
    /// The attribute's validator rejected the value.
    #[error("{path} with a value of {value} had a validation error when trying to save item")]
    Custom {
        /// Dotted path of the attribute.
        path: String,
        /// JSON rendering of the rejected value.
        value: String,
    },
}

impl Error {
    /// Creates a type mismatch error.
    pub fn type_mismatch(
        path: impl fmt::Display,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            path: path.to_string(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Error::InvalidParameter(message.into())
    }

    /// Creates an error for a value that could not be represented.
    pub fn conversion(path: impl fmt::Display, message: impl Into<String>) -> Self {
        Error::Conversion {
            path: path.to_string(),
            message: message.into(),
        }
    }

    /// Creates a required attribute error.
    pub fn required(path: impl fmt::Display) -> Self {
        Error::Validation(ValidationError::Required {
            path: path.to_string(),
        })
    }

    pub(crate) fn hook(path: impl fmt::Display, kind: HookKind, source: BoxError) -> Self {
        Error::Hook {
            path: path.to_string(),
            kind,
            source,
        }
    }

    /// Returns true if this is a [`Error::TypeMismatch`].
    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }

    /// Returns true if this is a [`Error::Validation`].
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// Returns true if this is a [`Error::InvalidParameter`].
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(self, Error::InvalidParameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_documented_wording() {
        let err = Error::type_mismatch("name", "string", "number");
        assert_eq!(
            err.to_string(),
            "Expected name to be of type string, instead found type number."
        );

        let err = Error::required("data.age");
        assert_eq!(
            err.to_string(),
            "data.age is a required property but has no value when trying to save item"
        );

        let err = Error::from(ValidationError::Enum {
            path: "status".into(),
            allowed: r#"["open","closed"]"#.into(),
            actual: r#""pending""#.into(),
        });
        assert_eq!(
            err.to_string(),
            r#"status must equal ["open","closed"], but is set to "pending""#
        );
    }

    #[test]
    fn hook_error_exposes_source() {
        use std::error::Error as _;
        let err = Error::hook("name", HookKind::Set, "boom".into());
        assert_eq!(err.to_string(), "set hook for 'name' failed");
        assert_eq!(err.source().unwrap().to_string(), "boom");
    }
}
