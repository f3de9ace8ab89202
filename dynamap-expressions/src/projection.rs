/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Projection expressions.

use dynamap_core::AttributePath;

use crate::placeholder::{ExpressionAttributes, PlaceholderStyle, Placeholders};

/// A compiled projection expression.
#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    /// The projection expression, such as `#a0, #a1`.
    pub expression: String,
    /// Name placeholders used by `expression`.
    pub attributes: ExpressionAttributes,
}

impl Projection {
    /// Builds a projection of the given attribute paths.
    ///
    /// Returns `None` when no attributes are requested, meaning every attribute is returned.
    pub fn new<I, P>(attributes: I) -> Option<Self>
    where
        I: IntoIterator<Item = P>,
        P: Into<AttributePath>,
    {
        let mut placeholders = Placeholders::new(PlaceholderStyle::Update);
        let parts: Vec<String> = attributes
            .into_iter()
            .map(|path| placeholders.path(&path.into()))
            .collect();
        if parts.is_empty() {
            return None;
        }
        Some(Self {
            expression: parts.join(", "),
            attributes: placeholders.into_attributes(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_names_in_order() {
        let projection = Projection::new(["name", "address.country", "name"]).unwrap();
        assert_eq!(projection.expression, "#a0, #a1.#a2, #a0");
        assert_eq!(projection.attributes.names["#a2"], "country");
        assert!(projection.attributes.values.is_empty());
        assert!(Projection::new(Vec::<String>::new()).is_none());
    }
}
