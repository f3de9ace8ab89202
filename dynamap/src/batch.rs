/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Batch result correlation.
//!
//! Batch responses list items in no particular order and may leave some keys unprocessed.
//! [`correlate`] matches them back to the keys the caller asked for, identified by the
//! fingerprint of their marshalled key.

use dynamap_core::Object;
use std::collections::{HashMap, HashSet};
use std::ops::Deref;

use crate::error::Error;
use crate::model::Model;

/// Satisfied and unprocessed entries matched to the requested keys.
#[derive(Debug, Clone, PartialEq)]
pub struct Correlation<R, U> {
    /// Satisfied entries, in the order their keys were requested.
    pub results: Vec<R>,
    /// Unprocessed entries, in the order the database returned them.
    pub unprocessed: Vec<U>,
}

/// Matches batch response entries to the requested keys.
///
/// `requested` holds key fingerprints in caller order. Satisfied entries are emitted in that
/// order. Unprocessed entries keep their response order. Entries whose key was not requested,
/// and repeats of a key already emitted, are dropped; a key that is both satisfied and
/// unprocessed counts as satisfied.
pub fn correlate<R, U>(
    requested: &[String],
    satisfied: Vec<(String, R)>,
    unprocessed: Vec<(String, U)>,
) -> Correlation<R, U> {
    // Reversed so the first entry for a repeated key wins.
    let mut satisfied: HashMap<String, R> = satisfied.into_iter().rev().collect();
    let mut results = Vec::with_capacity(satisfied.len());
    let mut wanted = HashSet::with_capacity(requested.len());
    let mut emitted = HashSet::new();
    for fingerprint in requested {
        if !wanted.insert(fingerprint.as_str()) {
            continue;
        }
        if let Some(entry) = satisfied.remove(fingerprint) {
            emitted.insert(fingerprint.as_str());
            results.push(entry);
        }
    }

    let mut seen = HashSet::new();
    let unprocessed = unprocessed
        .into_iter()
        .filter(|(fingerprint, _)| {
            wanted.contains(fingerprint.as_str())
                && !emitted.contains(fingerprint.as_str())
                && seen.insert(fingerprint.clone())
        })
        .map(|(_, entry)| entry)
        .collect();
    Correlation {
        results,
        unprocessed,
    }
}

/// Items returned by a batch read.
///
/// Dereferences to the items, in the order their keys were requested.
#[derive(Debug, Clone)]
pub struct ItemArray {
    model: Model,
    items: Vec<Object>,
    unprocessed_keys: Vec<Object>,
}

impl ItemArray {
    pub(crate) fn new(model: Model, items: Vec<Object>, unprocessed_keys: Vec<Object>) -> Self {
        Self {
            model,
            items,
            unprocessed_keys,
        }
    }

    /// The items that were found.
    pub fn items(&self) -> &[Object] {
        &self.items
    }

    /// Keys the database did not process. Retrying them may return more items.
    pub fn unprocessed_keys(&self) -> &[Object] {
        &self.unprocessed_keys
    }

    /// Consumes the array and returns the items.
    pub fn into_items(self) -> Vec<Object> {
        self.items
    }

    /// Replaces self references in every item with the referenced items.
    pub async fn populate(mut self) -> Result<Self, Error> {
        let mut populated = Vec::with_capacity(self.items.len());
        for item in std::mem::take(&mut self.items) {
            populated.push(self.model.populate(item).await?);
        }
        self.items = populated;
        Ok(self)
    }
}

impl Deref for ItemArray {
    type Target = [Object];

    fn deref(&self) -> &[Object] {
        &self.items
    }
}

impl IntoIterator for ItemArray {
    type Item = Object;
    type IntoIter = std::vec::IntoIter<Object>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

/// The outcome of a batch write.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchWriteResult {
    unprocessed_items: Vec<Object>,
}

impl BatchWriteResult {
    pub(crate) fn new(unprocessed_items: Vec<Object>) -> Self {
        Self { unprocessed_items }
    }

    /// Items (for puts) or keys (for deletes) the database did not process.
    pub fn unprocessed_items(&self) -> &[Object] {
        &self.unprocessed_items
    }

    /// True when every write was processed.
    pub fn is_complete(&self) -> bool {
        self.unprocessed_items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn keys(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn results_follow_request_order() {
        let correlation = correlate(
            &keys(&["1", "2", "3"]),
            vec![("3".to_string(), "item3"), ("1".to_string(), "item1")],
            vec![("2".to_string(), "key2")],
        );
        assert_eq!(correlation.results, vec!["item1", "item3"]);
        assert_eq!(correlation.unprocessed, vec!["key2"]);
    }

    #[test]
    fn unprocessed_keep_response_order() {
        let correlation = correlate::<(), _>(
            &keys(&["1", "2", "3"]),
            Vec::new(),
            vec![("3".to_string(), 3), ("1".to_string(), 1)],
        );
        assert_eq!(correlation.unprocessed, vec![3, 1]);
    }

    #[test]
    fn nothing_is_duplicated_or_invented() {
        let correlation = correlate(
            &keys(&["1", "1", "2"]),
            vec![
                ("1".to_string(), "first"),
                ("1".to_string(), "second"),
                ("9".to_string(), "stray"),
            ],
            vec![
                ("1".to_string(), "also-unprocessed"),
                ("2".to_string(), "key2"),
                ("2".to_string(), "key2-again"),
            ],
        );
        assert_eq!(correlation.results, vec!["first"]);
        assert_eq!(correlation.unprocessed, vec!["key2"]);
    }

    #[test]
    fn missing_items_are_dropped() {
        let correlation = correlate::<&str, &str>(&keys(&["1", "2"]), Vec::new(), Vec::new());
        assert!(correlation.results.is_empty());
        assert!(correlation.unprocessed.is_empty());
    }
}
