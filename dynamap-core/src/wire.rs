/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Helpers for inspecting wire values.

use aws_sdk_dynamodb::types::AttributeValue;
use std::collections::HashMap;

/// An item as exchanged with the database.
pub type WireItem = HashMap<String, AttributeValue>;

/// Returns the one-letter (or short) tag of a wire value.
pub fn wire_type_name(av: &AttributeValue) -> &'static str {
    match av {
        AttributeValue::S(_) => "S",
        AttributeValue::N(_) => "N",
        AttributeValue::B(_) => "B",
        AttributeValue::Ss(_) => "SS",
        AttributeValue::Ns(_) => "NS",
        AttributeValue::Bs(_) => "BS",
        AttributeValue::M(_) => "M",
        AttributeValue::L(_) => "L",
        AttributeValue::Null(_) => "NULL",
        AttributeValue::Bool(_) => "BOOL",
        _ => "Unknown",
    }
}

/// Returns the native kind name of a wire value, as used in type mismatch errors.
pub fn wire_kind_name(av: &AttributeValue) -> &'static str {
    match av {
        AttributeValue::S(_) => "string",
        AttributeValue::N(_) => "number",
        AttributeValue::B(_) => "binary",
        AttributeValue::Ss(_) => "string set",
        AttributeValue::Ns(_) => "number set",
        AttributeValue::Bs(_) => "binary set",
        AttributeValue::M(_) => "map",
        AttributeValue::L(_) => "list",
        AttributeValue::Null(_) => "null",
        AttributeValue::Bool(_) => "boolean",
        _ => "unknown",
    }
}

/// Returns a canonical string for a scalar wire value, suitable as a lookup key.
///
/// Two wire values that the database would treat as the same key produce the same fingerprint.
/// Numbers are compared textually, so `5` and `5.0` differ.
pub fn fingerprint(av: &AttributeValue) -> String {
    match av {
        AttributeValue::S(s) => format!("S:{}", s),
        AttributeValue::N(n) => format!("N:{}", n),
        AttributeValue::B(b) => format!("B:{}", aws_smithy_types::base64::encode(b.as_ref())),
        AttributeValue::Bool(b) => format!("BOOL:{}", b),
        AttributeValue::Null(_) => "NULL".to_string(),
        AttributeValue::M(m) => {
            let mut keys: Vec<_> = m.keys().collect();
            keys.sort();
            let parts: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}={}", k, fingerprint(&m[k])))
                .collect();
            format!("M:{{{}}}", parts.join(","))
        }
        AttributeValue::L(items) => {
            let parts: Vec<String> = items.iter().map(fingerprint).collect();
            format!("L:[{}]", parts.join(","))
        }
        other => format!("{}:?", wire_type_name(other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_names() {
        assert_eq!(wire_type_name(&AttributeValue::Ns(vec![])), "NS");
        assert_eq!(wire_kind_name(&AttributeValue::Bool(true)), "boolean");
    }

    #[test]
    fn map_fingerprint_ignores_insertion_order() {
        let mut a = HashMap::new();
        a.insert("id".to_string(), AttributeValue::N("1".into()));
        a.insert("sk".to_string(), AttributeValue::S("x".into()));
        let mut b = HashMap::new();
        b.insert("sk".to_string(), AttributeValue::S("x".into()));
        b.insert("id".to_string(), AttributeValue::N("1".into()));
        assert_eq!(
            fingerprint(&AttributeValue::M(a)),
            fingerprint(&AttributeValue::M(b))
        );
        assert_ne!(
            fingerprint(&AttributeValue::S("1".into())),
            fingerprint(&AttributeValue::N("1".into()))
        );
    }
}
