/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

//! Dotted attribute paths such as `address.country` or `friends.0`.

use crate::value::{Object, Value};
use std::fmt;

/// One step of an [`AttributePath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// A map key or top-level attribute name.
    Key(String),
    /// A list position.
    Index(usize),
}

/// Location of a value inside an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AttributePath {
    segments: Vec<PathSegment>,
}

impl AttributePath {
    /// An empty path.
    pub fn root() -> Self {
        Self::default()
    }

    /// A path naming a single top-level attribute.
    pub fn attribute(name: impl Into<String>) -> Self {
        Self {
            segments: vec![PathSegment::Key(name.into())],
        }
    }

    /// Parses a dotted path. Segments made only of digits are list positions.
    pub fn parse(dotted: &str) -> Self {
        let segments = dotted
            .split('.')
            .map(|part| match part.parse::<usize>() {
                Ok(index) if !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit()) => {
                    PathSegment::Index(index)
                }
                _ => PathSegment::Key(part.to_string()),
            })
            .collect();
        Self { segments }
    }

    /// Returns a new path with a key appended.
    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut out = self.clone();
        out.segments.push(PathSegment::Key(key.into()));
        out
    }

    /// Returns a new path with a list position appended.
    pub fn index(&self, index: usize) -> Self {
        let mut out = self.clone();
        out.segments.push(PathSegment::Index(index));
        out
    }

    /// The segments of this path.
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The top-level attribute name, if the path starts with one.
    pub fn top_level(&self) -> Option<&str> {
        match self.segments.first() {
            Some(PathSegment::Key(k)) => Some(k),
            _ => None,
        }
    }

    /// True when the path names a top-level attribute.
    pub fn is_top_level(&self) -> bool {
        self.segments.len() == 1
    }

    /// The path without its last segment.
    pub fn parent(&self) -> Option<AttributePath> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// True when no segments are present.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Looks up the value at this path.
    pub fn lookup<'a>(&self, object: &'a Object) -> Option<&'a Value> {
        let (first, rest) = self.segments.split_first()?;
        let mut current = match first {
            PathSegment::Key(k) => object.get(k)?,
            PathSegment::Index(i) => object.get(&i.to_string())?,
        };
        for segment in rest {
            current = match (segment, current) {
                (PathSegment::Key(k), Value::Map(map)) => map.get(k)?,
                (PathSegment::Index(i), Value::Map(map)) => map.get(&i.to_string())?,
                (PathSegment::Index(i), Value::List(items)) => items.get(*i)?,
                _ => return None,
            };
        }
        Some(current)
    }

    /// Writes `value` at this path, creating intermediate maps as needed.
    ///
    /// Returns false when an intermediate value exists but is not a container.
    pub fn insert(&self, object: &mut Object, value: Value) -> bool {
        let Some((last, init)) = self.segments.split_last() else {
            return false;
        };
        let mut current = object;
        for segment in init {
            let key = segment_key(segment);
            let entry = current
                .entry(key)
                .or_insert_with(|| Value::Map(Object::new()));
            current = match entry {
                Value::Map(map) => map,
                _ => return false,
            };
        }
        current.insert(segment_key(last), value);
        true
    }

    /// Removes the value at this path.
    pub fn remove(&self, object: &mut Object) -> Option<Value> {
        let (last, init) = self.segments.split_last()?;
        let mut current = object;
        for segment in init {
            current = match current.get_mut(&segment_key(segment))? {
                Value::Map(map) => map,
                _ => return None,
            };
        }
        current.shift_remove(&segment_key(last))
    }
}

fn segment_key(segment: &PathSegment) -> String {
    match segment {
        PathSegment::Key(k) => k.clone(),
        PathSegment::Index(i) => i.to_string(),
    }
}

impl fmt::Display for AttributePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(k) => f.write_str(k)?,
                PathSegment::Index(idx) => write!(f, "{}", idx)?,
            }
        }
        Ok(())
    }
}

impl From<&str> for AttributePath {
    fn from(value: &str) -> Self {
        AttributePath::parse(value)
    }
}

impl From<String> for AttributePath {
    fn from(value: String) -> Self {
        AttributePath::parse(&value)
    }
}
