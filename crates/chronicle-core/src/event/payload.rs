//! Opaque key/value payloads carried by events.
//!
//! Payload schemas belong to the server; the journal only ever *reads*
//! specific well-known fields (reference ids, snapshots, labels) and must
//! pass everything else through untouched. A `BTreeMap` keeps serialization
//! deterministic.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// An event's data payload: an ordered map of JSON values.
///
/// Unknown keys are preserved; typed accessors return `None` rather than
/// erroring when a field is absent or has an unexpected shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Payload(BTreeMap<String, Value>);

impl Payload {
    /// Create an empty payload.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Build a payload from a JSON value. Non-object values yield an empty
    /// payload.
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Object(map) => Self(map.into_iter().collect()),
            _ => Self::new(),
        }
    }

    /// Raw field access.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Insert a field, returning the previous value if any.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(key.into(), value)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String field access. Numbers are accepted and not coerced; only JSON
    /// strings match.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// First non-empty string among the named fields, in order.
    ///
    /// This is the `a || b || c` fallback chain used when the server has
    /// several historical names for the same reference.
    #[must_use]
    pub fn first_str(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .filter_map(|key| self.str_field(key))
            .find(|s| !s.is_empty())
    }

    /// Boolean field access.
    #[must_use]
    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    /// Collect the ids referenced by an array field.
    ///
    /// Array elements may be bare id strings or objects carrying an `id`
    /// field; anything else is skipped.
    #[must_use]
    pub fn id_list(&self, key: &str) -> Vec<&str> {
        let Some(Value::Array(items)) = self.0.get(key) else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.is_empty() => Some(s.as_str()),
                Value::Object(obj) => obj.get("id").and_then(Value::as_str),
                _ => None,
            })
            .collect()
    }

    /// Deserialize an object field as `T` (used for embedded event
    /// snapshots). Returns `None` if the field is missing or malformed.
    #[must_use]
    pub fn object_field<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.0.get(key)?;
        if !value.is_object() {
            return None;
        }
        serde_json::from_value(value.clone()).ok()
    }

    /// Iterate over the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl FromIterator<(String, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::from_value(value)
    }
}
