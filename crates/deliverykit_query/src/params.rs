//! Compiled wire parameters.

use crate::error::{QueryError, QueryResult};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// The compiled, immutable parameter set of one request.
///
/// Keys ending in `[]` hold arrays and expand to one query pair per
/// element; nested objects (the filter tree, sort) are sent as JSON text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WireParameters {
    entries: BTreeMap<String, Value>,
}

impl WireParameters {
    /// Creates an empty parameter set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Inserts `key` only if it is not already present.
    pub fn insert_default(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.entry(key.into()).or_insert_with(|| value.into());
    }

    /// Removes `key`, returning its previous value.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(key)
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns the number of keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no key is present.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates keys and values in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Copies every entry of `other` over this set.
    pub fn extend(&mut self, other: &WireParameters) {
        for (k, v) in &other.entries {
            self.entries.insert(k.clone(), v.clone());
        }
    }

    /// Returns the parameters as one JSON object.
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<Map<String, Value>>(),
        )
    }

    /// Flattens the parameters into URL query pairs.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.entries.len());
        for (key, value) in &self.entries {
            match value {
                Value::Array(items) if key.ends_with("[]") => {
                    pairs.extend(items.iter().map(|item| (key.clone(), scalar_text(item))));
                }
                other => pairs.push((key.clone(), scalar_text(other))),
            }
        }
        pairs
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Validates a raw parameter key passed through an escape hatch.
pub(crate) fn validate_param_key(key: &str) -> QueryResult<()> {
    if key.is_empty() || key.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(QueryError::InvalidParameterKey(key.to_string()));
    }
    Ok(())
}
