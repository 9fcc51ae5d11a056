//! Projection and sort specifications.

use crate::params::WireParameters;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// Scope name for fields of the queried record itself.
pub const BASE_SCOPE: &str = "BASE";

/// Field inclusion (`only`) and exclusion (`except`) sets, optionally
/// scoped to a reference path.
///
/// When a field is named by both sets in the same scope, exclusion wins:
/// the field is dropped from the compiled `only` list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Projection {
    only: BTreeMap<String, BTreeSet<String>>,
    except: BTreeMap<String, BTreeSet<String>>,
}

impl Projection {
    /// Creates an empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if neither set names a field.
    pub fn is_empty(&self) -> bool {
        self.only.is_empty() && self.except.is_empty()
    }

    pub(crate) fn add_only(&mut self, scope: &str, fields: Vec<String>) {
        self.only
            .entry(scope.to_string())
            .or_default()
            .extend(fields);
    }

    pub(crate) fn add_except(&mut self, scope: &str, fields: Vec<String>) {
        self.except
            .entry(scope.to_string())
            .or_default()
            .extend(fields);
    }

    /// Returns the effective inclusion list for `scope`, with excluded
    /// fields removed.
    pub fn only_fields(&self, scope: &str) -> Vec<String> {
        let excluded = self.except.get(scope);
        self.only
            .get(scope)
            .map(|fields| {
                fields
                    .iter()
                    .filter(|f| excluded.map_or(true, |ex| !ex.contains(*f)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the exclusion list for `scope`.
    pub fn except_fields(&self, scope: &str) -> Vec<String> {
        self.except
            .get(scope)
            .map(|fields| fields.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn write_params(&self, params: &mut WireParameters) {
        for scope in self.only.keys() {
            let fields = self.only_fields(scope);
            if !fields.is_empty() {
                params.insert(scoped_key("only", scope), string_array(fields));
            }
        }
        for scope in self.except.keys() {
            let fields = self.except_fields(scope);
            if !fields.is_empty() {
                params.insert(scoped_key("except", scope), string_array(fields));
            }
        }
    }
}

fn scoped_key(prefix: &str, scope: &str) -> String {
    if scope == BASE_SCOPE {
        format!("{prefix}[]")
    } else {
        format!("{prefix}[{scope}][]")
    }
}

pub(crate) fn string_array(values: impl IntoIterator<Item = String>) -> Value {
    Value::Array(values.into_iter().map(Value::String).collect())
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first.
    Ascending,
    /// Largest first.
    Descending,
}

impl SortDirection {
    /// Returns `1` for ascending and `-1` for descending.
    pub fn wire_value(&self) -> i64 {
        match self {
            SortDirection::Ascending => 1,
            SortDirection::Descending => -1,
        }
    }
}

/// The single active sort of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    /// Field path to sort by.
    pub field: String,
    /// Direction.
    pub direction: SortDirection,
}

impl Sort {
    pub(crate) fn to_json(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert(self.field.clone(), Value::from(self.direction.wire_value()));
        Value::Object(object)
    }
}
