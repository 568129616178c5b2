//! The parameter pool: named values passed between datasources.
//!
//! A datasource reads the caller's pool to resolve `{$name}` references in
//! its filters, and writes its own `ds-<root>.<param>` outputs back into it.

mod extract;
mod substitute;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub use extract::ParamExtractor;
pub use substitute::{resolve, resolve_filters};

/// Parameter key to ordered values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamPool(BTreeMap<String, Vec<String>>);

impl ParamPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&[String]> {
        self.0.get(key).map(Vec::as_slice)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Replace the values of `key`.
    pub fn insert(&mut self, key: impl Into<String>, values: Vec<String>) {
        self.0.insert(key.into(), values);
    }

    /// Make sure `key` exists, with no values if it was absent.
    pub fn ensure(&mut self, key: &str) {
        self.0.entry(key.to_string()).or_default();
    }

    /// Append one value to `key`.
    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.0.entry(key.to_string()).or_default().push(value.into());
    }

    /// Put `values` in front of the existing values of `key`.
    pub fn merge_front(&mut self, key: &str, values: &[String]) {
        let existing = self.0.entry(key.to_string()).or_default();
        existing.splice(0..0, values.iter().cloned());
    }

    /// Whether `key` holds at least one non-blank value.
    pub fn is_set(&self, key: &str) -> bool {
        self.get(key)
            .is_some_and(|values| values.iter().any(|v| !v.trim().is_empty()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Vec<String>)> for ParamPool {
    fn from_iter<I: IntoIterator<Item = (K, Vec<String>)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}
