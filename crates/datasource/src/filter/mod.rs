//! Filter specification and compiler.
//!
//! A filter specification maps field ids or pseudo-fields to filter
//! expressions. The compiler turns it into a single conjunctive predicate
//! plus the joins the fields need.

mod compiler;
mod dsl;

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::model::FieldId;

pub use compiler::{CompiledFilters, FilterCompiler};
pub use dsl::{determine_mode, split_filter};

/// How the values of one filter combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMode {
    /// Every value must match.
    And,
    /// Any value may match.
    Or,
}

/// Key of a filter specification entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FilterKey {
    /// Bare `id`, the pre-`system:id` spelling.
    Id,
    SystemId,
    CreationDate,
    ModificationDate,
    /// Deprecated `system:date`.
    LegacyDate,
    Field(FieldId),
    /// Anything else; rejected when compiled.
    Unknown(String),
}

impl FilterKey {
    /// Parse a key as written in the configuration.
    pub fn parse(key: &str) -> Self {
        match key.trim() {
            "id" => FilterKey::Id,
            "system:id" => FilterKey::SystemId,
            "system:creation-date" => FilterKey::CreationDate,
            "system:modification-date" => FilterKey::ModificationDate,
            "system:date" => FilterKey::LegacyDate,
            other => other
                .parse::<FieldId>()
                .map(FilterKey::Field)
                .unwrap_or_else(|_| FilterKey::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKey::Id => f.write_str("id"),
            FilterKey::SystemId => f.write_str("system:id"),
            FilterKey::CreationDate => f.write_str("system:creation-date"),
            FilterKey::ModificationDate => f.write_str("system:modification-date"),
            FilterKey::LegacyDate => f.write_str("system:date"),
            FilterKey::Field(id) => write!(f, "{id}"),
            FilterKey::Unknown(key) => f.write_str(key),
        }
    }
}

impl From<FieldId> for FilterKey {
    fn from(id: FieldId) -> Self {
        FilterKey::Field(id)
    }
}

impl From<&str> for FilterKey {
    fn from(key: &str) -> Self {
        FilterKey::parse(key)
    }
}

/// Filter value: one expression, or an explicit list of alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Expression parsed for `+` (AND) or `,` (OR) separators.
    Single(String),
    /// Alternatives; always OR.
    Any(Vec<String>),
}

impl FilterValue {
    /// Blank values are ignored.
    pub fn is_blank(&self) -> bool {
        match self {
            FilterValue::Single(s) => s.trim().is_empty(),
            FilterValue::Any(values) => values.is_empty(),
        }
    }

    /// Filter mode and discrete values.
    pub fn parse(&self) -> (FilterMode, Vec<String>) {
        match self {
            FilterValue::Single(s) => {
                let mode = determine_mode(s);
                (mode, split_filter(mode, s))
            }
            FilterValue::Any(values) => (FilterMode::Or, values.clone()),
        }
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Single(value.to_string())
    }
}

/// Ordered filter specification.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec(Vec<(FilterKey, FilterValue)>);

impl FilterSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the filter for `key`, keeping its original position.
    pub fn insert(&mut self, key: impl Into<FilterKey>, value: impl Into<FilterValue>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.0.push((key, value)),
        }
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<FilterKey>, value: impl Into<FilterValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = &(FilterKey, FilterValue)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl FromIterator<(FilterKey, FilterValue)> for FilterSpec {
    fn from_iter<I: IntoIterator<Item = (FilterKey, FilterValue)>>(iter: I) -> Self {
        let mut spec = FilterSpec::new();
        for (key, value) in iter {
            spec.insert(key, value);
        }
        spec
    }
}

impl Serialize for FilterSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (key, value) in &self.0 {
            map.serialize_entry(&key.to_string(), value)?;
        }
        map.end()
    }
}

struct FilterSpecVisitor;

impl<'de> Visitor<'de> for FilterSpecVisitor {
    type Value = FilterSpec;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map of filter keys to a string or a list of strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<FilterSpec, A::Error> {
        let mut spec = FilterSpec::new();
        while let Some((key, value)) = access.next_entry::<String, FilterValue>()? {
            spec.insert(FilterKey::parse(&key), value);
        }
        Ok(spec)
    }
}

impl<'de> Deserialize<'de> for FilterSpec {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(FilterSpecVisitor)
    }
}
