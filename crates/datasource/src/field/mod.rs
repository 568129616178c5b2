//! Field definitions and their capabilities.
//!
//! A [`Field`] is a typed column definition. Its capabilities (building a
//! retrieval predicate, rendering a value, extracting a parameter value,
//! grouping records) vary by [`FieldKind`] and are dispatched on that tag.

mod checkbox;
pub mod date;
mod number;
mod pool;
mod relation;
mod select;
mod text;

use sea_query::Condition;
use serde::{Deserialize, Serialize};

use crate::filter::FilterMode;
use crate::model::{Entry, EntryId, FieldId, Group};
use crate::output::Node;
use crate::query_builder::JoinSpec;

pub use pool::FieldPool;

/// A typed column definition belonging to a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    pub section_id: i64,
    /// Element handle used in output and parameter names.
    pub element_name: String,
    pub label: String,
    #[serde(flatten)]
    pub kind: FieldKind,
}

/// Field type tag with per-type settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// Single line of text with a handle.
    Text,
    /// Numeric value.
    Number,
    /// Date and time.
    Date,
    /// Yes/no toggle.
    Checkbox,
    /// One or more options from a fixed list.
    Select {
        #[serde(default)]
        allow_multiple: bool,
    },
    /// Links to entries of another section.
    Relation { related_section_id: i64 },
}

/// Predicate produced by a field for one filter entry.
#[derive(Debug, Clone)]
pub struct FieldPredicate {
    pub joins: Vec<JoinSpec>,
    pub condition: Condition,
}

/// A filter value the field cannot turn into a valid predicate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid filter value `{value}` for field `{field}`")]
pub struct InvalidFilter {
    pub field: String,
    pub value: String,
}

/// Value contributed by a field to the parameter pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamValue {
    /// Nothing to contribute.
    None,
    /// A single value, appended.
    Single(String),
    /// Several values, merged in front of existing ones.
    Many(Vec<String>),
}

impl Field {
    /// Build a retrieval predicate from parsed filter values.
    pub fn build_predicate(
        &self,
        values: &[String],
        mode: FilterMode,
    ) -> Result<FieldPredicate, InvalidFilter> {
        match &self.kind {
            FieldKind::Text => text::build_predicate(self, values, mode),
            FieldKind::Number => number::build_predicate(self, values, mode),
            FieldKind::Date => date::build_field_predicate(self, values, mode),
            FieldKind::Checkbox => checkbox::build_predicate(self, values, mode),
            FieldKind::Select { .. } => select::build_predicate(self, values, mode),
            FieldKind::Relation { .. } => relation::build_predicate(self, values, mode),
        }
    }

    /// Whether filtering on this field can join several rows per entry.
    pub fn requires_grouping(&self) -> bool {
        match &self.kind {
            FieldKind::Select { allow_multiple } => *allow_multiple,
            FieldKind::Relation { .. } => true,
            _ => false,
        }
    }

    /// Append this field's rendering of `data` to `parent`.
    pub fn append_formatted_element(
        &self,
        parent: &mut Node,
        data: &serde_json::Value,
        encode: bool,
        mode: Option<&str>,
        entry_id: EntryId,
    ) {
        let node = match &self.kind {
            FieldKind::Text => text::format(self, data, encode, mode),
            FieldKind::Number => number::format(self, data),
            FieldKind::Date => date::format(self, data),
            FieldKind::Checkbox => checkbox::format(self, data),
            FieldKind::Select { .. } => select::format(self, data, encode),
            FieldKind::Relation { .. } => relation::format(self, data),
        };
        match node {
            Some(node) => parent.append_child(node),
            None => tracing::trace!(field = %self.element_name, entry_id, "no value to render"),
        }
    }

    /// Value this field contributes to the parameter pool.
    pub fn parameter_pool_value(&self, data: &serde_json::Value, _entry_id: EntryId) -> ParamValue {
        match &self.kind {
            FieldKind::Text | FieldKind::Number | FieldKind::Checkbox => {
                scalar(data.get("value")).map_or(ParamValue::None, ParamValue::Single)
            }
            FieldKind::Date => date::parameter_value(data),
            FieldKind::Select { .. } => {
                let handles = strings(data.get("handle"));
                if handles.is_empty() {
                    ParamValue::None
                } else {
                    ParamValue::Many(handles)
                }
            }
            FieldKind::Relation { .. } => {
                let ids = strings(data.get("relation_id"));
                if ids.is_empty() {
                    ParamValue::None
                } else {
                    ParamValue::Many(ids)
                }
            }
        }
    }

    /// Partition `records` into groups. `None` when the field cannot group.
    pub fn group_records(&self, records: &[Entry]) -> Option<Vec<Group>> {
        match &self.kind {
            FieldKind::Text => Some(text::group_records(self, records)),
            FieldKind::Checkbox => Some(checkbox::group_records(self, records)),
            FieldKind::Select { .. } => Some(select::group_records(self, records)),
            FieldKind::Date => Some(date::group_records(self, records)),
            FieldKind::Number | FieldKind::Relation { .. } => None,
        }
    }

    /// Alias of this field's data table in generated SQL.
    pub(crate) fn alias(&self) -> String {
        format!("t{}", self.id)
    }

    /// Alias for the n-th join when AND mode needs one join per value.
    pub(crate) fn nth_alias(&self, n: usize) -> String {
        format!("t{}_{}", self.id, n)
    }

    pub(crate) fn invalid(&self, value: &str) -> InvalidFilter {
        InvalidFilter {
            field: self.element_name.clone(),
            value: value.to_string(),
        }
    }
}

/// Read a scalar string or number.
pub(crate) fn scalar(value: Option<&serde_json::Value>) -> Option<String> {
    match value? {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(if *b { "yes" } else { "no" }.to_string()),
        serde_json::Value::Array(items) => scalar(items.first()),
        _ => None,
    }
}

/// Read a scalar or an array of scalars as a list of strings.
pub(crate) fn strings(value: Option<&serde_json::Value>) -> Vec<String> {
    match value {
        Some(serde_json::Value::Array(items)) => {
            items.iter().filter_map(|v| scalar(Some(v))).collect()
        }
        other => scalar(other).into_iter().collect(),
    }
}

/// Add `entry` to the group whose `key` matches, creating it at the end.
pub(crate) fn push_grouped(
    groups: &mut Vec<(String, Group)>,
    key: &str,
    make: impl FnOnce() -> Group,
    entry: &Entry,
) {
    match groups.iter_mut().find(|(k, _)| k == key) {
        Some((_, group)) => group.records.push(entry.clone()),
        None => {
            let mut group = make();
            group.records.push(entry.clone());
            groups.push((key.to_string(), group));
        }
    }
}
