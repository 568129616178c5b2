//! Sections, entries and fetched pages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Field identifier.
pub type FieldId = i64;

/// Entry identifier.
pub type EntryId = i64;

/// A section: the schema that groups entries of one kind.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: i64,
    pub handle: String,
    pub name: String,

    /// Child sections that link back to this one.
    #[serde(default)]
    pub associations: Vec<SectionAssociation>,
}

/// A child association declared on a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionAssociation {
    /// Child section id.
    pub section_id: i64,
    /// Child section handle, used to name count attributes.
    pub section_handle: String,
    /// Field in the child section that points at the parent entry.
    pub child_field_id: FieldId,
}

/// A single entry (record) of a section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub section_id: i64,
    pub author_id: i64,
    pub creation_date: DateTime<Utc>,
    pub modification_date: DateTime<Utc>,

    /// Raw stored data keyed by field id. Each field kind interprets its own shape.
    #[serde(default)]
    pub data: BTreeMap<FieldId, serde_json::Value>,
}

impl Entry {
    /// Field ids present in this entry's data, in field id order.
    pub fn field_ids(&self) -> Vec<FieldId> {
        self.data.keys().copied().collect()
    }
}

/// One page of entries returned by the repository.
#[derive(Debug, Clone, Default)]
pub struct EntryPage {
    pub records: Vec<Entry>,

    /// Total matching entries. `None` when the count was suppressed.
    pub total_entries: Option<i64>,

    /// Total pages at the requested page size.
    pub total_pages: i64,
}

/// Counts of child entries pointing at one entry, for one child section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssociatedCounts {
    pub section_id: i64,
    /// `(child field id, number of child entries)` in field order.
    pub fields: Vec<(FieldId, u64)>,
}

/// A partition of entries produced by a field's grouping capability.
///
/// Rendered as an element named `element` carrying `attributes`, containing
/// the direct `records` followed by the nested `groups` in order.
#[derive(Debug, Clone, Default)]
pub struct Group {
    pub element: String,
    pub attributes: Vec<(String, String)>,
    pub records: Vec<Entry>,
    pub groups: Vec<Group>,
}

impl Group {
    /// Create an empty group with the given element name and attributes.
    pub fn new(element: &str, attributes: Vec<(String, String)>) -> Self {
        Self {
            element: element.to_string(),
            attributes,
            records: Vec::new(),
            groups: Vec::new(),
        }
    }

    /// Every entry id in this group and its sub-groups, depth first.
    pub fn flatten_ids(&self) -> Vec<EntryId> {
        let mut ids: Vec<EntryId> = self.records.iter().map(|e| e.id).collect();
        for group in &self.groups {
            ids.extend(group.flatten_ids());
        }
        ids
    }
}
