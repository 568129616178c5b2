//! Section datasource test utilities.
//!
//! In-memory registries and an entry repository, plus fixture builders for
//! sections, fields and entries.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use serde_json::Value as JsonValue;

use section_datasource::config::SortOrder;
use section_datasource::query_builder::{self, EntryQueryBuilder};
use section_datasource::{
    AssociatedCounts, Entry, EntryId, EntryPage, EntryRepository, FetchRequest, Field, FieldId,
    FieldKind, FieldRegistry, Section, SectionAssociation, SectionRegistry, SortTarget,
};

/// Create a test section with no associations.
pub fn test_section(id: i64, handle: &str) -> Section {
    Section {
        id,
        handle: handle.to_string(),
        name: handle.replace('-', " "),
        associations: Vec::new(),
    }
}

/// Create a test field.
pub fn test_field(id: FieldId, section_id: i64, element_name: &str, kind: FieldKind) -> Field {
    Field {
        id,
        section_id,
        element_name: element_name.to_string(),
        label: element_name.to_string(),
        kind,
    }
}

/// Create a test entry created and modified at the Unix epoch plus `id` hours.
pub fn test_entry(id: EntryId, section_id: i64) -> TestEntry {
    let date = Utc
        .timestamp_opt(id * 3600, 0)
        .single()
        .unwrap_or_default();
    TestEntry(Entry {
        id,
        section_id,
        author_id: 1,
        creation_date: date,
        modification_date: date,
        data: BTreeMap::new(),
    })
}

/// A test entry builder.
#[derive(Debug, Clone)]
pub struct TestEntry(Entry);

impl TestEntry {
    /// Set the author.
    pub fn with_author(mut self, author_id: i64) -> Self {
        self.0.author_id = author_id;
        self
    }

    /// Set the creation date.
    pub fn created(mut self, date: DateTime<Utc>) -> Self {
        self.0.creation_date = date;
        self
    }

    /// Set the modification date.
    pub fn modified(mut self, date: DateTime<Utc>) -> Self {
        self.0.modification_date = date;
        self
    }

    /// Add raw data for a field.
    pub fn with_data(mut self, field_id: FieldId, value: JsonValue) -> Self {
        self.0.data.insert(field_id, value);
        self
    }

    /// Add a text value; the handle is the lowercased, dashed value.
    pub fn with_text(self, field_id: FieldId, value: &str) -> Self {
        let handle = value.to_lowercase().replace(' ', "-");
        self.with_data(
            field_id,
            serde_json::json!({
                "value": value,
                "handle": handle
            }),
        )
    }

    pub fn build(self) -> Entry {
        self.0
    }
}

impl From<TestEntry> for Entry {
    fn from(entry: TestEntry) -> Self {
        entry.0
    }
}

/// In-memory section registry.
#[derive(Debug, Default)]
pub struct InMemorySections {
    sections: HashMap<i64, Section>,
}

impl InMemorySections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_section(mut self, section: Section) -> Self {
        self.sections.insert(section.id, section);
        self
    }
}

impl SectionRegistry for InMemorySections {
    fn fetch(&self, section_id: i64) -> Result<Option<Section>> {
        Ok(self.sections.get(&section_id).cloned())
    }
}

/// In-memory field registry counting its lookups.
#[derive(Debug, Default)]
pub struct InMemoryFields {
    fields: BTreeMap<FieldId, Field>,
    fetches: Mutex<Vec<Vec<FieldId>>>,
}

impl InMemoryFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.insert(field.id, field);
        self
    }

    /// Ids requested by each `fetch` call, in call order.
    pub fn fetches(&self) -> Vec<Vec<FieldId>> {
        self.fetches.lock().clone()
    }

    /// How many times `id` was requested.
    pub fn fetch_count(&self, id: FieldId) -> usize {
        self.fetches
            .lock()
            .iter()
            .filter(|ids| ids.contains(&id))
            .count()
    }
}

impl FieldRegistry for InMemoryFields {
    fn fetch(&self, ids: &[FieldId]) -> Result<Vec<Field>> {
        self.fetches.lock().push(ids.to_vec());
        Ok(ids
            .iter()
            .filter_map(|id| self.fields.get(id).cloned())
            .collect())
    }

    fn field_id_by_handle(&self, handle: &str, section_id: i64) -> Result<Option<FieldId>> {
        Ok(self
            .fields
            .values()
            .find(|f| f.element_name == handle && f.section_id == section_id)
            .map(|f| f.id))
    }

    fn handle_by_id(&self, id: FieldId) -> Result<Option<String>> {
        Ok(self.fields.get(&id).map(|f| f.element_name.clone()))
    }
}

/// Records matched by the in-memory repository.
type Matcher = Box<dyn Fn(&Entry) -> bool + Send + Sync>;

/// In-memory entry repository.
///
/// Compiled conditions are not evaluated; install a matcher with
/// [`with_matcher`](Self::with_matcher) to narrow the records, and inspect
/// the recorded requests (or their SQL) to check the predicates.
/// Random order keeps insertion order.
#[derive(Default)]
pub struct InMemoryEntries {
    entries: Vec<Entry>,
    counts: HashMap<EntryId, Vec<AssociatedCounts>>,
    matcher: Option<Matcher>,
    requests: Mutex<Vec<FetchRequest>>,
}

impl InMemoryEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entry(mut self, entry: impl Into<Entry>) -> Self {
        self.entries.push(entry.into());
        self
    }

    pub fn with_entries<I, E>(mut self, entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Entry>,
    {
        self.entries.extend(entries.into_iter().map(Into::into));
        self
    }

    /// Report `count` child entries of `section_id` linking to `entry_id`
    /// through `field_id`.
    pub fn with_count(
        mut self,
        entry_id: EntryId,
        section_id: i64,
        field_id: FieldId,
        count: u64,
    ) -> Self {
        let counts = self.counts.entry(entry_id).or_default();
        match counts.iter_mut().find(|c| c.section_id == section_id) {
            Some(c) => c.fields.push((field_id, count)),
            None => counts.push(AssociatedCounts {
                section_id,
                fields: vec![(field_id, count)],
            }),
        }
        self
    }

    pub fn with_matcher(mut self, matcher: impl Fn(&Entry) -> bool + Send + Sync + 'static) -> Self {
        self.matcher = Some(Box::new(matcher));
        self
    }

    /// Every fetch request received, in order.
    pub fn requests(&self) -> Vec<FetchRequest> {
        self.requests.lock().clone()
    }

    /// SQL of the last fetch request.
    pub fn last_sql(&self) -> Option<String> {
        self.requests
            .lock()
            .last()
            .map(|r| EntryQueryBuilder::new(r).build())
    }
}

fn sort_value(entry: &Entry, field_id: FieldId) -> Option<String> {
    match entry.data.get(&field_id)?.get("value")? {
        JsonValue::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn compare(a: &Entry, b: &Entry, target: SortTarget) -> Ordering {
    let primary = match target {
        SortTarget::SystemId => Ordering::Equal,
        SortTarget::CreationDate => a.creation_date.cmp(&b.creation_date),
        SortTarget::ModificationDate => a.modification_date.cmp(&b.modification_date),
        SortTarget::Field(id) => sort_value(a, id).cmp(&sort_value(b, id)),
    };
    primary.then(a.id.cmp(&b.id))
}

impl EntryRepository for InMemoryEntries {
    fn fetch_by_page(&self, request: &FetchRequest) -> Result<EntryPage> {
        self.requests.lock().push(request.clone());

        let mut records: Vec<Entry> = self
            .entries
            .iter()
            .filter(|e| e.section_id == request.section_id)
            .filter(|e| self.matcher.as_ref().is_none_or(|m| m(*e)))
            .cloned()
            .collect();

        match request.sort.order {
            SortOrder::Asc => records.sort_by(|a, b| compare(a, b, request.sort.target)),
            SortOrder::Desc => records.sort_by(|a, b| compare(b, a, request.sort.target)),
            SortOrder::Random => {}
        }

        let total = records.len() as i64;
        let (records, total_pages) = match request.per_page {
            Some(per_page) if per_page > 0 => {
                let size = per_page.unsigned_abs();
                let start = usize::try_from(query_builder::page_offset(request.page, size))
                    .unwrap_or(usize::MAX);
                let page = records
                    .into_iter()
                    .skip(start)
                    .take(usize::try_from(size).unwrap_or(usize::MAX))
                    .collect();
                (page, total / per_page + i64::from(total % per_page != 0))
            }
            Some(_) => (Vec::new(), 0),
            None => (records, i64::from(total > 0)),
        };

        Ok(EntryPage {
            records,
            total_entries: (!request.records_only).then_some(total),
            total_pages,
        })
    }

    fn associated_entry_counts(
        &self,
        entry_id: EntryId,
        associations: &[SectionAssociation],
    ) -> Result<Vec<AssociatedCounts>> {
        Ok(self
            .counts
            .get(&entry_id)
            .map(|counts| {
                counts
                    .iter()
                    .filter(|c| associations.iter().any(|a| a.section_id == c.section_id))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}
