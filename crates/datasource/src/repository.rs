//! Collaborator interfaces: registries and the entry repository.
//!
//! All calls are synchronous and may block; timeouts belong to the
//! implementation.

use anyhow::Result;
use sea_query::Condition;

use crate::config::SortOrder;
use crate::field::Field;
use crate::model::{AssociatedCounts, EntryId, EntryPage, FieldId, Section, SectionAssociation};
use crate::query_builder::JoinSpec;

/// Resolves sections by id.
pub trait SectionRegistry: Send + Sync {
    /// Fetch a section, `None` when it does not exist.
    fn fetch(&self, section_id: i64) -> Result<Option<Section>>;
}

/// Resolves field definitions.
pub trait FieldRegistry: Send + Sync {
    /// Fetch the fields with the given ids. Unknown ids are omitted.
    fn fetch(&self, ids: &[FieldId]) -> Result<Vec<Field>>;

    /// Id of the field with `handle` in `section_id`.
    fn field_id_by_handle(&self, handle: &str, section_id: i64) -> Result<Option<FieldId>>;

    /// Element handle of a field.
    fn handle_by_id(&self, id: FieldId) -> Result<Option<String>>;
}

/// What to sort a fetch by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortTarget {
    #[default]
    SystemId,
    CreationDate,
    ModificationDate,
    Field(FieldId),
}

/// Sort target plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortSpec {
    pub target: SortTarget,
    pub order: SortOrder,
}

/// One paginated fetch.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    /// 1-based page number.
    pub page: i64,
    pub section_id: i64,
    /// Page size; `None` fetches everything.
    pub per_page: Option<i64>,
    /// Compiled filter predicate.
    pub condition: Condition,
    /// Joins required by the predicate.
    pub joins: Vec<JoinSpec>,
    /// Collapse duplicate rows produced by one-to-many joins.
    pub group: bool,
    /// Skip counting; the page's `total_entries` will be `None`.
    pub records_only: bool,
    /// Load field data for each entry.
    pub hydrate: bool,
    /// Element handles whose data is needed downstream.
    pub element_names: Vec<String>,
    pub sort: SortSpec,
}

/// Entry storage.
pub trait EntryRepository: Send + Sync {
    /// Fetch one page of entries.
    fn fetch_by_page(&self, request: &FetchRequest) -> Result<EntryPage>;

    /// Count child entries pointing at `entry_id` through each association.
    fn associated_entry_counts(
        &self,
        entry_id: EntryId,
        associations: &[SectionAssociation],
    ) -> Result<Vec<AssociatedCounts>>;
}
