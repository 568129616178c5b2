//! Section datasource library.
//!
//! Retrieves the entries of a section, narrows them through the field-aware
//! filter language, sorts, paginates and optionally groups them, and renders
//! the result as an output tree plus a parameter pool that later datasources
//! can consume in their own filters.
//!
//! Storage and schema lookups are external collaborators, reached through
//! the traits in [`repository`].

pub mod compat;
pub mod config;
pub mod datasource;
pub mod deprecation;
pub mod error;
pub mod extension;
pub mod field;
pub mod filter;
pub mod model;
pub mod output;
pub mod params;
pub mod query_builder;
pub mod repository;

pub use config::{DatasourceConfig, IncludedElement, SortOrder};
pub use datasource::{NotFoundReason, Outcome, SectionDatasource};
pub use deprecation::DeprecationLog;
pub use error::{DatasourceError, DatasourceResult};
pub use extension::{EntriesBuiltHook, HookRegistry};
pub use field::{Field, FieldKind, FieldPool, ParamValue};
pub use filter::{CompiledFilters, FilterCompiler, FilterKey, FilterMode, FilterSpec, FilterValue};
pub use model::{
    AssociatedCounts, Entry, EntryId, EntryPage, FieldId, Group, Section, SectionAssociation,
};
pub use output::{EntryRenderer, Node};
pub use params::{ParamExtractor, ParamPool};
pub use repository::{
    EntryRepository, FetchRequest, FieldRegistry, SectionRegistry, SortSpec, SortTarget,
};
