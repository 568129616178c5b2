//! Renders fetched entries and groups into output nodes.
//!
//! Rendering also drives parameter extraction: every entry contributes its
//! configured output parameters to the pool, even in params-only mode where
//! no nodes are produced.

use std::collections::HashMap;

use anyhow::Context;

use super::Node;
use crate::compat;
use crate::config::{DatasourceConfig, IncludedElement};
use crate::deprecation::DeprecationLog;
use crate::error::DatasourceResult;
use crate::field::date::date_element;
use crate::field::FieldPool;
use crate::model::{Entry, FieldId, Group, SectionAssociation};
use crate::params::{ParamExtractor, ParamPool};
use crate::repository::{EntryRepository, FieldRegistry};

/// Section handles starting with a digit are not valid attribute names.
fn attribute_handle(section_handle: &str) -> String {
    if section_handle.starts_with(|c: char| c.is_ascii_digit()) {
        format!("x-{section_handle}")
    } else {
        section_handle.to_string()
    }
}

/// Per-execution entry renderer.
pub struct EntryRenderer<'a> {
    config: &'a DatasourceConfig,
    included: Vec<IncludedElement>,
    fields: &'a dyn FieldRegistry,
    entries: &'a dyn EntryRepository,
    associations: Vec<SectionAssociation>,
    field_pool: &'a mut FieldPool,
    extractor: ParamExtractor,
    pool: &'a mut ParamPool,
    log: &'a mut DeprecationLog,
    handles: HashMap<FieldId, Option<String>>,
    date_element: bool,
}

impl<'a> EntryRenderer<'a> {
    pub fn new(
        config: &'a DatasourceConfig,
        fields: &'a dyn FieldRegistry,
        entries: &'a dyn EntryRepository,
        associations: Vec<SectionAssociation>,
        field_pool: &'a mut FieldPool,
        pool: &'a mut ParamPool,
        log: &'a mut DeprecationLog,
    ) -> Self {
        let extractor = ParamExtractor::new(config);
        let date_element = !config.is_params_only()
            && compat::wants_date_element(&config.included_elements, log);
        Self {
            config,
            included: config.included(),
            fields,
            entries,
            associations,
            field_pool,
            extractor,
            pool,
            log,
            handles: HashMap::new(),
            date_element,
        }
    }

    fn params_only(&self) -> bool {
        self.config.is_params_only()
    }

    /// Resolve the fields of the first record in one registry call.
    fn preload(&mut self, records: &[Entry]) -> DatasourceResult<()> {
        if let Some(first) = records.first() {
            self.field_pool.preload(&first.field_ids(), self.fields)?;
        }
        Ok(())
    }

    /// Render a flat list of records.
    pub fn render_entries(&mut self, records: &[Entry]) -> DatasourceResult<Vec<Node>> {
        self.preload(records)?;
        let mut nodes = Vec::with_capacity(records.len());
        for entry in records {
            if let Some(node) = self.render_entry(entry)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    /// Render a group: its direct records, then its sub-groups in order.
    /// `None` in params-only mode.
    pub fn render_group(&mut self, group: &Group) -> DatasourceResult<Option<Node>> {
        let mut node = Node::new(&group.element);
        for (name, value) in &group.attributes {
            node.set_attribute(name, value);
        }

        for child in self.render_entries(&group.records)? {
            node.append_child(child);
        }
        for sub_group in &group.groups {
            if let Some(child) = self.render_group(sub_group)? {
                node.append_child(child);
            }
        }

        Ok((!self.params_only()).then_some(node))
    }

    /// Render one entry. `None` in params-only mode.
    pub fn render_entry(&mut self, entry: &Entry) -> DatasourceResult<Option<Node>> {
        let mut node = Node::new("entry").with_attribute("id", entry.id);

        if !self.associations.is_empty() {
            self.set_associated_counts(&mut node, entry)?;
        }

        self.extractor.system_parameters(entry, self.pool, self.log);

        for (field_id, data) in &entry.data {
            let Some(field) = self.field_pool.resolve(*field_id, self.fields)? else {
                tracing::debug!(field_id, entry_id = entry.id, "skipping data of unknown field");
                continue;
            };

            self.extractor
                .field_parameters(&field, data, entry, self.pool, self.log);

            if self.params_only() {
                continue;
            }
            for included in &self.included {
                if included.handle == field.element_name {
                    field.append_formatted_element(
                        &mut node,
                        data,
                        self.config.html_encode,
                        included.mode.as_deref(),
                        entry.id,
                    );
                }
            }
        }

        if self.params_only() {
            return Ok(None);
        }

        if self.date_element {
            let mut dates = Node::new("system-date");
            dates.append_child(date_element("created", &entry.creation_date));
            dates.append_child(date_element("modified", &entry.modification_date));
            node.append_child(dates);
        }

        Ok(Some(node))
    }

    fn field_handle(&mut self, field_id: FieldId) -> DatasourceResult<Option<String>> {
        if let Some(handle) = self.handles.get(&field_id) {
            return Ok(handle.clone());
        }
        let handle = self
            .fields
            .handle_by_id(field_id)
            .with_context(|| format!("failed to look up handle of field {field_id}"))?;
        self.handles.insert(field_id, handle.clone());
        Ok(handle)
    }

    /// Annotate `node` with the number of child entries linking to `entry`.
    fn set_associated_counts(&mut self, node: &mut Node, entry: &Entry) -> DatasourceResult<()> {
        let counts = self
            .entries
            .associated_entry_counts(entry.id, &self.associations)
            .with_context(|| format!("failed to count entries associated with {}", entry.id))?;

        for section_counts in counts {
            let Some(association) = self
                .associations
                .iter()
                .find(|a| a.section_id == section_counts.section_id)
            else {
                continue;
            };
            let section_handle = attribute_handle(&association.section_handle);

            for (field_id, count) in section_counts.fields {
                if let Some(field_handle) = self.field_handle(field_id)? {
                    node.set_attribute(&format!("{section_handle}-{field_handle}"), count);
                }
                node.set_attribute(&section_handle, count);
            }
        }
        Ok(())
    }
}
