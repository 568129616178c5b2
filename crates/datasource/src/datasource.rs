//! The section datasource: compile, fetch, render.

use std::sync::Arc;

use anyhow::Context;

use crate::compat;
use crate::config::{DatasourceConfig, IncludedElement};
use crate::deprecation::DeprecationLog;
use crate::error::{DatasourceError, DatasourceResult};
use crate::extension::{FRONTEND_CONTEXT, HookRegistry};
use crate::field::FieldPool;
use crate::filter::{CompiledFilters, FilterCompiler};
use crate::model::{EntryPage, FieldId, Group, Section};
use crate::output::{self, EntryRenderer, Node};
use crate::params::{self, ParamPool};
use crate::repository::{
    EntryRepository, FetchRequest, FieldRegistry, SectionRegistry, SortSpec, SortTarget,
};

/// Why an execution asked for a not-found response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// A required parameter was missing or a filter could not match.
    RequiredParameter,
    /// A forbidden parameter was present.
    ForbiddenParameter,
    /// Nothing matched.
    NoRecords,
}

/// Result of one execution.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Records were found and rendered.
    Rendered(Node),
    /// The datasource did not run: a required parameter was missing, a
    /// filter could not match, or a forbidden parameter was present.
    Degraded(Node),
    /// Nothing matched.
    Empty(Node),
    /// Records were found; only the parameter pool was populated.
    ParamsOnly,
    /// The caller should respond with "not found".
    NotFound(NotFoundReason),
}

impl Outcome {
    /// The output tree, if one was produced.
    pub fn node(&self) -> Option<&Node> {
        match self {
            Outcome::Rendered(node) | Outcome::Degraded(node) | Outcome::Empty(node) => Some(node),
            Outcome::ParamsOnly | Outcome::NotFound(_) => None,
        }
    }
}

/// A datasource over the entries of one section.
pub struct SectionDatasource {
    config: DatasourceConfig,
    sections: Arc<dyn SectionRegistry>,
    fields: Arc<dyn FieldRegistry>,
    entries: Arc<dyn EntryRepository>,
    hooks: Arc<HookRegistry>,
}

impl SectionDatasource {
    pub fn new(
        config: DatasourceConfig,
        sections: Arc<dyn SectionRegistry>,
        fields: Arc<dyn FieldRegistry>,
        entries: Arc<dyn EntryRepository>,
    ) -> Self {
        Self {
            config,
            sections,
            fields,
            entries,
            hooks: Arc::new(HookRegistry::new()),
        }
    }

    /// Use `hooks` for entries-built notifications.
    pub fn with_hooks(mut self, hooks: Arc<HookRegistry>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn config(&self) -> &DatasourceConfig {
        &self.config
    }

    fn name(&self) -> &str {
        &self.config.root_element
    }

    /// Run the datasource. Parameters it outputs are added to `pool`.
    pub fn execute(&self, pool: &mut ParamPool) -> DatasourceResult<Outcome> {
        let mut log = DeprecationLog::new();
        self.execute_with_log(pool, &mut log)
    }

    /// Run the datasource, recording deprecated usages in `log`.
    pub fn execute_with_log(
        &self,
        pool: &mut ParamPool,
        log: &mut DeprecationLog,
    ) -> DatasourceResult<Outcome> {
        let config = &self.config;
        let section = self.section()?;
        let mut root = Node::new(&config.root_element);

        if let Some(required) = config.required_param.as_deref()
            && !pool.is_set(param_name(required))
        {
            tracing::debug!(datasource = self.name(), required, "required parameter missing");
            return Ok(self.forced_empty(root, &section));
        }

        if let Some(forbidden) = config.negate_param.as_deref()
            && pool.is_set(param_name(forbidden))
        {
            tracing::debug!(datasource = self.name(), forbidden, "forbidden parameter present");
            if config.redirect_on_forbidden {
                return Ok(Outcome::NotFound(NotFoundReason::ForbiddenParameter));
            }
            root.append_child(output::forbidden_param_node(Some(forbidden)));
            root.prepend_child(output::section_node(&section));
            return Ok(Outcome::Degraded(root));
        }

        let include_pagination = config.includes_pagination();
        let filters = params::resolve_filters(&config.filters, pool);
        let mut field_pool = FieldPool::new();
        let compiled = FilterCompiler::new(self.name(), self.fields.as_ref()).compile(
            &filters,
            &mut field_pool,
            log,
        )?;
        if compiled.force_empty {
            return Ok(self.forced_empty(root, &section));
        }

        let sort = SortSpec {
            target: self.sort_target(log)?,
            order: config.order,
        };
        let start_page = config
            .start_page
            .as_deref()
            .map(|raw| params::resolve(raw, pool))
            .and_then(|raw| raw.trim().parse::<i64>().ok());
        let page = match start_page {
            Some(p) if config.paginate_results && p > 0 => p,
            _ => 1,
        };
        let per_page = if config.paginate_results {
            config.limit.filter(|l| *l >= 0)
        } else {
            None
        };

        let request = self.fetch_request(compiled, page, per_page, sort, !include_pagination)?;
        let mut entries = self
            .entries
            .fetch_by_page(&request)
            .with_context(|| format!("failed to fetch entries of section {}", section.id))?;
        self.hooks
            .notify(FRONTEND_CONTEXT, config, &mut entries.records, &filters);

        let entries_per_page = per_page.unwrap_or(entries.total_entries.unwrap_or(0));
        if is_empty_result(&entries, include_pagination, start_page) {
            tracing::debug!(datasource = self.name(), page, "no records");
            if config.redirect_on_empty {
                return Ok(Outcome::NotFound(NotFoundReason::NoRecords));
            }
            root.append_child(output::no_records_node());
            root.prepend_child(output::section_node(&section));
            if include_pagination {
                root.prepend_child(output::pagination_node(0, 0, entries_per_page, 1));
            }
            return Ok(Outcome::Empty(root));
        }

        let params_only = config.is_params_only();
        if !params_only {
            root.append_child(output::section_node(&section));
            if include_pagination {
                root.prepend_child(output::pagination_node(
                    entries.total_entries.unwrap_or(0),
                    entries.total_pages,
                    entries_per_page,
                    page,
                ));
            }
        }

        if per_page.is_none_or(|limit| limit != 0) {
            let associations = if config.associated_entry_counts {
                section.associations.clone()
            } else {
                Vec::new()
            };
            let group = config
                .group
                .map(|id| self.group_records(id, &entries, &mut field_pool))
                .transpose()?;

            let mut renderer = EntryRenderer::new(
                config,
                self.fields.as_ref(),
                self.entries.as_ref(),
                associations,
                &mut field_pool,
                pool,
                log,
            );
            match group {
                Some(groups) => {
                    for group in &groups {
                        if let Some(node) = renderer.render_group(group)? {
                            root.append_child(node);
                        }
                    }
                }
                None => {
                    for node in renderer.render_entries(&entries.records)? {
                        root.append_child(node);
                    }
                }
            }
        }

        tracing::debug!(
            datasource = self.name(),
            records = entries.records.len(),
            lookups = field_pool.lookups(),
            "rendered"
        );
        if params_only {
            Ok(Outcome::ParamsOnly)
        } else {
            Ok(Outcome::Rendered(root))
        }
    }

    fn section(&self) -> DatasourceResult<Section> {
        self.sections
            .fetch(self.config.source)
            .with_context(|| format!("failed to fetch section {}", self.config.source))?
            .ok_or_else(|| DatasourceError::SectionNotFound {
                section_id: self.config.source,
                datasource: self.name().to_string(),
            })
    }

    fn forced_empty(&self, mut root: Node, section: &Section) -> Outcome {
        if self.config.redirect_on_required {
            return Outcome::NotFound(NotFoundReason::RequiredParameter);
        }
        root.append_child(output::required_param_node(
            self.config.required_param.as_deref(),
        ));
        root.prepend_child(output::section_node(section));
        Outcome::Degraded(root)
    }

    fn sort_target(&self, log: &mut DeprecationLog) -> DatasourceResult<SortTarget> {
        let Some(sort) = self.config.sort.as_deref() else {
            return Ok(SortTarget::SystemId);
        };
        if let Some(target) = compat::sort_target(sort, log) {
            return Ok(target);
        }

        let id = self
            .fields
            .field_id_by_handle(sort, self.config.source)
            .with_context(|| format!("failed to look up sort field `{sort}`"))?;
        match id {
            Some(id) => Ok(SortTarget::Field(id)),
            None => {
                tracing::warn!(
                    datasource = self.name(),
                    sort,
                    "unknown sort field; sorting by system:id"
                );
                Ok(SortTarget::SystemId)
            }
        }
    }

    /// Handles of every element needed downstream: included elements,
    /// output parameters and the grouping field.
    fn projection(&self) -> DatasourceResult<Vec<String>> {
        let mut names: Vec<String> = Vec::new();
        let included = self
            .config
            .included_elements
            .iter()
            .map(|raw| IncludedElement::parse(raw).handle);
        let params = self.config.param_output.iter().cloned();
        for name in included.chain(params) {
            if !names.contains(&name) {
                names.push(name);
            }
        }

        if let Some(group) = self.config.group {
            let handle = self
                .fields
                .handle_by_id(group)
                .with_context(|| format!("failed to look up handle of field {group}"))?;
            if let Some(handle) = handle
                && !names.contains(&handle)
            {
                names.push(handle);
            }
        }
        Ok(names)
    }

    fn fetch_request(
        &self,
        compiled: CompiledFilters,
        page: i64,
        per_page: Option<i64>,
        sort: SortSpec,
        records_only: bool,
    ) -> DatasourceResult<FetchRequest> {
        Ok(FetchRequest {
            page,
            section_id: self.config.source,
            per_page,
            condition: compiled.condition,
            joins: compiled.joins,
            group: compiled.group,
            records_only,
            hydrate: true,
            element_names: self.projection()?,
            sort,
        })
    }

    fn group_records(
        &self,
        group: FieldId,
        entries: &EntryPage,
        field_pool: &mut FieldPool,
    ) -> DatasourceResult<Vec<Group>> {
        let field = field_pool.resolve(group, self.fields.as_ref())?.ok_or_else(|| {
            DatasourceError::configuration(
                self.name(),
                format!("the field used for grouping `{group}` cannot be found"),
            )
        })?;
        field.group_records(&entries.records).ok_or_else(|| {
            DatasourceError::configuration(
                self.name(),
                format!(
                    "the field used for grouping `{}` does not support grouping",
                    field.element_name
                ),
            )
        })
    }
}

/// Parameter names may be configured with or without a leading `$`.
fn param_name(raw: &str) -> &str {
    raw.trim().trim_start_matches('$')
}

/// Compound empty condition: nothing was counted or pagination was
/// requested, and no records came back; or page `0` was requested.
fn is_empty_result(entries: &EntryPage, include_pagination: bool, start_page: Option<i64>) -> bool {
    ((entries.total_entries.unwrap_or(0) <= 0 || include_pagination) && entries.records.is_empty())
        || start_page == Some(0)
}

impl std::fmt::Debug for SectionDatasource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SectionDatasource")
            .field("config", &self.config)
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(total: Option<i64>, records: usize) -> EntryPage {
        let records = (0..records)
            .map(|i| crate::model::Entry {
                id: i as i64 + 1,
                section_id: 1,
                author_id: 1,
                creation_date: chrono::Utc::now(),
                modification_date: chrono::Utc::now(),
                data: Default::default(),
            })
            .collect();
        EntryPage {
            records,
            total_entries: total,
            total_pages: 1,
        }
    }

    #[test]
    fn empty_when_nothing_came_back() {
        assert!(is_empty_result(&page(Some(0), 0), false, None));
        assert!(is_empty_result(&page(None, 0), false, None));
        assert!(is_empty_result(&page(Some(5), 0), true, Some(3)));
    }

    #[test]
    fn uncounted_records_are_not_empty() {
        assert!(!is_empty_result(&page(None, 2), false, None));
        assert!(!is_empty_result(&page(Some(2), 2), true, Some(1)));
    }

    #[test]
    fn page_zero_is_always_empty() {
        assert!(is_empty_result(&page(Some(10), 10), false, Some(0)));
        assert!(is_empty_result(&page(Some(10), 10), true, Some(0)));
    }

    #[test]
    fn parameter_names_drop_the_dollar() {
        assert_eq!(param_name("$url-id"), "url-id");
        assert_eq!(param_name("url-id"), "url-id");
    }
}
