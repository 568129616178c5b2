//! Compiles a filter specification into a predicate, joins and a grouping flag.

use sea_query::Condition;

use super::{FilterKey, FilterMode, FilterSpec};
use crate::compat;
use crate::deprecation::DeprecationLog;
use crate::error::{DatasourceError, DatasourceResult};
use crate::field::date::build_date_condition;
use crate::field::FieldPool;
use crate::query_builder::{
    entry_column, JoinSpec, CREATION_DATE_COLUMN, ENTRY_ALIAS, MODIFICATION_DATE_COLUMN,
};
use crate::repository::FieldRegistry;

/// Result of compiling a filter specification.
#[derive(Debug, Clone)]
pub struct CompiledFilters {
    /// Conjunction of every filter's predicate.
    pub condition: Condition,
    pub joins: Vec<JoinSpec>,
    /// One-to-many joins were added; the fetch must collapse duplicates.
    pub group: bool,
    /// A filter value was invalid for its field; the retrieval must come back empty.
    pub force_empty: bool,
}

impl Default for CompiledFilters {
    fn default() -> Self {
        Self {
            condition: Condition::all(),
            joins: Vec::new(),
            group: false,
            force_empty: false,
        }
    }
}

/// One `IN` or `NOT IN` group of the identifier pseudo-field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IdGroup {
    pub exclude: bool,
    pub ids: Vec<u64>,
}

/// Coerce an id token to its leading integer: `1.5` is 1 and `+5` is 5.
/// Negative and non-numeric tokens become 0.
fn coerce_id(token: &str) -> u64 {
    let token = token.trim_start();
    let unsigned = token.strip_prefix('+').unwrap_or(token);
    let digits = unsigned.bytes().take_while(u8::is_ascii_digit).count();
    unsigned[..digits].parse().unwrap_or(0)
}

fn strip_not(token: &str) -> Option<&str> {
    let token = token.trim_start();
    match (token.get(..4), token.get(4..)) {
        (Some(prefix), Some(rest)) if prefix.eq_ignore_ascii_case("not:") => Some(rest.trim_start()),
        _ => None,
    }
}

/// Close a run of tokens into a group. A run whose ids are all 0 keeps a
/// single literal 0 so it matches nothing instead of everything.
fn close_run(exclude: bool, ids: Vec<u64>) -> IdGroup {
    let sum: u64 = ids.iter().fold(0, |acc, id| acc.saturating_add(*id));
    let mut ids: Vec<u64> = ids.into_iter().filter(|id| *id != 0).collect();
    if sum == 0 {
        ids.push(0);
    }
    IdGroup { exclude, ids }
}

/// Split identifier filter values into inclusion and exclusion groups.
///
/// In AND mode each value is its own comma-separated group; in OR mode the
/// values form one group. Within a group, a `not:` token starts an
/// exclusion run that lasts to the end of the group.
pub(crate) fn id_groups(values: &[String], mode: FilterMode) -> Vec<IdGroup> {
    let groups: Vec<Vec<String>> = match mode {
        FilterMode::And => values
            .iter()
            .map(|v| v.split(',').map(str::to_string).collect())
            .collect(),
        FilterMode::Or => vec![values.to_vec()],
    };

    let mut result = Vec::new();
    for tokens in groups {
        let mut exclude = false;
        let mut run: Vec<u64> = Vec::new();
        let mut started = false;
        for token in &tokens {
            match strip_not(token) {
                Some(rest) if !exclude => {
                    if started {
                        result.push(close_run(exclude, std::mem::take(&mut run)));
                    }
                    exclude = true;
                    run.push(coerce_id(rest));
                }
                Some(rest) => run.push(coerce_id(rest)),
                None => run.push(coerce_id(token)),
            }
            started = true;
        }
        if started {
            result.push(close_run(exclude, run));
        }
    }
    result
}

/// Compiles filter specifications against a field pool.
pub struct FilterCompiler<'a> {
    datasource: &'a str,
    registry: &'a dyn FieldRegistry,
}

impl<'a> FilterCompiler<'a> {
    /// Create a compiler for the datasource named `datasource`.
    pub fn new(datasource: &'a str, registry: &'a dyn FieldRegistry) -> Self {
        Self {
            datasource,
            registry,
        }
    }

    /// Compile every non-blank filter.
    ///
    /// Unknown fields are a configuration error. A value a field rejects
    /// stops compilation and sets `force_empty`.
    pub fn compile(
        &self,
        spec: &FilterSpec,
        pool: &mut FieldPool,
        log: &mut DeprecationLog,
    ) -> DatasourceResult<CompiledFilters> {
        let mut compiled = CompiledFilters::default();
        if spec.is_empty() {
            return Ok(compiled);
        }

        let field_ids: Vec<_> = spec
            .iter()
            .filter_map(|(key, _)| match key {
                FilterKey::Field(id) => Some(*id),
                _ => None,
            })
            .collect();
        pool.preload(&field_ids, self.registry)?;

        for (key, value) in spec.iter() {
            if value.is_blank() {
                continue;
            }
            let (mode, values) = value.parse();

            match compat::filter_key(key, log) {
                FilterKey::SystemId => {
                    for group in id_groups(&values, mode) {
                        let col = entry_column("id");
                        compiled.condition = compiled.condition.add(if group.exclude {
                            col.is_not_in(group.ids)
                        } else {
                            col.is_in(group.ids)
                        });
                    }
                }
                FilterKey::CreationDate => {
                    if !self.add_date(&mut compiled, &values, mode, CREATION_DATE_COLUMN) {
                        return Ok(compiled);
                    }
                }
                FilterKey::ModificationDate => {
                    if !self.add_date(&mut compiled, &values, mode, MODIFICATION_DATE_COLUMN) {
                        return Ok(compiled);
                    }
                }
                FilterKey::Field(id) => {
                    let Some(field) = pool.get(id) else {
                        return Err(self.missing_field(key));
                    };
                    match field.build_predicate(&values, mode) {
                        Ok(predicate) => {
                            compiled.joins.extend(predicate.joins);
                            compiled.condition = compiled.condition.add(predicate.condition);
                            compiled.group = compiled.group || field.requires_grouping();
                        }
                        Err(e) => {
                            tracing::debug!(
                                datasource = self.datasource,
                                error = %e,
                                "filter cannot match; forcing empty result"
                            );
                            compiled.force_empty = true;
                            return Ok(compiled);
                        }
                    }
                }
                _ => return Err(self.missing_field(key)),
            }
        }

        Ok(compiled)
    }

    fn add_date(
        &self,
        compiled: &mut CompiledFilters,
        values: &[String],
        mode: FilterMode,
        column: &str,
    ) -> bool {
        match build_date_condition(values, mode, ENTRY_ALIAS, column) {
            Ok(condition) => {
                compiled.condition =
                    std::mem::replace(&mut compiled.condition, Condition::all()).add(condition);
                true
            }
            Err(value) => {
                tracing::debug!(
                    datasource = self.datasource,
                    value = %value,
                    "invalid date filter; forcing empty result"
                );
                compiled.force_empty = true;
                false
            }
        }
    }

    fn missing_field(&self, key: &FilterKey) -> DatasourceError {
        DatasourceError::configuration(
            self.datasource,
            format!(
                "error creating field object with id {key}, for filtering in data source `{}`; check this field exists",
                self.datasource
            ),
        )
    }
}
