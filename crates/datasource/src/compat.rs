//! Legacy names and their modern equivalents.
//!
//! Every alias is resolved here so the compiler, orchestrator and parameter
//! extractor only ever see canonical names.

use crate::deprecation::{DeprecationLog, Usage};
use crate::filter::FilterKey;
use crate::repository::SortTarget;

/// Deprecated creation date pseudo-field.
pub const SYSTEM_DATE: &str = "system:date";

/// Canonicalize a filter key: `system:date` becomes creation date and the
/// bare `id` key becomes `system:id`.
pub fn filter_key(key: &FilterKey, log: &mut DeprecationLog) -> FilterKey {
    match key {
        FilterKey::LegacyDate => {
            log.notice(
                Usage::Filter,
                SYSTEM_DATE,
                "system:creation-date` or `system:modification-date",
            );
            FilterKey::CreationDate
        }
        FilterKey::Id => {
            log.notice(Usage::Filter, "id", "system:id");
            FilterKey::SystemId
        }
        other => other.clone(),
    }
}

/// Resolve a pseudo-field sort name, `None` for field handles.
pub fn sort_target(sort: &str, log: &mut DeprecationLog) -> Option<SortTarget> {
    match sort {
        "system:id" => Some(SortTarget::SystemId),
        "system:creation-date" => Some(SortTarget::CreationDate),
        SYSTEM_DATE => {
            log.notice(Usage::Sort, SYSTEM_DATE, "system:creation-date");
            Some(SortTarget::CreationDate)
        }
        "system:modification-date" => Some(SortTarget::ModificationDate),
        _ => None,
    }
}

/// Canonicalize a system output parameter; `system:date` becomes creation date.
pub fn output_parameter<'a>(param: &'a str, log: &mut DeprecationLog) -> &'a str {
    if param == SYSTEM_DATE {
        log.notice(Usage::OutputParameter, SYSTEM_DATE, "system:creation-date");
        "system:creation-date"
    } else {
        param
    }
}

/// The bare `ds-<root>` key, populated alongside the qualified keys only
/// when exactly one parameter is output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyParamKey {
    pub key: String,
    replacement: String,
}

impl LegacyParamKey {
    pub fn new(root_element: &str, param_output: &[String]) -> Option<Self> {
        let [param] = param_output else {
            return None;
        };
        let key = format!("ds-{root_element}");
        let replacement = format!("{key}.{}", param.replace(':', "-"));
        Some(Self { key, replacement })
    }

    /// Record that a value is being written under the bare key.
    pub fn note(&self, log: &mut DeprecationLog) {
        log.notice(Usage::OutputParameter, &self.key, &self.replacement);
    }
}

/// Whether the deprecated `system:date` element was requested.
pub fn wants_date_element(included: &[String], log: &mut DeprecationLog) -> bool {
    let wanted = included.iter().any(|e| e == SYSTEM_DATE);
    if wanted {
        log.notice(
            Usage::Element,
            SYSTEM_DATE,
            "system:creation-date` or `system:modification-date",
        );
    }
    wanted
}
