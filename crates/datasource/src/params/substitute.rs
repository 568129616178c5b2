//! `{$name}` references in configuration values.
//!
//! A reference may list fallbacks separated by `:`, each either another
//! `$parameter` or a literal: `{$ds-articles.system-id:$url-id:0}`. The
//! first parameter with a non-blank value wins; a literal always wins.
//! Multi-valued parameters are joined with `, `. A reference with nothing to
//! resolve to becomes empty.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use super::ParamPool;
use crate::filter::{FilterSpec, FilterValue};

#[allow(clippy::expect_used)]
static REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\$[^{}]*)\}").expect("valid regex literal"));

fn lookup(name: &str, pool: &ParamPool) -> Option<String> {
    let values: Vec<&str> = pool
        .get(name)?
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join(", "))
    }
}

fn resolve_reference(reference: &str, pool: &ParamPool) -> String {
    for candidate in reference.split(':') {
        let candidate = candidate.trim();
        match candidate.strip_prefix('$') {
            Some(name) => {
                if let Some(value) = lookup(name, pool) {
                    return value;
                }
            }
            None if !candidate.is_empty() => return candidate.to_string(),
            None => {}
        }
    }
    tracing::trace!(reference, "parameter reference resolved to nothing");
    String::new()
}

/// Replace every `{$...}` reference in `template`.
pub fn resolve(template: &str, pool: &ParamPool) -> String {
    if !template.contains('{') {
        return template.to_string();
    }
    REFERENCE
        .replace_all(template, |caps: &Captures<'_>| resolve_reference(&caps[1], pool))
        .into_owned()
}

/// Resolve references in every filter value. Alternatives that resolve to
/// blank are dropped; filters that become blank are skipped at compile time.
pub fn resolve_filters(filters: &FilterSpec, pool: &ParamPool) -> FilterSpec {
    filters
        .iter()
        .map(|(key, value)| {
            let value = match value {
                FilterValue::Single(s) => FilterValue::Single(resolve(s, pool)),
                FilterValue::Any(values) => FilterValue::Any(
                    values
                        .iter()
                        .map(|v| resolve(v, pool))
                        .filter(|v| !v.trim().is_empty())
                        .collect(),
                ),
            };
            (key.clone(), value)
        })
        .collect()
}
