//! Filter expression syntax.
//!
//! ` + ` (or `+++`, as `+` arrives URL-decoded to a space) separates values
//! that must all match; otherwise `,` separates alternatives. `\,` is a
//! literal comma.

use std::sync::LazyLock;

use regex::Regex;

use super::FilterMode;

#[allow(clippy::expect_used)]
static AND_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s+\+\s+)|(\+\+\+)").expect("valid regex literal"));

#[allow(clippy::expect_used)]
static AND_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\+\s*").expect("valid regex literal"));

/// Decide whether an expression is an AND-set or an OR-set.
pub fn determine_mode(value: &str) -> FilterMode {
    if AND_SEPARATOR.is_match(value) {
        FilterMode::And
    } else {
        FilterMode::Or
    }
}

/// Split an expression into trimmed, non-empty values.
pub fn split_filter(mode: FilterMode, value: &str) -> Vec<String> {
    let parts: Vec<String> = match mode {
        FilterMode::And => AND_SPLIT.split(value).map(str::to_string).collect(),
        FilterMode::Or => split_unescaped_commas(value),
    };
    parts
        .into_iter()
        .map(|p| p.trim().replace("\\,", ","))
        .filter(|p| !p.is_empty())
        .collect()
}

fn split_unescaped_commas(value: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in value.chars() {
        if c == ',' && !escaped {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
        escaped = c == '\\';
    }
    parts.push(current);
    parts
}
