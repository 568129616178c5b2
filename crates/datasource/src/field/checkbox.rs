//! Checkbox field: stores `yes` or `no`.

use sea_query::Condition;

use super::{push_grouped, scalar, Field, FieldPredicate, InvalidFilter};
use crate::filter::FilterMode;
use crate::model::{Entry, Group};
use crate::output::Node;
use crate::query_builder::{column, JoinSpec};

fn normalize(value: &str) -> Option<&'static str> {
    match value.trim().to_ascii_lowercase().as_str() {
        "yes" | "on" | "true" => Some("yes"),
        "no" | "off" | "false" => Some("no"),
        _ => None,
    }
}

fn stored(data: Option<&serde_json::Value>) -> &'static str {
    data.and_then(|d| scalar(d.get("value")))
        .and_then(|v| normalize(&v))
        .unwrap_or("no")
}

pub(super) fn build_predicate(
    field: &Field,
    values: &[String],
    mode: FilterMode,
) -> Result<FieldPredicate, InvalidFilter> {
    let alias = field.alias();
    let mut condition = match mode {
        FilterMode::And => Condition::all(),
        FilterMode::Or => Condition::any(),
    };
    for value in values {
        let normalized = normalize(value).ok_or_else(|| field.invalid(value))?;
        condition = condition.add(column(&alias, "value").eq(normalized));
    }
    Ok(FieldPredicate {
        joins: vec![JoinSpec::field_data(field.id, &alias)],
        condition,
    })
}

pub(super) fn format(field: &Field, data: &serde_json::Value) -> Option<Node> {
    let label = if stored(Some(data)) == "yes" { "Yes" } else { "No" };
    Some(Node::new(&field.element_name).with_value(label))
}

pub(super) fn group_records(field: &Field, records: &[Entry]) -> Vec<Group> {
    let mut groups: Vec<(String, Group)> = Vec::new();
    for entry in records {
        let value = stored(entry.data.get(&field.id));
        push_grouped(
            &mut groups,
            value,
            || Group::new(&field.element_name, vec![("value".to_string(), value.to_string())]),
            entry,
        );
    }
    groups.into_iter().map(|(_, g)| g).collect()
}
