//! Select field: one or more options, each with a `value` and `handle`.

use sea_query::Condition;

use super::{push_grouped, strings, Field, FieldPredicate, InvalidFilter};
use crate::filter::FilterMode;
use crate::model::{Entry, Group};
use crate::output::{html_escape, Node};
use crate::query_builder::{column, JoinSpec};

pub(super) fn build_predicate(
    field: &Field,
    values: &[String],
    mode: FilterMode,
) -> Result<FieldPredicate, InvalidFilter> {
    if values.iter().any(|v| v.trim().is_empty()) {
        return Err(field.invalid(""));
    }

    match mode {
        FilterMode::And => {
            let mut joins = Vec::with_capacity(values.len());
            let mut condition = Condition::all();
            for (n, value) in values.iter().enumerate() {
                let alias = field.nth_alias(n);
                condition = condition.add(
                    Condition::any()
                        .add(column(&alias, "value").eq(value.as_str()))
                        .add(column(&alias, "handle").eq(value.as_str())),
                );
                joins.push(JoinSpec::field_data(field.id, &alias));
            }
            Ok(FieldPredicate { joins, condition })
        }
        FilterMode::Or => {
            let alias = field.alias();
            let condition = Condition::any()
                .add(column(&alias, "value").is_in(values.to_vec()))
                .add(column(&alias, "handle").is_in(values.to_vec()));
            Ok(FieldPredicate {
                joins: vec![JoinSpec::field_data(field.id, &alias)],
                condition,
            })
        }
    }
}

fn options(data: &serde_json::Value) -> Vec<(String, String)> {
    let values = strings(data.get("value"));
    let handles = strings(data.get("handle"));
    values
        .into_iter()
        .enumerate()
        .map(|(i, value)| {
            let handle = handles.get(i).cloned().unwrap_or_default();
            (value, handle)
        })
        .collect()
}

pub(super) fn format(field: &Field, data: &serde_json::Value, encode: bool) -> Option<Node> {
    let options = options(data);
    if options.is_empty() {
        return None;
    }
    let mut node = Node::new(&field.element_name);
    for (value, handle) in options {
        let value = if encode { html_escape(&value) } else { value };
        node.append_child(
            Node::new("item")
                .with_value(value)
                .with_attribute("handle", handle),
        );
    }
    Some(node)
}

/// Group by option. An entry with several options appears in each of their groups.
pub(super) fn group_records(field: &Field, records: &[Entry]) -> Vec<Group> {
    let mut groups: Vec<(String, Group)> = Vec::new();
    for entry in records {
        let mut options = entry.data.get(&field.id).map(options).unwrap_or_default();
        if options.is_empty() {
            options.push((String::new(), String::new()));
        }
        for (value, handle) in options {
            push_grouped(
                &mut groups,
                &handle,
                || {
                    Group::new(
                        &field.element_name,
                        vec![
                            ("value".to_string(), value.clone()),
                            ("handle".to_string(), handle.clone()),
                        ],
                    )
                },
                entry,
            );
        }
    }
    groups.into_iter().map(|(_, g)| g).collect()
}
