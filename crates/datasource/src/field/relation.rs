//! Relation field: links to entries of another section by id.

use sea_query::Condition;

use super::{strings, Field, FieldPredicate, InvalidFilter};
use crate::filter::FilterMode;
use crate::output::Node;
use crate::query_builder::{column, JoinSpec};

fn ids(field: &Field, value: &str) -> Result<Vec<u64>, InvalidFilter> {
    value
        .split(',')
        .map(|token| {
            token
                .trim()
                .parse::<u64>()
                .map_err(|_| field.invalid(value))
        })
        .collect()
}

pub(super) fn build_predicate(
    field: &Field,
    values: &[String],
    mode: FilterMode,
) -> Result<FieldPredicate, InvalidFilter> {
    let (negate, values) = match values.split_first() {
        Some((first, rest)) if first.starts_with("not:") => {
            let mut stripped = vec![first.trim_start_matches("not:").trim().to_string()];
            stripped.extend(rest.iter().cloned());
            (true, stripped)
        }
        _ => (false, values.to_vec()),
    };

    if negate || matches!(mode, FilterMode::Or) {
        let alias = field.alias();
        let mut all = Vec::new();
        for value in &values {
            all.extend(ids(field, value)?);
        }
        let condition = if negate {
            Condition::all().add(
                Condition::any()
                    .add(column(&alias, "relation_id").is_not_in(all))
                    .add(column(&alias, "relation_id").is_null()),
            )
        } else {
            Condition::all().add(column(&alias, "relation_id").is_in(all))
        };
        return Ok(FieldPredicate {
            joins: vec![JoinSpec::field_data(field.id, &alias)],
            condition,
        });
    }

    let mut joins = Vec::with_capacity(values.len());
    let mut condition = Condition::all();
    for (n, value) in values.iter().enumerate() {
        let alias = field.nth_alias(n);
        condition = condition.add(column(&alias, "relation_id").is_in(ids(field, value)?));
        joins.push(JoinSpec::field_data(field.id, &alias));
    }
    Ok(FieldPredicate { joins, condition })
}

pub(super) fn format(field: &Field, data: &serde_json::Value) -> Option<Node> {
    let ids = strings(data.get("relation_id"));
    if ids.is_empty() {
        return None;
    }
    let mut node = Node::new(&field.element_name);
    for id in ids {
        node.append_child(Node::new("item").with_attribute("id", id));
    }
    Some(node)
}
