//! Text field: `value` with a URL-safe `handle`, optional `value_formatted`.

use sea_query::{Condition, Expr, SimpleExpr};

use super::{push_grouped, scalar, Field, FieldPredicate, InvalidFilter};
use crate::filter::FilterMode;
use crate::model::{Entry, Group};
use crate::output::{html_escape, Node};
use crate::query_builder::{column, JoinSpec};

enum TextMatch<'a> {
    Regexp(&'a str),
    NotRegexp(&'a str),
    Equals(&'a str),
}

fn parse(value: &str) -> TextMatch<'_> {
    if let Some(pattern) = value.strip_prefix("not-regexp:") {
        TextMatch::NotRegexp(pattern.trim())
    } else if let Some(pattern) = value.strip_prefix("regexp:") {
        TextMatch::Regexp(pattern.trim())
    } else {
        TextMatch::Equals(value)
    }
}

fn condition_for(field: &Field, alias: &str, value: &str) -> Result<SimpleExpr, InvalidFilter> {
    match parse(value) {
        TextMatch::Regexp(pattern) | TextMatch::NotRegexp(pattern) if pattern.is_empty() => {
            Err(field.invalid(value))
        }
        TextMatch::Regexp(pattern) => Ok(Expr::cust_with_values(
            format!("\"{alias}\".\"value\" ~* $1"),
            [pattern.to_string()],
        )),
        TextMatch::NotRegexp(pattern) => Ok(Expr::cust_with_values(
            format!("\"{alias}\".\"value\" !~* $1"),
            [pattern.to_string()],
        )),
        TextMatch::Equals(v) => Ok(Condition::any()
            .add(column(alias, "value").eq(v))
            .add(column(alias, "handle").eq(v))
            .into()),
    }
}

pub(super) fn build_predicate(
    field: &Field,
    values: &[String],
    mode: FilterMode,
) -> Result<FieldPredicate, InvalidFilter> {
    match mode {
        FilterMode::And => {
            let mut joins = Vec::with_capacity(values.len());
            let mut condition = Condition::all();
            for (n, value) in values.iter().enumerate() {
                let alias = field.nth_alias(n);
                condition = condition.add(condition_for(field, &alias, value)?);
                joins.push(JoinSpec::field_data(field.id, &alias));
            }
            Ok(FieldPredicate { joins, condition })
        }
        FilterMode::Or => {
            let alias = field.alias();
            let mut plain = Vec::new();
            let mut condition = Condition::any();
            for value in values {
                match parse(value) {
                    TextMatch::Equals(v) => plain.push(v.to_string()),
                    _ => condition = condition.add(condition_for(field, &alias, value)?),
                }
            }
            if !plain.is_empty() {
                condition = condition
                    .add(column(&alias, "value").is_in(plain.clone()))
                    .add(column(&alias, "handle").is_in(plain));
            }
            Ok(FieldPredicate {
                joins: vec![JoinSpec::field_data(field.id, &alias)],
                condition,
            })
        }
    }
}

pub(super) fn format(
    field: &Field,
    data: &serde_json::Value,
    encode: bool,
    mode: Option<&str>,
) -> Option<Node> {
    let value = scalar(data.get("value"))?;
    let handle = scalar(data.get("handle")).unwrap_or_default();

    let text = match (mode, scalar(data.get("value_formatted"))) {
        (Some("formatted"), Some(formatted)) if encode => html_escape(&formatted),
        (Some("formatted"), Some(formatted)) => ammonia::clean(&formatted),
        _ if encode => html_escape(&value),
        _ => value,
    };

    let mut node = Node::new(&field.element_name).with_value(text);
    node.set_attribute("handle", &handle);
    if let Some(mode) = mode {
        node.set_attribute("mode", mode);
    }
    Some(node)
}

pub(super) fn group_records(field: &Field, records: &[Entry]) -> Vec<Group> {
    let mut groups: Vec<(String, Group)> = Vec::new();
    for entry in records {
        let data = entry.data.get(&field.id);
        let value = data.and_then(|d| scalar(d.get("value"))).unwrap_or_default();
        let handle = data.and_then(|d| scalar(d.get("handle"))).unwrap_or_default();
        push_grouped(
            &mut groups,
            &handle,
            || {
                Group::new(
                    &field.element_name,
                    vec![
                        ("handle".to_string(), handle.clone()),
                        ("value".to_string(), value.clone()),
                    ],
                )
            },
            entry,
        );
    }
    groups.into_iter().map(|(_, g)| g).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use sea_query::{PostgresQueryBuilder, Query};

    fn title() -> Field {
        Field {
            id: 5,
            section_id: 1,
            element_name: "title".to_string(),
            label: "Title".to_string(),
            kind: FieldKind::Text,
        }
    }

    fn render(predicate: &FieldPredicate) -> String {
        Query::select()
            .expr(Expr::cust("1"))
            .cond_where(predicate.condition.clone())
            .to_string(PostgresQueryBuilder)
    }

    #[test]
    fn or_mode_uses_one_join_and_in_lists() {
        let values = vec!["alpha".to_string(), "beta".to_string()];
        let predicate = build_predicate(&title(), &values, FilterMode::Or).unwrap();

        assert_eq!(predicate.joins.len(), 1);
        let sql = render(&predicate);
        assert!(sql.contains("\"t5\".\"value\" IN ('alpha', 'beta')"));
        assert!(sql.contains("\"t5\".\"handle\" IN ('alpha', 'beta')"));
    }

    #[test]
    fn and_mode_joins_once_per_value() {
        let values = vec!["alpha".to_string(), "beta".to_string()];
        let predicate = build_predicate(&title(), &values, FilterMode::And).unwrap();

        assert_eq!(predicate.joins.len(), 2);
        assert_eq!(predicate.joins[1].alias, "t5_1");
    }

    #[test]
    fn empty_regexp_is_invalid() {
        let values = vec!["regexp:".to_string()];
        assert!(build_predicate(&title(), &values, FilterMode::Or).is_err());
    }

    #[test]
    fn format_escapes_when_encoding() {
        let data = serde_json::json!({"value": "<b>Hi</b>", "handle": "hi"});
        let node = format(&title(), &data, true, None).unwrap();
        assert_eq!(node.value.as_deref(), Some("&lt;b&gt;Hi&lt;/b&gt;"));
        assert_eq!(node.attribute("handle"), Some("hi"));
    }
}
