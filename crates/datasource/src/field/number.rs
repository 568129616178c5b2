//! Number field.

use sea_query::{Condition, SimpleExpr};

use super::{scalar, Field, FieldPredicate, InvalidFilter};
use crate::filter::FilterMode;
use crate::output::Node;
use crate::query_builder::{column, JoinSpec};

fn number(field: &Field, raw: &str, original: &str) -> Result<f64, InvalidFilter> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
        .ok_or_else(|| field.invalid(original))
}

fn condition_for(field: &Field, alias: &str, value: &str) -> Result<SimpleExpr, InvalidFilter> {
    let col = || column(alias, "value");
    let value = value.trim();

    if let Some((low, high)) = value.split_once(" to ") {
        let low = number(field, low, value)?;
        let high = number(field, high, value)?;
        return Ok(col().between(low.min(high), low.max(high)));
    }
    if let Some(rest) = value.strip_prefix("<=") {
        return Ok(col().lte(number(field, rest, value)?));
    }
    if let Some(rest) = value.strip_prefix(">=") {
        return Ok(col().gte(number(field, rest, value)?));
    }
    if let Some(rest) = value.strip_prefix('<') {
        return Ok(col().lt(number(field, rest, value)?));
    }
    if let Some(rest) = value.strip_prefix('>') {
        return Ok(col().gt(number(field, rest, value)?));
    }
    Ok(col().eq(number(field, value, value)?))
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
        condition = condition.add(condition_for(field, &alias, value)?);
    }
    Ok(FieldPredicate {
        joins: vec![JoinSpec::field_data(field.id, &alias)],
        condition,
    })
}

pub(super) fn format(field: &Field, data: &serde_json::Value) -> Option<Node> {
    let value = scalar(data.get("value"))?;
    Some(Node::new(&field.element_name).with_value(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use sea_query::{Expr, PostgresQueryBuilder, Query};

    fn price() -> Field {
        Field {
            id: 9,
            section_id: 1,
            element_name: "price".to_string(),
            label: "Price".to_string(),
            kind: FieldKind::Number,
        }
    }

    #[test]
    fn ranges_and_comparisons() {
        let values = vec!["10 to 20".to_string(), ">=100".to_string()];
        let predicate = build_predicate(&price(), &values, FilterMode::Or).unwrap();
        let sql = Query::select()
            .expr(Expr::cust("1"))
            .cond_where(predicate.condition)
            .to_string(PostgresQueryBuilder);

        assert!(sql.contains("BETWEEN 10 AND 20"));
        assert!(sql.contains("\"t9\".\"value\" >= 100"));
        assert!(sql.contains(" OR "));
    }

    #[test]
    fn non_numeric_value_is_invalid() {
        let values = vec!["cheap".to_string()];
        let err = build_predicate(&price(), &values, FilterMode::Or).unwrap_err();
        assert_eq!(err.value, "cheap");
    }
}
