//! Date field and the shared date predicate builder.
//!
//! The predicate builder is also used for the `system:creation-date` and
//! `system:modification-date` pseudo-fields, targeting the entry's own
//! timestamp columns instead of a field data table.
//!
//! Filter syntax per value:
//! - `2024`, `2024-03`, `2024-03-15`, `2024-03-15 10:30(:00)`: within that period
//! - `earlier than X` / `<X`, `later than X` / `>X`
//! - `equal to or earlier than X` / `<=X`, `equal to or later than X` / `>=X`
//! - `X to Y`: from the start of X through the end of Y

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use sea_query::{Condition, SimpleExpr};

use super::{Field, FieldPredicate, InvalidFilter, ParamValue};
use crate::filter::FilterMode;
use crate::model::{Entry, Group};
use crate::output::Node;
use crate::query_builder::{column, JoinSpec};

const SQL_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Inclusive bounds of a (possibly partial) date expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Bounds {
    start: NaiveDateTime,
    end: NaiveDateTime,
}

fn day_bounds(date: NaiveDate) -> Option<Bounds> {
    Some(Bounds {
        start: date.and_hms_opt(0, 0, 0)?,
        end: date.and_hms_opt(23, 59, 59)?,
    })
}

fn parse_bounds(raw: &str) -> Option<Bounds> {
    let raw = raw.trim();
    match raw {
        "now" => {
            let now = Utc::now().naive_utc();
            return Some(Bounds { start: now, end: now });
        }
        "today" => return day_bounds(Utc::now().date_naive()),
        _ => {}
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        let dt = dt.naive_utc();
        return Some(Bounds { start: dt, end: dt });
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(Bounds { start: dt, end: dt });
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M") {
        return Some(Bounds {
            start: dt,
            end: dt + Duration::seconds(59),
        });
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return day_bounds(date);
    }

    let parts: Vec<&str> = raw.split('-').collect();
    if !parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    match parts.as_slice() {
        [year] if year.len() == 4 => {
            let year: i32 = year.parse().ok()?;
            Some(Bounds {
                start: NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0)?,
                end: NaiveDate::from_ymd_opt(year, 12, 31)?.and_hms_opt(23, 59, 59)?,
            })
        }
        [year, month] if year.len() == 4 => {
            let year: i32 = year.parse().ok()?;
            let month: u32 = month.parse().ok()?;
            let first = NaiveDate::from_ymd_opt(year, month, 1)?;
            let next = if month == 12 {
                NaiveDate::from_ymd_opt(year + 1, 1, 1)?
            } else {
                NaiveDate::from_ymd_opt(year, month + 1, 1)?
            };
            Some(Bounds {
                start: first.and_hms_opt(0, 0, 0)?,
                end: next.pred_opt()?.and_hms_opt(23, 59, 59)?,
            })
        }
        _ => None,
    }
}

fn sql(dt: NaiveDateTime) -> String {
    dt.format(SQL_FORMAT).to_string()
}

fn condition_for(table: &str, name: &str, value: &str) -> Option<SimpleExpr> {
    let col = || column(table, name);
    let value = value.trim();

    let prefixed = [
        ("equal to or earlier than ", "<="),
        ("equal to or later than ", ">="),
        ("earlier than ", "<"),
        ("later than ", ">"),
        ("<=", "<="),
        (">=", ">="),
        ("<", "<"),
        (">", ">"),
    ];
    for (prefix, op) in prefixed {
        if let Some(rest) = value.strip_prefix(prefix) {
            let bounds = parse_bounds(rest)?;
            return Some(match op {
                "<=" => col().lte(sql(bounds.end)),
                ">=" => col().gte(sql(bounds.start)),
                "<" => col().lt(sql(bounds.start)),
                _ => col().gt(sql(bounds.end)),
            });
        }
    }

    if let Some((from, to)) = value.split_once(" to ") {
        let from = parse_bounds(from)?;
        let to = parse_bounds(to)?;
        return Some(col().between(sql(from.start), sql(to.end)));
    }

    let bounds = parse_bounds(value)?;
    Some(col().between(sql(bounds.start), sql(bounds.end)))
}

/// Build a date condition over `table.name` for the given filter values.
///
/// Returns the first value that could not be parsed as the error.
pub fn build_date_condition(
    values: &[String],
    mode: FilterMode,
    table: &str,
    name: &str,
) -> Result<Condition, String> {
    let mut condition = match mode {
        FilterMode::And => Condition::all(),
        FilterMode::Or => Condition::any(),
    };
    for value in values {
        let expr = condition_for(table, name, value).ok_or_else(|| value.clone())?;
        condition = condition.add(expr);
    }
    Ok(condition)
}

pub(super) fn build_field_predicate(
    field: &Field,
    values: &[String],
    mode: FilterMode,
) -> Result<FieldPredicate, InvalidFilter> {
    let alias = field.alias();
    let condition =
        build_date_condition(values, mode, &alias, "date").map_err(|v| field.invalid(&v))?;
    Ok(FieldPredicate {
        joins: vec![JoinSpec::field_data(field.id, &alias)],
        condition,
    })
}

/// Parse a stored date: RFC 3339, `Y-m-d H:i:s`, or a Unix timestamp.
pub fn parse_stored(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    match value {
        serde_json::Value::Number(n) => Utc.timestamp_opt(n.as_i64()?, 0).single(),
        serde_json::Value::String(s) => DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDateTime::parse_from_str(s, SQL_FORMAT)
                    .ok()
                    .map(|dt| dt.and_utc())
            }),
        _ => None,
    }
}

fn stored_date(data: &serde_json::Value) -> Option<DateTime<Utc>> {
    parse_stored(data.get("date")?)
}

/// Render a date as a node named `name`.
pub fn date_element(name: &str, date: &DateTime<Utc>) -> Node {
    Node::new(name)
        .with_value(date.format("%Y-%m-%d").to_string())
        .with_attribute("iso", date.to_rfc3339())
        .with_attribute("timestamp", date.timestamp())
        .with_attribute("time", date.format("%H:%M"))
        .with_attribute("weekday", date.format("%u"))
        .with_attribute("offset", "+0000")
}

pub(super) fn format(field: &Field, data: &serde_json::Value) -> Option<Node> {
    let date = stored_date(data)?;
    let mut node = Node::new(&field.element_name);
    node.append_child(date_element("date", &date));
    Some(node)
}

pub(super) fn parameter_value(data: &serde_json::Value) -> ParamValue {
    stored_date(data).map_or(ParamValue::None, |d| {
        ParamValue::Single(d.format(SQL_FORMAT).to_string())
    })
}

fn child<'a>(groups: &'a mut Vec<Group>, element: &str, value: String) -> &'a mut Group {
    let position = groups.iter().position(|g| {
        g.attributes
            .iter()
            .any(|(k, v)| k == "value" && *v == value)
    });
    let index = match position {
        Some(index) => index,
        None => {
            groups.push(Group::new(element, vec![("value".to_string(), value)]));
            groups.len() - 1
        }
    };
    &mut groups[index]
}

/// Nest records by year, then month, then day, in order of first appearance.
///
/// Entries without a stored date are left out.
pub(super) fn group_records(field: &Field, records: &[Entry]) -> Vec<Group> {
    let mut years: Vec<Group> = Vec::new();
    for entry in records {
        let Some(date) = entry.data.get(&field.id).and_then(stored_date) else {
            tracing::debug!(entry_id = entry.id, field = %field.element_name, "no date to group by");
            continue;
        };
        let year = child(&mut years, "year", date.year().to_string());
        let month = child(&mut year.groups, "month", format!("{:02}", date.month()));
        let day = child(&mut month.groups, "day", format!("{:02}", date.day()));
        day.records.push(entry.clone());
    }
    years
}
