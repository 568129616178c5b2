#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Filter compilation as seen by the repository.

mod common;

use common::*;
use section_datasource::{DeprecationLog, FilterKey, FilterSpec, FilterValue, ParamPool};

fn sql_for(filters: FilterSpec, pool: &mut ParamPool) -> String {
    let mut config = config();
    config.filters = filters;
    let f = fixture(config, repository());
    f.datasource.execute(pool).unwrap();
    f.entries.last_sql().unwrap()
}

#[test]
fn test_id_inclusion_then_exclusion() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::SystemId, "1,2,not:3"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("\"e\".\"id\" IN (1, 2) AND \"e\".\"id\" NOT IN (3)"));
}

#[test]
fn test_non_numeric_ids_match_nothing() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::SystemId, "abc"),
        &mut ParamPool::new(),
    );
    assert!(sql.contains("\"e\".\"id\" IN (0)"));

    let sql = sql_for(
        FilterSpec::new().with(FilterKey::SystemId, "0, zero, -1"),
        &mut ParamPool::new(),
    );
    assert!(sql.contains("\"e\".\"id\" IN (0)"));
}

#[test]
fn test_not_prefix_excludes() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::SystemId, "not: 4, 5"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("\"e\".\"id\" NOT IN (4, 5)"));
    assert!(!sql.contains("\"e\".\"id\" IN"));
}

#[test]
fn test_bare_id_key_is_deprecated() {
    let mut config = config();
    config.filters = FilterSpec::new().with("id", "7");
    let f = fixture(config, repository());
    let mut log = DeprecationLog::new();

    f.datasource
        .execute_with_log(&mut ParamPool::new(), &mut log)
        .unwrap();

    assert!(f.entries.last_sql().unwrap().contains("\"e\".\"id\" IN (7)"));
    assert_eq!(log.notices()[0].deprecated, "id");
}

#[test]
fn test_filters_chain_through_parameters() {
    let mut pool: ParamPool = [(
        "ds-featured.system-id",
        vec!["4".to_string(), "9".to_string()],
    )]
    .into_iter()
    .collect();

    let sql = sql_for(
        FilterSpec::new().with(FilterKey::SystemId, "{$ds-featured.system-id}"),
        &mut pool,
    );

    assert!(sql.contains("\"e\".\"id\" IN (4, 9)"));
}

#[test]
fn test_blank_filters_are_skipped() {
    let sql = sql_for(
        FilterSpec::new()
            .with(FilterKey::SystemId, "{$missing}")
            .with(FilterKey::Field(TITLE), "  "),
        &mut ParamPool::new(),
    );

    assert!(!sql.contains("\"e\".\"id\" IN"));
    assert!(!sql.contains("\"e\".\"id\" NOT IN"));
    assert!(!sql.contains("entries_data_10"));
}

#[test]
fn test_text_filter_or_mode() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::Field(TITLE), "First Post, second-post"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("LEFT JOIN \"entries_data_10\" AS \"t10\""));
    assert!(sql.contains("\"t10\".\"value\" IN ('First Post', 'second-post')"));
    assert!(sql.contains("\"t10\".\"handle\" IN ('First Post', 'second-post')"));
    assert!(!sql.contains("GROUP BY"));
}

#[test]
fn test_alternatives_are_or() {
    let sql = sql_for(
        FilterSpec::new().with(
            FilterKey::Field(CATEGORY),
            FilterValue::Any(vec!["news".to_string(), "sport".to_string()]),
        ),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("\"t11\".\"handle\" IN ('news', 'sport')"));
}

#[test]
fn test_multi_valued_filters_group_results() {
    let mut config = config();
    config.filters = FilterSpec::new().with(FilterKey::Field(TAGS), "rust + web");
    let f = fixture(config, repository());

    f.datasource.execute(&mut ParamPool::new()).unwrap();

    let request = &f.entries.requests()[0];
    assert!(request.group);
    assert_eq!(request.joins.len(), 2);
    assert!(f.entries.last_sql().unwrap().contains("GROUP BY \"e\".\"id\""));
}

#[test]
fn test_creation_date_filter_targets_entry_column() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::CreationDate, "2024-01"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains(
        "\"e\".\"creation_date_gmt\" BETWEEN '2024-01-01 00:00:00' AND '2024-01-31 23:59:59'"
    ));
}

#[test]
fn test_modification_date_filter() {
    let sql = sql_for(
        FilterSpec::new().with(FilterKey::ModificationDate, "later than 2024-02-05"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("\"e\".\"modification_date_gmt\" > '2024-02-05 23:59:59'"));
}

#[test]
fn test_legacy_date_filter_is_creation_date() {
    let mut config = config();
    config.filters = FilterSpec::new().with("system:date", "2024");
    let f = fixture(config, repository());
    let mut log = DeprecationLog::new();

    f.datasource
        .execute_with_log(&mut ParamPool::new(), &mut log)
        .unwrap();

    assert!(f.entries.last_sql().unwrap().contains("\"e\".\"creation_date_gmt\" BETWEEN"));
    assert_eq!(log.notices().len(), 1);
}

#[test]
fn test_filters_combine_with_and() {
    let sql = sql_for(
        FilterSpec::new()
            .with(FilterKey::SystemId, "1, 2")
            .with(FilterKey::Field(VIEWS), "> 100"),
        &mut ParamPool::new(),
    );

    assert!(sql.contains("\"e\".\"id\" IN (1, 2)"));
    assert!(sql.contains("\"t16\".\"value\" > 100"));
    assert!(!sql.contains(" OR "));
}
