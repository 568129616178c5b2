#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Grouped rendering.

mod common;

use std::collections::BTreeSet;

use common::*;
use section_datasource::{DatasourceError, Node, Outcome, ParamPool};

fn grouped(group: i64) -> Node {
    let mut config = config();
    config.group = Some(group);
    let f = fixture(config, repository());
    match f.datasource.execute(&mut ParamPool::new()).unwrap() {
        Outcome::Rendered(node) => node,
        other => panic!("expected a rendered tree, got {other:?}"),
    }
}

fn groups(root: &Node) -> Vec<&Node> {
    root.children.iter().filter(|c| c.name != "section").collect()
}

#[test]
fn test_groups_by_select_value_in_partition_order() {
    let root = grouped(CATEGORY);
    let groups = groups(&root);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0].name, "category");
    assert_eq!(groups[0].attribute("handle"), Some("news"));
    assert_eq!(groups[0].attribute("value"), Some("News"));
    assert_eq!(entry_ids(groups[0]), vec![3, 1]);
    assert_eq!(groups[1].attribute("handle"), Some("sport"));
    assert_eq!(entry_ids(groups[1]), vec![2]);
}

#[test]
fn test_grouped_and_flat_rendering_cover_the_same_records() {
    let f = fixture(config(), repository());
    let flat = match f.datasource.execute(&mut ParamPool::new()).unwrap() {
        Outcome::Rendered(node) => node,
        other => panic!("expected a rendered tree, got {other:?}"),
    };

    for group in [TITLE, CATEGORY, FEATURED, PUBLISHED] {
        let grouped_ids: BTreeSet<i64> = entry_ids(&grouped(group)).into_iter().collect();
        let flat_ids: BTreeSet<i64> = entry_ids(&flat).into_iter().collect();
        assert_eq!(grouped_ids, flat_ids, "grouping by field {group}");
    }
}

#[test]
fn test_date_groups_nest_year_month_day() {
    let root = grouped(PUBLISHED);
    let years = groups(&root);

    assert_eq!(years.len(), 1);
    assert_eq!(years[0].name, "year");
    assert_eq!(years[0].attribute("value"), Some("2024"));

    let months: Vec<&Node> = years[0].children_named("month").collect();
    let month_values: Vec<&str> = months.iter().map(|m| m.attribute("value").unwrap()).collect();
    assert_eq!(month_values, vec!["04", "03"]);

    let march_days: Vec<&str> = months[1]
        .children_named("day")
        .map(|d| d.attribute("value").unwrap())
        .collect();
    assert_eq!(march_days, vec!["20", "05"]);
    assert_eq!(entry_ids(months[1]), vec![2, 1]);
}

#[test]
fn test_multi_valued_groups_repeat_entries() {
    let root = grouped(TAGS);
    let handles: Vec<&str> = groups(&root)
        .iter()
        .map(|g| g.attribute("handle").unwrap())
        .collect();

    assert_eq!(handles, vec!["rust", "football", "web"]);
    assert_eq!(entry_ids(groups(&root)[0]), vec![3, 1]);
}

#[test]
fn test_grouped_entries_render_fields() {
    let root = grouped(FEATURED);
    let yes = groups(&root)
        .into_iter()
        .find(|g| g.attribute("value") == Some("yes"))
        .unwrap();

    assert_eq!(entry_ids(yes), vec![3, 1]);
    assert!(yes.children[0].child("title").is_some());
}

#[test]
fn test_missing_group_field_is_a_configuration_error() {
    let mut config = config();
    config.group = Some(99);
    let f = fixture(config, repository());

    let err = f.datasource.execute(&mut ParamPool::new()).unwrap_err();

    assert!(matches!(err, DatasourceError::Configuration { .. }));
    assert!(err.to_string().contains("cannot be found"));
}

#[test]
fn test_ungroupable_field_is_a_configuration_error() {
    let mut config = config();
    config.group = Some(VIEWS);
    let f = fixture(config, repository());

    let err = f.datasource.execute(&mut ParamPool::new()).unwrap_err();

    assert!(matches!(err, DatasourceError::Configuration { .. }));
}

#[test]
fn test_grouped_params_only_populates_pool() {
    let mut config = section_datasource::DatasourceConfig::new("root", ARTICLES);
    config.group = Some(CATEGORY);
    config.param_output = vec!["system:id".to_string()];
    let f = fixture(config, repository());
    let mut pool = ParamPool::new();

    let outcome = f.datasource.execute(&mut pool).unwrap();

    assert_eq!(outcome, Outcome::ParamsOnly);
    assert_eq!(pool.get("ds-root").unwrap(), ["3", "1", "2"]);
}
