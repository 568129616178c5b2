#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Shared fixtures: an `articles` section with a `comments` child section.

#![allow(dead_code)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use section_datasource::{
    DatasourceConfig, Entry, FieldKind, HookRegistry, SectionAssociation, SectionDatasource,
};
use section_datasource_test_utils::{
    InMemoryEntries, InMemoryFields, InMemorySections, test_entry, test_field, test_section,
};

pub const ARTICLES: i64 = 1;
pub const COMMENTS: i64 = 2;

pub const TITLE: i64 = 10;
pub const CATEGORY: i64 = 11;
pub const PUBLISHED: i64 = 12;
pub const FEATURED: i64 = 13;
pub const TAGS: i64 = 14;
pub const RELATED: i64 = 15;
pub const VIEWS: i64 = 16;
pub const COMMENT_ARTICLE: i64 = 20;

/// Install a test subscriber once; repeated calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("section_datasource=debug")
        .try_init();
}

pub fn sections() -> InMemorySections {
    let mut articles = test_section(ARTICLES, "articles");
    articles.name = "Articles".to_string();
    articles.associations.push(SectionAssociation {
        section_id: COMMENTS,
        section_handle: "comments".to_string(),
        child_field_id: COMMENT_ARTICLE,
    });
    InMemorySections::new()
        .with_section(articles)
        .with_section(test_section(COMMENTS, "comments"))
}

pub fn fields() -> InMemoryFields {
    InMemoryFields::new()
        .with_field(test_field(TITLE, ARTICLES, "title", FieldKind::Text))
        .with_field(test_field(
            CATEGORY,
            ARTICLES,
            "category",
            FieldKind::Select {
                allow_multiple: false,
            },
        ))
        .with_field(test_field(PUBLISHED, ARTICLES, "published", FieldKind::Date))
        .with_field(test_field(FEATURED, ARTICLES, "featured", FieldKind::Checkbox))
        .with_field(test_field(
            TAGS,
            ARTICLES,
            "tags",
            FieldKind::Select {
                allow_multiple: true,
            },
        ))
        .with_field(test_field(
            RELATED,
            ARTICLES,
            "related",
            FieldKind::Relation {
                related_section_id: ARTICLES,
            },
        ))
        .with_field(test_field(VIEWS, ARTICLES, "views", FieldKind::Number))
        .with_field(test_field(
            COMMENT_ARTICLE,
            COMMENTS,
            "article",
            FieldKind::Relation {
                related_section_id: ARTICLES,
            },
        ))
}

fn article(id: i64, title: &str, category: &str, published: &str, tags: &[&str]) -> Entry {
    let handles: Vec<String> = tags.iter().map(|t| t.to_lowercase()).collect();
    let featured = if id % 2 == 1 { "yes" } else { "no" };
    test_entry(id, ARTICLES)
        .with_text(TITLE, title)
        .with_data(
            CATEGORY,
            serde_json::json!({"value": category, "handle": category.to_lowercase()}),
        )
        .with_data(PUBLISHED, serde_json::json!({"date": published}))
        .with_data(FEATURED, serde_json::json!({"value": featured}))
        .with_data(TAGS, serde_json::json!({"value": tags, "handle": handles}))
        .with_data(VIEWS, serde_json::json!({"value": id * 100}))
        .created(Utc.with_ymd_and_hms(2024, 1, id as u32, 9, 0, 0).unwrap())
        .modified(Utc.with_ymd_and_hms(2024, 2, 10 - id as u32, 9, 0, 0).unwrap())
        .build()
}

/// Three articles: two in `news`, one in `sport`, across two months.
pub fn articles() -> Vec<Entry> {
    vec![
        article(1, "First Post", "News", "2024-03-05T10:00:00Z", &["Rust", "Web"]),
        article(2, "Match Report", "Sport", "2024-03-20T10:00:00Z", &["Football"]),
        article(3, "Second Post", "News", "2024-04-02T10:00:00Z", &["Rust"]),
    ]
}

pub fn repository() -> InMemoryEntries {
    InMemoryEntries::new().with_entries(articles())
}

pub fn config() -> DatasourceConfig {
    let mut config = DatasourceConfig::new("articles", ARTICLES);
    config.included_elements = vec!["title".to_string(), "category".to_string()];
    config
}

pub struct Fixture {
    pub datasource: SectionDatasource,
    pub fields: Arc<InMemoryFields>,
    pub entries: Arc<InMemoryEntries>,
}

pub fn fixture(config: DatasourceConfig, entries: InMemoryEntries) -> Fixture {
    fixture_with_hooks(config, entries, HookRegistry::new())
}

pub fn fixture_with_hooks(
    config: DatasourceConfig,
    entries: InMemoryEntries,
    hooks: HookRegistry,
) -> Fixture {
    init_tracing();
    let fields = Arc::new(fields());
    let entries = Arc::new(entries);
    let datasource = SectionDatasource::new(
        config,
        Arc::new(sections()),
        fields.clone(),
        entries.clone(),
    )
    .with_hooks(Arc::new(hooks));
    Fixture {
        datasource,
        fields,
        entries,
    }
}

/// Ids of the `entry` nodes under `node`, depth first.
pub fn entry_ids(node: &section_datasource::Node) -> Vec<i64> {
    let mut ids = Vec::new();
    for child in &node.children {
        if child.name == "entry" {
            ids.push(child.attribute("id").unwrap().parse().unwrap());
        } else {
            ids.extend(entry_ids(child));
        }
    }
    ids
}
