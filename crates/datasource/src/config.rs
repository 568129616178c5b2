//! Datasource configuration.
//!
//! Loaded from TOML or JSON. Every option except `root_element` and
//! `source` has a default:
//!
//! ```toml
//! root_element = "articles"
//! source = 3
//! included_elements = ["title", "body:formatted", "system:pagination"]
//! param_output = ["system:id"]
//! sort = "system:creation-date"
//! order = "asc"
//! limit = 10
//! start_page = "{$page:1}"
//!
//! [filters]
//! "system:id" = "not:4"
//! 12 = "published"
//! ```

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DatasourceError, DatasourceResult};
use crate::filter::FilterSpec;
use crate::model::FieldId;

/// Valid output element names.
#[allow(clippy::expect_used)]
static ELEMENT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.\-]*$").expect("valid regex literal")
});

#[allow(clippy::expect_used)]
static MODE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*:\s*").expect("valid regex literal"));

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
    Random,
}

/// Configuration of one section datasource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasourceConfig {
    /// Name of the root output element; also names the `ds-<root>` parameters.
    pub root_element: String,

    /// Source section id.
    pub source: i64,

    /// Elements to render: `handle` or `handle:mode`, plus `system:pagination`
    /// and the deprecated `system:date`.
    #[serde(default)]
    pub included_elements: Vec<String>,

    /// Values to output into the parameter pool.
    #[serde(default)]
    pub param_output: Vec<String>,

    /// Filters keyed by field id or pseudo-field.
    #[serde(default)]
    pub filters: FilterSpec,

    /// Sort field handle or pseudo-field.
    #[serde(default)]
    pub sort: Option<String>,

    #[serde(default)]
    pub order: SortOrder,

    #[serde(default = "default_true")]
    pub paginate_results: bool,

    /// Page to fetch; a number or a template referencing parameters,
    /// e.g. `{$page:1}`.
    #[serde(default, deserialize_with = "page_reference")]
    pub start_page: Option<String>,

    /// Page size; unset or negative means all entries.
    #[serde(default)]
    pub limit: Option<i64>,

    /// Field id used to group entries.
    #[serde(default)]
    pub group: Option<FieldId>,

    #[serde(default)]
    pub html_encode: bool,

    #[serde(default = "default_true")]
    pub associated_entry_counts: bool,

    #[serde(default)]
    pub redirect_on_required: bool,

    #[serde(default)]
    pub redirect_on_forbidden: bool,

    #[serde(default)]
    pub redirect_on_empty: bool,

    /// Parameter that must be present for the datasource to execute.
    #[serde(default)]
    pub required_param: Option<String>,

    /// Parameter whose presence negates the result.
    #[serde(default)]
    pub negate_param: Option<String>,

    /// Only populate the parameter pool; build no entry nodes.
    #[serde(default)]
    pub params_only: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PageReference {
    Number(i64),
    Template(String),
}

fn page_reference<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(
        Option::<PageReference>::deserialize(deserializer)?.map(|page| match page {
            PageReference::Number(n) => n.to_string(),
            PageReference::Template(s) => s,
        }),
    )
}

impl DatasourceConfig {
    /// A configuration with defaults for everything but the root and source.
    pub fn new(root_element: &str, source: i64) -> Self {
        Self {
            root_element: root_element.to_string(),
            source,
            included_elements: Vec::new(),
            param_output: Vec::new(),
            filters: FilterSpec::default(),
            sort: None,
            order: SortOrder::default(),
            paginate_results: true,
            start_page: None,
            limit: None,
            group: None,
            html_encode: false,
            associated_entry_counts: true,
            redirect_on_required: false,
            redirect_on_forbidden: false,
            redirect_on_empty: false,
            required_param: None,
            negate_param: None,
            params_only: false,
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(source: &str) -> DatasourceResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| DatasourceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(source: &str) -> DatasourceResult<Self> {
        let config: Self = serde_json::from_str(source)
            .map_err(|e| DatasourceError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the invariants serde cannot express.
    pub fn validate(&self) -> DatasourceResult<()> {
        if !ELEMENT_NAME.is_match(&self.root_element) {
            return Err(DatasourceError::InvalidConfig(format!(
                "root element `{}` is not a valid element name",
                self.root_element
            )));
        }
        if self.source <= 0 {
            return Err(DatasourceError::InvalidConfig(format!(
                "source section id must be positive, got {}",
                self.source
            )));
        }
        Ok(())
    }

    /// Included elements split into handle and optional mode.
    pub fn included(&self) -> Vec<IncludedElement> {
        self.included_elements
            .iter()
            .map(|raw| IncludedElement::parse(raw))
            .collect()
    }

    /// Whether the pagination element was requested.
    pub fn includes_pagination(&self) -> bool {
        self.included_elements.iter().any(|e| e == "system:pagination")
    }

    /// Whether the datasource runs in parameters-only mode.
    pub fn is_params_only(&self) -> bool {
        self.params_only || (self.included_elements.is_empty() && !self.param_output.is_empty())
    }

    /// Legacy single-key parameter name, `ds-<root>`.
    pub fn param_key(&self) -> String {
        format!("ds-{}", self.root_element)
    }
}

/// An entry of `included_elements`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludedElement {
    pub handle: String,
    pub mode: Option<String>,
}

impl IncludedElement {
    /// Split `handle:mode`, tolerating whitespace around the colon.
    pub fn parse(raw: &str) -> Self {
        let mut parts = MODE_SEPARATOR.splitn(raw.trim(), 2);
        let handle = parts.next().unwrap_or_default().to_string();
        let mode = parts.next().map(str::to_string).filter(|m| !m.is_empty());
        Self { handle, mode }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::{FilterKey, FilterValue};

    #[test]
    fn toml_with_defaults() {
        let config = DatasourceConfig::from_toml_str(
            r#"
            root_element = "articles"
            source = 3
            included_elements = ["title", "body : formatted"]
            "#,
        )
        .unwrap();

        assert!(config.paginate_results);
        assert!(config.associated_entry_counts);
        assert_eq!(config.order, SortOrder::Desc);
        assert_eq!(
            config.included()[1],
            IncludedElement {
                handle: "body".to_string(),
                mode: Some("formatted".to_string()),
            }
        );
    }

    #[test]
    fn filters_keep_document_order() {
        let config = DatasourceConfig::from_toml_str(
            r#"
            root_element = "articles"
            source = 3

            [filters]
            "system:modification-date" = "2024"
            12 = ["a", "b"]
            id = "1, 2"
            "#,
        )
        .unwrap();

        let keys: Vec<&FilterKey> = config.filters.iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            vec![
                &FilterKey::ModificationDate,
                &FilterKey::Field(12),
                &FilterKey::Id
            ]
        );
        assert_eq!(
            config.filters.iter().nth(1).map(|(_, v)| v),
            Some(&FilterValue::Any(vec!["a".to_string(), "b".to_string()]))
        );
    }

    #[test]
    fn start_page_accepts_numbers_and_templates() {
        let config = DatasourceConfig::from_toml_str(
            r#"
            root_element = "articles"
            source = 3
            start_page = 2
            "#,
        )
        .unwrap();
        assert_eq!(config.start_page.as_deref(), Some("2"));

        let config = DatasourceConfig::from_json_str(
            r#"{"root_element": "articles", "source": 3, "start_page": "{$page:1}"}"#,
        )
        .unwrap();
        assert_eq!(config.start_page.as_deref(), Some("{$page:1}"));

        let config =
            DatasourceConfig::from_json_str(r#"{"root_element": "articles", "source": 3}"#)
                .unwrap();
        assert_eq!(config.start_page, None);
    }

    #[test]
    fn rejects_invalid_root_element() {
        let err = DatasourceConfig::from_json_str(r#"{"root_element": "9 lives", "source": 1}"#)
            .unwrap_err();
        assert!(matches!(err, DatasourceError::InvalidConfig(_)));
    }

    #[test]
    fn params_only_when_nothing_is_included() {
        let mut config = DatasourceConfig::new("tags", 2);
        config.param_output = vec!["system:id".to_string()];
        assert!(config.is_params_only());

        config.included_elements = vec!["title".to_string()];
        assert!(!config.is_params_only());
    }
}
