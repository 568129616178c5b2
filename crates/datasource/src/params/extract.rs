//! Writes system metadata and field values into the parameter pool.

use chrono::{DateTime, SecondsFormat, Utc};

use super::ParamPool;
use crate::compat::{self, LegacyParamKey};
use crate::config::DatasourceConfig;
use crate::deprecation::DeprecationLog;
use crate::field::{Field, ParamValue};
use crate::model::Entry;

const SYSTEM_PARAMETERS: [&str; 5] = [
    "system:id",
    "system:author",
    "system:creation-date",
    "system:modification-date",
    compat::SYSTEM_DATE,
];

fn timestamp(date: &DateTime<Utc>) -> String {
    date.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Extracts the configured output parameters of one datasource.
///
/// Every parameter is written under `ds-<root>.<param>`, with `:` replaced
/// by `-`. When exactly one parameter is configured, values are also written
/// under the bare `ds-<root>` key; the first such write logs a deprecation.
#[derive(Debug, Clone)]
pub struct ParamExtractor {
    params: Vec<(String, String)>,
    legacy: Option<LegacyParamKey>,
    system: bool,
}

impl ParamExtractor {
    pub fn new(config: &DatasourceConfig) -> Self {
        let prefix = config.param_key();
        let params = config
            .param_output
            .iter()
            .map(|p| (p.clone(), format!("{prefix}.{}", p.replace(':', "-"))))
            .collect();
        let system = config
            .param_output
            .iter()
            .any(|p| SYSTEM_PARAMETERS.contains(&p.as_str()));

        Self {
            params,
            legacy: LegacyParamKey::new(&config.root_element, &config.param_output),
            system,
        }
    }

    /// Whether any parameter is configured.
    pub fn is_active(&self) -> bool {
        !self.params.is_empty()
    }

    fn push(&self, pool: &mut ParamPool, key: &str, value: String, log: &mut DeprecationLog) {
        if let Some(legacy) = &self.legacy {
            legacy.note(log);
            pool.push(&legacy.key, value.clone());
        }
        pool.push(key, value);
    }

    /// Write the configured system parameters of `entry`.
    pub fn system_parameters(&self, entry: &Entry, pool: &mut ParamPool, log: &mut DeprecationLog) {
        if !self.system {
            return;
        }
        for (param, key) in &self.params {
            let value = match compat::output_parameter(param, log) {
                "system:id" => entry.id.to_string(),
                "system:author" => entry.author_id.to_string(),
                "system:creation-date" => timestamp(&entry.creation_date),
                "system:modification-date" => timestamp(&entry.modification_date),
                _ => continue,
            };
            self.push(pool, key, value, log);
        }
    }

    /// Write the value `field` contributes for one entry, if it is configured.
    pub fn field_parameters(
        &self,
        field: &Field,
        data: &serde_json::Value,
        entry: &Entry,
        pool: &mut ParamPool,
        log: &mut DeprecationLog,
    ) {
        if !self.is_active() {
            return;
        }
        if let Some(legacy) = &self.legacy {
            pool.ensure(&legacy.key);
        }

        for (param, key) in &self.params {
            if *param != field.element_name {
                continue;
            }
            pool.ensure(key);
            match field.parameter_pool_value(data, entry.id) {
                ParamValue::Many(values) => {
                    pool.merge_front(key, &values);
                    if let Some(legacy) = &self.legacy
                        && !values.is_empty()
                    {
                        legacy.note(log);
                        pool.merge_front(&legacy.key, &values);
                    }
                }
                ParamValue::Single(value) => self.push(pool, key, value, log),
                ParamValue::None => {}
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::field::FieldKind;
    use chrono::TimeZone;

    fn entry() -> Entry {
        Entry {
            id: 42,
            section_id: 1,
            author_id: 7,
            creation_date: Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap(),
            modification_date: Utc.with_ymd_and_hms(2024, 3, 2, 9, 30, 0).unwrap(),
            data: Default::default(),
        }
    }

    fn config(params: &[&str]) -> DatasourceConfig {
        let mut config = DatasourceConfig::new("root", 1);
        config.param_output = params.iter().map(|p| p.to_string()).collect();
        config
    }

    #[test]
    fn single_system_parameter_fills_both_keys() {
        let mut log = DeprecationLog::new();
        let extractor = ParamExtractor::new(&config(&["system:id"]));
        let mut pool = ParamPool::new();

        extractor.system_parameters(&entry(), &mut pool, &mut log);

        assert_eq!(pool.get("ds-root.system-id").unwrap(), ["42"]);
        assert_eq!(pool.get("ds-root").unwrap(), ["42"]);
    }

    #[test]
    fn several_parameters_fill_only_qualified_keys() {
        let mut log = DeprecationLog::new();
        let extractor =
            ParamExtractor::new(&config(&["system:author", "system:creation-date"]));
        let mut pool = ParamPool::new();

        extractor.system_parameters(&entry(), &mut pool, &mut log);

        assert_eq!(pool.get("ds-root.system-author").unwrap(), ["7"]);
        assert_eq!(
            pool.get("ds-root.system-creation-date").unwrap(),
            ["2024-03-01T09:30:00+00:00"]
        );
        assert!(!pool.contains_key("ds-root"));
    }

    #[test]
    fn legacy_date_parameter_keeps_its_key() {
        let mut log = DeprecationLog::new();
        let extractor = ParamExtractor::new(&config(&["system:date", "title"]));
        let mut pool = ParamPool::new();

        extractor.system_parameters(&entry(), &mut pool, &mut log);

        assert_eq!(
            pool.get("ds-root.system-date").unwrap(),
            ["2024-03-01T09:30:00+00:00"]
        );
        assert_eq!(log.notices().len(), 1);
    }

    #[test]
    fn multi_valued_fields_merge_in_front() {
        let mut log = DeprecationLog::new();
        let extractor = ParamExtractor::new(&config(&["tags"]));
        let field = Field {
            id: 5,
            section_id: 1,
            element_name: "tags".to_string(),
            label: "Tags".to_string(),
            kind: FieldKind::Select {
                allow_multiple: true,
            },
        };
        let mut pool = ParamPool::new();

        extractor.field_parameters(&field, &serde_json::json!({"handle": ["b"]}), &entry(), &mut pool, &mut log);
        extractor.field_parameters(&field, &serde_json::json!({"handle": ["a"]}), &entry(), &mut pool, &mut log);

        assert_eq!(pool.get("ds-root.tags").unwrap(), ["a", "b"]);
        assert_eq!(pool.get("ds-root").unwrap(), ["a", "b"]);
    }

    #[test]
    fn legacy_key_is_noted_on_first_write() {
        let mut log = DeprecationLog::new();
        let extractor = ParamExtractor::new(&config(&["system:id"]));
        let tags = Field {
            id: 5,
            section_id: 1,
            element_name: "tags".to_string(),
            label: "Tags".to_string(),
            kind: FieldKind::Select {
                allow_multiple: true,
            },
        };
        let mut pool = ParamPool::new();

        extractor.field_parameters(&tags, &serde_json::json!({"handle": ["a"]}), &entry(), &mut pool, &mut log);
        assert!(log.notices().is_empty());
        assert!(pool.get("ds-root").unwrap().is_empty());

        extractor.system_parameters(&entry(), &mut pool, &mut log);
        extractor.system_parameters(&entry(), &mut pool, &mut log);
        assert_eq!(log.notices().len(), 1);
        assert_eq!(log.notices()[0].deprecated, "ds-root");
    }
}
