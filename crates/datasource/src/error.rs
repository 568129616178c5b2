//! Datasource error types.

use thiserror::Error;

/// Errors that abort a datasource invocation.
///
/// Recoverable conditions (forced-empty, negated, empty result) are not
/// errors; they surface as an [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
pub enum DatasourceError {
    /// The datasource configuration references something that does not exist.
    #[error("configuration error in data source `{datasource}`: {message}")]
    Configuration { datasource: String, message: String },

    /// The source section could not be found.
    #[error("section {section_id}, used by data source `{datasource}`, could not be found")]
    SectionNotFound { section_id: i64, datasource: String },

    /// A field could not be resolved by the field registry.
    #[error("field {0} could not be found")]
    FieldNotFound(i64),

    /// The configuration document itself is malformed.
    #[error("invalid data source configuration: {0}")]
    InvalidConfig(String),

    /// A collaborator (registry, repository) failed.
    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

impl DatasourceError {
    /// Build a configuration error for the named datasource.
    pub fn configuration(datasource: &str, message: impl Into<String>) -> Self {
        Self::Configuration {
            datasource: datasource.to_string(),
            message: message.into(),
        }
    }
}

/// Result type alias using DatasourceError.
pub type DatasourceResult<T> = Result<T, DatasourceError>;
