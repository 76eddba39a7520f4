//! Crate-level error taxonomy.
//!
//! Each subsystem owns its error type; [`Error`] aggregates them for callers
//! that drive the whole engine and want a single `?`-friendly type.

use thiserror::Error;

use crate::data::{DataError, SourceType};
use crate::feature::{FeatureError, ParseError};
use crate::pages::ConstructionError;
use crate::registry::{RegistryError, ResolveError};
use crate::runner::Failure;

/// Any error surfaced by the engine.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A declaration or setting is invalid; nothing has run.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// Feature text is malformed.
    #[error(transparent)]
    Parse(#[from] ParseError),
    /// A feature file could not be read or parsed.
    #[error(transparent)]
    Feature(#[from] FeatureError),
    /// Step text matched no definition or more than one.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// A step failed while running.
    #[error(transparent)]
    StepExecution(#[from] Failure),
    /// A page object could not be constructed.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
    /// Step definitions conflict or fail to compile.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// A data source could not be read.
    #[error(transparent)]
    Data(#[from] DataError),
    /// The worker pool could not start.
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}

/// Invalid data-source declaration or runtime setting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigurationError {
    /// A source type requires an option that was not supplied.
    #[error("{source_type} data source requires `{option}`")]
    MissingOption {
        /// Source being declared.
        source_type: SourceType,
        /// Name of the missing option.
        option: &'static str,
    },
    /// A database source declared neither an inline query nor a query key.
    #[error("DATABASE data source requires either `query` or `queryKey`")]
    MissingQuery,
    /// `queryKey` names no query in the catalogue.
    #[error("query key `{0}` is not defined")]
    UnknownQueryKey(String),
    /// A query parameter is not written as `name:value`.
    #[error("query parameter `{0}` must be written as `name:value`")]
    MalformedQueryParam(String),
    /// Only one of `keyField` and `keyValues` was supplied.
    #[error("`keyField` and `keyValues` must be declared together")]
    IncompleteKeyFilter,
    /// A filter expression could not be parsed.
    #[error("invalid filter `{expression}`: {reason}")]
    InvalidFilter {
        /// Expression as written.
        expression: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// The collaborator a source needs has not been registered.
    #[error("no {capability} registered for {source_type} data sources")]
    MissingCollaborator {
        /// Source being loaded.
        source_type: SourceType,
        /// Collaborator that is missing.
        capability: &'static str,
    },
    /// A runtime setting has an unusable value.
    #[error("invalid value `{value}` for {key}: {reason}")]
    InvalidSetting {
        /// Setting name, usually an environment variable.
        key: &'static str,
        /// Value as supplied.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_messages_name_the_option() {
        let err = ConfigurationError::MissingOption {
            source_type: SourceType::Csv,
            option: "path",
        };
        assert_eq!(err.to_string(), "CSV data source requires `path`");
    }

    #[test]
    fn crate_error_is_transparent() {
        let err = Error::from(ConfigurationError::UnknownQueryKey("ADMIN".into()));
        assert_eq!(err.to_string(), "query key `ADMIN` is not defined");
    }
}
