//! Rows for data-driven tests.
//!
//! A [`DataSourceSpec`] declares where rows come from; a [`DataProvider`]
//! validates the declaration, reads the rows through the matching
//! collaborator and applies the key allow-list and [`Filter`]. Combine the
//! rows with [`WorkerPool::run_data_driven`](crate::WorkerPool::run_data_driven)
//! or [`ScenarioRunner::run_with_row`](crate::ScenarioRunner::run_with_row).

mod filter;
mod json;
mod provider;
mod reader;
mod source;

use thiserror::Error;

use crate::error::ConfigurationError;

pub use filter::{Comparison, Filter};
pub use json::{JsonDocumentError, JsonDocumentReader};
pub use provider::{DataProvider, DataProviderBuilder};
pub use reader::{DelimitedReader, DocumentReader, FieldDecryptor, QueryExecutor, SourceError, TabularReader};
pub use source::{DataSourceSpec, QueryParam, SourceType};

/// Failure loading rows.
#[derive(Debug, Error)]
pub enum DataError {
    /// The declaration is invalid; nothing was read.
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    /// The collaborator failed.
    #[error("failed to read {source_type} source `{location}`: {source}")]
    Source {
        /// Kind of source.
        source_type: SourceType,
        /// Path or connection name.
        location: String,
        /// Collaborator error.
        source: SourceError,
    },
}

#[cfg(test)]
mod tests;
