//! Feature-file parsing.
//!
//! Features are parsed with `gherkin` once into immutable [`Feature`] values.
//! Scenario outlines are expanded here, so downstream code only ever sees
//! concrete scenarios.

mod diagnose;
mod error;
mod model;
mod outline;
mod parser;
mod source;
mod table;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

pub use error::{FeatureError, ParseError, ParseErrorKind};
pub use model::{DataTable, DocString, Feature, Scenario, Step, StepArgument};

/// Parse feature text.
///
/// Parsing is pure: the same text always yields the same feature.
///
/// ```
/// let feature = weft::feature::parse(
///     "Feature: Login\n\
///      Scenario Outline: sign in as <user>\n\
///        Given the user <user> logs in\n\
///      Examples:\n\
///        | user |\n\
///        | ann  |\n\
///        | bob  |\n",
/// )
/// .unwrap_or_else(|err| panic!("{err}"));
/// let names: Vec<_> = feature.scenarios().iter().map(|s| s.name()).collect();
/// assert_eq!(names, ["sign in as ann", "sign in as bob"]);
/// ```
///
/// # Errors
/// Returns [`ParseError`] with the offending line when the text is
/// malformed.
pub fn parse(source: &str) -> Result<Feature, ParseError> {
    parser::parse_source(source, None)
}

/// Parse feature text, recording `path` as its origin.
///
/// # Errors
/// Returns [`ParseError`] when the text is malformed.
pub fn parse_with_path(source: &str, path: impl Into<Utf8PathBuf>) -> Result<Feature, ParseError> {
    parser::parse_source(source, Some(path.into()))
}

/// Read and parse a UTF-8 feature file.
///
/// # Errors
/// Returns [`FeatureError::Io`] when the file cannot be read and
/// [`FeatureError::Parse`] when it is malformed.
pub fn parse_file(path: impl AsRef<Utf8Path>) -> Result<Feature, FeatureError> {
    let path = path.as_ref();
    let source = std::fs::read_to_string(path).map_err(|source| FeatureError::Io {
        path: path.to_owned(),
        source,
    })?;
    let feature = parse_with_path(&source, path).map_err(|source| FeatureError::Parse {
        path: path.to_owned(),
        source,
    })?;
    debug!(
        path = %path,
        scenarios = feature.scenarios().len(),
        "parsed feature file"
    );
    Ok(feature)
}
