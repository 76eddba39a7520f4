//! Errors raised while reading feature files.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Malformed feature text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {kind}")]
pub struct ParseError {
    /// One-based line the problem was found on.
    pub line: usize,
    /// What went wrong.
    pub kind: ParseErrorKind,
}

impl ParseError {
    pub(crate) fn new(line: usize, kind: ParseErrorKind) -> Self {
        Self { line, kind }
    }
}

/// Category of a [`ParseError`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseErrorKind {
    /// The text has no `Feature:` line.
    #[error("missing `Feature:` declaration")]
    MissingFeature,
    /// A second `Feature:` line was found.
    #[error("duplicate `Feature:` declaration (first at line {first_line})")]
    DuplicateFeature {
        /// Line of the first declaration.
        first_line: usize,
    },
    /// A line matches no construct valid at that point.
    #[error("unexpected line `{0}`")]
    UnexpectedLine(String),
    /// A step appears before any `Background:` or scenario.
    #[error("step `{0}` appears outside a scenario")]
    StepOutsideScenario(String),
    /// An `Examples:` block does not follow an outline.
    #[error("`Examples:` outside a scenario outline")]
    ExamplesOutsideOutline,
    /// A scenario or outline declares no steps.
    #[error("scenario `{name}` has no steps")]
    ScenarioWithoutSteps {
        /// Scenario name.
        name: String,
    },
    /// An outline has no `Examples:` block.
    #[error("scenario outline `{name}` has no examples")]
    OutlineWithoutExamples {
        /// Outline name.
        name: String,
    },
    /// An `Examples:` block has no header or no data rows.
    #[error("examples table has no data rows")]
    EmptyExamples,
    /// A table row has the wrong number of cells.
    #[error("table row has {found} cells but the header has {expected}")]
    ColumnCountMismatch {
        /// Cells in the first row.
        expected: usize,
        /// Cells in this row.
        found: usize,
    },
    /// An examples header names the same column twice.
    #[error("examples header repeats column `{name}`")]
    DuplicateColumn {
        /// Repeated column name.
        name: String,
    },
    /// An outline references a column the examples do not define.
    #[error("placeholder `<{name}>` names no examples column")]
    UnknownPlaceholder {
        /// Placeholder name without brackets.
        name: String,
    },
    /// A table or doc string does not follow a step.
    #[error("{0} without a preceding step")]
    ArgumentWithoutStep(&'static str),
    /// A doc string fence is never closed.
    #[error("doc string opened here is never closed")]
    UnterminatedDocString,
    /// `gherkin` rejected the text for a reason none of the other kinds
    /// describe.
    #[error("invalid Gherkin: {0}")]
    Syntax(String),
}

/// Failure to load a feature file.
#[derive(Debug, Error)]
pub enum FeatureError {
    /// The file could not be read.
    #[error("failed to read feature file {path}: {source}")]
    Io {
        /// File that was requested.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is malformed.
    #[error("{path}: {source}")]
    Parse {
        /// File that was parsed.
        path: Utf8PathBuf,
        /// Parse failure.
        #[source]
        source: ParseError,
    },
}
