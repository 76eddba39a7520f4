//! Parsed feature structures.
//!
//! Everything here is immutable once the parser returns it; runs copy what
//! they need into the worker's context.

use camino::{Utf8Path, Utf8PathBuf};
use weft_patterns::StepKeyword;

use crate::row::DataRow;

/// A parsed feature file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Feature {
    pub(crate) name: String,
    pub(crate) path: Option<Utf8PathBuf>,
    pub(crate) line: usize,
    pub(crate) tags: Vec<String>,
    pub(crate) description: String,
    pub(crate) scenarios: Vec<Scenario>,
}

impl Feature {
    /// Text after `Feature:`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the feature was read from, when known.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8Path> {
        self.path.as_deref()
    }

    /// Value recorded as `feature_file`: the path, or the name when the
    /// feature was parsed from text.
    #[must_use]
    pub fn source_label(&self) -> &str {
        self.path.as_deref().map_or_else(|| self.name.as_str(), Utf8Path::as_str)
    }

    /// Line of the `Feature:` keyword.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Tags declared on the feature.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Free text between the title and the first scenario.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Scenarios in source order, outlines already expanded.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// First scenario called `name`.
    #[must_use]
    pub fn scenario(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.iter().find(|scenario| scenario.name == name)
    }
}

/// A concrete scenario ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scenario {
    pub(crate) name: String,
    pub(crate) line: usize,
    pub(crate) tags: Vec<String>,
    pub(crate) steps: Vec<Step>,
    pub(crate) data_row: Option<DataRow>,
    pub(crate) examples_index: Option<usize>,
}

impl Scenario {
    /// Scenario name with outline placeholders substituted.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Line of the `Scenario:` or `Scenario Outline:` keyword.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Feature tags, then scenario tags, then examples tags.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Return `true` when `tag` (with or without `@`) applies.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        let wanted = tag.strip_prefix('@').unwrap_or(tag);
        self.tags
            .iter()
            .any(|t| t.strip_prefix('@').unwrap_or(t) == wanted)
    }

    /// Steps in run order, background steps first.
    #[must_use]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    /// Examples row the scenario was expanded from.
    #[must_use]
    pub fn data_row(&self) -> Option<&DataRow> {
        self.data_row.as_ref()
    }

    /// Zero-based position of the row across all of the outline's examples.
    #[must_use]
    pub fn examples_index(&self) -> Option<usize> {
        self.examples_index
    }

    /// Stable identifier combining the scenario line and examples index.
    #[must_use]
    pub fn id(&self) -> String {
        self.examples_index.map_or_else(
            || format!("L{}", self.line),
            |index| format!("L{}#{}", self.line, index + 1),
        )
    }
}

/// One step line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub(crate) keyword: StepKeyword,
    pub(crate) effective_keyword: StepKeyword,
    pub(crate) text: String,
    pub(crate) line: usize,
    pub(crate) argument: Option<StepArgument>,
}

impl Step {
    /// Keyword as written; `And` and `But` are kept.
    #[must_use]
    pub fn keyword(&self) -> StepKeyword {
        self.keyword
    }

    /// Keyword with `And`/`But` replaced by the primary keyword before them
    /// in the same background or scenario.
    #[must_use]
    pub fn effective_keyword(&self) -> StepKeyword {
        self.effective_keyword
    }

    /// Text after the keyword, placeholders substituted.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Source line.
    #[must_use]
    pub fn line(&self) -> usize {
        self.line
    }

    /// Attached data table or doc string.
    #[must_use]
    pub fn argument(&self) -> Option<&StepArgument> {
        self.argument.as_ref()
    }

    /// Attached data table.
    #[must_use]
    pub fn table(&self) -> Option<&DataTable> {
        match &self.argument {
            Some(StepArgument::Table(table)) => Some(table),
            _ => None,
        }
    }

    /// Attached doc string.
    #[must_use]
    pub fn doc_string(&self) -> Option<&DocString> {
        match &self.argument {
            Some(StepArgument::DocString(doc)) => Some(doc),
            _ => None,
        }
    }
}

/// Block argument following a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepArgument {
    /// `|`-delimited rows.
    Table(DataTable),
    /// Fenced multi-line text.
    DocString(DocString),
}

/// Rectangular table of cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataTable {
    pub(crate) rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Build a table from rows of cells.
    #[must_use]
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    /// All rows, the header included.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// First row.
    #[must_use]
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Rows after the header keyed by header cell.
    ///
    /// ```
    /// use weft::feature::DataTable;
    ///
    /// let table = DataTable::new(vec![
    ///     vec!["user".into(), "role".into()],
    ///     vec!["ann".into(), "admin".into()],
    /// ]);
    /// let rows = table.to_rows();
    /// assert_eq!(rows.len(), 1);
    /// assert_eq!(rows.first().and_then(|row| row.get("role")), Some("admin"));
    /// ```
    #[must_use]
    pub fn to_rows(&self) -> Vec<DataRow> {
        let Some((header, body)) = self.rows.split_first() else {
            return Vec::new();
        };
        body.iter()
            .map(|cells| DataRow::from_header(header, cells.iter().cloned()))
            .collect()
    }

    /// Number of rows, the header included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Return `true` when the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Fenced text block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocString {
    pub(crate) content: String,
    pub(crate) media_type: Option<String>,
}

impl DocString {
    /// Text between the fences.
    #[must_use]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Annotation written after the opening fence, such as `json`.
    #[must_use]
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }
}
