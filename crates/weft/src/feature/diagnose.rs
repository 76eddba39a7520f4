//! Locating the line `gherkin` choked on.
//!
//! `gherkin` reports failures as grammar positions with a list of expected
//! tokens. When it rejects a feature, this pass walks the text once more and
//! names the first construct that is out of place.

use weft_patterns::StepKeyword;

use super::error::{ParseError, ParseErrorKind};
use super::source::{
    BACKGROUND, EXAMPLES, FEATURE, OUTLINE, RULE, SCENARIO, SourceLines, fence_of, is_structural,
    title,
};
use super::table::split_row;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Background,
    Scenario,
    Outline,
}

/// What a following table row attaches to.
#[derive(Clone, Copy, PartialEq, Eq)]
enum Anchor {
    Nothing,
    Step,
    Examples,
}

/// The scenario or outline being scanned.
struct Open {
    name: String,
    line: usize,
    steps: usize,
    /// Line and row count of each examples block so far.
    examples: Vec<(usize, usize)>,
}

struct Scan {
    feature_line: Option<usize>,
    section: Section,
    anchor: Anchor,
    table_width: Option<usize>,
    open: Option<Open>,
}

/// Find the first malformed construct in `lines`.
///
/// Returns `None` when the scan finds nothing it can name; the caller then
/// reports `gherkin`'s own message.
pub(super) fn locate(lines: &SourceLines<'_>) -> Option<ParseError> {
    let mut scan = Scan {
        feature_line: None,
        section: Section::Header,
        anchor: Anchor::Nothing,
        table_width: None,
        open: None,
    };
    let mut cursor = lines.from(1);
    while let Some((line_no, raw)) = cursor.next() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(fence) = fence_of(line) {
            if !cursor.by_ref().any(|(_, next)| next.trim() == fence) {
                return Some(ParseError::new(line_no, ParseErrorKind::UnterminatedDocString));
            }
        }
        if let Err(err) = scan.line(line, line_no) {
            return Some(err);
        }
    }
    if scan.feature_line.is_none() {
        return Some(ParseError::new(1, ParseErrorKind::MissingFeature));
    }
    scan.close().err()
}

impl Scan {
    fn line(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        let fail = |kind| Err(ParseError::new(line_no, kind));
        if line.starts_with('@') {
            self.anchor = Anchor::Nothing;
            return Ok(());
        }
        if title(line, FEATURE).is_some() {
            if let Some(first_line) = self.feature_line {
                return fail(ParseErrorKind::DuplicateFeature { first_line });
            }
            self.feature_line = Some(line_no);
            return Ok(());
        }
        if self.feature_line.is_none() {
            return fail(
                if is_structural(line) || StepKeyword::split_line(line).is_some() {
                    ParseErrorKind::MissingFeature
                } else {
                    ParseErrorKind::UnexpectedLine(line.to_owned())
                },
            );
        }
        if title(line, BACKGROUND).is_some() || title(line, RULE).is_some() {
            self.close()?;
            self.enter(Section::Background);
            return Ok(());
        }
        if let Some(name) = title(line, OUTLINE) {
            return self.open_scenario(Section::Outline, name, line_no);
        }
        if let Some(name) = title(line, SCENARIO) {
            return self.open_scenario(Section::Scenario, name, line_no);
        }
        if title(line, EXAMPLES).is_some() {
            return self.examples(line_no);
        }
        if line.starts_with('|') {
            return self.table_row(line, line_no);
        }
        if fence_of(line).is_some() {
            if self.anchor != Anchor::Step {
                return fail(ParseErrorKind::ArgumentWithoutStep("doc string"));
            }
            self.anchor = Anchor::Nothing;
            return Ok(());
        }
        if StepKeyword::split_line(line).is_some() {
            return self.step(line, line_no);
        }
        match self.section {
            Section::Header => Ok(()),
            _ => fail(ParseErrorKind::UnexpectedLine(line.to_owned())),
        }
    }

    fn enter(&mut self, section: Section) {
        self.section = section;
        self.anchor = Anchor::Nothing;
        self.table_width = None;
    }

    fn open_scenario(&mut self, section: Section, name: &str, line: usize) -> Result<(), ParseError> {
        self.close()?;
        self.enter(section);
        self.open = Some(Open {
            name: name.to_owned(),
            line,
            steps: 0,
            examples: Vec::new(),
        });
        Ok(())
    }

    fn examples(&mut self, line: usize) -> Result<(), ParseError> {
        let open = match (&mut self.open, self.section) {
            (Some(open), Section::Outline) => open,
            _ => return Err(ParseError::new(line, ParseErrorKind::ExamplesOutsideOutline)),
        };
        check_examples(open)?;
        open.examples.push((line, 0));
        self.anchor = Anchor::Examples;
        self.table_width = None;
        Ok(())
    }

    fn table_row(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        let fail = |kind| ParseError::new(line_no, kind);
        let cells = split_row(line).map_err(fail)?;
        if self.anchor == Anchor::Nothing {
            return Err(fail(ParseErrorKind::ArgumentWithoutStep("data table")));
        }
        match self.table_width {
            Some(expected) if expected != cells.len() => {
                return Err(fail(ParseErrorKind::ColumnCountMismatch {
                    expected,
                    found: cells.len(),
                }));
            }
            Some(_) => {}
            None => {
                if self.anchor == Anchor::Examples {
                    if let Some(name) = repeated(&cells) {
                        return Err(fail(ParseErrorKind::DuplicateColumn { name }));
                    }
                }
                self.table_width = Some(cells.len());
            }
        }
        if self.anchor == Anchor::Examples {
            if let Some((_, rows)) = self.open.as_mut().and_then(|open| open.examples.last_mut()) {
                *rows += 1;
            }
        }
        Ok(())
    }

    fn step(&mut self, line: &str, line_no: usize) -> Result<(), ParseError> {
        let fail = |kind| Err(ParseError::new(line_no, kind));
        if self.section == Section::Header {
            return fail(ParseErrorKind::StepOutsideScenario(line.to_owned()));
        }
        if let Some(open) = &mut self.open {
            if !open.examples.is_empty() {
                return fail(ParseErrorKind::UnexpectedLine(line.to_owned()));
            }
            open.steps += 1;
        }
        self.anchor = Anchor::Step;
        self.table_width = None;
        Ok(())
    }

    /// Check the scenario that is about to end.
    fn close(&mut self) -> Result<(), ParseError> {
        let Some(open) = self.open.take() else {
            return Ok(());
        };
        if open.steps == 0 {
            return Err(ParseError::new(
                open.line,
                ParseErrorKind::ScenarioWithoutSteps { name: open.name },
            ));
        }
        if self.section == Section::Outline && open.examples.is_empty() {
            return Err(ParseError::new(
                open.line,
                ParseErrorKind::OutlineWithoutExamples { name: open.name },
            ));
        }
        check_examples(&open)
    }
}

fn repeated(header: &[String]) -> Option<String> {
    header
        .iter()
        .enumerate()
        .find(|&(index, name)| header.iter().take(index).any(|earlier| earlier == name))
        .map(|(_, name)| name.clone())
}

/// The latest examples block needs a header and at least one data row.
fn check_examples(open: &Open) -> Result<(), ParseError> {
    match open.examples.last() {
        Some(&(line, rows)) if rows < 2 => Err(ParseError::new(line, ParseErrorKind::EmptyExamples)),
        _ => Ok(()),
    }
}
