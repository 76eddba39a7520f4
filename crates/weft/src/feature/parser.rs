//! Feature parsing on top of `gherkin`.
//!
//! `gherkin` decides the structure. A lowering pass then maps its AST onto
//! [`Feature`]: tags are inherited, backgrounds are prepended, outlines are
//! expanded and anything the runtime cannot run is rejected with the line it
//! sits on.

use std::collections::HashSet;

use camino::Utf8PathBuf;
use gherkin::{GherkinEnv, StepType};
use tracing::debug;
use weft_patterns::StepKeyword;

use super::diagnose;
use super::error::{ParseError, ParseErrorKind};
use super::model::{DataTable, DocString, Feature, Scenario, Step, StepArgument};
use super::outline::substitute;
use super::source::{FEATURE, OUTLINE, SourceLines, fence_of, title};
use super::table::split_row;
use crate::row::DataRow;

/// Parse feature text.
///
/// # Errors
/// Returns [`ParseError`] on the first malformed construct.
pub(super) fn parse_source(source: &str, path: Option<Utf8PathBuf>) -> Result<Feature, ParseError> {
    let lines = SourceLines::new(source);
    match gherkin::Feature::parse(source, GherkinEnv::default()) {
        Ok(ast) => Lowering { lines: &lines }.feature(&ast, path),
        Err(err) => {
            let message = err.to_string();
            debug!(error = %message, "gherkin rejected feature text");
            Err(diagnose::locate(&lines).unwrap_or_else(|| {
                ParseError::new(reported_line(&message), ParseErrorKind::Syntax(message))
            }))
        }
    }
}

/// First `line:column` pair in a `gherkin` error message.
fn reported_line(message: &str) -> usize {
    message
        .split(|c: char| !c.is_ascii_digit() && c != ':')
        .find_map(|token| {
            let mut parts = token.split(':');
            let line = parts.next()?.parse().ok()?;
            parts.next()?.parse::<usize>().ok()?;
            Some(line)
        })
        .unwrap_or(1)
}

/// Free text under a header, and what is allowed in it.
#[derive(Clone, Copy)]
enum Prose {
    /// A feature description; prose is fine but steps and arguments are not.
    Feature { line: usize },
    /// Text between a scenario, background or examples header and its body.
    Block,
}

/// An examples block as written: header cells and data rows.
struct ExamplesTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

struct Lowering<'a> {
    lines: &'a SourceLines<'a>,
}

impl Lowering<'_> {
    fn feature(&self, ast: &gherkin::Feature, path: Option<Utf8PathBuf>) -> Result<Feature, ParseError> {
        let line = self.lines.keyword_line(ast.span.start, &ast.keyword);
        let description = self.prose(line, ast.description.as_deref(), Prose::Feature { line })?;
        let tags: Vec<_> = tags_of(&ast.tags).collect();
        let background = self.background(ast.background.as_ref())?;

        let mut scenarios = Vec::new();
        for scenario in &ast.scenarios {
            self.scenario(scenario, &tags, &background, &mut scenarios)?;
        }
        for rule in &ast.rules {
            let line = self.lines.keyword_line(rule.span.start, &rule.keyword);
            self.prose(line, rule.description.as_deref(), Prose::Block)?;
            let mut rule_tags = tags.clone();
            rule_tags.extend(tags_of(&rule.tags));
            let mut rule_background = background.clone();
            rule_background.extend(self.background(rule.background.as_ref())?);
            for scenario in &rule.scenarios {
                self.scenario(scenario, &rule_tags, &rule_background, &mut scenarios)?;
            }
        }

        Ok(Feature {
            name: ast.name.trim().to_owned(),
            path,
            line,
            tags,
            description,
            scenarios,
        })
    }

    /// Check the free text `gherkin` collected under the header on `line`.
    ///
    /// `gherkin` files any unrecognised line before a block's first step as
    /// its description. Only a feature may carry prose.
    fn prose(&self, line: usize, description: Option<&str>, allowed: Prose) -> Result<String, ParseError> {
        let Some(description) = description else {
            return Ok(String::new());
        };
        let mut kept = Vec::new();
        for text in description.lines().map(str::trim).filter(|text| !text.is_empty()) {
            if let Some(kind) = misplaced(text, allowed) {
                return Err(ParseError::new(self.lines.find_after(line, text), kind));
            }
            kept.push(text);
        }
        Ok(kept.join("\n"))
    }

    fn background(&self, ast: Option<&gherkin::Background>) -> Result<Vec<Step>, ParseError> {
        let Some(ast) = ast else {
            return Ok(Vec::new());
        };
        let line = self.lines.keyword_line(ast.span.start, &ast.keyword);
        self.prose(line, ast.description.as_deref(), Prose::Block)?;
        self.steps(&ast.steps)
    }

    fn scenario(
        &self,
        ast: &gherkin::Scenario,
        inherited: &[String],
        background: &[Step],
        out: &mut Vec<Scenario>,
    ) -> Result<(), ParseError> {
        let line = self.lines.keyword_line(ast.span.start, &ast.keyword);
        let name = ast.name.trim().to_owned();
        self.prose(line, ast.description.as_deref(), Prose::Block)?;
        let steps = self.steps(&ast.steps)?;
        if steps.is_empty() {
            return Err(ParseError::new(line, ParseErrorKind::ScenarioWithoutSteps { name }));
        }
        let mut tags = inherited.to_vec();
        tags.extend(tags_of(&ast.tags));

        if !is_outline(&ast.keyword) {
            if let Some(examples) = ast.examples.first() {
                let at = self.lines.keyword_line(examples.span.start, &examples.keyword);
                return Err(ParseError::new(at, ParseErrorKind::ExamplesOutsideOutline));
            }
            out.push(Scenario {
                name,
                line,
                tags,
                steps: background.iter().cloned().chain(steps).collect(),
                data_row: None,
                examples_index: None,
            });
            return Ok(());
        }

        if ast.examples.is_empty() {
            return Err(ParseError::new(line, ParseErrorKind::OutlineWithoutExamples { name }));
        }
        let mut index = 0;
        for examples in &ast.examples {
            let table = self.examples(examples)?;
            let mut block_tags = tags.clone();
            block_tags.extend(tags_of(&examples.tags));
            for cells in table.rows {
                let row = DataRow::from_header(&table.header, cells);
                let mut expanded = background.to_vec();
                for step in &steps {
                    expanded.push(substitute_step(step, &row)?);
                }
                out.push(Scenario {
                    name: substitute_at(&name, &row, line)?,
                    line,
                    tags: block_tags.clone(),
                    steps: expanded,
                    data_row: Some(row),
                    examples_index: Some(index),
                });
                index += 1;
            }
        }
        Ok(())
    }

    fn examples(&self, ast: &gherkin::Examples) -> Result<ExamplesTable, ParseError> {
        let line = self.lines.keyword_line(ast.span.start, &ast.keyword);
        self.prose(line, ast.description.as_deref(), Prose::Block)?;
        let empty = || ParseError::new(line, ParseErrorKind::EmptyExamples);
        let table = ast.table.as_ref().ok_or_else(empty)?;
        let rows = self.table(table)?;
        let ((header_line, header), body) = rows.split_first().ok_or_else(empty)?;
        let mut seen = HashSet::new();
        if let Some(name) = header.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(ParseError::new(
                *header_line,
                ParseErrorKind::DuplicateColumn { name: name.clone() },
            ));
        }
        if body.is_empty() {
            return Err(empty());
        }
        Ok(ExamplesTable {
            header: header.clone(),
            rows: body.iter().map(|(_, cells)| cells.clone()).collect(),
        })
    }

    /// Rows of `table` as written in the source, with their lines.
    fn table(&self, table: &gherkin::Table) -> Result<Vec<(usize, Vec<String>)>, ParseError> {
        let start = self.lines.line_at(table.span.start);
        let mut rows: Vec<(usize, Vec<String>)> = Vec::with_capacity(table.rows.len());
        for (line, text) in self.lines.table_rows(start) {
            let cells = split_row(text).map_err(|kind| ParseError::new(line, kind))?;
            if let Some((_, first)) = rows.first() {
                if first.len() != cells.len() {
                    return Err(ParseError::new(
                        line,
                        ParseErrorKind::ColumnCountMismatch {
                            expected: first.len(),
                            found: cells.len(),
                        },
                    ));
                }
            }
            rows.push((line, cells));
        }
        Ok(rows)
    }

    fn steps(&self, steps: &[gherkin::Step]) -> Result<Vec<Step>, ParseError> {
        let mut previous = None;
        let mut lowered = Vec::with_capacity(steps.len());
        for step in steps {
            let line = self.lines.keyword_line(step.span.start, &step.keyword);
            let keyword = step
                .keyword
                .parse::<StepKeyword>()
                .unwrap_or_else(|_| primary(step.ty));
            let argument = match (&step.table, &step.docstring) {
                (Some(table), _) => {
                    let rows = self.table(table)?.into_iter().map(|(_, cells)| cells).collect();
                    Some(StepArgument::Table(DataTable { rows }))
                }
                (None, Some(content)) => Some(StepArgument::DocString(
                    self.lines.doc_string(line).unwrap_or_else(|| DocString {
                        content: content.clone(),
                        media_type: None,
                    }),
                )),
                (None, None) => None,
            };
            lowered.push(Step {
                keyword,
                effective_keyword: keyword.resolve(&mut previous),
                text: step.value.trim().to_owned(),
                line,
                argument,
            });
        }
        Ok(lowered)
    }
}

/// Why `text` may not appear as free text, if it may not.
fn misplaced(text: &str, allowed: Prose) -> Option<ParseErrorKind> {
    if text.starts_with('|') {
        return Some(ParseErrorKind::ArgumentWithoutStep("data table"));
    }
    if fence_of(text).is_some() {
        return Some(ParseErrorKind::ArgumentWithoutStep("doc string"));
    }
    match allowed {
        Prose::Feature { line } if title(text, FEATURE).is_some() => {
            Some(ParseErrorKind::DuplicateFeature { first_line: line })
        }
        Prose::Feature { .. } if StepKeyword::split_line(text).is_some() => {
            Some(ParseErrorKind::StepOutsideScenario(text.to_owned()))
        }
        Prose::Feature { .. } => None,
        Prose::Block => Some(ParseErrorKind::UnexpectedLine(text.to_owned())),
    }
}

fn is_outline(keyword: &str) -> bool {
    OUTLINE.contains(&keyword.trim())
}

/// `gherkin` keeps `*` bullets and localised keywords in `keyword`; fall
/// back to the step type it resolved.
const fn primary(ty: StepType) -> StepKeyword {
    match ty {
        StepType::Given => StepKeyword::Given,
        StepType::When => StepKeyword::When,
        StepType::Then => StepKeyword::Then,
    }
}

fn tags_of(tags: &[String]) -> impl Iterator<Item = String> + '_ {
    tags.iter().map(|tag| {
        if tag.starts_with('@') {
            tag.clone()
        } else {
            format!("@{tag}")
        }
    })
}

fn substitute_at(text: &str, row: &DataRow, line: usize) -> Result<String, ParseError> {
    substitute(text, row)
        .map_err(|name| ParseError::new(line, ParseErrorKind::UnknownPlaceholder { name }))
}

fn substitute_step(step: &Step, row: &DataRow) -> Result<Step, ParseError> {
    let argument = match &step.argument {
        None => None,
        Some(StepArgument::Table(table)) => {
            let rows = table
                .rows
                .iter()
                .map(|cells| {
                    cells
                        .iter()
                        .map(|cell| substitute_at(cell, row, step.line))
                        .collect::<Result<Vec<_>, _>>()
                })
                .collect::<Result<Vec<_>, _>>()?;
            Some(StepArgument::Table(DataTable { rows }))
        }
        Some(StepArgument::DocString(doc)) => Some(StepArgument::DocString(DocString {
            content: substitute_at(&doc.content, row, step.line)?,
            media_type: doc.media_type.clone(),
        })),
    };
    Ok(Step {
        keyword: step.keyword,
        effective_keyword: step.effective_keyword,
        text: substitute_at(&step.text, row, step.line)?,
        line: step.line,
        argument,
    })
}
