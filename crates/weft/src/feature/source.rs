//! Line lookups over feature text.
//!
//! `gherkin` reports byte spans; everything the runtime exposes is a
//! one-based line. Table cells and doc strings are also re-read from here so
//! escapes and fence annotations come through exactly as written.

use super::model::DocString;

pub(super) const FENCES: [&str; 2] = ["\"\"\"", "```"];

pub(super) const FEATURE: &[&str] = &["Feature"];
pub(super) const BACKGROUND: &[&str] = &["Background"];
pub(super) const RULE: &[&str] = &["Rule"];
pub(super) const SCENARIO: &[&str] = &["Scenario", "Example"];
pub(super) const OUTLINE: &[&str] = &["Scenario Outline", "Scenario Template"];
pub(super) const EXAMPLES: &[&str] = &["Examples", "Scenarios"];

/// Return the title after `Keyword:` when `line` starts with one of
/// `keywords`.
pub(super) fn title<'a>(line: &'a str, keywords: &[&str]) -> Option<&'a str> {
    keywords.iter().find_map(|keyword| {
        line.strip_prefix(keyword)
            .and_then(|rest| rest.strip_prefix(':'))
            .map(str::trim)
    })
}

pub(super) fn is_structural(line: &str) -> bool {
    [FEATURE, BACKGROUND, RULE, SCENARIO, OUTLINE, EXAMPLES]
        .iter()
        .any(|keywords| title(line, keywords).is_some())
}

pub(super) fn fence_of(line: &str) -> Option<&'static str> {
    FENCES.into_iter().find(|fence| line.starts_with(fence))
}

fn indent_of(raw: &str) -> usize {
    raw.chars().take_while(|c| c.is_whitespace()).count()
}

fn strip_indent(raw: &str, indent: usize) -> &str {
    let mut rest = raw;
    for _ in 0..indent {
        let mut chars = rest.chars();
        match chars.next() {
            Some(c) if c.is_whitespace() => rest = chars.as_str(),
            _ => break,
        }
    }
    rest
}

/// Feature text split into lines, remembering where each line starts.
pub(super) struct SourceLines<'a> {
    starts: Vec<usize>,
    lines: Vec<&'a str>,
}

impl<'a> SourceLines<'a> {
    pub(super) fn new(source: &'a str) -> Self {
        let mut starts = Vec::new();
        let mut lines = Vec::new();
        let mut offset = 0;
        for raw in source.split_inclusive('\n') {
            starts.push(offset);
            offset += raw.len();
            let line = raw.strip_suffix('\n').unwrap_or(raw);
            lines.push(line.strip_suffix('\r').unwrap_or(line));
        }
        Self { starts, lines }
    }

    /// One-based line holding byte `offset`.
    pub(super) fn line_at(&self, offset: usize) -> usize {
        self.starts
            .partition_point(|&start| start <= offset)
            .max(1)
    }

    /// Lines from `line` onwards, paired with their one-based numbers.
    pub(super) fn from(&self, line: usize) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        self.lines
            .iter()
            .copied()
            .enumerate()
            .skip(line.saturating_sub(1))
            .map(|(index, text)| (index + 1, text))
    }

    /// First line at or after the one holding `offset` that starts with
    /// `keyword`.
    ///
    /// Spans of tagged elements begin at their tags; the keyword line is what
    /// users see in reports.
    pub(super) fn keyword_line(&self, offset: usize, keyword: &str) -> usize {
        let start = self.line_at(offset);
        let keyword = keyword.trim();
        self.from(start)
            .find(|(_, text)| text.trim_start().starts_with(keyword))
            .map_or(start, |(line, _)| line)
    }

    /// First line after `after` whose trimmed text is `text`.
    pub(super) fn find_after(&self, after: usize, text: &str) -> usize {
        self.from(after + 1)
            .find(|(_, candidate)| candidate.trim() == text)
            .map_or(after, |(line, _)| line)
    }

    /// Trimmed `|` rows of the first table starting at or after `line`.
    pub(super) fn table_rows(&self, line: usize) -> Vec<(usize, &'a str)> {
        self.from(line)
            .map(|(number, text)| (number, text.trim()))
            .skip_while(|(_, text)| !text.starts_with('|'))
            .filter(|(_, text)| !text.is_empty() && !text.starts_with('#'))
            .take_while(|(_, text)| text.starts_with('|'))
            .collect()
    }

    /// Doc string opened by the first fence after `line`, with the fence's
    /// indentation removed from every content line.
    pub(super) fn doc_string(&self, line: usize) -> Option<DocString> {
        let mut lines = self.from(line + 1);
        let (indent, fence, annotation) = lines.by_ref().find_map(|(_, raw)| {
            let trimmed = raw.trim_start();
            fence_of(trimmed).map(|fence| {
                let annotation = trimmed.get(fence.len()..).unwrap_or_default().trim();
                (indent_of(raw), fence, annotation)
            })
        })?;
        let content: Vec<_> = lines
            .take_while(|(_, raw)| raw.trim() != fence)
            .map(|(_, raw)| strip_indent(raw, indent))
            .collect();
        Some(DocString {
            content: content.join("\n"),
            media_type: (!annotation.is_empty()).then(|| annotation.to_owned()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEXT: &str = "Feature: f\n  @tag\n  Scenario: s\n    Given a\n";

    #[test]
    fn offsets_map_to_lines() {
        let lines = SourceLines::new(TEXT);
        assert_eq!(lines.line_at(0), 1);
        assert_eq!(lines.line_at(11), 2);
        assert_eq!(lines.line_at(TEXT.len()), 4);
    }

    #[test]
    fn keyword_line_skips_tags() {
        let lines = SourceLines::new(TEXT);
        let tag = TEXT.find('@').unwrap_or_default();
        assert_eq!(lines.keyword_line(tag, "Scenario"), 3);
    }

    #[test]
    fn table_rows_skip_comments() {
        let lines = SourceLines::new("Given t\n  | a |\n  # note\n  | b |\nThen u\n");
        let rows: Vec<_> = lines.table_rows(1).into_iter().map(|(line, _)| line).collect();
        assert_eq!(rows, [2, 4]);
    }
}
