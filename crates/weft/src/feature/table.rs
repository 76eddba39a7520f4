//! Splitting of `|`-delimited table rows.

use super::error::ParseErrorKind;

/// Split a trimmed table row into trimmed, unescaped cells.
///
/// `\|` is a literal pipe, `\\` a backslash and `\n` a newline; any other
/// escape is kept as written. The row must start and end with an unescaped
/// `|`.
pub(super) fn split_row(line: &str) -> Result<Vec<String>, ParseErrorKind> {
    let unexpected = || ParseErrorKind::UnexpectedLine(line.to_owned());
    let body = line.strip_prefix('|').ok_or_else(unexpected)?;

    let mut cells = Vec::new();
    let mut cell = String::new();
    let mut closed = false;
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        closed = false;
        match ch {
            '\\' => match chars.next() {
                Some('|') => cell.push('|'),
                Some('\\') => cell.push('\\'),
                Some('n') => cell.push('\n'),
                Some(other) => {
                    cell.push('\\');
                    cell.push(other);
                }
                None => cell.push('\\'),
            },
            '|' => {
                cells.push(trim_cell(&cell));
                cell.clear();
                closed = true;
            }
            _ => cell.push(ch),
        }
    }
    if !closed || cells.is_empty() {
        return Err(unexpected());
    }
    Ok(cells)
}

fn trim_cell(cell: &str) -> String {
    cell.trim_matches(|c| c == ' ' || c == '\t').to_owned()
}
