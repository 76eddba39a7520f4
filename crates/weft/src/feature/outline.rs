//! `<column>` substitution for scenario outlines.

use crate::row::DataRow;

/// Replace every `<column>` in `text` with the row's value.
///
/// A bracketed name is a placeholder when it is non-empty, contains no
/// newline and has no surrounding whitespace; anything else is kept as
/// literal text. Returns the name of the first placeholder that names no
/// column.
pub(super) fn substitute(text: &str, row: &DataRow) -> Result<String, String> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('<') {
        let (before, tail) = rest.split_at(open);
        out.push_str(before);
        let after_open = tail.get(1..).unwrap_or_default();
        let name = after_open
            .find(['>', '<'])
            .filter(|&end| after_open.get(end..).is_some_and(|s| s.starts_with('>')))
            .and_then(|end| after_open.get(..end))
            .filter(|name| is_placeholder_name(name));
        match name {
            Some(name) => {
                let value = row.get(name).ok_or_else(|| name.to_owned())?;
                out.push_str(value);
                rest = after_open.get(name.len() + 1..).unwrap_or_default();
            }
            None => {
                out.push('<');
                rest = after_open;
            }
        }
    }
    out.push_str(rest);
    Ok(out)
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('\n') && name.trim() == name
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn row() -> DataRow {
        DataRow::from_pairs([("user", "ann"), ("first name", "Ann"), ("n", "3")])
    }

    #[rstest]
    #[case("the user <user> logs in", "the user ann logs in")]
    #[case("<n> items for <user>", "3 items for ann")]
    #[case("hello <first name>", "hello Ann")]
    #[case("no placeholders", "no placeholders")]
    #[case("1 < 2 and 3 > 2", "1 < 2 and 3 > 2")]
    #[case("<<user>>", "<ann>")]
    #[case("<>", "<>")]
    #[case("trailing <", "trailing <")]
    fn substitutes_known_columns(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(substitute(text, &row()), Ok(expected.to_owned()));
    }

    #[test]
    fn reports_unknown_column() {
        assert_eq!(substitute("the <role> page", &row()), Err("role".to_owned()));
    }
}
