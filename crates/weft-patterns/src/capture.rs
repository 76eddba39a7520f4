//! Capture extraction shared by every pattern kind.

use regex::Regex;

use crate::hint::PlaceholderType;

fn unquote(value: &str) -> &str {
    let mut chars = value.chars();
    match (chars.next(), chars.next_back()) {
        (Some(open @ ('"' | '\'')), Some(close)) if open == close => chars.as_str(),
        _ => value,
    }
}

/// Extract placeholder captures when `text` matches `re`, or `None`.
///
/// Group 0 is skipped. Groups that did not participate yield empty strings so
/// positions stay aligned with `types`; quoted-string placeholders have their
/// quotes removed.
///
/// # Examples
/// ```
/// use regex::Regex;
/// use weft_patterns::{PlaceholderType, extract_captures};
/// let re = Regex::new(r"^(\d+)-(\w+)$").unwrap_or_else(|err| panic!("{err}"));
/// let types = [PlaceholderType::Unsigned, PlaceholderType::Word];
/// assert_eq!(
///     extract_captures(&re, &types, "42-answer"),
///     Some(vec!["42".to_string(), "answer".to_string()])
/// );
/// assert!(extract_captures(&re, &types, "nope").is_none());
/// ```
#[must_use]
pub fn extract_captures(re: &Regex, types: &[PlaceholderType], text: &str) -> Option<Vec<String>> {
    let caps = re.captures(text)?;
    let values = caps
        .iter()
        .skip(1)
        .enumerate()
        .map(|(index, group)| {
            let raw = group.map_or("", |m| m.as_str());
            match types.get(index) {
                Some(PlaceholderType::QuotedString) => unquote(raw).to_owned(),
                _ => raw.to_owned(),
            }
        })
        .collect();
    Some(values)
}
