//! Turn lexed expression tokens into an anchored regex source.

use crate::errors::{PatternError, placeholder_error};
use crate::hint::PlaceholderType;

use super::lexer::{Token, lex_pattern};

/// A placeholder declared by an expression pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderSpec {
    /// Name written between the braces.
    pub name: String,
    /// Accepted text shape.
    pub ty: PlaceholderType,
}

/// Regex source plus the placeholders appearing in it, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpressionSource {
    /// Anchored regex source.
    pub regex: String,
    /// Placeholders in declaration order; one capture group each.
    pub placeholders: Vec<PlaceholderSpec>,
}

fn placeholder_type(name: &str, hint: Option<&str>) -> PlaceholderType {
    match hint {
        Some(hint) => PlaceholderType::from_hint(Some(hint)),
        None => PlaceholderType::known(name).unwrap_or(PlaceholderType::Any),
    }
}

/// Build an anchored regex from an expression pattern.
///
/// # Errors
/// Returns [`PatternError`] for malformed placeholders or unbalanced braces.
///
/// # Examples
/// ```
/// use weft_patterns::build_expression_regex;
/// let source = build_expression_regex("I have {count:u32} cukes")
///     .unwrap_or_else(|err| panic!("pattern should compile: {err}"));
/// assert_eq!(source.regex, r"^I have (\d+) cukes$");
/// assert_eq!(source.placeholders.len(), 1);
/// ```
pub fn build_expression_regex(pattern: &str) -> Result<ExpressionSource, PatternError> {
    let tokens = lex_pattern(pattern)?;
    let mut regex = String::with_capacity(pattern.len().saturating_mul(2) + 2);
    let mut placeholders = Vec::new();
    let mut stray_depth = 0usize;
    regex.push('^');

    for token in tokens {
        match token {
            Token::Literal(text) => regex.push_str(&regex::escape(&text)),
            Token::Placeholder { name, hint, .. } => {
                let ty = placeholder_type(&name, hint.as_deref());
                regex.push_str(ty.capture_fragment());
                placeholders.push(PlaceholderSpec { name, ty });
            }
            Token::OpenBrace { .. } => {
                stray_depth = stray_depth.saturating_add(1);
                regex.push_str(r"\{");
            }
            Token::CloseBrace { index } => {
                if stray_depth == 0 {
                    return Err(placeholder_error(
                        "unmatched closing brace '}' in step pattern",
                        index,
                        None,
                    ));
                }
                stray_depth -= 1;
                regex.push_str(r"\}");
            }
        }
    }

    if stray_depth != 0 {
        return Err(placeholder_error(
            "unbalanced braces in step pattern",
            pattern.len(),
            None,
        ));
    }

    regex.push('$');
    Ok(ExpressionSource {
        regex,
        placeholders,
    })
}

/// Anchor a user-supplied regex so it must match the whole step text.
///
/// Existing `^` and trailing unescaped `$` anchors are kept out of the group
/// so alternations inside the pattern cannot escape the anchors.
#[must_use]
pub fn anchor_regex(pattern: &str) -> String {
    let body = pattern.strip_prefix('^').unwrap_or(pattern);
    let body = match body.strip_suffix('$') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => body,
    };
    format!("^(?:{body})$")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_type_names_act_as_hints() {
        let source = build_expression_regex("I wait {int} seconds")
            .unwrap_or_else(|err| panic!("pattern should compile: {err}"));
        assert_eq!(source.regex, r"^I wait ([+-]?\d+) seconds$");
        assert_eq!(source.placeholders.first().map(|p| p.ty), Some(PlaceholderType::Signed));
    }

    #[test]
    fn untyped_placeholders_match_lazily() {
        let source = build_expression_regex("the user {name} logs in")
            .unwrap_or_else(|err| panic!("pattern should compile: {err}"));
        assert_eq!(source.regex, r"^the user (.+?) logs in$");
    }

    #[test]
    fn balanced_stray_braces_are_literal() {
        let source = build_expression_regex("payload { }")
            .unwrap_or_else(|err| panic!("pattern should compile: {err}"));
        assert_eq!(source.regex, r"^payload \{ \}$");
        assert!(source.placeholders.is_empty());
    }

    #[test]
    fn unmatched_closing_brace_fails() {
        let Err(err) = build_expression_regex("broken}") else {
            panic!("pattern should fail");
        };
        assert!(err.to_string().contains("unmatched closing brace"));
    }

    #[test]
    fn open_stray_brace_fails() {
        let Err(err) = build_expression_regex("broken { ") else {
            panic!("pattern should fail");
        };
        assert!(err.to_string().contains("unbalanced braces"));
    }

    #[test]
    fn anchors_wrap_alternations() {
        assert_eq!(anchor_regex("^yes|no$"), "^(?:yes|no)$");
        assert_eq!(anchor_regex("costs \\$"), "^(?:costs \\$)$");
        assert_eq!(anchor_regex("plain"), "^(?:plain)$");
    }
}
