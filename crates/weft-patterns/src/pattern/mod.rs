//! Step-pattern classification and compilation.
//!
//! A pattern is one of three kinds. Regex patterns are recognised by a
//! leading `^` or trailing `$`; every other pattern goes through the
//! expression lexer and is a literal when it declares no placeholders.

mod compiler;
mod lexer;

use std::fmt;

use regex::Regex;

use crate::capture::extract_captures;
use crate::errors::PatternError;
use crate::hint::PlaceholderType;

pub use compiler::{ExpressionSource, PlaceholderSpec, anchor_regex, build_expression_regex};

/// How a pattern's text is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternKind {
    /// Matches the step text exactly.
    Literal,
    /// A regular expression; every capture group is an argument.
    Regex,
    /// Text with `{name}` or `{name:hint}` placeholders.
    Expression,
}

impl PatternKind {
    /// Lowercase label used in diagnostics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Literal => "literal",
            Self::Regex => "regex",
            Self::Expression => "expression",
        }
    }
}

impl fmt::Display for PatternKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return `true` when `text` is written as a regular expression.
#[must_use]
pub fn looks_like_regex(text: &str) -> bool {
    text.starts_with('^') || text.ends_with('$')
}

/// A compiled step pattern ready for matching.
///
/// # Examples
/// ```
/// use weft_patterns::{CompiledPattern, PatternKind};
///
/// let pattern = CompiledPattern::compile("the user {name:word} has {n:int} items")
///     .unwrap_or_else(|err| panic!("pattern should compile: {err}"));
/// assert_eq!(pattern.kind(), PatternKind::Expression);
/// assert_eq!(
///     pattern.captures("the user alice has 3 items"),
///     Some(vec!["alice".to_string(), "3".to_string()])
/// );
/// assert!(pattern.captures("the user alice has many items").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    text: String,
    kind: PatternKind,
    regex: Regex,
    types: Vec<PlaceholderType>,
}

impl CompiledPattern {
    /// Classify and compile `text`.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the text is empty, a placeholder is
    /// malformed, or the regex does not compile.
    pub fn compile(text: &str) -> Result<Self, PatternError> {
        if looks_like_regex(text) {
            Self::regex(text)
        } else {
            Self::expression(text)
        }
    }

    /// Compile `text` as a regular expression regardless of its anchors.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the text is empty or the regex is invalid.
    pub fn regex(text: &str) -> Result<Self, PatternError> {
        if text.trim().is_empty() {
            return Err(PatternError::Empty);
        }
        let regex = Regex::new(&anchor_regex(text))?;
        let groups = regex.captures_len().saturating_sub(1);
        Ok(Self {
            text: text.to_owned(),
            kind: PatternKind::Regex,
            regex,
            types: vec![PlaceholderType::Any; groups],
        })
    }

    /// Compile `text` as an expression, or a literal when it has no
    /// placeholders.
    ///
    /// # Errors
    /// Returns [`PatternError`] when the text is empty or malformed.
    pub fn expression(text: &str) -> Result<Self, PatternError> {
        if text.trim().is_empty() {
            return Err(PatternError::Empty);
        }
        let source = build_expression_regex(text)?;
        let kind = if source.placeholders.is_empty() {
            PatternKind::Literal
        } else {
            PatternKind::Expression
        };
        let regex = Regex::new(&source.regex)?;
        Ok(Self {
            text: text.to_owned(),
            kind,
            regex,
            types: source.placeholders.iter().map(|p| p.ty).collect(),
        })
    }

    /// Pattern text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Interpretation chosen for the text.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.kind
    }

    /// Number of arguments a match yields.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.types.len()
    }

    /// Return `true` when the pattern matches the whole of `text`.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Extract argument values when the pattern matches `text`.
    #[must_use]
    pub fn captures(&self, text: &str) -> Option<Vec<String>> {
        extract_captures(&self.regex, &self.types, text)
    }
}

impl fmt::Display for CompiledPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} `{}`", self.kind, self.text)
    }
}
