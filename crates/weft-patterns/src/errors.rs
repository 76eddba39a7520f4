//! Error types raised while classifying and compiling step patterns.

use std::fmt;
use thiserror::Error;

/// Location and cause of a malformed placeholder.
///
/// # Examples
/// ```
/// use weft_patterns::PlaceholderErrorInfo;
/// let info = PlaceholderErrorInfo::new("invalid placeholder", 3, Some("user".into()));
/// assert_eq!(info.placeholder.as_deref(), Some("user"));
/// assert_eq!(info.position, 3);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaceholderErrorInfo {
    /// Short description of what is wrong.
    pub message: &'static str,
    /// Zero-based byte offset of the opening brace.
    pub position: usize,
    /// Placeholder name, when one was read before the failure.
    pub placeholder: Option<String>,
}

impl PlaceholderErrorInfo {
    /// Describe a placeholder failure at `position`.
    #[must_use]
    pub fn new(message: &'static str, position: usize, placeholder: Option<String>) -> Self {
        Self {
            message,
            position,
            placeholder,
        }
    }
}

impl fmt::Display for PlaceholderErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.placeholder {
            Some(name) => write!(f, "{} `{{{name}}}` at byte {}", self.message, self.position),
            None => write!(f, "{} at byte {}", self.message, self.position),
        }
    }
}

/// Errors surfaced while turning a step pattern into a regular expression.
#[derive(Debug, Error)]
pub enum PatternError {
    /// An expression pattern contains a malformed placeholder.
    #[error("{0}")]
    Placeholder(PlaceholderErrorInfo),
    /// The pattern text is empty or only whitespace.
    #[error("step pattern must not be empty")]
    Empty,
    /// The generated or user-supplied regex failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),
}

pub(crate) fn placeholder_error(
    message: &'static str,
    position: usize,
    placeholder: Option<String>,
) -> PatternError {
    PatternError::Placeholder(PlaceholderErrorInfo::new(message, position, placeholder))
}
