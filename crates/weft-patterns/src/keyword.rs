//! Step keywords and recognition of keyword-prefixed step lines.

use std::fmt;
use std::str::FromStr;

/// Keyword that introduces a step line.
///
/// `And` and `But` continue the previous primary keyword; use
/// [`resolve`](Self::resolve) to find the keyword they stand for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StepKeyword {
    /// Preconditions.
    Given,
    /// Actions.
    When,
    /// Expected outcomes.
    Then,
    /// Continues the previous keyword.
    And,
    /// Contrasting continuation of the previous keyword.
    But,
}

impl StepKeyword {
    /// Every keyword, in the order the parser tries them.
    pub const ALL: [Self; 5] = [Self::Given, Self::When, Self::Then, Self::And, Self::But];

    /// Canonical spelling.
    ///
    /// ```
    /// use weft_patterns::StepKeyword;
    /// assert_eq!(StepKeyword::Given.as_str(), "Given");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
            Self::But => "But",
        }
    }

    /// Return `true` for `And` and `But`.
    #[must_use]
    pub const fn is_conjunction(&self) -> bool {
        matches!(self, Self::And | Self::But)
    }

    /// Resolve conjunctions against the last primary keyword seen.
    ///
    /// Primary keywords update `prev`; conjunctions return it, defaulting to
    /// `Given` when nothing precedes them.
    ///
    /// ```
    /// use weft_patterns::StepKeyword;
    /// let mut prev = None;
    /// assert_eq!(StepKeyword::When.resolve(&mut prev), StepKeyword::When);
    /// assert_eq!(StepKeyword::And.resolve(&mut prev), StepKeyword::When);
    /// ```
    #[must_use]
    pub fn resolve(self, prev: &mut Option<Self>) -> Self {
        if self.is_conjunction() {
            prev.unwrap_or(Self::Given)
        } else {
            *prev = Some(self);
            self
        }
    }

    /// Split a trimmed step line into its keyword and text.
    ///
    /// The keyword must be followed by whitespace; matching is case-sensitive
    /// as in Gherkin.
    ///
    /// ```
    /// use weft_patterns::StepKeyword;
    /// assert_eq!(
    ///     StepKeyword::split_line("When the user logs in"),
    ///     Some((StepKeyword::When, "the user logs in"))
    /// );
    /// assert_eq!(StepKeyword::split_line("Whenever it rains"), None);
    /// ```
    #[must_use]
    pub fn split_line(line: &str) -> Option<(Self, &str)> {
        Self::ALL.into_iter().find_map(|keyword| {
            let rest = line.strip_prefix(keyword.as_str())?;
            let text = rest.strip_prefix(char::is_whitespace)?;
            Some((keyword, text.trim()))
        })
    }
}

impl fmt::Display for StepKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string is not a step keyword.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid step keyword: {0}")]
pub struct StepKeywordParseError(pub String);

impl FromStr for StepKeyword {
    type Err = StepKeywordParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|keyword| trimmed.eq_ignore_ascii_case(keyword.as_str()))
            .ok_or_else(|| StepKeywordParseError(trimmed.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Given", StepKeyword::Given)]
    #[case(" when ", StepKeyword::When)]
    #[case("THEN", StepKeyword::Then)]
    #[case("and", StepKeyword::And)]
    #[case("But", StepKeyword::But)]
    fn parses_case_insensitively(#[case] input: &str, #[case] expected: StepKeyword) {
        assert_eq!(input.parse::<StepKeyword>(), Ok(expected));
    }

    #[test]
    fn rejects_unknown_keyword() {
        assert_eq!(
            "Suppose".parse::<StepKeyword>(),
            Err(StepKeywordParseError("Suppose".into()))
        );
    }

    #[rstest]
    #[case("Given a user", Some((StepKeyword::Given, "a user")))]
    #[case("But\tnot an admin", Some((StepKeyword::But, "not an admin")))]
    #[case("Andrew is here", None)]
    #[case("given lower case", None)]
    #[case("Then", None)]
    fn splits_step_lines(#[case] line: &str, #[case] expected: Option<(StepKeyword, &str)>) {
        assert_eq!(StepKeyword::split_line(line), expected);
    }

    #[test]
    fn conjunctions_do_not_update_previous() {
        let mut prev = Some(StepKeyword::Then);
        assert_eq!(StepKeyword::But.resolve(&mut prev), StepKeyword::Then);
        assert_eq!(prev, Some(StepKeyword::Then));
    }

    #[test]
    fn conjunctions_default_to_given() {
        let mut prev = None;
        assert_eq!(StepKeyword::And.resolve(&mut prev), StepKeyword::Given);
        assert_eq!(prev, None);
    }
}
