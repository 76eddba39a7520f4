//! Post-load row filter expressions.
//!
//! An expression has the form `field<op>value`. It is split once, at the
//! first operator found scanning left to right; at any position a
//! two-character operator wins over its one-character prefix. Everything
//! after the operator is the value, so `note=a=b` compares `note` with
//! `a=b`.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigurationError;
use crate::row::DataRow;

/// Comparison operator of a filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`
    Eq,
    /// `!=`
    Ne,
    /// `>`
    Gt,
    /// `<`
    Lt,
    /// `>=`
    Ge,
    /// `<=`
    Le,
}

// Two-character operators first.
const OPERATORS: [(&str, Comparison); 6] = [
    (">=", Comparison::Ge),
    ("<=", Comparison::Le),
    ("!=", Comparison::Ne),
    (">", Comparison::Gt),
    ("<", Comparison::Lt),
    ("=", Comparison::Eq),
];

impl Comparison {
    /// Operator as written.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Lt => "<",
            Self::Ge => ">=",
            Self::Le => "<=",
        }
    }

    fn is_ordering(self) -> bool {
        !matches!(self, Self::Eq | Self::Ne)
    }

    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering.is_eq(),
            Self::Ne => ordering.is_ne(),
            Self::Gt => ordering.is_gt(),
            Self::Lt => ordering.is_lt(),
            Self::Ge => ordering.is_ge(),
            Self::Le => ordering.is_le(),
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed `field<op>value` expression.
///
/// `=` and `!=` compare text exactly. Ordering operators compare as numbers
/// when both sides parse as `f64` and as text when neither does. Rows
/// without the field never match.
///
/// When only one side is numeric the row does not match. This intentionally
/// departs from falling back to a lexicographic comparison, which would let
/// `age>=30` keep a row whose age is `abc` because `"abc" > "30"` as text.
///
/// ```
/// use weft::DataRow;
/// use weft::data::Filter;
///
/// let filter: Filter = "age>=30".parse().unwrap_or_else(|err| panic!("{err}"));
/// let ages = ["25", "31", "abc"];
/// let kept: Vec<_> = ages
///     .iter()
///     .filter(|age| filter.matches(&DataRow::from_pairs([("age", **age)])))
///     .collect();
/// assert_eq!(kept, [&"31"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    field: String,
    comparison: Comparison,
    value: String,
    numeric: Option<f64>,
}

impl Filter {
    /// Parse `expression`.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidFilter`] when the expression has
    /// no operator or no field name.
    pub fn parse(expression: &str) -> Result<Self, ConfigurationError> {
        let invalid = |reason| ConfigurationError::InvalidFilter {
            expression: expression.to_owned(),
            reason,
        };
        let (at, token, comparison) = expression
            .char_indices()
            .find_map(|(at, _)| {
                let rest = expression.get(at..)?;
                OPERATORS
                    .iter()
                    .find(|(token, _)| rest.starts_with(token))
                    .map(|&(token, comparison)| (at, token, comparison))
            })
            .ok_or_else(|| invalid("no comparison operator"))?;
        let field = expression.get(..at).map(str::trim).unwrap_or_default();
        if field.is_empty() {
            return Err(invalid("missing field name"));
        }
        let value = expression
            .get(at + token.len()..)
            .map(str::trim)
            .unwrap_or_default();
        Ok(Self {
            field: field.to_owned(),
            comparison,
            value: value.to_owned(),
            numeric: parse_number(value),
        })
    }

    /// Field the filter reads.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Operator.
    #[must_use]
    pub fn comparison(&self) -> Comparison {
        self.comparison
    }

    /// Right-hand side as written, trimmed.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Return `true` when `row` satisfies the expression.
    #[must_use]
    pub fn matches(&self, row: &DataRow) -> bool {
        let Some(actual) = row.get(&self.field) else {
            return false;
        };
        if !self.comparison.is_ordering() {
            return self.comparison.accepts(actual.cmp(self.value.as_str()));
        }
        let ordering = match (parse_number(actual), self.numeric) {
            (Some(lhs), Some(rhs)) => lhs.partial_cmp(&rhs),
            (None, None) => Some(actual.cmp(self.value.as_str())),
            _ => None,
        };
        ordering.is_some_and(|ordering| self.comparison.accepts(ordering))
    }
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|number| number.is_finite())
}

impl FromStr for Filter {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.field, self.comparison, self.value)
    }
}
