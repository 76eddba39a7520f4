//! Named-value records driving parameterised runs.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One ordered record of field name to value.
///
/// Rows are plain owned values: cloning a row yields a fully independent
/// copy, which is how scenarios and data-driven invocations keep from
/// observing each other's edits.
///
/// ```
/// use weft::DataRow;
///
/// let mut row = DataRow::from_pairs([("user", "a"), ("role", "admin")]);
/// let copy = row.clone();
/// row.insert("user", "x");
/// assert_eq!(row.get("user"), Some("x"));
/// assert_eq!(copy.get("user"), Some("a"));
/// assert_eq!(copy.fields().collect::<Vec<_>>(), ["user", "role"]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRow(IndexMap<String, String>);

impl DataRow {
    /// Create an empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a row from `(field, value)` pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    /// Zip a header with a row of cells.
    ///
    /// Callers are responsible for checking that the lengths agree; surplus
    /// cells on either side are dropped.
    pub fn from_header<'a>(
        header: impl IntoIterator<Item = &'a String>,
        cells: impl IntoIterator<Item = String>,
    ) -> Self {
        Self(header.into_iter().cloned().zip(cells).collect())
    }

    /// Value of `field`, if present.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    /// Set `field` to `value`, returning the previous value.
    ///
    /// New fields are appended; existing ones keep their position.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(field.into(), value.into())
    }

    /// Remove `field`, preserving the order of the remaining fields.
    pub fn remove(&mut self, field: &str) -> Option<String> {
        self.0.shift_remove(field)
    }

    /// Return `true` when `field` is present.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Field names in order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `(field, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when the row has no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for DataRow {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_pairs(iter)
    }
}

impl fmt::Display for DataRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (index, (field, value)) in self.iter().enumerate() {
            if index > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={value}")?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displays_fields_in_order() {
        let row = DataRow::from_pairs([("user", "a"), ("age", "31")]);
        assert_eq!(row.to_string(), "{user=a, age=31}");
    }

    #[test]
    fn remove_keeps_remaining_order() {
        let mut row = DataRow::from_pairs([("a", "1"), ("b", "2"), ("c", "3")]);
        assert_eq!(row.remove("a"), Some("1".into()));
        assert_eq!(row.fields().collect::<Vec<_>>(), ["b", "c"]);
    }

    #[test]
    fn zips_header_with_cells() {
        let header = vec!["user".to_string(), "age".to_string()];
        let row = DataRow::from_header(&header, vec!["bob".to_string(), "40".to_string()]);
        assert_eq!(row.get("age"), Some("40"));
        assert_eq!(row.len(), 2);
    }
}
