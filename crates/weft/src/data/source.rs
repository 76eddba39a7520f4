//! Data source declarations.

use std::fmt;

use camino::Utf8PathBuf;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ConfigurationError;

/// Kind of data source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SourceType {
    /// Spreadsheet workbook, read through a [`TabularReader`](super::TabularReader).
    Excel,
    /// Delimited text, read through a [`DelimitedReader`](super::DelimitedReader).
    Csv,
    /// JSON document, read through a [`DocumentReader`](super::DocumentReader).
    Json,
    /// Query results, fetched through a [`QueryExecutor`](super::QueryExecutor).
    Database,
}

impl SourceType {
    /// Name as written in declarations.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Excel => "EXCEL",
            Self::Csv => "CSV",
            Self::Json => "JSON",
            Self::Database => "DATABASE",
        }
    }

    /// Return `true` for sources read from a file path.
    #[must_use]
    pub fn is_file(self) -> bool {
        !matches!(self, Self::Database)
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of where a data-driven test gets its rows.
///
/// Keys are camelCase so declarations can be written in JSON or TOML:
///
/// ```
/// use weft::data::{DataSourceSpec, SourceType};
///
/// let spec: DataSourceSpec = serde_json::from_str(
///     r#"{"type": "CSV", "path": "users.csv", "filter": "age>=30"}"#,
/// )
/// .unwrap_or_else(|err| panic!("{err}"));
/// assert_eq!(spec.source_type, SourceType::Csv);
/// assert!(spec.has_header);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceSpec {
    /// Kind of source.
    #[serde(rename = "type")]
    pub source_type: SourceType,
    /// File path for file sources.
    #[serde(default)]
    pub path: Option<Utf8PathBuf>,
    /// Named connection for database sources.
    #[serde(default)]
    pub source: Option<String>,
    /// Worksheet to read; spreadsheets only.
    #[serde(default)]
    pub sheet: Option<String>,
    /// Whether the first row names the fields.
    #[serde(default = "default_has_header")]
    pub has_header: bool,
    /// Inline query for database sources.
    #[serde(default)]
    pub query: Option<String>,
    /// Key into the provider's named-query catalogue.
    #[serde(default)]
    pub query_key: Option<String>,
    /// Query parameters written as `name:value`.
    #[serde(default)]
    pub query_params: Vec<String>,
    /// Field the key allow-list applies to.
    #[serde(default)]
    pub key_field: Option<String>,
    /// Values of `key_field` to keep, as a list or a comma-separated string.
    #[serde(default, deserialize_with = "one_or_many")]
    pub key_values: Vec<String>,
    /// Post-load filter expression.
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_has_header() -> bool {
    true
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(joined) => split_list(&joined),
        OneOrMany::Many(values) => values,
    })
}

fn split_list(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}

impl DataSourceSpec {
    fn bare(source_type: SourceType) -> Self {
        Self {
            source_type,
            path: None,
            source: None,
            sheet: None,
            has_header: true,
            query: None,
            query_key: None,
            query_params: Vec::new(),
            key_field: None,
            key_values: Vec::new(),
            filter: None,
        }
    }

    /// Spreadsheet source at `path`.
    #[must_use]
    pub fn excel(path: impl Into<Utf8PathBuf>) -> Self {
        Self::file(SourceType::Excel, path)
    }

    /// Delimited source at `path`.
    #[must_use]
    pub fn csv(path: impl Into<Utf8PathBuf>) -> Self {
        Self::file(SourceType::Csv, path)
    }

    /// JSON source at `path`.
    #[must_use]
    pub fn json(path: impl Into<Utf8PathBuf>) -> Self {
        Self::file(SourceType::Json, path)
    }

    fn file(source_type: SourceType, path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::bare(source_type)
        }
    }

    /// Database source with no query yet.
    #[must_use]
    pub fn database() -> Self {
        Self::bare(SourceType::Database)
    }

    /// Declaration of `source_type` with no options set.
    #[must_use]
    pub fn of(source_type: SourceType) -> Self {
        Self::bare(source_type)
    }

    /// Read `sheet`.
    #[must_use]
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    /// Set whether the first row is a header.
    #[must_use]
    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Use the named connection `source`.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Run an inline query.
    #[must_use]
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Run the catalogue query named `key`.
    #[must_use]
    pub fn with_query_key(mut self, key: impl Into<String>) -> Self {
        self.query_key = Some(key.into());
        self
    }

    /// Add a `name:value` query parameter.
    #[must_use]
    pub fn with_query_param(mut self, param: impl Into<String>) -> Self {
        self.query_params.push(param.into());
        self
    }

    /// Keep only rows whose `field` is one of `values`.
    #[must_use]
    pub fn with_keys<I, S>(mut self, field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_field = Some(field.into());
        self.key_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Apply a `field<op>value` filter after loading.
    #[must_use]
    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.filter = Some(filter.into());
        self
    }
}

/// A `name:value` query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryParam {
    /// Parameter name.
    pub name: String,
    /// Parameter value.
    pub value: String,
}

impl QueryParam {
    /// Parse `name:value`, splitting on the first `:`.
    ///
    /// ```
    /// use weft::data::QueryParam;
    ///
    /// let param = QueryParam::parse("url:http://host").unwrap_or_else(|err| panic!("{err}"));
    /// assert_eq!(param.name, "url");
    /// assert_eq!(param.value, "http://host");
    /// ```
    ///
    /// # Errors
    /// Returns [`ConfigurationError::MalformedQueryParam`] when there is no
    /// `:` or the name is empty.
    pub fn parse(raw: &str) -> Result<Self, ConfigurationError> {
        let (name, value) = raw
            .split_once(':')
            .ok_or_else(|| ConfigurationError::MalformedQueryParam(raw.to_owned()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ConfigurationError::MalformedQueryParam(raw.to_owned()));
        }
        Ok(Self {
            name: name.to_owned(),
            value: value.trim().to_owned(),
        })
    }
}
