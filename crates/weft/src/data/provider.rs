//! Turning source declarations into rows.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use camino::Utf8PathBuf;
use dashmap::DashMap;
use tracing::{debug, debug_span, trace};

use super::filter::Filter;
use super::json::JsonDocumentReader;
use super::reader::{DelimitedReader, DocumentReader, QueryExecutor, SourceError, TabularReader};
use super::source::{DataSourceSpec, QueryParam, SourceType};
use super::DataError;
use crate::error::ConfigurationError;
use crate::row::DataRow;

const DEFAULT_CONNECTION: &str = "default";

/// Identity of a cached file read.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    source_type: SourceType,
    path: Utf8PathBuf,
    sheet: Option<String>,
    has_header: bool,
}

/// A validated read.
#[derive(Debug)]
enum Read {
    File(CacheKey),
    Query {
        source: String,
        query: String,
        params: Vec<QueryParam>,
    },
}

impl Read {
    fn location(&self) -> String {
        match self {
            Self::File(key) => key.path.to_string(),
            Self::Query { source, .. } => source.clone(),
        }
    }
}

/// A validated declaration.
#[derive(Debug)]
struct Plan {
    source_type: SourceType,
    read: Read,
    keys: Option<(String, Vec<String>)>,
    filter: Option<Filter>,
}

impl Plan {
    fn keeps(&self, row: &DataRow) -> bool {
        let allowed = self.keys.as_ref().is_none_or(|(field, values)| {
            row.get(field)
                .is_some_and(|value| values.iter().any(|allowed| allowed == value))
        });
        allowed && self.filter.as_ref().is_none_or(|filter| filter.matches(row))
    }
}

/// Builder for [`DataProvider`].
#[must_use]
pub struct DataProviderBuilder {
    tabular: Option<Arc<dyn TabularReader>>,
    delimited: Option<Arc<dyn DelimitedReader>>,
    document: Option<Arc<dyn DocumentReader>>,
    query: Option<Arc<dyn QueryExecutor>>,
    queries: HashMap<String, String>,
}

impl Default for DataProviderBuilder {
    fn default() -> Self {
        Self {
            tabular: None,
            delimited: None,
            document: Some(Arc::new(JsonDocumentReader::new())),
            query: None,
            queries: HashMap::new(),
        }
    }
}

impl DataProviderBuilder {
    /// Read EXCEL sources with `reader`.
    pub fn tabular(mut self, reader: impl TabularReader + 'static) -> Self {
        self.tabular = Some(Arc::new(reader));
        self
    }

    /// Read CSV sources with `reader`.
    pub fn delimited(mut self, reader: impl DelimitedReader + 'static) -> Self {
        self.delimited = Some(Arc::new(reader));
        self
    }

    /// Read JSON sources with `reader` instead of the built-in
    /// [`JsonDocumentReader`].
    pub fn document(mut self, reader: impl DocumentReader + 'static) -> Self {
        self.document = Some(Arc::new(reader));
        self
    }

    /// Run DATABASE sources with `executor`.
    pub fn query_executor(mut self, executor: impl QueryExecutor + 'static) -> Self {
        self.query = Some(Arc::new(executor));
        self
    }

    /// Make `query` available as `queryKey = key`.
    pub fn named_query(mut self, key: impl Into<String>, query: impl Into<String>) -> Self {
        self.queries.insert(key.into(), query.into());
        self
    }

    /// Add every `(key, query)` pair to the catalogue.
    pub fn named_queries<K, Q>(mut self, queries: impl IntoIterator<Item = (K, Q)>) -> Self
    where
        K: Into<String>,
        Q: Into<String>,
    {
        self.queries
            .extend(queries.into_iter().map(|(key, query)| (key.into(), query.into())));
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> DataProvider {
        DataProvider {
            tabular: self.tabular,
            delimited: self.delimited,
            document: self.document,
            query: self.query,
            queries: self.queries,
            cache: DashMap::new(),
        }
    }
}

/// Loads rows for data-driven tests.
///
/// File reads are cached per declaration and shared by every worker; each
/// call still returns freshly cloned rows, so an invocation that edits its
/// row never affects another.
///
/// ```
/// use weft::data::{DataProvider, DataSourceSpec};
///
/// let provider = DataProvider::builder().build();
/// let err = provider.load(&DataSourceSpec::database()).err();
/// assert!(err.is_some_and(|err| err.to_string().contains("`query` or `queryKey`")));
/// ```
pub struct DataProvider {
    tabular: Option<Arc<dyn TabularReader>>,
    delimited: Option<Arc<dyn DelimitedReader>>,
    document: Option<Arc<dyn DocumentReader>>,
    query: Option<Arc<dyn QueryExecutor>>,
    queries: HashMap<String, String>,
    cache: DashMap<CacheKey, Arc<[DataRow]>>,
}

impl DataProvider {
    /// Start configuring a provider. The JSON reader is installed by default.
    pub fn builder() -> DataProviderBuilder {
        DataProviderBuilder::default()
    }

    /// Rows described by `spec`, after the key allow-list and filter.
    ///
    /// # Errors
    /// Returns [`DataError::Configuration`] when the declaration is invalid
    /// or needs a collaborator that is not installed, and
    /// [`DataError::Source`] when the collaborator fails.
    pub fn load(&self, spec: &DataSourceSpec) -> Result<Vec<DataRow>, DataError> {
        let plan = self.plan(spec)?;
        let span = debug_span!("load", source_type = %plan.source_type, location = %plan.read.location());
        let _entered = span.enter();

        let fetched = self.fetch(&plan)?;
        let total = fetched.len();
        let rows: Vec<DataRow> = fetched.iter().filter(|row| plan.keeps(row)).cloned().collect();
        debug!(total, kept = rows.len(), "loaded data rows");
        Ok(rows)
    }

    fn plan(&self, spec: &DataSourceSpec) -> Result<Plan, ConfigurationError> {
        let source_type = spec.source_type;
        let read = if source_type.is_file() {
            let path = spec
                .path
                .clone()
                .or_else(|| spec.source.as_deref().map(Utf8PathBuf::from))
                .ok_or(ConfigurationError::MissingOption {
                    source_type,
                    option: "path",
                })?;
            Read::File(CacheKey {
                source_type,
                path,
                sheet: spec.sheet.clone().filter(|_| source_type == SourceType::Excel),
                has_header: spec.has_header,
            })
        } else {
            let query = match (&spec.query, &spec.query_key) {
                (Some(query), _) => query.clone(),
                (None, Some(key)) => self
                    .queries
                    .get(key)
                    .cloned()
                    .ok_or_else(|| ConfigurationError::UnknownQueryKey(key.clone()))?,
                (None, None) => return Err(ConfigurationError::MissingQuery),
            };
            let params = spec
                .query_params
                .iter()
                .map(|raw| QueryParam::parse(raw))
                .collect::<Result<Vec<_>, _>>()?;
            let source = spec
                .source
                .clone()
                .or_else(|| spec.path.as_ref().map(ToString::to_string))
                .unwrap_or_else(|| DEFAULT_CONNECTION.to_owned());
            Read::Query {
                source,
                query,
                params,
            }
        };

        let keys = match (&spec.key_field, spec.key_values.is_empty()) {
            (Some(field), false) => Some((field.clone(), spec.key_values.clone())),
            (None, true) => None,
            _ => return Err(ConfigurationError::IncompleteKeyFilter),
        };
        let filter = spec
            .filter
            .as_deref()
            .map(str::trim)
            .filter(|expression| !expression.is_empty())
            .map(Filter::parse)
            .transpose()?;
        self.require_reader(source_type)?;

        Ok(Plan {
            source_type,
            read,
            keys,
            filter,
        })
    }

    fn require_reader(&self, source_type: SourceType) -> Result<(), ConfigurationError> {
        let (installed, capability) = match source_type {
            SourceType::Excel => (self.tabular.is_some(), "tabular reader"),
            SourceType::Csv => (self.delimited.is_some(), "delimited reader"),
            SourceType::Json => (self.document.is_some(), "document reader"),
            SourceType::Database => (self.query.is_some(), "query executor"),
        };
        if installed {
            Ok(())
        } else {
            Err(ConfigurationError::MissingCollaborator {
                source_type,
                capability,
            })
        }
    }

    fn fetch(&self, plan: &Plan) -> Result<Arc<[DataRow]>, DataError> {
        let source_error = |source: SourceError| DataError::Source {
            source_type: plan.source_type,
            location: plan.read.location(),
            source,
        };
        match &plan.read {
            Read::File(key) => {
                if let Some(cached) = self.cache.get(key) {
                    trace!("data source cache hit");
                    return Ok(Arc::clone(cached.value()));
                }
                let rows: Arc<[DataRow]> = self.read_file(key).map_err(source_error)?.into();
                let entry = self.cache.entry(key.clone()).or_insert(rows);
                Ok(Arc::clone(entry.value()))
            }
            Read::Query {
                source,
                query,
                params,
            } => {
                let executor = self.query.as_ref().ok_or(ConfigurationError::MissingCollaborator {
                    source_type: plan.source_type,
                    capability: "query executor",
                })?;
                let rows = executor
                    .execute_query(source, query, params)
                    .map_err(source_error)?;
                Ok(rows.into())
            }
        }
    }

    fn read_file(&self, key: &CacheKey) -> Result<Vec<DataRow>, SourceError> {
        let missing = || -> SourceError { format!("no reader for {} sources", key.source_type).into() };
        match key.source_type {
            SourceType::Excel => self
                .tabular
                .as_ref()
                .ok_or_else(missing)?
                .read_tabular(&key.path, key.sheet.as_deref(), key.has_header),
            SourceType::Csv => self
                .delimited
                .as_ref()
                .ok_or_else(missing)?
                .read_delimited(&key.path, key.has_header),
            SourceType::Json => self.document.as_ref().ok_or_else(missing)?.read_document(&key.path),
            SourceType::Database => Err(missing()),
        }
    }

    /// Forget every cached file read.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Number of cached file reads.
    #[must_use]
    pub fn cached_sources(&self) -> usize {
        self.cache.len()
    }

    /// Return `true` when `key` names a catalogue query.
    #[must_use]
    pub fn has_named_query(&self, key: &str) -> bool {
        self.queries.contains_key(key)
    }
}

impl fmt::Debug for DataProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProvider")
            .field("tabular", &self.tabular.is_some())
            .field("delimited", &self.delimited.is_some())
            .field("document", &self.document.is_some())
            .field("query", &self.query.is_some())
            .field("queries", &self.queries.len())
            .field("cached_sources", &self.cache.len())
            .finish()
    }
}

impl fmt::Debug for DataProviderBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataProviderBuilder")
            .field("queries", &self.queries.len())
            .finish_non_exhaustive()
    }
}
