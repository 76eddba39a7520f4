//! Tests for the data provider.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use camino::Utf8Path;
use rstest::rstest;

use super::*;
use crate::row::DataRow;

fn users() -> Vec<DataRow> {
    vec![
        DataRow::from_pairs([("user", "a"), ("age", "25"), ("region", "EU")]),
        DataRow::from_pairs([("user", "b"), ("age", "31"), ("region", "US")]),
        DataRow::from_pairs([("user", "c"), ("age", "abc"), ("region", "EU")]),
    ]
}

fn counting_csv(reads: &Arc<AtomicUsize>) -> impl DelimitedReader + 'static {
    let reads = Arc::clone(reads);
    move |_: &Utf8Path, _: bool| -> Result<Vec<DataRow>, SourceError> {
        reads.fetch_add(1, Ordering::SeqCst);
        Ok(users())
    }
}

fn names(rows: &[DataRow]) -> Vec<&str> {
    rows.iter().filter_map(|row| row.get("user")).collect()
}

#[test]
fn rows_are_independent_copies() {
    let reads = Arc::new(AtomicUsize::new(0));
    let provider = DataProvider::builder().delimited(counting_csv(&reads)).build();
    let spec = DataSourceSpec::csv("users.csv");

    let mut first = provider.load(&spec).unwrap_or_else(|err| panic!("{err}"));
    if let Some(row) = first.first_mut() {
        row.insert("user", "x");
    }
    assert_eq!(names(&first), ["x", "b", "c"]);

    let second = provider.load(&spec).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(names(&second), ["a", "b", "c"]);
    assert_eq!(reads.load(Ordering::SeqCst), 1);
    assert_eq!(provider.cached_sources(), 1);

    provider.clear_cache();
    let _ = provider.load(&spec).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(reads.load(Ordering::SeqCst), 2);
}

#[test]
fn filter_applies_after_loading() {
    let reads = Arc::new(AtomicUsize::new(0));
    let provider = DataProvider::builder().delimited(counting_csv(&reads)).build();
    let rows = provider
        .load(&DataSourceSpec::csv("users.csv").with_filter("age>=30"))
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(names(&rows), ["b"]);
}

#[test]
fn key_allow_list_runs_before_the_filter() {
    let reads = Arc::new(AtomicUsize::new(0));
    let provider = DataProvider::builder().delimited(counting_csv(&reads)).build();
    let rows = provider
        .load(
            &DataSourceSpec::csv("users.csv")
                .with_keys("region", ["EU"])
                .with_filter("user!=c"),
        )
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(names(&rows), ["a"]);
}

#[test]
fn excel_sources_pass_the_sheet() {
    let provider = DataProvider::builder()
        .tabular(
            |path: &Utf8Path, sheet: Option<&str>, has_header: bool| -> Result<Vec<DataRow>, SourceError> {
                Ok(vec![DataRow::from_pairs([
                    ("path", path.as_str()),
                    ("sheet", sheet.unwrap_or("-")),
                    ("header", if has_header { "yes" } else { "no" }),
                ])])
            },
        )
        .build();
    let rows = provider
        .load(
            &DataSourceSpec::excel("book.xlsx")
                .with_sheet("Logins")
                .with_header(false),
        )
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(
        rows,
        [DataRow::from_pairs([
            ("path", "book.xlsx"),
            ("sheet", "Logins"),
            ("header", "no")
        ])]
    );
}

#[test]
fn database_sources_resolve_named_queries_and_params() {
    let provider = DataProvider::builder()
        .named_query("ACTIVE_USERS", "select * from users where active = :flag")
        .query_executor(
            |source: &str, query: &str, params: &[QueryParam]| -> Result<Vec<DataRow>, SourceError> {
                let mut row = DataRow::from_pairs([("source", source), ("query", query)]);
                for param in params {
                    row.insert(param.name.clone(), param.value.clone());
                }
                Ok(vec![row])
            },
        )
        .build();
    assert!(provider.has_named_query("ACTIVE_USERS"));

    let rows = provider
        .load(
            &DataSourceSpec::database()
                .with_source("reporting")
                .with_query_key("ACTIVE_USERS")
                .with_query_param("flag:true")
                .with_query_param("url:http://db:5432"),
        )
        .unwrap_or_else(|err| panic!("{err}"));
    let row = rows.first().unwrap_or_else(|| panic!("no rows"));
    assert_eq!(row.get("source"), Some("reporting"));
    assert_eq!(row.get("query"), Some("select * from users where active = :flag"));
    assert_eq!(row.get("flag"), Some("true"));
    assert_eq!(row.get("url"), Some("http://db:5432"));
    assert_eq!(provider.cached_sources(), 0);
}

#[rstest]
#[case::missing_path(DataSourceSpec::of(SourceType::Csv), ConfigurationError::MissingOption { source_type: SourceType::Csv, option: "path" })]
#[case::missing_query(DataSourceSpec::database(), ConfigurationError::MissingQuery)]
#[case::unknown_key(
    DataSourceSpec::database().with_query_key("NOPE"),
    ConfigurationError::UnknownQueryKey("NOPE".into())
)]
#[case::malformed_param(
    DataSourceSpec::database().with_query("select 1").with_query_param("flag"),
    ConfigurationError::MalformedQueryParam("flag".into())
)]
#[case::bad_filter(
    DataSourceSpec::json("users.json").with_filter("age"),
    ConfigurationError::InvalidFilter { expression: "age".into(), reason: "no comparison operator" }
)]
#[case::no_executor(
    DataSourceSpec::database().with_query("select 1"),
    ConfigurationError::MissingCollaborator { source_type: SourceType::Database, capability: "query executor" }
)]
#[case::no_tabular_reader(
    DataSourceSpec::excel("book.xlsx"),
    ConfigurationError::MissingCollaborator { source_type: SourceType::Excel, capability: "tabular reader" }
)]
fn invalid_declarations_fail_before_reading(#[case] spec: DataSourceSpec, #[case] expected: ConfigurationError) {
    let provider = DataProvider::builder().build();
    let err = provider.load(&spec).err();
    assert!(
        matches!(err, Some(DataError::Configuration(ref found)) if *found == expected),
        "unexpected result {err:?}"
    );
}

#[test]
fn key_field_requires_values() {
    let mut spec = DataSourceSpec::json("users.json");
    spec.key_field = Some("region".into());
    let err = DataProvider::builder().build().load(&spec).err();
    assert!(matches!(
        err,
        Some(DataError::Configuration(ConfigurationError::IncompleteKeyFilter))
    ));
}

#[test]
fn collaborator_failures_carry_the_location() {
    let provider = DataProvider::builder()
        .delimited(|_: &Utf8Path, _: bool| -> Result<Vec<DataRow>, SourceError> {
            Err("permission denied".into())
        })
        .build();
    let err = provider
        .load(&DataSourceSpec::csv("secret.csv"))
        .err()
        .unwrap_or_else(|| panic!("expected an error"));
    assert_eq!(
        err.to_string(),
        "failed to read CSV source `secret.csv`: permission denied"
    );
    assert_eq!(provider.cached_sources(), 0);
}

#[test]
fn declarations_deserialise_from_camel_case() {
    let spec: DataSourceSpec = serde_json::from_str(
        r#"{
            "type": "DATABASE",
            "source": "reporting",
            "queryKey": "ACTIVE_USERS",
            "queryParams": ["flag:true"],
            "keyField": "region",
            "keyValues": "EU, US",
            "filter": "age>=30"
        }"#,
    )
    .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(spec.source_type, SourceType::Database);
    assert_eq!(spec.query_key.as_deref(), Some("ACTIVE_USERS"));
    assert_eq!(spec.key_values, ["EU", "US"]);
    assert!(spec.has_header);
}

#[test]
fn json_sources_use_the_built_in_reader() {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("{err}"));
    let path = dir.path().join("users.json");
    std::fs::write(&path, r#"[{"user": "a", "age": 25}, {"user": "b", "age": 31}]"#)
        .unwrap_or_else(|err| panic!("{err}"));
    let path = camino::Utf8PathBuf::from_path_buf(path).unwrap_or_else(|_| panic!("non UTF-8 path"));

    let rows = DataProvider::builder()
        .build()
        .load(&DataSourceSpec::json(path).with_filter("age>30"))
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(names(&rows), ["b"]);
}
