//! Behavioural tests for data-driven runs fed by the data provider.

use std::num::NonZeroUsize;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use weft::data::{DataError, DataProvider, DataSourceSpec};
use weft::registry::StepRegistry;
use weft::{ConfigurationError, ContextStore, DataRow, PageCache, ScenarioRunner, WorkerPool, feature};

const USERS: &str = r#"[
    {"username": "ana", "age": 34, "role": "admin", "active": true},
    {"username": "ben", "age": 19, "role": "viewer", "active": false},
    {"username": "cai", "age": 30, "role": "editor", "active": true},
    {"username": "dee", "age": null, "role": "viewer", "active": true}
]"#;

struct Fixture {
    _dir: TempDir,
    path: Utf8PathBuf,
}

#[fixture]
fn users_file() -> Fixture {
    let dir = tempfile::tempdir().unwrap_or_else(|err| panic!("{err}"));
    let path = Utf8PathBuf::from_path_buf(dir.path().join("users.json"))
        .unwrap_or_else(|path| panic!("non UTF-8 path {}", path.display()));
    std::fs::write(&path, USERS).unwrap_or_else(|err| panic!("{err}"));
    Fixture { _dir: dir, path }
}

fn usernames(rows: &[DataRow]) -> Vec<&str> {
    rows.iter().filter_map(|row| row.get("username")).collect()
}

#[rstest]
#[case("age>=30", &["ana", "cai"])]
#[case("role=viewer", &["ben", "dee"])]
#[case("active!=true", &["ben"])]
#[case("age<20", &["ben"])]
#[case("", &["ana", "ben", "cai", "dee"])]
fn json_rows_are_filtered(users_file: Fixture, #[case] filter: &str, #[case] expected: &[&str]) {
    let provider = DataProvider::builder().build();
    let rows = provider
        .load(&DataSourceSpec::json(users_file.path.clone()).with_filter(filter))
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(usernames(&rows), expected);
}

#[rstest]
fn null_values_load_as_empty_strings(users_file: Fixture) {
    let provider = DataProvider::builder().build();
    let rows = provider
        .load(&DataSourceSpec::json(users_file.path.clone()).with_keys("username", ["dee"]))
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(rows.first().and_then(|row| row.get("age")), Some(""));
}

#[rstest]
fn invocations_own_their_rows(users_file: Fixture) {
    let provider = DataProvider::builder().build();
    let spec = DataSourceSpec::json(users_file.path.clone());
    let rows = provider.load(&spec).unwrap_or_else(|err| panic!("{err}"));
    let store = ContextStore::new();
    let pages = PageCache::default();
    let pool = WorkerPool::new(NonZeroUsize::new(3))
        .unwrap_or_else(|err| panic!("{err}"))
        .record_outcomes(false)
        .with_store(&store)
        .with_pages(&pages);

    let reports = pool.run_data_driven("login", rows, |ctx, row| {
        let mut mine = row.clone();
        mine.insert("username", "tampered");
        ctx.insert("row", mine);
        weft::ensure!(row.get("username") != Some("tampered"));
        Ok(())
    });

    assert_eq!(reports.len(), 4);
    for (index, report) in reports.iter().enumerate() {
        assert_eq!(report.index, index);
        assert!(report.outcome.is_passed(), "{}", report.outcome);
    }
    assert_eq!(usernames(&reports.iter().map(|report| report.row.clone()).collect::<Vec<_>>()), [
        "ana", "ben", "cai", "dee"
    ]);

    let reloaded = provider.load(&spec).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(usernames(&reloaded), ["ana", "ben", "cai", "dee"]);
    assert_eq!(provider.cached_sources(), 1);
}

#[rstest]
fn provider_rows_drive_a_scenario(users_file: Fixture) {
    let provider = DataProvider::builder().build();
    let rows = provider
        .load(&DataSourceSpec::json(users_file.path.clone()).with_filter("role!=viewer"))
        .unwrap_or_else(|err| panic!("{err}"));
    let registry = StepRegistry::builder()
        .step("the current user is active", |ctx| {
            let active = ctx
                .context()
                .data_row()
                .and_then(|row| row.get("active"))
                .map(str::to_owned);
            weft::ensure!(active.as_deref() == Some("true"), "user is inactive");
            Ok(())
        })
        .build()
        .unwrap_or_else(|err| panic!("{err}"));
    let feature = feature::parse("Feature: Access\n  Scenario: active user\n    Given the current user is active\n")
        .unwrap_or_else(|err| panic!("{err}"));
    let scenario = feature
        .scenarios()
        .first()
        .unwrap_or_else(|| panic!("no scenario"));
    let store = ContextStore::new();
    let pages = PageCache::default();
    let runner = ScenarioRunner::new(&registry)
        .with_store(&store)
        .with_pages(&pages)
        .record_outcomes(false);

    for row in &rows {
        let report = runner.run_with_row(&feature, scenario, row);
        assert!(report.outcome.is_passed(), "{}", report.outcome);
        assert_eq!(report.data_row.as_ref(), Some(row));
    }
}

#[test]
fn missing_files_report_the_location() {
    let provider = DataProvider::builder().build();
    let err = provider
        .load(&DataSourceSpec::json("no/such/users.json"))
        .err()
        .unwrap_or_else(|| panic!("expected a source error"));
    assert!(matches!(err, DataError::Source { .. }), "{err:?}");
    assert!(err.to_string().contains("no/such/users.json"), "{err}");
}

#[test]
fn database_sources_need_an_executor() {
    let provider = DataProvider::builder().build();
    let err = provider
        .load(&DataSourceSpec::database().with_query("SELECT 1"))
        .err()
        .unwrap_or_else(|| panic!("expected a configuration error"));
    assert!(matches!(
        err,
        DataError::Configuration(ConfigurationError::MissingCollaborator { .. })
    ));
}
