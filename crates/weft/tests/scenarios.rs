//! Behavioural tests for parsing, resolution and scenario execution.

use rstest::rstest;
use serial_test::serial;
use weft::registry::{self, ResolveError, StepRegistry};
use weft::runner::{FailureKind, StepStatus};
use weft::{ContextStore, PageCache, ScenarioRunner, StepContext, StepResult, feature};

mod steps {
    use super::{StepContext, StepResult};

    fn logs_in(ctx: &mut StepContext<'_>) -> StepResult {
        ctx.context_mut().insert("session", String::from("open"));
        Ok(())
    }

    fn sees_dashboard(ctx: &mut StepContext<'_>) -> StepResult {
        weft::ensure!(
            ctx.context().get_str("session") == Some("open"),
            "no session"
        );
        Ok(())
    }

    weft::step!("the user logs in", logs_in);
    weft::step!("the dashboard is shown", sees_dashboard);

    pub mod conflicting {
        use super::super::{StepContext, StepResult};

        fn other_login(_: &mut StepContext<'_>) -> StepResult {
            Ok(())
        }

        weft::step!("^the user logs (in|out)$", other_login);
    }
}

const STEPS_NAMESPACE: &str = concat!(module_path!(), "::steps");

const SHOPPING: &str = "\
@shop
Feature: Shopping
  Background:
    Given the user logs in

  Scenario Outline: buying <item>
    When the user buys <quantity> <item>
    Then the dashboard is shown

    @small
    Examples: small orders
      | item   | quantity |
      | apples | 2        |
      | pears  | 1        |

    Examples: bulk
      | item    | quantity |
      | melons  | 40       |
";

#[test]
fn outlines_expand_once_per_examples_row() {
    let feature = feature::parse(SHOPPING).unwrap_or_else(|err| panic!("{err}"));
    let scenarios = feature.scenarios();
    assert_eq!(scenarios.len(), 3);

    let names: Vec<_> = scenarios.iter().map(|scenario| scenario.name()).collect();
    assert_eq!(names, ["buying apples", "buying pears", "buying melons"]);
    for scenario in scenarios {
        for step in scenario.steps() {
            assert!(!step.text().contains('<'), "residual placeholder in {:?}", step.text());
        }
    }
    let bulk = scenarios.last().unwrap_or_else(|| panic!("no scenarios"));
    assert_eq!(bulk.data_row().and_then(|row| row.get("quantity")), Some("40"));
    assert_eq!(bulk.examples_index(), Some(2));
    assert!(bulk.has_tag("@shop"));
    assert!(!bulk.has_tag("@small"));
    assert!(scenarios.first().is_some_and(|first| first.has_tag("@small")));
}

#[test]
fn parsing_is_deterministic() {
    let first = feature::parse(SHOPPING).unwrap_or_else(|err| panic!("{err}"));
    let second = feature::parse(SHOPPING).unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(first, second);
}

#[rstest]
#[case("Feature: F\n  Scenario: empty\n", 2)]
#[case("Feature: F\n  Scenario: s\n    Given a step\n    Perhaps another\n", 4)]
#[case(
    "Feature: F\n  Scenario Outline: o\n    Given <a>\n  Examples:\n    | a | b |\n    | 1 |\n",
    6
)]
#[case("Feature: F\n  Scenario: s\n    Givne the user logs in\n    Then the dashboard shows\n", 3)]
#[case(
    "Feature: F\n  Scenario Outline: o\n    Given <a> and <a>\n  Examples:\n    | a | a |\n    | 1 | 2 |\n",
    5
)]
fn malformed_features_report_the_line(#[case] source: &str, #[case] line: usize) {
    let err = feature::parse(source).err().unwrap_or_else(|| panic!("expected a parse error"));
    assert_eq!(err.line, line, "{err}");
}

#[test]
fn scanned_steps_drive_a_feature() {
    let registry = StepRegistry::builder()
        .scan(STEPS_NAMESPACE)
        .step("the user buys {quantity:u32} {item}", |ctx| {
            let quantity: u32 = ctx.arg(0)?;
            weft::ensure!(quantity > 0);
            Ok(())
        })
        .build()
        .unwrap_or_else(|err| panic!("{err}"));
    let feature = feature::parse(SHOPPING).unwrap_or_else(|err| panic!("{err}"));
    let store = ContextStore::new();
    let pages = PageCache::default();

    // The conflicting module makes "the user logs in" ambiguous.
    let reports = ScenarioRunner::new(&registry)
        .with_store(&store)
        .with_pages(&pages)
        .record_outcomes(false)
        .run_feature(&feature);
    for report in &reports {
        let failure = report
            .outcome
            .failure()
            .unwrap_or_else(|| panic!("expected {} to fail", report.scenario_name));
        assert_eq!(failure.kind, FailureKind::AmbiguousStep);
        assert_eq!(failure.step.as_ref().map(|step| step.index), Some(0));
        assert_eq!(report.steps_with(StepStatus::NotRun).count(), 2);
    }
}

#[test]
fn ambiguous_text_names_every_candidate() {
    let registry = StepRegistry::scan(STEPS_NAMESPACE).unwrap_or_else(|err| panic!("{err}"));
    let Err(ResolveError::AmbiguousStep { text, candidates }) = registry.resolve("the user logs in") else {
        panic!("expected an ambiguous step");
    };
    assert_eq!(text, "the user logs in");
    let mut patterns: Vec<_> = candidates.iter().map(|candidate| candidate.pattern.as_str()).collect();
    patterns.sort_unstable();
    assert_eq!(patterns, ["^the user logs (in|out)$", "the user logs in"]);

    assert!(registry.resolve("the user logs out").is_ok());
    assert!(matches!(
        registry.resolve("the user leaves"),
        Err(ResolveError::NoMatchingStep { .. })
    ));
}

#[test]
fn narrower_namespaces_exclude_nested_conflicts() {
    let registry = StepRegistry::scan(&format!("{STEPS_NAMESPACE}::conflicting"))
        .unwrap_or_else(|err| panic!("{err}"));
    assert_eq!(registry.len(), 1);
    assert!(registry.resolve("the user logs in").is_ok());
}

#[test]
#[serial(global_registry)]
fn global_registry_installs_once() {
    let _ = registry::reset_global();
    let registry = StepRegistry::scan(STEPS_NAMESPACE).unwrap_or_else(|err| panic!("{err}"));
    let installed = registry::install_global(registry).unwrap_or_else(|err| panic!("{err}"));
    assert!(registry::global().is_some_and(|global| std::sync::Arc::ptr_eq(&global, &installed)));

    let again = StepRegistry::builder().build().unwrap_or_else(|err| panic!("{err}"));
    assert!(registry::install_global(again).is_err());
    assert!(registry::reset_global().is_some());
    assert!(registry::global().is_none());
}
