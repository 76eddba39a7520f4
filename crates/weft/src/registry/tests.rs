//! Unit tests for step registration and resolution.

use rstest::rstest;

use super::*;
use crate::step;

fn ok(_: &mut StepContext<'_>) -> StepResult {
    Ok(())
}

mod declared {
    use crate::step::{StepContext, StepResult};

    fn opens(_: &mut StepContext<'_>) -> StepResult {
        Ok(())
    }

    crate::step!("the declared application is open", opens);
    crate::step!("the declared user has {n:u32} items", |_| Ok(()));

    pub(super) mod nested {
        crate::step!("a nested declaration", |_| Ok(()));
    }
}

step!("a declaration outside the scanned module", ok);

fn build(patterns: &[&'static str]) -> StepRegistry {
    patterns
        .iter()
        .fold(StepRegistry::builder(), |builder, pattern| builder.step(*pattern, ok))
        .build()
        .unwrap_or_else(|err| panic!("registry should build: {err}"))
}

#[test]
fn scan_collects_namespace_and_nested_modules() {
    let registry = StepRegistry::scan("weft::registry::tests::declared")
        .unwrap_or_else(|err| panic!("scan should succeed: {err}"));
    let mut patterns: Vec<_> = registry.definitions().map(RegisteredStep::pattern).collect();
    patterns.sort_unstable();
    assert_eq!(
        patterns,
        [
            "a nested declaration",
            "the declared application is open",
            "the declared user has {n:u32} items",
        ]
    );
    assert!(
        registry
            .definitions()
            .all(|step| step.namespace().starts_with("weft::registry::tests::declared"))
    );
}

#[test]
fn scan_of_nested_module_excludes_parent() {
    let registry = StepRegistry::scan("weft::registry::tests::declared::nested")
        .unwrap_or_else(|err| panic!("scan should succeed: {err}"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn from_config_scans_the_configured_namespace() {
    let config = crate::RuntimeConfig::default()
        .with_step_namespace("weft::registry::tests::declared::nested");
    let registry = StepRegistry::from_config(&config)
        .unwrap_or_else(|err| panic!("scan should succeed: {err}"));
    assert_eq!(registry.len(), 1);
}

#[test]
fn ambiguous_text_names_every_candidate() {
    let registry = build(&["the user logs in", "^the user (.+) in$", "the {who} logs in"]);
    let Err(ResolveError::AmbiguousStep { text, candidates }) = registry.resolve("the user logs in")
    else {
        panic!("expected an ambiguous resolution");
    };
    assert_eq!(text, "the user logs in");
    let patterns: Vec<_> = candidates.iter().map(|c| c.pattern.as_str()).collect();
    assert_eq!(patterns, ["the user logs in", "^the user (.+) in$", "the {who} logs in"]);
    assert_eq!(registry.unused_definitions().len(), 3);
}

#[test]
fn ambiguity_message_lists_locations() {
    let registry = build(&["the user logs in", "the {who} logs in"]);
    let message = registry
        .resolve("the user logs in")
        .err()
        .map(|err| err.to_string())
        .unwrap_or_default();
    assert!(message.starts_with("step `the user logs in` matches 2 definitions:"));
    assert!(message.contains("`the {who} logs in` at "));
}

#[rstest]
#[case("the user logs in", Vec::<&str>::new())]
#[case("the user ann logs out", vec!["ann"])]
#[case("I have 3 apples", vec!["3"])]
fn unique_matches_resolve(#[case] text: &str, #[case] expected: Vec<&str>) {
    let registry = build(&["the user logs in", "the user {name:word} logs out", "I have {n:int} apples"]);
    let resolved = registry
        .resolve(text)
        .unwrap_or_else(|err| panic!("{text:?} should resolve: {err}"));
    assert_eq!(resolved.captures, expected);
}

#[test]
fn unknown_text_is_no_matching_step() {
    let registry = build(&["the user logs in"]);
    assert_eq!(
        registry.resolve("the user logs in twice").err(),
        Some(ResolveError::NoMatchingStep {
            text: "the user logs in twice".into()
        })
    );
}

#[test]
fn resolved_definitions_are_no_longer_unused() {
    let registry = build(&["a", "b"]);
    assert!(registry.resolve("a").is_ok());
    let unused: Vec<_> = registry
        .unused_definitions()
        .into_iter()
        .map(RegisteredStep::pattern)
        .collect();
    assert_eq!(unused, ["b"]);
}

#[test]
fn duplicate_patterns_are_rejected() {
    let result = StepRegistry::builder()
        .step("the user logs in", ok)
        .step("the user logs in", ok)
        .build();
    assert!(matches!(
        result,
        Err(RegistryError::DuplicatePattern { ref pattern, .. }) if pattern == "the user logs in"
    ));
}

#[test]
fn invalid_patterns_are_rejected() {
    let result = StepRegistry::builder().step("the {user logs in", ok).build();
    assert!(matches!(result, Err(RegistryError::InvalidPattern { .. })));
}

#[test]
fn builder_records_caller_location() {
    let registry = build(&["located"]);
    let location = registry
        .definitions()
        .next()
        .map(RegisteredStep::location)
        .unwrap_or_else(|| panic!("definition should exist"));
    assert!(location.file.ends_with("tests.rs"));
}

#[test]
#[serial_test::serial(global_registry)]
fn global_registry_requires_explicit_reset() {
    let _ = reset_global();
    assert!(global().is_none());
    let installed = install_global(build(&["x"])).unwrap_or_else(|err| panic!("{err}"));
    assert!(matches!(
        install_global(build(&["y"])),
        Err(RegistryError::AlreadyInstalled)
    ));
    let current = global().unwrap_or_else(|| panic!("registry installed"));
    assert!(Arc::ptr_eq(&installed, &current));
    assert!(reset_global().is_some());
    assert!(global().is_none());
}
