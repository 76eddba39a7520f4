//! Unit tests for execution contexts and the context store.

use std::sync::{Arc, Barrier};
use std::thread;

use rstest::{fixture, rstest};

use super::*;
use crate::runner::Outcome;

#[fixture]
fn store() -> ContextStore {
    ContextStore::new()
}

#[rstest]
fn context_is_created_lazily(store: ContextStore) {
    assert!(store.is_empty());
    let worker = store.with_current(|ctx| ctx.worker());
    assert_eq!(worker, WorkerId::current());
    assert_eq!(store.len(), 1);
}

#[rstest]
fn clear_is_idempotent(store: ContextStore) {
    store.with_current(|ctx| ctx.insert("k", 1_i32));
    assert!(store.clear());
    assert!(!store.clear());
    assert!(store.with_current(|ctx| !ctx.contains("k")));
}

#[rstest]
fn get_mut_copies_values_shared_with_snapshots(store: ContextStore) {
    store.with_current(|ctx| ctx.insert("items", vec![1, 2]));
    let snapshot = store
        .context_for(WorkerId::current())
        .unwrap_or_else(|| panic!("context should exist"));
    store.with_current(|ctx| {
        if let Some(items) = ctx.get_mut::<Vec<i32>>("items") {
            items.push(3);
        }
    });
    assert_eq!(snapshot.get::<Vec<i32>>("items"), Some(&vec![1, 2]));
    let live = store.with_current(|ctx| ctx.get::<Vec<i32>>("items").cloned());
    assert_eq!(live, Some(vec![1, 2, 3]));
}

#[test]
fn get_mut_rejects_wrong_type() {
    let mut ctx = ExecutionContext::new(WorkerId::allocate());
    ctx.insert("n", 1_u8);
    assert!(ctx.get_mut::<String>("n").is_none());
    assert_eq!(ctx.get::<u8>("n"), Some(&1));
}

#[test]
fn keys_are_sorted() {
    let mut ctx = ExecutionContext::new(WorkerId::allocate());
    ctx.insert(keys::SCENARIO_NAME, String::from("s"));
    ctx.insert(keys::DATA_ROW, DataRow::new());
    ctx.insert(keys::FEATURE_FILE, String::from("f"));
    assert_eq!(ctx.keys(), ["data_row", "feature_file", "scenario_name"]);
}

#[test]
fn driver_is_opaque() {
    #[derive(Debug, PartialEq)]
    struct FakeDriver(&'static str);

    let mut ctx = ExecutionContext::new(WorkerId::allocate());
    assert!(ctx.set_driver(Some(Arc::new(FakeDriver("chrome")))).is_none());
    assert_eq!(ctx.driver_as::<FakeDriver>(), Some(&FakeDriver("chrome")));
    assert!(ctx.set_driver(None).is_some());
    assert!(ctx.driver().is_none());
}

#[rstest]
fn workers_never_observe_each_other(store: ContextStore) {
    const WORKERS: usize = 8;
    let store = Arc::new(store);
    let barrier = Arc::new(Barrier::new(WORKERS));
    let handles: Vec<_> = (0..WORKERS)
        .map(|index| {
            let store = Arc::clone(&store);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                store.with_current(|ctx| ctx.insert("marker", index));
                barrier.wait();
                let seen = store.with_current(|ctx| ctx.get::<usize>("marker").copied());
                (WorkerId::current(), seen)
            })
        })
        .collect();

    for (index, handle) in handles.into_iter().enumerate() {
        let (worker, seen) = handle
            .join()
            .unwrap_or_else(|_| panic!("worker thread panicked"));
        assert_eq!(seen, Some(index));
        let snapshot = store
            .context_for(worker)
            .unwrap_or_else(|| panic!("worker context should remain"));
        assert_eq!(snapshot.get::<usize>("marker"), Some(&index));
    }
    assert_eq!(store.all_contexts().len(), WORKERS);
}

#[rstest]
fn all_contexts_is_sorted_by_worker(store: ContextStore) {
    let ids = [WorkerId::allocate(), WorkerId::allocate(), WorkerId::allocate()];
    for id in ids.iter().rev() {
        id.scope(|| store.with_current(|_| ()));
    }
    let workers: Vec<_> = store.all_contexts().iter().map(|s| s.worker()).collect();
    assert_eq!(workers, ids);
}

#[rstest]
fn scope_discards_orphans_and_clears_on_drop(store: ContextStore) {
    store.with_current(|ctx| ctx.insert(keys::FEATURE_FILE, String::from("stale.feature")));
    {
        let scope = store.scope();
        assert_eq!(scope.worker(), WorkerId::current());
        assert!(store.is_empty());
        store.with_current(|ctx| ctx.insert("fresh", true));
    }
    assert!(store.is_empty());
}

#[rstest]
fn scope_clears_when_unit_panics(store: ContextStore) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _scope = store.scope();
        store.with_current(|ctx| ctx.set_test_result(Some(Outcome::Passed)));
        panic!("unit failed");
    }));
    assert!(result.is_err());
    assert!(store.context_for(WorkerId::current()).is_none());
}

#[rstest]
fn poisoned_context_is_recovered(store: ContextStore) {
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        store.with_current(|ctx| {
            ctx.insert("before", 1_u8);
            panic!("handler panicked while holding the context");
        });
    }));
    assert!(result.is_err());
    assert_eq!(store.with_current(|ctx| ctx.get::<u8>("before").copied()), Some(1));
}

#[rstest]
fn reset_drops_every_context(store: ContextStore) {
    for _ in 0..3 {
        WorkerId::allocate().scope(|| store.with_current(|_| ()));
    }
    assert_eq!(store.len(), 3);
    store.reset();
    assert!(store.is_empty());
}
