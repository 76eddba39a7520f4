//! Worker-isolated execution state.
//!
//! Every worker owns exactly one [`ExecutionContext`] while it runs a unit.
//! Contexts live in a [`ContextStore`] keyed by [`WorkerId`]; the owning
//! worker gets exclusive mutable access and everyone else sees snapshots.

mod store;

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::row::DataRow;
use crate::runner::Outcome;
use crate::worker::WorkerId;

pub use store::{ContextScope, ContextSnapshot, ContextStore};

/// Opaque value stored in a context.
pub type ContextValue = Arc<dyn Any + Send + Sync>;

/// Names of the entries the runner maintains.
pub mod keys {
    /// Path of the running feature, or its name when parsed from text.
    pub const FEATURE_FILE: &str = "feature_file";
    /// Name of the running feature.
    pub const FEATURE_NAME: &str = "feature_name";
    /// Name of the running scenario.
    pub const SCENARIO_NAME: &str = "scenario_name";
    /// Copy of the examples or data-provider row driving the unit.
    pub const DATA_ROW: &str = "data_row";
}

/// State owned by one worker for the unit it is running.
///
/// Cloning is cheap: stored values are reference counted and only copied
/// when mutated through [`get_mut`](Self::get_mut) while shared.
#[derive(Clone)]
pub struct ExecutionContext {
    worker: WorkerId,
    created_at: DateTime<Utc>,
    test_result: Option<Outcome>,
    driver: Option<ContextValue>,
    test_class: Option<String>,
    test_method: Option<String>,
    scenario_id: Option<String>,
    suite_id: Option<String>,
    data: HashMap<String, ContextValue>,
    parallel: bool,
}

impl ExecutionContext {
    /// Create an empty context owned by `worker`.
    #[must_use]
    pub fn new(worker: WorkerId) -> Self {
        Self {
            worker,
            created_at: Utc::now(),
            test_result: None,
            driver: None,
            test_class: None,
            test_method: None,
            scenario_id: None,
            suite_id: None,
            data: HashMap::new(),
            parallel: false,
        }
    }

    /// Worker owning this context.
    #[must_use]
    pub fn worker(&self) -> WorkerId {
        self.worker
    }

    /// When the context was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Store `value` under `key`, returning the previous value.
    pub fn insert<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<String>,
        value: T,
    ) -> Option<ContextValue> {
        self.data.insert(key.into(), Arc::new(value))
    }

    /// Store an already shared value under `key`.
    pub fn insert_shared(&mut self, key: impl Into<String>, value: ContextValue) -> Option<ContextValue> {
        self.data.insert(key.into(), value)
    }

    /// Borrow the value under `key` when it has type `T`.
    ///
    /// ```
    /// use weft::{ExecutionContext, WorkerId};
    ///
    /// let mut ctx = ExecutionContext::new(WorkerId::current());
    /// ctx.insert("attempts", 3_u32);
    /// assert_eq!(ctx.get::<u32>("attempts"), Some(&3));
    /// assert_eq!(ctx.get::<String>("attempts"), None);
    /// ```
    #[must_use]
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.data.get(key)?.downcast_ref::<T>()
    }

    /// Mutably borrow the value under `key` when it has type `T`.
    ///
    /// A value still shared with a snapshot is copied first, so snapshots
    /// never observe the owner's later edits.
    pub fn get_mut<T: Any + Send + Sync + Clone>(&mut self, key: &str) -> Option<&mut T> {
        let slot = self.data.get_mut(key)?;
        if Arc::get_mut(slot).is_none() {
            let copy = slot.downcast_ref::<T>()?.clone();
            *slot = Arc::new(copy);
        }
        Arc::get_mut(slot)?.downcast_mut::<T>()
    }

    /// Shared handle to the value under `key`, whatever its type.
    #[must_use]
    pub fn get_shared(&self, key: &str) -> Option<ContextValue> {
        self.data.get(key).cloned()
    }

    /// Remove the value under `key`.
    pub fn remove(&mut self, key: &str) -> Option<ContextValue> {
        self.data.remove(key)
    }

    /// Return `true` when `key` holds a value.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Keys currently stored, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.data.keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    /// String stored under `key`.
    #[must_use]
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get::<String>(key).map(String::as_str)
    }

    /// Feature path recorded by the runner.
    #[must_use]
    pub fn feature_file(&self) -> Option<&str> {
        self.get_str(keys::FEATURE_FILE)
    }

    /// Feature name recorded by the runner.
    #[must_use]
    pub fn feature_name(&self) -> Option<&str> {
        self.get_str(keys::FEATURE_NAME)
    }

    /// Scenario name recorded by the runner.
    #[must_use]
    pub fn scenario_name(&self) -> Option<&str> {
        self.get_str(keys::SCENARIO_NAME)
    }

    /// Data row installed for the running unit.
    #[must_use]
    pub fn data_row(&self) -> Option<&DataRow> {
        self.get::<DataRow>(keys::DATA_ROW)
    }

    /// Mutable access to the running unit's data row.
    pub fn data_row_mut(&mut self) -> Option<&mut DataRow> {
        self.get_mut::<DataRow>(keys::DATA_ROW)
    }

    /// Outcome of the last unit, or `None` while one is running.
    #[must_use]
    pub fn test_result(&self) -> Option<&Outcome> {
        self.test_result.as_ref()
    }

    /// Record the outcome of the running unit.
    pub fn set_test_result(&mut self, outcome: Option<Outcome>) {
        self.test_result = outcome;
    }

    /// Driver handle stored for this worker.
    #[must_use]
    pub fn driver(&self) -> Option<&ContextValue> {
        self.driver.as_ref()
    }

    /// Driver handle downcast to its concrete type.
    #[must_use]
    pub fn driver_as<T: Any>(&self) -> Option<&T> {
        self.driver.as_ref()?.downcast_ref::<T>()
    }

    /// Replace the driver handle, returning the previous one.
    pub fn set_driver(&mut self, driver: Option<ContextValue>) -> Option<ContextValue> {
        std::mem::replace(&mut self.driver, driver)
    }

    /// Name of the test class being run.
    #[must_use]
    pub fn test_class(&self) -> Option<&str> {
        self.test_class.as_deref()
    }

    /// Set the test class name.
    pub fn set_test_class(&mut self, name: Option<String>) {
        self.test_class = name;
    }

    /// Name of the test method being run.
    #[must_use]
    pub fn test_method(&self) -> Option<&str> {
        self.test_method.as_deref()
    }

    /// Set the test method name.
    pub fn set_test_method(&mut self, name: Option<String>) {
        self.test_method = name;
    }

    /// Identifier of the running scenario.
    #[must_use]
    pub fn scenario_id(&self) -> Option<&str> {
        self.scenario_id.as_deref()
    }

    /// Set the scenario identifier.
    pub fn set_scenario_id(&mut self, id: Option<String>) {
        self.scenario_id = id;
    }

    /// Identifier of the suite the unit belongs to.
    #[must_use]
    pub fn suite_id(&self) -> Option<&str> {
        self.suite_id.as_deref()
    }

    /// Set the suite identifier.
    pub fn set_suite_id(&mut self, id: Option<String>) {
        self.suite_id = id;
    }

    /// Return `true` when the unit runs inside a worker pool.
    #[must_use]
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Set the parallel-mode flag.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.parallel = parallel;
    }
}

impl fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("worker", &self.worker)
            .field("created_at", &self.created_at)
            .field("test_result", &self.test_result)
            .field("has_driver", &self.driver.is_some())
            .field("test_class", &self.test_class)
            .field("test_method", &self.test_method)
            .field("scenario_id", &self.scenario_id)
            .field("suite_id", &self.suite_id)
            .field("keys", &self.keys())
            .field("parallel", &self.parallel)
            .finish()
    }
}

#[cfg(test)]
mod tests;
