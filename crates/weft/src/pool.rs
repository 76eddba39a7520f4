//! Parallel execution of scenarios and data-driven invocations.
//!
//! Every unit runs inside a [`ContextScope`](crate::ContextScope) on one
//! pool thread, so each starts from an empty context and leaves nothing
//! behind. Handlers must not submit work to the same pool; a thread blocked
//! in a unit could pick up another unit and share its worker identity.

use std::num::NonZeroUsize;

use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use tracing::{debug, info};

use crate::config::RuntimeConfig;
use crate::context::{ContextStore, ExecutionContext};
use crate::feature::{Feature, Scenario};
use crate::pages::PageCache;
use crate::registry::StepRegistry;
use crate::reporting::{self, UnitRecord};
use crate::row::DataRow;
use crate::runner::{self, InvocationReport, ScenarioReport, ScenarioRunner};
use crate::step::StepResult;

/// Fixed set of worker threads.
///
/// ```
/// use std::num::NonZeroUsize;
///
/// use weft::{DataRow, WorkerPool};
///
/// let pool = WorkerPool::new(NonZeroUsize::new(2))
///     .unwrap_or_else(|err| panic!("{err}"))
///     .record_outcomes(false);
/// let rows = vec![
///     DataRow::from_pairs([("user", "a")]),
///     DataRow::from_pairs([("user", "b")]),
/// ];
/// let reports = pool.run_data_driven("login", rows, |ctx, row| {
///     weft::ensure!(ctx.is_parallel());
///     weft::ensure!(row.get("user").is_some());
///     Ok(())
/// });
/// assert_eq!(reports.len(), 2);
/// assert!(reports.iter().all(|report| report.outcome.is_passed()));
/// ```
#[derive(Debug)]
pub struct WorkerPool<'a> {
    pool: ThreadPool,
    store: &'a ContextStore,
    pages: &'a PageCache,
    suite_id: Option<String>,
    record: bool,
}

impl WorkerPool<'static> {
    /// Pool of `workers` threads, or one per CPU when `None`, using the
    /// global context store and page cache.
    ///
    /// # Errors
    /// Returns [`ThreadPoolBuildError`] when the threads cannot be spawned.
    pub fn new(workers: Option<NonZeroUsize>) -> Result<Self, ThreadPoolBuildError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers.map_or(0, NonZeroUsize::get))
            .thread_name(|index| format!("weft-worker-{index}"))
            .build()?;
        debug!(workers = pool.current_num_threads(), "started worker pool");
        Ok(Self {
            pool,
            store: ContextStore::global(),
            pages: PageCache::global(),
            suite_id: None,
            record: true,
        })
    }

    /// Pool sized by `config`.
    ///
    /// # Errors
    /// Returns [`ThreadPoolBuildError`] when the threads cannot be spawned.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, ThreadPoolBuildError> {
        Self::new(config.workers())
    }
}

impl<'a> WorkerPool<'a> {
    /// Use `store` for execution contexts.
    #[must_use]
    pub fn with_store<'b>(self, store: &'b ContextStore) -> WorkerPool<'b>
    where
        'a: 'b,
    {
        WorkerPool { store, ..self }
    }

    /// Use `pages` for page objects.
    #[must_use]
    pub fn with_pages<'b>(self, pages: &'b PageCache) -> WorkerPool<'b>
    where
        'a: 'b,
    {
        WorkerPool { pages, ..self }
    }

    /// Stamp every unit's context with `suite_id`.
    #[must_use]
    pub fn with_suite_id(mut self, suite_id: impl Into<String>) -> Self {
        self.suite_id = Some(suite_id.into());
        self
    }

    /// Choose whether finished units are submitted to
    /// [`reporting`](crate::reporting). Enabled by default; submitted
    /// records are held until [`reporting::drain`](crate::reporting::drain)
    /// takes them.
    #[must_use]
    pub fn record_outcomes(mut self, record: bool) -> Self {
        self.record = record;
        self
    }

    /// Number of threads.
    #[must_use]
    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    fn enter(&self, ctx: &mut ExecutionContext) {
        ctx.set_parallel(true);
        ctx.set_suite_id(self.suite_id.clone());
    }

    /// Run every scenario of `features` in parallel.
    ///
    /// Reports come back in submission order: features in the order given,
    /// scenarios in source order within each.
    #[must_use]
    pub fn run_features(&self, registry: &StepRegistry, features: &[Feature]) -> Vec<ScenarioReport> {
        let runner = ScenarioRunner::new(registry)
            .with_store(self.store)
            .with_pages(self.pages)
            .record_outcomes(self.record);
        let units: Vec<(&Feature, &Scenario)> = features
            .iter()
            .flat_map(|feature| feature.scenarios().iter().map(move |scenario| (feature, scenario)))
            .collect();
        info!(units = units.len(), workers = self.workers(), "running scenarios");
        self.pool.install(|| {
            units
                .par_iter()
                .map(|&(feature, scenario)| {
                    let _scope = self.store.scope();
                    self.store.with_current(|ctx| self.enter(ctx));
                    runner.run(feature, scenario)
                })
                .collect()
        })
    }

    /// Run `test` once per row in parallel.
    ///
    /// Row `i` is consumed by invocation `i` only; reports come back in row
    /// order.
    #[must_use]
    pub fn run_data_driven<F>(&self, name: &str, rows: Vec<DataRow>, test: F) -> Vec<InvocationReport>
    where
        F: Fn(&mut ExecutionContext, &DataRow) -> StepResult + Send + Sync,
    {
        info!(test = name, units = rows.len(), workers = self.workers(), "running invocations");
        self.pool.install(|| {
            rows.into_par_iter()
                .enumerate()
                .map(|(index, row)| {
                    let _scope = self.store.scope();
                    self.store.with_current(|ctx| {
                        self.enter(ctx);
                        ctx.set_test_class(Some(name.to_owned()));
                    });
                    let report = runner::run_invocation(self.store, name, index, row, &test);
                    self.pages.clear();
                    if self.record {
                        reporting::record(UnitRecord::from(&report));
                    }
                    report
                })
                .collect()
        })
    }
}
