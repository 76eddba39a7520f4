//! Scenario and invocation execution.
//!
//! A [`ScenarioRunner`] executes one scenario at a time on the calling
//! worker. Steps run strictly in order and the first failure ends the
//! scenario. Whatever happens, the unit's data row and page objects are
//! discarded before `run` returns.

mod outcome;
mod report;

use std::panic::{AssertUnwindSafe, catch_unwind};

use chrono::Utc;
use tracing::{debug, debug_span, info, info_span, warn};

use crate::context::{ContextStore, ExecutionContext, keys};
use crate::feature::{Feature, Scenario, Step};
use crate::pages::PageCache;
use crate::panic::panic_message;
use crate::registry::StepRegistry;
use crate::reporting::{self, UnitRecord};
use crate::row::DataRow;
use crate::step::{StepArgs, StepContext, StepError, StepResult};
use crate::worker::WorkerId;

pub use outcome::{FailedStep, Failure, FailureKind, Outcome};
pub use report::{InvocationReport, ScenarioReport, StepReport, StepStatus};

/// Why a scenario stopped early.
enum Interrupt {
    Skipped(Option<String>),
    Failed(Failure),
}

/// Removes per-unit state however the unit ends.
struct UnitCleanup<'a> {
    store: &'a ContextStore,
    pages: &'a PageCache,
}

impl Drop for UnitCleanup<'_> {
    fn drop(&mut self) {
        self.store.try_with_current(|ctx| ctx.remove(keys::DATA_ROW));
        self.pages.clear();
    }
}

/// Executes scenarios against a step registry.
///
/// ```
/// use weft::ScenarioRunner;
/// use weft::registry::StepRegistry;
///
/// let registry = StepRegistry::builder()
///     .step("the user logs in", |ctx| {
///         ctx.context_mut().insert("session", String::from("abc"));
///         Ok(())
///     })
///     .build()
///     .unwrap_or_else(|err| panic!("{err}"));
/// let feature = weft::feature::parse("Feature: f\nScenario: s\n Given the user logs in\n")
///     .unwrap_or_else(|err| panic!("{err}"));
///
/// let runner = ScenarioRunner::new(&registry).record_outcomes(false);
/// let reports = runner.run_feature(&feature);
/// assert!(reports.iter().all(|report| report.outcome.is_passed()));
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ScenarioRunner<'a> {
    registry: &'a StepRegistry,
    store: &'a ContextStore,
    pages: &'a PageCache,
    record: bool,
}

impl<'a> ScenarioRunner<'a> {
    /// Runner using the global context store and page cache.
    #[must_use]
    pub fn new(registry: &'a StepRegistry) -> Self {
        Self {
            registry,
            store: ContextStore::global(),
            pages: PageCache::global(),
            record: true,
        }
    }

    /// Use `store` for execution contexts.
    #[must_use]
    pub fn with_store(mut self, store: &'a ContextStore) -> Self {
        self.store = store;
        self
    }

    /// Use `pages` for page objects.
    #[must_use]
    pub fn with_pages(mut self, pages: &'a PageCache) -> Self {
        self.pages = pages;
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

    /// Registry steps are resolved against.
    #[must_use]
    pub fn registry(&self) -> &'a StepRegistry {
        self.registry
    }

    /// Context store the runner writes to.
    #[must_use]
    pub fn store(&self) -> &'a ContextStore {
        self.store
    }

    /// Run every scenario of `feature` in order on the calling worker.
    #[must_use]
    pub fn run_feature(&self, feature: &Feature) -> Vec<ScenarioReport> {
        feature
            .scenarios()
            .iter()
            .map(|scenario| self.run(feature, scenario))
            .collect()
    }

    /// Run one scenario on the calling worker.
    #[must_use]
    pub fn run(&self, feature: &Feature, scenario: &Scenario) -> ScenarioReport {
        self.execute(feature, scenario, scenario.data_row())
    }

    /// Run `scenario` with `row` installed as its data row.
    ///
    /// Combines a scenario with rows produced by a
    /// [`DataProvider`](crate::data::DataProvider).
    #[must_use]
    pub fn run_with_row(&self, feature: &Feature, scenario: &Scenario, row: &DataRow) -> ScenarioReport {
        self.execute(feature, scenario, Some(row))
    }

    fn execute(&self, feature: &Feature, scenario: &Scenario, row: Option<&DataRow>) -> ScenarioReport {
        let worker = WorkerId::current();
        let span = info_span!(
            "scenario",
            feature = feature.name(),
            scenario = scenario.name(),
            %worker
        );
        let _entered = span.enter();
        let _cleanup = UnitCleanup {
            store: self.store,
            pages: self.pages,
        };

        let scenario_id = format!("{}:{}", feature.source_label(), scenario.id());
        self.store
            .with_current(|ctx| install(ctx, feature, scenario, row, &scenario_id));

        let started_at = Utc::now();
        let mut steps = Vec::with_capacity(scenario.steps().len());
        let mut interrupt = None;
        for (index, step) in scenario.steps().iter().enumerate() {
            if interrupt.is_some() {
                steps.push(StepReport::new(index, step, StepStatus::NotRun));
                continue;
            }
            let status = match self.run_step(index, step) {
                Ok(()) => StepStatus::Passed,
                Err(Interrupt::Skipped(reason)) => {
                    interrupt = Some(Interrupt::Skipped(reason));
                    StepStatus::Skipped
                }
                Err(Interrupt::Failed(failure)) => {
                    interrupt = Some(Interrupt::Failed(failure));
                    StepStatus::Failed
                }
            };
            steps.push(StepReport::new(index, step, status));
        }

        let outcome = match interrupt {
            None => Outcome::Passed,
            Some(Interrupt::Skipped(reason)) => Outcome::Skipped { reason },
            Some(Interrupt::Failed(failure)) => Outcome::Failed(failure),
        };
        info!(outcome = %outcome, "scenario finished");
        let stored = outcome.clone();
        self.store
            .with_current(|ctx| ctx.set_test_result(Some(stored)));

        let report = ScenarioReport {
            feature_name: feature.name().to_owned(),
            feature_file: feature.source_label().to_owned(),
            scenario_name: scenario.name().to_owned(),
            scenario_id,
            line: scenario.line(),
            tags: scenario.tags().to_vec(),
            worker,
            data_row: row.cloned(),
            steps,
            outcome,
            started_at,
            finished_at: Utc::now(),
        };
        if self.record {
            reporting::record(UnitRecord::from(&report));
        }
        report
    }

    fn run_step(&self, index: usize, step: &Step) -> Result<(), Interrupt> {
        let span = debug_span!(
            "step",
            index,
            keyword = %step.keyword(),
            text = step.text(),
            line = step.line()
        );
        let _entered = span.enter();

        let resolved = self.registry.resolve(step.text()).map_err(|err| {
            warn!(error = %err, "step could not be resolved");
            Interrupt::Failed(Failure::from_resolve(&err).at(index, step))
        })?;
        let args = StepArgs::new(resolved.captures);
        let definition = resolved.definition;
        let result = self.store.with_current(|ctx| {
            let mut step_ctx = StepContext::new(ctx, self.pages, step, index, args);
            catch_unwind(AssertUnwindSafe(|| definition.invoke(&mut step_ctx)))
        });

        match result {
            Ok(Ok(())) => {
                debug!("step passed");
                Ok(())
            }
            Ok(Err(StepError::Skipped { reason })) => {
                info!(reason = reason.as_deref().unwrap_or_default(), "step requested skip");
                Err(Interrupt::Skipped(reason))
            }
            Ok(Err(err)) => {
                warn!(error = %err, "step failed");
                Err(Interrupt::Failed(Failure::from_step_error(&err).at(index, step)))
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                warn!(panic = %message, "step panicked");
                Err(Interrupt::Failed(
                    Failure::new(FailureKind::Panic, message).at(index, step),
                ))
            }
        }
    }
}

fn install(
    ctx: &mut ExecutionContext,
    feature: &Feature,
    scenario: &Scenario,
    row: Option<&DataRow>,
    scenario_id: &str,
) {
    ctx.insert(keys::FEATURE_FILE, feature.source_label().to_owned());
    ctx.insert(keys::FEATURE_NAME, feature.name().to_owned());
    ctx.insert(keys::SCENARIO_NAME, scenario.name().to_owned());
    match row {
        Some(row) => {
            ctx.insert(keys::DATA_ROW, row.clone());
        }
        None => {
            ctx.remove(keys::DATA_ROW);
        }
    }
    ctx.set_test_class(Some(feature.name().to_owned()));
    ctx.set_test_method(Some(scenario.name().to_owned()));
    ctx.set_scenario_id(Some(scenario_id.to_owned()));
    ctx.set_test_result(None);
}

/// Run one data-driven invocation of `test` with `row` on the calling
/// worker.
///
/// The row is installed as the context's data row for the duration of the
/// call; handler errors and panics become a failed outcome.
pub fn run_invocation<F>(
    store: &ContextStore,
    name: &str,
    index: usize,
    row: DataRow,
    test: F,
) -> InvocationReport
where
    F: FnOnce(&mut ExecutionContext, &DataRow) -> StepResult,
{
    let worker = WorkerId::current();
    let span = info_span!("invocation", test = name, index, %worker);
    let _entered = span.enter();

    let result = store.with_current(|ctx| {
        ctx.set_test_method(Some(name.to_owned()));
        ctx.insert(keys::DATA_ROW, row.clone());
        ctx.set_test_result(None);
        let result = catch_unwind(AssertUnwindSafe(|| test(ctx, &row)));
        ctx.remove(keys::DATA_ROW);
        result
    });
    let outcome = match result {
        Ok(Ok(())) => Outcome::Passed,
        Ok(Err(StepError::Skipped { reason })) => Outcome::Skipped { reason },
        Ok(Err(err)) => Outcome::Failed(Failure::from_step_error(&err)),
        Err(payload) => Outcome::Failed(Failure::new(
            FailureKind::Panic,
            panic_message(payload.as_ref()),
        )),
    };
    info!(outcome = %outcome, "invocation finished");
    let stored = outcome.clone();
    store.with_current(|ctx| ctx.set_test_result(Some(stored)));
    InvocationReport {
        name: name.to_owned(),
        index,
        row,
        worker,
        outcome,
    }
}
