//! Worker-isolated scenario and data-driven test execution.
//!
//! `weft` parses Gherkin-style features, resolves their steps against a
//! [`StepRegistry`](registry::StepRegistry) and runs scenarios and
//! data-driven invocations across a [`WorkerPool`]. Each worker owns one
//! [`ExecutionContext`] and its own page objects; nothing a unit writes is
//! visible to units on other workers, or to the next unit on the same one.
//!
//! ```
//! use weft::registry::StepRegistry;
//! use weft::{ScenarioRunner, feature};
//!
//! let registry = StepRegistry::builder()
//!     .step("the user has {count:u32} items", |ctx| {
//!         let count: u32 = ctx.arg(0)?;
//!         ctx.context_mut().insert("items", count);
//!         Ok(())
//!     })
//!     .step("the basket is not empty", |ctx| {
//!         let items = ctx.context().get::<u32>("items").copied().unwrap_or_default();
//!         weft::ensure!(items > 0, "basket is empty");
//!         Ok(())
//!     })
//!     .build()
//!     .unwrap_or_else(|err| panic!("{err}"));
//!
//! let feature = feature::parse(
//!     "Feature: Basket
//!       Scenario Outline: filled basket
//!         Given the user has <count> items
//!         Then the basket is not empty
//!       Examples:
//!         | count |
//!         | 1     |
//!         | 3     |
//!     ",
//! )
//! .unwrap_or_else(|err| panic!("{err}"));
//!
//! let runner = ScenarioRunner::new(&registry).record_outcomes(false);
//! let reports = runner.run_feature(&feature);
//! assert_eq!(reports.len(), 2);
//! assert!(reports.iter().all(|report| report.outcome.is_passed()));
//! ```

pub mod config;
pub mod context;
pub mod data;
pub mod error;
pub mod feature;
pub mod logging;
pub mod pages;
mod panic;
pub mod pool;
pub mod registry;
pub mod reporting;
mod row;
pub mod runner;
mod step;
mod worker;

#[doc(hidden)]
pub use inventory;

pub use config::{ConfigOverrides, RuntimeConfig};
pub use context::{ContextScope, ContextSnapshot, ContextStore, ExecutionContext};
pub use error::{ConfigurationError, Error};
pub use pages::{PageCache, PageObject};
pub use panic::panic_message;
pub use pool::WorkerPool;
pub use row::DataRow;
pub use runner::{Outcome, ScenarioRunner};
pub use step::{StepArgs, StepContext, StepError, StepResult};
pub use worker::WorkerId;
