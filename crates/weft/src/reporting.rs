//! Process-wide outcome collector.
//!
//! Runners submit one [`UnitRecord`] per finished scenario or data-driven
//! invocation. Renderers read them back with [`snapshot`] or [`drain`]; the
//! collector itself never formats anything.
//!
//! Records are kept until [`drain`] or [`clear`] removes them, so the buffer
//! grows with every recorded unit. A long-lived process that runs suites
//! repeatedly must drain after each run, or turn recording off with
//! `record_outcomes(false)` on the runner or pool.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::RuntimeConfig;
use crate::runner::{InvocationReport, Outcome, ScenarioReport};
use crate::worker::WorkerId;

/// Tag exempting a unit from `fail_on_skipped`.
pub const ALLOW_SKIPPED_TAG: &str = "@allow_skipped";

static RECORDS: Mutex<Vec<UnitRecord>> = Mutex::new(Vec::new());

fn lock_records() -> MutexGuard<'static, Vec<UnitRecord>> {
    RECORDS.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of one finished unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitRecord {
    /// Feature path or name; `None` for data-driven invocations.
    pub feature: Option<String>,
    /// Scenario or test name.
    pub name: String,
    /// Tags in effect.
    pub tags: Vec<String>,
    /// Worker that ran the unit.
    pub worker: WorkerId,
    /// How it ended.
    pub outcome: Outcome,
    /// When the record was created.
    pub recorded_at: DateTime<Utc>,
}

impl UnitRecord {
    /// Return `true` when the unit may be skipped even under
    /// `fail_on_skipped`.
    #[must_use]
    pub fn allows_skip(&self) -> bool {
        self.tags.iter().any(|tag| tag == ALLOW_SKIPPED_TAG)
    }
}

impl From<&ScenarioReport> for UnitRecord {
    fn from(report: &ScenarioReport) -> Self {
        Self {
            feature: Some(report.feature_file.clone()),
            name: report.scenario_name.clone(),
            tags: report.tags.clone(),
            worker: report.worker,
            outcome: report.outcome.clone(),
            recorded_at: Utc::now(),
        }
    }
}

impl From<&InvocationReport> for UnitRecord {
    fn from(report: &InvocationReport) -> Self {
        Self {
            feature: None,
            name: format!("{}[{}]", report.name, report.index),
            tags: Vec::new(),
            worker: report.worker,
            outcome: report.outcome.clone(),
            recorded_at: Utc::now(),
        }
    }
}

/// Append a record.
///
/// The record stays in memory until the next [`drain`] or [`clear`].
pub fn record(record: UnitRecord) {
    lock_records().push(record);
}

/// Copy of every record so far.
#[must_use]
pub fn snapshot() -> Vec<UnitRecord> {
    lock_records().clone()
}

/// Remove and return every record.
///
/// This is how a run hands its records to a renderer and releases them.
#[must_use]
pub fn drain() -> Vec<UnitRecord> {
    std::mem::take(&mut *lock_records())
}

/// Discard every record.
pub fn clear() {
    lock_records().clear();
}

/// Outcome counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Units that passed.
    pub passed: usize,
    /// Units that failed, including disallowed skips.
    pub failed: usize,
    /// Units that were skipped and allowed to be.
    pub skipped: usize,
}

impl Summary {
    /// Tally `records`.
    ///
    /// With `fail_on_skipped`, skipped units lacking
    /// [`ALLOW_SKIPPED_TAG`] count as failures.
    #[must_use]
    pub fn of(records: &[UnitRecord], fail_on_skipped: bool) -> Self {
        records.iter().fold(Self::default(), |mut summary, record| {
            match &record.outcome {
                Outcome::Passed => summary.passed += 1,
                Outcome::Failed(_) => summary.failed += 1,
                Outcome::Skipped { .. } if fail_on_skipped && !record.allows_skip() => {
                    summary.failed += 1;
                }
                Outcome::Skipped { .. } => summary.skipped += 1,
            }
            summary
        })
    }

    /// Total units.
    #[must_use]
    pub fn total(&self) -> usize {
        self.passed + self.failed + self.skipped
    }

    /// Return `true` when nothing failed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

/// Tally the collected records.
#[must_use]
pub fn summary(fail_on_skipped: bool) -> Summary {
    Summary::of(&lock_records(), fail_on_skipped)
}

/// Tally the collected records, honouring
/// [`RuntimeConfig::fail_on_skipped`].
#[must_use]
pub fn summary_for(config: &RuntimeConfig) -> Summary {
    summary(config.fail_on_skipped())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::{Failure, FailureKind};
    use serial_test::serial;

    fn unit(name: &str, outcome: Outcome, tags: &[&str]) -> UnitRecord {
        UnitRecord {
            feature: Some("login.feature".into()),
            name: name.into(),
            tags: tags.iter().map(|t| (*t).to_owned()).collect(),
            worker: WorkerId::current(),
            outcome,
            recorded_at: Utc::now(),
        }
    }

    fn mixed() -> Vec<UnitRecord> {
        vec![
            unit("a", Outcome::Passed, &[]),
            unit(
                "b",
                Outcome::Failed(Failure::new(FailureKind::Error, "boom")),
                &[],
            ),
            unit("c", Outcome::Skipped { reason: None }, &[]),
            unit("d", Outcome::Skipped { reason: None }, &[ALLOW_SKIPPED_TAG]),
        ]
    }

    #[test]
    fn skips_count_as_skipped_by_default() {
        let summary = Summary::of(&mixed(), false);
        assert_eq!(
            summary,
            Summary {
                passed: 1,
                failed: 1,
                skipped: 2
            }
        );
        assert_eq!(summary.total(), 4);
    }

    #[test]
    fn fail_on_skipped_respects_allow_tag() {
        let summary = Summary::of(&mixed(), true);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.skipped, 1);
        assert!(!summary.is_success());
    }

    #[test]
    #[serial(reporting)]
    fn drain_empties_the_collector() {
        clear();
        record(unit("a", Outcome::Passed, &[]));
        assert_eq!(snapshot().len(), 1);
        assert_eq!(drain().len(), 1);
        assert!(snapshot().is_empty());
    }

    #[test]
    #[serial(reporting)]
    fn summary_for_reads_the_skip_policy() {
        clear();
        for unit in mixed() {
            record(unit);
        }
        let strict = RuntimeConfig::default().with_fail_on_skipped(true);
        assert_eq!(summary_for(&strict).failed, 2);
        assert_eq!(summary_for(&RuntimeConfig::default()).failed, 1);
        clear();
    }
}
