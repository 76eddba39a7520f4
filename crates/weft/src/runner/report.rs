//! Per-unit run reports.

use chrono::{DateTime, Utc};
use serde::Serialize;
use weft_patterns::StepKeyword;

use super::outcome::{Outcome, serialize_keyword};
use crate::feature::Step;
use crate::row::DataRow;
use crate::worker::WorkerId;

/// What happened to one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// The handler succeeded.
    Passed,
    /// The step could not be resolved or its handler failed.
    Failed,
    /// The handler requested a skip.
    Skipped,
    /// An earlier step ended the scenario.
    NotRun,
}

/// Report for one step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    /// Zero-based position in the scenario.
    pub index: usize,
    /// Keyword as written.
    #[serde(serialize_with = "serialize_keyword")]
    pub keyword: StepKeyword,
    /// Step text.
    pub text: String,
    /// Source line.
    pub line: usize,
    /// Result.
    pub status: StepStatus,
}

impl StepReport {
    pub(crate) fn new(index: usize, step: &Step, status: StepStatus) -> Self {
        Self {
            index,
            keyword: step.keyword(),
            text: step.text().to_owned(),
            line: step.line(),
            status,
        }
    }
}

/// Report for one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScenarioReport {
    /// Feature name.
    pub feature_name: String,
    /// Feature path, or name when parsed from text.
    pub feature_file: String,
    /// Scenario name.
    pub scenario_name: String,
    /// Scenario identifier within the feature.
    pub scenario_id: String,
    /// Source line of the scenario.
    pub line: usize,
    /// Tags in effect.
    pub tags: Vec<String>,
    /// Worker that ran the scenario.
    pub worker: WorkerId,
    /// Row the scenario ran with.
    pub data_row: Option<DataRow>,
    /// Step results in order.
    pub steps: Vec<StepReport>,
    /// Terminal outcome.
    pub outcome: Outcome,
    /// When the first step started.
    pub started_at: DateTime<Utc>,
    /// When the scenario ended.
    pub finished_at: DateTime<Utc>,
}

impl ScenarioReport {
    /// Steps with the given status.
    pub fn steps_with(&self, status: StepStatus) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(move |step| step.status == status)
    }
}

/// Report for one data-driven invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationReport {
    /// Test name.
    pub name: String,
    /// Zero-based position of the row in the provider's output.
    pub index: usize,
    /// Row the invocation consumed.
    pub row: DataRow,
    /// Worker that ran it.
    pub worker: WorkerId,
    /// Terminal outcome.
    pub outcome: Outcome,
}
