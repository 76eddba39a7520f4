//! Terminal status of a unit.

use std::fmt;

use serde::{Serialize, Serializer};
use thiserror::Error;
use weft_patterns::StepKeyword;

use crate::feature::Step;
use crate::registry::ResolveError;
use crate::step::StepError;

pub(crate) fn serialize_keyword<S: Serializer>(
    keyword: &StepKeyword,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(keyword.as_str())
}

/// How a unit ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// Every step succeeded.
    Passed,
    /// A step failed; later steps did not run.
    Failed(Failure),
    /// A step asked for the unit to be skipped.
    Skipped {
        /// Explanation given by the step.
        reason: Option<String>,
    },
}

impl Outcome {
    /// Return `true` for [`Outcome::Passed`].
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    /// Return `true` for [`Outcome::Failed`].
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Return `true` for [`Outcome::Skipped`].
    #[must_use]
    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    /// Failure details for failed outcomes.
    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => f.write_str("passed"),
            Self::Failed(failure) => write!(f, "failed: {failure}"),
            Self::Skipped { reason: None } => f.write_str("skipped"),
            Self::Skipped {
                reason: Some(reason),
            } => write!(f, "skipped: {reason}"),
        }
    }
}

/// Category of a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// No definition matched the step.
    NoMatchingStep,
    /// Several definitions matched the step.
    AmbiguousStep,
    /// A handler assertion failed.
    Assertion,
    /// A captured argument did not convert.
    Argument,
    /// A handler returned an error.
    Error,
    /// A handler panicked.
    Panic,
}

/// The step a failure happened at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    /// Zero-based position in the scenario, background steps included.
    pub index: usize,
    /// Keyword as written.
    #[serde(serialize_with = "serialize_keyword")]
    pub keyword: StepKeyword,
    /// Step text.
    pub text: String,
    /// Source line.
    pub line: usize,
}

/// Why a unit failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
pub struct Failure {
    /// Category.
    pub kind: FailureKind,
    /// Human-readable reason.
    pub message: String,
    /// Failing step, absent for data-driven invocations.
    pub step: Option<FailedStep>,
}

impl Failure {
    /// Failure not tied to a step.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            step: None,
        }
    }

    /// Attach the failing step.
    #[must_use]
    pub fn at(mut self, index: usize, step: &Step) -> Self {
        self.step = Some(FailedStep {
            index,
            keyword: step.keyword(),
            text: step.text().to_owned(),
            line: step.line(),
        });
        self
    }

    pub(crate) fn from_resolve(error: &ResolveError) -> Self {
        let kind = match error {
            ResolveError::NoMatchingStep { .. } => FailureKind::NoMatchingStep,
            ResolveError::AmbiguousStep { .. } => FailureKind::AmbiguousStep,
        };
        Self::new(kind, error.to_string())
    }

    /// Classify a handler error. Skip requests are not failures and must be
    /// handled before calling this.
    pub(crate) fn from_step_error(error: &StepError) -> Self {
        let kind = match error {
            StepError::Assertion(_) => FailureKind::Assertion,
            StepError::Argument { .. } => FailureKind::Argument,
            _ => FailureKind::Error,
        };
        Self::new(kind, error.to_string())
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.step {
            Some(step) => write!(
                f,
                "step {} `{} {}` (line {}): {}",
                step.index + 1,
                step.keyword,
                step.text,
                step.line,
                self.message
            ),
            None => f.write_str(&self.message),
        }
    }
}
