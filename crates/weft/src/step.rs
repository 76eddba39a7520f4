//! What a step handler receives and returns.

use std::any::Any;
use std::error::Error as StdError;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use weft_patterns::StepKeyword;

use crate::context::ExecutionContext;
use crate::feature::{DataTable, DocString, Step};
use crate::pages::{ConstructionError, PageCache};

/// Result returned by step handlers.
pub type StepResult = Result<(), StepError>;

/// Failure or skip request raised by a step handler.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StepError {
    /// An expectation did not hold.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// A captured argument could not be converted.
    #[error("argument {index} (`{value}`) is invalid: {reason}")]
    Argument {
        /// Zero-based capture position.
        index: usize,
        /// Captured text, empty when the capture is missing.
        value: String,
        /// Why conversion failed.
        reason: String,
    },
    /// The handler failed for another reason.
    #[error("{0}")]
    Failed(String),
    /// A lower-level error escaped the handler.
    #[error(transparent)]
    Other(#[from] Box<dyn StdError + Send + Sync>),
    /// The scenario should stop and be reported as skipped.
    #[error("skipped{}", .reason.as_deref().map(|r| format!(": {r}")).unwrap_or_default())]
    Skipped {
        /// Optional explanation.
        reason: Option<String>,
    },
}

impl StepError {
    /// Build an assertion failure.
    pub fn assertion(message: impl Into<String>) -> Self {
        Self::Assertion(message.into())
    }

    /// Build a generic failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wrap any error.
    pub fn other(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Other(Box::new(error))
    }

    /// Request that the scenario be skipped.
    pub fn skipped(reason: Option<String>) -> Self {
        Self::Skipped { reason }
    }

    /// Return `true` for skip requests.
    #[must_use]
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl From<ConstructionError> for StepError {
    fn from(error: ConstructionError) -> Self {
        Self::other(error)
    }
}

/// End the current scenario as skipped.
///
/// ```
/// use weft::{StepContext, StepResult, skip};
///
/// fn needs_network(_ctx: &mut StepContext<'_>) -> StepResult {
///     skip!("network is unavailable");
/// }
/// ```
#[macro_export]
macro_rules! skip {
    () => {
        return ::core::result::Result::Err($crate::StepError::skipped(None))
    };
    ($($arg:tt)+) => {
        return ::core::result::Result::Err($crate::StepError::skipped(Some(::std::format!($($arg)+))))
    };
}

/// Fail the current step unless `cond` holds.
///
/// ```
/// use weft::{StepContext, StepResult, ensure};
///
/// fn has_three(_ctx: &mut StepContext<'_>) -> StepResult {
///     let items = vec![1, 2, 3];
///     ensure!(items.len() == 3, "expected 3 items, found {}", items.len());
///     Ok(())
/// }
/// ```
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        if !$cond {
            return ::core::result::Result::Err($crate::StepError::assertion(stringify!($cond)));
        }
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return ::core::result::Result::Err($crate::StepError::assertion(::std::format!($($arg)+)));
        }
    };
}

/// Captured arguments of a matched step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepArgs(Vec<String>);

impl StepArgs {
    /// Wrap captured values.
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self(values)
    }

    /// Raw capture at `index`.
    ///
    /// # Errors
    /// Returns [`StepError::Argument`] when there is no such capture.
    pub fn str(&self, index: usize) -> Result<&str, StepError> {
        self.0
            .get(index)
            .map(String::as_str)
            .ok_or_else(|| StepError::Argument {
                index,
                value: String::new(),
                reason: format!("the step captured only {} value(s)", self.0.len()),
            })
    }

    /// Capture at `index` converted with [`FromStr`].
    ///
    /// ```
    /// use weft::StepArgs;
    ///
    /// let args = StepArgs::new(vec!["42".into(), "x".into()]);
    /// assert_eq!(args.get::<u32>(0).ok(), Some(42));
    /// assert!(args.get::<u32>(1).is_err());
    /// assert!(args.get::<u32>(2).is_err());
    /// ```
    ///
    /// # Errors
    /// Returns [`StepError::Argument`] when the capture is missing or does
    /// not parse.
    pub fn get<T>(&self, index: usize) -> Result<T, StepError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.str(index)?;
        raw.parse::<T>().map_err(|err| StepError::Argument {
            index,
            value: raw.to_owned(),
            reason: err.to_string(),
        })
    }

    /// Number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Return `true` when nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Captures in order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Everything a handler can reach while its step runs.
pub struct StepContext<'a> {
    context: &'a mut ExecutionContext,
    pages: &'a PageCache,
    step: &'a Step,
    index: usize,
    args: StepArgs,
}

impl<'a> StepContext<'a> {
    pub(crate) fn new(
        context: &'a mut ExecutionContext,
        pages: &'a PageCache,
        step: &'a Step,
        index: usize,
        args: StepArgs,
    ) -> Self {
        Self {
            context,
            pages,
            step,
            index,
            args,
        }
    }

    /// Keyword as written in the feature.
    #[must_use]
    pub fn keyword(&self) -> StepKeyword {
        self.step.keyword()
    }

    /// Step text as matched.
    #[must_use]
    pub fn text(&self) -> &str {
        self.step.text()
    }

    /// Zero-based position of the step in its scenario.
    #[must_use]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Source line of the step.
    #[must_use]
    pub fn line(&self) -> usize {
        self.step.line()
    }

    /// Captured arguments.
    #[must_use]
    pub fn args(&self) -> &StepArgs {
        &self.args
    }

    /// Capture at `index` converted with [`FromStr`].
    ///
    /// # Errors
    /// Returns [`StepError::Argument`] when the capture is missing or does
    /// not parse.
    pub fn arg<T>(&self, index: usize) -> Result<T, StepError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.args.get(index)
    }

    /// Data table attached to the step.
    #[must_use]
    pub fn table(&self) -> Option<&DataTable> {
        self.step.table()
    }

    /// Doc string attached to the step.
    #[must_use]
    pub fn doc_string(&self) -> Option<&str> {
        self.step.doc_string().map(DocString::content)
    }

    /// The worker's execution context.
    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &*self.context
    }

    /// Mutable access to the worker's execution context.
    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut *self.context
    }

    /// The worker's instance of page type `T`.
    ///
    /// # Errors
    /// Returns [`ConstructionError`] when `T` has no registered constructor
    /// or construction fails.
    pub fn page<T: Any + Send + Sync>(&self) -> Result<Arc<T>, ConstructionError> {
        self.pages.get::<T>()
    }
}
