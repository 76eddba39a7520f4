//! Registry build and lookup errors.

use std::fmt::Write as _;

use thiserror::Error;
use weft_patterns::PatternError;

use super::definition::Location;

/// A definition that matched ambiguous step text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCandidate {
    /// Pattern text as declared.
    pub pattern: String,
    /// Where it was declared.
    pub location: Location,
}

fn list_candidates(candidates: &[StepCandidate]) -> String {
    let mut out = String::new();
    for candidate in candidates {
        let _ = write!(out, "\n  `{}` at {}", candidate.pattern, candidate.location);
    }
    out
}

/// Step text resolved to zero or several definitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// No definition matches the text.
    #[error("no step definition matches `{text}`")]
    NoMatchingStep {
        /// Step text.
        text: String,
    },
    /// More than one definition matches the text.
    #[error(
        "step `{text}` matches {} definitions:{}",
        .candidates.len(),
        list_candidates(.candidates)
    )]
    AmbiguousStep {
        /// Step text.
        text: String,
        /// Every matching definition, in registration order.
        candidates: Vec<StepCandidate>,
    },
}

/// Step definitions that cannot form a registry.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RegistryError {
    /// A pattern failed to compile.
    #[error("invalid step pattern `{pattern}` at {location}: {source}")]
    InvalidPattern {
        /// Pattern text.
        pattern: String,
        /// Declaration site.
        location: Location,
        /// Compilation failure.
        #[source]
        source: PatternError,
    },
    /// The same pattern text was registered twice.
    #[error("duplicate step pattern `{pattern}` at {second}; first declared at {first}")]
    DuplicatePattern {
        /// Pattern text.
        pattern: String,
        /// First declaration.
        first: Location,
        /// Conflicting declaration.
        second: Location,
    },
    /// A global registry is already installed.
    #[error("a global step registry is already installed")]
    AlreadyInstalled,
}
