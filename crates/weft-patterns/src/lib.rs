//! Step-pattern utilities shared by the weft runtime.
//!
//! The crate classifies pattern text as literal, regex or placeholder
//! expression, compiles it into an anchored [`regex::Regex`], and extracts
//! argument values from matching step text. It also owns the
//! [`StepKeyword`] type used by the feature parser.

mod capture;
mod errors;
mod hint;
mod keyword;
mod pattern;

pub use capture::extract_captures;
pub use errors::{PatternError, PlaceholderErrorInfo};
pub use hint::PlaceholderType;
pub use keyword::{StepKeyword, StepKeywordParseError};
pub use pattern::{
    CompiledPattern, ExpressionSource, PatternKind, PlaceholderSpec, anchor_regex,
    build_expression_regex, looks_like_regex,
};
