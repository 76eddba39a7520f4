//! Step declarations collected at link time.

use std::fmt;
use std::sync::Arc;

use crate::step::{StepContext, StepResult};

/// Function pointer form of a step handler.
pub type StepFn = fn(&mut StepContext<'_>) -> StepResult;

/// Shared, type-erased step handler.
pub type StepHandler = Arc<dyn Fn(&mut StepContext<'_>) -> StepResult + Send + Sync>;

/// Source position of a step declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct Location {
    /// Source file.
    pub file: &'static str,
    /// One-based line.
    pub line: u32,
}

impl Location {
    /// Location of the caller of a `#[track_caller]` function.
    #[track_caller]
    #[must_use]
    pub fn caller() -> Self {
        let caller = std::panic::Location::caller();
        Self {
            file: caller.file(),
            line: caller.line(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// A step declared with [`step!`](crate::step!).
///
/// Declarations are gathered by `inventory` and compiled when a
/// [`StepRegistry`](super::StepRegistry) scans their namespace.
#[derive(Debug)]
pub struct StepDefinition {
    /// Pattern text; see [`weft_patterns::CompiledPattern::compile`].
    pub pattern: &'static str,
    /// Handler invoked when the pattern matches.
    pub run: StepFn,
    /// Module path of the declaration.
    pub namespace: &'static str,
    /// Source file of the declaration.
    pub file: &'static str,
    /// Line of the declaration.
    pub line: u32,
}

impl StepDefinition {
    /// Where the step was declared.
    #[must_use]
    pub fn location(&self) -> Location {
        Location {
            file: self.file,
            line: self.line,
        }
    }

    /// Return `true` when the declaration lives in `namespace` or a module
    /// nested under it. An empty namespace contains everything.
    #[must_use]
    pub fn in_namespace(&self, namespace: &str) -> bool {
        namespace.is_empty()
            || self
                .namespace
                .strip_prefix(namespace)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with("::"))
    }
}

inventory::collect!(StepDefinition);

/// Declare a step definition.
///
/// The handler is any function, or non-capturing closure, taking
/// `&mut StepContext<'_>` and returning [`StepResult`]. The declaration
/// records the enclosing module as its namespace.
///
/// ```
/// use weft::{StepContext, StepResult, step};
///
/// fn logs_in(ctx: &mut StepContext<'_>) -> StepResult {
///     ctx.context_mut().insert("logged_in", true);
///     Ok(())
/// }
///
/// step!("the user logs in", logs_in);
/// step!("the user has {count:u32} items", |ctx| {
///     let count: u32 = ctx.arg(0)?;
///     ctx.context_mut().insert("count", count);
///     Ok(())
/// });
/// ```
#[macro_export]
macro_rules! step {
    ($pattern:expr, $handler:expr $(,)?) => {
        $crate::inventory::submit! {
            $crate::registry::StepDefinition {
                pattern: $pattern,
                run: $handler,
                namespace: ::core::module_path!(),
                file: ::core::file!(),
                line: ::core::line!(),
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn noop(_: &mut StepContext<'_>) -> StepResult {
        Ok(())
    }

    #[rstest]
    #[case("app::steps", "app", true)]
    #[case("app::steps", "app::steps", true)]
    #[case("app::steps::login", "app::steps", true)]
    #[case("app::stepsx", "app::steps", false)]
    #[case("other::steps", "app", false)]
    #[case("app::steps", "", true)]
    fn namespace_matches_module_prefixes(
        #[case] declared: &'static str,
        #[case] scanned: &str,
        #[case] expected: bool,
    ) {
        let definition = StepDefinition {
            pattern: "p",
            run: noop,
            namespace: declared,
            file: "steps.rs",
            line: 1,
        };
        assert_eq!(definition.in_namespace(scanned), expected);
    }

    #[test]
    fn location_displays_file_and_line() {
        let location = Location {
            file: "src/steps.rs",
            line: 12,
        };
        assert_eq!(location.to_string(), "src/steps.rs:12");
    }
}
