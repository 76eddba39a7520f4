//! Step registration and resolution.
//!
//! Definitions are declared with [`step!`](crate::step!) or registered on a
//! [`StepRegistryBuilder`], then compiled into an immutable
//! [`StepRegistry`]. Resolution always scans every definition: exactly one
//! match wins, anything else is a [`ResolveError`].

mod definition;
mod error;

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, trace};
use weft_patterns::{CompiledPattern, PatternKind};

use crate::config::RuntimeConfig;
use crate::step::{StepContext, StepResult};

pub use definition::{Location, StepDefinition, StepFn, StepHandler};
pub use error::{RegistryError, ResolveError, StepCandidate};

/// A compiled step definition.
pub struct RegisteredStep {
    pattern: CompiledPattern,
    handler: StepHandler,
    location: Location,
    namespace: String,
    used: AtomicBool,
}

impl RegisteredStep {
    /// Pattern text as declared.
    #[must_use]
    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    /// How the pattern is interpreted.
    #[must_use]
    pub fn kind(&self) -> PatternKind {
        self.pattern.kind()
    }

    /// Where the definition was declared.
    #[must_use]
    pub fn location(&self) -> Location {
        self.location
    }

    /// Namespace the definition was registered under.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Run the handler.
    pub fn invoke(&self, ctx: &mut StepContext<'_>) -> StepResult {
        (self.handler)(ctx)
    }

    fn candidate(&self) -> StepCandidate {
        StepCandidate {
            pattern: self.pattern().to_owned(),
            location: self.location,
        }
    }
}

impl fmt::Debug for RegisteredStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisteredStep")
            .field("pattern", &self.pattern.as_str())
            .field("kind", &self.pattern.kind())
            .field("location", &self.location)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

/// The single definition matching a step, with its captures.
#[derive(Debug)]
pub struct ResolvedStep<'r> {
    /// Matching definition.
    pub definition: &'r RegisteredStep,
    /// Captured argument values in pattern order.
    pub captures: Vec<String>,
}

struct PendingStep {
    pattern: String,
    handler: StepHandler,
    location: Location,
    namespace: String,
}

/// Collects definitions before compiling them into a [`StepRegistry`].
#[derive(Default)]
#[must_use]
pub struct StepRegistryBuilder {
    pending: Vec<PendingStep>,
}

impl StepRegistryBuilder {
    /// Register a closure for `pattern`.
    ///
    /// The caller's source location is recorded for diagnostics.
    #[track_caller]
    pub fn step<F>(mut self, pattern: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&mut StepContext<'_>) -> StepResult + Send + Sync + 'static,
    {
        self.pending.push(PendingStep {
            pattern: pattern.into(),
            handler: Arc::new(handler),
            location: Location::caller(),
            namespace: String::new(),
        });
        self
    }

    /// Add one `inventory` declaration.
    pub fn definition(mut self, definition: &'static StepDefinition) -> Self {
        self.pending.push(PendingStep {
            pattern: definition.pattern.to_owned(),
            handler: Arc::new(definition.run),
            location: definition.location(),
            namespace: definition.namespace.to_owned(),
        });
        self
    }

    /// Add every declaration in `namespace` or modules nested under it.
    pub fn scan(mut self, namespace: &str) -> Self {
        for definition in inventory::iter::<StepDefinition> {
            if definition.in_namespace(namespace) {
                self = self.definition(definition);
            }
        }
        self
    }

    /// Compile every pattern and build the registry.
    ///
    /// # Errors
    /// Returns [`RegistryError::InvalidPattern`] when a pattern does not
    /// compile and [`RegistryError::DuplicatePattern`] when two definitions
    /// share pattern text.
    pub fn build(self) -> Result<StepRegistry, RegistryError> {
        let mut seen: HashMap<String, Location> = HashMap::with_capacity(self.pending.len());
        let mut steps = Vec::with_capacity(self.pending.len());
        for pending in self.pending {
            if let Some(first) = seen.get(&pending.pattern) {
                return Err(RegistryError::DuplicatePattern {
                    pattern: pending.pattern,
                    first: *first,
                    second: pending.location,
                });
            }
            let pattern = CompiledPattern::compile(&pending.pattern).map_err(|source| {
                RegistryError::InvalidPattern {
                    pattern: pending.pattern.clone(),
                    location: pending.location,
                    source,
                }
            })?;
            seen.insert(pending.pattern, pending.location);
            steps.push(RegisteredStep {
                pattern,
                handler: pending.handler,
                location: pending.location,
                namespace: pending.namespace,
                used: AtomicBool::new(false),
            });
        }
        debug!(definitions = steps.len(), "built step registry");
        Ok(StepRegistry { steps })
    }
}

/// Immutable set of compiled step definitions.
///
/// ```
/// use weft::registry::{ResolveError, StepRegistry};
///
/// let registry = StepRegistry::builder()
///     .step("the user logs in", |_| Ok(()))
///     .step("the user {name:word} logs in", |_| Ok(()))
///     .build()
///     .unwrap_or_else(|err| panic!("{err}"));
///
/// let resolved = registry
///     .resolve("the user alice logs in")
///     .unwrap_or_else(|err| panic!("{err}"));
/// assert_eq!(resolved.captures, ["alice"]);
/// assert!(matches!(
///     registry.resolve("the user logs out"),
///     Err(ResolveError::NoMatchingStep { .. })
/// ));
/// ```
#[derive(Debug)]
pub struct StepRegistry {
    steps: Vec<RegisteredStep>,
}

impl StepRegistry {
    /// Start an empty builder.
    pub fn builder() -> StepRegistryBuilder {
        StepRegistryBuilder::default()
    }

    /// Build a registry from every [`step!`](crate::step!) declaration in
    /// `namespace`.
    ///
    /// # Errors
    /// Returns [`RegistryError`] when patterns are invalid or duplicated.
    pub fn scan(namespace: &str) -> Result<Self, RegistryError> {
        Self::builder().scan(namespace).build()
    }

    /// Scan the namespace named by [`RuntimeConfig::step_namespace`]; an
    /// empty namespace takes every declaration.
    ///
    /// # Errors
    /// Returns [`RegistryError`] when patterns are invalid or duplicated.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self, RegistryError> {
        Self::scan(config.step_namespace())
    }

    /// Find the single definition matching `text`.
    ///
    /// # Errors
    /// Returns [`ResolveError::NoMatchingStep`] when nothing matches and
    /// [`ResolveError::AmbiguousStep`] listing every candidate when several
    /// definitions match.
    pub fn resolve(&self, text: &str) -> Result<ResolvedStep<'_>, ResolveError> {
        let mut matches = self
            .steps
            .iter()
            .filter_map(|step| step.pattern.captures(text).map(|captures| (step, captures)));
        let Some((definition, captures)) = matches.next() else {
            return Err(ResolveError::NoMatchingStep {
                text: text.to_owned(),
            });
        };
        if let Some((second, _)) = matches.next() {
            let mut candidates = vec![definition.candidate(), second.candidate()];
            candidates.extend(matches.map(|(step, _)| step.candidate()));
            return Err(ResolveError::AmbiguousStep {
                text: text.to_owned(),
                candidates,
            });
        }
        definition.used.store(true, Ordering::Relaxed);
        trace!(step = text, pattern = definition.pattern(), "resolved step");
        Ok(ResolvedStep {
            definition,
            captures,
        })
    }

    /// Definitions in registration order.
    pub fn definitions(&self) -> impl Iterator<Item = &RegisteredStep> {
        self.steps.iter()
    }

    /// Definitions that have never been resolved.
    #[must_use]
    pub fn unused_definitions(&self) -> Vec<&RegisteredStep> {
        self.steps
            .iter()
            .filter(|step| !step.used.load(Ordering::Relaxed))
            .collect()
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Return `true` when the registry holds no definitions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

static GLOBAL: RwLock<Option<Arc<StepRegistry>>> = RwLock::new(None);

/// Install `registry` as the process-wide registry.
///
/// # Errors
/// Returns [`RegistryError::AlreadyInstalled`] when one is already present;
/// call [`reset_global`] first to replace it.
pub fn install_global(registry: StepRegistry) -> Result<Arc<StepRegistry>, RegistryError> {
    let mut slot = GLOBAL.write().unwrap_or_else(PoisonError::into_inner);
    if slot.is_some() {
        return Err(RegistryError::AlreadyInstalled);
    }
    let registry = Arc::new(registry);
    *slot = Some(Arc::clone(&registry));
    Ok(registry)
}

/// The process-wide registry, if installed.
#[must_use]
pub fn global() -> Option<Arc<StepRegistry>> {
    GLOBAL
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .as_ref()
        .map(Arc::clone)
}

/// Remove the process-wide registry, returning it.
pub fn reset_global() -> Option<Arc<StepRegistry>> {
    GLOBAL.write().unwrap_or_else(PoisonError::into_inner).take()
}

#[cfg(test)]
mod tests;
