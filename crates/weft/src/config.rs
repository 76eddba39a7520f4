//! Runtime configuration.
//!
//! Settings come from the environment and can be overridden in code. The
//! environment is read once per [`RuntimeConfig::from_env`] call; nothing is
//! cached globally.

use std::env;
use std::num::NonZeroUsize;

use tracing::level_filters::LevelFilter;

use crate::error::ConfigurationError;

/// Number of workers; unset means one per available CPU.
pub const WORKERS_ENV: &str = "WEFT_WORKERS";
/// Default log filter, in `tracing-subscriber`'s `EnvFilter` syntax.
pub const LOG_LEVEL_ENV: &str = "WEFT_LOG_LEVEL";
/// Count skipped units as failures.
pub const FAIL_ON_SKIPPED_ENV: &str = "WEFT_FAIL_ON_SKIPPED";
/// Module path scanned for step definitions.
pub const STEP_NAMESPACE_ENV: &str = "WEFT_STEP_NAMESPACE";

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim() {
        "1" | "true" | "TRUE" | "True" | "yes" | "YES" | "Yes" | "on" | "ON" | "On" => Some(true),
        "0" | "false" | "FALSE" | "False" | "no" | "NO" | "No" | "off" | "OFF" | "Off" => {
            Some(false)
        }
        _ => None,
    }
}

/// Settings for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    workers: Option<NonZeroUsize>,
    log_level: String,
    fail_on_skipped: bool,
    step_namespace: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: None,
            log_level: LevelFilter::INFO.to_string(),
            fail_on_skipped: false,
            step_namespace: String::new(),
        }
    }
}

/// Explicit values layered over a [`RuntimeConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    /// Worker count.
    pub workers: Option<NonZeroUsize>,
    /// Log filter.
    pub log_level: Option<String>,
    /// Whether skips fail the run.
    pub fail_on_skipped: Option<bool>,
    /// Step namespace.
    pub step_namespace: Option<String>,
}

impl RuntimeConfig {
    /// Read settings from the environment, falling back to defaults for
    /// unset variables.
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidSetting`] when a variable is set
    /// to a value that cannot be used.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Read settings through `lookup` instead of the process environment.
    ///
    /// ```
    /// use weft::RuntimeConfig;
    ///
    /// let config = RuntimeConfig::from_lookup(|key| match key {
    ///     "WEFT_WORKERS" => Some("4".into()),
    ///     "WEFT_FAIL_ON_SKIPPED" => Some("yes".into()),
    ///     _ => None,
    /// })
    /// .unwrap_or_else(|err| panic!("{err}"));
    /// assert_eq!(config.workers().map(|n| n.get()), Some(4));
    /// assert!(config.fail_on_skipped());
    /// ```
    ///
    /// # Errors
    /// Returns [`ConfigurationError::InvalidSetting`] for unusable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigurationError> {
        let mut config = Self::default();
        if let Some(raw) = lookup(WORKERS_ENV) {
            config.workers = Some(raw.trim().parse::<NonZeroUsize>().map_err(|_| {
                ConfigurationError::InvalidSetting {
                    key: WORKERS_ENV,
                    value: raw.clone(),
                    reason: "expected a positive integer",
                }
            })?);
        }
        if let Some(raw) = lookup(LOG_LEVEL_ENV) {
            let level = raw.trim();
            if level.is_empty() {
                return Err(ConfigurationError::InvalidSetting {
                    key: LOG_LEVEL_ENV,
                    value: raw,
                    reason: "expected a log filter such as `info` or `weft=debug`",
                });
            }
            config.log_level = level.to_owned();
        }
        if let Some(raw) = lookup(FAIL_ON_SKIPPED_ENV) {
            config.fail_on_skipped =
                parse_env_bool(&raw).ok_or_else(|| ConfigurationError::InvalidSetting {
                    key: FAIL_ON_SKIPPED_ENV,
                    value: raw.clone(),
                    reason: "expected a boolean such as `true` or `off`",
                })?;
        }
        if let Some(raw) = lookup(STEP_NAMESPACE_ENV) {
            config.step_namespace = raw.trim().to_owned();
        }
        Ok(config)
    }

    /// Replace every setting `overrides` specifies.
    #[must_use]
    pub fn apply_overrides(mut self, overrides: ConfigOverrides) -> Self {
        if let Some(workers) = overrides.workers {
            self.workers = Some(workers);
        }
        if let Some(level) = overrides.log_level {
            self.log_level = level;
        }
        if let Some(fail) = overrides.fail_on_skipped {
            self.fail_on_skipped = fail;
        }
        if let Some(namespace) = overrides.step_namespace {
            self.step_namespace = namespace;
        }
        self
    }

    /// Use `workers` threads.
    #[must_use]
    pub fn with_workers(mut self, workers: NonZeroUsize) -> Self {
        self.workers = Some(workers);
        self
    }

    /// Use `level` as the default log filter.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Choose whether skipped units fail the run.
    #[must_use]
    pub fn with_fail_on_skipped(mut self, fail: bool) -> Self {
        self.fail_on_skipped = fail;
        self
    }

    /// Scan `namespace` for step definitions.
    #[must_use]
    pub fn with_step_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.step_namespace = namespace.into();
        self
    }

    /// Requested worker count; `None` means one per CPU.
    #[must_use]
    pub fn workers(&self) -> Option<NonZeroUsize> {
        self.workers
    }

    /// Default log filter.
    #[must_use]
    pub fn log_level(&self) -> &str {
        &self.log_level
    }

    /// Whether skipped units count as failures.
    #[must_use]
    pub fn fail_on_skipped(&self) -> bool {
        self.fail_on_skipped
    }

    /// Step namespace; empty means every declaration.
    #[must_use]
    pub fn step_namespace(&self) -> &str {
        &self.step_namespace
    }
}
