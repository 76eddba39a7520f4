//! Structured logging for engine runs.
//!
//! Events go to stderr so they never mix with whatever a renderer writes to
//! stdout. Thread ids are included because every unit is bound to one pool
//! thread.

use tracing::level_filters::LevelFilter;
use tracing::warn;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

use crate::config::RuntimeConfig;

fn filter_from_config(config: &RuntimeConfig) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(config.log_level()) {
        Ok(filter) => (filter, None),
        Err(err) => (EnvFilter::new(LevelFilter::INFO.to_string()), Some(err.to_string())),
    }
}

/// Install the global `tracing` subscriber described by `config`.
///
/// The filter comes from [`RuntimeConfig::log_level`], itself set from
/// `WEFT_LOG_LEVEL` or the default `info`. An unparsable filter falls back to
/// `info` and logs a warning once the subscriber is active.
///
/// Returns `false` when a subscriber was already installed; the first one
/// wins, so calling this more than once is harmless.
pub fn init_logging(config: &RuntimeConfig) -> bool {
    let (filter, rejected) = filter_from_config(config);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(false)
        .with_line_number(false)
        .finish();

    let installed = tracing::subscriber::set_global_default(subscriber).is_ok();
    if let Some(reason) = rejected {
        warn!(filter = config.log_level(), %reason, "invalid log filter, using `info`");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_idempotent() {
        let config = RuntimeConfig::default();
        init_logging(&config);
        assert!(!init_logging(&config));
    }

    #[test]
    fn filter_uses_config_log_level() {
        let config = RuntimeConfig::default().with_log_level("debug");
        let (filter, rejected) = filter_from_config(&config);
        assert_eq!(filter.to_string(), "debug");
        assert!(rejected.is_none());
    }

    #[test]
    fn invalid_filters_fall_back_to_info() {
        let config = RuntimeConfig::default().with_log_level("weft=loud");
        let (filter, rejected) = filter_from_config(&config);
        assert_eq!(filter.to_string(), "info");
        assert!(rejected.is_some());
    }
}
