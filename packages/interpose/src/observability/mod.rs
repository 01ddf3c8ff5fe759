// packages/interpose/src/observability/mod.rs
//! Logging setup
//!
//! Sessions log through `tracing` and count themselves with `metrics`
//! (`interpose_sessions_total`, `interpose_sessions_rejected_total`,
//! `interpose_restore_failures_total`). Both are inert until a subscriber or
//! recorder is installed; tests need neither.

use crate::utils::config::LoggingSettings;
use crate::utils::errors::{MockError, Result};
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_tracing(settings: &LoggingSettings) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.level))
        .map_err(|e| MockError::ConfigError(format!("Invalid log filter: {}", e)))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = if settings.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| MockError::ConfigError(format!("Failed to install subscriber: {}", e)))
}
