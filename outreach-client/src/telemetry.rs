//! Structured logging setup.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("Invalid log filter {filter:?}: {reason}")]
    InvalidFilter { filter: String, reason: String },
    #[error("Failed to init subscriber: {0}")]
    Init(String),
}

/// Install the global subscriber: JSON lines on stderr.
///
/// `RUST_LOG` wins over the configured filter when set.
pub fn init(default_filter: &str) -> Result<(), TelemetryError> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter).map_err(|e| TelemetryError::InvalidFilter {
            filter: default_filter.to_string(),
            reason: e.to_string(),
        })?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .try_init()
        .map_err(|e| TelemetryError::Init(e.to_string()))?;

    tracing::debug!(filter = default_filter, "Telemetry initialized");
    Ok(())
}
