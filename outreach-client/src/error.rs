//! Error types for the outreach client.

use crate::config::ConfigError;
use crate::persistence::StoreError;
use crate::stages::StageError;
use crate::telemetry::TelemetryError;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Stage(#[from] StageError),
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
