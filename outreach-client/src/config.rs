//! Configuration loading for the outreach client.
//!
//! All fields are required. No defaults.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub request_timeout_ms: u64,
    pub session_dir: PathBuf,
    pub log_filter: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing configuration file path (use --config or OUTREACH_CONFIG)")]
    MissingConfigPath,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ClientConfig {
    /// Load from `explicit`, falling back to `OUTREACH_CONFIG`.
    pub fn load_from(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = explicit.or_else(config_path_from_env);
        let path = path.ok_or(ConfigError::MissingConfigPath)?;
        let config = Self::from_path(&path)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(contents)?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let base = self.api_base_url.trim();
        if base.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must not be empty".to_string(),
            });
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(ConfigError::InvalidValue {
                field: "api_base_url",
                reason: "must start with http:// or https://".to_string(),
            });
        }
        if self.request_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "request_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }
        if self.session_dir.as_os_str().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "session_dir",
                reason: "must not be empty".to_string(),
            });
        }
        if self.log_filter.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "log_filter",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }
}

fn config_path_from_env() -> Option<PathBuf> {
    std::env::var("OUTREACH_CONFIG").ok().map(PathBuf::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
api_base_url = "http://localhost:8000/api"
request_timeout_ms = 30000
session_dir = "tmp/sessions"
log_filter = "outreach_client=debug,info"
"#;

    #[test]
    fn sample_config_parses_and_validates() {
        let config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.api_base_url, "http://localhost:8000/api");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn unknown_fields_rejected() {
        let with_extra = format!("{}\ntheme = \"dark\"\n", SAMPLE);
        assert!(matches!(
            ClientConfig::from_toml_str(&with_extra),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn zero_timeout_rejected() {
        let mut config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        config.request_timeout_ms = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { field: "request_timeout_ms", .. })
        ));
    }

    #[test]
    fn base_url_needs_scheme() {
        let mut config = ClientConfig::from_toml_str(SAMPLE).unwrap();
        config.api_base_url = "localhost:8000".to_string();
        assert!(config.validate().is_err());
    }
}
