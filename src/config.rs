//! Application configuration
//!
//! Read from a JSON file named by `OPEN_SCREENREC_CONFIG`. Every field has a
//! default, so a missing variable or a partial file is fine.

use crate::recorder::quality::QualityTier;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable holding the config file path
pub const CONFIG_ENV: &str = "OPEN_SCREENREC_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    /// Directory backing the durable metadata store
    pub storage_dir: PathBuf,
    pub log_filter: String,
    pub default_quality: QualityTier,
    pub default_frame_rate: u32,
    /// Frame rates offered to the user
    pub frame_rate_options: Vec<u32>,
    pub flush_interval_ms: u64,
    /// How long the final duration stays on screen after a stop
    pub reset_grace_ms: u64,
    /// Period of the elapsed-time sampler
    pub sample_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from(".open-screenrec"),
            log_filter: "open_screenrec=debug".to_string(),
            default_quality: QualityTier::Hd720,
            default_frame_rate: 30,
            frame_rate_options: vec![15, 24, 30, 60],
            flush_interval_ms: 1000,
            reset_grace_ms: 2000,
            sample_interval_ms: 1000,
        }
    }
}

impl AppConfig {
    /// Load from `OPEN_SCREENREC_CONFIG`, or defaults when unset
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        tracing::debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.frame_rate_options.is_empty() || self.frame_rate_options.contains(&0) {
            return Err(ConfigError::Invalid(
                "frameRateOptions must be non-empty positive integers".to_string(),
            ));
        }
        if !self.frame_rate_options.contains(&self.default_frame_rate) {
            return Err(ConfigError::Invalid(format!(
                "defaultFrameRate {} is not one of {:?}",
                self.default_frame_rate, self.frame_rate_options
            )));
        }
        if self.flush_interval_ms == 0 || self.sample_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "flushIntervalMs and sampleIntervalMs must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn reset_grace(&self) -> chrono::TimeDelta {
        chrono::TimeDelta::milliseconds(self.reset_grace_ms as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.flush_interval(), Duration::from_secs(1));
        assert_eq!(config.reset_grace(), chrono::TimeDelta::seconds(2));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"defaultQuality":"1080p","defaultFrameRate":60}"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.default_quality, QualityTier::FullHd1080);
        assert_eq!(config.default_frame_rate, 60);
        assert_eq!(config.frame_rate_options, vec![15, 24, 30, 60]);
    }

    #[test]
    fn test_rejects_default_outside_options() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"frameRateOptions":[15,30],"defaultFrameRate":60}"#).unwrap();

        assert!(matches!(AppConfig::load(&path), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.json");
        assert!(matches!(AppConfig::load(&missing), Err(ConfigError::Io { .. })));

        let bad = dir.path().join("bad.json");
        std::fs::write(&bad, "{").unwrap();
        assert!(matches!(AppConfig::load(&bad), Err(ConfigError::Parse { .. })));
    }
}
