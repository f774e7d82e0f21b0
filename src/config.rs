//! Configuration for the job-feed signal client.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main configuration for the signal client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Origin the tracking endpoints are resolved against
    pub base_url: String,

    /// Timeout for every outgoing request
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,

    /// Use the beacon outbox when the host supports it
    pub prefer_beacon: bool,

    /// Number of view payloads the beacon outbox may hold
    pub beacon_queue_capacity: usize,

    /// Traffic source label used when the page URL has none
    pub default_source: String,

    /// Timings for transient UI feedback
    pub feedback: FeedbackTimings,

    /// Path for storing the signal log
    pub data_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jobfeed-signals");

        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout: Duration::from_secs(10),
            prefer_beacon: true,
            beacon_queue_capacity: 64,
            default_source: crate::page::DEFAULT_SOURCE.to_string(),
            feedback: FeedbackTimings::default(),
            data_path: data_dir,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let config: Config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(&config_path, content)?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("jobfeed-signals")
            .join("config.json")
    }

    /// Path of the persisted signal log.
    pub fn signal_log_path(&self) -> PathBuf {
        self.data_path.join("signals.json")
    }

    /// Ensure the data directory exists.
    pub fn ensure_directories(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.data_path)?;
        Ok(())
    }
}

/// How long confirmation toasts and removed cards stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackTimings {
    /// Time a confirmation toast is fully displayed
    #[serde(with = "duration_ms")]
    pub toast_duration: Duration,
    /// Length of the toast exit animation before removal
    #[serde(with = "duration_ms")]
    pub toast_exit_animation: Duration,
    /// Delay between fading a rejected card and removing it
    #[serde(with = "duration_ms")]
    pub card_removal_delay: Duration,
}

impl Default for FeedbackTimings {
    fn default() -> Self {
        Self {
            toast_duration: Duration::from_millis(3000),
            toast_exit_animation: Duration::from_millis(300),
            card_removal_delay: Duration::from_millis(300),
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(serde_json::Error),
    #[error("Serialize error: {0}")]
    Serialize(serde_json::Error),
}

/// Serde support for millisecond durations.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
