//! Configuration for the blink detector.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Shortest supported detection window, in seconds.
pub const MIN_HISTORY_LENGTH: f64 = 0.1;
/// Longest supported detection window, in seconds.
pub const MAX_HISTORY_LENGTH: f64 = 0.5;

/// Tunable parameters shared by the streaming and batch detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// Trailing window length in seconds
    pub history_length: f64,

    /// Filter response above which an onset fires
    pub onset_confidence_threshold: f64,

    /// Filter response below whose negation an offset fires
    pub offset_confidence_threshold: f64,

    /// How long to coalesce parameter changes before recalculating
    #[serde(with = "duration_millis")]
    pub debounce_delay: Duration,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            history_length: 0.2,
            onset_confidence_threshold: 0.5,
            offset_confidence_threshold: 0.5,
            debounce_delay: Duration::from_millis(200),
        }
    }
}

impl DetectorConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path();

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: DetectorConfig = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        let config_path = Self::config_path();

        // Ensure parent directory exists
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(&config_path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("nictate")
            .join("config.json")
    }

    /// Check every parameter against its allowed range.
    ///
    /// Thresholds live in (0, 1]; the window length in
    /// [`MIN_HISTORY_LENGTH`, `MAX_HISTORY_LENGTH`]. NaN fails every check.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_HISTORY_LENGTH..=MAX_HISTORY_LENGTH).contains(&self.history_length) {
            return Err(ConfigError::OutOfRange {
                field: "history_length",
                value: self.history_length,
            });
        }
        if !(self.onset_confidence_threshold > 0.0 && self.onset_confidence_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "onset_confidence_threshold",
                value: self.onset_confidence_threshold,
            });
        }
        if !(self.offset_confidence_threshold > 0.0 && self.offset_confidence_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "offset_confidence_threshold",
                value: self.offset_confidence_threshold,
            });
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    SerializeError(String),
    OutOfRange { field: &'static str, value: f64 },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::SerializeError(e) => write!(f, "Serialize error: {e}"),
            ConfigError::OutOfRange { field, value } => {
                write!(f, "Config value out of range: {field} = {value}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration stored as milliseconds.
mod duration_millis {
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
