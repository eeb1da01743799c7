//! Configuration module for the raw file decoder
//!
//! Supports loading configuration from TOML files. Every field has a
//! default, so an empty file (or no file at all) is valid.
//!
//! # Example
//! ```ignore
//! let config = Config::load("caen_raw.toml")?;
//! let reader = RawFileReader::open_with_config("run0042.bin", config.decoder)?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub decoder: DecoderConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.decoder.validate()?;
        Ok(config)
    }
}

// =============================================================================
// Decoder Configuration
// =============================================================================

/// How the declared record size in each header is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeCheck {
    /// Declared size is advisory and never compared
    #[default]
    Ignore,
    /// Log a warning on mismatch and keep going
    Warn,
    /// Mismatch is a corruption error
    Strict,
}

/// Limits and policies applied while decoding
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DecoderConfig {
    /// Upper bound on nChannels in a settings record
    #[serde(default = "default_max_channels")]
    pub max_channels: u32,

    /// Upper bound on nSamples in a waveform record
    #[serde(default = "default_max_samples")]
    pub max_samples: u32,

    /// Declared-size policy
    #[serde(default)]
    pub size_check: SizeCheck,

    /// Read past records with unknown type tags instead of failing
    #[serde(default)]
    pub skip_unknown_records: bool,
}

fn default_max_channels() -> u32 {
    1024
}

fn default_max_samples() -> u32 {
    16 * 1024 * 1024
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_channels: default_max_channels(),
            max_samples: default_max_samples(),
            size_check: SizeCheck::default(),
            skip_unknown_records: false,
        }
    }
}

impl DecoderConfig {
    /// Strict-size variant of the defaults
    pub fn strict() -> Self {
        Self {
            size_check: SizeCheck::Strict,
            ..Self::default()
        }
    }

    /// Reject limits that would make every record undecodable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_channels == 0 {
            return Err(ConfigError::InvalidValue {
                field: "decoder.max_channels".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.max_samples == 0 {
            return Err(ConfigError::InvalidValue {
                field: "decoder.max_samples".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
