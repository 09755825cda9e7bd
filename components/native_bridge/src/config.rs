//! Bridge configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use core_types::abi::version;

/// How the conversion policy treats kind mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionMode {
    /// Any mismatch is an internal error
    Strict,
    /// Mismatches are reinterpreted through a 64-bit intermediate
    #[default]
    Compatibility,
}

/// Errors raised while loading a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The JSON text did not parse or did not match the schema
    #[error("invalid bridge configuration: {0}")]
    Parse(#[from] serde_json::Error),
    /// A value is out of range
    #[error("invalid bridge configuration: {0}")]
    Invalid(String),
}

/// Configuration of one bridge instance.
///
/// Missing keys take their default values:
///
/// ```
/// use native_bridge::{BridgeConfig, ConversionMode};
///
/// let config = BridgeConfig::from_json(r#"{ "conversion_mode": "strict", "max_locals": 64 }"#).unwrap();
/// assert_eq!(config.conversion_mode, ConversionMode::Strict);
/// assert_eq!(config.max_locals, 64);
/// assert_eq!(config.language_level, 21);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Treatment of primitive kind mismatches
    pub conversion_mode: ConversionMode,
    /// Local handle slots per native thread, across all frames
    pub max_locals: usize,
    /// Global and weak-global handles across all threads
    pub max_globals: usize,
    /// Bytes of native buffers outstanding at any time
    pub max_buffer_bytes: usize,
    /// Guest language level; selects the reported interface version
    pub language_level: u32,
    /// Reject bound trampolines invoked for a method other than their target
    pub check_call_target: bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            conversion_mode: ConversionMode::Compatibility,
            max_locals: 4096,
            max_globals: 65_536,
            max_buffer_bytes: 256 << 20,
            language_level: 21,
            check_call_target: true,
        }
    }
}

impl BridgeConfig {
    /// Parses a JSON configuration and validates it.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: BridgeConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as pretty JSON.
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_globals == 0 {
            return Err(ConfigError::Invalid("max_globals must be positive".to_string()));
        }
        if self.language_level == 0 {
            return Err(ConfigError::Invalid("language_level must be positive".to_string()));
        }
        Ok(())
    }

    /// The interface version reported by `GetVersion`.
    pub fn interface_version(&self) -> i32 {
        version::for_language_level(self.language_level)
    }
}
