//! Global configuration parsing and validation.

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::{AppError, Result};

/// Static device descriptor reported by the `get_device_info` command.
///
/// The bridge has no platform `Build` record to read, so the descriptor is
/// supplied through configuration with generic defaults.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct DeviceConfig {
    /// Device model string.
    #[serde(default = "default_model")]
    pub model: String,
    /// Device manufacturer string.
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    /// Operating system release version.
    #[serde(default = "default_os_version")]
    pub os_version: String,
    /// Platform SDK / API level.
    #[serde(default = "default_sdk_level")]
    pub sdk_level: u32,
}

fn default_model() -> String {
    "generic".into()
}

fn default_manufacturer() -> String {
    "unknown".into()
}

fn default_os_version() -> String {
    "1.0".into()
}

fn default_sdk_level() -> u32 {
    1
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            manufacturer: default_manufacturer(),
            os_version: default_os_version(),
            sdk_level: default_sdk_level(),
        }
    }
}

/// Voice test engine settings.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct VoiceConfig {
    /// Whether the engine is initialized at startup.
    #[serde(default = "default_true")]
    pub auto_init: bool,
    /// Simulated initialization delay in milliseconds.
    #[serde(default = "default_init_delay_ms")]
    pub init_delay_ms: u64,
}

fn default_true() -> bool {
    true
}

fn default_init_delay_ms() -> u64 {
    1000
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            auto_init: default_true(),
            init_delay_ms: default_init_delay_ms(),
        }
    }
}

fn default_port() -> u16 {
    9999
}

fn default_max_line_bytes() -> usize {
    1_048_576
}

/// Global configuration parsed from `config.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct BridgeConfig {
    /// TCP port the bridge listens on (1–65535).
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted length of one inbound line, in bytes.
    #[serde(default = "default_max_line_bytes")]
    pub max_line_bytes: usize,
    /// Static device descriptor values.
    #[serde(default)]
    pub device: DeviceConfig,
    /// Voice test engine settings.
    #[serde(default)]
    pub voice: VoiceConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            max_line_bytes: default_max_line_bytes(),
            device: DeviceConfig::default(),
            voice: VoiceConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(AppError::Config("port must be in range 1-65535".into()));
        }

        if self.max_line_bytes == 0 {
            return Err(AppError::Config(
                "max_line_bytes must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
