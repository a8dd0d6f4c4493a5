//! Configuration structures for the board support package.
//!
//! Supports TOML deserialization with defaults matching the reference
//! board: 4 NVIC priority bits, a 150 MHz APB1 bus divided by two, and the
//! PSRAM mode register values for x16 operation at 200 MHz.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level board configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardConfig {
    /// Time base timer configuration.
    pub timebase: TimeBaseConfig,

    /// Clock tree feeding the time base timer.
    pub clock: ClockConfig,

    /// External PSRAM configuration.
    pub psram: PsramConfig,

    /// Host daemon configuration.
    pub daemon: DaemonConfig,
}

/// Time base timer configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeBaseConfig {
    /// Priority of the wrap interrupt (lower is more urgent).
    pub tick_priority: u8,

    /// Number of priority bits the interrupt controller implements.
    pub nvic_priority_bits: u8,
}

impl Default for TimeBaseConfig {
    fn default() -> Self {
        Self {
            tick_priority: 15,
            nvic_priority_bits: 4,
        }
    }
}

impl TimeBaseConfig {
    /// Number of distinct priority levels.
    #[must_use]
    pub fn priority_levels(&self) -> u16 {
        1u16 << self.nvic_priority_bits.min(8)
    }
}

/// APB1 bus clock divider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Apb1Divider {
    /// HCLK not divided.
    Div1,
    /// HCLK / 2.
    #[default]
    Div2,
    /// HCLK / 4.
    Div4,
    /// HCLK / 8.
    Div8,
    /// HCLK / 16.
    Div16,
}

/// Clock tree values that determine the timer kernel clock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// APB1 peripheral clock (PCLK1) in Hz. Zero means the bus is not clocked.
    pub pclk1_hz: u32,

    /// APB1 divider applied to HCLK.
    pub apb1_divider: Apb1Divider,

    /// Timer clock prescaler selection (TIMPRE). When set, timers on a
    /// divided bus run at 4x PCLK1 instead of 2x.
    pub timer_prescaler: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            pclk1_hz: 150_000_000,
            apb1_divider: Apb1Divider::Div2,
            timer_prescaler: false,
        }
    }
}

/// External PSRAM (APS256) configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PsramConfig {
    /// Bring up the PSRAM at boot.
    pub enabled: bool,

    /// MR8 value: x16 mode, 2K burst, full drive strength.
    pub mr8: [u8; 2],

    /// MR4 value: write latency 7 at 200 MHz, 4x refresh, full array.
    pub mr4: [u8; 2],

    /// Memory-mapped mode timeout period in XSPI clock cycles.
    pub mapped_timeout_cycles: u8,
}

impl Default for PsramConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mr8: [0x4B, 0x10],
            mr4: [0x20, 0x4B],
            mapped_timeout_cycles: 0x34,
        }
    }
}

/// Host daemon configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    /// How long each LED stays lit in the walking pattern.
    #[serde(with = "humantime_serde")]
    pub blink_period: Duration,

    /// Interval between status reports on the debug console.
    #[serde(with = "humantime_serde")]
    pub status_interval: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            blink_period: Duration::from_millis(250),
            status_interval: Duration::from_secs(1),
        }
    }
}

impl BoardConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::Parse)
    }

    /// Serialize configuration to TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error.
    #[error("failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// TOML serialization error.
    #[error("failed to serialize TOML: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Serde helper module for `Duration` using humantime format.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
