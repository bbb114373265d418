//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{HostLinkError, Result};

/// Baud rates accepted for the host link
pub const SUPPORTED_BAUD_RATES: &[u32] = &[9600, 19200, 38400, 57600, 115_200, 230_400, 460_800];

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub serial: SerialConfig,

    #[serde(default)]
    pub link: LinkConfig,

    #[serde(default)]
    pub engines: EngineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Serial port configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SerialConfig {
    #[serde(default = "default_serial_port")]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_buffer_size")]
    pub read_buffer_size: usize,
}

/// Host link behaviour
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    /// Drop a partial frame after this long without bytes (0 disables)
    #[serde(default)]
    pub frame_timeout_ms: u64,

    /// Emit debug/dump/samples frames on the wire
    #[serde(default)]
    pub diagnostics: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

/// Simulated engine configuration
#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default = "default_dstar_capacity")]
    pub dstar_capacity: u8,

    #[serde(default = "default_dmr_slot_capacity")]
    pub dmr_slot_capacity: u8,

    #[serde(default = "default_ysf_capacity")]
    pub ysf_capacity: u8,

    /// Time to "transmit" one queued frame
    #[serde(default = "default_airtime_ms")]
    pub airtime_ms: u64,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Also write a daily log file here when set
    #[serde(default)]
    pub log_dir: Option<String>,
}

// Default value functions
fn default_serial_port() -> String { crate::serial::DEFAULT_DEVICE_PATHS[0].to_string() }
fn default_baud_rate() -> u32 { crate::serial::DEFAULT_BAUD_RATE }
fn default_read_buffer_size() -> usize { 256 }

fn default_poll_interval_ms() -> u64 { 10 }

fn default_dstar_capacity() -> u8 { 20 }
fn default_dmr_slot_capacity() -> u8 { 10 }
fn default_ysf_capacity() -> u8 { 8 }
fn default_airtime_ms() -> u64 { 20 }

fn default_log_level() -> String { "info".to_string() }

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_serial_port(),
            baud_rate: default_baud_rate(),
            read_buffer_size: default_read_buffer_size(),
        }
    }
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            frame_timeout_ms: 0,
            diagnostics: false,
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dstar_capacity: default_dstar_capacity(),
            dmr_slot_capacity: default_dmr_slot_capacity(),
            ysf_capacity: default_ysf_capacity(),
            airtime_ms: default_airtime_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn invalid(message: impl std::fmt::Display) -> HostLinkError {
    HostLinkError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use mmdvm_hostlink::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error on the first value out of its valid range
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(invalid("serial port cannot be empty"));
        }

        if !SUPPORTED_BAUD_RATES.contains(&self.serial.baud_rate) {
            return Err(invalid(format!(
                "baud_rate {} is not supported (expected one of {:?})",
                self.serial.baud_rate, SUPPORTED_BAUD_RATES
            )));
        }

        if self.serial.read_buffer_size == 0 || self.serial.read_buffer_size > 4096 {
            return Err(invalid("read_buffer_size must be between 1 and 4096"));
        }

        if self.link.frame_timeout_ms > 60000 {
            return Err(invalid("frame_timeout_ms must be between 0 and 60000"));
        }

        if self.link.poll_interval_ms == 0 || self.link.poll_interval_ms > 1000 {
            return Err(invalid("poll_interval_ms must be between 1 and 1000"));
        }

        for (name, value) in [
            ("dstar_capacity", self.engines.dstar_capacity),
            ("dmr_slot_capacity", self.engines.dmr_slot_capacity),
            ("ysf_capacity", self.engines.ysf_capacity),
        ] {
            if value == 0 {
                return Err(invalid(format!("{} must be between 1 and 255", name)));
            }
        }

        if self.engines.airtime_ms == 0 || self.engines.airtime_ms > 10000 {
            return Err(invalid("airtime_ms must be between 1 and 10000"));
        }

        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(invalid(format!(
                "logging level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging log_dir cannot be empty when set"));
        }

        Ok(())
    }
}
