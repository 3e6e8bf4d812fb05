// Copyright 2026 pulseblaster-ind Contributors
// SPDX-License-Identifier: Apache-2.0

//! Configuration management.
//!
//! Configuration is loaded from multiple sources with the following priority
//! (later sources override earlier ones):
//!
//! 1. Built-in defaults
//! 2. pulseblaster.yaml file
//! 3. Environment variables (PULSEBLASTER_*)
//! 4. CLI arguments

use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;

use crate::error::{Error, Result};
use crate::timing::compiler::DEFAULT_NUM_CHANNELS;
use crate::timing::types::{TimingSpec, MAX_CHANNELS};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Board timing parameters
    #[serde(default)]
    pub timing: TimingSpec,

    /// Board selection and programming settings
    #[serde(default)]
    pub board: BoardConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from file and environment.
    ///
    /// An explicit `config_path` must exist. Without one, the first default
    /// path that exists is used, or the built-in defaults if none does.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config = Config::default();

        if let Some(path) = config_path {
            let content = std::fs::read_to_string(path)?;
            config = serde_yaml::from_str(&content)?;
        } else {
            for path in &[
                "pulseblaster.yaml",
                "pulseblaster.yml",
                "/etc/pulseblaster/config.yaml",
            ] {
                let path = Path::new(path);
                if path.exists() {
                    let content = std::fs::read_to_string(path)?;
                    config = serde_yaml::from_str(&content)?;
                    break;
                }
            }
        }

        config.apply_env_overrides();

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Apply `PULSEBLASTER_*` overrides read through `lookup`.
    ///
    /// Values that fail to parse are ignored.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(ns) = parsed(&lookup, "PULSEBLASTER_RESOLUTION_NS") {
            self.timing.resolution_ns = ns;
        }
        if let Some(ns) = parsed(&lookup, "PULSEBLASTER_MINIMUM_PULSE_NS") {
            self.timing.minimum_pulse_ns = ns;
        }
        if let Some(index) = parsed(&lookup, "PULSEBLASTER_BOARD_INDEX") {
            self.board.index = index;
        }
        if let Some(mhz) = parsed(&lookup, "PULSEBLASTER_CORE_CLOCK_MHZ") {
            self.board.core_clock_mhz = mhz;
        }
        if let Some(n) = parsed(&lookup, "PULSEBLASTER_NUM_CHANNELS") {
            self.board.num_channels = n;
        }
        if let Some(val) = lookup("PULSEBLASTER_AUTO_STOP") {
            self.board.auto_stop = val.to_lowercase() == "true" || val == "1";
        }
        if let Some(val) = lookup("PULSEBLASTER_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        self.timing.validate()?;
        self.board.validate()?;
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(Error::Config(format!(
                    "log format must be 'pretty' or 'json', got '{}'",
                    other
                )))
            }
        }
        Ok(())
    }
}

fn parsed<T: std::str::FromStr>(lookup: impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key)?.parse().ok()
}

/// Board selection and programming settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    /// Board index passed to board selection
    #[serde(default)]
    pub index: u32,

    /// Core clock frequency in MHz
    #[serde(default = "default_core_clock_mhz")]
    pub core_clock_mhz: f64,

    /// Width of the output bitmask
    #[serde(default = "default_num_channels")]
    pub num_channels: u8,

    /// Terminate finite programs with a STOP instruction
    #[serde(default)]
    pub auto_stop: bool,
}

impl BoardConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.core_clock_mhz.is_finite() && self.core_clock_mhz > 0.0) {
            return Err(Error::Config(format!(
                "core clock must be positive, got {} MHz",
                self.core_clock_mhz
            )));
        }
        if self.num_channels == 0 || self.num_channels > MAX_CHANNELS {
            return Err(Error::Config(format!(
                "channel count must be between 1 and {}, got {}",
                MAX_CHANNELS, self.num_channels
            )));
        }
        Ok(())
    }
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            index: 0,
            core_clock_mhz: default_core_clock_mhz(),
            num_channels: default_num_channels(),
            auto_stop: false,
        }
    }
}

fn default_core_clock_mhz() -> f64 {
    100.0
}

fn default_num_channels() -> u8 {
    DEFAULT_NUM_CHANNELS
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format (pretty, json)
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}
