// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration for the heartbeat reporter and spill directory.
//!
//! Values default to the constants below and can be overridden through
//! `TALLY_*` environment variables or a JSON [`TallyConfigFile`]. Both accept
//! human-readable durations and sizes (`"10s"`, `"64mb"`).

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tally_core::units::{self, TimeUnit, UnitParseError};
use thiserror::Error;

/// Heartbeat interval, as a duration string.
pub const ENV_HEARTBEAT_INTERVAL: &str = "TALLY_HEARTBEAT_INTERVAL";
/// Capacity of the heartbeat report channel.
pub const ENV_REPORT_BUFFER_SIZE: &str = "TALLY_REPORT_BUFFER_SIZE";
/// Buffered size at which a task spills, as a size string.
pub const ENV_SPILL_THRESHOLD: &str = "TALLY_SPILL_THRESHOLD";
/// Directory spill files are written under.
pub const ENV_SPILL_DIR: &str = "TALLY_SPILL_DIR";

/// Default heartbeat interval.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;
/// Default report channel capacity. Reports beyond it are dropped.
pub const DEFAULT_REPORT_BUFFER_SIZE: usize = 1000;
/// Default spill threshold.
pub const DEFAULT_SPILL_THRESHOLD_BYTES: u64 = 64 * 1024 * 1024; // 64 MiB

/// An invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A duration or size string could not be parsed.
    #[error("invalid value for {key}: {source}")]
    Unit {
        /// The variable that was being read.
        key: String,
        /// The underlying parse failure.
        #[source]
        source: UnitParseError,
    },
    /// A plain number could not be parsed.
    #[error("invalid number for {key}: {value:?}")]
    Number {
        /// The variable that was being read.
        key: String,
        /// The raw value.
        value: String,
    },
    /// The configuration file is not valid JSON for [`TallyConfigFile`].
    #[error("invalid configuration file: {0}")]
    Json(#[from] serde_json::Error),
    /// The value parsed but is not usable.
    #[error("{key} must be greater than zero, got {value:?}")]
    NotPositive {
        /// The variable that was being read.
        key: String,
        /// The raw value.
        value: String,
    },
}

/// Configuration for [`HeartbeatReporter`](crate::HeartbeatReporter).
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Time between two heartbeat passes.
    pub interval: Duration,
    /// Maximum number of undelivered reports.
    /// If the channel is full, new reports are dropped.
    pub report_buffer_size: usize,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(DEFAULT_HEARTBEAT_INTERVAL_MS),
            report_buffer_size: DEFAULT_REPORT_BUFFER_SIZE,
        }
    }
}

impl HeartbeatConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_HEARTBEAT_INTERVAL) {
            // A bare number is milliseconds; suffixes down to `us` are kept.
            let micros = units::parse_time_in(&raw, TimeUnit::Milliseconds, TimeUnit::Microseconds)
                .map_err(|source| ConfigError::Unit {
                    key: ENV_HEARTBEAT_INTERVAL.to_string(),
                    source,
                })?;
            if micros <= 0 {
                return Err(ConfigError::NotPositive {
                    key: ENV_HEARTBEAT_INTERVAL.to_string(),
                    value: raw,
                });
            }
            config.interval = Duration::from_micros(micros as u64);
        }

        if let Some(raw) = lookup(ENV_REPORT_BUFFER_SIZE) {
            let size: usize = raw.trim().parse().map_err(|_| ConfigError::Number {
                key: ENV_REPORT_BUFFER_SIZE.to_string(),
                value: raw.clone(),
            })?;
            if size == 0 {
                return Err(ConfigError::NotPositive {
                    key: ENV_REPORT_BUFFER_SIZE.to_string(),
                    value: raw,
                });
            }
            config.report_buffer_size = size;
        }

        Ok(config)
    }
}

/// Configuration for [`SpillDirectory`](crate::SpillDirectory).
#[derive(Debug, Clone)]
pub struct SpillConfig {
    /// Buffered bytes at or above which a task should spill.
    pub threshold_bytes: u64,
    /// Directory spill files are written under.
    pub directory: PathBuf,
}

impl Default for SpillConfig {
    fn default() -> Self {
        Self {
            threshold_bytes: DEFAULT_SPILL_THRESHOLD_BYTES,
            directory: std::env::temp_dir().join("tally-spill"),
        }
    }
}

impl SpillConfig {
    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through `lookup`, falling back to defaults
    /// for missing keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_SPILL_THRESHOLD) {
            config.threshold_bytes =
                units::parse_bytes_as_bytes(&raw).map_err(|source| ConfigError::Unit {
                    key: ENV_SPILL_THRESHOLD.to_string(),
                    source,
                })?;
        }
        if let Some(raw) = lookup(ENV_SPILL_DIR) {
            config.directory = PathBuf::from(raw);
        }

        Ok(config)
    }
}

/// The on-disk form of the configuration, using the same string values as
/// the environment variables.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TallyConfigFile {
    /// Heartbeat interval, e.g. `"10s"`.
    pub heartbeat_interval: Option<String>,
    /// Capacity of the heartbeat report channel.
    pub report_buffer_size: Option<usize>,
    /// Spill threshold, e.g. `"64mb"`.
    pub spill_threshold: Option<String>,
    /// Directory spill files are written under.
    pub spill_dir: Option<PathBuf>,
}

impl TallyConfigFile {
    /// Parses a configuration from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_json(&content).with_context(|| format!("failed to parse {}", path.display()))
    }

    fn lookup(&self, key: &str) -> Option<String> {
        match key {
            ENV_HEARTBEAT_INTERVAL => self.heartbeat_interval.clone(),
            ENV_REPORT_BUFFER_SIZE => self.report_buffer_size.map(|size| size.to_string()),
            ENV_SPILL_THRESHOLD => self.spill_threshold.clone(),
            ENV_SPILL_DIR => self
                .spill_dir
                .as_ref()
                .map(|dir| dir.to_string_lossy().into_owned()),
            _ => None,
        }
    }

    /// Resolves the heartbeat section, defaulting missing values.
    pub fn heartbeat(&self) -> Result<HeartbeatConfig, ConfigError> {
        HeartbeatConfig::from_lookup(|key| self.lookup(key))
    }

    /// Resolves the spill section, defaulting missing values.
    pub fn spill(&self) -> Result<SpillConfig, ConfigError> {
        SpillConfig::from_lookup(|key| self.lookup(key))
    }
}
