// influx-migrate-config - Layered configuration for the migration tool
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority, INFLUX_MIGRATE_* prefix)
// 2. Config file path from --config or INFLUX_MIGRATE_CONFIG
// 3. Config file contents from INFLUX_MIGRATE_CONFIG_CONTENT
// 4. Default config file location (./influx-migrate.toml)
// 5. Built-in defaults (lowest priority)

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, TimeDelta, Utc};
use influx_migrate_core::{
    BackfillScheduler, ConfigError, DownsampleInterval, FetchFilter, SensorRegistry, TimeWindow,
    DEFAULT_RESOLUTION, READING_SERIES,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{EnvSource, ENV_PREFIX};
pub use sources::StdEnvSource;

/// Main runtime configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "StoreConfig::default_source")]
    pub source: StoreConfig,

    #[serde(default = "StoreConfig::default_destination")]
    pub destination: StoreConfig,

    #[serde(default)]
    pub migration: MigrationConfig,

    #[serde(default)]
    pub backfill: BackfillConfig,

    #[serde(default)]
    pub sensors: SensorsConfig,

    #[serde(default)]
    pub log: LogConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            source: StoreConfig::default_source(),
            destination: StoreConfig::default_destination(),
            migration: MigrationConfig::default(),
            backfill: BackfillConfig::default(),
            sensors: SensorsConfig::default(),
            log: LogConfig::default(),
        }
    }
}

/// InfluxDB schema generation spoken by a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum StoreVersion {
    #[serde(rename = "0.8")]
    V08,
    #[serde(rename = "0.9")]
    V09,
}

impl std::fmt::Display for StoreVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreVersion::V08 => write!(f, "0.8"),
            StoreVersion::V09 => write!(f, "0.9"),
        }
    }
}

impl std::str::FromStr for StoreVersion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().trim_start_matches('v') {
            "0.8" | "08" => Ok(StoreVersion::V08),
            "0.9" | "09" => Ok(StoreVersion::V09),
            _ => anyhow::bail!("Unsupported store version: {}. Supported: 0.8, 0.9", s),
        }
    }
}

/// Connection to one InfluxDB server.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub version: StoreVersion,
    #[serde(default = "default_uri")]
    pub uri: String,
    #[serde(default = "default_credential")]
    pub username: String,
    #[serde(default = "default_credential")]
    pub password: String,
    #[serde(default)]
    pub database: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_uri() -> String {
    "http://localhost:8086".to_string()
}

fn default_credential() -> String {
    "root".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl StoreConfig {
    fn with_version(version: StoreVersion) -> Self {
        Self {
            version,
            uri: default_uri(),
            username: default_credential(),
            password: default_credential(),
            database: String::new(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn default_source() -> Self {
        Self::with_version(StoreVersion::V08)
    }

    pub fn default_destination() -> Self {
        Self::with_version(StoreVersion::V09)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// The raw-data copy loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Start of the range, `yyyy-MM-dd HH:mm:ss`.
    pub from: String,
    /// End of the range; the current UTC time when absent.
    pub to: Option<String>,
    /// Minimum gap between two store requests.
    pub delay_ms: u64,
    pub window_hours: u64,
    pub default_resolution: String,
    pub metric: String,
    pub max_points_per_write: usize,
    /// Sensors processed concurrently.
    pub workers: usize,
    /// Stop the run when a sensor cannot be read at all.
    pub halt_on_unreachable_sensor: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            from: "2015-09-01 00:00:00".to_string(),
            to: None,
            delay_ms: 250,
            window_hours: 24,
            default_resolution: DEFAULT_RESOLUTION.to_string(),
            metric: "*".to_string(),
            max_points_per_write: 5000,
            workers: 1,
            halt_on_unreachable_sensor: false,
        }
    }
}

impl MigrationConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    pub fn window_stride(&self) -> TimeDelta {
        i64::try_from(self.window_hours)
            .ok()
            .and_then(TimeDelta::try_hours)
            .unwrap_or(TimeDelta::MAX)
    }

    /// Overall `[from, to)` range, resolving a missing `to` against `now`.
    pub fn time_range_at(&self, now: NaiveDateTime) -> Result<TimeWindow, ConfigError> {
        let from = FetchFilter::parse_time(&self.from)?;
        let to = match &self.to {
            Some(to) => FetchFilter::parse_time(to)?,
            None => now,
        };
        TimeWindow::new(from, to)
    }

    pub fn time_range(&self) -> Result<TimeWindow, ConfigError> {
        self.time_range_at(Utc::now().naive_utc())
    }
}

/// The downsample loop.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BackfillConfig {
    /// Intervals backfilled window by window. `1w` is not allowed here.
    pub intervals: Vec<String>,
    pub window_days: u64,
    pub source_series: String,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            intervals: DownsampleInterval::AUTOMATIC
                .iter()
                .map(|i| i.label().to_string())
                .collect(),
            window_days: 7,
            source_series: READING_SERIES.to_string(),
        }
    }
}

impl BackfillConfig {
    pub fn window_stride(&self) -> TimeDelta {
        i64::try_from(self.window_days)
            .ok()
            .and_then(TimeDelta::try_days)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn parsed_intervals(&self) -> Result<Vec<DownsampleInterval>, ConfigError> {
        self.intervals.iter().map(|label| label.parse()).collect()
    }

    pub fn scheduler(&self) -> Result<BackfillScheduler, ConfigError> {
        BackfillScheduler::new(self.parsed_intervals()?, &self.source_series)
    }
}

/// Which sensors to migrate and their destination ids.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SensorsConfig {
    /// Serial codes in processing order.
    pub roster: Vec<String>,
    /// Serial code to numeric id in the destination.
    pub ids: HashMap<String, i64>,
}

impl SensorsConfig {
    pub fn registry(&self) -> Result<SensorRegistry, ConfigError> {
        SensorRegistry::new(self.roster.iter().map(String::as_str), &self.ids)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config(&StdEnvSource)
    }

    /// Load configuration from a specific file path (for the --config flag).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path, &StdEnvSource)
    }

    /// Parse TOML content on its own, without defaults layering or env.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config content")
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.source = other.source;
        self.destination = other.destination;
        self.migration = other.migration;
        self.backfill = other.backfill;
        self.log = other.log;

        if !other.sensors.roster.is_empty() || !other.sensors.ids.is_empty() {
            self.sensors = other.sensors;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}
