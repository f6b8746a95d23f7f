//! Configuration loading traits and types.
//!
//! Provides a standardized way to load TOML configuration for the truck
//! control core, plus the `CoreConfig` tunables used by `truck_core`.
//!
//! # Usage
//!
//! ```rust,no_run
//! use truck_common::config::{CoreConfig, ConfigLoader};
//! use std::path::Path;
//!
//! let cfg = CoreConfig::load(Path::new("config.toml")).unwrap_or_default();
//! println!("ring buffer capacity: {}", cfg.ring_buffer_capacity);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::consts;

/// Log level for configuration (maps onto `tracing`'s severity levels).
///
/// Serializes to lowercase strings: "trace", "debug", "info", "warn", "error".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace-level verbosity.
    Trace,
    /// Debug-level verbosity.
    Debug,
    /// Info-level verbosity (default).
    Info,
    /// Warning-level verbosity.
    Warn,
    /// Error-level verbosity.
    Error,
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Common configuration fields shared across truck workspace binaries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,

    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

// Blanket implementation for all types that implement DeserializeOwned.
impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── CoreConfig ─────────────────────────────────────────────────────

fn default_ring_buffer_capacity() -> usize {
    consts::RING_BUFFER_CAPACITY
}
fn default_sensor_filter_period_ms() -> u64 {
    consts::SENSOR_FILTER_PERIOD_MS
}
fn default_fault_detector_period_ms() -> u64 {
    consts::FAULT_DETECTOR_PERIOD_MS
}
fn default_command_mode_period_ms() -> u64 {
    consts::COMMAND_MODE_PERIOD_MS
}
fn default_navigation_period_ms() -> u64 {
    consts::NAVIGATION_PERIOD_MS
}
fn default_data_logger_period_ms() -> u64 {
    consts::DATA_LOGGER_PERIOD_MS
}
fn default_local_snapshot_period_ms() -> u64 {
    consts::LOCAL_SNAPSHOT_PERIOD_MS
}
fn default_watchdog_check_period_ms() -> u64 {
    consts::WATCHDOG_CHECK_PERIOD_MS
}
fn default_watchdog_timeout_ms() -> u64 {
    consts::DEFAULT_WATCHDOG_TIMEOUT_MS
}
fn default_filter_order() -> usize {
    consts::FILTER_ORDER
}
fn default_temp_warning_threshold() -> i32 {
    consts::TEMP_WARNING_THRESHOLD
}
fn default_temp_critical_threshold() -> i32 {
    consts::TEMP_CRITICAL_THRESHOLD
}
fn default_arrival_radius() -> i32 {
    consts::ARRIVAL_RADIUS
}
fn default_alignment_threshold_deg() -> i32 {
    consts::ALIGNMENT_THRESHOLD_DEG
}
fn default_realignment_threshold_deg() -> i32 {
    consts::REALIGNMENT_THRESHOLD_DEG
}
fn default_cruise_speed_percent() -> i32 {
    consts::CRUISE_SPEED_PERCENT
}
fn default_rotation_effort() -> i32 {
    consts::ROTATION_EFFORT
}
fn default_avoidance_radius() -> i32 {
    consts::AVOIDANCE_RADIUS
}
fn default_avoidance_margin() -> i32 {
    consts::AVOIDANCE_MARGIN
}
fn default_look_ahead_distance() -> i32 {
    consts::LOOK_AHEAD_DISTANCE
}
fn default_forced_refresh_interval() -> u32 {
    consts::FORCED_REFRESH_INTERVAL
}
fn default_perf_window_size() -> usize {
    consts::PERF_WINDOW_SIZE
}
fn default_inbound_dir() -> String {
    consts::DEFAULT_INBOUND_DIR.to_string()
}
fn default_outbound_dir() -> String {
    consts::DEFAULT_OUTBOUND_DIR.to_string()
}
fn default_log_dir() -> String {
    consts::DEFAULT_LOG_DIR.to_string()
}

/// Runtime-tunable configuration for the truck control core.
///
/// Loaded once at startup from an optional TOML file (`--config`); every
/// field falls back to the documented default in `truck_common::consts`
/// when the file is absent or a field is missing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    pub ring_buffer_capacity: usize,
    pub sensor_filter_period_ms: u64,
    pub fault_detector_period_ms: u64,
    pub command_mode_period_ms: u64,
    pub navigation_period_ms: u64,
    pub data_logger_period_ms: u64,
    pub local_snapshot_period_ms: u64,
    pub watchdog_check_period_ms: u64,
    pub watchdog_timeout_ms: u64,
    pub filter_order: usize,
    pub temp_warning_threshold: i32,
    pub temp_critical_threshold: i32,
    pub arrival_radius: i32,
    pub alignment_threshold_deg: i32,
    pub realignment_threshold_deg: i32,
    pub cruise_speed_percent: i32,
    pub rotation_effort: i32,
    pub avoidance_radius: i32,
    pub avoidance_margin: i32,
    pub look_ahead_distance: i32,
    pub forced_refresh_interval: u32,
    pub perf_window_size: usize,
    pub inbound_dir: String,
    pub outbound_dir: String,
    pub log_dir: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            ring_buffer_capacity: default_ring_buffer_capacity(),
            sensor_filter_period_ms: default_sensor_filter_period_ms(),
            fault_detector_period_ms: default_fault_detector_period_ms(),
            command_mode_period_ms: default_command_mode_period_ms(),
            navigation_period_ms: default_navigation_period_ms(),
            data_logger_period_ms: default_data_logger_period_ms(),
            local_snapshot_period_ms: default_local_snapshot_period_ms(),
            watchdog_check_period_ms: default_watchdog_check_period_ms(),
            watchdog_timeout_ms: default_watchdog_timeout_ms(),
            filter_order: default_filter_order(),
            temp_warning_threshold: default_temp_warning_threshold(),
            temp_critical_threshold: default_temp_critical_threshold(),
            arrival_radius: default_arrival_radius(),
            alignment_threshold_deg: default_alignment_threshold_deg(),
            realignment_threshold_deg: default_realignment_threshold_deg(),
            cruise_speed_percent: default_cruise_speed_percent(),
            rotation_effort: default_rotation_effort(),
            avoidance_radius: default_avoidance_radius(),
            avoidance_margin: default_avoidance_margin(),
            look_ahead_distance: default_look_ahead_distance(),
            forced_refresh_interval: default_forced_refresh_interval(),
            perf_window_size: default_perf_window_size(),
            inbound_dir: default_inbound_dir(),
            outbound_dir: default_outbound_dir(),
            log_dir: default_log_dir(),
        }
    }
}

impl CoreConfig {
    /// Validate semantic constraints beyond what serde can express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ring_buffer_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "ring_buffer_capacity must be > 0".to_string(),
            ));
        }
        if self.temp_warning_threshold >= self.temp_critical_threshold {
            return Err(ConfigError::ValidationError(format!(
                "temp_warning_threshold ({}) must be < temp_critical_threshold ({})",
                self.temp_warning_threshold, self.temp_critical_threshold
            )));
        }
        if self.alignment_threshold_deg >= self.realignment_threshold_deg {
            return Err(ConfigError::ValidationError(format!(
                "alignment_threshold_deg ({}) must be < realignment_threshold_deg ({})",
                self.alignment_threshold_deg, self.realignment_threshold_deg
            )));
        }
        if !(100..=1000).contains(&self.data_logger_period_ms) {
            return Err(ConfigError::ValidationError(format!(
                "data_logger_period_ms={} out of range [100, 1000]",
                self.data_logger_period_ms
            )));
        }
        if !(100..=2000).contains(&self.local_snapshot_period_ms) {
            return Err(ConfigError::ValidationError(format!(
                "local_snapshot_period_ms={} out of range [100, 2000]",
                self.local_snapshot_period_ms
            )));
        }
        Ok(())
    }

    /// Load a `CoreConfig` from `path`, falling back to defaults on any
    /// error. The caller is expected to log the returned error as a
    /// warning rather than abort — per the configuration-error policy,
    /// startup never fails because of a missing or malformed config file.
    pub fn load_or_default(path: &Path) -> (Self, Option<ConfigError>) {
        match Self::load(path).and_then(|cfg| cfg.validate().map(|_| cfg)) {
            Ok(cfg) => (cfg, None),
            Err(e) => (Self::default(), Some(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_log_level_default() {
        assert_eq!(default_log_level(), LogLevel::Info);
    }

    #[test]
    fn test_shared_config_validation_success() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "truck-core".to_string(),
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_config_loader_file_not_found() {
        let result = CoreConfig::load(Path::new("/nonexistent/path/config.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_config_loader_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid toml {{{{").unwrap();

        let result = CoreConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_core_config_defaults_are_valid() {
        let cfg = CoreConfig::default();
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_core_config_partial_toml_uses_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"ring_buffer_capacity = 50"#).unwrap();
        file.flush().unwrap();

        let cfg = CoreConfig::load(file.path()).unwrap();
        assert_eq!(cfg.ring_buffer_capacity, 50);
        assert_eq!(cfg.filter_order, consts::FILTER_ORDER);
    }

    #[test]
    fn test_load_or_default_falls_back_on_missing_file() {
        let (cfg, err) = CoreConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(cfg.ring_buffer_capacity, consts::RING_BUFFER_CAPACITY);
        assert!(matches!(err, Some(ConfigError::FileNotFound)));
    }

    #[test]
    fn test_validate_rejects_inverted_temperature_thresholds() {
        let mut cfg = CoreConfig::default();
        cfg.temp_warning_threshold = 130;
        cfg.temp_critical_threshold = 120;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }
}
