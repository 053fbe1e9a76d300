//! Configuration loading traits and types.
//!
//! All soft-PLC binaries load one TOML file into [`PlcConfig`]. Every section
//! and every field is optional; anything missing falls back to the plant
//! defaults in [`crate::consts`].
//!
//! # Usage
//!
//! ```rust,no_run
//! use plc_common::config::{ConfigError, ConfigLoader, PlcConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = PlcConfig::load(Path::new("plc.toml"))?;
//!     config.validate()?;
//!     println!("Listening on port {}", config.modbus.port);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::consts::{
    BATCH_SIZE, MODBUS_BIND_ADDRESS, MODBUS_PORT, PLC_SERVICE_NAME, SCAN_CYCLE_MS,
};

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

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Common configuration fields shared across all PLC binaries.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "factory-plc-line1"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SharedConfig {
    /// Logging verbosity level.
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            service_name: PLC_SERVICE_NAME.to_string(),
        }
    }
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

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

// ─── Application configuration ──────────────────────────────────────

/// Modbus-TCP listener settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModbusConfig {
    /// Interface to bind, e.g. `0.0.0.0` or `127.0.0.1`.
    pub bind_address: String,
    /// TCP port. `0` asks the OS for an ephemeral port.
    pub port: u16,
}

impl Default for ModbusConfig {
    fn default() -> Self {
        Self {
            bind_address: MODBUS_BIND_ADDRESS.to_string(),
            port: MODBUS_PORT,
        }
    }
}

impl ModbusConfig {
    /// Listener address assembled from `bind_address` and `port`.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::ValidationError(format!(
                "bind_address '{}' is not an IP address",
                self.bind_address
            ))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Scan task settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Scan period in milliseconds.
    pub cycle_time_ms: u64,
    /// Start ticking as soon as the runtime is up.
    pub autostart: bool,
    /// Refuse `start` while no plant client is connected.
    pub require_client: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            cycle_time_ms: SCAN_CYCLE_MS,
            autostart: true,
            require_client: false,
        }
    }
}

/// Durations and batch sizes used by the control logic, in scan ticks.
///
/// Defaults reproduce the tuning of the simulated plant at a 50 ms scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogicTimings {
    pub clamp_delay_ticks: u32,
    pub inspection_timeout_ticks: u32,

    pub pusher_ticks: u32,
    pub roller_ticks: u32,
    pub normal_roller_delay_ticks: u32,
    pub defect_roller_delay_ticks: u32,
    pub sort_hold_ticks: u32,
    pub batch_size: u8,

    pub normal_shift_ticks: u32,
    pub normal_lift_ticks: u32,
    pub error_shift_ticks: u32,
    pub error_lift_ticks: u32,
    pub travel_timeout_ticks: u32,
    pub place_ticks: u32,
    pub lower_ticks: u32,
    pub home_delay_ticks: u32,
    pub home_timeout_ticks: u32,
}

impl Default for LogicTimings {
    fn default() -> Self {
        Self {
            clamp_delay_ticks: 10,
            inspection_timeout_ticks: 100,
            pusher_ticks: 20,
            roller_ticks: 170,
            normal_roller_delay_ticks: 40,
            defect_roller_delay_ticks: 0,
            sort_hold_ticks: 40,
            batch_size: BATCH_SIZE,
            normal_shift_ticks: 60,
            normal_lift_ticks: 60,
            error_shift_ticks: 40,
            error_lift_ticks: 40,
            travel_timeout_ticks: 20,
            place_ticks: 40,
            lower_ticks: 40,
            home_delay_ticks: 5,
            home_timeout_ticks: 60,
        }
    }
}

impl LogicTimings {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "batch_size must be at least 1".to_string(),
            ));
        }
        if self.inspection_timeout_ticks == 0 {
            return Err(ConfigError::ValidationError(
                "inspection_timeout_ticks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete configuration of the soft-PLC.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// service_name = "factory-plc"
///
/// [modbus]
/// bind_address = "127.0.0.1"
/// port = 5020
///
/// [scan]
/// cycle_time_ms = 50
/// autostart = false
///
/// [timings]
/// roller_ticks = 120
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PlcConfig {
    pub shared: SharedConfig,
    pub modbus: ModbusConfig,
    pub scan: ScanConfig,
    pub timings: LogicTimings,
}

impl PlcConfig {
    /// Validate every section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `shared.service_name` is empty
    /// - `modbus.bind_address` is not an IP address
    /// - `scan.cycle_time_ms` is zero
    /// - `timings.batch_size` or `timings.inspection_timeout_ticks` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.modbus.socket_addr()?;
        if self.scan.cycle_time_ms == 0 {
            return Err(ConfigError::ValidationError(
                "cycle_time_ms must be greater than zero".to_string(),
            ));
        }
        self.timings.validate()
    }

    /// Load and validate `path`, or fall back to defaults when no path is given.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let config = Self::load(path)?;
                info!(path = %path.display(), "Configuration loaded");
                config
            }
            None => {
                info!("No configuration file given, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }
}

// ─── Tests ──────────────────────────────────────────────────────────
