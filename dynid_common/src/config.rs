//! Configuration loading traits and types.
//!
//! This module provides a standardized way to load the TOML configuration of
//! the excitation controller and its simulated plant.
//!
//! # Usage
//!
//! ```rust,no_run
//! use dynid_common::config::{ConfigError, DynIdConfig};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = DynIdConfig::load_validated(Path::new("config/dynid.toml"))?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::consts::{
    DEFAULT_COMMAND_QUEUE_DEPTH, DEFAULT_CYCLE_TIME_US, DEFAULT_DATA_POOL_SIZE,
    DEFAULT_MAX_CHUNKSIZE, DEFAULT_SIM_COULOMB_FRICTION, DEFAULT_SIM_DAMPING,
    DEFAULT_SIM_INERTIA, MAX_JOINT_NAME_LEN,
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
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl LogLevel {
    /// Directive string understood by `tracing_subscriber::EnvFilter`.
    pub const fn as_directive(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Common configuration fields.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "dynid-sim-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
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

/// Excitation controller settings.
///
/// # TOML Example
///
/// ```toml
/// [controller]
/// joints = ["shoulder_pan", "shoulder_lift", "elbow_flex"]
/// cycle_time_us = 1000
/// max_chunksize = 10000
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ControllerConfig {
    /// Ordered joint names; list order defines joint indices.
    pub joints: Vec<String>,

    /// Control cycle period [µs].
    #[serde(default = "default_cycle_time_us")]
    pub cycle_time_us: u32,

    /// Largest chunk size a start command may request.
    ///
    /// Sample storage for this many samples is reserved at startup.
    #[serde(default = "default_max_chunksize")]
    pub max_chunksize: usize,

    /// Pending start commands held between two cycles.
    #[serde(default = "default_command_queue_depth")]
    pub command_queue_depth: usize,

    /// Outbound chunks in flight between the RT thread and the consumer.
    #[serde(default = "default_data_pool_size")]
    pub data_pool_size: usize,
}

impl ControllerConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - the joint list is empty, has duplicates, or a name is empty or too long
    /// - `cycle_time_us`, `max_chunksize`, `command_queue_depth` or
    ///   `data_pool_size` is zero
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.joints.is_empty() {
            return Err(ConfigError::ValidationError(
                "controller.joints cannot be empty".to_string(),
            ));
        }

        let mut seen = HashSet::with_capacity(self.joints.len());
        for name in &self.joints {
            if name.is_empty() {
                return Err(ConfigError::ValidationError(
                    "controller.joints contains an empty name".to_string(),
                ));
            }
            if name.len() > MAX_JOINT_NAME_LEN {
                return Err(ConfigError::ValidationError(format!(
                    "joint name `{name}` exceeds {MAX_JOINT_NAME_LEN} bytes"
                )));
            }
            if !seen.insert(name.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "duplicate joint `{name}` in controller.joints"
                )));
            }
        }

        if self.cycle_time_us == 0 {
            return Err(ConfigError::ValidationError(
                "controller.cycle_time_us must be > 0".to_string(),
            ));
        }
        if self.max_chunksize == 0 {
            return Err(ConfigError::ValidationError(
                "controller.max_chunksize must be > 0".to_string(),
            ));
        }
        if self.command_queue_depth == 0 {
            return Err(ConfigError::ValidationError(
                "controller.command_queue_depth must be > 0".to_string(),
            ));
        }
        if self.data_pool_size == 0 {
            return Err(ConfigError::ValidationError(
                "controller.data_pool_size must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Parameters of the simulated joint plant.
///
/// Every simulated joint shares the same parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimulationConfig {
    /// Rotor + link inertia [kg·m²].
    #[serde(default = "default_sim_inertia")]
    pub inertia: f64,
    /// Viscous damping [N·m·s/rad].
    #[serde(default = "default_sim_damping")]
    pub damping: f64,
    /// Coulomb friction magnitude [N·m].
    #[serde(default = "default_sim_coulomb_friction")]
    pub coulomb_friction: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            inertia: DEFAULT_SIM_INERTIA,
            damping: DEFAULT_SIM_DAMPING,
            coulomb_friction: DEFAULT_SIM_COULOMB_FRICTION,
        }
    }
}

impl SimulationConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if inertia is not positive or
    /// damping / friction is negative.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.inertia > 0.0) {
            return Err(ConfigError::ValidationError(
                "simulation.inertia must be > 0".to_string(),
            ));
        }
        if self.damping < 0.0 || self.coulomb_friction < 0.0 {
            return Err(ConfigError::ValidationError(
                "simulation.damping and simulation.coulomb_friction must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DynIdConfig {
    pub shared: SharedConfig,
    pub controller: ControllerConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

impl DynIdConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.controller.validate()?;
        self.simulation.validate()
    }

    /// Load from a TOML file and validate.
    pub fn load_validated(path: &Path) -> Result<Self, ConfigError> {
        let config = Self::load(path)?;
        config.validate()?;
        debug!(
            path = %path.display(),
            joints = config.controller.joints.len(),
            "configuration loaded"
        );
        Ok(config)
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}

fn default_cycle_time_us() -> u32 {
    DEFAULT_CYCLE_TIME_US
}

fn default_max_chunksize() -> usize {
    DEFAULT_MAX_CHUNKSIZE
}

fn default_command_queue_depth() -> usize {
    DEFAULT_COMMAND_QUEUE_DEPTH
}

fn default_data_pool_size() -> usize {
    DEFAULT_DATA_POOL_SIZE
}

fn default_sim_inertia() -> f64 {
    DEFAULT_SIM_INERTIA
}

fn default_sim_damping() -> f64 {
    DEFAULT_SIM_DAMPING
}

fn default_sim_coulomb_friction() -> f64 {
    DEFAULT_SIM_COULOMB_FRICTION
}

/// Trait for loading configuration from TOML files.
///
/// Default implementation works with any type implementing
/// `serde::de::DeserializeOwned`.
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
