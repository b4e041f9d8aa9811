//! Configuration loading traits and types.
//!
//! TOML configuration for the driver suite, loaded through the
//! [`ConfigLoader`] trait.
//!
//! # Usage
//!
//! ```rust,no_run
//! use sym560_common::config::{CardConfig, ConfigLoader, ConfigError};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = CardConfig::load(Path::new("sym560.toml"))?;
//!     config.validate()?;
//!     println!("Card at {}", config.pci_address);
//!     Ok(())
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

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
    /// Most verbose, register-level tracing.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about driver operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Common configuration fields shared across the suite's applications.
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

/// Configuration for one GPS-PCI card.
///
/// # TOML Example
///
/// ```toml
/// pci_address = "0000:03:00.0"
/// uio_device = "/dev/uio0"
/// capture_timeout_ms = 30000
///
/// [shared]
/// log_level = "debug"
/// service_name = "sym560-timing-01"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardConfig {
    /// Common fields.
    pub shared: SharedConfig,

    /// PCI bus address in `domain:bus:device.function` form,
    /// e.g. `0000:03:00.0`.
    pub pci_address: String,

    /// UIO character device delivering the card's interrupts.
    pub uio_device: PathBuf,

    /// Upper bound on a blocking event-capture wait, in milliseconds.
    /// Absent means wait indefinitely, as the card can legitimately stay
    /// silent for hours between events.
    #[serde(default)]
    pub capture_timeout_ms: Option<u64>,
}

impl CardConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if the shared fields are
    /// invalid, the PCI address is malformed, or the UIO path is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        if !is_valid_pci_address(&self.pci_address) {
            return Err(ConfigError::ValidationError(format!(
                "pci_address '{}' is not of the form dddd:bb:dd.f",
                self.pci_address
            )));
        }

        if self.uio_device.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "uio_device cannot be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The sysfs directory of the configured PCI function.
    pub fn sysfs_dir(&self) -> PathBuf {
        Path::new("/sys/bus/pci/devices").join(&self.pci_address)
    }

    /// Capture wait bound as a `Duration`, if configured.
    pub fn capture_timeout(&self) -> Option<Duration> {
        self.capture_timeout_ms.map(Duration::from_millis)
    }
}

/// Check a `domain:bus:device.function` PCI address.
fn is_valid_pci_address(addr: &str) -> bool {
    let parts: Vec<&str> = addr.split(':').collect();
    if parts.len() != 3 {
        return false;
    }
    let (domain, bus) = (parts[0], parts[1]);
    let Some((device, function)) = parts[2].split_once('.') else {
        return false;
    };

    domain.len() == 4
        && bus.len() == 2
        && device.len() == 2
        && function.len() == 1
        && [domain, bus, device, function]
            .iter()
            .all(|p| p.chars().all(|c| c.is_ascii_hexdigit()))
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
