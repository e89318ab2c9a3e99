//! Conform Configuration System
//!
//! Provides run configuration for conformance suites:
//! - Run configuration (conform.toml)
//! - Per-area enablement and settings
//! - Environment variable overrides
//! - Validation before any test executes
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded and merged in the following order (later overrides earlier):
//! 1. Defaults (every area enabled, no filters)
//! 2. Run config (./conform.toml, searched upwards)
//! 3. Environment variables (CONFORM_*)
//! 4. CLI flags
//!
//! # Example
//!
//! ```no_run
//! use conform_config::ConfigLoader;
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let config = loader.load_from_directory(Path::new(".")).unwrap();
//! config.run.validate(&["session", "store"]).unwrap();
//! ```

pub mod loader;
pub mod run;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Unknown protocol area '{area}' (known areas: {known})")]
    UnknownArea { area: String, known: String },
}

impl ConfigError {
    pub(crate) fn invalid_value(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn unknown_area(area: &str, known: &[&str]) -> Self {
        Self::UnknownArea {
            area: area.to_string(),
            known: known.join(", "),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::{Config, ConfigLoader, CONFIG_FILE_NAME};
pub use run::{AreaConfig, RunConfig, RunSection};
