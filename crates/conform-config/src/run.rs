//! Run Configuration (conform.toml)
//!
//! Describes which protocol areas a run covers, top-level filters, and the
//! per-area settings handed to test bodies.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Run configuration from conform.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Run-wide options
    #[serde(default)]
    pub run: RunSection,

    /// Per-area configuration, keyed by area name
    #[serde(default)]
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub areas: BTreeMap<String, AreaConfig>,
}

/// The `[run]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct RunSection {
    /// Restrict the run to these areas (default: every enabled area)
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub areas: Vec<String>,

    /// Case-insensitive substrings matched against group and assertion text
    #[serde(default)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<String>,

    /// Where to write the status dump after a run
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_file: Option<PathBuf>,
}

/// An `[areas.<name>]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct AreaConfig {
    /// Whether the area takes part in the run (default: true)
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Free-form settings read by the area's test bodies
    #[serde(default)]
    #[serde(skip_serializing_if = "toml::Table::is_empty")]
    pub settings: toml::Table,
}

fn default_enabled() -> bool {
    true
}

impl Default for AreaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            settings: toml::Table::new(),
        }
    }
}

impl RunConfig {
    /// Load run configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// Validate against the areas a catalog actually offers.
    ///
    /// A failure here is fatal: the run must not start.
    pub fn validate(&self, known_areas: &[&str]) -> ConfigResult<()> {
        for name in self.areas.keys() {
            check_area_name("areas", name, known_areas)?;
        }

        for name in &self.run.areas {
            check_area_name("run.areas", name, known_areas)?;
        }

        if let Some(index) = self.run.filters.iter().position(|f| f.trim().is_empty()) {
            return Err(ConfigError::invalid_value(
                format!("run.filters[{}]", index),
                "filter cannot be empty",
            ));
        }

        if let Some(path) = &self.run.status_file {
            if path.as_os_str().is_empty() {
                return Err(ConfigError::invalid_value(
                    "run.status-file",
                    "path cannot be empty",
                ));
            }
        }

        if self.enabled_areas(known_areas).is_empty() {
            return Err(ConfigError::ValidationError(
                "no protocol area is enabled".to_string(),
            ));
        }

        Ok(())
    }

    /// Areas taking part in the run, in the order of `known_areas`
    pub fn enabled_areas(&self, known_areas: &[&str]) -> Vec<String> {
        known_areas
            .iter()
            .filter(|area| self.is_enabled(area))
            .map(|area| area.to_string())
            .collect()
    }

    /// Whether an area takes part in the run
    pub fn is_enabled(&self, area: &str) -> bool {
        let listed = self.run.areas.is_empty() || self.run.areas.iter().any(|a| a == area);
        let enabled = self.areas.get(area).map_or(true, |a| a.enabled);
        listed && enabled
    }

    pub fn filters(&self) -> &[String] {
        &self.run.filters
    }

    /// A setting for an area, if configured
    pub fn setting(&self, area: &str, key: &str) -> Option<&toml::Value> {
        self.areas.get(area).and_then(|a| a.settings.get(key))
    }

    /// A string setting for an area
    pub fn setting_str(&self, area: &str, key: &str) -> Option<&str> {
        self.setting(area, key).and_then(toml::Value::as_str)
    }

    /// An integer setting for an area
    pub fn setting_int(&self, area: &str, key: &str) -> Option<i64> {
        self.setting(area, key).and_then(toml::Value::as_integer)
    }

    pub fn setting_bool(&self, area: &str, key: &str) -> Option<bool> {
        self.setting(area, key).and_then(toml::Value::as_bool)
    }

    /// Render back to TOML
    pub fn to_toml_string(&self) -> ConfigResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ConfigError::ValidationError(format!("cannot serialize config: {}", e)))
    }
}

fn check_area_name(field: &str, name: &str, known_areas: &[&str]) -> ConfigResult<()> {
    if name.trim().is_empty() {
        return Err(ConfigError::invalid_value(field, "area name cannot be empty"));
    }
    if !known_areas.contains(&name) {
        return Err(ConfigError::unknown_area(name, known_areas));
    }
    Ok(())
}
