//! Configuration Loader
//!
//! Finds conform.toml and layers environment overrides on top of it.

use crate::run::RunConfig;
use crate::{ConfigError, ConfigResult};
use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Name of the run configuration file
pub const CONFIG_FILE_NAME: &str = "conform.toml";

/// Configuration loader
///
/// Sources, lowest priority first:
/// 1. Defaults
/// 2. Run config (conform.toml, searched upwards from the start directory)
/// 3. Environment variables (CONFORM_*)
/// 4. CLI flags (handled by caller)
pub struct ConfigLoader {
    /// Skip CONFORM_* overrides
    ignore_env: bool,
}

/// Loaded configuration
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Run configuration after overrides
    pub run: RunConfig,

    /// Directory where conform.toml was found
    pub project_root: Option<PathBuf>,
}

impl ConfigLoader {
    /// Create a new configuration loader
    pub fn new() -> Self {
        Self { ignore_env: false }
    }

    /// Do not apply CONFORM_* environment overrides
    pub fn without_env(mut self) -> Self {
        self.ignore_env = true;
        self
    }

    /// Load configuration starting from the given directory
    ///
    /// Walks up the directory tree to find conform.toml. Without one, the
    /// defaults apply and the config has no project root.
    pub fn load_from_directory(&self, start_dir: &Path) -> ConfigResult<Config> {
        let (project_root, run) = self.find_run_config(start_dir)?;
        let run = self.apply_env_overrides(run)?;

        Ok(Config { run, project_root })
    }

    /// Load configuration from a specific file
    pub fn load_from_file(&self, config_path: &Path) -> ConfigResult<Config> {
        debug!(target: "conform::config", path = %config_path.display(), "loading run config");
        let run = RunConfig::load_from_file(config_path)?;
        let run = self.apply_env_overrides(run)?;

        let project_root = config_path.parent().map(|p| p.to_path_buf());

        Ok(Config { run, project_root })
    }

    fn find_run_config(&self, start_dir: &Path) -> ConfigResult<(Option<PathBuf>, RunConfig)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);

            if config_path.exists() {
                debug!(target: "conform::config", path = %config_path.display(), "found run config");
                let run = RunConfig::load_from_file(&config_path)?;
                return Ok((Some(current), run));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => {
                    debug!(target: "conform::config", "no {} found, using defaults", CONFIG_FILE_NAME);
                    return Ok((None, RunConfig::default()));
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// - CONFORM_AREAS: comma-separated list replacing `run.areas`
    /// - CONFORM_FILTER: comma-separated list replacing `run.filters`
    /// - CONFORM_STATUS_FILE: replaces `run.status-file`
    fn apply_env_overrides(&self, mut config: RunConfig) -> ConfigResult<RunConfig> {
        if self.ignore_env {
            return Ok(config);
        }

        if let Ok(areas) = env::var("CONFORM_AREAS") {
            config.run.areas = split_list("CONFORM_AREAS", &areas)?;
            debug!(target: "conform::config", areas = ?config.run.areas, "CONFORM_AREAS override");
        }

        if let Ok(filters) = env::var("CONFORM_FILTER") {
            config.run.filters = split_list("CONFORM_FILTER", &filters)?;
            debug!(target: "conform::config", filters = ?config.run.filters, "CONFORM_FILTER override");
        }

        if let Ok(path) = env::var("CONFORM_STATUS_FILE") {
            if path.trim().is_empty() {
                return Err(ConfigError::invalid_value(
                    "CONFORM_STATUS_FILE",
                    "path cannot be empty",
                ));
            }
            config.run.status_file = Some(PathBuf::from(path));
        }

        Ok(config)
    }
}

fn split_list(var: &str, value: &str) -> ConfigResult<Vec<String>> {
    let items: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if items.is_empty() {
        return Err(ConfigError::invalid_value(var, "list cannot be empty"));
    }
    Ok(items)
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Get the project root directory
    pub fn project_root(&self) -> Option<&Path> {
        self.project_root.as_deref()
    }

    /// Check if a conform.toml was found
    pub fn is_project(&self) -> bool {
        self.project_root.is_some()
    }

    /// Status dump path, resolved against the project root when relative
    pub fn status_file(&self) -> Option<PathBuf> {
        let path = self.run.run.status_file.as_ref()?;
        match &self.project_root {
            Some(root) if path.is_relative() => Some(root.join(path)),
            _ => Some(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    fn create_config_file(dir: &Path, content: &str) -> PathBuf {
        let config_path = dir.join(CONFIG_FILE_NAME);
        fs::write(&config_path, content).unwrap();
        config_path
    }

    #[test]
    #[serial]
    fn test_load_run_config() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[run]\nfilters = [\"login\"]\n");

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.run.filters(), &["login".to_string()]);
        assert!(config.is_project());
    }

    #[test]
    #[serial]
    fn test_find_config_in_parent() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[run]\nareas = [\"store\"]\n");

        let sub_dir = temp_dir.path().join("nested").join("deeper");
        fs::create_dir_all(&sub_dir).unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(&sub_dir)
            .unwrap();

        assert_eq!(config.run.run.areas, vec!["store".to_string()]);
        assert_eq!(config.project_root(), Some(temp_dir.path()));
    }

    #[test]
    #[serial]
    fn test_no_run_config() {
        let temp_dir = TempDir::new().unwrap();

        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();

        assert_eq!(config.run, RunConfig::default());
        assert!(!config.is_project());
    }

    #[test]
    #[serial]
    fn test_env_override_areas_and_filters() {
        let temp_dir = TempDir::new().unwrap();
        create_config_file(temp_dir.path(), "[run]\nfilters = [\"login\"]\n");

        env::set_var("CONFORM_AREAS", "session, store");
        env::set_var("CONFORM_FILTER", "token,,logout");

        let config = ConfigLoader::new()
            .load_from_directory(temp_dir.path())
            .unwrap();

        env::remove_var("CONFORM_AREAS");
        env::remove_var("CONFORM_FILTER");

        assert_eq!(config.run.run.areas, vec!["session", "store"]);
        assert_eq!(config.run.filters(), &["token".to_string(), "logout".to_string()]);
    }

    #[test]
    #[serial]
    fn test_env_override_empty_list_rejected() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("CONFORM_AREAS", " , ");
        let result = ConfigLoader::new().load_from_directory(temp_dir.path());
        env::remove_var("CONFORM_AREAS");

        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "CONFORM_AREAS"
        ));
    }

    #[test]
    #[serial]
    fn test_without_env_ignores_overrides() {
        let temp_dir = TempDir::new().unwrap();

        env::set_var("CONFORM_FILTER", "token");
        let config = ConfigLoader::new()
            .without_env()
            .load_from_directory(temp_dir.path())
            .unwrap();
        env::remove_var("CONFORM_FILTER");

        assert!(config.run.filters().is_empty());
    }

    #[test]
    #[serial]
    fn test_status_file_relative_to_root() {
        let temp_dir = TempDir::new().unwrap();
        let config_path =
            create_config_file(temp_dir.path(), "[run]\nstatus-file = \"out/status.json\"\n");

        let config = ConfigLoader::new()
            .without_env()
            .load_from_file(&config_path)
            .unwrap();

        assert_eq!(
            config.status_file(),
            Some(temp_dir.path().join("out/status.json"))
        );
    }

    #[test]
    fn test_status_file_absent() {
        assert_eq!(Config::default().status_file(), None);
    }
}
