//! CLI configuration via environment variables
//!
//! Output preferences live in the environment; what a run covers lives in
//! conform.toml (see `conform_config`).

use std::env;

/// Log filter used when CONFORM_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// CLI configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Default to JSON output (CONFORM_JSON=1)
    pub default_json: bool,
    /// Disable colored output (CONFORM_NO_COLOR=1 or NO_COLOR=1)
    pub no_color: bool,
    /// tracing filter directives for stderr logging (CONFORM_LOG)
    pub log_filter: String,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self {
            default_json: env::var("CONFORM_JSON")
                .map(|v| is_truthy(&v))
                .unwrap_or(false),
            no_color: env::var("CONFORM_NO_COLOR").is_ok() || env::var("NO_COLOR").is_ok(),
            log_filter: env::var("CONFORM_LOG")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    // Environment variables are process-wide, so every case lives in one test
    #[test]
    fn test_config_from_env() {
        env::remove_var("CONFORM_JSON");
        env::remove_var("CONFORM_NO_COLOR");
        env::remove_var("NO_COLOR");
        env::remove_var("CONFORM_LOG");

        let config = Config::from_env();
        assert!(!config.default_json);
        assert!(!config.no_color);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);

        env::set_var("CONFORM_JSON", "yes");
        env::set_var("NO_COLOR", "1");
        env::set_var("CONFORM_LOG", "conform::engine=debug");
        let config = Config::from_env();
        assert!(config.default_json);
        assert!(config.no_color);
        assert_eq!(config.log_filter, "conform::engine=debug");

        env::set_var("CONFORM_JSON", "0");
        env::remove_var("NO_COLOR");
        env::set_var("CONFORM_NO_COLOR", "1");
        let config = Config::from_env();
        assert!(!config.default_json);
        assert!(config.no_color);

        env::remove_var("CONFORM_JSON");
        env::remove_var("CONFORM_NO_COLOR");
        env::remove_var("CONFORM_LOG");
    }

    #[test]
    fn test_truthy_values() {
        for value in ["1", "true", "YES", " on "] {
            assert!(is_truthy(value), "{value}");
        }
        for value in ["0", "false", "", "json"] {
            assert!(!is_truthy(value), "{value}");
        }
    }
}
