//! Peerchat CLI Configuration Management
//!
//! Loads the application configuration from a TOML file. Every section is
//! optional; missing fields fall back to their defaults, and the merged
//! result is validated before use.

use std::path::Path;

use peerchat_core::{ConfigError, SessionConfig};
use serde::{Deserialize, Serialize};

use crate::loopback::LoopbackConfig;

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the peerchat CLI application
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session layer tunables
    pub session: SessionConfig,
    /// Simulated network for the loopback transport
    pub loopback: LoopbackConfig,
    /// Terminal presentation options
    pub cli: CliConfig,
}

/// CLI-specific configuration options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Prompt shown before each input line
    pub prompt: String,
    /// Messages shown when a conversation is opened
    pub max_recent_messages: usize,
    /// Print every state change notification, not only the notable ones
    pub show_all_changes: bool,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            prompt: "peerchat> ".to_string(),
            max_recent_messages: 10,
            show_all_changes: false,
        }
    }
}

// ----------------------------------------------------------------------------
// Configuration Loading Logic
// ----------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            ConfigError::Loading(format!("Failed to read {}: {}", path.as_ref().display(), e))
        })?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(contents)
            .map_err(|e| ConfigError::Loading(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides
    pub fn with_local_name(mut self, name: impl Into<String>) -> Self {
        self.session.local_name = name.into();
        self
    }

    /// Validate the configuration for consistency and correctness
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.session.validate()?;
        self.loopback.validate()?;
        if self.cli.max_recent_messages == 0 {
            return Err(ConfigError::Invalid {
                field: "cli.max_recent_messages",
                reason: "cannot be zero".to_string(),
            });
        }
        Ok(())
    }

    /// Create example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&AppConfig::default())
            .unwrap_or_else(|_| "# Failed to generate example config".to_string())
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = AppConfig::default();
        assert_eq!(config.cli.prompt, "peerchat> ");
        assert_eq!(config.session.discovery_interval_secs, 5);
        assert!(!config.loopback.peers.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [session]
            local_name = "morgan"

            [loopback]
            peers = ["alice"]
            "#,
        )
        .unwrap();

        assert_eq!(config.session.local_name, "morgan");
        assert_eq!(config.session.cleanup_interval_secs, 30);
        assert_eq!(config.loopback.peers, vec!["alice".to_string()]);
        assert_eq!(config.cli, CliConfig::default());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let result = AppConfig::from_toml(
            r#"
            [session]
            cleanup_interval_secs = 0
            "#,
        );
        assert!(matches!(result, Err(ConfigError::Invalid { field: "cleanup_interval_secs", .. })));

        let result = AppConfig::from_toml("[cli]\nmax_recent_messages = 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));

        assert!(matches!(AppConfig::from_toml("session = 3"), Err(ConfigError::Loading(_))));
    }

    #[test]
    fn test_load_from_missing_file() {
        let result = AppConfig::load_from_file("/nonexistent/peerchat.toml");
        assert!(matches!(result, Err(ConfigError::Loading(_))));
    }

    #[test]
    fn test_example_config_round_trips() {
        let example = AppConfig::example_config();
        assert!(example.contains("[session]"));
        assert!(example.contains("[loopback]"));
        assert!(example.contains("[cli]"));
        assert_eq!(AppConfig::from_toml(&example).unwrap(), AppConfig::default());
    }
}
