//! Configuration loading and environment variable handling

use crate::domains::{logging::LoggingConfig, plugins::PluginsConfig, HostConfig};
use crate::error::{ConfigError, ConfigResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Configuration loader with environment variable support
pub struct ConfigLoader {
    /// Environment variable prefix
    prefix: String,
}

impl ConfigLoader {
    /// Create a new config loader with default prefix
    pub fn new() -> Self {
        Self {
            prefix: "PLUGHOST".to_string(),
        }
    }

    /// Create a new config loader with custom prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Load configuration from a YAML file with environment overrides
    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<HostConfig> {
        let content = std::fs::read_to_string(path)?;
        self.from_yaml_str(&content)
    }

    /// Load configuration from YAML text with environment overrides
    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<HostConfig> {
        // An empty document deserializes to unit, not to a mapping
        let mut config: HostConfig = if content.trim().is_empty() {
            HostConfig::default()
        } else {
            serde_yaml::from_str(content)?
        };

        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env(&self) -> ConfigResult<HostConfig> {
        let mut config = HostConfig::default();
        self.apply_env_overrides(&mut config)?;
        config.validate_all()?;
        Ok(config)
    }

    /// Load configuration with fallback chain
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<HostConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_overrides(&self, config: &mut HostConfig) -> ConfigResult<()> {
        self.apply_plugins_overrides(&mut config.plugins)?;
        self.apply_logging_overrides(&mut config.logging)?;
        Ok(())
    }

    /// Apply plugin discovery overrides
    fn apply_plugins_overrides(&self, config: &mut PluginsConfig) -> ConfigResult<()> {
        if let Ok(dir) = self.get_env_var("PLUGIN_DIR") {
            config.directory = PathBuf::from(dir);
        }

        if let Ok(extensions) = self.get_env_var("PLUGIN_EXTENSIONS") {
            config.extensions = crate::domains::utils::split_list(&extensions);
        }

        if let Ok(capacity) = self.get_env_var("PLUGIN_CAPACITY") {
            config.capacity = capacity
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid PLUGIN_CAPACITY: {}", e)))?;
        }

        if let Ok(checksums) = self.get_env_var("PLUGIN_CHECKSUMS") {
            config.calculate_checksums = checksums
                .parse()
                .map_err(|e| ConfigError::EnvError(format!("Invalid PLUGIN_CHECKSUMS: {}", e)))?;
        }

        Ok(())
    }

    /// Apply logging config overrides
    fn apply_logging_overrides(&self, config: &mut LoggingConfig) -> ConfigResult<()> {
        if let Ok(log_level) = self.get_env_var("LOG_LEVEL") {
            config.level = crate::domains::logging::LogLevel::from_str(&log_level)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_LEVEL: {}", log_level)))?;
        }

        if let Ok(format) = self.get_env_var("LOG_FORMAT") {
            config.format = crate::domains::logging::LogFormat::from_str(&format)
                .map_err(|_| ConfigError::EnvError(format!("Invalid LOG_FORMAT: {}", format)))?;
        }

        Ok(())
    }

    /// Get environment variable with prefix
    fn get_env_var(&self, name: &str) -> Result<String, std::env::VarError> {
        std::env::var(format!("{}_{}", self.prefix, name))
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}
