//! Domain-specific configuration modules

pub mod logging;
pub mod plugins;
pub mod utils;

use crate::error::ConfigResult;
use crate::validation::Validatable;
use serde::{Deserialize, Serialize};

/// Main host configuration combining all domains
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HostConfig {
    /// Plugin discovery configuration
    #[serde(default)]
    pub plugins: plugins::PluginsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: logging::LoggingConfig,
}

impl HostConfig {
    /// Validate all domain configurations
    pub fn validate_all(&self) -> ConfigResult<()> {
        self.plugins.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}
