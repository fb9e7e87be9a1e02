//! Plugin discovery configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigResult;
use crate::validation::{validate_extension, validate_required_string, Validatable};

/// Largest accepted `capacity`
pub const MAX_PLUGIN_CAPACITY: usize = 1_000_000;

/// Where plugins live and which artifacts are considered during discovery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PluginsConfig {
    /// Plugin root directory, scanned non-recursively
    #[serde(default = "crate::domains::utils::default_plugin_dir")]
    pub directory: PathBuf,

    /// Artifact extensions (without the leading dot)
    #[serde(default = "crate::domains::utils::default_extensions")]
    pub extensions: Vec<String>,

    /// Pre-allocated registry capacity; 0 disables pre-allocation
    #[serde(default = "crate::domains::utils::default_capacity")]
    pub capacity: usize,

    /// Record a SHA-256 of each artifact found during discovery
    #[serde(default = "crate::domains::utils::default_false")]
    pub calculate_checksums: bool,
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: crate::domains::utils::default_plugin_dir(),
            extensions: crate::domains::utils::default_extensions(),
            capacity: crate::domains::utils::default_capacity(),
            calculate_checksums: false,
        }
    }
}

impl Validatable for PluginsConfig {
    fn validate(&self) -> ConfigResult<()> {
        validate_required_string(
            &self.directory.to_string_lossy(),
            "directory",
            self.domain_name(),
        )?;

        if self.extensions.is_empty() {
            return Err(self.validation_error("At least one artifact extension must be configured"));
        }

        for ext in &self.extensions {
            validate_extension(ext, self.domain_name())?;
        }

        if self.capacity > MAX_PLUGIN_CAPACITY {
            return Err(self.validation_error(format!(
                "capacity {} exceeds the maximum of {}",
                self.capacity, MAX_PLUGIN_CAPACITY
            )));
        }

        Ok(())
    }

    fn domain_name(&self) -> &'static str {
        "plugins"
    }
}
