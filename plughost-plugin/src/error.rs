//! Plugin system error types

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Plugin system result type
pub type PluginResult<T> = Result<T, PluginError>;

/// Plugin system errors
#[derive(Error, Debug)]
pub enum PluginError {
    /// A declared dependency is not present in the registry
    #[error("Plugin \"{plugin}\" (ID: {id}) requires \"{dependency}\", which could not be found or was not loaded")]
    DependencyNotFound {
        plugin: String,
        id: Uuid,
        dependency: String,
    },

    /// Plugin construction failed
    #[error("Plugin instantiation failed for {}: {reason}", .source_path.display())]
    InstantiationFailed {
        source_path: PathBuf,
        reason: String,
    },

    /// A module artifact could not be turned into plugin factories
    #[error("Module {} could not be loaded: {reason}", .path.display())]
    ModuleLoadFailed {
        path: PathBuf,
        reason: String,
    },

    /// Artifact has no statically registered module
    #[error("No static module registered for artifact {}", .path.display())]
    ModuleNotRegistered {
        path: PathBuf,
    },

    /// Module API version incompatible
    #[error("Module {} API version {api_version} is incompatible with host version {host_version}", .path.display())]
    ApiVersionIncompatible {
        path: PathBuf,
        api_version: String,
        host_version: String,
    },

    /// A lifecycle hook returned an error
    #[error("Hook '{hook}' of plugin '{plugin}' failed: {reason}")]
    HookFailed {
        plugin: String,
        hook: &'static str,
        reason: String,
    },

    /// Lifecycle operation not valid in the instance's current state
    #[error("Plugin '{plugin}' cannot {operation} while {state}")]
    InvalidState {
        plugin: String,
        operation: &'static str,
        state: crate::types::PluginState,
    },

    /// The registry that owned an instance has been dropped
    #[error("Registry for plugin '{plugin}' no longer exists")]
    RegistryGone {
        plugin: String,
    },

    /// Dynamic loading error
    #[error("Dynamic loading error: {0}")]
    DynamicLoadingError(#[from] libloading::Error),

    /// Plugin file not found
    #[error("Plugin file not found: {path}")]
    PluginFileNotFound {
        path: String,
    },

    /// Invalid version string in plugin metadata
    #[error("Invalid plugin version '{version}': {reason}")]
    InvalidVersion {
        version: String,
        reason: String,
    },

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// YAML serialization error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// XML serialization error
    #[error("XML serialization error: {0}")]
    XmlSerialize(String),

    /// XML deserialization error
    #[error("XML deserialization error: {0}")]
    XmlDeserialize(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(#[from] plughost_config::ConfigError),

    /// Generic error
    #[error("Plugin system error: {0}")]
    Generic(String),
}

impl PluginError {
    /// Create a new generic plugin error
    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic(message.into())
    }

    /// Create a new hook failure
    pub fn hook_failed(plugin: impl Into<String>, hook: &'static str, reason: impl ToString) -> Self {
        Self::HookFailed {
            plugin: plugin.into(),
            hook,
            reason: reason.to_string(),
        }
    }

    /// Create a new module load failure
    pub fn module_load_failed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::ModuleLoadFailed {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Whether this is a missing-dependency condition
    pub fn is_dependency_not_found(&self) -> bool {
        matches!(self, Self::DependencyNotFound { .. })
    }
}
