//! Core plugin trait, metadata and context definitions

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::{PluginError, PluginResult};
use crate::registry::{PluginRegistry, RegistryHandle};
use crate::storage::PluginConfigStore;
use crate::types::{default_version, parse_version};

/// Plugin metadata describing identity and requirements
///
/// Populated by the plugin author when the plugin is constructed and treated
/// as immutable once the instance is bound to a registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Plugin identifier; the nil UUID unless the author binds one
    #[serde(default)]
    pub id: Uuid,
    /// Plugin display name, also the lookup key
    pub name: String,
    /// Plugin version
    #[serde(default = "default_version")]
    pub version: semver::Version,
    /// Plugin description
    #[serde(default)]
    pub description: String,
    /// Plugin author
    #[serde(default)]
    pub author: String,
    /// Names of plugins that must be present before this one activates
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl PluginMetadata {
    /// Create new plugin metadata with default version `0.1.0` and nil id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::nil(),
            name: name.into(),
            version: default_version(),
            description: String::new(),
            author: String::new(),
            dependencies: Vec::new(),
        }
    }

    /// Set the plugin version
    pub fn with_version(mut self, version: semver::Version) -> Self {
        self.version = version;
        self
    }

    /// Set the plugin version from a string such as `"1.2"` or `"1.2.3"`
    pub fn with_version_str(self, version: &str) -> PluginResult<Self> {
        Ok(self.with_version(parse_version(version)?))
    }

    /// Set the plugin description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Set the plugin author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Add a dependency to this plugin
    pub fn with_dependency(mut self, name: impl Into<String>) -> Self {
        self.dependencies.push(name.into());
        self
    }

    /// Add several dependencies, keeping declaration order
    pub fn with_dependencies<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependencies.extend(names.into_iter().map(Into::into));
        self
    }

    /// Bind a stable identifier
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Bind a freshly generated identifier
    pub fn with_random_id(self) -> Self {
        self.with_id(Uuid::new_v4())
    }

    /// Whether this plugin declares any dependency
    pub fn requires_dependencies(&self) -> bool {
        !self.dependencies.is_empty()
    }
}

/// Context handed to the `on_loaded` and `on_unloaded` hooks
#[derive(Debug, Clone)]
pub struct PluginContext {
    plugin_name: String,
    source_path: PathBuf,
    data_dir: PathBuf,
    registry: RegistryHandle,
}

impl PluginContext {
    /// Build a context by hand, e.g. to exercise hooks outside a registry
    pub fn new(
        plugin_name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        data_dir: impl Into<PathBuf>,
        registry: RegistryHandle,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            source_path: source_path.into(),
            data_dir: data_dir.into(),
            registry,
        }
    }

    /// Name of the plugin this context belongs to
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Module artifact the plugin was instantiated from
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Private data directory of the plugin
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Registry that loaded the plugin, if it is still alive
    pub fn registry(&self) -> Option<PluginRegistry> {
        self.registry.upgrade()
    }

    /// Non-owning handle to the registry; safe to keep inside the plugin
    pub fn registry_handle(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Configuration file store rooted at the plugin's data directory
    pub fn config_store(&self) -> PluginConfigStore {
        PluginConfigStore::new(&self.data_dir, &self.plugin_name)
    }
}

/// Capability surface every loadable plugin type exposes
///
/// Only `on_loaded` must be implemented; the other hooks default to no-ops.
/// Hooks run synchronously on the thread driving the registry. Calling a
/// lifecycle operation on the same instance from inside one of its own
/// hooks is not supported.
pub trait Plugin: Send {
    /// Get plugin metadata
    fn metadata(&self) -> &PluginMetadata;

    /// Called once when the plugin is activated for the first time
    fn on_loaded(&mut self, context: &PluginContext) -> PluginResult<()>;

    /// Called before the plugin is disabled and removed from the registry
    fn on_unloaded(&mut self, context: &PluginContext) -> PluginResult<()> {
        let _ = context;
        Ok(())
    }

    /// Called before the enabled flag is set
    fn on_enabled(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Called after the enabled flag is cleared
    fn on_disabled(&mut self) -> PluginResult<()> {
        Ok(())
    }

    /// Called at the start of every toggle, whichever way it goes
    fn on_toggled(&mut self) -> PluginResult<()> {
        Ok(())
    }

    fn name(&self) -> &str {
        &self.metadata().name
    }

    fn version(&self) -> &semver::Version {
        &self.metadata().version
    }

    fn description(&self) -> &str {
        &self.metadata().description
    }

    fn author(&self) -> &str {
        &self.metadata().author
    }

    fn id(&self) -> Uuid {
        self.metadata().id
    }

    fn dependencies(&self) -> &[String] {
        &self.metadata().dependencies
    }

    /// Convert to Any for downcasting
    fn as_any(&self) -> &dyn Any;

    /// Convert to mutable Any for downcasting
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Zero-argument construction path for one plugin type
pub type PluginFactory = fn() -> PluginResult<Box<dyn Plugin>>;

/// Factory for any `Default` plugin type
pub fn factory_for<T>() -> PluginResult<Box<dyn Plugin>>
where
    T: Plugin + Default + 'static,
{
    Ok(Box::new(T::default()))
}

/// Entry point exported by dynamically loaded modules as `PLUGHOST_MODULE`
///
/// Host and module must be built with the same compiler; the declaration
/// only guards the plugin API version.
#[derive(Debug, Clone, Copy)]
pub struct ModuleDeclaration {
    /// `PLUGIN_API_VERSION` of the crate the module was built against
    pub api_version: &'static str,
    /// Factories for every plugin type the module exports, in order
    pub factories: fn() -> Vec<PluginFactory>,
}

/// Symbol name of the module entry point
pub const MODULE_DECLARATION_SYMBOL: &[u8] = b"PLUGHOST_MODULE\0";

/// Check a module's API version against this host
///
/// Same major version is required; while the major version is 0 the minor
/// version must match too.
pub fn is_api_compatible(api_version: &str) -> PluginResult<bool> {
    let module = semver::Version::parse(api_version)
        .map_err(|e| PluginError::generic(format!("Invalid API version: {}", e)))?;
    let host = semver::Version::parse(crate::PLUGIN_API_VERSION)
        .map_err(|e| PluginError::generic(format!("Invalid host API version: {}", e)))?;

    if module.major != host.major {
        return Ok(false);
    }
    Ok(host.major > 0 || module.minor == host.minor)
}
