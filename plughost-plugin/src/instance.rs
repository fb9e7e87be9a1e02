//! Live plugin instances and their per-instance lifecycle operations

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use uuid::Uuid;

use crate::core::{Plugin, PluginContext, PluginMetadata};
use crate::error::{PluginError, PluginResult};
use crate::registry::RegistryHandle;
use crate::types::PluginState;

#[derive(Debug)]
struct Lifecycle {
    state: PluginState,
    enabled: bool,
    loaded_at: Option<DateTime<Utc>>,
}

/// A plugin bound to its source artifact and to the registry that loaded it
///
/// The plugin object and the lifecycle flags sit behind separate locks, so a
/// hook may read `state()`/`is_enabled()` of any instance, its own included.
pub struct PluginInstance {
    metadata: PluginMetadata,
    source_path: PathBuf,
    data_dir: PathBuf,
    registry: RegistryHandle,
    lifecycle: RwLock<Lifecycle>,
    plugin: Mutex<Box<dyn Plugin>>,
    // Declared after `plugin` so the library outlives the code it hosts
    _library: Option<Arc<libloading::Library>>,
}

impl PluginInstance {
    pub(crate) fn new(
        plugin: Box<dyn Plugin>,
        source_path: impl Into<PathBuf>,
        library: Option<Arc<libloading::Library>>,
        registry: RegistryHandle,
    ) -> Self {
        let metadata = plugin.metadata().clone();
        let source_path = source_path.into();
        let data_dir = source_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join(&metadata.name);

        Self {
            metadata,
            source_path,
            data_dir,
            registry,
            lifecycle: RwLock::new(Lifecycle {
                state: PluginState::Instantiated,
                enabled: false,
                loaded_at: None,
            }),
            plugin: Mutex::new(plugin),
            _library: library,
        }
    }

    /// Descriptor bound at instantiation
    pub fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn id(&self) -> Uuid {
        self.metadata.id
    }

    pub fn version(&self) -> &semver::Version {
        &self.metadata.version
    }

    pub fn dependencies(&self) -> &[String] {
        &self.metadata.dependencies
    }

    /// Module artifact this instance was created from
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Private data directory: `<artifact dir>/<plugin name>`
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Current lifecycle state
    pub fn state(&self) -> PluginState {
        self.lifecycle.read().state
    }

    pub fn is_enabled(&self) -> bool {
        self.lifecycle.read().enabled
    }

    /// When the `loaded` transition fired
    pub fn loaded_at(&self) -> Option<DateTime<Utc>> {
        self.lifecycle.read().loaded_at
    }

    /// Context passed to `on_loaded` / `on_unloaded`
    pub fn context(&self) -> PluginContext {
        PluginContext::new(
            &self.metadata.name,
            &self.source_path,
            &self.data_dir,
            self.registry.clone(),
        )
    }

    /// Run `f` against the plugin object, e.g. to downcast through `as_any`
    pub fn with_plugin<R>(&self, f: impl FnOnce(&mut dyn Plugin) -> R) -> R {
        let mut plugin = self.plugin.lock();
        f(plugin.as_mut())
    }

    /// Invoke `on_enabled`, then mark the instance enabled
    ///
    /// Not idempotent: a second call invokes the hook again.
    pub fn enable(&self) -> PluginResult<()> {
        self.ensure_state("enable", |state| state.is_active())?;

        self.plugin
            .lock()
            .on_enabled()
            .map_err(|e| PluginError::hook_failed(self.name(), "on_enabled", e))?;

        let mut lifecycle = self.lifecycle.write();
        lifecycle.enabled = true;
        lifecycle.state = PluginState::Enabled;
        drop(lifecycle);

        tracing::debug!(target: "plugin_instance", plugin = %self.name(), "Plugin enabled");
        Ok(())
    }

    /// Mark the instance disabled, then invoke `on_disabled`
    ///
    /// The hook observes the already-cleared flag. An instance that never
    /// loaded stays `Instantiated`.
    pub fn disable(&self) -> PluginResult<()> {
        self.ensure_state("disable", |state| state != PluginState::Unloaded)?;

        {
            let mut lifecycle = self.lifecycle.write();
            lifecycle.enabled = false;
            if lifecycle.state.is_active() {
                lifecycle.state = PluginState::Disabled;
            }
        }

        tracing::debug!(target: "plugin_instance", plugin = %self.name(), "Plugin disabled");

        self.plugin
            .lock()
            .on_disabled()
            .map_err(|e| PluginError::hook_failed(self.name(), "on_disabled", e))
    }

    /// Invoke `on_toggled`, then flip between enabled and disabled
    pub fn toggle(&self) -> PluginResult<()> {
        self.ensure_state("toggle", |state| state.is_active())?;

        self.plugin
            .lock()
            .on_toggled()
            .map_err(|e| PluginError::hook_failed(self.name(), "on_toggled", e))?;

        if self.is_enabled() {
            self.disable()
        } else {
            self.enable()
        }
    }

    /// Unload this instance and load its artifact again through the registry
    ///
    /// Returns the instances created from the artifact by the fresh load.
    pub fn reload(self: &Arc<Self>) -> PluginResult<Vec<Arc<PluginInstance>>> {
        let registry = self.registry.upgrade().ok_or_else(|| PluginError::RegistryGone {
            plugin: self.name().to_string(),
        })?;

        tracing::info!(
            target: "plugin_instance",
            plugin = %self.name(),
            source = ?self.source_path,
            "Reloading plugin"
        );

        registry.unload_one(self);
        registry.load_one(&self.source_path)
    }

    /// Fire `on_loaded` if this instance has never been loaded
    ///
    /// Returns whether the hook ran.
    pub(crate) fn fire_loaded(&self) -> PluginResult<bool> {
        if self.state() != PluginState::Instantiated {
            return Ok(false);
        }

        let context = self.context();
        self.plugin
            .lock()
            .on_loaded(&context)
            .map_err(|e| PluginError::hook_failed(self.name(), "on_loaded", e))?;

        let mut lifecycle = self.lifecycle.write();
        lifecycle.state = PluginState::Loaded;
        lifecycle.loaded_at = Some(Utc::now());
        Ok(true)
    }

    pub(crate) fn fire_unloaded(&self) -> PluginResult<()> {
        let context = self.context();
        self.plugin
            .lock()
            .on_unloaded(&context)
            .map_err(|e| PluginError::hook_failed(self.name(), "on_unloaded", e))
    }

    pub(crate) fn mark_unloaded(&self) {
        let mut lifecycle = self.lifecycle.write();
        lifecycle.enabled = false;
        lifecycle.state = PluginState::Unloaded;
    }

    fn ensure_state(
        &self,
        operation: &'static str,
        allowed: impl Fn(PluginState) -> bool,
    ) -> PluginResult<()> {
        let state = self.state();
        if allowed(state) {
            Ok(())
        } else {
            Err(PluginError::InvalidState {
                plugin: self.name().to_string(),
                operation,
                state,
            })
        }
    }
}

impl fmt::Debug for PluginInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginInstance")
            .field("name", &self.metadata.name)
            .field("id", &self.metadata.id)
            .field("version", &self.metadata.version.to_string())
            .field("source_path", &self.source_path)
            .field("state", &self.state())
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
