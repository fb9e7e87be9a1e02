//! Plugin registry driving discovery, activation and unloading

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use plughost_config::{HostConfig, PluginsConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use uuid::Uuid;

use crate::core::PluginMetadata;
use crate::discovery::{DiscoveredArtifact, DiscoveryConfig, PluginDiscovery};
use crate::error::{PluginError, PluginResult};
use crate::instance::PluginInstance;
use crate::loader::{CompositeModuleLoader, LoadedModule, ModuleLoader};
use crate::storage::PluginConfigStore;
use crate::types::{names_match, validate_plugin_name, PluginState};
use crate::validator::DependencyValidator;

/// Upper bound on the membership preallocation; `capacity` is only a hint
pub const MAX_CAPACITY_HINT: usize = 65_536;

/// Registry settings, usually derived from the host configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Flat directory scanned for module artifacts
    pub plugin_dir: PathBuf,
    /// Artifact extensions, without the leading dot
    pub extensions: Vec<String>,
    /// Initial capacity of the membership list
    pub capacity: usize,
    /// Record a SHA-256 of every discovered artifact
    pub calculate_checksums: bool,
}

impl RegistryConfig {
    /// Default settings rooted at `plugin_dir`
    pub fn new(plugin_dir: impl Into<PathBuf>) -> Self {
        Self {
            plugin_dir: plugin_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_checksums(mut self, enabled: bool) -> Self {
        self.calculate_checksums = enabled;
        self
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::from(&PluginsConfig::default())
    }
}

impl From<&PluginsConfig> for RegistryConfig {
    fn from(config: &PluginsConfig) -> Self {
        Self {
            plugin_dir: config.directory.clone(),
            extensions: config.extensions.clone(),
            capacity: config.capacity,
            calculate_checksums: config.calculate_checksums,
        }
    }
}

/// A member that could not be activated during `load_all`
#[derive(Debug)]
pub struct ActivationFailure {
    pub name: String,
    pub id: Uuid,
    pub error: PluginError,
}

/// An artifact that produced no plugin, or a plugin type that failed to construct
#[derive(Debug)]
pub struct ArtifactFailure {
    pub path: PathBuf,
    pub error: PluginError,
}

/// Outcome of one `load_all` pass
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Artifacts found by the scan
    pub artifacts: Vec<DiscoveredArtifact>,
    /// Number of instances appended by this pass
    pub instantiated: usize,
    /// Names of members activated successfully, in activation order
    pub activated: Vec<String>,
    /// Members whose activation failed
    pub failures: Vec<ActivationFailure>,
    /// Artifacts or plugin types that failed before activation
    pub artifact_failures: Vec<ArtifactFailure>,
}

impl LoadReport {
    /// Whether the pass finished without any failure
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.artifact_failures.is_empty()
    }

    /// First activation failure, if any
    pub fn first_error(&self) -> Option<&PluginError> {
        self.failures.first().map(|failure| &failure.error)
    }
}

/// Serializable snapshot of one member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PluginInfo {
    pub metadata: PluginMetadata,
    pub state: PluginState,
    pub enabled: bool,
    pub source_path: PathBuf,
    pub data_dir: PathBuf,
    pub loaded_at: Option<DateTime<Utc>>,
}

impl From<&PluginInstance> for PluginInfo {
    fn from(instance: &PluginInstance) -> Self {
        Self {
            metadata: instance.metadata().clone(),
            state: instance.state(),
            enabled: instance.is_enabled(),
            source_path: instance.source_path().to_path_buf(),
            data_dir: instance.data_dir().to_path_buf(),
            loaded_at: instance.loaded_at(),
        }
    }
}

/// Registry statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryStats {
    pub total_plugins: usize,
    pub enabled_plugins: usize,
    pub total_loads: u64,
    pub total_unloads: u64,
    pub dependency_failures: u64,
    pub artifact_failures: u64,
    pub instantiation_failures: u64,
}

#[derive(Default)]
struct Counters {
    total_loads: AtomicU64,
    total_unloads: AtomicU64,
    dependency_failures: AtomicU64,
    artifact_failures: AtomicU64,
    instantiation_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

struct RegistryInner {
    config: RegistryConfig,
    loader: Arc<dyn ModuleLoader>,
    discovery: PluginDiscovery,
    plugins: RwLock<Vec<Arc<PluginInstance>>>,
    counters: Counters,
}

/// Non-owning back-reference from an instance to its registry
#[derive(Clone, Default)]
pub struct RegistryHandle {
    inner: Weak<RegistryInner>,
}

impl RegistryHandle {
    /// Handle that never resolves
    pub fn detached() -> Self {
        Self::default()
    }

    /// The registry, if it is still alive
    pub fn upgrade(&self) -> Option<PluginRegistry> {
        self.inner.upgrade().map(|inner| PluginRegistry { inner })
    }
}

impl fmt::Debug for RegistryHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

/// Ordered membership of plugin instances and the lifecycle operations over it
///
/// Cloning is cheap and yields another handle to the same registry. The
/// membership lock is only held for collection access; plugin hooks always
/// run with it released, so hooks may query the registry.
#[derive(Clone)]
pub struct PluginRegistry {
    inner: Arc<RegistryInner>,
}

impl PluginRegistry {
    /// Create a registry using the default static + dynamic module loaders
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_loader(config, Arc::new(CompositeModuleLoader::with_defaults()))
    }

    /// Create a registry with a custom module loader
    pub fn with_loader(config: RegistryConfig, loader: Arc<dyn ModuleLoader>) -> Self {
        let discovery = PluginDiscovery::new(DiscoveryConfig {
            extensions: config.extensions.clone(),
            calculate_checksums: config.calculate_checksums,
        });
        let plugins = RwLock::new(Vec::with_capacity(config.capacity.min(MAX_CAPACITY_HINT)));

        Self {
            inner: Arc::new(RegistryInner {
                config,
                loader,
                discovery,
                plugins,
                counters: Counters::default(),
            }),
        }
    }

    /// Create a registry from the host configuration
    pub fn from_host_config(config: &HostConfig) -> Self {
        Self::new(RegistryConfig::from(&config.plugins))
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.inner.config
    }

    pub fn plugin_dir(&self) -> &Path {
        &self.inner.config.plugin_dir
    }

    /// Non-owning handle to this registry
    pub fn handle(&self) -> RegistryHandle {
        RegistryHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Scan the plugin directory without loading anything
    pub fn discover(&self) -> PluginResult<Vec<DiscoveredArtifact>> {
        self.inner.discovery.scan(self.plugin_dir())
    }

    /// Discover every artifact, then activate every member in insertion order
    ///
    /// A missing plugin directory is created and yields an empty report.
    /// Members from earlier passes are activated again: their `on_loaded`
    /// does not fire twice, but `enable` runs once more.
    pub fn load_all(&self) -> PluginResult<LoadReport> {
        let dir = self.plugin_dir();
        if !dir.exists() {
            std::fs::create_dir_all(dir)?;
            tracing::info!(
                target: "plugin_registry",
                directory = ?dir,
                "Plugin directory did not exist and was created"
            );
            return Ok(LoadReport::default());
        }

        let scan = self.inner.discovery.scan_all(dir)?;
        let artifacts = scan.artifacts;
        tracing::info!(
            target: "plugin_registry",
            directory = ?dir,
            artifacts = artifacts.len(),
            rejected = scan.rejected.len(),
            "Loading plugins"
        );

        let mut report = LoadReport::default();
        for rejected in scan.rejected {
            Counters::bump(&self.inner.counters.artifact_failures);
            report.artifact_failures.push(ArtifactFailure {
                path: rejected.path,
                error: rejected.error,
            });
        }
        for artifact in &artifacts {
            let module = match self.inner.loader.load_module(&artifact.path) {
                Ok(module) => module,
                Err(error) => {
                    Counters::bump(&self.inner.counters.artifact_failures);
                    tracing::warn!(
                        target: "plugin_registry",
                        path = ?artifact.path,
                        error = %error,
                        "Failed to load module artifact"
                    );
                    report.artifact_failures.push(ArtifactFailure {
                        path: artifact.path.clone(),
                        error,
                    });
                    continue;
                }
            };

            let (instances, errors) = self.instantiate_module(&module);
            report.instantiated += instances.len();
            report
                .artifact_failures
                .extend(errors.into_iter().map(|error| ArtifactFailure {
                    path: module.path.clone(),
                    error,
                }));
        }
        report.artifacts = artifacts;

        for plugin in self.plugins() {
            match self.activate(&plugin) {
                Ok(()) => report.activated.push(plugin.name().to_string()),
                Err(error) => {
                    tracing::warn!(
                        target: "plugin_registry",
                        plugin = %plugin.name(),
                        id = %plugin.id(),
                        error = %error,
                        "Plugin activation failed"
                    );
                    report.failures.push(ActivationFailure {
                        name: plugin.name().to_string(),
                        id: plugin.id(),
                        error,
                    });
                }
            }
        }

        tracing::info!(
            target: "plugin_registry",
            activated = report.activated.len(),
            failed = report.failures.len(),
            artifact_failures = report.artifact_failures.len(),
            "Plugin load pass finished"
        );
        Ok(report)
    }

    /// Load a single artifact and activate every plugin it yields
    ///
    /// All instances are appended before any is activated. Every instance is
    /// tried; the first activation error is returned.
    pub fn load_one(&self, path: impl AsRef<Path>) -> PluginResult<Vec<Arc<PluginInstance>>> {
        let path = path.as_ref();
        let module = self.inner.loader.load_module(path).map_err(|e| {
            Counters::bump(&self.inner.counters.artifact_failures);
            e
        })?;

        let (instances, errors) = self.instantiate_module(&module);
        if instances.is_empty() {
            if let Some(error) = errors.into_iter().next() {
                return Err(error);
            }
        }

        let mut first_error = None;
        for instance in &instances {
            if let Err(error) = self.activate(instance) {
                tracing::warn!(
                    target: "plugin_registry",
                    plugin = %instance.name(),
                    error = %error,
                    "Plugin activation failed"
                );
                first_error.get_or_insert(error);
            }
        }

        match first_error {
            Some(error) => Err(error),
            None => Ok(instances),
        }
    }

    /// Unload a member: fire `on_unloaded`, disable, remove, mark unloaded
    ///
    /// Returns `false` without side effects when `plugin` is not a member.
    /// Hook errors are logged and do not prevent removal.
    pub fn unload_one(&self, plugin: &Arc<PluginInstance>) -> bool {
        if !self.contains(plugin) {
            tracing::debug!(
                target: "plugin_registry",
                plugin = %plugin.name(),
                "Ignoring unload of a plugin that is not a member"
            );
            return false;
        }

        if let Err(error) = plugin.fire_unloaded() {
            tracing::warn!(target: "plugin_registry", plugin = %plugin.name(), error = %error, "Unload hook failed");
        }
        if let Err(error) = plugin.disable() {
            tracing::warn!(target: "plugin_registry", plugin = %plugin.name(), error = %error, "Disable during unload failed");
        }

        let removed = {
            let mut plugins = self.inner.plugins.write();
            match plugins.iter().position(|p| Arc::ptr_eq(p, plugin)) {
                Some(index) => {
                    plugins.remove(index);
                    true
                }
                None => false,
            }
        };

        if removed {
            plugin.mark_unloaded();
            Counters::bump(&self.inner.counters.total_unloads);
            tracing::info!(
                target: "plugin_registry",
                plugin = %plugin.name(),
                id = %plugin.id(),
                "Plugin unloaded"
            );
        }
        removed
    }

    /// Unload every current member
    pub fn unload_all(&self) {
        for plugin in self.plugins() {
            self.unload_one(&plugin);
        }
    }

    /// Unload every member, then run a fresh `load_all`
    pub fn reload_all(&self) -> PluginResult<LoadReport> {
        self.unload_all();
        self.load_all()
    }

    /// First member whose name matches, ignoring case
    pub fn lookup_by_name(&self, name: &str) -> Option<Arc<PluginInstance>> {
        self.inner
            .plugins
            .read()
            .iter()
            .find(|p| names_match(p.name(), name))
            .cloned()
    }

    pub fn lookup_by_id(&self, id: &Uuid) -> Option<Arc<PluginInstance>> {
        self.inner
            .plugins
            .read()
            .iter()
            .find(|p| p.id() == *id)
            .cloned()
    }

    /// Id lookup from text; unparsable input finds nothing
    pub fn lookup_by_id_str(&self, id: &str) -> Option<Arc<PluginInstance>> {
        Uuid::parse_str(id.trim())
            .ok()
            .and_then(|id| self.lookup_by_id(&id))
    }

    /// Resolve `value` as an id or a name; an id match wins
    pub fn lookup(&self, value: &str) -> Option<Arc<PluginInstance>> {
        self.lookup_by_id_str(value)
            .or_else(|| self.lookup_by_name(value))
    }

    /// Snapshot of the membership in insertion order
    pub fn plugins(&self) -> Vec<Arc<PluginInstance>> {
        self.inner.plugins.read().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.plugins.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.plugins.read().is_empty()
    }

    /// Membership by instance identity
    pub fn contains(&self, plugin: &Arc<PluginInstance>) -> bool {
        self.inner
            .plugins
            .read()
            .iter()
            .any(|p| Arc::ptr_eq(p, plugin))
    }

    pub fn plugin_infos(&self) -> Vec<PluginInfo> {
        self.plugins()
            .iter()
            .map(|p| PluginInfo::from(p.as_ref()))
            .collect()
    }

    pub fn stats(&self) -> RegistryStats {
        let plugins = self.inner.plugins.read();
        let counters = &self.inner.counters;

        RegistryStats {
            total_plugins: plugins.len(),
            enabled_plugins: plugins.iter().filter(|p| p.is_enabled()).count(),
            total_loads: counters.total_loads.load(Ordering::Relaxed),
            total_unloads: counters.total_unloads.load(Ordering::Relaxed),
            dependency_failures: counters.dependency_failures.load(Ordering::Relaxed),
            artifact_failures: counters.artifact_failures.load(Ordering::Relaxed),
            instantiation_failures: counters.instantiation_failures.load(Ordering::Relaxed),
        }
    }

    /// Data directory of a plugin: `<artifact dir>/<plugin name>`
    pub fn data_dir_for(&self, plugin: &PluginInstance) -> PathBuf {
        plugin.data_dir().to_path_buf()
    }

    /// Configuration file store of a plugin
    pub fn config_store(&self, plugin: &PluginInstance) -> PluginConfigStore {
        PluginConfigStore::new(plugin.data_dir(), plugin.name())
    }

    /// Construct every plugin type of a module and append the results
    fn instantiate_module(
        &self,
        module: &LoadedModule,
    ) -> (Vec<Arc<PluginInstance>>, Vec<PluginError>) {
        let mut instances = Vec::new();
        let mut errors = Vec::new();

        for result in self.inner.discovery.instantiate(module) {
            let result = result.and_then(|plugin| match validate_plugin_name(plugin.name()) {
                Ok(()) => Ok(plugin),
                Err(reason) => Err(PluginError::InstantiationFailed {
                    source_path: module.path.clone(),
                    reason: format!("invalid plugin name {:?}: {}", plugin.name(), reason),
                }),
            });
            match result {
                Ok(plugin) => instances.push(Arc::new(PluginInstance::new(
                    plugin,
                    &module.path,
                    module.library.clone(),
                    self.handle(),
                ))),
                Err(error) => {
                    Counters::bump(&self.inner.counters.instantiation_failures);
                    tracing::warn!(
                        target: "plugin_registry",
                        path = ?module.path,
                        error = %error,
                        "Plugin type could not be instantiated"
                    );
                    errors.push(error);
                }
            }
        }

        for instance in &instances {
            tracing::debug!(
                target: "plugin_registry",
                plugin = %instance.name(),
                id = %instance.id(),
                version = %instance.version(),
                source = ?instance.source_path(),
                "Plugin instantiated"
            );
        }
        self.inner.plugins.write().extend(instances.iter().cloned());

        (instances, errors)
    }

    /// Validate dependencies, prepare the data directory, fire `loaded` once, enable
    fn activate(&self, plugin: &Arc<PluginInstance>) -> PluginResult<()> {
        if let Err(error) = DependencyValidator::validate(plugin.metadata(), self) {
            Counters::bump(&self.inner.counters.dependency_failures);
            return Err(error);
        }

        std::fs::create_dir_all(plugin.data_dir())?;

        if plugin.fire_loaded()? {
            Counters::bump(&self.inner.counters.total_loads);
            tracing::info!(
                target: "plugin_registry",
                plugin = %plugin.name(),
                id = %plugin.id(),
                version = %plugin.version(),
                "Plugin loaded"
            );
        }

        plugin.enable()
    }
}

impl fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistry")
            .field("plugin_dir", &self.inner.config.plugin_dir)
            .field("loader", &self.inner.loader.loader_type())
            .field("plugins", &self.len())
            .finish()
    }
}
