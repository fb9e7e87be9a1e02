//! Module loading strategies for static and dynamic plugin modules

use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::core::{is_api_compatible, ModuleDeclaration, PluginFactory, MODULE_DECLARATION_SYMBOL};
use crate::error::{PluginError, PluginResult};

/// A module artifact resolved into its plugin factories
#[derive(Clone)]
pub struct LoadedModule {
    /// Artifact the module came from
    pub path: PathBuf,
    /// Factories in export order
    pub factories: Vec<PluginFactory>,
    /// Backing shared library, kept alive by every instance it produces
    pub library: Option<Arc<libloading::Library>>,
}

impl LoadedModule {
    /// Create a module with no backing library
    pub fn new(path: impl Into<PathBuf>, factories: Vec<PluginFactory>) -> Self {
        Self {
            path: path.into(),
            factories,
            library: None,
        }
    }
}

impl std::fmt::Debug for LoadedModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedModule")
            .field("path", &self.path)
            .field("factories", &self.factories.len())
            .field("dynamic", &self.library.is_some())
            .finish()
    }
}

/// Module loader trait for different loading strategies
pub trait ModuleLoader: Send + Sync {
    /// Resolve the artifact at `path` into plugin factories
    fn load_module(&self, path: &Path) -> PluginResult<LoadedModule>;

    /// Check if the loader can handle the given artifact
    fn can_load(&self, path: &Path) -> bool;

    /// Get loader name/type
    fn loader_type(&self) -> &'static str;
}

/// A module compiled into the host binary, collected through `inventory`
pub struct StaticModule {
    /// Artifact file stem the module answers to
    pub stem: &'static str,
    /// Factories in export order
    pub factories: &'static [PluginFactory],
}

impl StaticModule {
    pub const fn new(stem: &'static str, factories: &'static [PluginFactory]) -> Self {
        Self { stem, factories }
    }
}

inventory::collect!(StaticModule);

/// Loader for modules compiled into the binary
///
/// An artifact on disk selects a static module by its file stem, so a plugin
/// directory can still drive which built-in modules are activated.
pub struct StaticModuleLoader {
    modules: HashMap<String, Vec<PluginFactory>>,
}

impl StaticModuleLoader {
    /// Create a new static module loader
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Register a module under an artifact file stem
    pub fn register_module(&mut self, stem: impl Into<String>, factories: Vec<PluginFactory>) {
        let stem = stem.into();
        if self.modules.insert(stem.clone(), factories).is_some() {
            tracing::warn!(
                target: "plugin_loader",
                stem = %stem,
                "Static module registered twice, keeping the latest"
            );
        }
    }

    /// Builder form of [`register_module`](Self::register_module)
    pub fn with_module(mut self, stem: impl Into<String>, factories: Vec<PluginFactory>) -> Self {
        self.register_module(stem, factories);
        self
    }

    /// Collect every module submitted with `submit_module!`
    pub fn discover_static_modules() -> Self {
        let mut loader = Self::new();
        for module in inventory::iter::<StaticModule> {
            loader.register_module(module.stem, module.factories.to_vec());
        }

        tracing::debug!(
            target: "plugin_loader",
            count = loader.modules.len(),
            "Collected static plugin modules"
        );
        loader
    }

    /// Registered stems
    pub fn stems(&self) -> Vec<&str> {
        let mut stems: Vec<&str> = self.modules.keys().map(String::as_str).collect();
        stems.sort_unstable();
        stems
    }

    fn stem_of(path: &Path) -> Option<&str> {
        path.file_stem().and_then(|s| s.to_str())
    }
}

impl Default for StaticModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn load_module(&self, path: &Path) -> PluginResult<LoadedModule> {
        let factories = Self::stem_of(path)
            .and_then(|stem| self.modules.get(stem))
            .ok_or_else(|| PluginError::ModuleNotRegistered {
                path: path.to_path_buf(),
            })?;

        Ok(LoadedModule::new(path, factories.clone()))
    }

    fn can_load(&self, path: &Path) -> bool {
        Self::stem_of(path).is_some_and(|stem| self.modules.contains_key(stem))
    }

    fn loader_type(&self) -> &'static str {
        "static"
    }
}

/// Loader for modules built as shared libraries exporting `PLUGHOST_MODULE`
pub struct DynamicModuleLoader {
    /// Libraries opened so far, by canonical path
    libraries: Mutex<HashMap<PathBuf, Arc<libloading::Library>>>,
}

impl DynamicModuleLoader {
    /// Create a new dynamic module loader
    pub fn new() -> Self {
        Self {
            libraries: Mutex::new(HashMap::new()),
        }
    }

    /// Number of libraries currently held open by this loader
    pub fn open_libraries(&self) -> usize {
        self.libraries.lock().len()
    }

    fn open_library(&self, path: &Path) -> PluginResult<Arc<libloading::Library>> {
        let key = path.canonicalize()?;
        let mut libraries = self.libraries.lock();
        if let Some(library) = libraries.get(&key) {
            return Ok(library.clone());
        }

        // SAFETY: loading a library runs its initialisers; modules in the
        // plugin directory are trusted code by contract.
        let library = Arc::new(unsafe { libloading::Library::new(&key)? });
        libraries.insert(key, library.clone());
        Ok(library)
    }
}

impl Default for DynamicModuleLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ModuleLoader for DynamicModuleLoader {
    fn load_module(&self, path: &Path) -> PluginResult<LoadedModule> {
        if !path.exists() {
            return Err(PluginError::PluginFileNotFound {
                path: path.to_string_lossy().to_string(),
            });
        }

        let library = self.open_library(path)?;

        // SAFETY: the symbol is the `ModuleDeclaration` static emitted by
        // `export_plugins!`, built against the same plugin API.
        let declaration: ModuleDeclaration = unsafe {
            let symbol = library.get::<*const ModuleDeclaration>(MODULE_DECLARATION_SYMBOL)?;
            (*symbol).read()
        };

        if !is_api_compatible(declaration.api_version)? {
            return Err(PluginError::ApiVersionIncompatible {
                path: path.to_path_buf(),
                api_version: declaration.api_version.to_string(),
                host_version: crate::PLUGIN_API_VERSION.to_string(),
            });
        }

        let factories = (declaration.factories)();
        tracing::debug!(
            target: "plugin_loader",
            path = ?path,
            factories = factories.len(),
            "Dynamic module loaded"
        );

        Ok(LoadedModule {
            path: path.to_path_buf(),
            factories,
            library: Some(library),
        })
    }

    fn can_load(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| matches!(ext.to_lowercase().as_str(), "so" | "dll" | "dylib"))
    }

    fn loader_type(&self) -> &'static str {
        "dynamic"
    }
}

/// Composite module loader that tries multiple loading strategies
pub struct CompositeModuleLoader {
    loaders: Vec<Box<dyn ModuleLoader>>,
}

impl CompositeModuleLoader {
    /// Create a new composite module loader
    pub fn new() -> Self {
        Self {
            loaders: Vec::new(),
        }
    }

    /// Add a module loader
    pub fn add_loader(&mut self, loader: Box<dyn ModuleLoader>) {
        self.loaders.push(loader);
    }

    /// Create with default loaders
    pub fn with_defaults() -> Self {
        let mut loader = Self::new();
        loader.add_loader(Box::new(StaticModuleLoader::discover_static_modules()));
        loader.add_loader(Box::new(DynamicModuleLoader::new()));
        loader
    }
}

impl Default for CompositeModuleLoader {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl ModuleLoader for CompositeModuleLoader {
    fn load_module(&self, path: &Path) -> PluginResult<LoadedModule> {
        let mut last_error = None;

        for loader in &self.loaders {
            if !loader.can_load(path) {
                continue;
            }

            match loader.load_module(path) {
                Ok(module) => return Ok(module),
                Err(e) => {
                    tracing::debug!(
                        target: "plugin_loader",
                        loader_type = loader.loader_type(),
                        path = ?path,
                        error = %e,
                        "Module loading failed with loader, trying next"
                    );
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            PluginError::module_load_failed(path, "no loader can handle this artifact")
        }))
    }

    fn can_load(&self, path: &Path) -> bool {
        self.loaders.iter().any(|loader| loader.can_load(path))
    }

    fn loader_type(&self) -> &'static str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{factory_for, Plugin, PluginContext, PluginMetadata};
    use std::any::Any;

    struct TestPlugin {
        metadata: PluginMetadata,
    }

    impl Default for TestPlugin {
        fn default() -> Self {
            Self {
                metadata: PluginMetadata::new("Test Plugin"),
            }
        }
    }

    impl Plugin for TestPlugin {
        fn metadata(&self) -> &PluginMetadata {
            &self.metadata
        }

        fn on_loaded(&mut self, _context: &PluginContext) -> PluginResult<()> {
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    crate::submit_module!("inventory-test", TestPlugin);

    #[test]
    fn test_static_module_loader() {
        let loader = StaticModuleLoader::new().with_module("alpha", vec![factory_for::<TestPlugin>]);

        assert!(loader.can_load(Path::new("/plugins/alpha.plug")));
        assert!(!loader.can_load(Path::new("/plugins/beta.plug")));

        let module = loader.load_module(Path::new("/plugins/alpha.plug")).unwrap();
        assert_eq!(module.factories.len(), 1);
        assert!(module.library.is_none());
        assert_eq!(module.path, PathBuf::from("/plugins/alpha.plug"));

        let plugin = (module.factories[0])().unwrap();
        assert_eq!(plugin.name(), "Test Plugin");
    }

    #[test]
    fn test_static_module_loader_not_registered() {
        let loader = StaticModuleLoader::new();
        let err = loader.load_module(Path::new("missing.plug")).unwrap_err();
        assert!(matches!(err, PluginError::ModuleNotRegistered { .. }));
    }

    #[test]
    fn test_inventory_modules_are_collected() {
        let loader = StaticModuleLoader::discover_static_modules();
        assert!(loader.stems().contains(&"inventory-test"));
        assert!(loader.can_load(Path::new("inventory-test.so")));
    }

    #[test]
    fn test_dynamic_module_loader_can_load() {
        let loader = DynamicModuleLoader::new();

        assert!(loader.can_load(Path::new("plugin.so")));
        assert!(loader.can_load(Path::new("plugin.dll")));
        assert!(loader.can_load(Path::new("plugin.DYLIB")));
        assert!(!loader.can_load(Path::new("plugin.json")));
        assert!(!loader.can_load(Path::new("plugin")));
    }

    #[test]
    fn test_dynamic_module_loader_missing_file() {
        let loader = DynamicModuleLoader::new();
        let err = loader.load_module(Path::new("/nonexistent/plugin.so")).unwrap_err();
        assert!(matches!(err, PluginError::PluginFileNotFound { .. }));
    }

    #[test]
    fn test_dynamic_module_loader_rejects_garbage() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("broken.so");
        std::fs::write(&path, b"this is not a shared object").unwrap();

        let loader = DynamicModuleLoader::new();
        let err = loader.load_module(&path).unwrap_err();
        assert!(matches!(err, PluginError::DynamicLoadingError(_)));
        assert_eq!(loader.open_libraries(), 0);
    }

    #[test]
    fn test_composite_module_loader() {
        let mut composite = CompositeModuleLoader::new();
        composite.add_loader(Box::new(
            StaticModuleLoader::new().with_module("alpha", vec![factory_for::<TestPlugin>]),
        ));
        composite.add_loader(Box::new(DynamicModuleLoader::new()));

        assert!(composite.load_module(Path::new("alpha.so")).is_ok());
        assert!(composite.can_load(Path::new("other.so")));
        assert!(!composite.can_load(Path::new("invalid.txt")));

        let err = composite.load_module(Path::new("invalid.txt")).unwrap_err();
        assert!(matches!(err, PluginError::ModuleLoadFailed { .. }));

        // Falls through to the dynamic loader, which reports the missing file
        let err = composite.load_module(Path::new("/nonexistent/other.so")).unwrap_err();
        assert!(matches!(err, PluginError::PluginFileNotFound { .. }));
    }

    #[test]
    fn test_loader_types() {
        assert_eq!(StaticModuleLoader::new().loader_type(), "static");
        assert_eq!(DynamicModuleLoader::new().loader_type(), "dynamic");
        assert_eq!(CompositeModuleLoader::new().loader_type(), "composite");
    }
}
