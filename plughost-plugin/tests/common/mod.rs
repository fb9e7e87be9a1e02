//! Shared fixtures for registry integration tests
#![allow(dead_code)]

use plughost_plugin::{
    Plugin, PluginContext, PluginFactory, PluginInstance, PluginMetadata, PluginRegistry,
    PluginResult, RegistryConfig, StaticModuleLoader,
};
use std::any::Any;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use uuid::Uuid;

/// Extension used for marker artifacts in tests
pub const EXT: &str = "plug";

/// Plugin that records every hook invocation in order
pub struct Recorder {
    pub metadata: PluginMetadata,
    pub events: Vec<String>,
    /// Data directory existence observed by `on_loaded`
    pub data_dir_seen: Option<bool>,
    /// Names the `on_loaded` hook looked up in the registry, with the outcome
    pub lookups: Vec<(String, bool)>,
}

impl Recorder {
    pub fn new(metadata: PluginMetadata) -> Self {
        Self {
            metadata,
            events: Vec::new(),
            data_dir_seen: None,
            lookups: Vec::new(),
        }
    }

    pub fn boxed(metadata: PluginMetadata) -> PluginResult<Box<dyn Plugin>> {
        Ok(Box::new(Self::new(metadata)))
    }
}

impl Plugin for Recorder {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_loaded(&mut self, context: &PluginContext) -> PluginResult<()> {
        self.events.push("loaded".to_string());
        self.data_dir_seen = Some(context.data_dir().is_dir());

        if let Some(registry) = context.registry() {
            for dependency in self.metadata.dependencies.clone() {
                let found = registry.lookup_by_name(&dependency).is_some();
                self.lookups.push((dependency, found));
            }
        }
        Ok(())
    }

    fn on_unloaded(&mut self, _context: &PluginContext) -> PluginResult<()> {
        self.events.push("unloaded".to_string());
        Ok(())
    }

    fn on_enabled(&mut self) -> PluginResult<()> {
        self.events.push("enabled".to_string());
        Ok(())
    }

    fn on_disabled(&mut self) -> PluginResult<()> {
        self.events.push("disabled".to_string());
        Ok(())
    }

    fn on_toggled(&mut self) -> PluginResult<()> {
        self.events.push("toggled".to_string());
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Fixed id bound to plugin "A"
pub const ALPHA_ID: Uuid = Uuid::from_u128(0x0a0a_0000_0000_4000_8000_0000_0000_000a);

pub fn alpha() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(PluginMetadata::new("A").with_id(ALPHA_ID))
}

pub fn beta() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(
        PluginMetadata::new("B")
            .with_random_id()
            .with_dependency("a"),
    )
}

pub fn gamma() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(
        PluginMetadata::new("C")
            .with_random_id()
            .with_dependency("Z"),
    )
}

pub fn unnamed_id() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(PluginMetadata::new("Default Id"))
}

/// Named after `ALPHA_ID` so name and id lookups collide
pub fn alpha_id_named() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(PluginMetadata::new(ALPHA_ID.to_string()).with_random_id())
}

pub fn blank_name() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(PluginMetadata::new("").with_random_id())
}

pub fn escaping_name() -> PluginResult<Box<dyn Plugin>> {
    Recorder::boxed(PluginMetadata::new("../outside").with_random_id())
}

pub fn broken() -> PluginResult<Box<dyn Plugin>> {
    Err(plughost_plugin::PluginError::generic("cannot construct"))
}

/// Plugin directory populated with marker artifacts
pub struct Fixture {
    pub dir: TempDir,
    modules: Vec<(&'static str, Vec<PluginFactory>)>,
}

impl Fixture {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
            modules: Vec::new(),
        }
    }

    /// Register a module and drop its marker artifact in the directory
    pub fn module(mut self, stem: &'static str, factories: Vec<PluginFactory>) -> Self {
        self.touch(stem);
        self.modules.push((stem, factories));
        self
    }

    /// Drop a marker artifact without registering a module for it
    pub fn touch(&self, stem: &str) {
        std::fs::write(self.artifact(stem), b"").unwrap();
    }

    pub fn artifact(&self, stem: &str) -> std::path::PathBuf {
        self.dir.path().join(format!("{}.{}", stem, EXT))
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn registry(&self) -> PluginRegistry {
        let mut loader = StaticModuleLoader::new();
        for (stem, factories) in &self.modules {
            loader.register_module(*stem, factories.clone());
        }

        PluginRegistry::with_loader(
            RegistryConfig::new(self.dir.path()).with_extensions([EXT]),
            Arc::new(loader),
        )
    }
}

/// Hook events recorded by a `Recorder` instance
pub fn events(instance: &PluginInstance) -> Vec<String> {
    instance.with_plugin(|plugin| {
        plugin
            .as_any()
            .downcast_ref::<Recorder>()
            .map(|recorder| recorder.events.clone())
            .unwrap_or_default()
    })
}

pub fn count(instance: &PluginInstance, event: &str) -> usize {
    events(instance).iter().filter(|e| e.as_str() == event).count()
}

pub fn recorder<R>(instance: &PluginInstance, f: impl FnOnce(&Recorder) -> R) -> R {
    instance.with_plugin(|plugin| {
        let recorder = plugin
            .as_any()
            .downcast_ref::<Recorder>()
            .expect("instance is not a Recorder");
        f(recorder)
    })
}
