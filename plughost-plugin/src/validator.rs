//! Dependency validation against the current registry membership

use crate::core::PluginMetadata;
use crate::error::{PluginError, PluginResult};
use crate::registry::PluginRegistry;
use crate::types::names_match;

/// Something that can answer "is a plugin with this name present?"
pub trait DependencyLookup {
    fn has_plugin(&self, name: &str) -> bool;
}

impl DependencyLookup for PluginRegistry {
    fn has_plugin(&self, name: &str) -> bool {
        self.lookup_by_name(name).is_some()
    }
}

impl DependencyLookup for [String] {
    fn has_plugin(&self, name: &str) -> bool {
        self.iter().any(|candidate| names_match(candidate, name))
    }
}

impl DependencyLookup for Vec<String> {
    fn has_plugin(&self, name: &str) -> bool {
        self.as_slice().has_plugin(name)
    }
}

/// Checks declared dependencies by name
///
/// A dependency is satisfied by membership alone; the dependency does not
/// have to be loaded or enabled yet.
pub struct DependencyValidator;

impl DependencyValidator {
    /// Fail on the first declared dependency that cannot be found
    pub fn validate<L>(metadata: &PluginMetadata, lookup: &L) -> PluginResult<()>
    where
        L: DependencyLookup + ?Sized,
    {
        match metadata
            .dependencies
            .iter()
            .find(|dependency| !lookup.has_plugin(dependency))
        {
            Some(dependency) => {
                tracing::warn!(
                    target: "plugin_registry",
                    plugin = %metadata.name,
                    id = %metadata.id,
                    dependency = %dependency,
                    "Plugin dependency not found"
                );
                Err(PluginError::DependencyNotFound {
                    plugin: metadata.name.clone(),
                    id: metadata.id,
                    dependency: dependency.clone(),
                })
            }
            None => Ok(()),
        }
    }

    /// Every declared dependency that cannot be found, in declaration order
    pub fn missing<L>(metadata: &PluginMetadata, lookup: &L) -> Vec<String>
    where
        L: DependencyLookup + ?Sized,
    {
        metadata
            .dependencies
            .iter()
            .filter(|dependency| !lookup.has_plugin(dependency))
            .cloned()
            .collect()
    }
}
