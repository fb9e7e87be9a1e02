//! Plugin that depends on the other samples and summarises the registry

use plughost_plugin::{Plugin, PluginContext, PluginMetadata, PluginResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::{info, warn};

/// Membership summary taken when the reporter is loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrySummary {
    pub members: usize,
    pub enabled: usize,
    pub names: Vec<String>,
}

/// Requires "Event Log" and "Greeter"; writes a JSON summary of the registry
pub struct ReporterPlugin {
    metadata: PluginMetadata,
    summary: Option<RegistrySummary>,
}

impl ReporterPlugin {
    pub fn new() -> Self {
        let metadata = PluginMetadata::new("Reporter")
            .with_random_id()
            .with_description("Summarises registry membership when loaded")
            .with_author("plughost")
            .with_dependencies(["Event Log", "Greeter"]);

        Self {
            metadata,
            summary: None,
        }
    }

    pub fn summary(&self) -> Option<&RegistrySummary> {
        self.summary.as_ref()
    }
}

impl Default for ReporterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for ReporterPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_loaded(&mut self, context: &PluginContext) -> PluginResult<()> {
        let Some(registry) = context.registry() else {
            warn!(
                target: "plugin_samples",
                plugin = %self.metadata.name,
                "Loaded without a registry, nothing to report"
            );
            return Ok(());
        };

        let infos = registry.plugin_infos();
        let summary = RegistrySummary {
            members: infos.len(),
            enabled: infos.iter().filter(|info| info.enabled).count(),
            names: infos.into_iter().map(|info| info.metadata.name).collect(),
        };

        let path = context
            .config_store()
            .write(&summary, plughost_plugin::ConfigFormat::Json, Some("reports"))?;
        info!(
            target: "plugin_samples",
            plugin = %self.metadata.name,
            members = summary.members,
            enabled = summary.enabled,
            path = ?path,
            "Registry summary written"
        );

        self.summary = Some(summary);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
