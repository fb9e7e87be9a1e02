//! Plugin that keeps a timestamped log of its own lifecycle

use chrono::{DateTime, Utc};
use plughost_plugin::types::Version;
use plughost_plugin::{Plugin, PluginContext, PluginMetadata, PluginResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::info;
use uuid::Uuid;

/// One lifecycle notification received by the plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    pub hook: String,
    pub at: DateTime<Utc>,
}

/// Records every lifecycle hook it receives
pub struct EventLogPlugin {
    metadata: PluginMetadata,
    events: Vec<LifecycleEvent>,
}

impl EventLogPlugin {
    pub const ID: Uuid = Uuid::from_u128(0x6c0f_3e1a_52b4_4c7e_9a61_0d2b_8f4e_1001);

    pub fn new() -> Self {
        let metadata = PluginMetadata::new("Event Log")
            .with_id(Self::ID)
            .with_version(Version::new(1, 0, 0))
            .with_description("Keeps a timestamped log of lifecycle notifications")
            .with_author("plughost");

        Self {
            metadata,
            events: Vec::new(),
        }
    }

    pub fn events(&self) -> &[LifecycleEvent] {
        &self.events
    }

    /// Hook names in the order they were received
    pub fn hooks(&self) -> Vec<&str> {
        self.events.iter().map(|e| e.hook.as_str()).collect()
    }

    fn record(&mut self, hook: &str) {
        info!(
            target: "plugin_samples",
            plugin = %self.metadata.name,
            hook,
            "Lifecycle notification"
        );
        self.events.push(LifecycleEvent {
            hook: hook.to_string(),
            at: Utc::now(),
        });
    }
}

impl Default for EventLogPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for EventLogPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_loaded(&mut self, context: &PluginContext) -> PluginResult<()> {
        info!(
            target: "plugin_samples",
            plugin = %self.metadata.name,
            data_dir = ?context.data_dir(),
            "Event log ready"
        );
        self.record("loaded");
        Ok(())
    }

    fn on_unloaded(&mut self, _context: &PluginContext) -> PluginResult<()> {
        self.record("unloaded");
        Ok(())
    }

    fn on_enabled(&mut self) -> PluginResult<()> {
        self.record("enabled");
        Ok(())
    }

    fn on_disabled(&mut self) -> PluginResult<()> {
        self.record("disabled");
        Ok(())
    }

    fn on_toggled(&mut self) -> PluginResult<()> {
        self.record("toggled");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
