//! Plugin that keeps its settings in a YAML file in its data directory

use plughost_plugin::types::Version;
use plughost_plugin::{ConfigFormat, Plugin, PluginContext, PluginMetadata, PluginResult};
use serde::{Deserialize, Serialize};
use std::any::Any;
use tracing::{debug, info};

/// Settings persisted as `<data dir>/Greeter.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreeterSettings {
    pub greeting: String,
    pub audience: String,
    pub shout: bool,
}

impl Default for GreeterSettings {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
            audience: "world".to_string(),
            shout: false,
        }
    }
}

/// Greets on every enable, using settings loaded from its config file
pub struct GreeterPlugin {
    metadata: PluginMetadata,
    settings: GreeterSettings,
    greetings: usize,
}

impl GreeterPlugin {
    pub fn new() -> Self {
        let metadata = PluginMetadata::new("Greeter")
            .with_random_id()
            .with_version(Version::new(0, 2, 0))
            .with_description("Greets whenever it is enabled")
            .with_author("plughost");

        Self {
            metadata,
            settings: GreeterSettings::default(),
            greetings: 0,
        }
    }

    pub fn settings(&self) -> &GreeterSettings {
        &self.settings
    }

    /// Number of greetings issued so far
    pub fn greetings(&self) -> usize {
        self.greetings
    }

    pub fn greet(&self) -> String {
        let text = format!("{}, {}!", self.settings.greeting, self.settings.audience);
        if self.settings.shout {
            text.to_uppercase()
        } else {
            text
        }
    }
}

impl Default for GreeterPlugin {
    fn default() -> Self {
        Self::new()
    }
}

impl Plugin for GreeterPlugin {
    fn metadata(&self) -> &PluginMetadata {
        &self.metadata
    }

    fn on_loaded(&mut self, context: &PluginContext) -> PluginResult<()> {
        let store = context.config_store();

        if store.exists(ConfigFormat::Yaml, None) {
            self.settings = store.read(ConfigFormat::Yaml, None)?;
            debug!(target: "plugin_samples", plugin = %self.metadata.name, "Loaded greeter settings");
        } else {
            let path = store.write(&self.settings, ConfigFormat::Yaml, None)?;
            info!(
                target: "plugin_samples",
                plugin = %self.metadata.name,
                path = ?path,
                "Wrote default greeter settings"
            );
        }
        Ok(())
    }

    fn on_enabled(&mut self) -> PluginResult<()> {
        self.greetings += 1;
        info!(target: "plugin_samples", plugin = %self.metadata.name, "{}", self.greet());
        Ok(())
    }

    fn on_disabled(&mut self) -> PluginResult<()> {
        info!(
            target: "plugin_samples",
            plugin = %self.metadata.name,
            "Goodbye, {}",
            self.settings.audience
        );
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
