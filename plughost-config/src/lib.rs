//! Host configuration for plughost
//!
//! Configuration is split by domain (plugin discovery, logging), loaded from
//! YAML with `PLUGHOST_*` environment overrides, and validated per domain.

pub mod error;
pub mod loader;
pub mod validation;

pub mod domains;

// Re-export main types
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

pub use domains::{
    logging::{LogFormat, LogLevel, LoggingConfig},
    plugins::{PluginsConfig, MAX_PLUGIN_CAPACITY},
    HostConfig,
};
