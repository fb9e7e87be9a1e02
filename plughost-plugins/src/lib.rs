//! Sample plugins for plughost
//!
//! Built as a `cdylib`, this crate is a module the host can load from its
//! plugin directory. Linked as an `rlib`, the same plugins are available as
//! the static module `plughost_plugins`.

pub mod samples;

pub use samples::{
    EventLogPlugin, GreeterPlugin, GreeterSettings, LifecycleEvent, RegistrySummary, ReporterPlugin,
};

/// Artifact file stem selecting the statically linked copy of this module
pub const STATIC_MODULE_STEM: &str = "plughost_plugins";

plughost_plugin::export_plugins!(EventLogPlugin, GreeterPlugin, ReporterPlugin);
plughost_plugin::submit_module!("plughost_plugins", EventLogPlugin, GreeterPlugin, ReporterPlugin);
