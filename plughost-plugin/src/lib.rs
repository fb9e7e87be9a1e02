//! Plugin host for plughost
//!
//! This crate discovers plugin modules in a directory, instantiates the
//! plugin types they export, validates declared dependencies and drives each
//! plugin through its load / enable / disable / unload lifecycle.

pub mod core;
pub mod discovery;
pub mod error;
pub mod instance;
pub mod loader;
pub mod registry;
pub mod storage;
pub mod types;
pub mod validator;

// Re-export main types
pub use core::{
    factory_for, ModuleDeclaration, Plugin, PluginContext, PluginFactory, PluginMetadata,
};
pub use discovery::{
    DiscoveredArtifact, DiscoveryConfig, DiscoveryScan, PluginDiscovery, RejectedArtifact,
};
pub use error::{PluginError, PluginResult};
pub use instance::PluginInstance;
pub use loader::{
    CompositeModuleLoader, DynamicModuleLoader, LoadedModule, ModuleLoader, StaticModule,
    StaticModuleLoader,
};
pub use registry::{
    ActivationFailure, ArtifactFailure, LoadReport, PluginInfo, PluginRegistry, RegistryConfig,
    RegistryHandle, RegistryStats,
};
pub use storage::{ConfigFormat, PluginConfigStore};
pub use types::PluginState;
pub use validator::{DependencyLookup, DependencyValidator};

/// Plugin API version; modules must be built against a compatible one
pub const PLUGIN_API_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Module export macros
pub mod macros {
    pub use inventory;

    /// Export plugin types from a `cdylib` module
    ///
    /// Emits the `PLUGHOST_MODULE` entry point read by the dynamic loader.
    /// Every type must implement `Plugin + Default`. Use at most once per
    /// library.
    ///
    /// # Example
    /// ```rust,ignore
    /// use plughost_plugin::export_plugins;
    ///
    /// export_plugins!(GreeterPlugin, AuditPlugin);
    /// ```
    #[macro_export]
    macro_rules! export_plugins {
        ($($plugin:ty),+ $(,)?) => {
            #[doc(hidden)]
            fn __plughost_module_factories() -> ::std::vec::Vec<$crate::core::PluginFactory> {
                ::std::vec![$($crate::core::factory_for::<$plugin> as $crate::core::PluginFactory),+]
            }

            #[doc(hidden)]
            #[no_mangle]
            pub static PLUGHOST_MODULE: $crate::core::ModuleDeclaration =
                $crate::core::ModuleDeclaration {
                    api_version: $crate::PLUGIN_API_VERSION,
                    factories: __plughost_module_factories,
                };
        };
    }

    /// Register plugin types compiled into the host
    ///
    /// The module is selected by an artifact in the plugin directory whose
    /// file stem equals `$stem`.
    ///
    /// # Example
    /// ```rust,ignore
    /// use plughost_plugin::submit_module;
    ///
    /// submit_module!("greeter", GreeterPlugin);
    /// ```
    #[macro_export]
    macro_rules! submit_module {
        ($stem:expr, $($plugin:ty),+ $(,)?) => {
            $crate::macros::inventory::submit! {
                $crate::loader::StaticModule::new(
                    $stem,
                    &[$($crate::core::factory_for::<$plugin> as $crate::core::PluginFactory),+],
                )
            }
        };
    }
}
