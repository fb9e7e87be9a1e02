//! Command handlers

use anyhow::{anyhow, Context, Result};
use plughost_config::{ConfigLoader, HostConfig};
use plughost_plugin::{
    CompositeModuleLoader, DependencyValidator, DiscoveryConfig, DynamicModuleLoader, LoadReport,
    ModuleLoader, PluginDiscovery, PluginInfo, PluginInstance, PluginRegistry, RegistryConfig,
    StaticModuleLoader,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

use crate::cli::OutputFormat;

/// Static modules compiled into this binary, then shared libraries
pub fn module_loader() -> Arc<dyn ModuleLoader> {
    let mut builtin = StaticModuleLoader::discover_static_modules();
    register_builtin(&mut builtin);
    debug!(stems = ?builtin.stems(), "Static modules available");

    let mut composite = CompositeModuleLoader::new();
    composite.add_loader(Box::new(builtin));
    composite.add_loader(Box::new(DynamicModuleLoader::new()));
    Arc::new(composite)
}

/// Make sure the sample module is present even if the linker dropped its
/// inventory entry
#[cfg(feature = "builtin-plugins")]
fn register_builtin(loader: &mut StaticModuleLoader) {
    if !loader.stems().contains(&plughost_plugins::STATIC_MODULE_STEM) {
        loader.register_module(
            plughost_plugins::STATIC_MODULE_STEM,
            (plughost_plugins::PLUGHOST_MODULE.factories)(),
        );
    }
}

#[cfg(not(feature = "builtin-plugins"))]
fn register_builtin(_loader: &mut StaticModuleLoader) {}

pub fn registry(config: &HostConfig) -> PluginRegistry {
    PluginRegistry::with_loader(RegistryConfig::from(&config.plugins), module_loader())
}

fn render<T: Serialize + ?Sized>(value: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            serde_json::to_string_pretty(value).context("Failed to serialize to JSON")
        }
        OutputFormat::Yaml | OutputFormat::Table => {
            serde_yaml::to_string(value).context("Failed to serialize to YAML")
        }
    }
}

/// One row per plugin: name, version, id, state, source
pub fn plugin_table(infos: &[PluginInfo]) -> String {
    let mut out = format!(
        "{:<24} {:<10} {:<36} {:<13} {}\n",
        "NAME", "VERSION", "ID", "STATE", "SOURCE"
    );
    for info in infos {
        out.push_str(&format!(
            "{:<24} {:<10} {:<36} {:<13} {}\n",
            info.metadata.name,
            info.metadata.version.to_string(),
            info.metadata.id.to_string(),
            info.state.to_string(),
            info.source_path.display()
        ));
    }
    out
}

/// Human-readable load report
pub fn report_summary(report: &LoadReport) -> String {
    let mut out = format!(
        "Artifacts: {}  Instantiated: {}  Activated: {}  Failed: {}\n",
        report.artifacts.len(),
        report.instantiated,
        report.activated.len(),
        report.failures.len() + report.artifact_failures.len()
    );
    for failure in &report.artifact_failures {
        out.push_str(&format!("  ! {}: {}\n", failure.path.display(), failure.error));
    }
    for failure in &report.failures {
        out.push_str(&format!("  ! {} ({}): {}\n", failure.name, failure.id, failure.error));
    }
    out
}

pub fn handle_discover(config: &HostConfig, checksums: bool, format: OutputFormat) -> Result<()> {
    let discovery = PluginDiscovery::new(DiscoveryConfig {
        extensions: config.plugins.extensions.clone(),
        calculate_checksums: checksums || config.plugins.calculate_checksums,
    });
    let scan = discovery
        .scan_all(&config.plugins.directory)
        .with_context(|| format!("Failed to scan {:?}", config.plugins.directory))?;
    for rejected in &scan.rejected {
        eprintln!("  ! {}: {}", rejected.path.display(), rejected.error);
    }
    let artifacts = scan.artifacts;

    match format {
        OutputFormat::Table => {
            for artifact in &artifacts {
                println!(
                    "{:>10}  {}  {}",
                    artifact.size_bytes,
                    artifact.checksum.as_deref().unwrap_or("-"),
                    artifact.path.display()
                );
            }
        }
        other => println!("{}", render(&artifacts, other)?),
    }
    Ok(())
}

fn load_registry(config: &HostConfig) -> Result<(PluginRegistry, LoadReport)> {
    let registry = registry(config);
    let report = registry
        .load_all()
        .with_context(|| format!("Failed to load plugins from {:?}", registry.plugin_dir()))?;
    if !report.is_clean() {
        eprint!("{}", report_summary(&report));
    }
    Ok((registry, report))
}

pub fn handle_list(config: &HostConfig, format: OutputFormat) -> Result<()> {
    let (registry, _) = load_registry(config)?;
    let infos = registry.plugin_infos();

    match format {
        OutputFormat::Table => print!("{}", plugin_table(&infos)),
        other => println!("{}", render(&infos, other)?),
    }
    Ok(())
}

pub fn handle_load(config: &HostConfig, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            let registry = registry(config);
            let loaded = registry
                .load_one(path)
                .with_context(|| format!("Failed to load {:?}", path))?;
            info!(count = loaded.len(), "Artifact loaded");
            let infos: Vec<PluginInfo> =
                loaded.iter().map(|p| PluginInfo::from(p.as_ref())).collect();
            print!("{}", plugin_table(&infos));
        }
        None => {
            let registry = registry(config);
            let report = registry.load_all()?;
            print!("{}", report_summary(&report));
            if let Some(error) = report.first_error() {
                return Err(anyhow!(
                    "{} plugin(s) failed to activate; first: {}",
                    report.failures.len(),
                    error
                ));
            }
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct InspectView {
    #[serde(flatten)]
    info: PluginInfo,
    missing_dependencies: Vec<String>,
}

fn inspect_view(registry: &PluginRegistry, plugin: &PluginInstance) -> InspectView {
    InspectView {
        info: PluginInfo::from(plugin),
        missing_dependencies: DependencyValidator::missing(plugin.metadata(), registry),
    }
}

pub fn handle_inspect(config: &HostConfig, value: &str, format: OutputFormat) -> Result<()> {
    let (registry, _) = load_registry(config)?;
    let plugin = registry
        .lookup(value)
        .ok_or_else(|| anyhow!("No plugin matches '{}'", value))?;
    let view = inspect_view(&registry, &plugin);

    match format {
        OutputFormat::Table => {
            let meta = &view.info.metadata;
            println!("Name:         {}", meta.name);
            println!("Version:      {}", meta.version);
            println!("Id:           {}", meta.id);
            println!("Author:       {}", meta.author);
            println!("Description:  {}", meta.description);
            println!("State:        {}", view.info.state);
            println!("Enabled:      {}", view.info.enabled);
            println!("Source:       {}", view.info.source_path.display());
            println!("Data dir:     {}", view.info.data_dir.display());
            println!("Dependencies: {}", meta.dependencies.join(", "));
            if !view.missing_dependencies.is_empty() {
                println!("Missing:      {}", view.missing_dependencies.join(", "));
            }
        }
        other => println!("{}", render(&view, other)?),
    }
    Ok(())
}

pub fn handle_lookup(config: &HostConfig, value: &str) -> Result<()> {
    let (registry, _) = load_registry(config)?;
    let plugin = registry
        .lookup(value)
        .ok_or_else(|| anyhow!("No plugin matches '{}'", value))?;
    println!("{}\t{}", plugin.id(), plugin.name());
    Ok(())
}

pub fn handle_config_show(config: &HostConfig, format: OutputFormat) -> Result<()> {
    println!("{}", render(config, format)?);
    Ok(())
}

pub fn handle_config_validate(config_file: &Path) -> Result<()> {
    info!("Validating configuration file: {:?}", config_file);

    if !config_file.exists() {
        return Err(anyhow!("Configuration file not found: {:?}", config_file));
    }

    ConfigLoader::new()
        .from_file(config_file)
        .with_context(|| format!("Configuration validation failed for {:?}", config_file))?;
    println!("Configuration file is valid");
    Ok(())
}
