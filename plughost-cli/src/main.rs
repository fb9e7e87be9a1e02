use anyhow::{Context, Result};
use clap::Parser;
use plughost_config::{ConfigLoader, HostConfig};
use std::path::PathBuf;
use tracing::{debug, info, warn};

mod cli;
mod commands;
mod logging;

use cli::{Cli, Commands, ConfigCommands};

/// Load the host configuration: file when given and present, else environment
fn load_config(config_path: Option<&PathBuf>) -> Result<HostConfig> {
    let loader = ConfigLoader::new();

    match config_path {
        Some(path) => {
            if path.exists() {
                loader
                    .from_file(path)
                    .with_context(|| format!("Failed to load configuration from {:?}", path))
            } else {
                eprintln!("Configuration file not found: {:?}. Using defaults.", path);
                loader
                    .from_env()
                    .context("Failed to load configuration from environment")
            }
        }
        None => loader
            .from_env()
            .context("Failed to load configuration from environment"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_ref())?;
    if let Some(dir) = &cli.plugin_dir {
        config.plugins.directory = dir.clone();
    }

    logging::init_tracing(&config.logging, cli.log_level)?;
    debug!(config = ?config, "Configuration loaded");
    info!(
        plugin_dir = ?config.plugins.directory,
        "plughost {} starting",
        env!("CARGO_PKG_VERSION")
    );

    match &cli.command {
        Commands::Discover { checksums, format } => {
            commands::handle_discover(&config, *checksums, *format)
        }
        Commands::List { format } => commands::handle_list(&config, *format),
        Commands::Load { path } => commands::handle_load(&config, path.as_deref()),
        Commands::Inspect { plugin, format } => {
            commands::handle_inspect(&config, plugin, *format)
        }
        Commands::Lookup { value } => commands::handle_lookup(&config, value),
        Commands::Config { config_cmd } => match config_cmd {
            ConfigCommands::Show { format } => commands::handle_config_show(&config, *format),
            ConfigCommands::Validate { config_file } => {
                if cli.config.is_some() {
                    warn!("--config is ignored by 'config validate'");
                }
                commands::handle_config_validate(config_file)
            }
        },
    }
}
