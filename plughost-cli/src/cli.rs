//! CLI argument parsing definitions

use clap::{Parser, Subcommand, ValueEnum};
use plughost_config::LogLevel;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "plughost", author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Set the log level, overriding the configuration file
    #[arg(long, value_name = "LEVEL", global = true)]
    pub log_level: Option<LogLevel>,

    /// Plugin directory, overriding the configuration file
    #[arg(long, value_name = "PATH", global = true)]
    pub plugin_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List module artifacts in the plugin directory without loading them
    Discover {
        /// Compute a SHA-256 checksum of each artifact
        #[arg(long)]
        checksums: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Load every plugin and list the registry
    List {
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Load plugins and print the load report
    Load {
        /// Load a single artifact instead of the whole directory
        #[arg(long, value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// Load every plugin and show details of one, by id or name
    Inspect {
        /// Plugin id or name
        plugin: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },

    /// Resolve a value the way the registry does: id first, then name
    Lookup {
        /// Plugin id or name
        value: String,
    },

    /// Configuration management commands
    Config {
        #[command(subcommand)]
        config_cmd: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show {
        #[arg(long, value_enum, default_value_t = OutputFormat::Yaml)]
        format: OutputFormat,
    },

    /// Validate a configuration file
    Validate {
        /// Path to the configuration file
        #[arg(long, value_name = "PATH")]
        config_file: PathBuf,
    },
}

/// Output format for listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}
