//! Tracing initialisation for the CLI

use anyhow::Result;
use plughost_config::{LogFormat, LogLevel, LoggingConfig};
use tracing_subscriber::EnvFilter;

/// Pick the filter: explicit CLI level, then `RUST_LOG`, then the configured level
pub fn resolve_filter(
    cli_level: Option<LogLevel>,
    rust_log: Option<&str>,
    config_level: LogLevel,
) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level.to_string());
    }

    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(config_level.to_string()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

/// Install the global subscriber; a second call is a no-op
///
/// Logs go to stderr so command output on stdout stays machine readable.
pub fn init_tracing(config: &LoggingConfig, cli_level: Option<LogLevel>) -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let env_filter = resolve_filter(cli_level, rust_log.as_deref(), config.level);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location);

    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}
