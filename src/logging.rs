//! Tracing subscriber setup.
//!
//! Logs always go to stderr: stdout carries the MCP protocol stream.

use crate::config::LoggingConfig;
use anyhow::{anyhow, Result};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Output format of the fmt layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            "compact" => Ok(Self::Compact),
            other => Err(anyhow!("Invalid log format: {}", other)),
        }
    }
}

/// Build the filter: `RUST_LOG` wins, then `--verbose`, then the configured level
pub fn env_filter(level: Level, verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { level };
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

/// Install the global subscriber
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<()> {
    let level = config.log_level()?;
    let format: LogFormat = config.format.parse()?;
    let filter = env_filter(level, verbose);

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    let installed = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };
    installed.map_err(|e| anyhow!("Failed to install tracing subscriber: {}", e))
}
