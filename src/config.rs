// Configuration File Support
//
// This module provides configuration file parsing for the Hypernode MCP server.
// Supports TOML format with environment variable overrides.
// Configuration files are loaded from XDG config directory: ~/.config/hypernode-mcp/config.toml

use crate::exec::{ExecutionTimeout, ExecutorConfig, DEFAULT_TIMEOUT_SECS};
use crate::tools::{default_incidents_dir, ensure_plain_token, ToolSettings};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Command executor configuration
    pub executor: ExecutorSection,

    /// Tool handler configuration
    pub tools: ToolsConfig,

    /// MCP server identity
    pub server: ServerConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Convert log level string to tracing::Level
    pub fn log_level(&self) -> Result<tracing::Level> {
        self.level
            .to_lowercase()
            .parse()
            .map_err(|e| anyhow::anyhow!("Failed to parse log level: {}", e))
    }
}

/// `[executor]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ExecutorSection {
    /// Default timeout for commands, in seconds
    pub timeout_secs: u64,
}

impl Default for ExecutorSection {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// `[tools]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    /// Incidents directory; `~/` is expanded. Defaults to `$HOME/incidents`
    pub incidents_dir: Option<String>,

    pub block_attack_timeout_secs: u64,

    pub nginx_timeout_secs: u64,

    /// Characters of incident file content returned per file
    pub incident_content_limit: usize,

    /// Incident files at or above this size are listed without content
    pub incident_max_file_bytes: u64,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            incidents_dir: None,
            block_attack_timeout_secs: 60,
            nginx_timeout_secs: 120,
            incident_content_limit: 10_000,
            incident_max_file_bytes: 1024 * 1024,
        }
    }
}

/// `[server]` table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Name reported in `serverInfo`
    pub name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            name: "Hypernode MCP Server".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from the default XDG config directory
    ///
    /// If the config file does not exist, the defaults are used (still
    /// subject to environment overrides).
    pub fn load() -> Result<Self> {
        Self::load_from_path(Self::config_path())
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be read or
    /// parsed, or if the resulting configuration is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let config = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file from {:?}", path))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file from {:?}", path))?;
            tracing::debug!("Loaded configuration from {:?}", path);
            config
        } else {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            Self::default()
        };

        let config = config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path
    ///
    /// Returns `~/.config/hypernode-mcp/config.toml` on Linux
    pub fn config_path() -> PathBuf {
        if let Some(proj_dirs) = directories::ProjectDirs::from("nl", "hypernode", "hypernode-mcp")
        {
            proj_dirs.config_dir().join("config.toml")
        } else {
            PathBuf::from(".config")
                .join("hypernode-mcp")
                .join("config.toml")
        }
    }

    /// Apply environment variable overrides to the configuration
    ///
    /// Environment variables take precedence over config file values:
    /// - HYPERNODE_MCP_LOG_LEVEL
    /// - HYPERNODE_MCP_LOG_FORMAT
    /// - HYPERNODE_MCP_TIMEOUT_SECS
    /// - HYPERNODE_MCP_INCIDENTS_DIR
    fn apply_env_overrides(self) -> Self {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(level) = lookup("HYPERNODE_MCP_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("HYPERNODE_MCP_LOG_FORMAT") {
            self.logging.format = format;
        }
        if let Some(timeout) = lookup("HYPERNODE_MCP_TIMEOUT_SECS") {
            // Unparseable values keep the configured timeout
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.executor.timeout_secs = timeout;
            }
        }
        if let Some(dir) = lookup("HYPERNODE_MCP_INCIDENTS_DIR") {
            self.tools.incidents_dir = Some(dir);
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        match self.logging.level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                self.logging.level
            ),
        }

        match self.logging.format.to_lowercase().as_str() {
            "json" | "pretty" | "compact" => {}
            _ => anyhow::bail!(
                "Invalid log format: {}. Must be one of: json, pretty, compact",
                self.logging.format
            ),
        }

        if self.executor.timeout_secs == 0 {
            anyhow::bail!("Executor timeout must be > 0");
        }
        if self.tools.block_attack_timeout_secs == 0 {
            anyhow::bail!("block_attack timeout must be > 0");
        }
        if self.tools.nginx_timeout_secs == 0 {
            anyhow::bail!("nginx log analysis timeout must be > 0");
        }
        if self.server.name.trim().is_empty() {
            anyhow::bail!("Server name must not be empty");
        }
        if self.tools.incidents_dir.is_some() {
            // Interpolated into `ls -la <dir>`, which must not reach a shell
            let dir = self.incidents_dir().display().to_string();
            ensure_plain_token("incidents_dir", &dir).map_err(|e| anyhow::anyhow!("{}", e))?;
        }

        Ok(())
    }

    /// Resolved incidents directory
    pub fn incidents_dir(&self) -> PathBuf {
        match self.tools.incidents_dir.as_deref() {
            Some(dir) => expand_home(dir),
            None => default_incidents_dir(),
        }
    }

    pub fn executor_config(&self) -> ExecutorConfig {
        ExecutorConfig::with_timeout(self.executor.timeout_secs)
    }

    pub fn tool_settings(&self) -> ToolSettings {
        ToolSettings {
            incidents_dir: self.incidents_dir(),
            block_attack_timeout: ExecutionTimeout::from_secs(self.tools.block_attack_timeout_secs),
            nginx_timeout: ExecutionTimeout::from_secs(self.tools.nginx_timeout_secs),
            incident_content_limit: self.tools.incident_content_limit,
            incident_max_file_bytes: self.tools.incident_max_file_bytes,
        }
    }
}

fn expand_home(dir: &str) -> PathBuf {
    match (dir.strip_prefix("~/"), directories::BaseDirs::new()) {
        (Some(rest), Some(dirs)) => dirs.home_dir().join(rest),
        _ => PathBuf::from(dir),
    }
}
