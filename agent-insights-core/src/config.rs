//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/agent-insights/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/agent-insights/` (~/.config/agent-insights/)
//! - State/Logs: `$XDG_STATE_HOME/agent-insights/` (~/.local/state/agent-insights/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Where and how sessions are discovered
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Spawn-to-log matching window
    #[serde(default)]
    pub correlation: CorrelationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Session discovery configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    /// Override for the log root (defaults to `~/.claude/projects`)
    pub root: Option<PathBuf>,

    /// Lines read from the head of a lead log during the metadata pass
    #[serde(default = "default_head_lines")]
    pub head_lines: usize,

    /// Bytes read from the end of a file to find its last line
    #[serde(default = "default_tail_bytes")]
    pub tail_bytes: u64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            root: None,
            head_lines: default_head_lines(),
            tail_bytes: default_tail_bytes(),
        }
    }
}

fn default_head_lines() -> usize {
    5
}

fn default_tail_bytes() -> u64 {
    8192
}

/// Identity correlation window
///
/// An agent log may start at most `early_tolerance_ms` before and strictly
/// less than `max_delay_ms` after the spawn that names it.
#[derive(Debug, Deserialize, Clone)]
pub struct CorrelationConfig {
    #[serde(default = "default_early_tolerance_ms")]
    pub early_tolerance_ms: i64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: i64,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            early_tolerance_ms: default_early_tolerance_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

fn default_early_tolerance_ms() -> i64 {
    2_000
}

fn default_max_delay_ms() -> i64 {
    120_000
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Mirror log output to stderr in addition to the log file
    #[serde(default)]
    pub stderr: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            stderr: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject settings that would silently disable discovery or correlation.
    pub fn validate(&self) -> Result<()> {
        if self.discovery.head_lines == 0 {
            return Err(Error::Config(
                "discovery.head_lines must be positive".to_string(),
            ));
        }
        if self.discovery.tail_bytes == 0 {
            return Err(Error::Config(
                "discovery.tail_bytes must be positive".to_string(),
            ));
        }
        if self.correlation.max_delay_ms <= 0 {
            return Err(Error::Config(
                "correlation.max_delay_ms must be positive".to_string(),
            ));
        }
        if self.correlation.early_tolerance_ms < 0 {
            return Err(Error::Config(
                "correlation.early_tolerance_ms must not be negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the log root used for discovery.
    ///
    /// The configured override wins; otherwise `~/.claude/projects`.
    pub fn projects_root(&self) -> PathBuf {
        self.discovery
            .root
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude").join("projects"))
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/agent-insights/config.toml` (~/.config/agent-insights/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("agent-insights").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/agent-insights/` (~/.local/state/agent-insights/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("agent-insights")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("agent-insights.log")
    }
}
