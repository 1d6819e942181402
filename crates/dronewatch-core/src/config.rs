//! Application configuration
//!
//! Configuration is loaded from:
//! 1. Default values
//! 2. Config file (~/.config/dronewatch/config.toml)
//! 3. Environment variables (DRONEWATCH_* prefix)
//!
//! Environment variables take precedence over config file values.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::client::DEFAULT_API_URL;
use crate::engine::{EngineSettings, DEFAULT_THRESHOLD};
use crate::models::{PollConfig, DEFAULT_EVENTS_LIMIT, DEFAULT_POLL_INTERVAL};
use crate::reconciler::validate_threshold;

/// Environment variable prefix
const ENV_PREFIX: &str = "DRONEWATCH";

/// Keys accepted by [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "api_url",
    "poll_interval_ms",
    "events_limit",
    "default_threshold",
    "log_file",
];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the detection backend
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Milliseconds between scheduled refreshes (clamped to 250 at use)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of events requested per refresh
    #[serde(default = "default_events_limit")]
    pub events_limit: u32,

    /// Threshold draft shown before the backend reports one
    #[serde(default = "default_threshold")]
    pub default_threshold: f64,

    /// TUI debug log (when DRONEWATCH_LOG is set)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            poll_interval_ms: default_poll_interval_ms(),
            events_limit: default_events_limit(),
            default_threshold: default_threshold(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from default location and environment
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Environment variables (DRONEWATCH_API_URL, DRONEWATCH_POLL_INTERVAL_MS,
    ///    DRONEWATCH_EVENTS_LIMIT, DRONEWATCH_DEFAULT_THRESHOLD)
    /// 2. Config file (~/.config/dronewatch/config.toml or DRONEWATCH_CONFIG)
    /// 3. Default values
    pub fn load() -> Result<Self> {
        Self::load_from_path(&Self::config_file_path())
    }

    /// Load from `--config` if given, otherwise the default location
    pub fn load_with_cli_override(path: Option<&PathBuf>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        }
    }

    /// Load configuration from a specific path
    ///
    /// Environment variables are still applied as overrides.
    /// If the file doesn't exist, defaults are used.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?
        } else {
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a TOML string (useful for testing)
    pub fn load_from_str(toml_content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(toml_content).context("Failed to parse config TOML")?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Values that don't parse are ignored.
    fn apply_env_overrides(&mut self) {
        // DRONEWATCH_API_URL
        if let Ok(val) = std::env::var(format!("{}_API_URL", ENV_PREFIX)) {
            if !val.is_empty() {
                self.api_url = val;
            }
        }

        // DRONEWATCH_POLL_INTERVAL_MS
        if let Some(val) = env_parsed(&format!("{}_POLL_INTERVAL_MS", ENV_PREFIX)) {
            self.poll_interval_ms = val;
        }

        // DRONEWATCH_EVENTS_LIMIT
        if let Some(val) = env_parsed(&format!("{}_EVENTS_LIMIT", ENV_PREFIX)) {
            self.events_limit = val;
        }

        // DRONEWATCH_DEFAULT_THRESHOLD
        if let Some(val) = env_parsed::<f64>(&format!("{}_DEFAULT_THRESHOLD", ENV_PREFIX)) {
            if validate_threshold(val).is_ok() {
                self.default_threshold = val;
            }
        }
    }

    /// Set one key from its string form, as `config set` does
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "api_url" => {
                if value.is_empty() {
                    bail!("api_url cannot be empty");
                }
                self.api_url = value.trim_end_matches('/').to_string();
            }
            "poll_interval_ms" => {
                self.poll_interval_ms = value
                    .parse()
                    .with_context(|| format!("Invalid poll_interval_ms: {}", value))?;
            }
            "events_limit" => {
                self.events_limit = value
                    .parse()
                    .with_context(|| format!("Invalid events_limit: {}", value))?;
            }
            "default_threshold" => {
                let threshold: f64 = value
                    .parse()
                    .with_context(|| format!("Invalid default_threshold: {}", value))?;
                self.default_threshold = validate_threshold(threshold)?;
            }
            "log_file" => {
                self.log_file = if value.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(value))
                };
            }
            _ => bail!(
                "Unknown config key: {} (expected one of: {})",
                key,
                CONFIG_KEYS.join(", ")
            ),
        }
        Ok(())
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to_path(&Self::config_file_path())
    }

    /// Save configuration to a specific file
    pub fn save_to_path(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;
        Ok(())
    }

    /// Get the config file path
    ///
    /// Can be overridden with DRONEWATCH_CONFIG environment variable
    pub fn config_file_path() -> PathBuf {
        if let Ok(path) = std::env::var(format!("{}_CONFIG", ENV_PREFIX)) {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dronewatch")
            .join("config.toml")
    }

    /// Clamped poll settings
    pub fn poll_config(&self) -> PollConfig {
        PollConfig::from_millis(self.poll_interval_ms, self.events_limit)
    }

    pub fn engine_settings(&self) -> EngineSettings {
        EngineSettings {
            default_threshold: self.default_threshold,
            poll: self.poll_config(),
        }
    }

    /// Where the TUI writes its debug log
    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(default_log_path)
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|val| val.trim().parse().ok())
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_events_limit() -> u32 {
    DEFAULT_EVENTS_LIMIT
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Default TUI log location
pub fn default_log_path() -> PathBuf {
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("dronewatch")
        .join("debug.log")
}
