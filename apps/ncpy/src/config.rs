//! ncpy configuration management.
//!
//! Configuration is stored as TOML:
//! - Linux: `~/.config/ncpy/ncpy.toml`
//! - Windows: `%APPDATA%/ncpy/ncpy.toml`
//!
//! `--config PATH` overrides the location. A missing file is created with
//! the defaults on first run.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use ncpy_channel::ChannelOptions;
use ncpy_protocol::constants::{DEFAULT_IDLE_CEILING, DEFAULT_PORT, DEFAULT_RELAY_PORT};
use ncpy_protocol::{CHUNK_SIZE, DEFAULT_TIMEOUT};
use ncpy_transfer::{RequesterOptions, ResponderOptions, RetryPolicy};
use serde::{Deserialize, Serialize};

/// ncpy configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Port `send` binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Port `relay` serves the received file on.
    #[serde(default = "default_relay_port")]
    pub relay_port: u16,

    /// Interface the responder binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Send and receive timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Consecutive idle receive cycles before a responder gives up.
    #[serde(default = "default_idle_ceiling")]
    pub idle_ceiling: u32,

    /// Directory received files are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    #[serde(default)]
    pub retry: RetryConfig,
}

/// Chunk retry settings for `receive`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Tries per chunk (0 = retry forever).
    #[serde(default)]
    pub max_attempts: u32,

    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_relay_port() -> u16 {
    DEFAULT_RELAY_PORT
}

fn default_bind_address() -> String {
    "0.0.0.0".into()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT.as_millis() as u64
}

fn default_idle_ceiling() -> u32 {
    DEFAULT_IDLE_CEILING
}

fn default_output_dir() -> String {
    ".".into()
}

fn default_initial_delay_ms() -> u64 {
    250
}

fn default_max_delay_ms() -> u64 {
    15_000
}

fn default_backoff_factor() -> f64 {
    2.0
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 0,
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: default_port(),
            relay_port: default_relay_port(),
            bind_address: default_bind_address(),
            timeout_ms: default_timeout_ms(),
            idle_ceiling: default_idle_ceiling(),
            output_dir: default_output_dir(),
            retry: RetryConfig::default(),
        }
    }
}

impl Config {
    /// Loads configuration from `path` (or the default location), creating
    /// a default file if none exists.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => config_path()?,
        };

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| format!("invalid configuration in {}", path.display()))?;
            tracing::debug!(path = %path.display(), "configuration loaded");
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(&path)?;
            Ok(config)
        }
    }

    /// Writes the configuration to `path`.
    pub fn save_to(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), "configuration saved");
        Ok(())
    }

    pub fn channel_options(&self) -> ChannelOptions {
        ChannelOptions::with_timeout(Duration::from_millis(self.timeout_ms.max(1)))
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            initial_delay: Duration::from_millis(self.retry.initial_delay_ms),
            max_delay: Duration::from_millis(self.retry.max_delay_ms),
            backoff_factor: self.retry.backoff_factor.max(1.0),
            ..RetryPolicy::default()
        }
        .with_max_attempts(self.retry.max_attempts)
    }

    /// Responder settings for serving on `port`.
    pub fn responder_options(&self, port: u16) -> ResponderOptions {
        ResponderOptions {
            bind_addr: format!("{}:{port}", self.bind_address),
            chunk_size: CHUNK_SIZE,
            channel: self.channel_options(),
            idle_ceiling: self.idle_ceiling,
        }
    }

    /// Requester settings; `output` overrides the output directory.
    pub fn requester_options(&self, output: Option<PathBuf>) -> RequesterOptions {
        RequesterOptions {
            output_dir: PathBuf::from(&self.output_dir),
            output_path: output,
            retry: self.retry_policy(),
        }
    }
}

/// Returns the platform-specific configuration file path.
fn config_path() -> anyhow::Result<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        let appdata = std::env::var("APPDATA").context("APPDATA is not set")?;
        Ok(PathBuf::from(appdata).join("ncpy").join("ncpy.toml"))
    }

    #[cfg(not(target_os = "windows"))]
    {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".into());
        Ok(PathBuf::from(home)
            .join(".config")
            .join("ncpy")
            .join("ncpy.toml"))
    }
}
