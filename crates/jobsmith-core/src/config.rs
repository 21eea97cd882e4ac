//! Scheduler configuration loaded from `jobsmith.toml`.
//!
//! [`SchedulerConfig`] holds every tunable. Keys missing from the file fall back to
//! defaults, and a missing file means all defaults. `WEBHOOK_URL` in the environment
//! takes precedence over `[webhook].url`; it is read once at load time and then
//! injected, never consulted again.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::domain::RetryPolicy;

pub const DEFAULT_CONFIG_PATH: &str = "jobsmith.toml";
pub const WEBHOOK_URL_ENV: &str = "WEBHOOK_URL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub log_format: LogFormat,

    #[serde(default)]
    pub webhook: WebhookConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// Where and how completion events are delivered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Destination. Absent means notifications are skipped.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-attempt bound, including time spent waiting for a delivery slot.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// 1 = single attempt, no retry.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    /// Deliveries allowed to hold a connection at once.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Duration of the simulated task body.
    #[serde(default = "default_work_duration_ms")]
    pub work_duration_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on jobs started per tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    1
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_in_flight() -> usize {
    32
}

fn default_work_duration_ms() -> u64 {
    3000
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_batch_size() -> usize {
    16
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_ms: default_timeout_ms(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_in_flight: default_max_in_flight(),
        }
    }
}

impl WebhookConfig {
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        if self.max_attempts <= 1 {
            return RetryPolicy::single_attempt();
        }
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.base_delay_ms))
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            work_duration_ms: default_work_duration_ms(),
        }
    }
}

impl EngineConfig {
    pub fn work_duration(&self) -> Duration {
        Duration::from_millis(self.work_duration_ms)
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            poll_interval_ms: default_poll_interval_ms(),
            batch_size: default_batch_size(),
        }
    }
}

impl DispatcherConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl SchedulerConfig {
    /// Load from `path` (or `jobsmith.toml`), then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        let mut config = if path.exists() {
            let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            Self::from_toml_str(&contents)?
        } else {
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Apply overrides from a variable lookup. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(WEBHOOK_URL_ENV)
            && !url.trim().is_empty()
        {
            self.webhook.url = Some(url);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webhook.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "webhook.max_attempts must be at least 1".into(),
            ));
        }
        if self.webhook.timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "webhook.timeout_ms must be positive".into(),
            ));
        }
        if self.webhook.max_in_flight == 0 {
            return Err(ConfigError::Invalid(
                "webhook.max_in_flight must be at least 1".into(),
            ));
        }
        if self.dispatcher.enabled && self.dispatcher.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "dispatcher.poll_interval_ms must be positive".into(),
            ));
        }
        if let Some(url) = &self.webhook.url {
            reqwest::Url::parse(url)
                .map_err(|e| ConfigError::Invalid(format!("webhook.url `{url}`: {e}")))?;
        }
        Ok(())
    }
}
