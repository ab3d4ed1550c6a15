//! Configuration loading and management.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bridge configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Listener and health endpoint settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Slack API settings.
    pub slack: SlackConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// The `SLACK_TOKEN` environment variable, when set, overrides
    /// `[slack].token` so the credential can stay out of the config file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&content)?;
        if let Ok(token) = std::env::var("SLACK_TOKEN") {
            config.slack.token = Some(token);
        }
        Ok(config)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneralConfig {
    /// FastAGI listen address (default: 127.0.0.1:4574).
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// Health/metrics HTTP port (default: 9090). 0 disables the endpoint.
    #[serde(default = "default_health_port")]
    pub health_port: u16,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            health_port: default_health_port(),
        }
    }
}

/// Slack API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SlackConfig {
    /// Bot token. Usually supplied via the `SLACK_TOKEN` environment variable.
    pub token: Option<String>,
    /// Channel that receives call notifications.
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Username the notifications are posted as.
    #[serde(default = "default_username")]
    pub username: String,
    /// Icon emoji for the posting user.
    #[serde(default = "default_icon_emoji")]
    pub icon_emoji: String,
    /// Slack Web API base URL. Overridable for tests.
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_listen() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 4574))
}

fn default_health_port() -> u16 {
    9090
}

fn default_channel() -> String {
    "telefon".to_string()
}

fn default_username() -> String {
    "PBX".to_string()
}

fn default_icon_emoji() -> String {
    ":telephone_receiver:".to_string()
}

fn default_api_url() -> String {
    "https://slack.com/api".to_string()
}
