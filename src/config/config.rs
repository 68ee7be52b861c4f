use crate::error::ConfigError;
use crate::message::WebhookCredentials;
use crate::notify::NotifierDefaults;
use crate::transport::robot::{DEFAULT_TIMEOUT_SECS, DEFAULT_WEBHOOK_URL};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Longest accepted rate limit window (one year)
pub const MAX_WINDOW_SECONDS: u64 = 365 * 24 * 60 * 60;

/// Relay configuration
///
/// Built from defaults, an optional TOML file and command-line/environment
/// overrides, then validated once and treated as immutable.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub robot: RobotConfig,
    pub rate_limit: RateLimitConfig,
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on (default: 0.0.0.0:80)
    pub addr: String,
}

/// Robot webhook settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RobotConfig {
    /// Robot access token (required)
    pub token: String,
    /// Robot secret
    pub secret: String,
    /// Recipients mentioned on every message
    pub at_mobiles: Vec<String>,
    /// Mention everyone on every message
    pub at_all: bool,
    /// Webhook endpoint
    pub webhook_url: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

/// Outbound call limit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Length of the sliding window in seconds (default: 60)
    pub window_seconds: u64,
    /// Calls admitted per window (default: 20)
    pub max_calls: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: "0.0.0.0:80".to_string(),
        }
    }
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            secret: String::new(),
            at_mobiles: Vec::new(),
            at_all: false,
            webhook_url: DEFAULT_WEBHOOK_URL.to_string(),
            timeout_seconds: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_seconds: 60,
            max_calls: 20,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read and
    /// `ConfigError::TomlError` if it is not valid configuration TOML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        debug!("Read {} bytes of configuration from {}", text.len(), path.display());
        Self::from_toml_str(&text)
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Check the configuration before the relay starts
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.robot.token.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "robot token is required".to_string(),
            ));
        }

        if self.robot.webhook_url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "robot webhook_url must not be empty".to_string(),
            ));
        }

        if self.robot.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "robot timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.rate_limit.window_seconds == 0 || self.rate_limit.window_seconds > MAX_WINDOW_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "rate_limit window_seconds out of range: {}",
                self.rate_limit.window_seconds
            )));
        }

        if self.rate_limit.max_calls == 0 {
            warn!("rate_limit max_calls is 0, every message will be rejected");
        }

        self.socket_addr()?;
        Ok(())
    }

    /// Listen address, accepting the `:port` shorthand
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = normalize_addr(&self.server.addr);
        addr.parse().map_err(|e| {
            ConfigError::ParseError(format!("invalid listen address '{}': {}", self.server.addr, e))
        })
    }

    /// Rate limit window, clamped to [`MAX_WINDOW_SECONDS`]
    pub fn window(&self) -> chrono::Duration {
        let seconds = self.rate_limit.window_seconds.min(MAX_WINDOW_SECONDS);
        chrono::Duration::seconds(seconds as i64)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.robot.timeout_seconds)
    }

    /// Defaults applied by the notifier to every message
    pub fn notifier_defaults(&self) -> NotifierDefaults {
        NotifierDefaults {
            credentials: WebhookCredentials::new(&self.robot.token, &self.robot.secret),
            mentions: self.robot.at_mobiles.clone(),
            mention_all: self.robot.at_all,
        }
    }
}

/// Expand `:80` to `0.0.0.0:80`
pub fn normalize_addr(addr: &str) -> String {
    let addr = addr.trim();
    if addr.starts_with(':') {
        format!("0.0.0.0{}", addr)
    } else {
        addr.to_string()
    }
}
