//! Message types flowing through the relay
//!
//! An inbound request is decoded into a [`Message`], which the notifier turns
//! into an [`OutboundMessage`] for the webhook transport.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Timestamp type for consistent time handling across the application
pub type Timestamp = DateTime<Utc>;

/// Credential pair identifying which robot webhook to call
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct WebhookCredentials {
    /// Robot access token
    pub token: String,
    /// Robot secret
    #[serde(default)]
    pub secret: String,
}

impl WebhookCredentials {
    pub fn new(token: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            secret: secret.into(),
        }
    }
}

/// A message received from an inbound request
///
/// Lives only for the duration of one request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Message {
    /// Text to deliver
    #[serde(default)]
    pub content: String,
    /// Extra recipients to mention, merged with the configured defaults
    #[serde(default, rename = "at")]
    pub mentions: Option<Vec<String>>,
    /// Application tag prepended to the content
    #[serde(default)]
    pub app: Option<String>,
    /// Override for the configured mention-everyone flag
    #[serde(default, rename = "at_all")]
    pub mention_all: Option<bool>,
    /// Override token, only used together with `secret`
    #[serde(default)]
    pub token: Option<String>,
    /// Override secret, only used together with `token`
    #[serde(default)]
    pub secret: Option<String>,
}

impl Message {
    /// Create a message carrying only content
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_mentions(mut self, mentions: Vec<String>) -> Self {
        self.mentions = Some(mentions);
        self
    }

    pub fn with_credentials(mut self, token: impl Into<String>, secret: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self.secret = Some(secret.into());
        self
    }

    /// Override credentials, present only when both token and secret are non-empty
    pub fn override_credentials(&self) -> Option<WebhookCredentials> {
        match (self.token.as_deref(), self.secret.as_deref()) {
            (Some(token), Some(secret)) if !token.is_empty() && !secret.is_empty() => {
                Some(WebhookCredentials::new(token, secret))
            }
            _ => None,
        }
    }
}

/// A fully resolved message handed to the webhook transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub content: String,
    pub mentions: Vec<String>,
    pub mention_all: bool,
    pub credentials: WebhookCredentials,
}
