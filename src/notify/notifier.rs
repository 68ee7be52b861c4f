use crate::error::NotifyError;
use crate::message::{Message, OutboundMessage, WebhookCredentials};
use crate::notify::RateLimiter;
use crate::transport::WebhookTransport;
use log::{error, info, warn};
use std::sync::Arc;

/// Values applied to every message unless the request overrides them
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifierDefaults {
    /// Credentials used when a message does not carry its own pair
    pub credentials: WebhookCredentials,
    /// Recipients mentioned on every message
    pub mentions: Vec<String>,
    /// Whether to mention everyone by default
    pub mention_all: bool,
}

/// Relays messages to the robot webhook under a rate limit
///
/// Each call to [`send`](Notifier::send) results in at most one outbound call,
/// made synchronously within the caller's request. Nothing is queued: a
/// message rejected by the limiter is discarded and the caller is told so.
pub struct Notifier {
    /// Guards the webhook's call-volume cap
    rate_limiter: RateLimiter,
    /// Outbound webhook client
    transport: Arc<dyn WebhookTransport>,
    /// Configured defaults
    defaults: NotifierDefaults,
}

impl Notifier {
    pub fn new(
        rate_limiter: RateLimiter,
        transport: Arc<dyn WebhookTransport>,
        defaults: NotifierDefaults,
    ) -> Self {
        Self {
            rate_limiter,
            transport,
            defaults,
        }
    }

    /// Validate, format and deliver a message
    ///
    /// # Returns
    ///
    /// The webhook's raw response body on success.
    ///
    /// # Errors
    ///
    /// - `NotifyError::Validation` if the content is empty; the limiter is not consulted.
    /// - `NotifyError::RateLimited` if the window is full; no outbound call is made.
    /// - `NotifyError::Transport` with the transport's error, unmodified. The
    ///   slot consumed by the attempt is not given back.
    pub async fn send(&self, message: Message) -> Result<String, NotifyError> {
        let outbound = self.prepare(message)?;

        if !self.rate_limiter.is_available() {
            warn!(
                "Rate limit reached ({} calls per {}s), discarding message",
                self.rate_limiter.max_calls(),
                self.rate_limiter.window().num_seconds()
            );
            return Err(NotifyError::RateLimited);
        }

        match self.transport.send_text(&outbound).await {
            Ok(body) => {
                info!("Delivered message <{}>", outbound.content);
                Ok(body)
            }
            Err(e) => {
                error!("Failed to deliver message <{}>: {}", outbound.content, e);
                Err(e.into())
            }
        }
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    pub fn defaults(&self) -> &NotifierDefaults {
        &self.defaults
    }

    /// Apply send-time rules and resolve credentials
    fn prepare(&self, message: Message) -> Result<OutboundMessage, NotifyError> {
        if message.content.trim().is_empty() {
            return Err(NotifyError::Validation(
                "message content is empty".to_string(),
            ));
        }

        let credentials = message
            .override_credentials()
            .unwrap_or_else(|| self.defaults.credentials.clone());

        let mut mentions = self.defaults.mentions.clone();
        if let Some(extra) = message.mentions {
            mentions.extend(extra);
        }
        mentions.retain(|m| !m.trim().is_empty());

        let content = match message.app.as_deref() {
            Some(app) if !app.is_empty() => format!("{}\n{}", app, message.content),
            _ => message.content,
        };

        Ok(OutboundMessage {
            content,
            mentions,
            mention_all: message.mention_all.unwrap_or(self.defaults.mention_all),
            credentials,
        })
    }
}
