use crate::error::TransportError;
use crate::message::OutboundMessage;
use crate::transport::WebhookTransport;
use log::{debug, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

/// Default robot webhook endpoint
pub const DEFAULT_WEBHOOK_URL: &str = "https://oapi.dingtalk.com/robot/send";

/// Default request timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// HTTP client for a chat robot webhook
///
/// Posts a text message to `{base_url}?access_token={token}` and checks the
/// `errcode` field of the JSON reply.
pub struct RobotWebhookTransport {
    client: Client,
    base_url: String,
}

/// Request body for a text message
#[derive(Debug, Serialize)]
struct RobotRequest<'a> {
    msgtype: &'static str,
    text: RobotText<'a>,
    at: RobotAt<'a>,
}

#[derive(Debug, Serialize)]
struct RobotText<'a> {
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct RobotAt<'a> {
    #[serde(rename = "atMobiles")]
    at_mobiles: &'a [String],
    #[serde(rename = "isAtAll")]
    is_at_all: bool,
}

/// Reply from the robot webhook
#[derive(Debug, Deserialize)]
struct RobotResponse {
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl RobotWebhookTransport {
    /// Create a new robot webhook transport
    ///
    /// # Arguments
    /// * `base_url` - Webhook endpoint without query string
    /// * `timeout` - Per-request timeout
    ///
    /// # Errors
    ///
    /// Returns `TransportError::ClientBuild` if the HTTP client cannot be created.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::ClientBuild(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Create a transport for the default endpoint
    pub fn with_defaults() -> Result<Self, TransportError> {
        Self::new(
            DEFAULT_WEBHOOK_URL,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn build_request(message: &OutboundMessage) -> RobotRequest<'_> {
        RobotRequest {
            msgtype: "text",
            text: RobotText {
                content: &message.content,
            },
            at: RobotAt {
                at_mobiles: &message.mentions,
                is_at_all: message.mention_all,
            },
        }
    }

    /// Interpret a successful HTTP reply body
    fn check_response(body: &str) -> Result<(), TransportError> {
        let reply: RobotResponse = serde_json::from_str(body).map_err(|e| {
            TransportError::InvalidResponse(format!("{}: {}", e, body.trim()))
        })?;

        if reply.errcode != 0 {
            return Err(TransportError::Rejected {
                code: reply.errcode,
                message: reply.errmsg,
            });
        }

        Ok(())
    }
}

impl WebhookTransport for RobotWebhookTransport {
    fn send_text<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            let request = Self::build_request(message);
            debug!(
                "Posting to {}: {}",
                self.base_url,
                serde_json::to_string(&request).unwrap_or_default()
            );

            let response = self
                .client
                .post(&self.base_url)
                .query(&[("access_token", message.credentials.token.as_str())])
                .json(&request)
                .send()
                .await
                .map_err(|e| TransportError::Http(e.to_string()))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| TransportError::Http(format!("Failed to read body: {}", e)))?;

            if !status.is_success() {
                return Err(TransportError::Status {
                    status: status.as_u16(),
                    body,
                });
            }

            Self::check_response(&body)?;
            info!("Webhook accepted message, response: {}", body.trim());
            Ok(body)
        })
    }
}
