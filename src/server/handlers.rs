//! HTTP handlers for the relay.
//!
//! Requests are decoded into a [`Message`] and handed to the notifier; its
//! outcome is mapped to a status code and a plain-text body.

use crate::error::NotifyError;
use crate::message::Message;
use crate::notify::Notifier;
use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Form, Json,
};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body returned when the limiter discards a message
pub const RATE_LIMITED_NOTICE: &str = "rate limit exceeded, message discarded";

/// Shared application state.
pub struct AppState {
    pub notifier: Notifier,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
    pub remaining_quota: usize,
}

/// Form and query-string encoding of a message.
///
/// `at` is a comma-separated list here, since repeated keys do not decode
/// into a sequence.
#[derive(Debug, Default, Deserialize)]
struct MessageForm {
    #[serde(default)]
    content: String,
    #[serde(default)]
    at: Option<String>,
    #[serde(default)]
    app: Option<String>,
    #[serde(default)]
    at_all: Option<bool>,
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    secret: Option<String>,
}

impl From<MessageForm> for Message {
    fn from(form: MessageForm) -> Self {
        Message {
            content: form.content,
            mentions: form.at.map(|at| {
                at.split(',')
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .map(String::from)
                    .collect()
            }),
            app: form.app,
            mention_all: form.at_all,
            token: form.token,
            secret: form.secret,
        }
    }
}

/// Message decoded from a JSON body, a form body or the query string.
pub struct InboundMessage(pub Message);

#[async_trait]
impl<S> FromRequest<S> for InboundMessage
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.split(';').next().unwrap_or(ct).trim().to_lowercase());

        match content_type.as_deref() {
            Some("application/json") => {
                let Json(message) = Json::<Message>::from_request(req, state)
                    .await
                    .map_err(|rejection| {
                        warn!("Rejected JSON payload: {}", rejection.body_text());
                        (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
                    })?;
                Ok(Self(message))
            }
            Some("application/x-www-form-urlencoded") => {
                let Form(form) = Form::<MessageForm>::from_request(req, state)
                    .await
                    .map_err(|rejection| {
                        warn!("Rejected form payload: {}", rejection.body_text());
                        (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
                    })?;
                Ok(Self(form.into()))
            }
            _ => {
                let (mut parts, _body) = req.into_parts();
                let Query(form) = Query::<MessageForm>::from_request_parts(&mut parts, state)
                    .await
                    .map_err(|rejection| {
                        warn!("Rejected query string: {}", rejection.body_text());
                        (StatusCode::BAD_REQUEST, rejection.body_text()).into_response()
                    })?;
                Ok(Self(form.into()))
            }
        }
    }
}

/// Relay a message to the robot webhook.
pub async fn relay(
    State(state): State<Arc<AppState>>,
    InboundMessage(message): InboundMessage,
) -> Response {
    debug!(
        "Relaying message: app={:?}, at={:?}, {} bytes",
        message.app,
        message.mentions,
        message.content.len()
    );

    match state.notifier.send(message).await {
        Ok(body) => {
            info!("Relay succeeded");
            (StatusCode::OK, body).into_response()
        }
        Err(err @ NotifyError::Validation(_)) => {
            warn!("Rejected invalid message: {}", err);
            (StatusCode::BAD_REQUEST, err.to_string()).into_response()
        }
        Err(NotifyError::RateLimited) => {
            warn!("Discarded message: {}", NotifyError::RateLimited);
            (StatusCode::TOO_MANY_REQUESTS, RATE_LIMITED_NOTICE).into_response()
        }
        Err(NotifyError::Transport(err)) => {
            error!("Relay failed: {}", err);
            (StatusCode::BAD_GATEWAY, err.to_string()).into_response()
        }
    }
}

/// Health check endpoint.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        remaining_quota: state.notifier.rate_limiter().remaining(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_mentions_split() {
        let form = MessageForm {
            content: "hi".to_string(),
            at: Some("138, 139,,".to_string()),
            ..Default::default()
        };

        let message: Message = form.into();
        assert_eq!(
            message.mentions,
            Some(vec!["138".to_string(), "139".to_string()])
        );
    }

    #[test]
    fn test_form_without_at_has_no_mentions() {
        let message: Message = MessageForm {
            content: "hi".to_string(),
            ..Default::default()
        }
        .into();

        assert_eq!(message.mentions, None);
        assert_eq!(message.content, "hi");
    }
}
