use crate::error::TransportError;
use crate::message::OutboundMessage;
use crate::transport::WebhookTransport;
use log::info;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Body returned by the mock when no responses are configured
pub const MOCK_OK_BODY: &str = r#"{"errcode":0,"errmsg":"ok"}"#;

/// In-process transport that records messages instead of sending them
///
/// Backs `--dry-run` and tests. Responses are returned in order, cycling back
/// to the first after the last. Clones share recorded calls.
#[derive(Debug, Clone)]
pub struct MockTransport {
    responses: Arc<Vec<Result<String, TransportError>>>,
    current_index: Arc<Mutex<usize>>,
    calls: Arc<Mutex<Vec<OutboundMessage>>>,
    delay: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MockTransport {
    /// Create a mock that always answers with `response`
    pub fn with_response(response: Result<String, TransportError>) -> Self {
        Self::with_responses(vec![response])
    }

    /// Create a mock answering with `responses` in rotation
    pub fn with_responses(responses: Vec<Result<String, TransportError>>) -> Self {
        Self {
            responses: Arc::new(responses),
            current_index: Arc::new(Mutex::new(0)),
            calls: Arc::new(Mutex::new(Vec::new())),
            delay: None,
        }
    }

    /// Create a mock that accepts every message
    pub fn success() -> Self {
        Self::with_response(Ok(MOCK_OK_BODY.to_string()))
    }

    /// Create a mock that fails every message
    pub fn error(error: TransportError) -> Self {
        Self::with_response(Err(error))
    }

    /// Delay every response
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of times `send_text` has been called
    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    /// All messages received so far
    pub fn calls(&self) -> Vec<OutboundMessage> {
        lock(&self.calls).clone()
    }

    pub fn last_call(&self) -> Option<OutboundMessage> {
        lock(&self.calls).last().cloned()
    }

    fn next_response(&self) -> Result<String, TransportError> {
        if self.responses.is_empty() {
            return Ok(MOCK_OK_BODY.to_string());
        }

        let mut index = lock(&self.current_index);
        let response = self.responses[*index % self.responses.len()].clone();
        *index += 1;
        response
    }
}

impl WebhookTransport for MockTransport {
    fn send_text<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>> {
        Box::pin(async move {
            lock(&self.calls).push(message.clone());
            info!(
                "MOCK WEBHOOK - token: {}, at: {:?}, at_all: {}, content: {}",
                message.credentials.token, message.mentions, message.mention_all, message.content
            );

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            self.next_response()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::WebhookCredentials;

    fn outbound(content: &str) -> OutboundMessage {
        OutboundMessage {
            content: content.to_string(),
            mentions: Vec::new(),
            mention_all: false,
            credentials: WebhookCredentials::new("tok", "sec"),
        }
    }

    #[tokio::test]
    async fn test_mock_records_calls() {
        let transport = MockTransport::success();

        let body = transport.send_text(&outbound("one")).await.unwrap();
        assert_eq!(body, MOCK_OK_BODY);
        transport.send_text(&outbound("two")).await.unwrap();

        assert_eq!(transport.call_count(), 2);
        assert_eq!(transport.last_call().unwrap().content, "two");
    }

    #[tokio::test]
    async fn test_mock_cycles_responses() {
        let transport = MockTransport::with_responses(vec![
            Ok("first".to_string()),
            Err(TransportError::Http("boom".to_string())),
        ]);

        assert_eq!(transport.send_text(&outbound("a")).await.unwrap(), "first");
        assert!(transport.send_text(&outbound("b")).await.is_err());
        assert_eq!(transport.send_text(&outbound("c")).await.unwrap(), "first");
    }

    #[tokio::test]
    async fn test_mock_clones_share_calls() {
        let transport = MockTransport::success();
        let observer = transport.clone();

        transport.send_text(&outbound("a")).await.unwrap();
        assert_eq!(observer.call_count(), 1);
    }
}
