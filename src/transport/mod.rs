/// Robot webhook transports
pub mod mock;
pub mod robot;

pub use mock::MockTransport;
pub use robot::RobotWebhookTransport;

use crate::error::TransportError;
use crate::message::OutboundMessage;
use std::future::Future;
use std::pin::Pin;

/// Outbound webhook client
///
/// Implementations perform exactly one delivery attempt per call and return
/// the raw response body on success.
pub trait WebhookTransport: Send + Sync {
    fn send_text<'a>(
        &'a self,
        message: &'a OutboundMessage,
    ) -> Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>>;
}
