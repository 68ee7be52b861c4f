/// Error types for the relay
pub mod error;

/// Inbound and outbound message types
pub mod message;

/// Rate limiter and notifier
pub mod notify;

/// Robot webhook transports
pub mod transport;

/// HTTP routes
pub mod server;

/// Configuration management
pub mod config;

/// Logger setup
pub mod logging;

/// Banner and build information
pub mod version;

// Re-export commonly used types
pub use error::{ConfigError, NotifyError, TransportError};
pub use message::{Message, OutboundMessage, WebhookCredentials};
pub use notify::{Notifier, NotifierDefaults, RateLimiter};
