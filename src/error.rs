use thiserror::Error;

/// Errors returned by [`Notifier::send`](crate::notify::Notifier::send)
#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("Invalid message: {0}")]
    Validation(String),

    #[error("quota exceeded for the current window")]
    RateLimited,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors that can occur while calling the robot webhook
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Webhook returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Webhook rejected message (errcode {code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limited_message() {
        assert_eq!(
            NotifyError::RateLimited.to_string(),
            "quota exceeded for the current window"
        );
    }

    #[test]
    fn test_transport_error_is_passed_through_verbatim() {
        let err = TransportError::Rejected {
            code: 310000,
            message: "keywords not in content".to_string(),
        };
        let wrapped: NotifyError = err.clone().into();
        assert_eq!(wrapped.to_string(), err.to_string());
    }
}
