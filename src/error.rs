//! Error types for the Paprika gateway

use std::io;

use thiserror::Error;

/// Result type alias for the Paprika gateway
pub type Result<T> = std::result::Result<T, Error>;

/// Paprika gateway errors
#[derive(Error, Debug)]
pub enum Error {
    /// Connection failure or request timeout; safe for the caller to retry
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-2xx response from the API
    #[error("Remote error {status}: {}", message.as_deref().unwrap_or(body))]
    Remote {
        /// HTTP status code
        status: u16,
        /// Raw response body
        body: String,
        /// Message extracted from an `{error, message}` body, if present
        message: Option<String>,
    },

    /// Response body did not match the expected schema
    #[error("Decode error: {0}")]
    Decode(String),

    /// The caller's cancellation token or deadline fired
    #[error("Operation cancelled")]
    Cancelled,

    /// Caller-supplied argument the API cannot address (e.g. an empty id)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a remote error from a status and raw body
    ///
    /// An `{error, message}` body is unpacked into `message`; anything else
    /// is kept verbatim in `body`.
    #[must_use]
    pub fn remote(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        let message = serde_json::from_str::<paprika_core::ApiErrorBody>(&body)
            .ok()
            .map(|e| match e.message {
                Some(m) if !m.is_empty() => format!("{}: {m}", e.error),
                _ => e.error,
            });
        Self::Remote {
            status,
            body,
            message,
        }
    }

    /// Whether the caller may retry the failed operation
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Whether this is the shared cancellation signal
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// HTTP status for remote errors
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_error_unpacks_api_body() {
        let err = Error::remote(404, r#"{"error":"not_found","message":"pool missing"}"#);
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "Remote error 404: not_found: pool missing");
    }

    #[test]
    fn remote_error_keeps_plain_body() {
        let err = Error::remote(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Remote error 502: Bad Gateway");
        assert!(!err.is_retryable());
    }

    #[test]
    fn only_transport_is_retryable() {
        assert!(Error::Transport("reset".into()).is_retryable());
        assert!(!Error::Decode("bad".into()).is_retryable());
        assert!(!Error::Cancelled.is_retryable());
        assert!(Error::Cancelled.is_cancelled());
    }

    #[test]
    fn json_errors_map_to_decode() {
        let err: Error = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, Error::Decode(_)));
    }
}
