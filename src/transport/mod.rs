//! Transport implementations for the market-data API

mod http;

pub use self::http::HttpTransport;

use async_trait::async_trait;

use crate::Result;

/// Raw HTTP response handed back to the gateway
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Response body as text
    pub body: String,
}

impl RawResponse {
    /// Build a response from a status and body
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is 2xx
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Transport trait for issuing GET requests against the API
///
/// Implementations report connection failures and timeouts as
/// [`crate::Error::Transport`]; any HTTP status, including errors, is a
/// successful [`RawResponse`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Issue `GET {base}{path}?{query}`
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<RawResponse>;
}

#[cfg(test)]
pub(crate) mod mock;
