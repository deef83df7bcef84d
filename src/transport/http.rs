//! HTTP transport backed by `reqwest`

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use tracing::debug;
use url::Url;

use super::{RawResponse, Transport};
use crate::{Error, Result};

/// HTTP transport for the market-data REST API
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a new HTTP transport
    ///
    /// `timeout` bounds each request end to end; expiry surfaces as
    /// [`Error::Transport`].
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid base URL '{base_url}': {e}")))?;

        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .user_agent(concat!("paprika-gateway/", env!("CARGO_PKG_VERSION")))
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| Error::Transport(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    /// Base URL requests are resolved against
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join an endpoint path onto the base URL, keeping any base path prefix
    fn url_for(&self, path: &str) -> Result<Url> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{base}/{path}"))
            .map_err(|e| Error::Transport(format!("Invalid request path '{path}': {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, path: &str, query: &[(String, String)]) -> Result<RawResponse> {
        let url = self.url_for(path)?;
        debug!(url = %url, params = query.len(), "GET");

        let response = self.client.get(url).query(query).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(RawResponse { status, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_paths_onto_base() {
        let t = HttpTransport::new("https://api.dexpaprika.com", Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.url_for("/networks/ethereum/pools").unwrap().as_str(),
            "https://api.dexpaprika.com/networks/ethereum/pools"
        );
    }

    #[test]
    fn keeps_base_path_prefix() {
        let t = HttpTransport::new("http://localhost:8080/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(t.url_for("/stats").unwrap().as_str(), "http://localhost:8080/v1/stats");
    }

    #[test]
    fn keeps_escaped_segments_escaped() {
        let t = HttpTransport::new("https://api.dexpaprika.com", Duration::from_secs(5)).unwrap();
        assert_eq!(
            t.url_for("/networks/..%2Fstats/pools").unwrap().as_str(),
            "https://api.dexpaprika.com/networks/..%2Fstats/pools"
        );
    }

    #[test]
    fn rejects_invalid_base() {
        let err = HttpTransport::new("::nope::", Duration::from_secs(5)).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn raw_response_success_range() {
        assert!(RawResponse::new(200, "").is_success());
        assert!(RawResponse::new(204, "").is_success());
        assert!(!RawResponse::new(404, "").is_success());
        assert!(!RawResponse::new(500, "").is_success());
    }
}
