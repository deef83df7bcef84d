//! Request gateway
//!
//! A single logical request: cache lookup, then on a miss a transport call,
//! status check, schema decode and cache fill. Safe to call concurrently; the
//! batch dispatcher runs many of these side by side.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::cache::{DiskMirror, Fingerprint, ResponseCache};
use crate::params::ApiParams;
use crate::transport::Transport;
use crate::{Error, Result};

/// Cache-fronted access to the remote API
#[derive(Clone)]
pub struct RequestGateway {
    transport: Arc<dyn Transport>,
    cache: Option<Arc<ResponseCache>>,
    mirror: Option<DiskMirror>,
    request_timeout: Duration,
}

impl RequestGateway {
    /// Create a gateway without a cache
    pub fn new(transport: Arc<dyn Transport>, request_timeout: Duration) -> Self {
        Self {
            transport,
            cache: None,
            mirror: None,
            request_timeout,
        }
    }

    /// Front requests with a (possibly shared) response cache
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Mirror cache writes to disk and consult the mirror on memory misses
    ///
    /// Has no effect unless a cache is also configured.
    #[must_use]
    pub fn with_mirror(mut self, mirror: DiskMirror) -> Self {
        self.mirror = Some(mirror);
        self
    }

    /// The response cache, if any
    pub fn cache(&self) -> Option<&Arc<ResponseCache>> {
        self.cache.as_ref()
    }

    /// Fetch `endpoint` and decode the body as `T`
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] if `cancel` fires before or during the call
    /// - [`Error::Transport`] on connection failure or when the request
    ///   outlives the configured timeout
    /// - [`Error::Remote`] for a non-2xx status
    /// - [`Error::Decode`] when the body does not match `T` (nothing is cached)
    pub async fn fetch<T>(
        &self,
        endpoint: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request(endpoint, params, cancel, true).await
    }

    /// Like [`fetch`](Self::fetch) but always goes to the transport
    ///
    /// A successful response still replaces the cached entry. Used by
    /// pollers that need a live value on every tick.
    pub async fn refresh<T>(
        &self,
        endpoint: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        self.request(endpoint, params, cancel, false).await
    }

    async fn request<T>(
        &self,
        endpoint: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
        use_cached: bool,
    ) -> Result<T>
    where
        T: DeserializeOwned,
    {
        let query = params.to_query_pairs();
        let fingerprint = Fingerprint::new(endpoint, &query);

        if use_cached {
            if let Some(decoded) = self.lookup(&fingerprint, endpoint).await {
                return Ok(decoded);
            }
        }

        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let call = tokio::time::timeout(self.request_timeout, self.transport.get(endpoint, &query));
        let response = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(Error::Cancelled),
            res = call => res.map_err(|_| {
                Error::Transport(format!(
                    "Request to {endpoint} timed out after {}ms",
                    self.request_timeout.as_millis()
                ))
            })??,
        };

        if !response.is_success() {
            debug!(endpoint = %endpoint, status = response.status, "Remote error");
            return Err(Error::remote(response.status, response.body));
        }

        let value: Value = serde_json::from_str(&response.body)?;
        let decoded: T = serde_json::from_value(value.clone())?;
        self.store(fingerprint, endpoint, value).await;

        Ok(decoded)
    }

    /// Cached value for `fingerprint`, decoded as `T`
    ///
    /// A memory or mirror value that does not decode as `T` counts as a miss
    /// and is never promoted, so the caller goes to the transport.
    async fn lookup<T>(&self, fingerprint: &Fingerprint, endpoint: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let cache = self.cache.as_ref()?;

        if let Some(value) = cache.get(fingerprint) {
            match serde_json::from_value(value) {
                Ok(decoded) => {
                    debug!(endpoint = %endpoint, "Cache hit");
                    return Some(decoded);
                }
                Err(e) => warn!(endpoint = %endpoint, error = %e, "Cached value does not decode, refetching"),
            }
        }

        let mirror = self.mirror.as_ref()?;
        let (value, age) = mirror.load(fingerprint, cache.ttl()).await?;
        match serde_json::from_value(value.clone()) {
            Ok(decoded) => {
                debug!(endpoint = %endpoint, age_ms = age.as_millis(), "Cache hit (disk mirror)");
                cache.put_with_age(fingerprint.clone(), value, age);
                Some(decoded)
            }
            Err(e) => {
                warn!(endpoint = %endpoint, error = %e, "Mirrored value does not decode, refetching");
                None
            }
        }
    }

    async fn store(&self, fingerprint: Fingerprint, endpoint: &str, value: Value) {
        let Some(cache) = self.cache.as_ref() else {
            return;
        };

        if let Some(mirror) = self.mirror.as_ref() {
            if let Err(e) = mirror.store(&fingerprint, endpoint, &value).await {
                warn!(endpoint = %endpoint, error = %e, "Failed to write cache mirror");
            }
        }

        debug!(endpoint = %endpoint, fingerprint = %fingerprint, "Cache fill");
        cache.put(fingerprint, value);
    }
}
