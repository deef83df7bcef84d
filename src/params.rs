//! Request paths and query parameters shared by the API endpoints

use paprika_core::{Interval, PoolField};
use url::Url;

use crate::{Error, Result};

/// Build an endpoint path from literal and caller-supplied segments
///
/// Each segment is percent-encoded, so ids containing `/`, `?`, `#` or `%`
/// stay inside their own segment. Empty, `.` and `..` segments are rejected.
///
/// # Errors
///
/// [`Error::InvalidInput`] for a segment that cannot be addressed.
pub fn api_path(segments: &[&str]) -> Result<String> {
    let mut url = Url::parse("http://localhost/").map_err(|e| Error::Internal(e.to_string()))?;
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|()| Error::Internal("path base cannot hold segments".into()))?;
        path.clear();
        for segment in segments {
            if matches!(*segment, "" | "." | "..") {
                return Err(Error::InvalidInput(format!(
                    "'{segment}' is not a valid path segment"
                )));
            }
            path.push(segment);
        }
    }
    Ok(url.path().to_string())
}

/// Optional query parameters for an API request
///
/// Unset fields are omitted from the query string and from the cache
/// fingerprint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    /// `asc` or `desc`
    pub sort: Option<String>,
    pub order_by: Option<String>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub interval: Option<String>,
    pub inversed: Option<bool>,
    pub cursor: Option<String>,
    pub reorder: Option<bool>,
    pub address: Option<String>,
    /// Free-text search term
    pub query: Option<String>,
}

impl ApiParams {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Order by a pool field using its wire name
    #[must_use]
    pub fn order_by(mut self, field: PoolField) -> Self {
        self.order_by = Some(field.as_str().to_string());
        self
    }

    #[must_use]
    pub fn start(mut self, start: impl Into<String>) -> Self {
        self.start = Some(start.into());
        self
    }

    #[must_use]
    pub fn end(mut self, end: impl Into<String>) -> Self {
        self.end = Some(end.into());
        self
    }

    #[must_use]
    pub fn interval(mut self, interval: Interval) -> Self {
        self.interval = Some(interval.as_str().to_string());
        self
    }

    #[must_use]
    pub fn inversed(mut self, inversed: bool) -> Self {
        self.inversed = Some(inversed);
        self
    }

    #[must_use]
    pub fn cursor(mut self, cursor: impl Into<String>) -> Self {
        self.cursor = Some(cursor.into());
        self
    }

    #[must_use]
    pub fn reorder(mut self, reorder: bool) -> Self {
        self.reorder = Some(reorder);
        self
    }

    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    #[must_use]
    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set `key=value` pairs, sorted by key
    #[must_use]
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        let optional = [
            ("address", self.address.clone()),
            ("cursor", self.cursor.clone()),
            ("end", self.end.clone()),
            ("interval", self.interval.clone()),
            ("inversed", self.inversed.map(|b| b.to_string())),
            ("limit", self.limit.map(|n| n.to_string())),
            ("order_by", self.order_by.clone()),
            ("page", self.page.map(|n| n.to_string())),
            ("query", self.query.clone()),
            ("reorder", self.reorder.map(|b| b.to_string())),
            ("sort", self.sort.clone()),
            ("start", self.start.clone()),
        ];

        optional
            .into_iter()
            .filter_map(|(key, value)| value.map(|v| (key.to_string(), v)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn api_path_keeps_plain_ids() {
        assert_eq!(
            api_path(&["networks", "ethereum", "pools", "0xabc"]).unwrap(),
            "/networks/ethereum/pools/0xabc"
        );
    }

    #[test]
    fn api_path_escapes_ids_into_one_segment() {
        assert_eq!(
            api_path(&["networks", "../stats", "pools"]).unwrap(),
            "/networks/..%2Fstats/pools"
        );
        assert_eq!(
            api_path(&["networks", "eth", "tokens", "a?b#c%d"]).unwrap(),
            "/networks/eth/tokens/a%3Fb%23c%25d"
        );
    }

    #[test]
    fn api_path_rejects_unaddressable_segments() {
        for bad in ["", ".", ".."] {
            let err = api_path(&["networks", bad, "pools"]).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "accepted {bad:?}");
        }
    }

    #[test]
    fn empty_params_have_no_pairs() {
        assert!(ApiParams::new().to_query_pairs().is_empty());
    }

    #[test]
    fn pairs_are_sorted_and_skip_unset() {
        let params = ApiParams::new()
            .sort("desc")
            .limit(10)
            .order_by(PoolField::VolumeUsd)
            .inversed(true);

        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("inversed".to_string(), "true".to_string()),
                ("limit".to_string(), "10".to_string()),
                ("order_by".to_string(), "volume_usd".to_string()),
                ("sort".to_string(), "desc".to_string()),
            ]
        );
    }

    #[test]
    fn ohlcv_params() {
        let params = ApiParams::new()
            .start("2025-01-01")
            .end("2025-01-02")
            .interval(Interval::H1);
        let pairs = params.to_query_pairs();
        assert_eq!(pairs[0], ("end".to_string(), "2025-01-02".to_string()));
        assert_eq!(pairs[1], ("interval".to_string(), "1h".to_string()));
        assert_eq!(pairs[2], ("start".to_string(), "2025-01-01".to_string()));
    }
}
