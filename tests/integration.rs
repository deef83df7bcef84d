//! Integration tests for Paprika Gateway

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use paprika_gateway::config::Config;
use paprika_gateway::transport::{RawResponse, Transport};
use paprika_gateway::{CancellationToken, Error, PaprikaClient, ResponseCache, Result, deadline};
use pretty_assertions::assert_eq;
use serde_json::json;

/// Canned API: three networks, `solana` hangs past any sane timeout
struct FakeApi {
    calls: AtomicUsize,
}

impl FakeApi {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn pools_body(network: &str, n: usize) -> String {
    let pools: Vec<_> = (0..n)
        .map(|i| {
            json!({
                "id": format!("{network}-pool-{i}"),
                "dex_name": "uniswap_v3",
                "volume_usd": 1000.0 * (i + 1) as f64,
                "last_price_change_usd_24h": i as f64 - 2.0,
            })
        })
        .collect();
    json!({ "pools": pools, "page_info": { "page": 0, "limit": n, "total_items": n } }).to_string()
}

#[async_trait]
impl Transport for FakeApi {
    async fn get(&self, path: &str, _query: &[(String, String)]) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match path {
            "/networks" => Ok(RawResponse::new(
                200,
                json!([
                    { "id": "ethereum", "display_name": "Ethereum" },
                    { "id": "solana", "display_name": "Solana" },
                    { "id": "polygon", "display_name": "Polygon" },
                ])
                .to_string(),
            )),
            "/stats" => Ok(RawResponse::new(
                200,
                json!({ "chains": 3, "factories": 10, "pools": 15, "tokens": 40 }).to_string(),
            )),
            "/networks/solana/pools" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(RawResponse::new(200, pools_body("solana", 5)))
            }
            "/networks/missing/pools" => Ok(RawResponse::new(
                404,
                json!({ "error": "not_found", "message": "network not found" }).to_string(),
            )),
            other => match other
                .strip_prefix("/networks/")
                .and_then(|rest| rest.strip_suffix("/pools"))
            {
                Some(network) => Ok(RawResponse::new(200, pools_body(network, 5))),
                None => Ok(RawResponse::new(404, "{}")),
            },
        }
    }
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.api.request_timeout = Duration::from_millis(200);
    config
}

fn networks(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| (*s).to_string()).collect()
}

#[tokio::test]
async fn test_multiple_pools_isolates_slow_network() {
    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&test_config(), api.clone())
        .await
        .unwrap();

    let cancel = deadline(Duration::from_secs(2));
    let started = Instant::now();
    let results = client
        .multiple_pools(&networks(&["ethereum", "solana", "polygon"]), 5, &cancel)
        .await
        .unwrap()
        .into_map();

    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(results.len(), 3);
    assert_eq!(results["ethereum"].as_ref().unwrap().len(), 5);
    assert_eq!(results["polygon"].as_ref().unwrap().len(), 5);
    assert!(matches!(results["solana"], Err(Error::Transport(_))));
}

#[tokio::test]
async fn test_remote_error_is_per_target() {
    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&test_config(), api.clone())
        .await
        .unwrap();

    let results = client
        .multiple_pools(&networks(&["ethereum", "missing"]), 5, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.succeeded(), 1);
    assert_eq!(results.failed(), 1);
    let failure = results.failures().next().unwrap();
    assert_eq!(failure.0, "missing");
    assert_eq!(failure.1.status(), Some(404));
}

#[tokio::test]
async fn test_repeat_batch_served_from_cache() {
    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&test_config(), api.clone())
        .await
        .unwrap();
    let targets = networks(&["ethereum", "polygon"]);

    client
        .multiple_pools(&targets, 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(api.calls(), 2);

    let again = client
        .multiple_pools(&targets, 5, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(again.succeeded(), 2);
    assert_eq!(api.calls(), 2);

    let stats = client.cache_stats().unwrap();
    assert_eq!(stats.hits, 2);
    assert_eq!(stats.misses, 2);
}

#[tokio::test]
async fn test_cancel_before_batch_touches_nothing() {
    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&test_config(), api.clone())
        .await
        .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = client
        .multiple_pools(&networks(&["ethereum", "polygon"]), 5, &cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn test_market_overview_omits_failed_network() {
    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&test_config(), api.clone())
        .await
        .unwrap();

    let overview = client
        .market_overview(&CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(overview.system_stats.chains, 3);
    let keys: Vec<&str> = overview.networks.keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["ethereum", "polygon"]);
    let eth = &overview.networks["ethereum"];
    assert_eq!(eth.display_name, "Ethereum");
    assert_eq!(eth.pool_count, 5);
    assert!((eth.total_volume - 15_000.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_global_cache_shared_between_clients() {
    let first_api = FakeApi::new();
    let second_api = FakeApi::new();
    let config = test_config();

    let first = PaprikaClient::with_transport(&config, first_api.clone())
        .await
        .unwrap()
        .with_cache(ResponseCache::global());
    let second = PaprikaClient::with_transport(&config, second_api.clone())
        .await
        .unwrap()
        .with_cache(ResponseCache::global());

    // A network name no other test uses keeps the process-wide cache isolated.
    let targets = networks(&["shared-cache-net"]);
    first
        .multiple_pools(&targets, 3, &CancellationToken::new())
        .await
        .unwrap();
    let results = second
        .multiple_pools(&targets, 3, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(results.succeeded(), 1);
    assert_eq!(first_api.calls(), 1);
    assert_eq!(second_api.calls(), 0);
}

#[tokio::test]
async fn test_disabled_cache_always_fetches() {
    let api = FakeApi::new();
    let mut config = test_config();
    config.cache.enabled = false;
    let client = PaprikaClient::with_transport(&config, api.clone())
        .await
        .unwrap();

    for _ in 0..3 {
        client.networks(&CancellationToken::new()).await.unwrap();
    }
    assert_eq!(api.calls(), 3);
    assert!(client.cache_stats().is_none());
}

#[tokio::test]
async fn test_disk_mirror_survives_client_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config();
    config.cache.directory = Some(dir.path().display().to_string());

    let api = FakeApi::new();
    let client = PaprikaClient::with_transport(&config, api.clone())
        .await
        .unwrap();
    let networks = client.networks(&CancellationToken::new()).await.unwrap();
    assert_eq!(networks.len(), 3);
    assert_eq!(api.calls(), 1);

    let fresh_api = FakeApi::new();
    let restarted = PaprikaClient::with_transport(&config, fresh_api.clone())
        .await
        .unwrap();
    let again = restarted.networks(&CancellationToken::new()).await.unwrap();
    assert_eq!(again, networks);
    assert_eq!(fresh_api.calls(), 0);
}

#[test]
fn test_config_defaults() {
    let config = Config::default();
    assert_eq!(config.api.base_url, "https://api.dexpaprika.com");
    assert_eq!(config.cache.ttl, Duration::from_secs(300));
    assert!(config.cache.enabled);
    assert!(config.batch.max_concurrency.is_none());
    config.validate().unwrap();
}
