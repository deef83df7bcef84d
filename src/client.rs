//! Typed DexPaprika client
//!
//! One method per API endpoint, each decoding into an explicit schema, plus
//! composite helpers and batch operations built on the request gateway and
//! the batch dispatcher.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use paprika_core::analytics::{
    DexDistribution, LiquidityAnalysis, dex_distribution, filter_by_volume,
    liquidity_distribution,
};
use paprika_core::{
    DexesPage, Network, OhlcvBar, Pool, PoolField, PoolsPage, SearchResults, SystemStats, Token,
    TransactionsPage,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::batch::{BatchDispatcher, BatchResults};
use crate::cache::{CacheStatsSnapshot, DiskMirror, ResponseCache};
use crate::config::Config;
use crate::gateway::RequestGateway;
use crate::params::{ApiParams, api_path};
use crate::transport::{HttpTransport, Transport};
use crate::{Error, Result};

/// Networks covered by [`PaprikaClient::market_overview`]
const OVERVIEW_NETWORKS: usize = 5;
/// Pools sampled per network for the overview
const OVERVIEW_POOLS: u32 = 10;
/// Pools pulled for a token liquidity report
const LIQUIDITY_POOLS: u32 = 50;

/// Per-network summary in a [`MarketOverview`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkOverview {
    pub display_name: String,
    /// Volume summed over the sampled pools
    pub total_volume: f64,
    pub pool_count: usize,
}

/// System stats plus a sample of the leading networks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOverview {
    pub system_stats: SystemStats,
    /// Networks whose pools could be fetched; failures are omitted
    pub networks: BTreeMap<String, NetworkOverview>,
    pub timestamp: DateTime<Utc>,
}

/// Liquidity picture of one token across its pools
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenLiquidityReport {
    pub token: Token,
    pub pools_count: usize,
    /// Unset when the token has no pools
    pub liquidity: Option<LiquidityAnalysis>,
    pub largest_pool: Option<Pool>,
    pub dex_distribution: Option<DexDistribution>,
}

/// One observation from [`PaprikaClient::monitor_prices`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub pool_id: String,
    pub price_usd: f64,
    pub price_change_24h: f64,
    pub volume_usd: f64,
    pub timestamp: DateTime<Utc>,
}

/// DexPaprika API client
#[derive(Clone)]
pub struct PaprikaClient {
    gateway: RequestGateway,
    dispatcher: BatchDispatcher,
}

impl PaprikaClient {
    /// Build a client talking HTTP to `config.api.base_url`
    pub async fn new(config: &Config) -> Result<Self> {
        let transport = HttpTransport::new(&config.api.base_url, config.api.request_timeout)?;
        Self::with_transport(config, Arc::new(transport)).await
    }

    /// Build a client over any transport
    ///
    /// Creates a private response cache when caching is enabled and opens the
    /// disk mirror when a cache directory is configured.
    pub async fn with_transport(config: &Config, transport: Arc<dyn Transport>) -> Result<Self> {
        let mut gateway = RequestGateway::new(transport, config.api.request_timeout);

        if config.cache.enabled {
            gateway = gateway.with_cache(Arc::new(ResponseCache::new(config.cache.ttl)));
            if let Some(dir) = config.cache.resolved_directory() {
                gateway = gateway.with_mirror(DiskMirror::open(dir).await?);
            }
        }

        Ok(Self::from_parts(
            gateway,
            BatchDispatcher::new(config.batch.max_concurrency),
        ))
    }

    /// Assemble a client from preconfigured parts
    pub fn from_parts(gateway: RequestGateway, dispatcher: BatchDispatcher) -> Self {
        Self {
            gateway,
            dispatcher,
        }
    }

    /// Replace the response cache, e.g. with [`ResponseCache::global`]
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<ResponseCache>) -> Self {
        self.gateway = self.gateway.with_cache(cache);
        self
    }

    pub fn gateway(&self) -> &RequestGateway {
        &self.gateway
    }

    pub fn dispatcher(&self) -> &BatchDispatcher {
        &self.dispatcher
    }

    /// Cache counters, if caching is enabled
    pub fn cache_stats(&self) -> Option<CacheStatsSnapshot> {
        self.gateway.cache().map(|c| c.stats())
    }

    // ------------------------------------------------------------------
    // Endpoints
    // ------------------------------------------------------------------

    /// `GET /networks`
    pub async fn networks(&self, cancel: &CancellationToken) -> Result<Vec<Network>> {
        self.gateway.fetch("/networks", &ApiParams::new(), cancel).await
    }

    /// `GET /networks/{network}/pools`
    pub async fn network_pools(
        &self,
        network: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<PoolsPage> {
        self.gateway
            .fetch(&api_path(&["networks", network, "pools"])?, params, cancel)
            .await
    }

    /// `GET /networks/{network}/dexes/{dex}/pools`
    pub async fn dex_pools(
        &self,
        network: &str,
        dex: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<PoolsPage> {
        self.gateway
            .fetch(
                &api_path(&["networks", network, "dexes", dex, "pools"])?,
                params,
                cancel,
            )
            .await
    }

    /// `GET /networks/{network}/dexes`
    pub async fn network_dexes(
        &self,
        network: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<DexesPage> {
        self.gateway
            .fetch(&api_path(&["networks", network, "dexes"])?, params, cancel)
            .await
    }

    /// `GET /networks/{network}/pools/{pool}`
    pub async fn pool_details(
        &self,
        network: &str,
        pool: &str,
        inversed: bool,
        cancel: &CancellationToken,
    ) -> Result<Pool> {
        self.gateway
            .fetch(
                &api_path(&["networks", network, "pools", pool])?,
                &pool_details_params(inversed),
                cancel,
            )
            .await
    }

    /// `GET /networks/{network}/pools/{pool}/ohlcv`
    ///
    /// `start` is required by the API; `params` may add `end`, `limit` and
    /// `interval`.
    pub async fn pool_ohlcv(
        &self,
        network: &str,
        pool: &str,
        start: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<OhlcvBar>> {
        let params = params.clone().start(start);
        self.gateway
            .fetch(
                &api_path(&["networks", network, "pools", pool, "ohlcv"])?,
                &params,
                cancel,
            )
            .await
    }

    /// `GET /networks/{network}/pools/{pool}/transactions`
    pub async fn pool_transactions(
        &self,
        network: &str,
        pool: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<TransactionsPage> {
        self.gateway
            .fetch(
                &api_path(&["networks", network, "pools", pool, "transactions"])?,
                params,
                cancel,
            )
            .await
    }

    /// `GET /networks/{network}/tokens/{token}`
    pub async fn token_details(
        &self,
        network: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Token> {
        self.gateway
            .fetch(
                &api_path(&["networks", network, "tokens", token])?,
                &ApiParams::new(),
                cancel,
            )
            .await
    }

    /// `GET /networks/{network}/tokens/{token}/pools`
    pub async fn token_pools(
        &self,
        network: &str,
        token: &str,
        params: &ApiParams,
        cancel: &CancellationToken,
    ) -> Result<PoolsPage> {
        self.gateway
            .fetch(
                &api_path(&["networks", network, "tokens", token, "pools"])?,
                params,
                cancel,
            )
            .await
    }

    /// `GET /search?query=`
    pub async fn search(&self, query: &str, cancel: &CancellationToken) -> Result<SearchResults> {
        self.gateway
            .fetch("/search", &ApiParams::new().query(query), cancel)
            .await
    }

    /// `GET /stats`
    pub async fn stats(&self, cancel: &CancellationToken) -> Result<SystemStats> {
        self.gateway.fetch("/stats", &ApiParams::new(), cancel).await
    }

    // ------------------------------------------------------------------
    // Composite helpers
    // ------------------------------------------------------------------

    /// Pools with the largest absolute 24h price moves
    ///
    /// Samples `3 × limit` pools so that the volume filter still leaves
    /// enough candidates.
    pub async fn top_movers(
        &self,
        network: &str,
        limit: u32,
        min_volume: f64,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pool>> {
        let page = self
            .network_pools(network, &ApiParams::new().limit(limit.saturating_mul(3)), cancel)
            .await?;

        let mut movers = filter_by_volume(&page.pools, min_volume);
        movers.sort_by(|a, b| {
            b.last_price_change_usd_24h
                .abs()
                .total_cmp(&a.last_price_change_usd_24h.abs())
        });
        movers.truncate(limit as usize);
        Ok(movers)
    }

    /// Highest-volume pools, ordered by the API
    pub async fn high_volume_pools(
        &self,
        network: &str,
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<Vec<Pool>> {
        let params = ApiParams::new()
            .limit(limit)
            .order_by(PoolField::VolumeUsd)
            .sort("desc");
        Ok(self.network_pools(network, &params, cancel).await?.pools)
    }

    /// Token details plus liquidity and DEX spread across its pools
    pub async fn token_liquidity_analysis(
        &self,
        network: &str,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<TokenLiquidityReport> {
        let pools_params = ApiParams::new().limit(LIQUIDITY_POOLS);
        let (token, page) = tokio::try_join!(
            self.token_details(network, token, cancel),
            self.token_pools(network, token, &pools_params, cancel),
        )?;

        let pools = page.pools;
        let mut report = TokenLiquidityReport {
            token,
            pools_count: pools.len(),
            liquidity: None,
            largest_pool: None,
            dex_distribution: None,
        };
        if pools.is_empty() {
            return Ok(report);
        }

        report.liquidity = Some(liquidity_distribution(&pools));
        report.dex_distribution = Some(dex_distribution(&pools));
        report.largest_pool = pools
            .iter()
            .max_by(|a, b| a.volume_usd.total_cmp(&b.volume_usd))
            .cloned();
        Ok(report)
    }

    /// System stats and a pool sample from the first five networks
    ///
    /// The per-network fetches run through the batch dispatcher; networks
    /// that fail are left out of the overview.
    pub async fn market_overview(&self, cancel: &CancellationToken) -> Result<MarketOverview> {
        let (system_stats, networks) =
            tokio::try_join!(self.stats(cancel), self.networks(cancel))?;

        let sampled: Vec<Network> = networks.into_iter().take(OVERVIEW_NETWORKS).collect();
        let display_names: BTreeMap<String, String> = sampled
            .iter()
            .map(|n| (n.id.clone(), n.display_name.clone()))
            .collect();
        let ids: Vec<String> = sampled.into_iter().map(|n| n.id).collect();

        let results = self.multiple_pools(&ids, OVERVIEW_POOLS, cancel).await?;

        let mut overview = BTreeMap::new();
        for entry in results {
            match entry.result {
                Ok(pools) => {
                    let display_name = display_names
                        .get(&entry.target)
                        .cloned()
                        .unwrap_or_default();
                    overview.insert(
                        entry.target,
                        NetworkOverview {
                            display_name,
                            total_volume: pools.iter().map(|p| p.volume_usd).sum(),
                            pool_count: pools.len(),
                        },
                    );
                }
                Err(e) => debug!(network = %entry.target, error = %e, "Omitting network from overview"),
            }
        }

        Ok(MarketOverview {
            system_stats,
            networks: overview,
            timestamp: Utc::now(),
        })
    }

    /// Whether `network` is one of the ids reported by `/networks`
    pub async fn validate_network(&self, network: &str, cancel: &CancellationToken) -> Result<bool> {
        Ok(self.networks(cancel).await?.iter().any(|n| n.id == network))
    }

    // ------------------------------------------------------------------
    // Batch operations
    // ------------------------------------------------------------------

    /// First `limit` pools of each network, fetched concurrently
    ///
    /// # Errors
    ///
    /// Only [`Error::Cancelled`]; per-network failures are entries in the
    /// result set.
    pub async fn multiple_pools(
        &self,
        networks: &[String],
        limit: u32,
        cancel: &CancellationToken,
    ) -> Result<BatchResults<String, Vec<Pool>>> {
        let gateway = self.gateway.clone();
        let params = ApiParams::new().limit(limit);

        self.dispatcher
            .dispatch(networks.to_vec(), cancel, move |network, cancel| {
                let gateway = gateway.clone();
                let params = params.clone();
                async move {
                    let page: PoolsPage = gateway
                        .fetch(&api_path(&["networks", network.as_str(), "pools"])?, &params, &cancel)
                        .await?;
                    Ok(page.pools)
                }
            })
            .await
    }

    /// Token details for each address on one network, fetched concurrently
    pub async fn token_data_batch(
        &self,
        network: &str,
        tokens: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchResults<String, Token>> {
        let gateway = self.gateway.clone();
        let network = network.to_string();

        self.dispatcher
            .dispatch(tokens.to_vec(), cancel, move |token, cancel| {
                let gateway = gateway.clone();
                let endpoint = api_path(&["networks", network.as_str(), "tokens", token.as_str()]);
                async move { gateway.fetch(&endpoint?, &ApiParams::new(), &cancel).await }
            })
            .await
    }

    /// Run several searches concurrently
    pub async fn batch_search(
        &self,
        queries: &[String],
        cancel: &CancellationToken,
    ) -> Result<BatchResults<String, SearchResults>> {
        let gateway = self.gateway.clone();

        self.dispatcher
            .dispatch(queries.to_vec(), cancel, move |query, cancel| {
                let gateway = gateway.clone();
                async move {
                    gateway
                        .fetch("/search", &ApiParams::new().query(query), &cancel)
                        .await
                }
            })
            .await
    }

    /// Poll pool prices every `interval` until `cancel` fires
    ///
    /// Each tick fetches live details for every pool (bypassing cached
    /// values) and hands one [`PriceUpdate`] per pool to `on_update`. A pool
    /// that fails is logged and skipped for that tick.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `interval` is zero.
    pub async fn monitor_prices<F>(
        &self,
        network: &str,
        pools: &[String],
        interval: Duration,
        cancel: &CancellationToken,
        mut on_update: F,
    ) -> Result<()>
    where
        F: FnMut(PriceUpdate),
    {
        if interval.is_zero() {
            return Err(Error::Config("monitor interval must be non-zero".into()));
        }

        let mut endpoints = Vec::with_capacity(pools.len());
        for pool_id in pools {
            endpoints.push((pool_id, api_path(&["networks", network, "pools", pool_id.as_str()])?));
        }

        info!(network = %network, pools = pools.len(), interval_ms = interval.as_millis(), "Monitoring prices");
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            for (pool_id, endpoint) in &endpoints {
                let pool: Pool = match self
                    .gateway
                    .refresh(endpoint, &pool_details_params(false), cancel)
                    .await
                {
                    Ok(pool) => pool,
                    Err(Error::Cancelled) => {
                        debug!("Price monitor cancelled mid-tick");
                        return Ok(());
                    }
                    Err(e) => {
                        warn!(pool = %pool_id, error = %e, "Price poll failed");
                        continue;
                    }
                };

                on_update(PriceUpdate {
                    pool_id: pool_id.to_string(),
                    price_usd: pool.price_usd,
                    price_change_24h: pool.last_price_change_usd_24h,
                    volume_usd: pool.volume_usd,
                    timestamp: Utc::now(),
                });
            }
        }

        debug!("Price monitor stopped");
        Ok(())
    }
}

fn pool_details_params(inversed: bool) -> ApiParams {
    if inversed {
        ApiParams::new().inversed(true)
    } else {
        ApiParams::new()
    }
}
