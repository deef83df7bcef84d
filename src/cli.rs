//! Command-line interface

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use paprika_core::{Interval, PoolField};

use crate::config::{Config, parse_duration};

/// DexPaprika market-data client with response caching and batch fetches
#[derive(Parser, Debug)]
#[command(name = "paprika-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "PAPRIKA_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// API base URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Per-request timeout (e.g. "10s", "500ms")
    #[arg(long, value_parser = parse_duration, global = true)]
    pub timeout: Option<Duration>,

    /// Maximum concurrent requests in batch commands
    #[arg(long, global = true)]
    pub max_concurrency: Option<usize>,

    /// Disable the response cache
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "warn",
        env = "PAPRIKA_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "PAPRIKA_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Apply command-line overrides on top of a loaded config
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(url) = &self.base_url {
            config.api.base_url.clone_from(url);
        }
        if let Some(timeout) = self.timeout {
            config.api.request_timeout = timeout;
        }
        if let Some(n) = self.max_concurrency {
            config.batch.max_concurrency = Some(n);
        }
        if self.no_cache {
            config.cache.enabled = false;
        }
    }
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List supported networks
    Networks,

    /// List pools on a network
    Pools {
        network: String,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Order pools by this field (server side)
        #[arg(long)]
        order_by: Option<PoolField>,
    },

    /// Fetch pools from several networks concurrently
    MultiPools {
        #[arg(required = true)]
        networks: Vec<String>,

        #[arg(short, long, default_value_t = 5)]
        limit: u32,
    },

    /// Run one or more searches concurrently
    Search {
        #[arg(required = true)]
        queries: Vec<String>,
    },

    /// Show global API statistics
    Stats,

    /// Flag pools whose field lies far from the network mean
    Anomalies {
        network: String,

        #[arg(long, default_value = "volume_usd")]
        field: PoolField,

        /// Z-score at or above which a pool is flagged
        #[arg(long, default_value_t = 2.0)]
        threshold: f64,

        /// Pools to sample
        #[arg(short, long, default_value_t = 100)]
        limit: u32,
    },

    /// Liquidity and DEX distribution for a token
    Liquidity { network: String, token: String },

    /// OHLCV summary and volatility for a pool
    Ohlcv {
        network: String,
        pool: String,

        /// Start of the window (date or RFC 3339 timestamp)
        #[arg(long)]
        start: String,

        #[arg(long)]
        end: Option<String>,

        #[arg(long, default_value = "24h")]
        interval: Interval,

        #[arg(short, long)]
        limit: Option<u32>,
    },

    /// Stats plus a pool sample from the leading networks
    Overview,

    /// Poll pool prices until interrupted, one JSON line per update
    Monitor {
        network: String,

        #[arg(required = true)]
        pools: Vec<String>,

        /// Poll period (e.g. "30s", "1m")
        #[arg(long, default_value = "30s", value_parser = parse_period)]
        every: Duration,
    },

    /// Print the effective configuration as YAML
    ShowConfig,

    /// Largest absolute 24h price moves on a network
    Movers {
        network: String,

        #[arg(short, long, default_value_t = 10)]
        limit: u32,

        /// Ignore pools below this USD volume
        #[arg(long, default_value_t = 10_000.0)]
        min_volume: f64,
    },
}

/// Like [`parse_duration`] but rejects a zero period
fn parse_period(raw: &str) -> Result<Duration, String> {
    let period = parse_duration(raw)?;
    if period.is_zero() {
        return Err(format!("period must be non-zero: '{raw}'"));
    }
    Ok(period)
}

impl Command {
    /// Subcommand name as typed on the command line
    pub fn name(&self) -> &'static str {
        match self {
            Self::Networks => "networks",
            Self::Pools { .. } => "pools",
            Self::MultiPools { .. } => "multi-pools",
            Self::Search { .. } => "search",
            Self::Stats => "stats",
            Self::Anomalies { .. } => "anomalies",
            Self::Liquidity { .. } => "liquidity",
            Self::Ohlcv { .. } => "ohlcv",
            Self::Overview => "overview",
            Self::Monitor { .. } => "monitor",
            Self::ShowConfig => "show-config",
            Self::Movers { .. } => "movers",
        }
    }
}
