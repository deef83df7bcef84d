//! Paprika Gateway - DexPaprika market-data client
//!
//! Fetches through a TTL response cache, fans multi-target commands out
//! concurrently and prints JSON on stdout.

use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use paprika_gateway::{
    ApiParams, BatchResults, Error, PaprikaClient, Result,
    analytics::{detect_pool_anomalies, ohlcv_summary},
    cli::{Cli, Command},
    config::Config,
    retry::{RetryPolicy, with_retry},
    setup_tracing,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    match run(cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if e.downcast_ref::<Error>().is_some_and(Error::is_cancelled) {
                eprintln!("Cancelled");
                return ExitCode::from(130);
            }
            error!(error = %e, "Command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Cancel the shared token on Ctrl-C
fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received, cancelling");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to install Ctrl-C handler"),
        }
    });
}

async fn run(cli: Cli, cancel: &CancellationToken) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref()).context("Failed to load configuration")?;
    cli.apply_overrides(&mut config);
    config.validate()?;

    let client = PaprikaClient::new(&config).await?;
    info!(base_url = %config.api.base_url, "Client ready");

    let policy = RetryPolicy::new(&config.retry);
    let command = &cli.command;
    let output = with_retry(&policy, command.name(), || {
        execute(&client, &config, command, cancel)
    })
    .await?;

    print!("{output}");

    if let Some(stats) = client.cache_stats() {
        info!(hits = stats.hits, misses = stats.misses, size = stats.size, "Cache stats");
    }
    Ok(())
}

/// Run one subcommand and render its output
async fn execute(
    client: &PaprikaClient,
    config: &Config,
    command: &Command,
    cancel: &CancellationToken,
) -> Result<String> {
    match command {
        Command::Networks => pretty(&client.networks(cancel).await?),

        Command::Pools {
            network,
            limit,
            order_by,
        } => {
            let mut params = ApiParams::new().limit(*limit);
            if let Some(field) = order_by {
                params = params.order_by(*field).sort("desc");
            }
            pretty(&client.network_pools(network, &params, cancel).await?)
        }

        Command::MultiPools { networks, limit } => {
            pretty(&batch_json(client.multiple_pools(networks, *limit, cancel).await?)?)
        }

        Command::Search { queries } => {
            pretty(&batch_json(client.batch_search(queries, cancel).await?)?)
        }

        Command::Stats => pretty(&client.stats(cancel).await?),

        Command::Anomalies {
            network,
            field,
            threshold,
            limit,
        } => {
            let page = client
                .network_pools(network, &ApiParams::new().limit(*limit), cancel)
                .await?;
            let flagged: Vec<Value> = detect_pool_anomalies(&page.pools, *field, *threshold)
                .into_iter()
                .map(|a| {
                    json!({
                        "index": a.index,
                        "pool_id": a.item.id,
                        "dex_name": a.item.dex_name,
                        "pair": a.item.pair_label(),
                        "value": a.value,
                        "z_score": a.z_score,
                    })
                })
                .collect();
            pretty(&json!({
                "network": network,
                "field": field,
                "threshold": threshold,
                "sampled": page.pools.len(),
                "anomalies": flagged,
            }))
        }

        Command::Liquidity { network, token } => {
            pretty(&client.token_liquidity_analysis(network, token, cancel).await?)
        }

        Command::Ohlcv {
            network,
            pool,
            start,
            end,
            interval,
            limit,
        } => {
            let mut params = ApiParams::new().interval(*interval);
            if let Some(end) = end {
                params = params.end(end.as_str());
            }
            if let Some(limit) = limit {
                params = params.limit(*limit);
            }
            let bars = client
                .pool_ohlcv(network, pool, start, &params, cancel)
                .await?;
            pretty(&ohlcv_summary(&bars))
        }

        Command::Overview => pretty(&client.market_overview(cancel).await?),

        Command::Movers {
            network,
            limit,
            min_volume,
        } => pretty(&client.top_movers(network, *limit, *min_volume, cancel).await?),

        Command::Monitor {
            network,
            pools,
            every,
        } => {
            client
                .monitor_prices(network, pools, *every, cancel, |update| {
                    match serde_json::to_string(&update) {
                        Ok(line) => println!("{line}"),
                        Err(e) => warn!(error = %e, "Failed to encode price update"),
                    }
                })
                .await?;
            Ok(String::new())
        }

        Command::ShowConfig => config.to_yaml(),
    }
}

fn pretty<T: Serialize>(value: &T) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

/// `{target: {"ok": value}}` or `{target: {"error": message}}` per entry
fn batch_json<T: Serialize>(results: BatchResults<String, T>) -> Result<Value> {
    let mut out = serde_json::Map::new();
    for entry in results {
        let value = match entry.result {
            Ok(v) => json!({ "ok": serde_json::to_value(v)? }),
            Err(e) => json!({ "error": e.to_string() }),
        };
        out.insert(entry.target, value);
    }
    Ok(Value::Object(out))
}
