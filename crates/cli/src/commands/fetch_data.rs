use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use fx_algo_core::{AppConfig, TradingTerminal};
use fx_algo_data::CsvStorage;

use super::{connect, finish, resolve_timeframe};

#[derive(Args, Debug, Clone)]
pub struct FetchDataArgs {
    /// Symbol to fetch (defaults to the configured symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Timeframe such as M5 or H1 (defaults to the configured timeframe)
    #[arg(long)]
    pub timeframe: Option<String>,

    /// Start time in ISO 8601 format (e.g., "2024-01-01T00:00:00Z")
    #[arg(long)]
    pub start: String,

    /// End time in ISO 8601 format (e.g., "2024-03-01T00:00:00Z")
    #[arg(long)]
    pub end: String,

    /// Output CSV file path
    #[arg(short, long)]
    pub output: String,
}

pub async fn run_fetch_data(args: FetchDataArgs, config: &AppConfig) -> Result<()> {
    let symbol = args.symbol.unwrap_or_else(|| config.trading.symbol.clone());
    let timeframe = resolve_timeframe(args.timeframe.as_deref(), config.trading.timeframe)?;

    let start: DateTime<Utc> = args
        .start
        .parse()
        .context("Invalid start time. Use ISO 8601 format (e.g., 2024-01-01T00:00:00Z)")?;
    let end: DateTime<Utc> = args
        .end
        .parse()
        .context("Invalid end time. Use ISO 8601 format (e.g., 2024-03-01T00:00:00Z)")?;
    if start >= end {
        anyhow::bail!("Start time must be before end time");
    }

    tracing::info!("Fetching {} {} rates from {} to {}", symbol, timeframe, start, end);

    let client = connect(config).await?;
    let fetched = client.bars_range(&symbol, timeframe, start, end).await;
    let bars = finish(&client, fetched).await?;

    if bars.is_empty() {
        anyhow::bail!("No data fetched for {symbol} {timeframe}");
    }

    CsvStorage::write_bars(&args.output, &bars)?;
    tracing::info!("✅ Wrote {} bars to {}", bars.len(), args.output);
    tracing::info!("You can now run: fx-algo train --data {}", args.output);

    Ok(())
}
