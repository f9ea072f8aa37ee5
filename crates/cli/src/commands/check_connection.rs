use anyhow::Result;
use chrono::{Duration, Utc};
use clap::Args;
use fx_algo_core::{AppConfig, Timeframe, TradingTerminal};

use super::{connect, finish, resolve_timeframe};

#[derive(Args, Debug, Clone)]
pub struct CheckConnectionArgs {
    /// Symbol to pull rates for (defaults to the configured symbol)
    #[arg(long)]
    pub symbol: Option<String>,

    /// Timeframe such as M5 or H1 (defaults to the configured timeframe)
    #[arg(long)]
    pub timeframe: Option<String>,

    /// How many days of rates to request
    #[arg(long, default_value = "5")]
    pub days: i64,
}

/// Logs in, prints the account, and pulls recent rates.
pub async fn run_check_connection(args: CheckConnectionArgs, config: &AppConfig) -> Result<()> {
    let symbol = args.symbol.unwrap_or_else(|| config.trading.symbol.clone());
    let timeframe = resolve_timeframe(args.timeframe.as_deref(), config.trading.timeframe)?;

    let client = connect(config).await?;
    let result = report(&client, &symbol, timeframe, args.days).await;
    finish(&client, result).await
}

async fn report(
    terminal: &dyn TradingTerminal,
    symbol: &str,
    timeframe: Timeframe,
    days: i64,
) -> Result<()> {
    let account = terminal.account_info().await?;
    println!("Account:   {} @ {}", account.login, account.server);
    println!("Balance:   {} {}", account.balance, account.currency);
    println!("Equity:    {} {}", account.equity, account.currency);
    println!("Leverage:  1:{}", account.leverage);

    let to = Utc::now();
    let from = to - Duration::days(days);
    let bars = terminal.bars_range(symbol, timeframe, from, to).await?;

    println!();
    println!("{symbol} {timeframe}: {} bars over the last {days} day(s)", bars.len());
    if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
        for bar in [first, last] {
            println!(
                "  {}  O {:.5}  H {:.5}  L {:.5}  C {:.5}  spread {}",
                bar.time.format("%Y-%m-%d %H:%M"),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.spread
            );
        }
    }
    Ok(())
}
