//! Subcommands of the `fx-algo` binary.

pub mod backtest;
pub mod check_connection;
pub mod fetch_data;
pub mod run;
pub mod train;

pub use backtest::{run_backtest, BacktestArgs};
pub use check_connection::{run_check_connection, CheckConnectionArgs};
pub use fetch_data::{run_fetch_data, FetchDataArgs};
pub use run::{run_trade_loop, RunArgs};
pub use train::{run_train, TrainArgs};

use anyhow::{Context, Result};
use fx_algo_core::{Credentials, Timeframe, TradingTerminal};
use fx_algo_mt5::Mt5Client;

/// Timeframe flag if given, otherwise the configured one.
pub(crate) fn resolve_timeframe(flag: Option<&str>, configured: Timeframe) -> Result<Timeframe> {
    flag.map_or(Ok(configured), str::parse)
}

/// Builds a bridge client and logs in with credentials from the environment.
pub(crate) async fn connect(config: &fx_algo_core::AppConfig) -> Result<Mt5Client> {
    let credentials = Credentials::from_env()?;
    let client = Mt5Client::new((&config.bridge).into())?;
    client
        .init(&credentials)
        .await
        .with_context(|| format!("Could not connect to terminal bridge at {}", client.base_url()))?;
    tracing::info!(
        login = credentials.login,
        server = %credentials.server,
        "Connected to terminal"
    );
    Ok(client)
}

/// Shuts the terminal down and hands back `result`. A failed shutdown is only logged.
pub(crate) async fn finish<T>(terminal: &dyn TradingTerminal, result: Result<T>) -> Result<T> {
    if let Err(e) = terminal.shutdown().await {
        tracing::warn!(error = %e, "Terminal shutdown failed");
    }
    result
}
