use anyhow::Result;
use clap::Args;
use fx_algo_core::{AppConfig, DirectionModel, TradingTerminal};
use fx_algo_execution::TradeLoop;
use fx_algo_model::load_model;
use std::sync::Arc;

use super::connect;

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Send real orders instead of logging paper signals
    #[arg(long)]
    pub live: bool,

    /// Stop after this many polling iterations
    #[arg(long)]
    pub max_iterations: Option<usize>,
}

pub async fn run_trade_loop(args: RunArgs, config: &AppConfig) -> Result<()> {
    let mut trading = config.trading.clone();
    if args.live {
        trading.paper = false;
    }
    if !trading.paper {
        tracing::warn!("⚠️  LIVE mode: orders will be sent to the terminal");
    }

    let model: Arc<dyn DirectionModel> = Arc::new(load_model(&trading.model_path)?);
    let terminal: Arc<dyn TradingTerminal> = Arc::new(connect(config).await?);

    let mut trade_loop = TradeLoop::new(terminal, model, trading);
    if let Some(max) = args.max_iterations {
        trade_loop = trade_loop.with_max_iterations(max);
    }

    let exit = trade_loop.run().await?;
    println!("Trade loop stopped: {exit:?}");
    Ok(())
}
