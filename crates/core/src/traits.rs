use crate::events::{AccountSnapshot, Bar, OrderRequest, OrderResult, SymbolSnapshot};
use crate::timeframe::Timeframe;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Account, market data, and order access on a trading terminal.
#[async_trait]
pub trait TradingTerminal: Send + Sync {
    async fn account_info(&self) -> Result<AccountSnapshot>;

    /// Returns the symbol, selecting it into the market watch if it is hidden.
    async fn symbol_info(&self, symbol: &str) -> Result<SymbolSnapshot>;

    /// The most recent `count` bars, oldest first.
    async fn latest_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>>;

    async fn bars_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>>;

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult>;

    async fn shutdown(&self) -> Result<()>;
}

/// A trained model that scores one feature row.
pub trait DirectionModel: Send + Sync {
    fn feature_names(&self) -> &[String];

    /// Probability that price moves up over the model's horizon.
    fn prob_long(&self, features: &[f64]) -> Result<f64>;
}
