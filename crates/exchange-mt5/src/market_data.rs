//! Symbol metadata and historical rates.

use crate::client::Mt5Client;
use crate::error::{Mt5Error, Result};
use crate::types::{
    LastError, RatesFromPosParams, RatesRangeParams, RawSymbolInfo, SymbolParams,
    SymbolSelectParams,
};
use chrono::{DateTime, Utc};
use fx_algo_core::{Bar, SymbolSnapshot, Timeframe};
use tracing::{debug, info};

impl Mt5Client {
    /// Fetch symbol properties, adding the symbol to the market watch if it is hidden.
    ///
    /// The returned snapshot is the one read before selection, so `visible`
    /// reflects the state the terminal reported first.
    ///
    /// # Errors
    /// Returns `symbol_info failed for ...` for unknown symbols and
    /// [`Mt5Error::SymbolSelect`] when the terminal refuses to select it.
    pub async fn symbol_info(&self, symbol: &str) -> Result<SymbolSnapshot> {
        let raw: RawSymbolInfo = self
            .call("symbol_info", "symbol_info", &SymbolParams { symbol })
            .await
            .map_err(|e| e.for_target(symbol))?;
        let snapshot = SymbolSnapshot::try_from(raw)?;

        if !snapshot.visible {
            info!(symbol, "Symbol hidden, selecting into market watch");
            let params = SymbolSelectParams {
                symbol,
                enable: true,
            };
            let selected = match self
                .call::<bool, _>("symbol_select", "symbol_select", &params)
                .await
            {
                Ok(flag) => flag,
                Err(Mt5Error::Terminal { code, message, .. }) => {
                    return Err(Mt5Error::SymbolSelect {
                        symbol: symbol.to_string(),
                        code,
                        message,
                    })
                }
                Err(e) => return Err(e),
            };
            if !selected {
                let last = self.last_error().await.unwrap_or_else(|_| LastError::unknown());
                return Err(Mt5Error::SymbolSelect {
                    symbol: symbol.to_string(),
                    code: last.code,
                    message: last.message,
                });
            }
        }

        Ok(snapshot)
    }

    /// Rates with open time in `[from, to]`, oldest first.
    ///
    /// # Errors
    /// Returns `copy_rates_range failed for ...` when the terminal has no data.
    pub async fn rates_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        let params = RatesRangeParams {
            symbol,
            timeframe: timeframe.code(),
            date_from: from.timestamp(),
            date_to: to.timestamp(),
        };
        let bars: Vec<Bar> = self
            .call("copy_rates_range", "copy_rates_range", &params)
            .await
            .map_err(|e| e.for_target(symbol))?;

        debug!(symbol, %timeframe, count = bars.len(), "Fetched rates by range");
        Ok(bars)
    }

    /// `count` rates counted back from bar `start_pos` (0 is the current bar), oldest first.
    ///
    /// # Errors
    /// Returns `copy_rates_from_pos failed: ...` when the terminal has no data.
    pub async fn rates_from_pos(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start_pos: usize,
        count: usize,
    ) -> Result<Vec<Bar>> {
        let params = RatesFromPosParams {
            symbol,
            timeframe: timeframe.code(),
            start_pos,
            count,
        };
        let bars: Vec<Bar> = self
            .call("copy_rates_from_pos", "copy_rates_from_pos", &params)
            .await?;

        debug!(symbol, %timeframe, count = bars.len(), "Fetched rates by position");
        Ok(bars)
    }
}
