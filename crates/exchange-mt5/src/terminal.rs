//! [`TradingTerminal`] implementation backed by the bridge client.

use crate::client::Mt5Client;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use fx_algo_core::{
    AccountSnapshot, Bar, OrderRequest, OrderResult, SymbolSnapshot, Timeframe, TradingTerminal,
};

#[async_trait]
impl TradingTerminal for Mt5Client {
    async fn account_info(&self) -> Result<AccountSnapshot> {
        Ok(Mt5Client::account_info(self).await?)
    }

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolSnapshot> {
        Ok(Mt5Client::symbol_info(self, symbol).await?)
    }

    async fn latest_bars(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        count: usize,
    ) -> Result<Vec<Bar>> {
        Ok(self.rates_from_pos(symbol, timeframe, 0, count).await?)
    }

    async fn bars_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<Bar>> {
        Ok(self.rates_range(symbol, timeframe, from, to).await?)
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
        Ok(Mt5Client::place_order(self, request).await?)
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(Mt5Client::shutdown(self).await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::client::tests::{client_for, failed, ok};
    use chrono::{TimeZone, Utc};
    use fx_algo_core::{Timeframe, TradingTerminal};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer};

    #[tokio::test]
    async fn test_latest_bars_reads_from_current_bar() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/copy_rates_from_pos"))
            .and(body_partial_json(json!({"symbol": "EURUSD", "start_pos": 0, "count": 3})))
            .respond_with(ok(json!([
                {"time": 1_700_000_000, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0},
                {"time": 1_700_000_300, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0},
                {"time": 1_700_000_600, "open": 1.0, "high": 1.0, "low": 1.0, "close": 1.0}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let terminal: &dyn TradingTerminal = &client;
        let bars = terminal.latest_bars("EURUSD", Timeframe::M5, 3).await.unwrap();
        assert_eq!(bars.len(), 3);
        assert_eq!(bars[2].time.timestamp(), 1_700_000_600);
    }

    #[tokio::test]
    async fn test_bars_range_sends_unix_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/copy_rates_range"))
            .and(body_partial_json(json!({
                "symbol": "GBPUSD",
                "timeframe": 16385,
                "date_from": 1_704_067_200,
                "date_to": 1_704_153_600
            })))
            .respond_with(ok(json!([
                {"time": 1_704_067_200, "open": 1.27, "high": 1.28, "low": 1.26, "close": 1.275}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let terminal: &dyn TradingTerminal = &client;
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let bars = terminal
            .bars_range("GBPUSD", Timeframe::H1, from, to)
            .await
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert!((bars[0].close - 1.275).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_bars_range_error_names_symbol() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/copy_rates_range"))
            .respond_with(failed(-2, "Invalid params"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let terminal: &dyn TradingTerminal = &client;
        let from = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let err = terminal
            .bars_range("GBPUSD", Timeframe::H1, from, from)
            .await
            .unwrap_err();
        assert!(err
            .to_string()
            .starts_with("copy_rates_range failed for GBPUSD: (-2,"));
    }
}
