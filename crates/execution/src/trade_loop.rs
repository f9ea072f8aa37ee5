use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use fx_algo_core::{
    enforce_daily_loss_cap, normalize_volume, position_size, Direction, DirectionModel,
    TradingConfig, TradingTerminal,
};
use fx_algo_features::{make_features, FEATURE_COLUMNS};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::order::build_bracket_order;

/// Why [`TradeLoop::run`] returned without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    LossCapHit,
    IterationLimit,
    Stopped,
    Interrupted,
}

enum Step {
    Continue,
    LossCapHit,
}

/// Source of the current time; the loss cap resets when its UTC date changes.
pub type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Equity reference for the daily loss cap, reset on each new UTC day.
struct Session {
    day: NaiveDate,
    equity_start: Decimal,
}

pub struct TradeLoop {
    terminal: Arc<dyn TradingTerminal>,
    model: Arc<dyn DirectionModel>,
    config: TradingConfig,
    max_iterations: Option<usize>,
    stop: Arc<AtomicBool>,
    clock: Clock,
}

impl TradeLoop {
    #[must_use]
    pub fn new(
        terminal: Arc<dyn TradingTerminal>,
        model: Arc<dyn DirectionModel>,
        config: TradingConfig,
    ) -> Self {
        Self {
            terminal,
            model,
            config,
            max_iterations: None,
            stop: Arc::new(AtomicBool::new(false)),
            clock: Arc::new(Utc::now),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub const fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Flag checked before every iteration; storing `true` ends the loop.
    #[must_use]
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Runs until the loss cap, an iteration limit, a stop request, Ctrl+C, or an error.
    ///
    /// The terminal is shut down on every exit path.
    ///
    /// # Errors
    /// Returns the first terminal, feature, or model error; the loop does not retry.
    /// Live mode without `sizing_pip_value` fails before the first poll.
    pub async fn run(&self) -> Result<LoopExit> {
        let outcome = tokio::select! {
            result = self.run_until_done() => result,
            _ = tokio::signal::ctrl_c() => {
                info!("Received Ctrl+C, stopping...");
                Ok(LoopExit::Interrupted)
            }
        };

        if let Err(e) = self.terminal.shutdown().await {
            warn!(error = %e, "Terminal shutdown failed");
        }

        match &outcome {
            Ok(exit) => info!(?exit, "Trade loop finished"),
            Err(e) => warn!(error = %e, "Trade loop aborted"),
        }
        outcome
    }

    async fn run_until_done(&self) -> Result<LoopExit> {
        if !self.config.paper && self.config.sizing_pip_value.is_none() {
            bail!("live trading requires trading.sizing_pip_value");
        }
        let names = self.model.feature_names();
        if !names.iter().map(String::as_str).eq(FEATURE_COLUMNS) {
            bail!(
                "model features {:?} do not match computed features {:?}",
                names,
                FEATURE_COLUMNS
            );
        }

        let account = self
            .terminal
            .account_info()
            .await
            .context("Failed to read starting account info")?;
        let mut session = Session {
            day: (self.clock)().date_naive(),
            equity_start: account.equity,
        };
        info!(
            symbol = %self.config.symbol,
            timeframe = %self.config.timeframe,
            equity_start = %session.equity_start,
            paper = self.config.paper,
            "Trade loop started"
        );

        let poll = Duration::from_secs(self.config.poll_interval_secs);
        let mut iterations = 0usize;
        loop {
            if self.stop.load(Ordering::SeqCst) {
                return Ok(LoopExit::Stopped);
            }
            if self.max_iterations.is_some_and(|max| iterations >= max) {
                return Ok(LoopExit::IterationLimit);
            }
            iterations += 1;

            if let Step::LossCapHit = self.step(&mut session).await? {
                return Ok(LoopExit::LossCapHit);
            }
            tokio::time::sleep(poll).await;
        }
    }

    async fn step(&self, session: &mut Session) -> Result<Step> {
        let cfg = &self.config;
        let bars = self
            .terminal
            .latest_bars(&cfg.symbol, cfg.timeframe, cfg.bar_count)
            .await
            .with_context(|| format!("Failed to fetch bars for {}", cfg.symbol))?;

        let frame = make_features(&bars);
        let row = frame.last().with_context(|| {
            format!(
                "no complete feature row in {} bars; increase bar_count",
                bars.len()
            )
        })?;
        let prob_long = self.model.prob_long(&row.values)?;
        let last_bar = &bars[row.index];

        if last_bar.spread > cfg.max_spread_points {
            debug!(
                spread = last_bar.spread,
                max = cfg.max_spread_points,
                "Spread too wide, skipping"
            );
            return Ok(Step::Continue);
        }

        let direction =
            Direction::from_probability(prob_long, cfg.long_threshold, cfg.short_threshold);
        if direction == Direction::Flat {
            debug!(prob_long, "No signal");
            return Ok(Step::Continue);
        }

        let account = self
            .terminal
            .account_info()
            .await
            .context("Failed to read account info")?;
        let today = (self.clock)().date_naive();
        if today != session.day {
            info!(equity_start = %account.equity, "New trading day, resetting loss cap reference");
            session.day = today;
            session.equity_start = account.equity;
        }

        if enforce_daily_loss_cap(
            session.equity_start,
            account.equity,
            to_decimal("daily_loss_cap", cfg.daily_loss_cap)?,
        ) {
            warn!(
                equity_start = %session.equity_start,
                equity = %account.equity,
                "Daily loss cap hit, stopping"
            );
            return Ok(Step::LossCapHit);
        }

        let sl_pips = to_decimal("sl_pips", cfg.sl_pips)?;
        let volume = position_size(
            account.equity,
            to_decimal("risk_fraction", cfg.risk_fraction)?,
            sl_pips,
            to_decimal("sizing_pip_value", cfg.sizing_pip_value())?,
        )?;

        if cfg.paper {
            info!(
                "[PAPER] {} {} vol={} prob={:.3} close={}",
                direction, cfg.symbol, volume, prob_long, last_bar.close
            );
            return Ok(Step::Continue);
        }

        let symbol = self.terminal.symbol_info(&cfg.symbol).await?;
        let above_max = symbol.volume_max > Decimal::ZERO && volume > symbol.volume_max;
        if above_max || volume < symbol.volume_min {
            warn!(
                %volume,
                min = %symbol.volume_min,
                max = %symbol.volume_max,
                "Sized volume outside the symbol's limits, skipping"
            );
            return Ok(Step::Continue);
        }
        let volume = normalize_volume(
            volume,
            symbol.volume_min,
            symbol.volume_max,
            symbol.volume_step,
        );
        let price = to_decimal("close", last_bar.close)?.round_dp(symbol.digits);

        let mut order = build_bracket_order(
            &cfg.symbol,
            direction,
            volume,
            price,
            sl_pips,
            to_decimal("tp_pips", cfg.tp_pips)?,
            to_decimal("pip_value", cfg.pip_value)?,
            cfg.deviation,
            &cfg.comment,
        )?;
        order.sl = order.sl.map(|p| p.round_dp(symbol.digits));
        order.tp = order.tp.map(|p| p.round_dp(symbol.digits));

        let result = self.terminal.place_order(&order).await?;
        if result.is_done() {
            info!(
                side = ?order.side,
                volume = %order.volume,
                price = %result.price,
                order = result.order,
                "Order filled"
            );
        } else {
            warn!(
                retcode = result.retcode,
                comment = %result.comment,
                "Order not filled"
            );
        }

        Ok(Step::Continue)
    }
}

fn to_decimal(field: &str, value: f64) -> Result<Decimal> {
    Decimal::try_from(value).with_context(|| format!("{field} is not representable: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use fx_algo_core::{
        AccountSnapshot, Bar, OrderRequest, OrderResult, OrderSide, SymbolSnapshot, Timeframe,
    };
    use rust_decimal_macros::dec;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    struct FakeTerminal {
        bars: Vec<Bar>,
        equities: Mutex<VecDeque<Decimal>>,
        last_equity: Mutex<Decimal>,
        account_calls: Mutex<usize>,
        orders: Mutex<Vec<OrderRequest>>,
        shut_down: AtomicBool,
    }

    impl FakeTerminal {
        fn new(bars: Vec<Bar>, equities: &[Decimal]) -> Self {
            Self {
                bars,
                equities: Mutex::new(equities.iter().copied().collect()),
                last_equity: Mutex::new(dec!(10000)),
                account_calls: Mutex::new(0),
                orders: Mutex::new(Vec::new()),
                shut_down: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl TradingTerminal for FakeTerminal {
        async fn account_info(&self) -> Result<AccountSnapshot> {
            *self.account_calls.lock().unwrap() += 1;
            let mut last = self.last_equity.lock().unwrap();
            if let Some(next) = self.equities.lock().unwrap().pop_front() {
                *last = next;
            }
            Ok(AccountSnapshot {
                login: 1,
                server: "Demo".to_string(),
                currency: "USD".to_string(),
                balance: *last,
                equity: *last,
                margin_free: *last,
                leverage: 100,
            })
        }

        async fn symbol_info(&self, symbol: &str) -> Result<SymbolSnapshot> {
            Ok(SymbolSnapshot {
                name: symbol.to_string(),
                visible: true,
                digits: 5,
                point: 0.00001,
                spread: 12,
                bid: 1.1,
                ask: 1.10012,
                volume_min: dec!(0.01),
                volume_max: dec!(100),
                volume_step: dec!(0.01),
            })
        }

        async fn latest_bars(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            count: usize,
        ) -> Result<Vec<Bar>> {
            let start = self.bars.len().saturating_sub(count);
            Ok(self.bars[start..].to_vec())
        }

        async fn bars_range(
            &self,
            _symbol: &str,
            _timeframe: Timeframe,
            _from: DateTime<Utc>,
            _to: DateTime<Utc>,
        ) -> Result<Vec<Bar>> {
            Ok(self.bars.clone())
        }

        async fn place_order(&self, request: &OrderRequest) -> Result<OrderResult> {
            self.orders.lock().unwrap().push(request.clone());
            Ok(OrderResult {
                retcode: 10009,
                deal: 1,
                order: 2,
                volume: request.volume,
                price: request.price.unwrap_or_default(),
                comment: "Request executed".to_string(),
                request_id: 3,
            })
        }

        async fn shutdown(&self) -> Result<()> {
            self.shut_down.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    struct FixedModel {
        names: Vec<String>,
        prob: f64,
    }

    impl FixedModel {
        fn new(prob: f64) -> Self {
            Self {
                names: FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
                prob,
            }
        }
    }

    impl DirectionModel for FixedModel {
        fn feature_names(&self) -> &[String] {
            &self.names
        }

        fn prob_long(&self, _features: &[f64]) -> Result<f64> {
            Ok(self.prob)
        }
    }

    fn bars(n: usize, spread: f64) -> Vec<Bar> {
        let start = Utc.with_ymd_and_hms(2024, 2, 5, 0, 0, 0).unwrap();
        (0..n)
            .map(|i| {
                let t = i as f64;
                let close = 1.1000 + (t * 0.21).sin() * 0.0015;
                Bar {
                    time: start + ChronoDuration::minutes(5 * i as i64),
                    open: close - 0.0001,
                    high: close + 0.0003,
                    low: close - 0.0003,
                    close,
                    tick_volume: 50.0,
                    spread,
                    real_volume: 0.0,
                }
            })
            .collect()
    }

    fn config(paper: bool) -> TradingConfig {
        TradingConfig {
            paper,
            poll_interval_secs: 0,
            sizing_pip_value: Some(10.0),
            ..TradingConfig::default()
        }
    }

    fn trade_loop(terminal: &Arc<FakeTerminal>, prob: f64, paper: bool) -> TradeLoop {
        with_config(terminal, prob, config(paper))
    }

    fn with_config(terminal: &Arc<FakeTerminal>, prob: f64, config: TradingConfig) -> TradeLoop {
        TradeLoop::new(
            Arc::clone(terminal) as Arc<dyn TradingTerminal>,
            Arc::new(FixedModel::new(prob)),
            config,
        )
    }

    /// Reports `first` for the first `calls` reads, then `then`.
    fn day_change_clock(first: DateTime<Utc>, calls: usize, then: DateTime<Utc>) -> Clock {
        let reads = AtomicUsize::new(0);
        Arc::new(move || {
            if reads.fetch_add(1, Ordering::SeqCst) < calls {
                first
            } else {
                then
            }
        })
    }

    #[tokio::test]
    async fn test_paper_mode_places_no_orders() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        let exit = trade_loop(&terminal, 0.8, true)
            .with_max_iterations(3)
            .run()
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::IterationLimit);
        assert!(terminal.orders.lock().unwrap().is_empty());
        assert!(terminal.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_live_long_submits_bracket_order() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        trade_loop(&terminal, 0.8, false)
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        let orders = terminal.orders.lock().unwrap();
        assert_eq!(orders.len(), 2);
        let order = &orders[0];
        assert_eq!(order.side, OrderSide::Buy);
        // 10000 * 0.005 / (20 * 10)
        assert_eq!(order.volume, dec!(0.25));
        let price = order.price.unwrap();
        assert_eq!(price - order.sl.unwrap(), dec!(0.002));
        assert_eq!(order.tp.unwrap() - price, dec!(0.003));
        assert_eq!(order.comment, "ml-signal");
    }

    #[tokio::test]
    async fn test_live_short_side() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        trade_loop(&terminal, 0.2, false)
            .with_max_iterations(1)
            .run()
            .await
            .unwrap();

        let orders = terminal.orders.lock().unwrap();
        assert_eq!(orders[0].side, OrderSide::Sell);
        assert!(orders[0].sl.unwrap() > orders[0].tp.unwrap());
    }

    #[tokio::test]
    async fn test_flat_probability_skips() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        trade_loop(&terminal, 0.5, false)
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        assert!(terminal.orders.lock().unwrap().is_empty());
        // only the starting snapshot
        assert_eq!(*terminal.account_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_wide_spread_skips_before_account_check() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 45.0), &[]));
        trade_loop(&terminal, 0.9, false)
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        assert!(terminal.orders.lock().unwrap().is_empty());
        assert_eq!(*terminal.account_calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_loss_cap_holds_within_the_same_day() {
        let day = Utc.with_ymd_and_hms(2024, 2, 5, 23, 59, 0).unwrap();
        let terminal = Arc::new(FakeTerminal::new(
            bars(120, 10.0),
            &[dec!(10000), dec!(9700)],
        ));
        let exit = trade_loop(&terminal, 0.8, false)
            .with_clock(Arc::new(move || day))
            .with_max_iterations(5)
            .run()
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::LossCapHit);
        assert!(terminal.orders.lock().unwrap().is_empty());
        assert!(terminal.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_new_day_resets_loss_cap_reference() {
        let day_one = Utc.with_ymd_and_hms(2024, 2, 5, 23, 59, 0).unwrap();
        let day_two = Utc.with_ymd_and_hms(2024, 2, 6, 0, 1, 0).unwrap();
        // down 3% against a 2% cap, but the drop lands after midnight
        let terminal = Arc::new(FakeTerminal::new(
            bars(120, 10.0),
            &[dec!(10000), dec!(9700)],
        ));
        let exit = trade_loop(&terminal, 0.8, false)
            .with_clock(day_change_clock(day_one, 1, day_two))
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::IterationLimit);
        let orders = terminal.orders.lock().unwrap();
        assert_eq!(orders.len(), 2);
        // sized from the reset equity: 9700 * 0.005 / (20 * 10)
        assert_eq!(orders[0].volume, dec!(0.24));
    }

    #[tokio::test]
    async fn test_live_without_sizing_pip_value_refuses_to_start() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        let config = TradingConfig {
            paper: false,
            poll_interval_secs: 0,
            ..TradingConfig::default()
        };
        let err = with_config(&terminal, 0.8, config)
            .with_max_iterations(1)
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("sizing_pip_value"));
        assert!(terminal.orders.lock().unwrap().is_empty());
        assert_eq!(*terminal.account_calls.lock().unwrap(), 0);
        assert!(terminal.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_paper_without_sizing_pip_value_still_runs() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        let config = TradingConfig {
            poll_interval_secs: 0,
            ..TradingConfig::default()
        };
        let exit = with_config(&terminal, 0.8, config)
            .with_max_iterations(1)
            .run()
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::IterationLimit);
        assert!(terminal.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volume_above_symbol_max_is_skipped() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        // 10000 * 0.005 / (20 * 0.01) = 250 lots against a 100 lot max
        let config = TradingConfig {
            sizing_pip_value: Some(0.01),
            ..config(false)
        };
        let exit = with_config(&terminal, 0.8, config)
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        assert_eq!(exit, LoopExit::IterationLimit);
        assert!(terminal.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_volume_below_symbol_min_is_skipped() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        // 10000 * 0.005 / (20 * 10000) = 0.00025 lots against a 0.01 lot min
        let config = TradingConfig {
            sizing_pip_value: Some(10000.0),
            ..config(false)
        };
        with_config(&terminal, 0.2, config)
            .with_max_iterations(2)
            .run()
            .await
            .unwrap();

        assert!(terminal.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_too_few_bars_is_an_error() {
        let terminal = Arc::new(FakeTerminal::new(bars(30, 10.0), &[]));
        let err = trade_loop(&terminal, 0.8, true)
            .with_max_iterations(1)
            .run()
            .await
            .unwrap_err();

        assert!(err.to_string().contains("no complete feature row"));
        assert!(terminal.shut_down.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_stop_handle() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        let trade_loop = trade_loop(&terminal, 0.8, false);
        trade_loop.stop_handle().store(true, Ordering::SeqCst);

        assert_eq!(trade_loop.run().await.unwrap(), LoopExit::Stopped);
        assert!(terminal.orders.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mismatched_model_features_rejected() {
        let terminal = Arc::new(FakeTerminal::new(bars(120, 10.0), &[]));
        let model = FixedModel {
            names: vec!["x".to_string()],
            prob: 0.9,
        };
        let err = TradeLoop::new(
            Arc::clone(&terminal) as Arc<dyn TradingTerminal>,
            Arc::new(model),
            config(true),
        )
        .run()
        .await
        .unwrap_err();

        assert!(err.to_string().contains("do not match"));
        assert!(terminal.shut_down.load(Ordering::SeqCst));
    }
}
