use crate::timeframe::Timeframe;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub bridge: BridgeConfig,
    pub trading: TradingConfig,
    pub training: TrainingConfig,
    pub backtest: BacktestConfig,
}

/// Where the terminal bridge listens.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub model_path: String,
    /// Fraction of equity risked per trade.
    pub risk_fraction: f64,
    pub sl_pips: f64,
    pub tp_pips: f64,
    /// Price distance of one pip.
    pub pip_value: f64,
    /// Account-currency value of one pip per lot for sizing; falls back to `pip_value`.
    pub sizing_pip_value: Option<f64>,
    pub long_threshold: f64,
    pub short_threshold: f64,
    /// Skip signals while the last bar's spread is above this many points.
    pub max_spread_points: f64,
    pub daily_loss_cap: f64,
    pub bar_count: usize,
    pub poll_interval_secs: u64,
    pub deviation: u32,
    pub comment: String,
    pub paper: bool,
}

impl TradingConfig {
    #[must_use]
    pub fn sizing_pip_value(&self) -> f64 {
        self.sizing_pip_value.unwrap_or(self.pip_value)
    }
}

/// Label horizon, split, and boosting hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    pub horizon: usize,
    pub test_size: f64,
    pub n_estimators: usize,
    pub learning_rate: f64,
    /// `None` leaves depth unbounded, growth is limited by `num_leaves`.
    pub max_depth: Option<usize>,
    pub num_leaves: usize,
    pub subsample: f64,
    /// Bagging runs every `subsample_freq` iterations; 0 disables it.
    pub subsample_freq: usize,
    pub colsample_bytree: f64,
    pub reg_alpha: f64,
    pub reg_lambda: f64,
    pub min_child_samples: usize,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub long_threshold: f64,
    pub short_threshold: f64,
    pub sl_pips: f64,
    pub tp_pips: f64,
    pub pip_value: f64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:18812".to_string(),
            timeout_secs: 30,
            requests_per_second: 20,
        }
    }
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            symbol: "EURUSD".to_string(),
            timeframe: Timeframe::M5,
            model_path: "models/model.json".to_string(),
            risk_fraction: 0.005,
            sl_pips: 20.0,
            tp_pips: 30.0,
            pip_value: 0.0001,
            sizing_pip_value: None,
            long_threshold: 0.55,
            short_threshold: 0.45,
            max_spread_points: 30.0,
            daily_loss_cap: 0.02,
            bar_count: 200,
            poll_interval_secs: 60,
            deviation: 10,
            comment: "ml-signal".to_string(),
            paper: true,
        }
    }
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            horizon: 12,
            test_size: 0.2,
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: None,
            num_leaves: 64,
            subsample: 0.8,
            subsample_freq: 0,
            colsample_bytree: 0.8,
            reg_alpha: 0.1,
            reg_lambda: 0.1,
            min_child_samples: 20,
            seed: 42,
        }
    }
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            long_threshold: 0.55,
            short_threshold: 0.45,
            sl_pips: 20.0,
            tp_pips: 30.0,
            pip_value: 0.0001,
        }
    }
}
