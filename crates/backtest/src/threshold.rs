//! Bar-by-bar replay of thresholded model probabilities.

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use fx_algo_core::{BacktestConfig, Bar, Direction, DirectionModel};
use fx_algo_features::make_features;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdParams {
    pub long_threshold: f64,
    pub short_threshold: f64,
    pub sl_pips: f64,
    pub tp_pips: f64,
    /// Price distance of one pip.
    pub pip_value: f64,
}

impl Default for ThresholdParams {
    fn default() -> Self {
        Self::from(&BacktestConfig::default())
    }
}

impl From<&BacktestConfig> for ThresholdParams {
    fn from(config: &BacktestConfig) -> Self {
        Self {
            long_threshold: config.long_threshold,
            short_threshold: config.short_threshold,
            sl_pips: config.sl_pips,
            tp_pips: config.tp_pips,
            pip_value: config.pip_value,
        }
    }
}

/// Outcome of holding from one bar's close to the next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub time: DateTime<Utc>,
    /// +1 long, -1 short, 0 flat.
    pub direction: i8,
    /// Price units.
    pub pnl: f64,
    pub equity: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityCurve {
    pub points: Vec<EquityPoint>,
}

impl EquityCurve {
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn final_equity(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.equity)
    }

    /// Writes `time,direction,pnl,equity` rows.
    ///
    /// # Errors
    /// Returns error if the file cannot be created or writing fails
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;
        for point in &self.points {
            writer.serialize(point)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Replays `probs` against `closes`.
///
/// For each bar but the last, the direction comes from the thresholds and the
/// trade is held to the next close. The move in pips is clamped to the stop
/// loss and take profit; P&L is in price units and equity starts at 0. The
/// curve has one point per bar except the last, keyed by the entry bar's time.
///
/// # Errors
/// Returns error if the inputs differ in length or `pip_value` is not positive.
pub fn backtest_threshold(
    closes: &[f64],
    times: &[DateTime<Utc>],
    probs: &[f64],
    params: &ThresholdParams,
) -> Result<EquityCurve> {
    if closes.len() != times.len() || closes.len() != probs.len() {
        bail!(
            "input lengths differ: {} closes, {} times, {} probabilities",
            closes.len(),
            times.len(),
            probs.len()
        );
    }
    if params.pip_value <= 0.0 {
        bail!("pip_value must be positive");
    }

    let steps = closes.len().saturating_sub(1);
    let mut points = Vec::with_capacity(steps);
    let mut equity = 0.0;

    for i in 0..steps {
        let direction =
            Direction::from_probability(probs[i], params.long_threshold, params.short_threshold);
        let sign = direction.sign();

        let pnl = if sign == 0 {
            0.0
        } else {
            let move_pips = (closes[i + 1] - closes[i]) / params.pip_value * f64::from(sign);
            if move_pips <= -params.sl_pips {
                -params.sl_pips * params.pip_value
            } else if move_pips >= params.tp_pips {
                params.tp_pips * params.pip_value
            } else {
                move_pips * params.pip_value
            }
        };

        equity += pnl;
        points.push(EquityPoint {
            time: times[i],
            direction: sign,
            pnl,
            equity,
        });
    }

    Ok(EquityCurve { points })
}

/// Builds features from `bars`, scores every row with `model`, and replays the
/// result with [`backtest_threshold`].
///
/// # Errors
/// Returns error if the model expects different feature columns or scoring fails.
pub fn backtest_model(
    bars: &[Bar],
    model: &dyn DirectionModel,
    params: &ThresholdParams,
) -> Result<EquityCurve> {
    let frame = make_features(bars);
    if model.feature_names() != frame.columns() {
        bail!(
            "model features {:?} do not match computed features {:?}",
            model.feature_names(),
            frame.columns()
        );
    }

    let mut closes = Vec::with_capacity(frame.len());
    let mut times = Vec::with_capacity(frame.len());
    let mut probs = Vec::with_capacity(frame.len());
    for row in frame.rows() {
        closes.push(bars[row.index].close);
        times.push(row.time);
        probs.push(model.prob_long(&row.values)?);
    }

    tracing::info!(rows = frame.len(), "Scored feature rows");
    backtest_threshold(&closes, &times, &probs, params)
}
