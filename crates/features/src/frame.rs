//! The feature table the model trains and predicts on.

use crate::indicators::{
    average_true_range, ewm_mean_span, macd, pct_change, rolling_std, rsi,
};
use chrono::{DateTime, Datelike, Timelike, Utc};
use fx_algo_core::Bar;
use serde::{Deserialize, Serialize};

/// Column order of every feature row.
pub const FEATURE_COLUMNS: [&str; 16] = [
    "ret_1",
    "ret_5",
    "ret_20",
    "vol_20",
    "vol_50",
    "ema_20",
    "ema_50",
    "ema_gap",
    "rsi_14",
    "macd",
    "macd_signal",
    "atr_14",
    "spread",
    "tick_volume",
    "hour",
    "day_of_week",
];

/// One complete feature row and the bar it was computed at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Position of the source bar in the input slice.
    pub index: usize,
    pub time: DateTime<Utc>,
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeatureFrame {
    columns: Vec<String>,
    rows: Vec<FeatureRow>,
}

impl FeatureFrame {
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    #[must_use]
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Most recent row, the one the trade loop scores.
    #[must_use]
    pub fn last(&self) -> Option<&FeatureRow> {
        self.rows.last()
    }

    /// Values of a named column, in row order.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == name)?;
        Some(self.rows.iter().map(|r| r.values[idx]).collect())
    }
}

/// Computes indicator features for each bar and keeps only fully defined rows.
///
/// Bars must be in ascending time order. `vol_*` are rolling standard
/// deviations of `ret_1`; `day_of_week` counts from Monday = 0. With the
/// default windows the first complete row is the 51st bar.
#[must_use]
pub fn make_features(bars: &[Bar]) -> FeatureFrame {
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();

    let ret_1 = pct_change(&closes, 1);
    let ret_5 = pct_change(&closes, 5);
    let ret_20 = pct_change(&closes, 20);
    let vol_20 = rolling_std(&ret_1, 20);
    let vol_50 = rolling_std(&ret_1, 50);
    let ema_20 = ewm_mean_span(&closes, 20);
    let ema_50 = ewm_mean_span(&closes, 50);
    let rsi_14 = rsi(&closes, 14);
    let macd = macd(&closes, 12, 26, 9);
    let atr_14 = average_true_range(&highs, &lows, &closes, 14);

    let rows: Vec<FeatureRow> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| FeatureRow {
            index: i,
            time: bar.time,
            values: vec![
                ret_1[i],
                ret_5[i],
                ret_20[i],
                vol_20[i],
                vol_50[i],
                ema_20[i],
                ema_50[i],
                ema_20[i] - ema_50[i],
                rsi_14[i],
                macd.line[i],
                macd.signal[i],
                atr_14[i],
                bar.spread,
                bar.tick_volume,
                f64::from(bar.time.hour()),
                f64::from(bar.time.weekday().num_days_from_monday()),
            ],
        })
        .filter(|row| row.values.iter().all(|v| !v.is_nan()))
        .collect();

    tracing::debug!(bars = bars.len(), rows = rows.len(), "Computed features");

    FeatureFrame {
        columns: FEATURE_COLUMNS.iter().map(|c| (*c).to_string()).collect(),
        rows,
    }
}
