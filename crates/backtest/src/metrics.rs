use crate::threshold::EquityCurve;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub bars: usize,
    /// Price units.
    pub total_pnl: f64,
    pub total_pips: f64,
    pub num_trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate: f64,
    /// Gross profit over gross loss, `None` without losing trades.
    pub profit_factor: Option<f64>,
    /// Largest peak-to-trough fall of the equity curve, price units.
    pub max_drawdown: f64,
    pub max_drawdown_pips: f64,
    /// Fraction of bars with an open position.
    pub exposure: f64,
}

pub struct MetricsCalculator {
    pip_value: f64,
    equity_curve: Vec<f64>,
    gross_profit: f64,
    gross_loss: f64,
    trades: usize,
    wins: usize,
    losses: usize,
    start_time: Option<DateTime<Utc>>,
    end_time: Option<DateTime<Utc>>,
}

impl MetricsCalculator {
    /// Creates a calculator whose equity starts at 0.
    #[must_use]
    pub fn new(pip_value: f64) -> Self {
        Self {
            pip_value,
            equity_curve: vec![0.0],
            gross_profit: 0.0,
            gross_loss: 0.0,
            trades: 0,
            wins: 0,
            losses: 0,
            start_time: None,
            end_time: None,
        }
    }

    /// Records one bar step; flat steps only extend the curve.
    pub fn add_step(&mut self, time: DateTime<Utc>, direction: i8, pnl: f64) {
        let current = self.equity_curve.last().copied().unwrap_or(0.0);
        self.equity_curve.push(current + pnl);
        self.start_time.get_or_insert(time);
        self.end_time = Some(time);

        if direction == 0 {
            return;
        }
        self.trades += 1;
        if pnl > 0.0 {
            self.wins += 1;
            self.gross_profit += pnl;
        } else if pnl < 0.0 {
            self.losses += 1;
            self.gross_loss -= pnl;
        }
    }

    #[must_use]
    pub fn from_curve(curve: &EquityCurve, pip_value: f64) -> Self {
        let mut calc = Self::new(pip_value);
        for point in &curve.points {
            calc.add_step(point.time, point.direction, point.pnl);
        }
        calc
    }

    #[must_use]
    pub fn calculate(&self) -> BacktestSummary {
        let bars = self.equity_curve.len() - 1;
        let total_pnl = self.equity_curve.last().copied().unwrap_or(0.0);
        let max_drawdown = self.calculate_max_drawdown();
        let to_pips = |v: f64| {
            if self.pip_value > 0.0 {
                v / self.pip_value
            } else {
                0.0
            }
        };

        let win_rate = if self.trades > 0 {
            self.wins as f64 / self.trades as f64
        } else {
            0.0
        };
        let exposure = if bars > 0 {
            self.trades as f64 / bars as f64
        } else {
            0.0
        };

        BacktestSummary {
            start_time: self.start_time,
            end_time: self.end_time,
            bars,
            total_pnl,
            total_pips: to_pips(total_pnl),
            num_trades: self.trades,
            wins: self.wins,
            losses: self.losses,
            win_rate,
            profit_factor: (self.gross_loss > 0.0).then(|| self.gross_profit / self.gross_loss),
            max_drawdown,
            max_drawdown_pips: to_pips(max_drawdown),
            exposure,
        }
    }

    fn calculate_max_drawdown(&self) -> f64 {
        let mut max_drawdown = 0.0;
        let mut peak = self.equity_curve[0];

        for &equity in &self.equity_curve {
            if equity > peak {
                peak = equity;
            }
            let drawdown = peak - equity;
            if drawdown > max_drawdown {
                max_drawdown = drawdown;
            }
        }

        max_drawdown
    }
}
