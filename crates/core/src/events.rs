use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Terminal return code for a completed request.
pub const RETCODE_DONE: u32 = 10009;
/// Terminal return code for an order placed but not yet filled.
pub const RETCODE_PLACED: u32 = 10008;

/// One price bar as the terminal reports it.
///
/// `time` is the bar open time; on the wire and in CSV files it is unix seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    #[serde(with = "chrono::serde::ts_seconds")]
    pub time: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    #[serde(default)]
    pub tick_volume: f64,
    /// Spread in points.
    #[serde(default)]
    pub spread: f64,
    #[serde(default)]
    pub real_volume: f64,
}

/// Trade direction derived from the model's long probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Flat,
}

impl Direction {
    /// Maps `prob_long` onto a direction using strict thresholds.
    ///
    /// `prob_long > long_threshold` is long, `prob_long < short_threshold` is short,
    /// anything in between (inclusive of both thresholds) is flat.
    #[must_use]
    pub fn from_probability(prob_long: f64, long_threshold: f64, short_threshold: f64) -> Self {
        if prob_long > long_threshold {
            Self::Long
        } else if prob_long < short_threshold {
            Self::Short
        } else {
            Self::Flat
        }
    }

    /// +1 for long, -1 for short, 0 for flat.
    #[must_use]
    pub const fn sign(self) -> i8 {
        match self {
            Self::Long => 1,
            Self::Short => -1,
            Self::Flat => 0,
        }
    }

    #[must_use]
    pub const fn order_side(self) -> Option<OrderSide> {
        match self {
            Self::Long => Some(OrderSide::Buy),
            Self::Short => Some(OrderSide::Sell),
            Self::Flat => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sign())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub login: u64,
    pub server: String,
    pub currency: String,
    pub balance: Decimal,
    pub equity: Decimal,
    pub margin_free: Decimal,
    pub leverage: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolSnapshot {
    pub name: String,
    pub visible: bool,
    pub digits: u32,
    pub point: f64,
    /// Current spread in points.
    pub spread: i64,
    pub bid: f64,
    pub ask: f64,
    pub volume_min: Decimal,
    pub volume_max: Decimal,
    pub volume_step: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A market deal request, optionally bracketed by stop loss and take profit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub volume: Decimal,
    pub price: Option<Decimal>,
    pub sl: Option<Decimal>,
    pub tp: Option<Decimal>,
    /// Maximum accepted slippage in points.
    pub deviation: u32,
    pub comment: String,
}

impl OrderRequest {
    #[must_use]
    pub fn market(symbol: impl Into<String>, side: OrderSide, volume: Decimal) -> Self {
        Self {
            symbol: symbol.into(),
            side,
            volume,
            price: None,
            sl: None,
            tp: None,
            deviation: 10,
            comment: String::new(),
        }
    }
}

/// The terminal's answer to an order submission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub retcode: u32,
    pub deal: u64,
    pub order: u64,
    pub volume: Decimal,
    pub price: Decimal,
    pub comment: String,
    pub request_id: u64,
}

impl OrderResult {
    #[must_use]
    pub const fn is_done(&self) -> bool {
        self.retcode == RETCODE_DONE || self.retcode == RETCODE_PLACED
    }
}
