//! Wire types exchanged with the terminal bridge.

use crate::error::{Mt5Error, Result};
use fx_algo_core::{AccountSnapshot, OrderResult, SymbolSnapshot};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// `TRADE_ACTION_DEAL`: immediate market execution.
pub const TRADE_ACTION_DEAL: u32 = 1;
/// `ORDER_TYPE_BUY`.
pub const ORDER_TYPE_BUY: u32 = 0;
/// `ORDER_TYPE_SELL`.
pub const ORDER_TYPE_SELL: u32 = 1;

/// Reply envelope shared by every bridge function.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<LastError>,
}

/// The terminal's `last_error()` pair.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastError {
    pub code: i64,
    pub message: String,
}

impl LastError {
    pub(crate) fn unknown() -> Self {
        Self {
            code: -1,
            message: "no error reported".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct InitializeParams<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<&'a str>,
    pub login: u64,
    pub password: &'a str,
    pub server: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct LoginParams<'a> {
    pub login: u64,
    pub password: &'a str,
    pub server: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SymbolParams<'a> {
    pub symbol: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct SymbolSelectParams<'a> {
    pub symbol: &'a str,
    pub enable: bool,
}

/// `date_from`/`date_to` are unix seconds.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RatesRangeParams<'a> {
    pub symbol: &'a str,
    pub timeframe: u32,
    pub date_from: i64,
    pub date_to: i64,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct RatesFromPosParams<'a> {
    pub symbol: &'a str,
    pub timeframe: u32,
    pub start_pos: usize,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct OrderSendParams<'a> {
    pub request: &'a TradeRequest,
}

/// An `order_send` request as the terminal expects it.
///
/// `price`, `sl` and `tp` are left out of the payload when not set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRequest {
    pub action: u32,
    pub symbol: String,
    pub volume: f64,
    #[serde(rename = "type")]
    pub order_type: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tp: Option<f64>,
    pub deviation: u32,
    pub comment: String,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAccountInfo {
    pub login: u64,
    #[serde(default)]
    pub server: String,
    #[serde(default)]
    pub currency: String,
    pub balance: f64,
    pub equity: f64,
    #[serde(default)]
    pub margin_free: f64,
    #[serde(default)]
    pub leverage: u32,
}

impl TryFrom<RawAccountInfo> for AccountSnapshot {
    type Error = Mt5Error;

    fn try_from(raw: RawAccountInfo) -> Result<Self> {
        Ok(Self {
            login: raw.login,
            server: raw.server,
            currency: raw.currency,
            balance: to_decimal("balance", raw.balance)?,
            equity: to_decimal("equity", raw.equity)?,
            margin_free: to_decimal("margin_free", raw.margin_free)?,
            leverage: raw.leverage,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawSymbolInfo {
    pub name: String,
    pub visible: bool,
    #[serde(default)]
    pub digits: u32,
    pub point: f64,
    #[serde(default)]
    pub spread: i64,
    #[serde(default)]
    pub bid: f64,
    #[serde(default)]
    pub ask: f64,
    pub volume_min: f64,
    pub volume_max: f64,
    pub volume_step: f64,
}

impl TryFrom<RawSymbolInfo> for SymbolSnapshot {
    type Error = Mt5Error;

    fn try_from(raw: RawSymbolInfo) -> Result<Self> {
        Ok(Self {
            name: raw.name,
            visible: raw.visible,
            digits: raw.digits,
            point: raw.point,
            spread: raw.spread,
            bid: raw.bid,
            ask: raw.ask,
            volume_min: to_decimal("volume_min", raw.volume_min)?,
            volume_max: to_decimal("volume_max", raw.volume_max)?,
            volume_step: to_decimal("volume_step", raw.volume_step)?,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawOrderResult {
    pub retcode: u32,
    #[serde(default)]
    pub deal: u64,
    #[serde(default)]
    pub order: u64,
    #[serde(default)]
    pub volume: f64,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub request_id: u64,
}

impl TryFrom<RawOrderResult> for OrderResult {
    type Error = Mt5Error;

    fn try_from(raw: RawOrderResult) -> Result<Self> {
        Ok(Self {
            retcode: raw.retcode,
            deal: raw.deal,
            order: raw.order,
            volume: to_decimal("volume", raw.volume)?,
            price: to_decimal("price", raw.price)?,
            comment: raw.comment,
            request_id: raw.request_id,
        })
    }
}

pub(crate) fn to_decimal(field: &'static str, value: f64) -> Result<Decimal> {
    Decimal::try_from(value).map_err(|_| Mt5Error::InvalidValue {
        field,
        value: value.to_string(),
    })
}
