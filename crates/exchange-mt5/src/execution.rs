//! Order construction and submission.

use crate::client::Mt5Client;
use crate::error::{Mt5Error, Result};
use crate::types::{
    OrderSendParams, RawOrderResult, TradeRequest, ORDER_TYPE_BUY, ORDER_TYPE_SELL,
    TRADE_ACTION_DEAL,
};
use fx_algo_core::{OrderRequest, OrderResult, OrderSide};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{info, warn};

/// Builds the terminal's market-deal request from an [`OrderRequest`].
///
/// # Errors
/// Returns [`Mt5Error::InvalidValue`] if a decimal does not fit in `f64`.
pub fn build_trade_request(order: &OrderRequest) -> Result<TradeRequest> {
    let order_type = match order.side {
        OrderSide::Buy => ORDER_TYPE_BUY,
        OrderSide::Sell => ORDER_TYPE_SELL,
    };

    Ok(TradeRequest {
        action: TRADE_ACTION_DEAL,
        symbol: order.symbol.clone(),
        volume: to_f64("volume", order.volume)?,
        order_type,
        price: order.price.map(|p| to_f64("price", p)).transpose()?,
        sl: order.sl.map(|p| to_f64("sl", p)).transpose()?,
        tp: order.tp.map(|p| to_f64("tp", p)).transpose()?,
        deviation: order.deviation,
        comment: order.comment.clone(),
    })
}

fn to_f64(field: &'static str, value: Decimal) -> Result<f64> {
    value.to_f64().ok_or_else(|| Mt5Error::InvalidValue {
        field,
        value: value.to_string(),
    })
}

impl Mt5Client {
    /// Submits an order.
    ///
    /// A result with a non-success retcode is returned as-is; only a missing
    /// result is an error.
    ///
    /// # Errors
    /// Returns `order_send failed: ...` with the terminal's last error.
    pub async fn place_order(&self, order: &OrderRequest) -> Result<OrderResult> {
        let request = build_trade_request(order)?;
        info!(
            symbol = %request.symbol,
            side = ?order.side,
            volume = request.volume,
            price = ?request.price,
            sl = ?request.sl,
            tp = ?request.tp,
            "Sending order"
        );

        let raw: RawOrderResult = self
            .call("order_send", "order_send", &OrderSendParams { request: &request })
            .await?;
        let result = OrderResult::try_from(raw)?;

        if result.is_done() {
            info!(
                retcode = result.retcode,
                deal = result.deal,
                order = result.order,
                price = %result.price,
                "Order executed"
            );
        } else {
            warn!(retcode = result.retcode, comment = %result.comment, "Order not executed");
        }
        Ok(result)
    }
}
