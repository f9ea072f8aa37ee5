use anyhow::{bail, Result};
use fx_algo_core::{Direction, OrderRequest};
use rust_decimal::Decimal;

/// Market order with stop loss and take profit placed `sl_pips` / `tp_pips` away from `price`.
///
/// For a long, the stop sits below the price and the target above; a short mirrors both.
///
/// # Errors
/// Returns error for a flat direction or a non-positive volume.
#[allow(clippy::too_many_arguments)]
pub fn build_bracket_order(
    symbol: &str,
    direction: Direction,
    volume: Decimal,
    price: Decimal,
    sl_pips: Decimal,
    tp_pips: Decimal,
    pip_value: Decimal,
    deviation: u32,
    comment: &str,
) -> Result<OrderRequest> {
    let Some(side) = direction.order_side() else {
        bail!("cannot build an order for a flat signal");
    };
    if volume <= Decimal::ZERO {
        bail!("order volume must be positive, got {volume}");
    }

    let sign = Decimal::from(direction.sign());
    let sl = price - sl_pips * pip_value * sign;
    let tp = price + tp_pips * pip_value * sign;

    Ok(OrderRequest {
        symbol: symbol.to_string(),
        side,
        volume,
        price: Some(price),
        sl: Some(sl),
        tp: Some(tp),
        deviation,
        comment: comment.to_string(),
    })
}
