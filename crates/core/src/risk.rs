use anyhow::Result;
use rust_decimal::Decimal;

/// Position size from the fraction of the account risked over a stop distance.
///
/// # Arguments
/// * `balance` - Account balance (or equity) in account currency
/// * `risk_fraction` - Fraction of the balance to risk (0.005 = 0.5%)
/// * `stop_pips` - Stop loss distance in pips
/// * `pip_value` - Value of one pip per unit of size
///
/// # Returns
/// `balance * risk_fraction / (stop_pips * pip_value)`
///
/// # Errors
/// Returns error if `stop_pips` or `pip_value` is not positive
pub fn position_size(
    balance: Decimal,
    risk_fraction: Decimal,
    stop_pips: Decimal,
    pip_value: Decimal,
) -> Result<Decimal> {
    if stop_pips <= Decimal::ZERO {
        anyhow::bail!("stop_pips must be positive");
    }
    if pip_value <= Decimal::ZERO {
        anyhow::bail!("pip_value must be positive");
    }

    let risk_amount = balance * risk_fraction;
    Ok(risk_amount / (stop_pips * pip_value))
}

/// Returns true when trading should stop because the loss cap is hit.
///
/// Drawdown is measured relative to `equity_start`. A non-positive starting
/// equity has nothing left to protect and always counts as hit.
#[must_use]
pub fn enforce_daily_loss_cap(
    equity_start: Decimal,
    equity_now: Decimal,
    loss_cap_fraction: Decimal,
) -> bool {
    if equity_start <= Decimal::ZERO {
        return true;
    }
    let drawdown = (equity_start - equity_now) / equity_start;
    drawdown >= loss_cap_fraction
}

/// Snaps a volume down onto the broker's step grid and clamps it into `[min, max]`.
#[must_use]
pub fn normalize_volume(volume: Decimal, min: Decimal, max: Decimal, step: Decimal) -> Decimal {
    let stepped = if step > Decimal::ZERO {
        (volume / step).floor() * step
    } else {
        volume
    };
    let upper = if max > Decimal::ZERO { max } else { stepped };
    stepped.max(min).min(upper).normalize()
}
