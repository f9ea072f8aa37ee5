//! Technical indicator primitives.
//!
//! Every function returns a series the same length as its input, with `NaN`
//! wherever the value is not yet defined.

/// Fractional change over `periods` observations: `x[t] / x[t - periods] - 1`.
#[must_use]
pub fn pct_change(values: &[f64], periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if periods == 0 {
        return values.iter().map(|_| 0.0).collect();
    }
    for i in periods..values.len() {
        out[i] = values[i] / values[i - periods] - 1.0;
    }
    out
}

/// Rolling sample standard deviation (n - 1 denominator).
///
/// A window containing any `NaN` yields `NaN`.
#[must_use]
pub fn rolling_std(values: &[f64], window: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if window < 2 || values.len() < window {
        return out;
    }

    for end in (window - 1)..values.len() {
        let slice = &values[end + 1 - window..=end];
        if slice.iter().any(|v| v.is_nan()) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        out[end] = var.sqrt();
    }
    out
}

/// Exponentially weighted mean with span-derived `alpha = 2 / (span + 1)`.
///
/// Uses adjusted weights, so the first value equals the first observation and
/// early values are the weighted average of everything seen so far.
#[must_use]
pub fn ewm_mean_span(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let decay = 1.0 - alpha;

    let mut out = Vec::with_capacity(values.len());
    let mut num = 0.0;
    let mut den = 0.0;
    for &x in values {
        if x.is_nan() {
            // carry the weights forward without a new observation
            num *= decay;
            den *= decay;
        } else {
            num = x + decay * num;
            den = 1.0 + decay * den;
        }
        out.push(if den > 0.0 { num / den } else { f64::NAN });
    }
    out
}

/// Recursive exponential mean `y = (1 - alpha) * y_prev + alpha * x`.
///
/// The recursion starts at the first non-`NaN` value; outputs before
/// `min_periods` observations have been seen are `NaN`.
#[must_use]
pub fn ewm_mean_alpha(values: &[f64], alpha: f64, min_periods: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    let mut state: Option<f64> = None;
    let mut seen = 0usize;

    for (i, &x) in values.iter().enumerate() {
        if x.is_nan() {
            if seen >= min_periods.max(1) {
                out[i] = state.unwrap_or(f64::NAN);
            }
            continue;
        }
        seen += 1;
        let next = match state {
            Some(prev) => (1.0 - alpha) * prev + alpha * x,
            None => x,
        };
        state = Some(next);
        if seen >= min_periods.max(1) {
            out[i] = next;
        }
    }
    out
}

/// Unadjusted EMA with `alpha = 2 / (period + 1)` and a full `period` warm-up.
#[must_use]
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    ewm_mean_alpha(values, 2.0 / (period as f64 + 1.0), period)
}

/// Relative Strength Index with Wilder smoothing (`alpha = 1 / window`).
///
/// Reads 100 when the average loss is zero.
#[must_use]
pub fn rsi(closes: &[f64], window: usize) -> Vec<f64> {
    let n = closes.len();
    let mut up = vec![0.0; n];
    let mut down = vec![0.0; n];
    for i in 1..n {
        let diff = closes[i] - closes[i - 1];
        if diff > 0.0 {
            up[i] = diff;
        } else if diff < 0.0 {
            down[i] = -diff;
        }
    }

    let alpha = 1.0 / window as f64;
    let avg_up = ewm_mean_alpha(&up, alpha, window);
    let avg_down = ewm_mean_alpha(&down, alpha, window);

    avg_up
        .iter()
        .zip(&avg_down)
        .map(|(&u, &d)| {
            if u.is_nan() || d.is_nan() {
                f64::NAN
            } else if d == 0.0 {
                100.0
            } else {
                100.0 - 100.0 / (1.0 + u / d)
            }
        })
        .collect()
}

/// MACD line and its signal line.
#[derive(Debug, Clone)]
pub struct Macd {
    pub line: Vec<f64>,
    pub signal: Vec<f64>,
}

/// MACD: `ema(fast) - ema(slow)`, signal is `ema(signal)` of the MACD line.
#[must_use]
pub fn macd(closes: &[f64], fast: usize, slow: usize, signal: usize) -> Macd {
    let fast_ema = ema(closes, fast);
    let slow_ema = ema(closes, slow);
    let line: Vec<f64> = fast_ema.iter().zip(&slow_ema).map(|(f, s)| f - s).collect();
    let signal = ema(&line, signal);
    Macd { line, signal }
}

/// Average True Range.
///
/// The first value (at `window - 1`) is the mean true range of the first
/// window; later values use Wilder's recursion. Positions before it are 0.
#[must_use]
pub fn average_true_range(high: &[f64], low: &[f64], close: &[f64], window: usize) -> Vec<f64> {
    let n = close.len().min(high.len()).min(low.len());
    let mut atr = vec![0.0; n];
    if window == 0 || n < window {
        return atr;
    }

    let tr: Vec<f64> = (0..n)
        .map(|i| {
            let range = high[i] - low[i];
            if i == 0 {
                range
            } else {
                let prev = close[i - 1];
                range.max((high[i] - prev).abs()).max((low[i] - prev).abs())
            }
        })
        .collect();

    atr[window - 1] = tr[..window].iter().sum::<f64>() / window as f64;
    for i in window..n {
        atr[i] = (atr[i - 1] * (window - 1) as f64 + tr[i]) / window as f64;
    }
    atr
}
