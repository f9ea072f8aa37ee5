use fx_algo_core::Bar;

/// Sign of the forward return `close[t + horizon] / close[t] - 1`.
///
/// Returns one entry per bar: `Some(1)`, `Some(-1)` or `Some(0)`, and `None`
/// for the last `horizon` bars whose future close is unknown.
#[must_use]
pub fn forward_return_labels(bars: &[Bar], horizon: usize) -> Vec<Option<i8>> {
    (0..bars.len())
        .map(|t| {
            let future = bars.get(t + horizon)?;
            let fwd_ret = future.close / bars[t].close - 1.0;
            Some(if fwd_ret > 0.0 {
                1
            } else if fwd_ret < 0.0 {
                -1
            } else {
                0
            })
        })
        .collect()
}
