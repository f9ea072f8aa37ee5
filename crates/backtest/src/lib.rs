pub mod formatter;
pub mod metrics;
pub mod threshold;

pub use formatter::ReportFormatter;
pub use metrics::{BacktestSummary, MetricsCalculator};
pub use threshold::{backtest_model, backtest_threshold, EquityCurve, EquityPoint, ThresholdParams};
