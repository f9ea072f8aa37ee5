use anyhow::Result;
use clap::Args;
use fx_algo_backtest::{backtest_model, MetricsCalculator, ReportFormatter, ThresholdParams};
use fx_algo_core::AppConfig;
use fx_algo_data::CsvStorage;
use fx_algo_model::load_model;

#[derive(Args, Debug, Clone)]
pub struct BacktestArgs {
    /// Bars CSV produced by fetch-data
    #[arg(short, long)]
    pub data: String,

    /// Trained model (defaults to the configured model path)
    #[arg(short, long)]
    pub model: Option<String>,

    /// Optional CSV file for the per-bar equity curve
    #[arg(long)]
    pub equity_out: Option<String>,

    /// Override the configured long threshold
    #[arg(long)]
    pub long_threshold: Option<f64>,

    /// Override the configured short threshold
    #[arg(long)]
    pub short_threshold: Option<f64>,
}

pub fn run_backtest(args: BacktestArgs, config: &AppConfig) -> Result<()> {
    let model_path = args
        .model
        .unwrap_or_else(|| config.trading.model_path.clone());
    let mut params = ThresholdParams::from(&config.backtest);
    if let Some(long) = args.long_threshold {
        params.long_threshold = long;
    }
    if let Some(short) = args.short_threshold {
        params.short_threshold = short;
    }

    let bars = CsvStorage::read_bars(&args.data)?;
    let model = load_model(&model_path)?;
    tracing::info!("Running backtest on {} bars with model {}", bars.len(), model_path);

    let curve = backtest_model(&bars, &model, &params)?;
    let summary = MetricsCalculator::from_curve(&curve, params.pip_value).calculate();
    println!("{}", ReportFormatter::format(&summary));

    if let Some(path) = args.equity_out {
        curve.write_csv(&path)?;
        tracing::info!("Wrote {} equity points to {}", curve.len(), path);
    }

    Ok(())
}
