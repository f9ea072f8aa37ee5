use anyhow::Result;
use clap::Args;
use fx_algo_core::AppConfig;
use fx_algo_data::CsvStorage;
use fx_algo_features::{forward_return_labels, make_features, Dataset};
use fx_algo_model::{save_model, train_classifier, GbmParams};

#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    /// Bars CSV produced by fetch-data
    #[arg(short, long)]
    pub data: String,

    /// Where to write the model (defaults to the configured model path)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Label horizon in bars
    #[arg(long)]
    pub horizon: Option<usize>,

    /// Fraction of rows held out for validation
    #[arg(long)]
    pub test_size: Option<f64>,
}

pub fn run_train(args: TrainArgs, config: &AppConfig) -> Result<()> {
    let horizon = args.horizon.unwrap_or(config.training.horizon);
    let test_size = args.test_size.unwrap_or(config.training.test_size);
    let output = args
        .output
        .unwrap_or_else(|| config.trading.model_path.clone());

    let bars = CsvStorage::read_bars(&args.data)?;
    tracing::info!("Loaded {} bars from {}", bars.len(), args.data);

    let frame = make_features(&bars);
    let labels = forward_return_labels(&bars, horizon);
    let dataset = Dataset::from_frame(&frame, &labels)?;
    tracing::info!(
        rows = dataset.len(),
        features = dataset.n_features(),
        horizon,
        "Built training set"
    );

    let (model, report) = train_classifier(&dataset, test_size, GbmParams::from(&config.training))?;

    println!("{report}");
    println!("Top features by split count:");
    for (name, splits) in model.feature_importance().iter().take(5) {
        println!("  {name:<14} {splits}");
    }

    save_model(&model, &output)?;
    tracing::info!("✅ Saved model ({} iterations) to {}", model.n_iterations(), output);

    Ok(())
}
