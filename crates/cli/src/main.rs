use clap::{Parser, Subcommand};
use fx_algo_core::{AppConfig, ConfigLoader};

mod commands;

use commands::{BacktestArgs, CheckConnectionArgs, FetchDataArgs, RunArgs, TrainArgs};

#[derive(Parser)]
#[command(name = "fx-algo")]
#[command(about = "ML signal trading for MetaTrader 5 FX symbols", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(
        short,
        long,
        global = true,
        default_value = fx_algo_core::config_loader::DEFAULT_CONFIG_PATH
    )]
    config: String,

    /// Profile layered over the config file (reads Config.<profile>.toml next to it)
    #[arg(long, global = true, env = "FXALGO_PROFILE")]
    profile: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in, print account info and recent rates, then disconnect
    CheckConnection(CheckConnectionArgs),
    /// Download historical rates to CSV
    FetchData(FetchDataArgs),
    /// Train a direction model from a bars CSV
    Train(TrainArgs),
    /// Replay a model over a bars CSV with threshold entries
    Backtest(BacktestArgs),
    /// Run the polling signal loop against the terminal
    Run(RunArgs),
}

fn load_config(cli: &Cli) -> anyhow::Result<AppConfig> {
    match &cli.profile {
        Some(profile) => ConfigLoader::load_with_profile(&cli.config, profile),
        None => ConfigLoader::load_from(&cli.config),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = load_config(&cli)?;
    tracing::debug!(?config, "Loaded configuration");

    match cli.command {
        Commands::CheckConnection(args) => {
            commands::run_check_connection(args, &config).await?;
        }
        Commands::FetchData(args) => {
            commands::run_fetch_data(args, &config).await?;
        }
        Commands::Train(args) => {
            commands::run_train(args, &config)?;
        }
        Commands::Backtest(args) => {
            commands::run_backtest(args, &config)?;
        }
        Commands::Run(args) => {
            commands::run_trade_loop(args, &config).await?;
        }
    }

    Ok(())
}
