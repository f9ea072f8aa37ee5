pub mod config;
pub mod config_loader;
pub mod credentials;
pub mod events;
pub mod risk;
pub mod timeframe;
pub mod traits;

pub use config::{AppConfig, BacktestConfig, BridgeConfig, TradingConfig, TrainingConfig};
pub use config_loader::ConfigLoader;
pub use credentials::Credentials;
pub use events::{
    AccountSnapshot, Bar, Direction, OrderRequest, OrderResult, OrderSide, SymbolSnapshot,
};
pub use risk::{enforce_daily_loss_cap, normalize_volume, position_size};
pub use timeframe::Timeframe;
pub use traits::{DirectionModel, TradingTerminal};
