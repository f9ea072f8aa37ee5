//! MetaTrader 5 terminal integration.
//!
//! The terminal API only lives inside the terminal process, so this crate
//! talks to a bridge (an expert advisor or sidecar next to the terminal)
//! that exposes each terminal function as `POST {base_url}/{function}`.
//! Replies share one envelope:
//!
//! ```json
//! {"ok": true, "result": {...}, "error": null}
//! {"ok": false, "result": null, "error": {"code": -6, "message": "Authorization failed"}}
//! ```
//!
//! Every call fails fast on the first error; there is no retry.

pub mod account;
pub mod client;
pub mod error;
pub mod execution;
pub mod market_data;
pub mod terminal;
pub mod types;

pub use client::{Mt5Client, Mt5ClientConfig};
pub use error::{Mt5Error, Result};
pub use execution::build_trade_request;
pub use types::TradeRequest;
