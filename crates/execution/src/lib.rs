//! Live side of the FX signal trader.
//!
//! [`TradeLoop`] polls the terminal for bars, scores the newest feature row,
//! and either logs a paper signal or submits a bracketed market order.

pub mod order;
pub mod trade_loop;

pub use order::build_bracket_order;
pub use trade_loop::{Clock, LoopExit, TradeLoop};
