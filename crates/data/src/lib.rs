//! Bar storage for the FX trading helper.
//!
//! Bars are kept in plain CSV files with the same columns the terminal reports,
//! so data pulled once with `fetch-data` can be replayed by `train` and `backtest`.

pub mod csv_storage;

pub use csv_storage::CsvStorage;
