//! Feature engineering for FX bar data.
//!
//! - [`indicators`]: rolling and exponential primitives over close/high/low series
//! - [`frame`]: the model's feature table built from bars
//! - [`labels`]: forward-return sign labels
//! - [`dataset`]: feature rows joined with labels, chronological splits

pub mod dataset;
pub mod frame;
pub mod indicators;
pub mod labels;

pub use dataset::Dataset;
pub use frame::{make_features, FeatureFrame, FeatureRow, FEATURE_COLUMNS};
pub use labels::forward_return_labels;
