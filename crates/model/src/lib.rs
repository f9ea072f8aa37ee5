//! Direction classifier: histogram gradient-boosted trees with softmax loss.
//!
//! Labels are forward-return signs (`-1`, `0`, `1`); the trade loop reads the
//! probability of `1` as `prob_long`.

pub mod binning;
pub mod error;
pub mod gbm;
pub mod persist;
pub mod report;
pub mod train;
pub mod tree;

pub use error::{ModelError, Result};
pub use gbm::{GbmClassifier, GbmParams};
pub use persist::{load_model, save_model, MODEL_FORMAT_VERSION};
pub use report::{AverageMetrics, ClassMetrics, ClassificationReport};
pub use train::train_classifier;
