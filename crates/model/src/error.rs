use thiserror::Error;

/// Errors from training, scoring, or persisting a model.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("invalid parameter: {0}")]
    InvalidParams(String),

    #[error("expected {expected} features, got {got}")]
    FeatureMismatch { expected: usize, got: usize },

    #[error("unsupported model format version {found} (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ModelError>;
