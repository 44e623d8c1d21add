//! Error types for engine operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur while loading models or running inference.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Model file not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("Failed to load model: {message}")]
    ModelLoadFailed { message: String },

    #[error("Invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Failed to decode image: {0}")]
    ImageDecode(#[from] ::image::ImageError),

    #[error("Preprocessing failed: {0}")]
    Preprocess(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Create a model load failure error.
    pub fn model_load_failed(message: impl Into<String>) -> Self {
        Self::ModelLoadFailed {
            message: message.into(),
        }
    }

    /// Create an inference failure error.
    pub fn inference(message: impl Into<String>) -> Self {
        Self::Inference(message.into())
    }

    /// Whether this error is a bad-input problem rather than an engine
    /// fault. Bad input is never retried against another strategy.
    pub fn is_bad_input(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidBase64(_) | EngineError::ImageDecode(_)
        )
    }
}
