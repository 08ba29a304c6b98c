//! Errors raised by model loading and inference.

use thiserror::Error;
use upscale_core::TransformError;

/// Result alias for AI operations.
pub type Result<T> = std::result::Result<T, AiError>;

/// Errors raised by the upscaler and its model machinery.
#[derive(Error, Debug)]
pub enum AiError {
    /// No model file was found on the search path.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// A model file exists but could not be loaded.
    #[error("model load failed: {0}")]
    ModelLoad(String),

    /// Inference produced no usable output.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The input frame is unusable.
    #[error(transparent)]
    InvalidFrame(#[from] upscale_core::Error),
}

impl From<AiError> for TransformError {
    fn from(err: AiError) -> Self {
        TransformError::new(err.to_string())
    }
}
