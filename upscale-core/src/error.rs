//! Core error types.

use thiserror::Error;

/// Result alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by core type validation.
#[derive(Error, Debug)]
pub enum Error {
    /// A frame buffer does not match its declared geometry.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// A parameter was out of range or inconsistent.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// A single frame could not be transformed.
///
/// The pipeline tags this with the presentation time of the offending
/// frame when it reports the failure.
#[derive(Error, Debug, Clone)]
#[error("{0}")]
pub struct TransformError(pub String);

impl TransformError {
    /// Create a transform error from any displayable reason.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self(reason.into())
    }
}
