//! Session-level errors.

use std::path::PathBuf;

use thiserror::Error;
use upscale_core::{TrackKind, TransformError};
use upscale_pipeline::{FinalizeError, OpenError, PipelineError};

/// Result alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;

/// The single error a session run resolves to.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The configuration is out of range.
    #[error("configuration: {0}")]
    Config(String),

    /// An existing destination could not be cleared.
    #[error("preflight: could not clear {path}: {source}")]
    Preflight {
        /// The destination path.
        path: PathBuf,
        /// The underlying filesystem error.
        source: std::io::Error,
    },

    /// Opening the source or sink failed.
    #[error("open: {0}")]
    Open(#[from] OpenError),

    /// The input carries no video track.
    #[error("input has no video track")]
    NoVideoTrack,

    /// The frame transform could not be constructed.
    #[error("transform setup: {0}")]
    TransformSetup(TransformError),

    /// A track pipeline failed.
    #[error("{kind} pipeline: {source}")]
    Pipeline {
        /// Which track failed first.
        kind: TrackKind,
        /// The pipeline's first error.
        source: PipelineError,
    },

    /// Finalizing the output container failed.
    #[error("finalize: {0}")]
    Finalize(#[from] FinalizeError),

    /// The caller cancelled the session.
    #[error("cancelled")]
    Cancelled,
}
