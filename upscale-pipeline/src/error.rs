//! Pipeline error taxonomy.

use thiserror::Error;
use upscale_core::{Timestamp, TransformError};

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Errors opening a source or sink.
#[derive(Error, Debug)]
pub enum OpenError {
    /// The input file does not exist.
    #[error("file not found: {0}")]
    NotFound(String),

    /// An I/O error while opening.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The container or codec is not supported.
    #[error("unsupported format: {0}")]
    Unsupported(String),

    /// A track descriptor is inconsistent or a writer was requested twice.
    #[error("track configuration: {0}")]
    TrackConfig(String),
}

/// Errors while pulling samples from a source track.
#[derive(Error, Debug)]
pub enum ReadError {
    /// The bitstream is damaged.
    #[error("corrupt stream: {0}")]
    Corrupt(String),

    /// Decoding failed.
    #[error("decode failed: {0}")]
    Decode(String),

    /// An underlying I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors while pushing samples into a sink track.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Encoding failed.
    #[error("encode failed: {0}")]
    Encode(String),

    /// An underlying I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A write or finish was attempted on an already finished track.
    #[error("track already finished")]
    TrackFinished,
}

/// Errors finalizing a sink.
#[derive(Error, Debug)]
pub enum FinalizeError {
    /// Finalize was called with unfinished tracks.
    #[error("{0} track(s) still pending")]
    TracksPending(usize),

    /// Writing the container trailer failed.
    #[error("trailer write failed: {0}")]
    Trailer(String),

    /// An underlying I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// The terminal error of a single track pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Reading or decoding the source failed.
    #[error("read: {0}")]
    Read(#[from] ReadError),

    /// Encoding or writing the sink failed.
    #[error("write: {0}")]
    Write(#[from] WriteError),

    /// The frame transform failed on a specific frame.
    #[error("transform at {pts}: {source}")]
    Transform {
        /// Presentation time of the offending frame.
        pts: Timestamp,
        /// Transform failure reason.
        source: TransformError,
    },

    /// The pipeline stopped because the shared token was tripped.
    #[error("cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Whether this is the cooperative-stop reason rather than a root cause.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PipelineError::Cancelled)
    }
}
