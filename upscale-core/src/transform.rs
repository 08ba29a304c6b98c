//! The frame transform seam.

use crate::error::TransformError;
use crate::frame::VideoFrame;

/// A frame-to-frame mapping applied to every decoded video frame.
///
/// Implementations are shared across pipeline threads, so they must be
/// `Send + Sync` and keep any internal state behind their own locks.
/// The output dimensions of `transform` must equal `output_size` for
/// the input's dimensions; presentation timing is owned by the caller
/// and is never altered by a transform.
pub trait FrameTransform: Send + Sync {
    /// Output dimensions for a given input size.
    fn output_size(&self, width: u32, height: u32) -> (u32, u32);

    /// Map one decoded frame to its transformed counterpart.
    fn transform(&self, frame: &VideoFrame) -> Result<VideoFrame, TransformError>;
}

/// The identity transform. Useful for audio-only style passthrough and
/// as a test double.
#[derive(Debug, Default, Clone, Copy)]
pub struct Passthrough;

impl FrameTransform for Passthrough {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width, height)
    }

    fn transform(&self, frame: &VideoFrame) -> Result<VideoFrame, TransformError> {
        Ok(frame.clone())
    }
}
