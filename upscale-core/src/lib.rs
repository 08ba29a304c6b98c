//! Core types for the upscale media pipeline.
//!
//! This crate carries the data model shared by every other workspace
//! member: rational arithmetic, timestamps and durations, decoded
//! frames and audio buffers, the [`Sample`] envelope, container and
//! codec identifiers, and the [`FrameTransform`] seam behind which the
//! learned upscaler lives.

pub mod error;
pub mod format;
pub mod frame;
pub mod rational;
pub mod sample;
pub mod timing;
pub mod transform;

pub use error::{Error, Result, TransformError};
pub use format::{AudioCodec, ContainerFormat, VideoCodec};
pub use frame::{PixelFormat, VideoFrame};
pub use rational::Rational;
pub use sample::{AudioBuffer, Sample, SampleFormat, SamplePayload, TrackKind};
pub use timing::{Duration, TimeBase, Timestamp};
pub use transform::{FrameTransform, Passthrough};
