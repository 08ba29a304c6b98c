//! # upscale
//!
//! Streaming video super-resolution transcoding: demux an input
//! container, route every decoded video frame through a learned
//! upscaling transform, re-encode and mux into a new container at
//! larger dimensions, preserving audio and presentation timing.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use upscale::{SessionConfig, TranscodeSession, UpscalerFactory};
//!
//! fn main() -> upscale::Result<()> {
//!     let config = SessionConfig::new().with_upscale_factor(2.0);
//!     let opener = my_media::opener(); // your MediaOpener implementation
//!     let factory = UpscalerFactory::for_factor(2.0);
//!
//!     let session = TranscodeSession::new(config, opener, Box::new(factory))?
//!         .on_progress(|fraction| println!("{:.0}%", fraction * 100.0));
//!     let report = session.run(Path::new("in.mov"), Path::new("out.mov"))?;
//!     println!("wrote {} frames at {:?}", report.frames_written, report.video_dimensions);
//!     Ok(())
//! }
//! # mod my_media { pub fn opener() -> Box<dyn upscale::MediaOpener> { unimplemented!() } }
//! ```
//!
//! ## Architecture
//!
//! The workspace is split by concern:
//! - `upscale-core`: timing, frames, samples, format tags, the
//!   `FrameTransform` seam
//! - `upscale-ai`: the learned upscaler behind that seam
//! - `upscale-pipeline`: media I/O traits, backpressure, progress,
//!   and the per-track pipeline
//!
//! This crate ties them together into [`TranscodeSession`] and
//! re-exports the commonly used types.

mod config;
mod error;
mod session;

pub use upscale_core::{
    AudioBuffer, AudioCodec, ContainerFormat, Duration, FrameTransform, Passthrough, PixelFormat,
    Rational, Sample, SampleFormat, SamplePayload, TimeBase, Timestamp, TrackKind, TransformError,
    VideoCodec, VideoFrame,
};

pub use upscale_ai::{ModelBackend, ModelLoader, ScaleFactor, UpscaleModel, Upscaler, UpscalerConfig};

pub use upscale_pipeline::{
    CancelToken, FinalizeError, MediaOpener, MediaSink, MediaSource, OpenError, PipelineError,
    PipelineReport, PipelineState, ProgressCallback, ReadError, ReadyGate, SinkTrack, SourceTrack,
    TrackId, TrackInfo, TrackSpec, TransformPolicy, WriteError,
};

pub use config::{output_dimensions, SessionConfig};
pub use error::{Result, SessionError};
pub use session::{SessionReport, TranscodeSession, TransformFactory, UpscalerFactory};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get library version string.
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
