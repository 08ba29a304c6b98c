//! Track pipelines, backpressure, and the media I/O trait boundary.
//!
//! The pieces here are assembled by the session facade: a
//! [`MediaOpener`] yields a source and a sink, one [`TrackPipeline`]
//! per track moves samples between them under [`ReadyGate`]
//! backpressure, and a shared [`ProgressTracker`] turns per-track
//! watermarks into a single monotone fraction.

pub mod error;
pub mod flow;
pub mod media;
pub mod progress;
pub mod track;

pub use error::{FinalizeError, OpenError, PipelineError, ReadError, Result, WriteError};
pub use flow::{CancelToken, ReadyGate};
pub use media::{
    MediaOpener, MediaSink, MediaSource, SinkTrack, SourceTrack, TrackId, TrackInfo, TrackSpec,
};
pub use progress::{ProgressCallback, ProgressTracker, TrackWatermark};
pub use track::{PipelineReport, PipelineState, TrackPipeline, TransformPolicy};
