//! Trait boundary to container demuxing/decoding and encoding/muxing.
//!
//! Codec and container internals live behind these traits. A source
//! hands out one detached reader per track and a sink one detached
//! writer per track, so distinct tracks can be driven from distinct
//! threads while each track stays single-owner.

use std::path::Path;

use upscale_core::{
    AudioCodec, ContainerFormat, Duration, Rational, Sample, SampleFormat, TrackKind, VideoCodec,
};

use crate::error::{FinalizeError, OpenError, ReadError, WriteError};
use crate::flow::ReadyGate;

/// Identifier of a track within a source or sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TrackId(pub usize);

/// Immutable description of a source track.
#[derive(Debug, Clone)]
pub struct TrackInfo {
    /// Track identifier within its source.
    pub id: TrackId,
    /// Track kind.
    pub kind: TrackKind,
    /// Frame width (video).
    pub width: Option<u32>,
    /// Frame height (video).
    pub height: Option<u32>,
    /// Frame rate (video).
    pub frame_rate: Option<Rational>,
    /// Sample rate in Hz (audio).
    pub sample_rate: Option<u32>,
    /// Channel count (audio).
    pub channels: Option<u8>,
    /// Decoded sample layout (audio).
    pub sample_format: Option<SampleFormat>,
    /// Track duration.
    pub duration: Duration,
}

impl TrackInfo {
    /// Natural display size, when the track declares one.
    #[must_use]
    pub fn natural_size(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) if w > 0 && h > 0 => Some((w, h)),
            _ => None,
        }
    }
}

/// Encoding parameters for one output track.
#[derive(Debug, Clone)]
pub enum TrackSpec {
    /// A video track.
    Video {
        /// Video codec.
        codec: VideoCodec,
        /// Output width in pixels.
        width: u32,
        /// Output height in pixels.
        height: u32,
        /// Frame rate hint for the encoder.
        frame_rate: Option<Rational>,
    },
    /// An audio track.
    Audio {
        /// Audio codec.
        codec: AudioCodec,
        /// Target bitrate in bits per second.
        bitrate: u32,
        /// Sample rate in Hz.
        sample_rate: u32,
        /// Channel count.
        channels: u8,
    },
}

impl TrackSpec {
    /// Which track kind this spec describes.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            TrackSpec::Video { .. } => TrackKind::Video,
            TrackSpec::Audio { .. } => TrackKind::Audio,
        }
    }
}

/// Factory for sources and sinks.
///
/// Opening is separated from running so the session can surface an
/// [`OpenError`] before any pipeline thread exists.
pub trait MediaOpener: Send + Sync {
    /// Open an input container for reading.
    fn open_source(&self, path: &Path) -> std::result::Result<Box<dyn MediaSource>, OpenError>;

    /// Create an output container with the given track layout. Sink
    /// track ids are the indices into `specs`.
    fn open_sink(
        &self,
        path: &Path,
        container: ContainerFormat,
        specs: &[TrackSpec],
    ) -> std::result::Result<Box<dyn MediaSink>, OpenError>;
}

/// An opened input container.
pub trait MediaSource: Send {
    /// Describe all tracks.
    fn tracks(&self) -> Vec<TrackInfo>;

    /// Overall duration of the presentation.
    fn duration(&self) -> Duration;

    /// Detach the reader for one track. Each track's reader can be
    /// taken once; the returned reader is the track's single owner.
    fn take_reader(
        &mut self,
        track: TrackId,
    ) -> std::result::Result<Box<dyn SourceTrack>, OpenError>;
}

/// A detached, single-owner reader over one track's decoded samples.
pub trait SourceTrack: Send {
    /// Pull the next sample in presentation order. `Ok(None)` marks
    /// end of track and is sticky. An error is fatal to this track.
    fn next_sample(&mut self) -> std::result::Result<Option<Sample>, ReadError>;
}

/// An opened output container.
pub trait MediaSink: Send {
    /// Detach the writer for one output track (by spec index). Each
    /// track's writer can be taken once.
    fn track_writer(
        &mut self,
        track: TrackId,
    ) -> std::result::Result<Box<dyn SinkTrack>, OpenError>;

    /// Write the container trailer. Valid only once every track writer
    /// has been marked finished; otherwise
    /// [`FinalizeError::TracksPending`].
    fn finalize(&mut self) -> std::result::Result<(), FinalizeError>;
}

/// A detached, single-owner writer over one output track.
pub trait SinkTrack: Send {
    /// Readiness gate for backpressure. `write` must only be called
    /// while the gate is ready.
    fn ready(&self) -> ReadyGate;

    /// Encode and enqueue one sample. Samples must arrive in
    /// presentation order.
    fn write(&mut self, sample: Sample) -> std::result::Result<(), WriteError>;

    /// Declare end of track. Further writes are
    /// [`WriteError::TrackFinished`].
    fn mark_finished(&mut self) -> std::result::Result<(), WriteError>;

    /// Gate that becomes ready once the sink has confirmed this track
    /// as finished. Sinks that confirm synchronously open it inside
    /// `mark_finished`; asynchronous sinks open it from their own
    /// thread.
    fn finished(&self) -> ReadyGate;
}
