//! Media samples flowing through a track pipeline.

use std::fmt;

use crate::frame::VideoFrame;
use crate::timing::{Duration, Timestamp};

/// Kind of an elementary media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    /// Video track.
    Video,
    /// Audio track.
    Audio,
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Video => write!(f, "video"),
            TrackKind::Audio => write!(f, "audio"),
        }
    }
}

/// Layout of decoded audio samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// Signed 16-bit interleaved.
    S16,
    /// 32-bit float interleaved.
    F32,
}

impl SampleFormat {
    /// Bytes per sample per channel.
    #[must_use]
    pub const fn bytes_per_sample(&self) -> usize {
        match self {
            SampleFormat::S16 => 2,
            SampleFormat::F32 => 4,
        }
    }
}

/// A run of decoded, interleaved audio.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    /// Sample layout of `data`.
    pub format: SampleFormat,
    /// Samples per second.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u8,
    /// Interleaved sample data.
    pub data: Vec<u8>,
}

impl AudioBuffer {
    /// Number of sample frames in the buffer (one frame spans all channels).
    #[must_use]
    pub fn frame_count(&self) -> usize {
        let stride = self.format.bytes_per_sample() * self.channels as usize;
        if stride == 0 {
            0
        } else {
            self.data.len() / stride
        }
    }
}

/// Track-specific payload of a sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SamplePayload {
    /// A decoded video frame.
    Video(VideoFrame),
    /// A run of decoded audio.
    Audio(AudioBuffer),
}

impl SamplePayload {
    /// Which track kind this payload belongs to.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        match self {
            SamplePayload::Video(_) => TrackKind::Video,
            SamplePayload::Audio(_) => TrackKind::Audio,
        }
    }
}

/// A timed unit of decoded media.
#[derive(Debug, Clone)]
pub struct Sample {
    /// Presentation time.
    pub pts: Timestamp,
    /// Display or playback span of this sample.
    pub duration: Duration,
    /// Decoded content.
    pub payload: SamplePayload,
}

impl Sample {
    /// Create a video sample.
    #[must_use]
    pub fn video(pts: Timestamp, duration: Duration, frame: VideoFrame) -> Self {
        Self {
            pts,
            duration,
            payload: SamplePayload::Video(frame),
        }
    }

    /// Create an audio sample.
    #[must_use]
    pub fn audio(pts: Timestamp, duration: Duration, buffer: AudioBuffer) -> Self {
        Self {
            pts,
            duration,
            payload: SamplePayload::Audio(buffer),
        }
    }

    /// Which track kind this sample belongs to.
    #[must_use]
    pub fn kind(&self) -> TrackKind {
        self.payload.kind()
    }
}
