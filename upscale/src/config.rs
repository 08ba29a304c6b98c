//! Session configuration and the output dimension law.

use upscale_core::{AudioCodec, ContainerFormat, VideoCodec};
use upscale_pipeline::TransformPolicy;

/// Configuration for a transcode session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Linear upscale factor applied to the video's natural size.
    pub upscale_factor: f64,
    /// Largest allowed output dimension. When the scaled size exceeds
    /// it, the output is fit to this bound preserving aspect ratio.
    pub max_dimension: Option<u32>,
    /// Carry the first audio track into the output.
    pub preserve_audio: bool,
    /// Output container.
    pub container: ContainerFormat,
    /// Output video codec.
    pub video_codec: VideoCodec,
    /// Output audio codec.
    pub audio_codec: AudioCodec,
    /// Audio bitrate in bits per second.
    pub audio_bitrate: u32,
    /// Audio sample rate in Hz.
    pub audio_sample_rate: u32,
    /// Audio channel count.
    pub audio_channels: u8,
    /// What to do when the transform rejects a single frame.
    pub transform_policy: TransformPolicy,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            upscale_factor: 2.0,
            max_dimension: Some(2_048),
            preserve_audio: true,
            container: ContainerFormat::Mov,
            video_codec: VideoCodec::H264,
            audio_codec: AudioCodec::Aac,
            audio_bitrate: 128_000,
            audio_sample_rate: 44_100,
            audio_channels: 2,
            transform_policy: TransformPolicy::Abort,
        }
    }
}

impl SessionConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the upscale factor.
    #[must_use]
    pub fn with_upscale_factor(mut self, factor: f64) -> Self {
        self.upscale_factor = factor;
        self
    }

    /// Bound the largest output dimension, or lift the bound with `None`.
    #[must_use]
    pub fn with_max_dimension(mut self, bound: Option<u32>) -> Self {
        self.max_dimension = bound;
        self
    }

    /// Keep or drop the audio track.
    #[must_use]
    pub fn with_preserve_audio(mut self, preserve: bool) -> Self {
        self.preserve_audio = preserve;
        self
    }

    /// Set the output container.
    #[must_use]
    pub fn with_container(mut self, container: ContainerFormat) -> Self {
        self.container = container;
        self
    }

    /// Set the transform failure policy.
    #[must_use]
    pub fn with_transform_policy(mut self, policy: TransformPolicy) -> Self {
        self.transform_policy = policy;
        self
    }

    /// Check the configuration for out-of-range values.
    pub fn validate(&self) -> Result<(), String> {
        if !self.upscale_factor.is_finite() || self.upscale_factor <= 0.0 {
            return Err(format!(
                "upscale factor must be positive, got {}",
                self.upscale_factor
            ));
        }
        if self.max_dimension == Some(0) {
            return Err("max dimension must be nonzero".into());
        }
        if self.audio_channels == 0 || self.audio_sample_rate == 0 {
            return Err("audio layout must be nonzero".into());
        }
        Ok(())
    }
}

/// Output dimensions for a native size under a factor and optional bound.
///
/// The scaled size is rounded per axis; when its larger dimension
/// exceeds the bound, the output is refit to the bound along that axis
/// with the other axis following the scaled aspect ratio. Dimensions
/// never come out zero.
#[must_use]
pub fn output_dimensions(native: (u32, u32), factor: f64, bound: Option<u32>) -> (u32, u32) {
    let scaled_w = f64::from(native.0) * factor;
    let scaled_h = f64::from(native.1) * factor;

    let (w, h) = match bound {
        Some(b) if scaled_w.max(scaled_h) > f64::from(b) => {
            let b = f64::from(b);
            if scaled_w >= scaled_h {
                (b, b * scaled_h / scaled_w)
            } else {
                (b * scaled_w / scaled_h, b)
            }
        }
        _ => (scaled_w, scaled_h),
    };

    let w = (w.round() as u32).max(1);
    let h = (h.round() as u32).max(1);
    match bound {
        Some(b) => (w.min(b), h.min(b)),
        None => (w, h),
    }
}
