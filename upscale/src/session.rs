//! The transcode session orchestrating one upscale run.

use std::path::Path;
use std::sync::Arc;
use std::thread;

use tracing::{debug, info};
use upscale_ai::{ScaleFactor, Upscaler, UpscalerConfig};
use upscale_core::{FrameTransform, TrackKind, TransformError};
use upscale_pipeline::{
    CancelToken, MediaOpener, PipelineError, PipelineReport, ProgressCallback, ProgressTracker,
    TrackId, TrackInfo, TrackPipeline, TrackSpec,
};

use crate::config::{output_dimensions, SessionConfig};
use crate::error::{Result, SessionError};

/// Builds the frame transform once the session knows the exact output
/// dimensions.
pub trait TransformFactory: Send + Sync {
    /// Create a transform producing frames of exactly `target`.
    fn create(
        &self,
        target: (u32, u32),
    ) -> std::result::Result<Arc<dyn FrameTransform>, TransformError>;
}

impl<F> TransformFactory for F
where
    F: Fn((u32, u32)) -> std::result::Result<Arc<dyn FrameTransform>, TransformError>
        + Send
        + Sync,
{
    fn create(
        &self,
        target: (u32, u32),
    ) -> std::result::Result<Arc<dyn FrameTransform>, TransformError> {
        self(target)
    }
}

/// [`TransformFactory`] backed by the learned [`Upscaler`].
pub struct UpscalerFactory {
    base: UpscalerConfig,
}

impl UpscalerFactory {
    /// Create a factory from an upscaler configuration template. The
    /// target size is filled in per session.
    #[must_use]
    pub fn new(base: UpscalerConfig) -> Self {
        Self { base }
    }

    /// Factory whose model scale covers a real-valued session factor.
    #[must_use]
    pub fn for_factor(factor: f64) -> Self {
        Self {
            base: UpscalerConfig::default().with_scale_factor(ScaleFactor::covering(factor)),
        }
    }
}

impl TransformFactory for UpscalerFactory {
    fn create(
        &self,
        target: (u32, u32),
    ) -> std::result::Result<Arc<dyn FrameTransform>, TransformError> {
        let config = self.base.clone().with_target_size(target.0, target.1);
        let upscaler = Upscaler::new(config).map_err(TransformError::from)?;
        Ok(Arc::new(upscaler))
    }
}

/// Summary of a successful session run.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// Output video dimensions.
    pub video_dimensions: (u32, u32),
    /// Video frames written.
    pub frames_written: u64,
    /// Frames passed through untransformed under the substitute policy.
    pub frames_substituted: u64,
    /// Audio samples written.
    pub audio_samples_written: u64,
    /// Whether an audio track was carried into the output.
    pub audio_track: bool,
}

/// A configured upscale transcode, run once with [`TranscodeSession::run`].
pub struct TranscodeSession {
    config: SessionConfig,
    opener: Box<dyn MediaOpener>,
    transforms: Box<dyn TransformFactory>,
    progress: Option<ProgressCallback>,
    cancel: CancelToken,
}

impl TranscodeSession {
    /// Create a session.
    pub fn new(
        config: SessionConfig,
        opener: Box<dyn MediaOpener>,
        transforms: Box<dyn TransformFactory>,
    ) -> Result<Self> {
        config.validate().map_err(SessionError::Config)?;
        Ok(Self {
            config,
            opener,
            transforms,
            progress: None,
            cancel: CancelToken::new(),
        })
    }

    /// Install a progress callback, invoked with a monotone fraction
    /// ending at exactly 1.0 on success.
    #[must_use]
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Handle for caller-initiated cancellation.
    #[must_use]
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Run the transcode to completion.
    pub fn run(self, input: &Path, output: &Path) -> Result<SessionReport> {
        info!(input = %input.display(), output = %output.display(), "session start");

        // A stale destination must never leak into the result.
        if output.exists() {
            std::fs::remove_file(output).map_err(|source| SessionError::Preflight {
                path: output.to_path_buf(),
                source,
            })?;
        }

        let mut source = self.opener.open_source(input)?;
        let tracks = source.tracks();
        let video = tracks
            .iter()
            .find(|t| t.kind == TrackKind::Video)
            .ok_or(SessionError::NoVideoTrack)?
            .clone();
        let native = video.natural_size().ok_or_else(|| {
            SessionError::Open(upscale_pipeline::OpenError::TrackConfig(
                "video track declares no dimensions".into(),
            ))
        })?;

        let dims = output_dimensions(native, self.config.upscale_factor, self.config.max_dimension);
        debug!(
            native_w = native.0,
            native_h = native.1,
            out_w = dims.0,
            out_h = dims.1,
            "output geometry"
        );

        let audio: Option<TrackInfo> = if self.config.preserve_audio {
            tracks.iter().find(|t| t.kind == TrackKind::Audio).cloned()
        } else {
            None
        };

        let mut specs = vec![TrackSpec::Video {
            codec: self.config.video_codec,
            width: dims.0,
            height: dims.1,
            frame_rate: video.frame_rate,
        }];
        if audio.is_some() {
            specs.push(TrackSpec::Audio {
                codec: self.config.audio_codec,
                bitrate: self.config.audio_bitrate,
                sample_rate: self.config.audio_sample_rate,
                channels: self.config.audio_channels,
            });
        }

        let mut sink = self.opener.open_sink(output, self.config.container, &specs)?;

        let transform = self
            .transforms
            .create(dims)
            .map_err(SessionError::TransformSetup)?;

        let tracker = ProgressTracker::new(source.duration(), self.progress);

        let video_pipeline = TrackPipeline::new(
            TrackKind::Video,
            source.take_reader(video.id)?,
            sink.track_writer(TrackId(0))?,
            tracker.register(TrackKind::Video),
            self.cancel.clone(),
        )
        .with_transform(transform, self.config.transform_policy);

        let audio_pipeline = match &audio {
            Some(track) => Some(TrackPipeline::new(
                TrackKind::Audio,
                source.take_reader(track.id)?,
                sink.track_writer(TrackId(1))?,
                tracker.register(TrackKind::Audio),
                self.cancel.clone(),
            )),
            None => None,
        };

        let mut reports: Vec<PipelineReport> = Vec::with_capacity(2);
        thread::scope(|scope| {
            let video_handle = scope.spawn(move || video_pipeline.run());
            let audio_handle = audio_pipeline.map(|p| scope.spawn(move || p.run()));
            reports.push(join_report(video_handle));
            if let Some(handle) = audio_handle {
                reports.push(join_report(handle));
            }
        });

        if let Some((kind, error)) = first_failure(&mut reports) {
            if error.is_cancelled() {
                return Err(SessionError::Cancelled);
            }
            return Err(SessionError::Pipeline {
                kind,
                source: error,
            });
        }

        sink.finalize()?;
        tracker.complete();

        let frames_written = reports[0].samples_written;
        let frames_substituted = reports[0].frames_substituted;
        let audio_samples_written = reports.get(1).map_or(0, |r| r.samples_written);
        info!(frames_written, audio_samples_written, "session finished");

        Ok(SessionReport {
            video_dimensions: dims,
            frames_written,
            frames_substituted,
            audio_samples_written,
            audio_track: audio.is_some(),
        })
    }
}

fn join_report(handle: thread::ScopedJoinHandle<'_, PipelineReport>) -> PipelineReport {
    match handle.join() {
        Ok(report) => report,
        Err(payload) => std::panic::resume_unwind(payload),
    }
}

/// Pick the error a failed run resolves to. A real root cause beats
/// the cooperative `Cancelled` reason a sibling stopped with.
fn first_failure(reports: &mut [PipelineReport]) -> Option<(TrackKind, PipelineError)> {
    let failed: Vec<usize> = reports
        .iter()
        .enumerate()
        .filter(|(_, r)| r.error.is_some())
        .map(|(i, _)| i)
        .collect();
    if failed.is_empty() {
        return None;
    }
    let root = failed
        .iter()
        .copied()
        .find(|&i| {
            reports[i]
                .error
                .as_ref()
                .is_some_and(|e| !e.is_cancelled())
        })
        .unwrap_or(failed[0]);
    let report = &mut reports[root];
    report.error.take().map(|e| (report.kind, e))
}
