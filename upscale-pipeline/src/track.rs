//! Per-track pipeline state machine.
//!
//! One pipeline owns one source reader and one sink writer and drives
//! samples between them: wait for sink readiness, pull, transform
//! (video), write, advance the watermark. Each pipeline runs on its
//! own thread; the only cross-track coupling is the shared
//! [`CancelToken`].

use std::sync::Arc;

use tracing::{debug, warn};
use upscale_core::{FrameTransform, Sample, SamplePayload, TrackKind};

use crate::error::PipelineError;
use crate::flow::CancelToken;
use crate::media::{SinkTrack, SourceTrack};
use crate::progress::TrackWatermark;

/// Lifecycle state of a track pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Created, not yet run.
    Idle,
    /// Moving samples.
    Running,
    /// Source exhausted, waiting for the sink to confirm the track.
    Draining,
    /// Completed successfully.
    Finished,
    /// Stopped on an error.
    Failed,
}

/// What to do when the transform rejects a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransformPolicy {
    /// Fail the pipeline. A bad frame must not silently degrade output.
    #[default]
    Abort,
    /// Write the untransformed frame and tally it in the report.
    Substitute,
}

/// Terminal report of one pipeline run.
#[derive(Debug)]
pub struct PipelineReport {
    /// Track kind this pipeline carried.
    pub kind: TrackKind,
    /// Terminal state, `Finished` or `Failed`.
    pub state: PipelineState,
    /// The first error, when `Failed`.
    pub error: Option<PipelineError>,
    /// Samples written to the sink.
    pub samples_written: u64,
    /// Frames passed through untransformed under
    /// [`TransformPolicy::Substitute`].
    pub frames_substituted: u64,
}

/// A single-track worker moving samples from a reader to a writer.
pub struct TrackPipeline {
    kind: TrackKind,
    reader: Box<dyn SourceTrack>,
    writer: Box<dyn SinkTrack>,
    transform: Option<Arc<dyn FrameTransform>>,
    policy: TransformPolicy,
    watermark: TrackWatermark,
    cancel: CancelToken,
    state: PipelineState,
    samples_written: u64,
    frames_substituted: u64,
}

impl TrackPipeline {
    /// Create an idle pipeline.
    #[must_use]
    pub fn new(
        kind: TrackKind,
        reader: Box<dyn SourceTrack>,
        writer: Box<dyn SinkTrack>,
        watermark: TrackWatermark,
        cancel: CancelToken,
    ) -> Self {
        Self {
            kind,
            reader,
            writer,
            transform: None,
            policy: TransformPolicy::default(),
            watermark,
            cancel,
            state: PipelineState::Idle,
            samples_written: 0,
            frames_substituted: 0,
        }
    }

    /// Attach a frame transform for video payloads.
    #[must_use]
    pub fn with_transform(
        mut self,
        transform: Arc<dyn FrameTransform>,
        policy: TransformPolicy,
    ) -> Self {
        self.transform = Some(transform);
        self.policy = policy;
        self
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Drive the track to completion. Consumes the pipeline and
    /// returns its terminal report.
    pub fn run(mut self) -> PipelineReport {
        debug!(kind = %self.kind, "pipeline start");
        self.state = PipelineState::Running;
        let gate = self.writer.ready();

        loop {
            if self.cancel.is_cancelled() {
                return self.fail(PipelineError::Cancelled);
            }
            if !gate.wait(&self.cancel) {
                return self.fail(PipelineError::Cancelled);
            }

            match self.reader.next_sample() {
                Ok(Some(sample)) => {
                    let pts = sample.pts;
                    let sample = match self.apply_transform(sample) {
                        Ok(sample) => sample,
                        Err(err) => return self.fail(err),
                    };
                    if let Err(err) = self.writer.write(sample) {
                        return self.fail(err.into());
                    }
                    self.samples_written += 1;
                    self.watermark.advance(pts);
                }
                Ok(None) => break,
                Err(err) => return self.fail(err.into()),
            }
        }

        self.state = PipelineState::Draining;
        if let Err(err) = self.writer.mark_finished() {
            return self.fail(err.into());
        }
        if !self.writer.finished().wait(&self.cancel) {
            return self.fail(PipelineError::Cancelled);
        }

        self.state = PipelineState::Finished;
        self.watermark.finish();
        debug!(kind = %self.kind, samples = self.samples_written, "pipeline finished");
        PipelineReport {
            kind: self.kind,
            state: PipelineState::Finished,
            error: None,
            samples_written: self.samples_written,
            frames_substituted: self.frames_substituted,
        }
    }

    fn apply_transform(&mut self, sample: Sample) -> Result<Sample, PipelineError> {
        let Some(transform) = &self.transform else {
            return Ok(sample);
        };
        let Sample {
            pts,
            duration,
            payload,
        } = sample;
        match payload {
            SamplePayload::Video(frame) => match transform.transform(&frame) {
                Ok(out) => Ok(Sample {
                    pts,
                    duration,
                    payload: SamplePayload::Video(out),
                }),
                Err(source) => match self.policy {
                    TransformPolicy::Abort => Err(PipelineError::Transform { pts, source }),
                    TransformPolicy::Substitute => {
                        warn!(%pts, reason = %source, "substituting untransformed frame");
                        self.frames_substituted += 1;
                        Ok(Sample {
                            pts,
                            duration,
                            payload: SamplePayload::Video(frame),
                        })
                    }
                },
            },
            other => Ok(Sample {
                pts,
                duration,
                payload: other,
            }),
        }
    }

    fn fail(self, error: PipelineError) -> PipelineReport {
        warn!(kind = %self.kind, %error, "pipeline failed");
        // Stop the siblings between samples.
        self.cancel.cancel();
        PipelineReport {
            kind: self.kind,
            state: PipelineState::Failed,
            error: Some(error),
            samples_written: self.samples_written,
            frames_substituted: self.frames_substituted,
        }
    }
}
