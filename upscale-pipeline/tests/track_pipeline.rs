//! Track pipeline behavior against in-memory sources and sinks.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration as StdDuration;

use parking_lot::Mutex;
use upscale_core::{
    AudioBuffer, Duration, FrameTransform, PixelFormat, Sample, SampleFormat, SamplePayload,
    TimeBase, Timestamp, TrackKind, TransformError, VideoFrame,
};
use upscale_pipeline::{
    CancelToken, PipelineError, PipelineState, ProgressTracker, ReadError, ReadyGate, SinkTrack,
    SourceTrack, TrackPipeline, TransformPolicy, WriteError,
};

fn ms(value: i64) -> Timestamp {
    Timestamp::new(value, TimeBase::MILLISECONDS)
}

fn video_sample(pts_ms: i64) -> Sample {
    Sample::video(
        ms(pts_ms),
        Duration::new(100, TimeBase::MILLISECONDS),
        VideoFrame::black(8, 8, PixelFormat::Rgb24),
    )
}

fn audio_sample(pts_ms: i64) -> Sample {
    Sample::audio(
        ms(pts_ms),
        Duration::new(100, TimeBase::MILLISECONDS),
        AudioBuffer {
            format: SampleFormat::S16,
            sample_rate: 44_100,
            channels: 2,
            data: vec![0; 1_024],
        },
    )
}

/// Source yielding a fixed queue, optionally failing after N pulls.
struct VecSource {
    samples: VecDeque<Sample>,
    fail_after: Option<usize>,
    pulled: usize,
}

impl VecSource {
    fn new(samples: Vec<Sample>) -> Self {
        Self {
            samples: samples.into(),
            fail_after: None,
            pulled: 0,
        }
    }

    fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }
}

impl SourceTrack for VecSource {
    fn next_sample(&mut self) -> Result<Option<Sample>, ReadError> {
        if self.fail_after == Some(self.pulled) {
            return Err(ReadError::Corrupt("synthetic damage".into()));
        }
        self.pulled += 1;
        Ok(self.samples.pop_front())
    }
}

#[derive(Default)]
struct Recording {
    samples: Vec<Sample>,
    finished: bool,
}

/// Sink recording every write into shared state. Confirms the track
/// inside `mark_finished` unless built for asynchronous confirmation.
struct RecordingSink {
    gate: ReadyGate,
    confirm: ReadyGate,
    confirm_on_finish: bool,
    recording: Arc<Mutex<Recording>>,
}

impl RecordingSink {
    fn new(gate: ReadyGate) -> (Self, Arc<Mutex<Recording>>) {
        let recording = Arc::new(Mutex::new(Recording::default()));
        (
            Self {
                gate,
                confirm: ReadyGate::new(false),
                confirm_on_finish: true,
                recording: Arc::clone(&recording),
            },
            recording,
        )
    }

    /// Leave confirmation to the test; `mark_finished` records the
    /// finish but the finished gate stays closed.
    fn confirming_later(gate: ReadyGate) -> (Self, Arc<Mutex<Recording>>, ReadyGate) {
        let (mut sink, recording) = Self::new(gate);
        sink.confirm_on_finish = false;
        let confirm = sink.confirm.clone();
        (sink, recording, confirm)
    }
}

impl SinkTrack for RecordingSink {
    fn ready(&self) -> ReadyGate {
        self.gate.clone()
    }

    fn write(&mut self, sample: Sample) -> Result<(), WriteError> {
        let mut rec = self.recording.lock();
        if rec.finished {
            return Err(WriteError::TrackFinished);
        }
        rec.samples.push(sample);
        Ok(())
    }

    fn mark_finished(&mut self) -> Result<(), WriteError> {
        let mut rec = self.recording.lock();
        if rec.finished {
            return Err(WriteError::TrackFinished);
        }
        rec.finished = true;
        drop(rec);
        if self.confirm_on_finish {
            self.confirm.set_ready(true);
        }
        Ok(())
    }

    fn finished(&self) -> ReadyGate {
        self.confirm.clone()
    }
}

/// Doubles frame dimensions, counting calls.
struct Doubler {
    calls: Arc<AtomicUsize>,
}

impl Doubler {
    fn new() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl FrameTransform for Doubler {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width * 2, height * 2)
    }

    fn transform(&self, frame: &VideoFrame) -> Result<VideoFrame, TransformError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(VideoFrame::black(
            frame.width * 2,
            frame.height * 2,
            frame.format,
        ))
    }
}

/// Doubler that fails on one call index. Timing is owned by the
/// pipeline, so the offending frame is identified by position.
struct FailingDoubler {
    fail_on_call: usize,
    calls: Arc<AtomicUsize>,
}

impl FrameTransform for FailingDoubler {
    fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        (width * 2, height * 2)
    }

    fn transform(&self, frame: &VideoFrame) -> Result<VideoFrame, TransformError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == self.fail_on_call {
            return Err(TransformError::new("synthetic inference failure"));
        }
        Ok(VideoFrame::black(
            frame.width * 2,
            frame.height * 2,
            frame.format,
        ))
    }
}

fn tracker_for_secs(secs: f64) -> ProgressTracker {
    ProgressTracker::new(Duration::from_secs_f64(secs), None)
}

#[test]
fn video_pipeline_runs_to_finished() {
    let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);
    let watermark = tracker.register(TrackKind::Video);

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        watermark,
        CancelToken::new(),
    )
    .with_transform(Arc::new(Doubler::new()), TransformPolicy::Abort)
    .run();

    assert_eq!(report.state, PipelineState::Finished);
    assert!(report.error.is_none());
    assert_eq!(report.samples_written, 10);

    let rec = recording.lock();
    assert!(rec.finished);
    assert_eq!(rec.samples.len(), 10);
    for sample in &rec.samples {
        match &sample.payload {
            SamplePayload::Video(frame) => assert_eq!(frame.dimensions(), (16, 16)),
            SamplePayload::Audio(_) => panic!("unexpected audio"),
        }
    }
    // Track done, so the session fraction no longer waits on it.
    assert_eq!(tracker.fraction(), 1.0);
}

#[test]
fn pts_is_preserved_through_transform() {
    let samples = vec![video_sample(0), video_sample(100), video_sample(200)];
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        CancelToken::new(),
    )
    .with_transform(Arc::new(Doubler::new()), TransformPolicy::Abort)
    .run();

    assert_eq!(report.state, PipelineState::Finished);
    let rec = recording.lock();
    let pts: Vec<i64> = rec.samples.iter().map(|s| s.pts.value).collect();
    assert_eq!(pts, vec![0, 100, 200]);
}

#[test]
fn read_error_fails_pipeline_and_trips_cancel() {
    let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);
    let cancel = CancelToken::new();

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples).failing_after(3)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        cancel.clone(),
    )
    .run();

    assert_eq!(report.state, PipelineState::Failed);
    assert!(matches!(report.error, Some(PipelineError::Read(_))));
    assert_eq!(report.samples_written, 3);
    assert!(cancel.is_cancelled());
    assert!(!recording.lock().finished);
}

#[test]
fn transform_abort_stops_at_offending_frame() {
    let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);
    let cancel = CancelToken::new();

    let transform = FailingDoubler {
        fail_on_call: 5,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        cancel.clone(),
    )
    .with_transform(Arc::new(transform), TransformPolicy::Abort)
    .run();

    assert_eq!(report.state, PipelineState::Failed);
    match report.error {
        Some(PipelineError::Transform { pts, .. }) => assert_eq!(pts.value, 500),
        other => panic!("expected transform error, got {other:?}"),
    }
    assert!(cancel.is_cancelled());

    // Nothing at or after the offending frame reached the sink.
    let rec = recording.lock();
    assert_eq!(rec.samples.len(), 5);
    assert!(rec.samples.iter().all(|s| s.pts.value < 500));
}

#[test]
fn substitute_policy_passes_original_frame() {
    let samples: Vec<Sample> = (0..10).map(|i| video_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);

    let transform = FailingDoubler {
        fail_on_call: 5,
        calls: Arc::new(AtomicUsize::new(0)),
    };
    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        CancelToken::new(),
    )
    .with_transform(Arc::new(transform), TransformPolicy::Substitute)
    .run();

    assert_eq!(report.state, PipelineState::Finished);
    assert_eq!(report.samples_written, 10);
    assert_eq!(report.frames_substituted, 1);

    let rec = recording.lock();
    for (i, sample) in rec.samples.iter().enumerate() {
        let SamplePayload::Video(frame) = &sample.payload else {
            panic!("unexpected audio");
        };
        let expected = if i == 5 { (8, 8) } else { (16, 16) };
        assert_eq!(frame.dimensions(), expected, "frame {i}");
    }
}

#[test]
fn audio_payloads_bypass_the_transform() {
    let samples: Vec<Sample> = (0..4).map(|i| audio_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);

    let doubler = Doubler::new();
    let calls = Arc::clone(&doubler.calls);
    let report = TrackPipeline::new(
        TrackKind::Audio,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Audio),
        CancelToken::new(),
    )
    .with_transform(Arc::new(doubler), TransformPolicy::Abort)
    .run();

    assert_eq!(report.state, PipelineState::Finished);
    assert_eq!(report.samples_written, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(recording.lock().samples.len(), 4);
}

#[test]
fn pipeline_waits_for_sink_readiness() {
    let samples: Vec<Sample> = (0..3).map(|i| video_sample(i * 100)).collect();
    let gate = ReadyGate::new(false);
    let (sink, recording) = RecordingSink::new(gate.clone());
    let tracker = tracker_for_secs(1.0);

    let opener = thread::spawn(move || {
        thread::sleep(StdDuration::from_millis(30));
        gate.set_ready(true);
    });

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        CancelToken::new(),
    )
    .run();

    opener.join().unwrap();
    assert_eq!(report.state, PipelineState::Finished);
    assert_eq!(recording.lock().samples.len(), 3);
}

#[test]
fn cancellation_wins_over_a_closed_gate() {
    let samples: Vec<Sample> = (0..3).map(|i| video_sample(i * 100)).collect();
    let (sink, recording) = RecordingSink::new(ReadyGate::new(false));
    let tracker = tracker_for_secs(1.0);
    let cancel = CancelToken::new();

    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(StdDuration::from_millis(20));
            cancel.cancel();
        })
    };

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        cancel,
    )
    .run();

    canceller.join().unwrap();
    assert_eq!(report.state, PipelineState::Failed);
    assert!(matches!(report.error, Some(PipelineError::Cancelled)));
    assert!(recording.lock().samples.is_empty());
}

#[test]
fn drain_blocks_until_the_sink_confirms() {
    let samples: Vec<Sample> = (0..3).map(|i| video_sample(i * 100)).collect();
    let (sink, recording, confirm) = RecordingSink::confirming_later(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);

    let confirmer = thread::spawn(move || {
        thread::sleep(StdDuration::from_millis(30));
        confirm.set_ready(true);
    });

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        CancelToken::new(),
    )
    .run();

    confirmer.join().unwrap();
    assert_eq!(report.state, PipelineState::Finished);
    assert!(recording.lock().finished);
}

#[test]
fn cancellation_during_drain_fails_the_pipeline() {
    let samples: Vec<Sample> = (0..3).map(|i| video_sample(i * 100)).collect();
    let (sink, _recording, _confirm) = RecordingSink::confirming_later(ReadyGate::new(true));
    let tracker = tracker_for_secs(1.0);
    let cancel = CancelToken::new();

    let canceller = {
        let cancel = cancel.clone();
        thread::spawn(move || {
            thread::sleep(StdDuration::from_millis(20));
            cancel.cancel();
        })
    };

    let report = TrackPipeline::new(
        TrackKind::Video,
        Box::new(VecSource::new(samples)),
        Box::new(sink),
        tracker.register(TrackKind::Video),
        cancel,
    )
    .run();

    canceller.join().unwrap();
    assert_eq!(report.state, PipelineState::Failed);
    assert!(matches!(report.error, Some(PipelineError::Cancelled)));
}

#[test]
fn write_after_finish_is_rejected_by_the_sink() {
    let (mut sink, _recording) = RecordingSink::new(ReadyGate::new(true));
    sink.mark_finished().unwrap();
    assert!(matches!(
        sink.write(video_sample(0)),
        Err(WriteError::TrackFinished)
    ));
    assert!(matches!(
        sink.mark_finished(),
        Err(WriteError::TrackFinished)
    ));
}

#[test]
fn end_of_track_is_sticky() {
    let mut source = VecSource::new(vec![video_sample(0)]);
    assert!(source.next_sample().unwrap().is_some());
    assert!(source.next_sample().unwrap().is_none());
    assert!(source.next_sample().unwrap().is_none());
}
