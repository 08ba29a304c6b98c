//! Presentation-time progress accounting.
//!
//! Each track pipeline advances a watermark with the presentation time
//! of every sample it writes. Session progress is the minimum
//! watermark across unfinished tracks over the total duration, so it
//! never runs ahead of the slowest track and never moves backwards.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;
use upscale_core::{Duration, TimeBase, Timestamp, TrackKind};

/// Callback invoked with the overall progress fraction in `0.0..=1.0`.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Shared progress state for one session.
#[derive(Clone)]
pub struct ProgressTracker {
    shared: Arc<Shared>,
}

struct Shared {
    total_us: i64,
    state: Mutex<State>,
    callback: Option<ProgressCallback>,
}

struct State {
    tracks: Vec<TrackState>,
    emitted: f64,
}

struct TrackState {
    kind: TrackKind,
    watermark_us: i64,
    done: bool,
}

impl ProgressTracker {
    /// Create a tracker for a presentation of the given total duration.
    #[must_use]
    pub fn new(total: Duration, callback: Option<ProgressCallback>) -> Self {
        Self {
            shared: Arc::new(Shared {
                total_us: total.rescale(TimeBase::MICROSECONDS).value,
                state: Mutex::new(State {
                    tracks: Vec::new(),
                    emitted: 0.0,
                }),
                callback,
            }),
        }
    }

    /// Register a track and get its watermark handle.
    #[must_use]
    pub fn register(&self, kind: TrackKind) -> TrackWatermark {
        let mut state = self.shared.state.lock();
        state.tracks.push(TrackState {
            kind,
            watermark_us: 0,
            done: false,
        });
        TrackWatermark {
            tracker: self.clone(),
            index: state.tracks.len() - 1,
        }
    }

    /// Current overall fraction.
    #[must_use]
    pub fn fraction(&self) -> f64 {
        let state = self.shared.state.lock();
        self.fraction_locked(&state)
    }

    /// Emit the terminal 1.0. Called once the output is finalized.
    pub fn complete(&self) {
        let mut state = self.shared.state.lock();
        if state.emitted < 1.0 {
            state.emitted = 1.0;
            drop(state);
            if let Some(cb) = &self.shared.callback {
                cb(1.0);
            }
        }
    }

    fn fraction_locked(&self, state: &State) -> f64 {
        if state.tracks.is_empty() {
            return 0.0;
        }
        if self.shared.total_us <= 0 {
            return if state.tracks.iter().all(|t| t.done) {
                1.0
            } else {
                0.0
            };
        }
        let min_us = state
            .tracks
            .iter()
            .map(|t| {
                if t.done {
                    self.shared.total_us
                } else {
                    t.watermark_us
                }
            })
            .min()
            .unwrap_or(0);
        (min_us as f64 / self.shared.total_us as f64).clamp(0.0, 1.0)
    }

    fn advance(&self, index: usize, pts: Timestamp) {
        let us = pts.rescale(TimeBase::MICROSECONDS);
        if !us.is_valid() {
            return;
        }
        let mut state = self.shared.state.lock();
        let track = &mut state.tracks[index];
        if us.value <= track.watermark_us {
            return;
        }
        trace!(kind = %track.kind, watermark_us = us.value, "watermark advance");
        track.watermark_us = us.value;
        let fraction = self.fraction_locked(&state);
        if fraction > state.emitted {
            state.emitted = fraction;
            drop(state);
            if let Some(cb) = &self.shared.callback {
                cb(fraction);
            }
        }
    }

    fn finish(&self, index: usize) {
        let mut state = self.shared.state.lock();
        state.tracks[index].done = true;
    }
}

/// Per-track watermark handle held by a pipeline.
pub struct TrackWatermark {
    tracker: ProgressTracker,
    index: usize,
}

impl TrackWatermark {
    /// Raise the watermark to the given presentation time.
    pub fn advance(&self, pts: Timestamp) {
        self.tracker.advance(self.index, pts);
    }

    /// Mark this track as fully processed.
    pub fn finish(&self) {
        self.tracker.finish(self.index);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use std::sync::Arc;

    fn collector() -> (Arc<PlMutex<Vec<f64>>>, ProgressCallback) {
        let seen = Arc::new(PlMutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, Box::new(move |f| sink.lock().push(f)))
    }

    fn ms(value: i64) -> Timestamp {
        Timestamp::new(value, TimeBase::MILLISECONDS)
    }

    #[test]
    fn minimum_watermark_wins() {
        let tracker = ProgressTracker::new(Duration::from_secs_f64(10.0), None);
        let video = tracker.register(TrackKind::Video);
        let audio = tracker.register(TrackKind::Audio);

        video.advance(ms(5_000));
        assert_eq!(tracker.fraction(), 0.0);

        audio.advance(ms(2_000));
        assert!((tracker.fraction() - 0.2).abs() < 1e-9);
    }

    #[test]
    fn finished_track_stops_holding_back() {
        let tracker = ProgressTracker::new(Duration::from_secs_f64(10.0), None);
        let video = tracker.register(TrackKind::Video);
        let audio = tracker.register(TrackKind::Audio);

        audio.advance(ms(10_000));
        audio.finish();
        video.advance(ms(4_000));
        assert!((tracker.fraction() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn emissions_are_monotone() {
        let (seen, cb) = collector();
        let tracker = ProgressTracker::new(Duration::from_secs_f64(10.0), Some(cb));
        let video = tracker.register(TrackKind::Video);

        video.advance(ms(1_000));
        video.advance(ms(500));
        video.advance(ms(3_000));
        tracker.complete();

        let seen = seen.lock();
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(*seen.last().unwrap(), 1.0);
    }

    #[test]
    fn complete_emits_exactly_once() {
        let (seen, cb) = collector();
        let tracker = ProgressTracker::new(Duration::from_secs_f64(1.0), Some(cb));
        let _video = tracker.register(TrackKind::Video);
        tracker.complete();
        tracker.complete();
        assert_eq!(*seen.lock(), vec![1.0]);
    }

    #[test]
    fn zero_duration_presentation() {
        let tracker = ProgressTracker::new(Duration::zero(), None);
        let video = tracker.register(TrackKind::Video);
        assert_eq!(tracker.fraction(), 0.0);
        video.finish();
        assert_eq!(tracker.fraction(), 1.0);
    }

    #[test]
    fn invalid_pts_is_ignored() {
        let tracker = ProgressTracker::new(Duration::from_secs_f64(1.0), None);
        let video = tracker.register(TrackKind::Video);
        video.advance(Timestamp::none());
        assert_eq!(tracker.fraction(), 0.0);
    }
}
