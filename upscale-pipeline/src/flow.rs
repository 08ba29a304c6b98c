//! Backpressure and cancellation primitives.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Cooperative cancellation token shared by every pipeline of a session.
///
/// Tripping is one-way and idempotent. Pipelines check it between
/// samples, never mid-write.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    /// Create an untripped token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token has been tripped.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Condvar-backed readiness gate between a sink track and its pipeline.
///
/// The sink flips readiness as its internal queue drains and fills;
/// the pipeline blocks in [`ReadyGate::wait`] instead of polling.
#[derive(Debug, Clone)]
pub struct ReadyGate {
    inner: Arc<GateInner>,
}

#[derive(Debug)]
struct GateInner {
    ready: Mutex<bool>,
    cond: Condvar,
}

impl ReadyGate {
    /// Create a gate with an initial readiness.
    #[must_use]
    pub fn new(ready: bool) -> Self {
        Self {
            inner: Arc::new(GateInner {
                ready: Mutex::new(ready),
                cond: Condvar::new(),
            }),
        }
    }

    /// Flip readiness and wake waiters.
    pub fn set_ready(&self, ready: bool) {
        let mut guard = self.inner.ready.lock();
        *guard = ready;
        drop(guard);
        self.inner.cond.notify_all();
    }

    /// Current readiness without blocking.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        *self.inner.ready.lock()
    }

    /// Block until the gate is ready or the token trips. Returns
    /// `false` on cancellation. Waits are bounded so a trip is
    /// observed even without a wakeup.
    pub fn wait(&self, cancel: &CancelToken) -> bool {
        let mut ready = self.inner.ready.lock();
        loop {
            if *ready {
                return true;
            }
            if cancel.is_cancelled() {
                return false;
            }
            let _ = self
                .inner
                .cond
                .wait_for(&mut ready, Duration::from_millis(10));
        }
    }
}

impl Default for ReadyGate {
    fn default() -> Self {
        Self::new(true)
    }
}
