//! Clock sources and the steady timeline the engine measures against.
//!
//! A `ClockSource` only answers "how much monotonic time has passed since
//! your origin". The engine never reads wall-clock time for its logic.
//! `SteadyClock` sits between a source and the runner and turns raw readings
//! into a timeline that never runs backward and never leaps ahead.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::warn;

/// A read-only source of monotonic time.
pub trait ClockSource: Send + Sync {
    /// Time elapsed since this clock's origin.
    fn now(&self) -> Duration;
}

/// The default clock, backed by `tokio::time::Instant`.
///
/// Because it reads tokio's clock, paused tokio time (`start_paused`) drives
/// it deterministically in tests.
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: tokio::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: tokio::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockSource for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A clock whose reading is set by hand.
///
/// Clones share the same reading, so a test can keep one handle and give
/// the other to an engine.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    reading: Arc<Mutex<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the reading forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut reading = self.lock();
        *reading = reading.saturating_add(by);
    }

    /// Sets the reading to an arbitrary value, backward jumps included.
    pub fn set(&self, to: Duration) {
        *self.lock() = to;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Duration> {
        // A poisoned reading is still a valid Duration.
        self.reading.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl ClockSource for ManualClock {
    fn now(&self) -> Duration {
        *self.lock()
    }
}

/// What went wrong with a raw clock reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnomalyKind {
    /// The reading was earlier than the previous one.
    Backward { by: Duration },
    /// The reading advanced far more than the wait that preceded it.
    ForwardJump { by: Duration },
    /// The reading advanced less than half of the wait that preceded it.
    Stalled { advanced: Duration },
}

/// A clock reading the engine refused to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockAnomaly {
    pub kind: AnomalyKind,
    /// The advance the engine used instead of the raw delta.
    pub substituted: Duration,
}

/// A monotonic view over a `ClockSource`.
///
/// Each `read` is told how long the caller just waited. Raw deltas that go
/// backward, fall short of half that wait, or exceed it by more than
/// `max_jump`, are replaced by the expected wait and recorded as anomalies.
/// The effective timeline therefore advances on every read.
pub struct SteadyClock {
    source: Arc<dyn ClockSource>,
    max_jump: Duration,
    last_raw: Duration,
    effective: Duration,
    anomalies: Vec<ClockAnomaly>,
}

impl SteadyClock {
    pub fn new(source: Arc<dyn ClockSource>, max_jump: Duration) -> Self {
        let last_raw = source.now();
        Self {
            source,
            max_jump,
            last_raw,
            effective: Duration::ZERO,
            anomalies: Vec::new(),
        }
    }

    /// The current effective time without consuming a raw reading.
    pub fn peek(&self) -> Duration {
        self.effective
    }

    /// Re-anchors on the source without advancing the effective timeline.
    ///
    /// Time spent outside a phase (between construction and start, or in
    /// completion callbacks) is not attributed to any phase.
    pub fn resync(&mut self) {
        self.last_raw = self.source.now();
    }

    /// Reads the source and advances the effective timeline.
    pub fn read(&mut self, expected: Duration) -> Duration {
        let raw = self.source.now();
        let advance = match raw.checked_sub(self.last_raw) {
            None => {
                let by = self.last_raw - raw;
                self.flag(AnomalyKind::Backward { by }, expected)
            }
            Some(delta) if delta > expected.saturating_add(self.max_jump) => {
                let by = delta - expected;
                self.flag(AnomalyKind::ForwardJump { by }, expected)
            }
            Some(delta) if delta < expected / 2 => {
                self.flag(AnomalyKind::Stalled { advanced: delta }, expected)
            }
            Some(delta) => delta,
        };
        self.last_raw = raw;
        self.effective = self.effective.saturating_add(advance);
        self.effective
    }

    /// Hands over every anomaly recorded since the last call.
    pub fn take_anomalies(&mut self) -> Vec<ClockAnomaly> {
        std::mem::take(&mut self.anomalies)
    }

    fn flag(&mut self, kind: AnomalyKind, substituted: Duration) -> Duration {
        warn!(?kind, ?substituted, "Clock anomaly detected; using expected advance.");
        self.anomalies.push(ClockAnomaly { kind, substituted });
        substituted
    }
}
