//! Drives a single phase through its repetitions.

use crate::plan::{CueView, PhaseSpec};
use crate::progress::fraction;
use crate::time::{ClockAnomaly, ClockSource, SteadyClock};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

/// Shortest tick the runner will wait for.
const MIN_TICK: Duration = Duration::from_millis(1);

/// Progress within one phase, handed to the tick callback.
#[derive(Debug, Clone, Copy)]
pub struct PhaseTick<'a> {
    pub label: &'a str,
    /// 1-based index of the running repetition.
    pub repeat_index: u32,
    pub repeat_count: u32,
    /// Time into the current repetition.
    pub elapsed: Duration,
    /// Time left in the current repetition. Exactly zero on the final tick.
    pub remaining: Duration,
    /// Length of one repetition.
    pub duration: Duration,
    pub cue: Option<CueView<'a>>,
}

impl<'a> PhaseTick<'a> {
    /// The tick for `elapsed` into repetition `repeat_index` of `phase`.
    pub fn new(phase: &'a PhaseSpec, repeat_index: u32, elapsed: Duration) -> Self {
        let duration = phase.duration();
        let elapsed = elapsed.min(duration);
        Self {
            label: phase.label(),
            repeat_index,
            repeat_count: phase.repeat_count(),
            elapsed,
            remaining: duration - elapsed,
            duration,
            cue: phase.cue_at(elapsed),
        }
    }

    /// Time into the phase, counting finished repetitions.
    pub fn elapsed_in_phase(&self) -> Duration {
        self.duration * (self.repeat_index - 1) + self.elapsed
    }

    /// Progress through the current repetition, in `[0, 1]`.
    pub fn interval_fraction(&self) -> f64 {
        fraction(self.elapsed, self.duration)
    }

    /// Progress through the whole phase, in `[0, 1]`.
    pub fn phase_fraction(&self) -> f64 {
        fraction(self.elapsed_in_phase(), self.duration * self.repeat_count)
    }

    pub fn is_final(&self) -> bool {
        self.remaining.is_zero()
    }
}

/// How a phase ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseResult {
    pub completed: bool,
    /// Time accounted to the phase, finished repetitions included.
    pub elapsed_in_phase: Duration,
    pub completed_repetitions: u32,
}

/// Runs phases against a steady clock at a fixed tick cadence.
pub struct PhaseRunner {
    clock: SteadyClock,
    tick_interval: Duration,
}

impl PhaseRunner {
    pub fn new(source: Arc<dyn ClockSource>, tick_interval: Duration, max_clock_jump: Duration) -> Self {
        Self {
            clock: SteadyClock::new(source, max_clock_jump),
            tick_interval: tick_interval.max(MIN_TICK),
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    /// Anomalies seen since the last call.
    pub fn take_anomalies(&mut self) -> Vec<ClockAnomaly> {
        self.clock.take_anomalies()
    }

    /// Runs `phase` until every repetition has finished or `is_cancelled` is seen.
    ///
    /// Each repetition opens with a tick at its start and closes with a tick
    /// reporting zero remaining. Cancellation is polled before each
    /// repetition and after every wait; a wait that lands on the deadline
    /// completes the repetition even if cancellation arrived meanwhile.
    pub async fn run<T, C>(&mut self, phase: &PhaseSpec, mut on_tick: T, is_cancelled: C) -> PhaseResult
    where
        T: FnMut(&PhaseTick<'_>),
        C: Fn() -> bool,
    {
        debug!(
            phase = phase.label(),
            duration = ?phase.duration(),
            repeats = phase.repeat_count(),
            "Phase starting."
        );
        let duration = phase.duration();
        self.clock.resync();
        let mut origin = self.clock.peek();
        let mut banked = Duration::ZERO;

        for repeat_index in 1..=phase.repeat_count() {
            if is_cancelled() {
                return Self::cancelled(phase, banked, repeat_index - 1);
            }
            let mut elapsed = self.clock.peek().saturating_sub(origin).min(duration);
            on_tick(&PhaseTick::new(phase, repeat_index, elapsed));

            while elapsed < duration {
                let wait = self.tick_interval.min(duration - elapsed);
                tokio::time::sleep(wait).await;
                let now = self.clock.read(wait);
                elapsed = now.saturating_sub(origin).min(duration).max(elapsed);

                if elapsed < duration && is_cancelled() {
                    return Self::cancelled(phase, banked + elapsed, repeat_index - 1);
                }
                let tick = PhaseTick::new(phase, repeat_index, elapsed);
                trace!(phase = tick.label, repeat = repeat_index, remaining = ?tick.remaining, "Tick.");
                on_tick(&tick);
            }

            banked += duration;
            // The next repetition starts where this one was due to end.
            origin += duration;
        }

        debug!(phase = phase.label(), "Phase completed.");
        PhaseResult {
            completed: true,
            elapsed_in_phase: banked,
            completed_repetitions: phase.repeat_count(),
        }
    }

    fn cancelled(phase: &PhaseSpec, elapsed_in_phase: Duration, completed_repetitions: u32) -> PhaseResult {
        debug!(phase = phase.label(), elapsed = ?elapsed_in_phase, "Phase cancelled.");
        PhaseResult {
            completed: false,
            elapsed_in_phase,
            completed_repetitions,
        }
    }
}
