//! The progress contract the engine exposes to renderers.
//!
//! The engine never draws anything. Each tick carries enough to draw a bar,
//! a percentage, or a countdown, plus a couple of small formatting helpers
//! that terminal renderers share.

use crate::common::SessionStatus;
use crate::components::runner::PhaseTick;
use crate::engine::RunState;
use crate::plan::CueView;
use std::time::Duration;

/// Default width of a text progress bar, in cells.
pub const BAR_WIDTH: usize = 30;

/// `part / whole`, clamped to `[0, 1]`. A zero `whole` counts as done.
pub fn fraction(part: Duration, whole: Duration) -> f64 {
    if whole.is_zero() {
        return 1.0;
    }
    (part.as_secs_f64() / whole.as_secs_f64()).clamp(0.0, 1.0)
}

/// One progress update for a whole session.
#[derive(Debug, Clone, Copy)]
pub struct SessionTick<'a> {
    pub session_label: &'a str,
    /// Zero-based index of the running phase.
    pub phase_index: usize,
    pub phase_count: usize,
    pub phase: PhaseTick<'a>,
    /// Time accounted to the session so far, including this phase.
    pub session_elapsed: Duration,
    pub planned_total: Duration,
}

impl<'a> SessionTick<'a> {
    pub fn phase_label(&self) -> &'a str {
        self.phase.label
    }

    pub fn repeat_index(&self) -> u32 {
        self.phase.repeat_index
    }

    /// Remaining time in the current repetition.
    pub fn remaining(&self) -> Duration {
        self.phase.remaining
    }

    pub fn interval_fraction(&self) -> f64 {
        self.phase.interval_fraction()
    }

    pub fn phase_fraction(&self) -> f64 {
        self.phase.phase_fraction()
    }

    pub fn session_fraction(&self) -> f64 {
        fraction(self.session_elapsed, self.planned_total)
    }

    pub fn session_remaining(&self) -> Duration {
        self.planned_total.saturating_sub(self.session_elapsed)
    }

    pub fn cue(&self) -> Option<CueView<'a>> {
        self.phase.cue
    }

    /// The engine's state at this tick. A session is always running while it ticks.
    pub fn run_state(&self) -> RunState {
        RunState {
            current_phase_index: self.phase_index,
            current_repeat_index: self.phase.repeat_index,
            elapsed_in_phase: self.phase.elapsed_in_phase(),
            total_elapsed: self.session_elapsed,
            status: SessionStatus::Running,
        }
    }
}

/// Renders `[####------]` with `width` cells filled in proportion to `fraction`.
pub fn bar(fraction: f64, width: usize) -> String {
    let fraction = if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) };
    let filled = ((fraction * width as f64).floor() as usize).min(width);
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled))
}

/// Formats a countdown as `MM:SS`, rounding partial seconds up.
///
/// Rounding up keeps `00:00` for the moment a countdown actually ends.
pub fn format_clock(remaining: Duration) -> String {
    let mut secs = remaining.as_secs();
    if remaining.subsec_nanos() > 0 {
        secs += 1;
    }
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
