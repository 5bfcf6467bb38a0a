//! Defines the lifecycle events broadcast by a running `SessionEngine`.
//!
//! Subscribers receive these over a `tokio::sync::broadcast` channel. Progress
//! ticks are not broadcast; they go straight to the `on_tick` callback.

use crate::engine::SessionOutcome;
use crate::time::ClockAnomaly;
use std::time::Duration;

/// Events describing the life of one session.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// Fired once when `start` begins timing.
    SessionStarted {
        session_label: String,
        planned_total: Duration,
    },
    /// Fired as each phase begins.
    PhaseStarted { index: usize, label: String },
    /// Fired when a phase runs all of its repetitions.
    PhaseCompleted { index: usize, label: String },
    /// Fired when the engine refused a clock reading.
    ClockAnomaly { phase_index: usize, anomaly: ClockAnomaly },
    /// Fired once when every phase has completed.
    SessionCompleted { outcome: SessionOutcome },
    /// Fired once when the session stopped early.
    SessionCancelled { outcome: SessionOutcome },
}

impl SessionEvent {
    /// Returns `true` for the single event that closes a session.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionEvent::SessionCompleted { .. } | SessionEvent::SessionCancelled { .. }
        )
    }
}
