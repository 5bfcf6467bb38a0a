//! Audible cues for phase and session completion.

use crate::engine::SessionOutcome;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// Receives completion events. Implementations must return promptly.
pub trait Notifier: Send + Sync {
    fn phase_complete(&self, label: &str);
    fn session_complete(&self, outcome: &SessionOutcome);
}

/// Rings the terminal bell.
#[derive(Debug, Clone)]
pub struct TerminalBell {
    enabled: bool,
}

impl TerminalBell {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Writes a BEL to `out`, falling back to a visible separator.
    pub fn ring_into(&self, out: &mut impl Write) {
        if !self.enabled {
            return;
        }
        if out.write_all(b"\x07").and_then(|_| out.flush()).is_err() {
            let _ = writeln!(out, "\n***\n");
        }
    }

    pub fn ring(&self) {
        self.ring_into(&mut std::io::stdout());
    }
}

impl Notifier for TerminalBell {
    fn phase_complete(&self, label: &str) {
        debug!(phase = label, "Bell for phase.");
        self.ring();
    }

    fn session_complete(&self, outcome: &SessionOutcome) {
        debug!(session = %outcome.session_label, "Bell for session.");
        self.ring();
    }
}

/// Counts events without making a sound.
#[derive(Debug, Default)]
pub struct SilentNotifier {
    phases: AtomicUsize,
    sessions: AtomicUsize,
}

impl SilentNotifier {
    pub fn phases(&self) -> usize {
        self.phases.load(Ordering::Relaxed)
    }

    pub fn sessions(&self) -> usize {
        self.sessions.load(Ordering::Relaxed)
    }
}

impl Notifier for SilentNotifier {
    fn phase_complete(&self, _label: &str) {
        self.phases.fetch_add(1, Ordering::Relaxed);
    }

    fn session_complete(&self, _outcome: &SessionOutcome) {
        self.sessions.fetch_add(1, Ordering::Relaxed);
    }
}
