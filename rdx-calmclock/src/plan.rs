//! Immutable session definitions: phases, cues, and plans.
//!
//! Every constructor validates its input, so a `SessionPlan` that exists is
//! always safe to hand to the engine.

use crate::config::{PhaseConfig, PlanConfig};
use crate::error::PlanError;
use std::time::Duration;

/// A line of guidance that becomes active at an offset within a phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub at: Duration,
    pub text: String,
}

impl Cue {
    pub fn new(at: Duration, text: impl Into<String>) -> Self {
        Self {
            at,
            text: text.into(),
        }
    }

    /// Convenience for scripts written in whole seconds.
    pub fn at_secs(secs: u64, text: impl Into<String>) -> Self {
        Self::new(Duration::from_secs(secs), text)
    }
}

/// One timed segment of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseSpec {
    label: String,
    duration: Duration,
    repeat_count: u32,
    cues: Vec<Cue>,
}

impl PhaseSpec {
    /// A phase that runs once.
    pub fn new(label: impl Into<String>, duration: Duration) -> Result<Self, PlanError> {
        Self::cyclic(label, duration, 1)
    }

    /// A phase whose interval repeats `repeat_count` times back to back.
    pub fn cyclic(
        label: impl Into<String>,
        duration: Duration,
        repeat_count: u32,
    ) -> Result<Self, PlanError> {
        let label = label.into();
        if duration.is_zero() {
            return Err(PlanError::NonPositiveDuration { label });
        }
        if repeat_count == 0 {
            return Err(PlanError::NonPositiveRepeat { label });
        }
        duration
            .checked_mul(repeat_count)
            .ok_or(PlanError::DurationOverflow)?;
        Ok(Self {
            label,
            duration,
            repeat_count,
            cues: Vec::new(),
        })
    }

    /// Attaches cues, replayed on every repetition.
    ///
    /// Cues are kept sorted by offset and must start before the interval ends.
    pub fn with_cues(mut self, cues: impl IntoIterator<Item = Cue>) -> Result<Self, PlanError> {
        for cue in cues {
            if cue.at >= self.duration {
                return Err(PlanError::CueOutOfRange {
                    label: self.label,
                    at: cue.at,
                });
            }
            self.cues.push(cue);
        }
        self.cues.sort_by_key(|cue| cue.at);
        Ok(self)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Length of a single repetition.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn repeat_count(&self) -> u32 {
        self.repeat_count
    }

    pub fn cues(&self) -> &[Cue] {
        &self.cues
    }

    /// Length of all repetitions together.
    pub fn total_duration(&self) -> Duration {
        // Checked in the constructor.
        self.duration * self.repeat_count
    }

    /// The cue in effect at `elapsed` into a repetition, with its own remaining time.
    pub fn cue_at(&self, elapsed: Duration) -> Option<CueView<'_>> {
        let index = self.cues.iter().rposition(|cue| cue.at <= elapsed)?;
        let ends_at = self
            .cues
            .get(index + 1)
            .map_or(self.duration, |next| next.at);
        Some(CueView {
            text: &self.cues[index].text,
            index,
            remaining: ends_at.saturating_sub(elapsed),
        })
    }
}

/// A borrowed view of the cue active at some instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CueView<'a> {
    pub text: &'a str,
    /// Position of the cue within its phase.
    pub index: usize,
    /// Time until the next cue, or the end of the repetition.
    pub remaining: Duration,
}

/// An ordered, non-empty sequence of phases forming one runnable session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPlan {
    session_label: String,
    phases: Vec<PhaseSpec>,
    planned_total: Duration,
}

impl SessionPlan {
    pub fn new(session_label: impl Into<String>, phases: Vec<PhaseSpec>) -> Result<Self, PlanError> {
        if phases.is_empty() {
            return Err(PlanError::EmptyPlan);
        }
        let planned_total = phases
            .iter()
            .try_fold(Duration::ZERO, |acc, phase| {
                acc.checked_add(phase.total_duration())
            })
            .ok_or(PlanError::DurationOverflow)?;
        Ok(Self {
            session_label: session_label.into(),
            phases,
            planned_total,
        })
    }

    pub fn session_label(&self) -> &str {
        &self.session_label
    }

    pub fn phases(&self) -> &[PhaseSpec] {
        &self.phases
    }

    /// Sum over phases of `duration × repeat_count`.
    pub fn planned_total(&self) -> Duration {
        self.planned_total
    }
}

impl TryFrom<&PhaseConfig> for PhaseSpec {
    type Error = PlanError;

    fn try_from(config: &PhaseConfig) -> Result<Self, Self::Error> {
        let duration = Duration::try_from_secs_f64(config.seconds).map_err(|_| {
            PlanError::NonPositiveDuration {
                label: config.label.clone(),
            }
        })?;
        PhaseSpec::cyclic(config.label.clone(), duration, config.repeat)?.with_cues(
            config
                .cues
                .iter()
                .map(|cue| Cue::at_secs(cue.at, cue.text.clone())),
        )
    }
}

impl TryFrom<&PlanConfig> for SessionPlan {
    type Error = PlanError;

    fn try_from(config: &PlanConfig) -> Result<Self, Self::Error> {
        let phases = config
            .phases
            .iter()
            .map(PhaseSpec::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        SessionPlan::new(config.label.clone(), phases)
    }
}
