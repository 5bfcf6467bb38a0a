//! The built-in session kinds, each expressed purely as a `SessionPlan`.
//!
//! Nothing here is known to the engine. Adding a kind means adding a plan.

use crate::common::{duration_from_minutes, minutes_rounded};
use crate::config::{PlanConfig, SessionDefaults};
use crate::error::PlanError;
use crate::plan::{Cue, PhaseSpec, SessionPlan};
use std::time::Duration;

const GUIDED_5: &[(u64, &str)] = &[
    (0, "Sit comfortably, spine straight, hands relaxed."),
    (8, "Close your eyes softly. Bring attention to the breath."),
    (20, "Follow your inhale... and your exhale. No need to control."),
    (60, "If the mind wanders, gently bring it back to the breath."),
    (120, "Feel the body, the weight on the seat, the ground beneath you."),
    (180, "Notice sounds outside without judging them."),
    (240, "Feel gratitude for this time. When ready, deepen the breath."),
];

const GUIDED_10: &[(u64, &str)] = &[
    (0, "Make yourself comfortable. Relax your shoulders."),
    (10, "Close your eyes. Take three slow breaths, in and out."),
    (30, "Allow your breath to find its own natural rhythm."),
    (90, "Scan the body from head to toe and release any tension."),
    (180, "Focus on the rise and fall of the chest or belly."),
    (300, "If thoughts appear, label them 'thinking' and let them pass."),
    (420, "Extend your out-breath by one second, just softly."),
    (540, "Bring kindness to yourself. Hold this moment of calm."),
    (570, "When ready, wiggle your fingers and toes and open eyes slowly."),
];

const GUIDED_15: &[(u64, &str)] = &[
    (0, "Begin seated or lying down. Let the body soften."),
    (12, "Take a deep inhalation and a slow exhalation."),
    (40, "Scan your body and breathe into any tight spots."),
    (120, "Now focus on breath sensations, cool at the nostrils, warm at the exhale."),
    (300, "If a thought grabs you, observe it, then return to the breath."),
    (480, "Stay with a gentle attention; do not push or force."),
    (660, "Offer a short gratitude for something simple, a breath, a sound."),
    (840, "Slowly deepen your breath and return awareness to the room."),
    (880, "When ready, open your eyes and take this calm into your next minutes."),
];

const BODY_PARTS: &[&str] = &[
    "top of the head: notice sensations there",
    "forehead and eyes: soften the muscles",
    "jaw and mouth: let the jaw relax",
    "neck and shoulders: release weight into the chair",
    "arms, hands, and fingers: soft and heavy",
    "chest and belly: breathe into the chest",
    "lower back and hips: let them sink",
    "thighs and knees: feel support",
    "calves and shins: let go",
    "feet and toes: notice contact with the floor",
];

/// The fixed lengths of the guided meditations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuidedLength {
    Five,
    Ten,
    Fifteen,
}

impl GuidedLength {
    pub fn from_minutes(minutes: u32) -> Option<Self> {
        match minutes {
            5 => Some(GuidedLength::Five),
            10 => Some(GuidedLength::Ten),
            15 => Some(GuidedLength::Fifteen),
            _ => None,
        }
    }

    pub fn minutes(self) -> u64 {
        match self {
            GuidedLength::Five => 5,
            GuidedLength::Ten => 10,
            GuidedLength::Fifteen => 15,
        }
    }

    fn script(self) -> &'static [(u64, &'static str)] {
        match self {
            GuidedLength::Five => GUIDED_5,
            GuidedLength::Ten => GUIDED_10,
            GuidedLength::Fifteen => GUIDED_15,
        }
    }
}

/// Seconds for each side of the breathing box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxPattern {
    pub cycles: u32,
    pub inhale_secs: u64,
    pub hold_secs: u64,
    pub exhale_secs: u64,
}

impl From<&SessionDefaults> for BoxPattern {
    fn from(defaults: &SessionDefaults) -> Self {
        Self {
            cycles: defaults.box_cycles,
            inhale_secs: defaults.box_inhale_secs,
            hold_secs: defaults.box_hold_secs,
            exhale_secs: defaults.box_exhale_secs,
        }
    }
}

/// A session the menu can start.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionKind {
    Guided(GuidedLength),
    SilentTimer { minutes: f64 },
    BoxBreathing(BoxPattern),
    BodyScan { minutes: f64 },
}

impl SessionKind {
    /// Builds the plan for this kind.
    pub fn plan(&self) -> Result<SessionPlan, PlanError> {
        match self {
            SessionKind::Guided(length) => guided(*length),
            SessionKind::SilentTimer { minutes } => silent_timer(*minutes),
            SessionKind::BoxBreathing(pattern) => box_breathing(pattern),
            SessionKind::BodyScan { minutes } => body_scan(*minutes),
        }
    }
}

fn guided(length: GuidedLength) -> Result<SessionPlan, PlanError> {
    let minutes = length.minutes();
    let cues = length
        .script()
        .iter()
        .map(|(at, text)| Cue::at_secs(*at, *text));
    let phase = PhaseSpec::new("Guided meditation", Duration::from_secs(minutes * 60))?
        .with_cues(cues)?;
    SessionPlan::new(format!("Guided {minutes} min"), vec![phase])
}

fn silent_timer(minutes: f64) -> Result<SessionPlan, PlanError> {
    let duration = duration_from_minutes(minutes).ok_or(PlanError::InvalidMinutes(minutes))?;
    let phase = PhaseSpec::new(format!("Silent timer, {} min", minutes_rounded(duration)), duration)?;
    SessionPlan::new("Custom timer", vec![phase])
}

fn box_breathing(pattern: &BoxPattern) -> Result<SessionPlan, PlanError> {
    let inhale = Duration::from_secs(pattern.inhale_secs);
    let hold = Duration::from_secs(pattern.hold_secs);
    let exhale = Duration::from_secs(pattern.exhale_secs);
    let cycle = [inhale, hold, exhale, hold]
        .into_iter()
        .try_fold(Duration::ZERO, Duration::checked_add)
        .ok_or(PlanError::DurationOverflow)?;

    // Zero-length sides collapse; their cue would share an offset with the next.
    let mut cues = Vec::with_capacity(4);
    let mut at = Duration::ZERO;
    for (side, text) in [(inhale, "Inhale"), (hold, "Hold"), (exhale, "Exhale"), (hold, "Hold")] {
        if !side.is_zero() {
            cues.push(Cue::new(at, text));
        }
        // Partial sums never exceed `cycle`.
        at += side;
    }

    let phase = PhaseSpec::cyclic("Box breathing", cycle, pattern.cycles)?.with_cues(cues)?;
    SessionPlan::new("Box breathing", vec![phase])
}

fn body_scan(minutes: f64) -> Result<SessionPlan, PlanError> {
    let total = duration_from_minutes(minutes).ok_or(PlanError::InvalidMinutes(minutes))?;
    let per_part = total / BODY_PARTS.len() as u32;
    let phases = BODY_PARTS
        .iter()
        .enumerate()
        .map(|(i, part)| {
            PhaseSpec::new(format!("Part {}/{}", i + 1, BODY_PARTS.len()), per_part)?
                .with_cues([Cue::new(Duration::ZERO, format!("Focus: {part}"))])
        })
        .collect::<Result<Vec<_>, _>>()?;
    SessionPlan::new(format!("Body-scan {} min", minutes_rounded(total)), phases)
}

/// Builds the plan for a configured preset.
pub fn preset(config: &PlanConfig) -> Result<SessionPlan, PlanError> {
    SessionPlan::try_from(config)
}
