//! Contains common, primitive types shared across the Calmclock engine.
//!
//! This module defines the terminal status of a session and the single
//! rounding rule used whenever a duration is presented in minutes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The lifecycle status of a session.
///
/// `Running` is only ever observed on a live engine. A finished session is
/// always either `Completed` or `Cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Returns `true` once the session can no longer change.
    pub fn is_terminal(self) -> bool {
        !matches!(self, SessionStatus::Running)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// Converts a duration to minutes, rounded to the nearest tenth of a minute.
///
/// Halves round away from zero. Every place that shows or logs minutes goes
/// through this function so the journal and the terminal always agree.
pub fn minutes_rounded(duration: Duration) -> f64 {
    (duration.as_secs_f64() / 6.0).round() / 10.0
}

/// Converts fractional minutes into a `Duration`.
///
/// Returns `None` for negative, zero, non-finite, or unrepresentable input.
pub fn duration_from_minutes(minutes: f64) -> Option<Duration> {
    if !minutes.is_finite() || minutes <= 0.0 {
        return None;
    }
    Duration::try_from_secs_f64(minutes * 60.0)
        .ok()
        .filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_to_nearest_tenth_of_a_minute() {
        assert_eq!(minutes_rounded(Duration::from_secs(300)), 5.0);
        assert_eq!(minutes_rounded(Duration::from_secs(64)), 1.1);
        assert_eq!(minutes_rounded(Duration::from_secs(450)), 7.5);
        assert_eq!(minutes_rounded(Duration::from_secs(2)), 0.0);
        // 3 seconds is exactly half of a tenth.
        assert_eq!(minutes_rounded(Duration::from_secs(3)), 0.1);
    }

    #[test]
    fn rejects_non_positive_minutes() {
        assert!(duration_from_minutes(0.0).is_none());
        assert!(duration_from_minutes(-2.0).is_none());
        assert!(duration_from_minutes(f64::NAN).is_none());
        assert!(duration_from_minutes(f64::INFINITY).is_none());
        assert_eq!(
            duration_from_minutes(7.5),
            Some(Duration::from_secs(450))
        );
    }

    #[test]
    fn status_display_matches_journal_encoding() {
        assert_eq!(SessionStatus::Completed.to_string(), "completed");
        assert_eq!(SessionStatus::Cancelled.to_string(), "cancelled");
        assert!(!SessionStatus::Running.is_terminal());
    }
}
