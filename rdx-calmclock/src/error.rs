//! Error types for the Calmclock library.
//!
//! Only plan construction and the journal can fail. Cancellation is a normal
//! session status and clock anomalies are absorbed by the engine, so neither
//! shows up here.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// A session plan that can never be started.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlanError {
    /// The plan contains no phases.
    #[error("a session plan needs at least one phase")]
    EmptyPlan,

    /// A phase was given a zero duration.
    #[error("phase '{label}' must have a positive duration")]
    NonPositiveDuration { label: String },

    /// A phase was given a zero repeat count.
    #[error("phase '{label}' must repeat at least once")]
    NonPositiveRepeat { label: String },

    /// A cue was placed at or beyond the end of its phase.
    #[error("cue at {at:?} falls outside phase '{label}'")]
    CueOutOfRange { label: String, at: Duration },

    /// The total planned duration cannot be represented.
    #[error("the total planned duration overflows")]
    DurationOverflow,

    /// A minute count could not be turned into a positive duration.
    #[error("invalid duration of {0} minutes")]
    InvalidMinutes(f64),
}

/// Failures while persisting or reading the session journal.
#[derive(Error, Debug)]
pub enum JournalError {
    #[error("journal I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("journal CSV error: {0}")]
    Csv(#[from] csv::Error),
}
