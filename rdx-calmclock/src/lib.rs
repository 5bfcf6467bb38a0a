//! # Calmclock
//!
//! A phase-structured session timer for guided meditation in the terminal.
//!
//! Calmclock turns a declarative session definition into a live,
//! interruptible countdown with accurate elapsed and remaining accounting.
//!
//! ## Core Concepts
//!
//! - **SessionPlan**: An ordered list of `PhaseSpec`s. A phase has a label, a
//!   duration, a repeat count, and optional timed cues. Every built-in session
//!   kind (guided, silent timer, box breathing, body scan) is just a plan.
//! - **SessionEngine**: Runs a plan in real time against a monotonic
//!   `ClockSource`, calling back on every tick and after every finished phase,
//!   and polling a cancellation predicate at each tick boundary.
//! - **SessionOutcome**: The single, immutable record of what happened,
//!   handed to a `Journal` and a `Notifier` by the caller.
//! - **Configuration-Driven**: Tick speed, anomaly tolerance, journal path,
//!   menu defaults and extra preset plans come from a `CalmConfig`, usually
//!   loaded from `calm.toml`.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use calmclock::prelude::*;
//! use std::sync::atomic::{AtomicBool, Ordering};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = CalmConfig::load()?;
//!     let plan = SessionKind::Guided(GuidedLength::Five).plan()?;
//!     let engine = SessionEngine::new(plan, EngineOptions::from(&config));
//!
//!     let stop = AtomicBool::new(false);
//!     let outcome = engine
//!         .start(
//!             |tick| println!("{} {}", tick.phase_label(), format_clock(tick.remaining())),
//!             |label| println!("{label} complete"),
//!             || stop.load(Ordering::Relaxed),
//!         )
//!         .await;
//!
//!     CsvJournal::new(&config.journal_path).record(&outcome, "")?;
//!     Ok(())
//! }
//! ```

pub const ENGINE_NAME: &str = "Calm Engine";
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Declare all the modules in the crate.
pub mod catalog;
pub mod common;
pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod journal;
pub mod notify;
pub mod plan;
pub mod progress;
pub mod time;

/// A prelude module for easy importing of the most common Calmclock types.
pub mod prelude {
    pub use crate::catalog::{BoxPattern, GuidedLength, SessionKind};
    pub use crate::common::SessionStatus;
    pub use crate::config::{CalmConfig, ClockResolution};
    pub use crate::engine::{CancelFlag, EngineOptions, SessionEngine, SessionOutcome};
    pub use crate::error::{JournalError, PlanError};
    pub use crate::events::SessionEvent;
    pub use crate::journal::{CsvJournal, Journal, SessionRecord};
    pub use crate::notify::{Notifier, TerminalBell};
    pub use crate::plan::{Cue, PhaseSpec, SessionPlan};
    pub use crate::progress::{bar, format_clock, SessionTick};
}
