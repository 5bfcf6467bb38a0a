//! Contains the building blocks that drive time forward inside a session.
//!
//! The `SessionEngine` owns a `PhaseRunner` and hands it one phase at a time.

pub mod runner;
