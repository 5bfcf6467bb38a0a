//! The session engine that sequences phases into one timed session.

use crate::common::SessionStatus;
use crate::components::runner::{PhaseRunner, PhaseTick};
use crate::config::CalmConfig;
use crate::events::SessionEvent;
use crate::plan::SessionPlan;
use crate::progress::SessionTick;
use crate::time::{ClockSource, SystemClock};
use chrono::{DateTime, Local};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// Timing options for an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    pub tick_interval: Duration,
    pub max_clock_jump: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            max_clock_jump: Duration::from_secs(30),
        }
    }
}

impl From<&CalmConfig> for EngineOptions {
    fn from(config: &CalmConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
            max_clock_jump: config.max_clock_jump(),
        }
    }
}

/// A snapshot of a running session, as seen from one tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunState {
    pub current_phase_index: usize,
    /// 1-based repetition of the current phase.
    pub current_repeat_index: u32,
    pub elapsed_in_phase: Duration,
    pub total_elapsed: Duration,
    pub status: SessionStatus,
}

/// The finalized record of what happened during a session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOutcome {
    pub session_label: String,
    /// Wall-clock start, for journaling only.
    pub started_at: DateTime<Local>,
    pub planned_total_duration: Duration,
    pub actual_elapsed_duration: Duration,
    pub status: SessionStatus,
    /// Phases that ran every repetition.
    pub completed_phase_count: usize,
    /// Repetitions finished across all phases.
    pub completed_repetitions: u32,
    pub clock_anomalies: usize,
}

impl SessionOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == SessionStatus::Completed
    }
}

/// An out-of-band cancellation signal for a running session.
///
/// Clones share one flag. The engine only ever sees `is_cancelled`.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Spawns a task that sets the flag on Ctrl+C.
    ///
    /// Abort the returned handle once the session is over so a later Ctrl+C
    /// reaches the shell instead.
    pub fn cancel_on_ctrl_c(&self) -> JoinHandle<()> {
        let flag = self.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => {
                    info!("Interrupt received; cancelling session.");
                    flag.cancel();
                }
                Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
            }
        })
    }
}

/// Runs one `SessionPlan` in real time.
///
/// An engine is single-use: `start` consumes it. Subscribe to its events
/// before starting, the same way as any broadcast channel.
pub struct SessionEngine {
    plan: Arc<SessionPlan>,
    runner: PhaseRunner,
    event_sender: broadcast::Sender<SessionEvent>,
}

impl SessionEngine {
    /// Creates an engine measuring time with the default `SystemClock`.
    pub fn new(plan: impl Into<Arc<SessionPlan>>, options: EngineOptions) -> Self {
        Self::with_clock(plan, options, Arc::new(SystemClock::new()))
    }

    /// Creates an engine measuring time with the given clock source.
    pub fn with_clock(
        plan: impl Into<Arc<SessionPlan>>,
        options: EngineOptions,
        clock: Arc<dyn ClockSource>,
    ) -> Self {
        const CHANNEL_CAPACITY: usize = 64;
        let (event_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            plan: plan.into(),
            runner: PhaseRunner::new(clock, options.tick_interval, options.max_clock_jump),
            event_sender,
        }
    }

    pub fn plan(&self) -> &SessionPlan {
        &self.plan
    }

    /// Subscribes to the `SessionEvent` stream.
    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_sender.subscribe()
    }

    /// Runs the session to completion or cancellation.
    ///
    /// `on_tick` receives progress at the tick cadence; `SessionTick::run_state`
    /// gives the live session state. `on_phase_complete`
    /// receives the label of each phase that finishes naturally.
    /// `is_cancelled` is polled at every tick boundary; once it returns
    /// `true` the current phase stops and no further phases run.
    pub async fn start<T, P, C>(
        self,
        mut on_tick: T,
        mut on_phase_complete: P,
        is_cancelled: C,
    ) -> SessionOutcome
    where
        T: FnMut(&SessionTick<'_>),
        P: FnMut(&str),
        C: Fn() -> bool,
    {
        let Self {
            plan,
            mut runner,
            event_sender,
        } = self;
        let started_at = Local::now();
        let phase_count = plan.phases().len();
        let planned_total = plan.planned_total();

        info!(
            session = plan.session_label(),
            planned = ?planned_total,
            phases = phase_count,
            "Session starting."
        );
        event_sender
            .send(SessionEvent::SessionStarted {
                session_label: plan.session_label().to_string(),
                planned_total,
            })
            .ok();

        let mut total_elapsed = Duration::ZERO;
        let mut status = SessionStatus::Running;
        let mut completed_phase_count = 0;
        let mut completed_repetitions = 0;
        let mut clock_anomalies = 0;

        for (index, phase) in plan.phases().iter().enumerate() {
            event_sender
                .send(SessionEvent::PhaseStarted {
                    index,
                    label: phase.label().to_string(),
                })
                .ok();

            let banked = total_elapsed;
            let result = runner
                .run(
                    phase,
                    |tick: &PhaseTick<'_>| {
                        on_tick(&SessionTick {
                            session_label: plan.session_label(),
                            phase_index: index,
                            phase_count,
                            phase: *tick,
                            session_elapsed: banked + tick.elapsed_in_phase(),
                            planned_total,
                        });
                    },
                    &is_cancelled,
                )
                .await;

            for anomaly in runner.take_anomalies() {
                clock_anomalies += 1;
                event_sender
                    .send(SessionEvent::ClockAnomaly {
                        phase_index: index,
                        anomaly,
                    })
                    .ok();
            }

            total_elapsed += result.elapsed_in_phase;
            completed_repetitions += result.completed_repetitions;

            if !result.completed {
                status = SessionStatus::Cancelled;
                break;
            }
            completed_phase_count += 1;
            debug!(phase = phase.label(), index, "Phase complete; notifying.");
            on_phase_complete(phase.label());
            event_sender
                .send(SessionEvent::PhaseCompleted {
                    index,
                    label: phase.label().to_string(),
                })
                .ok();
        }

        if status == SessionStatus::Running {
            status = SessionStatus::Completed;
        }

        let outcome = SessionOutcome {
            session_label: plan.session_label().to_string(),
            started_at,
            planned_total_duration: planned_total,
            actual_elapsed_duration: total_elapsed,
            status,
            completed_phase_count,
            completed_repetitions,
            clock_anomalies,
        };

        match outcome.status {
            SessionStatus::Cancelled => {
                debug_assert!(outcome.actual_elapsed_duration < planned_total);
                info!(
                    session = %outcome.session_label,
                    elapsed = ?outcome.actual_elapsed_duration,
                    "Session cancelled."
                );
                event_sender
                    .send(SessionEvent::SessionCancelled {
                        outcome: outcome.clone(),
                    })
                    .ok();
            }
            _ => {
                debug_assert_eq!(outcome.actual_elapsed_duration, planned_total);
                info!(
                    session = %outcome.session_label,
                    elapsed = ?outcome.actual_elapsed_duration,
                    "Session completed."
                );
                event_sender
                    .send(SessionEvent::SessionCompleted {
                        outcome: outcome.clone(),
                    })
                    .ok();
            }
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PhaseSpec;
    use crate::time::ManualClock;
    use std::cell::{Cell, RefCell};

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn plan(phases: &[(&str, u64, u32)]) -> SessionPlan {
        let phases = phases
            .iter()
            .map(|(label, s, r)| PhaseSpec::cyclic(*label, secs(*s), *r).unwrap())
            .collect();
        SessionPlan::new("test session", phases).unwrap()
    }

    /// Tokio time, nudged by hand to simulate a misbehaving clock.
    struct SkewedClock {
        base: SystemClock,
        ahead: ManualClock,
        behind: ManualClock,
    }

    impl ClockSource for SkewedClock {
        fn now(&self) -> Duration {
            (self.base.now() + self.ahead.now()).saturating_sub(self.behind.now())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn two_phases_complete_in_order() {
        let engine = SessionEngine::new(plan(&[("A", 5, 1), ("B", 5, 1)]), EngineOptions::default());
        let mut completed = Vec::new();
        let outcome = engine
            .start(|_| {}, |label| completed.push(label.to_string()), || false)
            .await;

        assert_eq!(completed, vec!["A", "B"]);
        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.actual_elapsed_duration, secs(10));
        assert_eq!(outcome.planned_total_duration, secs(10));
        assert_eq!(outcome.completed_phase_count, 2);
        assert_eq!(outcome.clock_anomalies, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_state_is_visible_while_running() {
        let engine = SessionEngine::new(plan(&[("A", 3, 1), ("B", 2, 2)]), EngineOptions::default());
        let mut states = Vec::new();
        engine.start(|t| states.push(t.run_state()), |_| {}, || false).await;

        assert!(states.iter().all(|s| s.status == SessionStatus::Running));
        assert!(states.windows(2).all(|w| w[0].total_elapsed <= w[1].total_elapsed));
        let last = states.last().unwrap();
        assert_eq!(last.current_phase_index, 1);
        assert_eq!(last.current_repeat_index, 2);
        assert_eq!(last.elapsed_in_phase, secs(4));
        assert_eq!(last.total_elapsed, secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_phases_report_every_repetition() {
        let engine = SessionEngine::new(
            plan(&[("inhale", 4, 4), ("hold", 4, 4), ("exhale", 4, 4)]),
            EngineOptions::default(),
        );
        let repeats = RefCell::new(Vec::<(usize, u32)>::new());
        let outcome = engine
            .start(
                |t| {
                    let mut repeats = repeats.borrow_mut();
                    if repeats.last() != Some(&(t.phase_index, t.repeat_index())) {
                        repeats.push((t.phase_index, t.repeat_index()));
                    }
                },
                |_| {},
                || false,
            )
            .await;

        assert_eq!(outcome.actual_elapsed_duration, secs(48));
        assert_eq!(outcome.completed_repetitions, 12);
        let expected: Vec<(usize, u32)> = (0..3).flat_map(|p| (1..=4).map(move |r| (p, r))).collect();
        assert_eq!(repeats.into_inner(), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelling_during_the_second_repetition() {
        let engine = SessionEngine::new(plan(&[("box", 16, 4), ("rest", 30, 1)]), EngineOptions::default());
        let repeat = Cell::new(1u32);
        let mut completed = Vec::new();
        let outcome = engine
            .start(
                |t| repeat.set(t.repeat_index()),
                |label| completed.push(label.to_string()),
                || repeat.get() == 2,
            )
            .await;

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.completed_phase_count, 0);
        assert_eq!(outcome.completed_repetitions, 1);
        assert!(completed.is_empty());
        assert!(outcome.actual_elapsed_duration >= secs(16));
        assert!(outcome.actual_elapsed_duration < secs(32));
        assert!(outcome.actual_elapsed_duration < outcome.planned_total_duration);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_later_phases() {
        let engine = SessionEngine::new(plan(&[("A", 3, 1), ("B", 3, 1), ("C", 3, 1)]), EngineOptions::default());
        let phase = Cell::new(0usize);
        let mut completed = Vec::new();
        let outcome = engine
            .start(
                |t| phase.set(t.phase_index),
                |label| completed.push(label.to_string()),
                || phase.get() == 1,
            )
            .await;

        assert_eq!(completed, vec!["A"]);
        assert_eq!(outcome.completed_phase_count, 1);
        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.actual_elapsed_duration, secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn fractions_are_monotonic_and_bounded() {
        let engine = SessionEngine::new(
            plan(&[("settle", 3, 1), ("breathe", 2, 3)]),
            EngineOptions {
                tick_interval: Duration::from_millis(700),
                ..EngineOptions::default()
            },
        );
        let samples = RefCell::new(Vec::new());
        engine
            .start(
                |t| {
                    samples
                        .borrow_mut()
                        .push((t.phase_index, t.phase_fraction(), t.session_fraction()))
                },
                |_| {},
                || false,
            )
            .await;

        let samples = samples.into_inner();
        for pair in samples.windows(2) {
            let ((pa, fa, sa), (pb, fb, sb)) = (pair[0], pair[1]);
            assert!(sa <= sb);
            if pa == pb {
                assert!(fa <= fb);
            }
        }
        assert!(samples
            .iter()
            .all(|(_, f, s)| (0.0..=1.0).contains(f) && (0.0..=1.0).contains(s)));
        assert_eq!(samples.last().unwrap().2, 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn fresh_engines_run_independently() {
        let shared = Arc::new(plan(&[("A", 2, 1)]));
        let first = SessionEngine::new(shared.clone(), EngineOptions::default());
        let second = SessionEngine::new(shared, EngineOptions::default());

        let ticks = Cell::new(0);
        let cancelled = first
            .start(|_| ticks.set(ticks.get() + 1), |_| {}, || ticks.get() >= 1)
            .await;
        let completed = second.start(|_| {}, |_| {}, || false).await;

        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert_eq!(completed.status, SessionStatus::Completed);
        assert_eq!(completed.actual_elapsed_duration, secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn broadcasts_lifecycle_events_once() {
        let engine = SessionEngine::new(plan(&[("A", 1, 1), ("B", 1, 2)]), EngineOptions::default());
        let mut events = engine.subscribe_events();
        let outcome = engine.start(|_| {}, |_| {}, || false).await;

        let mut received = Vec::new();
        while let Ok(event) = events.try_recv() {
            received.push(event);
        }
        assert!(matches!(received.first(), Some(SessionEvent::SessionStarted { .. })));
        let phase_completions = received
            .iter()
            .filter(|e| matches!(e, SessionEvent::PhaseCompleted { .. }))
            .count();
        assert_eq!(phase_completions, 2);
        assert_eq!(received.iter().filter(|e| e.is_terminal()).count(), 1);
        match received.last() {
            Some(SessionEvent::SessionCompleted { outcome: sent }) => assert_eq!(*sent, outcome),
            other => panic!("Expected SessionCompleted, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn clock_anomalies_are_absorbed_and_counted() {
        let ahead = ManualClock::new();
        let behind = ManualClock::new();
        let clock = Arc::new(SkewedClock {
            base: SystemClock::new(),
            ahead: ahead.clone(),
            behind: behind.clone(),
        });
        let engine = SessionEngine::with_clock(plan(&[("sit", 20, 1)]), EngineOptions::default(), clock);
        let mut events = engine.subscribe_events();

        let mut remaining = Vec::new();
        let outcome = engine
            .start(
                |t| {
                    remaining.push(t.remaining());
                    match t.session_elapsed.as_secs() {
                        5 => behind.set(secs(4)),
                        12 => ahead.set(secs(3_600)),
                        _ => {}
                    }
                },
                |_| {},
                || false,
            )
            .await;

        assert_eq!(outcome.status, SessionStatus::Completed);
        assert_eq!(outcome.actual_elapsed_duration, secs(20));
        assert_eq!(outcome.clock_anomalies, 2);
        assert!(remaining.windows(2).all(|w| w[0] >= w[1]));
        assert_eq!(remaining.len(), 21);

        let anomalies = std::iter::from_fn(|| events.try_recv().ok())
            .filter(|e| matches!(e, SessionEvent::ClockAnomaly { .. }))
            .count();
        assert_eq!(anomalies, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_flag_stops_a_running_session() {
        let flag = CancelFlag::new();
        let remote = flag.clone();
        let engine = SessionEngine::new(plan(&[("sit", 60, 1)]), EngineOptions::default());
        let outcome = engine
            .start(
                |t| {
                    if t.session_elapsed == secs(3) {
                        remote.cancel();
                    }
                },
                |_| {},
                || flag.is_cancelled(),
            )
            .await;

        assert_eq!(outcome.status, SessionStatus::Cancelled);
        assert_eq!(outcome.actual_elapsed_duration, secs(4));
    }

    #[test]
    fn options_follow_config() {
        let config = CalmConfig::default();
        let options = EngineOptions::from(&config);
        assert_eq!(options, EngineOptions::default());
    }
}
