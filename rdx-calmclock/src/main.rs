use anyhow::Result;
use calmclock::notify::SilentNotifier;
use calmclock::prelude::*;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CALM_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // 2. A fast configuration so a full session fits in a few seconds.
    let config = CalmConfig {
        resolution: ClockResolution::Custom { ticks_per_second: 2 },
        ..CalmConfig::default()
    };

    // 3. A short demo plan: settle, then two quick breathing boxes.
    let plan = demo_plan()?;
    let engine = SessionEngine::new(plan, EngineOptions::from(&config));

    // 4. Spawn a task that logs the lifecycle event stream.
    let notifier = Arc::new(SilentNotifier::default());
    spawn_event_listener(&engine, notifier.clone());

    // 5. Run the session. Ctrl+C cancels it.
    let cancel = CancelFlag::new();
    let interrupt = cancel.cancel_on_ctrl_c();
    let outcome = engine
        .start(
            |tick| {
                println!(
                    "{} {} {} {}",
                    tick.phase_label().cyan(),
                    bar(tick.phase_fraction(), 20),
                    format_clock(tick.remaining()),
                    tick.cue().map(|c| c.text).unwrap_or_default().dimmed()
                );
            },
            |label| info!("[PHASE] => '{}' complete", label),
            || cancel.is_cancelled(),
        )
        .await;
    interrupt.abort();

    // Let the listener drain the final event.
    tokio::time::sleep(Duration::from_millis(50)).await;
    info!(
        "[OUTCOME] => {} after {:?} ({} phases, {} bells)",
        outcome.status,
        outcome.actual_elapsed_duration,
        outcome.completed_phase_count,
        notifier.phases() + notifier.sessions()
    );
    Ok(())
}

fn demo_plan() -> Result<SessionPlan, PlanError> {
    let settle = PhaseSpec::new("settle", Duration::from_secs(3))?
        .with_cues([Cue::at_secs(0, "Sit comfortably."), Cue::at_secs(2, "Close your eyes.")])?;
    let breathe = PhaseSpec::cyclic("breathe", Duration::from_secs(4), 2)?.with_cues([
        Cue::at_secs(0, "Inhale"),
        Cue::at_secs(1, "Hold"),
        Cue::at_secs(2, "Exhale"),
        Cue::at_secs(3, "Hold"),
    ])?;
    SessionPlan::new("Demo", vec![settle, breathe])
}

/// Spawns a task that logs every lifecycle event and forwards completions to the notifier.
fn spawn_event_listener(engine: &SessionEngine, notifier: Arc<SilentNotifier>) {
    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match &event {
                SessionEvent::PhaseCompleted { label, .. } => notifier.phase_complete(label),
                SessionEvent::SessionCompleted { outcome } => notifier.session_complete(outcome),
                _ => {}
            }
            info!("[SESSION] => {:?}", event);
        }
    });
}
