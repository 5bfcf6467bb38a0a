mod menu;
mod render;

use anyhow::{Context, Result};
use calmclock::catalog;
use calmclock::prelude::*;
use calmclock::{ENGINE_NAME, VERSION as LIB_VERSION};
use colored::Colorize;
use menu::Command;
use render::ProgressLine;
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::history::DefaultHistory;
use rustyline::Editor;
use rustyline_derive::{Completer, Helper, Hinter, Validator};
use std::borrow::Cow;
use std::cell::RefCell;
use std::env;
use std::sync::Arc;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const SHELL_VERSION: &str = env!("CARGO_PKG_VERSION");
const LOG_VIEW_LIMIT: usize = 20;

type CalmEditor = Editor<MyHighlighter, DefaultHistory>;

/// A custom helper struct for rustyline that highlights the command word.
#[derive(Completer, Helper, Hinter, Validator)]
struct MyHighlighter;

impl Highlighter for MyHighlighter {
    fn highlight<'l>(&self, line: &'l str, _pos: usize) -> Cow<'l, str> {
        if let Some((command, rest)) = line.split_once(' ') {
            Cow::Owned(format!("{} {}", command.green().bold(), rest.green()))
        } else {
            Cow::Owned(line.green().bold().to_string())
        }
    }

    fn highlight_char(&self, _line: &str, _pos: usize, _forced: bool) -> bool {
        true
    }
}

fn print_banner() {
    if env::var("QUIET_MODE").is_ok() {
        return;
    }
    // Embedded at compile time from the crate root.
    const LOGO_TEXT: &str = include_str!("../logo.log");
    println!("{}", LOGO_TEXT.cyan());

    let version_string = format!(
        "          Shell   v{:<8} Library   v{:<8}",
        SHELL_VERSION, LIB_VERSION
    );
    println!("{}", "-".repeat(60).dimmed());
    println!("{}", version_string);
    println!("{}", "-".repeat(60).dimmed());
}

/// Everything a session needs besides its plan.
struct Shell {
    config: CalmConfig,
    journal: CsvJournal,
    bell: Arc<TerminalBell>,
}

impl Shell {
    fn new(config: CalmConfig) -> Self {
        Self {
            journal: CsvJournal::new(&config.journal_path),
            bell: Arc::new(TerminalBell::new(config.bell.enabled)),
            config,
        }
    }

    /// Runs one plan from the first tick to the journal entry.
    async fn run(&self, rl: &mut CalmEditor, plan: SessionPlan, kind: Option<&SessionKind>) -> Result<()> {
        let phase_count = plan.phases().len();
        let engine = SessionEngine::new(plan, EngineOptions::from(&self.config));
        let listener = spawn_event_listener(&engine, self.bell.clone());

        let cancel = CancelFlag::new();
        let interrupt = cancel.cancel_on_ctrl_c();
        let progress = RefCell::new(ProgressLine::stdout());
        let mut phases_done = 0;
        let outcome = engine
            .start(
                |tick| {
                    if let Err(e) = progress.borrow_mut().draw(tick) {
                        debug!("Progress line not drawn: {}", e);
                    }
                },
                |label| {
                    progress.borrow_mut().clear().ok();
                    phases_done += 1;
                    // The last phase is announced by the session bell.
                    if phases_done < phase_count {
                        self.bell.phase_complete(label);
                    }
                },
                || cancel.is_cancelled(),
            )
            .await;
        interrupt.abort();
        listener.await.ok();
        progress.borrow_mut().clear().ok();

        println!();
        if outcome.is_completed() {
            println!("{}", render::centered(menu::closing_line(kind)).green());
        } else {
            println!("{}", render::centered("Session interrupted. Take care.").yellow());
        }

        let notes = ask(rl, "Notes (optional): ").unwrap_or_default();
        match self.journal.record(&outcome, notes.trim()) {
            Ok(record) => println!(
                "{}",
                format!("--> Logged {} min to {}", record.duration_min, self.journal.path().display()).dimmed()
            ),
            Err(e) => {
                warn!("Could not write the journal: {}", e);
                println!("{} {}", "Could not save this session:".red(), e);
            }
        }
        Ok(())
    }

    fn show_log(&self) -> Result<()> {
        if !self.journal.path().exists() {
            println!(
                "No log found yet. Your sessions will be saved to {}",
                self.journal.path().display()
            );
            return Ok(());
        }
        let records = self.journal.recent(LOG_VIEW_LIMIT)?;
        println!("{}", render::log_table(&records));
        Ok(())
    }

    fn show_presets(&self) {
        if self.config.presets.is_empty() {
            println!("No presets configured. Add [[presets]] to calm.toml.");
            return;
        }
        println!("Configured presets:");
        for preset in &self.config.presets {
            match catalog::preset(preset) {
                Ok(plan) => println!(
                    "  {:<12} {} ({})",
                    preset.name.yellow(),
                    plan.session_label(),
                    format_clock(plan.planned_total())
                ),
                Err(e) => println!("  {:<12} {}", preset.name.yellow(), format!("invalid: {e}").red()),
            }
        }
    }
}

/// Rings the session bell when a session finishes, off the session's own task.
fn spawn_event_listener(engine: &SessionEngine, bell: Arc<TerminalBell>) -> tokio::task::JoinHandle<()> {
    let mut events = engine.subscribe_events();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::SessionStarted { session_label, .. } => {
                    info!("[SESSION] => '{}' started", session_label);
                    bell.ring();
                }
                SessionEvent::SessionCompleted { outcome } => {
                    bell.session_complete(&outcome);
                    break;
                }
                SessionEvent::SessionCancelled { .. } => break,
                other => debug!("[SESSION] => {:?}", other),
            }
        }
    })
}

fn ask(rl: &mut CalmEditor, prompt: &str) -> Result<String> {
    let line = rl.readline(prompt)?;
    Ok(line)
}

#[tokio::main]
async fn main() -> Result<()> {
    print_banner();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_env("CALM_LOG").unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = CalmConfig::load().context("Could not load calm.toml")?;
    info!("{} ready; journal at {}", ENGINE_NAME, config.journal_path.display());
    let shell = Shell::new(config);

    let mut rl: CalmEditor = Editor::new()?;
    rl.set_helper(Some(MyHighlighter));

    println!("{}", render::centered("Calm CLI, a simple meditation app").cyan().bold());
    println!("{}", menu::HELP);

    loop {
        let prompt = format!("{}", "calm> ".cyan().bold());
        let line = match rl.readline(&prompt) {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        };
        rl.add_history_entry(line.as_str())?;

        let command = match menu::parse(&line) {
            Ok(command) => command,
            Err(e) => {
                println!("{}", e.to_string().red());
                continue;
            }
        };

        match &command {
            Command::Nothing => {}
            Command::Exit => break,
            Command::Help => println!("{}", menu::HELP),
            Command::Log => {
                if let Err(e) = shell.show_log() {
                    println!("{} {}", "Could not read the log:".red(), e);
                }
            }
            Command::Presets => shell.show_presets(),
            Command::Preset(name) => {
                let Some(preset) = shell.config.preset(name) else {
                    println!("No preset named '{}'. Type 'presets' to list them.", name);
                    continue;
                };
                match catalog::preset(preset) {
                    Ok(plan) => {
                        println!("{}", render::centered(plan.session_label()).bold());
                        shell.run(&mut rl, plan, None).await?;
                    }
                    Err(e) => println!("{} {}", "Preset is invalid:".red(), e),
                }
            }
            session => {
                let kind = menu::session_kind(session, &shell.config.defaults, |prompt| ask(&mut rl, prompt));
                let kind = match kind {
                    Ok(Some(kind)) => kind,
                    Ok(None) => continue,
                    Err(e) => {
                        println!("{} Returning to menu...", e.to_string().red());
                        continue;
                    }
                };
                match kind.plan() {
                    Ok(plan) => {
                        println!("{}", render::centered(&menu::opening_line(&kind)).bold());
                        shell.run(&mut rl, plan, Some(&kind)).await?;
                    }
                    Err(e) => println!("{} Returning to menu...", format!("Invalid session: {e}.").red()),
                }
            }
        }
    }

    println!("{}", render::centered("May you have a calm and peaceful day. Goodbye.").cyan());
    Ok(())
}
