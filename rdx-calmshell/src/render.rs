//! Terminal rendering for live sessions and the journal view.

use calmclock::prelude::*;
use calmclock::progress::BAR_WIDTH;
use colored::Colorize;
use std::io::{self, Write};

/// Width used to center script lines.
const CENTER_WIDTH: usize = 60;

/// Draws a single self-overwriting progress line, printing cue text and
/// cycle headers on their own lines as they change.
pub struct ProgressLine<W: Write> {
    out: W,
    /// `(phase, repetition)` of the last header printed.
    last_repetition: Option<(usize, u32)>,
    /// `(phase, repetition, cue)` of the last cue printed.
    last_cue: Option<(usize, u32, usize)>,
}

impl ProgressLine<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ProgressLine<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_repetition: None,
            last_cue: None,
        }
    }

    pub fn draw(&mut self, tick: &SessionTick<'_>) -> io::Result<()> {
        let cyclic = tick.phase.repeat_count > 1;
        let repetition = (tick.phase_index, tick.repeat_index());

        if self.last_repetition != Some(repetition) {
            self.last_repetition = Some(repetition);
            if cyclic {
                self.clear()?;
                writeln!(self.out, "\n{}", format!("Cycle {}/{}", repetition.1, tick.phase.repeat_count).bold())?;
            } else if tick.phase_count > 1 {
                self.clear()?;
                writeln!(self.out)?;
            }
        }

        // Cyclic phases show their cue inline, on the progress line.
        if !cyclic {
            if let Some(cue) = tick.cue() {
                let key = (repetition.0, repetition.1, cue.index);
                if self.last_cue != Some(key) {
                    self.last_cue = Some(key);
                    self.clear()?;
                    writeln!(self.out, "{}", format!("{:^CENTER_WIDTH$}", cue.text).italic())?;
                }
            }
        }

        write!(self.out, "\r{}", status_line(tick).cyan())?;
        self.out.flush()
    }

    /// Blanks the progress line so the next output starts clean.
    pub fn clear(&mut self) -> io::Result<()> {
        write!(self.out, "\r{}\r", " ".repeat(80))?;
        self.out.flush()
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

/// The text of the progress line for one tick, without color.
pub fn status_line(tick: &SessionTick<'_>) -> String {
    let bar = bar(tick.interval_fraction(), BAR_WIDTH);
    match tick.cue() {
        Some(cue) if tick.phase.repeat_count > 1 => format!(
            "{:<8}: {:>2}  {} {} remaining",
            cue.text,
            whole_seconds(cue.remaining),
            bar,
            format_clock(tick.session_remaining())
        ),
        _ => format!("{}: {} {} remaining", tick.phase_label(), bar, format_clock(tick.remaining())),
    }
}

fn whole_seconds(duration: std::time::Duration) -> u64 {
    duration.as_secs() + u64::from(duration.subsec_nanos() > 0)
}

/// Centers `text` the way session banners are shown.
pub fn centered(text: &str) -> String {
    format!("{:^CENTER_WIDTH$}", text)
}

/// Formats journal records as a table, one line each.
pub fn log_table(records: &[SessionRecord]) -> String {
    let rule = "-".repeat(CENTER_WIDTH);
    let mut lines = vec![centered("Meditation Log"), rule.clone()];
    if records.is_empty() {
        lines.push("No sessions logged yet.".to_string());
    }
    for record in records {
        let kind: String = record.kind.chars().take(20).collect();
        let status = record.status.map_or_else(|| "-".to_string(), |s| s.to_string());
        lines.push(format!(
            "{:20} | {:20} | {:>5} min | {:9} | {}",
            record.timestamp, kind, record.duration_min, status, record.notes
        ));
    }
    lines.push(rule);
    lines.join("\n")
}
