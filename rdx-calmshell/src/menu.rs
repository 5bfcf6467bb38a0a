//! Parses shell input into commands and fills in missing session settings.

use anyhow::{anyhow, bail, Context, Result};
use calmclock::config::SessionDefaults;
use calmclock::prelude::*;
use std::fmt::Display;
use std::str::FromStr;

/// One line of shell input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Guided(GuidedLength),
    Timer { minutes: Option<f64> },
    /// Cycles, inhale, hold and exhale, in that order. Missing ones are asked for.
    Box { values: Vec<u64> },
    Scan { minutes: Option<f64> },
    Log,
    Preset(String),
    Presets,
    Help,
    Exit,
    Nothing,
}

pub fn parse(line: &str) -> Result<Command> {
    let args = line.split_whitespace().collect::<Vec<_>>();
    let Some((command, rest)) = args.split_first() else {
        return Ok(Command::Nothing);
    };

    let command = match command.to_ascii_lowercase().as_str() {
        "1" => Command::Guided(GuidedLength::Five),
        "2" => Command::Guided(GuidedLength::Ten),
        "3" => Command::Guided(GuidedLength::Fifteen),
        "guided" => {
            let minutes = rest.first().context("Usage: guided <5|10|15>")?;
            let minutes: u32 = number(minutes)?;
            let length = GuidedLength::from_minutes(minutes)
                .ok_or_else(|| anyhow!("There is no {minutes}-minute guided session. Choose 5, 10 or 15."))?;
            Command::Guided(length)
        }
        "4" | "timer" => Command::Timer {
            minutes: rest.first().map(|m| number(m)).transpose()?,
        },
        "5" | "box" => {
            if rest.len() > 4 {
                bail!("Usage: box [CYCLES INHALE HOLD EXHALE]");
            }
            Command::Box {
                values: rest.iter().map(|v| number(v)).collect::<Result<_>>()?,
            }
        }
        "6" | "scan" => Command::Scan {
            minutes: rest.first().map(|m| number(m)).transpose()?,
        },
        "7" | "log" => Command::Log,
        "preset" => Command::Preset(rest.first().context("Usage: preset <NAME>")?.to_string()),
        "presets" => Command::Presets,
        "menu" | "help" => Command::Help,
        "0" | "exit" | "quit" => Command::Exit,
        _ => bail!("Unknown command: '{}'. Type 'help'.", line.trim()),
    };
    Ok(command)
}

/// Resolves a session command into a `SessionKind`, asking for anything the
/// command line left out. Returns `None` for commands that start no session.
pub fn session_kind<A>(command: &Command, defaults: &SessionDefaults, mut ask: A) -> Result<Option<SessionKind>>
where
    A: FnMut(&str) -> Result<String>,
{
    let kind = match command {
        Command::Guided(length) => SessionKind::Guided(*length),
        Command::Timer { minutes } => {
            let minutes = match minutes {
                Some(minutes) => *minutes,
                None => number(&ask("Enter duration in minutes (e.g., 7.5): ")?)?,
            };
            SessionKind::SilentTimer { minutes }
        }
        Command::Box { values } => {
            let base = BoxPattern::from(defaults);
            let fields = [
                ("Number of cycles", u64::from(base.cycles)),
                ("Inhale seconds", base.inhale_secs),
                ("Hold seconds", base.hold_secs),
                ("Exhale seconds", base.exhale_secs),
            ];
            let mut resolved = [0u64; 4];
            for (slot, (index, (prompt, default))) in resolved.iter_mut().zip(fields.into_iter().enumerate()) {
                *slot = match values.get(index) {
                    Some(value) => *value,
                    None => ask_or_default(&mut ask, prompt, default)?,
                };
            }
            let [cycles, inhale_secs, hold_secs, exhale_secs] = resolved;
            SessionKind::BoxBreathing(BoxPattern {
                cycles: u32::try_from(cycles).context("Too many cycles.")?,
                inhale_secs,
                hold_secs,
                exhale_secs,
            })
        }
        Command::Scan { minutes } => {
            let minutes = match minutes {
                Some(minutes) => *minutes,
                None => ask_or_default(&mut ask, "Duration minutes", defaults.body_scan_minutes)?,
            };
            SessionKind::BodyScan { minutes }
        }
        _ => return Ok(None),
    };
    Ok(Some(kind))
}

/// The line shown before a session starts.
pub fn opening_line(kind: &SessionKind) -> String {
    match kind {
        SessionKind::Guided(length) => format!("Guided meditation, {} minutes", length.minutes()),
        SessionKind::SilentTimer { minutes } => format!("Custom silent timer, {minutes} minutes"),
        SessionKind::BoxBreathing(p) => format!(
            "Cycles: {}, Pattern: Inhale {}s, Hold {}s, Exhale {}s, Hold {}s",
            p.cycles, p.inhale_secs, p.hold_secs, p.exhale_secs, p.hold_secs
        ),
        SessionKind::BodyScan { minutes } => format!("Body-scan, {minutes} minutes"),
    }
}

/// The line shown after a session runs to the end. Presets have no kind.
pub fn closing_line(kind: Option<&SessionKind>) -> &'static str {
    match kind {
        Some(SessionKind::Guided(_)) => "Session complete. Gently come back when ready.",
        Some(SessionKind::SilentTimer { .. }) => "Time's up. Well done.",
        Some(SessionKind::BoxBreathing(_)) => "Box breathing complete. Notice how you feel.",
        Some(SessionKind::BodyScan { .. }) => "Body scan complete. Slowly reconnect with the room.",
        None => "Session complete. Take this calm with you.",
    }
}

pub const HELP: &str = "\
Choose an option:
  1) guided 5            Guided, 5 minutes
  2) guided 10           Guided, 10 minutes
  3) guided 15           Guided, 15 minutes
  4) timer [MIN]         Custom silent timer
  5) box [C I H E]       Box breathing exercise
  6) scan [MIN]          Body-scan meditation (10 min default)
  7) log                 View session log
     presets             List configured presets
     preset <NAME>       Run a configured preset
     menu                Show this menu
  0) exit                Quit

Press Ctrl+C during a session to stop it early.";

fn ask_or_default<A, T>(ask: &mut A, prompt: &str, default: T) -> Result<T>
where
    A: FnMut(&str) -> Result<String>,
    T: FromStr + Display,
{
    let answer = ask(&format!("{prompt} (default {default}): "))?;
    if answer.trim().is_empty() {
        Ok(default)
    } else {
        number(&answer)
    }
}

fn number<T: FromStr>(text: &str) -> Result<T> {
    let text = text.trim();
    text.parse()
        .map_err(|_| anyhow!("'{}' is not a valid number.", text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    fn answers(lines: &[&str]) -> impl FnMut(&str) -> Result<String> {
        let mut queue: VecDeque<String> = lines.iter().map(|l| l.to_string()).collect();
        move |_prompt: &str| queue.pop_front().context("unexpected prompt")
    }

    #[test]
    fn menu_numbers_and_words_are_equivalent() {
        assert_eq!(parse("1").unwrap(), Command::Guided(GuidedLength::Five));
        assert_eq!(parse("guided 15").unwrap(), Command::Guided(GuidedLength::Fifteen));
        assert_eq!(parse("  ").unwrap(), Command::Nothing);
        assert_eq!(parse("EXIT").unwrap(), Command::Exit);
        assert_eq!(parse("0").unwrap(), Command::Exit);
        assert_eq!(parse("timer 7.5").unwrap(), Command::Timer { minutes: Some(7.5) });
        assert_eq!(parse("4").unwrap(), Command::Timer { minutes: None });
        assert_eq!(parse("box 6 4").unwrap(), Command::Box { values: vec![6, 4] });
        assert_eq!(parse("preset quick").unwrap(), Command::Preset("quick".into()));
    }

    #[test]
    fn malformed_input_is_rejected() {
        assert!(parse("guided 7").is_err());
        assert!(parse("guided").is_err());
        assert!(parse("timer soon").is_err());
        assert!(parse("box 1 2 3 4 5").is_err());
        assert!(parse("preset").is_err());
        assert!(parse("dance").is_err());
    }

    #[test]
    fn missing_box_values_are_asked_for_with_defaults() {
        let defaults = SessionDefaults::default();
        let kind = session_kind(&Command::Box { values: vec![2] }, &defaults, answers(&["5", "", "6"]))
            .unwrap()
            .unwrap();
        assert_eq!(
            kind,
            SessionKind::BoxBreathing(BoxPattern {
                cycles: 2,
                inhale_secs: 5,
                hold_secs: 4,
                exhale_secs: 6,
            })
        );
    }

    #[test]
    fn scan_defaults_and_timer_prompts() {
        let defaults = SessionDefaults::default();
        let scan = session_kind(&Command::Scan { minutes: None }, &defaults, answers(&[""])).unwrap();
        assert_eq!(scan, Some(SessionKind::BodyScan { minutes: 10.0 }));

        let timer = session_kind(&Command::Timer { minutes: None }, &defaults, answers(&["2.5"])).unwrap();
        assert_eq!(timer, Some(SessionKind::SilentTimer { minutes: 2.5 }));

        assert!(session_kind(&Command::Timer { minutes: None }, &defaults, answers(&["x"])).is_err());
        assert_eq!(session_kind(&Command::Log, &defaults, answers(&[])).unwrap(), None);
    }

    #[test]
    fn box_pattern_is_described_with_both_holds() {
        let line = opening_line(&SessionKind::BoxBreathing(BoxPattern::from(&SessionDefaults::default())));
        assert_eq!(line, "Cycles: 4, Pattern: Inhale 4s, Hold 4s, Exhale 4s, Hold 4s");
        assert_eq!(closing_line(None), "Session complete. Take this calm with you.");
    }
}
