//! Defines all configuration structures for Calmclock.
//!
//! These structs are designed to be deserialized from a configuration file
//! (a TOML file) using `serde` and the `config` crate. Tick speed, anomaly
//! tolerance, journal location, the bell, session defaults and extra preset
//! plans can all be set without touching application code.

use anyhow::Context;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable naming an explicit config file.
pub const CONFIG_PATH_ENV: &str = "CALM_CONFIG";

/// Base name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "calm";

/// The top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CalmConfig {
    /// How often running phases report progress.
    pub resolution: ClockResolution,

    /// Largest forward clock leap, beyond the expected wait, accepted as real.
    pub max_clock_jump_secs: u64,

    /// Where completed sessions are journaled.
    pub journal_path: PathBuf,

    pub bell: BellConfig,

    /// Values used when the menu leaves a parameter blank.
    pub defaults: SessionDefaults,

    /// Additional named plans selectable from the shell.
    pub presets: Vec<PlanConfig>,
}

/// Defines the tick cadence of a running phase.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockResolution {
    /// 10 ticks per second.
    High,
    /// 4 ticks per second.
    Medium,
    /// 1 tick per second.
    Low,
    /// A user-defined speed in ticks per second.
    Custom { ticks_per_second: u64 },
}

impl ClockResolution {
    pub fn tick_interval(&self) -> Duration {
        let ticks_per_second = match self {
            ClockResolution::High => 10,
            ClockResolution::Medium => 4,
            ClockResolution::Low => 1,
            ClockResolution::Custom { ticks_per_second } => (*ticks_per_second).clamp(1, 1_000),
        };
        Duration::from_secs(1) / ticks_per_second as u32
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BellConfig {
    pub enabled: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionDefaults {
    pub body_scan_minutes: f64,
    pub box_cycles: u32,
    pub box_inhale_secs: u64,
    pub box_hold_secs: u64,
    pub box_exhale_secs: u64,
}

/// A plan described in configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanConfig {
    /// Name typed in the shell to select the preset.
    pub name: String,
    /// Session label written to the journal.
    pub label: String,
    pub phases: Vec<PhaseConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhaseConfig {
    pub label: String,
    pub seconds: f64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    #[serde(default)]
    pub cues: Vec<CueConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CueConfig {
    /// Offset into the phase, in seconds.
    pub at: u64,
    pub text: String,
}

// --- Default value functions for serde ---

fn default_repeat() -> u32 {
    1
}

impl Default for CalmConfig {
    fn default() -> Self {
        Self {
            resolution: ClockResolution::Low,
            max_clock_jump_secs: 30,
            journal_path: PathBuf::from("meditation_log.csv"),
            bell: BellConfig::default(),
            defaults: SessionDefaults::default(),
            presets: Vec::new(),
        }
    }
}

impl Default for BellConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for SessionDefaults {
    fn default() -> Self {
        Self {
            body_scan_minutes: 10.0,
            box_cycles: 4,
            box_inhale_secs: 4,
            box_hold_secs: 4,
            box_exhale_secs: 4,
        }
    }
}

impl CalmConfig {
    pub fn tick_interval(&self) -> Duration {
        self.resolution.tick_interval()
    }

    pub fn max_clock_jump(&self) -> Duration {
        Duration::from_secs(self.max_clock_jump_secs)
    }

    pub fn preset(&self, name: &str) -> Option<&PlanConfig> {
        self.presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }

    /// Loads configuration from `$CALM_CONFIG`, or `calm.toml` when present,
    /// then applies `CALM_*` environment overrides (`__` separates sections).
    pub fn load() -> anyhow::Result<Self> {
        let file = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => config::File::with_name(&path).required(true),
            Err(_) => config::File::with_name(DEFAULT_CONFIG_NAME).required(false),
        };
        Self::load_from(file)
    }

    /// Loads configuration from a single TOML file plus environment overrides.
    pub fn load_file(path: &std::path::Path) -> anyhow::Result<Self> {
        Self::load_from(config::File::from(path).required(true))
    }

    fn load_from<F>(file: F) -> anyhow::Result<Self>
    where
        F: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("CALM")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()
            .context("Failed to read calm configuration")?
            .try_deserialize()
            .context("Failed to parse calm configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn resolution_maps_to_tick_interval() {
        assert_eq!(ClockResolution::Low.tick_interval(), Duration::from_secs(1));
        assert_eq!(ClockResolution::Medium.tick_interval(), Duration::from_millis(250));
        assert_eq!(ClockResolution::High.tick_interval(), Duration::from_millis(100));
        assert_eq!(
            ClockResolution::Custom { ticks_per_second: 0 }.tick_interval(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn defaults_follow_the_classic_menu() {
        let config = CalmConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.defaults.body_scan_minutes, 10.0);
        assert_eq!(config.defaults.box_cycles, 4);
        assert!(config.bell.enabled);
        assert_eq!(config.journal_path, PathBuf::from("meditation_log.csv"));
    }

    #[test]
    fn loads_a_toml_file_with_presets() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
resolution = "medium"
journal_path = "/tmp/calm.csv"

[bell]
enabled = false

[defaults]
box_cycles = 6

[[presets]]
name = "quick"
label = "Quick reset"

[[presets.phases]]
label = "breathe"
seconds = 8
repeat = 3

[[presets.phases.cues]]
at = 0
text = "In through the nose."
"#
        )
        .unwrap();

        let config = CalmConfig::load_file(file.path()).unwrap();
        assert_eq!(config.resolution, ClockResolution::Medium);
        assert!(!config.bell.enabled);
        assert_eq!(config.defaults.box_cycles, 6);
        assert_eq!(config.defaults.box_inhale_secs, 4);
        assert_eq!(config.max_clock_jump_secs, 30);

        let preset = config.preset("QUICK").unwrap();
        assert_eq!(preset.phases[0].repeat, 3);
        assert_eq!(preset.phases[0].cues[0].text, "In through the nose.");
    }
}
