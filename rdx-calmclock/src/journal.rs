//! The session journal: one CSV row per finished session.
//!
//! Columns are `timestamp,type,duration_min,status,notes`. Journals written
//! before the `status` column existed are still read, and appended to in
//! their own four-column shape.

use crate::common::{minutes_rounded, SessionStatus};
use crate::engine::SessionOutcome;
use crate::error::JournalError;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::info;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One persisted session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    /// Local start time, `YYYY-MM-DD HH:MM:SS`.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub duration_min: f64,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub notes: String,
}

impl SessionRecord {
    pub fn from_outcome(outcome: &SessionOutcome, notes: &str) -> Self {
        Self {
            timestamp: outcome.started_at.format(TIMESTAMP_FORMAT).to_string(),
            kind: outcome.session_label.clone(),
            duration_min: minutes_rounded(outcome.actual_elapsed_duration),
            status: Some(outcome.status),
            notes: notes.to_string(),
        }
    }
}

#[derive(Serialize)]
struct LegacyRow<'a> {
    timestamp: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    duration_min: f64,
    notes: &'a str,
}

/// Where finished sessions are handed off.
pub trait Journal {
    fn record(&self, outcome: &SessionOutcome, notes: &str) -> Result<SessionRecord, JournalError>;

    /// The last `limit` records, oldest first.
    fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, JournalError>;
}

/// A journal kept in a CSV file.
#[derive(Debug, Clone)]
pub struct CsvJournal {
    path: PathBuf,
}

impl CsvJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn has_rows(&self) -> bool {
        std::fs::metadata(&self.path).map_or(false, |m| m.len() > 0)
    }

    /// `true` when the existing file uses the four-column layout.
    fn is_legacy(&self) -> Result<bool, JournalError> {
        let mut reader = csv::Reader::from_path(&self.path)?;
        Ok(!reader.headers()?.iter().any(|h| h == "status"))
    }
}

impl Journal for CsvJournal {
    fn record(&self, outcome: &SessionOutcome, notes: &str) -> Result<SessionRecord, JournalError> {
        let record = SessionRecord::from_outcome(outcome, notes);
        let existing = self.has_rows();
        let legacy = existing && self.is_legacy()?;

        let file: File = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| self.io_error(e))?;
        let mut writer = csv::WriterBuilder::new()
            .has_headers(!existing)
            .from_writer(file);
        if legacy {
            writer.serialize(LegacyRow {
                timestamp: &record.timestamp,
                kind: &record.kind,
                duration_min: record.duration_min,
                notes: &record.notes,
            })?;
        } else {
            writer.serialize(&record)?;
        }
        writer.flush().map_err(|e| self.io_error(e))?;

        info!(
            path = %self.path.display(),
            session = %record.kind,
            minutes = record.duration_min,
            "Session journaled."
        );
        Ok(record)
    }

    fn recent(&self, limit: usize) -> Result<Vec<SessionRecord>, JournalError> {
        if !self.has_rows() {
            return Ok(Vec::new());
        }
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_path(&self.path)?;
        let records = reader
            .deserialize::<SessionRecord>()
            .collect::<Result<Vec<_>, _>>()?;
        let skip = records.len().saturating_sub(limit);
        Ok(records.into_iter().skip(skip).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::time::Duration;

    fn outcome(label: &str, secs: u64, status: SessionStatus) -> SessionOutcome {
        SessionOutcome {
            session_label: label.to_string(),
            started_at: Local.with_ymd_and_hms(2026, 3, 14, 7, 30, 0).unwrap(),
            planned_total_duration: Duration::from_secs(600),
            actual_elapsed_duration: Duration::from_secs(secs),
            status,
            completed_phase_count: 1,
            completed_repetitions: 1,
            clock_anomalies: 0,
        }
    }

    #[test]
    fn record_rounds_minutes_and_formats_the_start() {
        let record = SessionRecord::from_outcome(&outcome("Box breathing", 64, SessionStatus::Completed), "");
        assert_eq!(record.timestamp, "2026-03-14 07:30:00");
        assert_eq!(record.duration_min, 1.1);
        assert_eq!(record.status, Some(SessionStatus::Completed));
    }

    #[test]
    fn appends_with_a_single_header_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let journal = CsvJournal::new(&path);
        assert!(journal.recent(20).unwrap().is_empty());

        journal
            .record(&outcome("Guided 5 min", 300, SessionStatus::Completed), "")
            .unwrap();
        journal
            .record(&outcome("Custom timer", 150, SessionStatus::Cancelled), "phone rang, again")
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches("timestamp,type,duration_min,status,notes").count(), 1);
        assert!(text.contains("\"phone rang, again\""));

        let records = journal.recent(20).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind, "Guided 5 min");
        assert_eq!(records[1].duration_min, 2.5);
        assert_eq!(records[1].status, Some(SessionStatus::Cancelled));
        assert_eq!(records[1].notes, "phone rang, again");
    }

    #[test]
    fn recent_keeps_only_the_newest() {
        let dir = tempfile::tempdir().unwrap();
        let journal = CsvJournal::new(dir.path().join("log.csv"));
        for minutes in 1..=5 {
            journal
                .record(&outcome("Custom timer", minutes * 60, SessionStatus::Completed), "")
                .unwrap();
        }
        let minutes: Vec<f64> = journal.recent(2).unwrap().iter().map(|r| r.duration_min).collect();
        assert_eq!(minutes, vec![4.0, 5.0]);
    }

    #[test]
    fn legacy_journals_keep_their_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("meditation_log.csv");
        std::fs::write(
            &path,
            "timestamp,type,duration_min,notes\n2025-01-02 08:00:00,Guided 5 min,5,\n",
        )
        .unwrap();
        let journal = CsvJournal::new(&path);

        journal
            .record(&outcome("Body-scan 10 min", 600, SessionStatus::Completed), "")
            .unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("Body-scan 10 min,10.0,\n"));

        let records = journal.recent(20).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, None);
        assert_eq!(records[1].duration_min, 10.0);
    }
}
