//! Batch report: what succeeded, what failed and where, and how much of the
//! timing is estimated.

use chess_core::{ClockAnomaly, MergeIntegrityWarning};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{PipelineError, Result};
use crate::store::write_atomically;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Malformed record, move or annotation. The game contributed nothing.
    Parse,
    /// Illegal move. The game contributed the plies before it.
    Apply,
    /// Unreadable input file. None of its games were seen.
    Io,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFailure {
    /// `None` for file-level failures.
    pub game_id: Option<String>,
    pub file: String,
    pub kind: FailureKind,
    pub ply: Option<usize>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyEntry {
    pub game_id: String,
    pub ply: usize,
    pub anomaly: ClockAnomaly,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub files_read: usize,
    pub files_failed: usize,
    pub games_succeeded: usize,
    pub games_failed: usize,
    /// Not started because the run was cancelled.
    pub games_skipped: usize,
    pub games_with_anomalies: usize,
    pub anomalous_plies: usize,
    pub positions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    PartialFailure,
    Fatal,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Success => 0,
            RunStatus::PartialFailure => 1,
            RunStatus::Fatal => 2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub summary: Summary,
    pub failures: Vec<GameFailure>,
    pub anomalies: Vec<AnomalyEntry>,
    pub integrity_warnings: Vec<MergeIntegrityWarning>,
}

impl BatchReport {
    pub fn status(&self) -> RunStatus {
        if self.summary.positions == 0 {
            RunStatus::Fatal
        } else if self.failures.is_empty() && self.summary.games_skipped == 0 {
            RunStatus::Success
        } else {
            RunStatus::PartialFailure
        }
    }

    pub fn record_failure(&mut self, failure: GameFailure) {
        match failure.game_id {
            Some(_) => self.summary.games_failed += 1,
            None => self.summary.files_failed += 1,
        }
        self.failures.push(failure);
    }

    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        write_atomically(path, |file| {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, self).map_err(|e| PipelineError::json(path, e))?;
            writer.flush().map_err(|e| PipelineError::io(path, e))
        })
    }

    /// Short human summary for stdout.
    pub fn summary_lines(&self) -> Vec<String> {
        let s = &self.summary;
        let mut lines = vec![
            format!("  Files read:       {} ({} failed)", s.files_read, s.files_failed),
            format!("  Games succeeded:  {}", s.games_succeeded),
            format!("  Games failed:     {}", s.games_failed),
            format!(
                "  Clock anomalies:  {} plies in {} games",
                s.anomalous_plies, s.games_with_anomalies
            ),
            format!("  Positions:        {}", s.positions),
        ];
        if s.games_skipped > 0 {
            lines.push(format!("  Games skipped:    {} (cancelled)", s.games_skipped));
        }
        if !self.integrity_warnings.is_empty() {
            lines.push(format!(
                "  Integrity warnings: {}",
                self.integrity_warnings.len()
            ));
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(game_id: Option<&str>, kind: FailureKind) -> GameFailure {
        GameFailure {
            game_id: game_id.map(str::to_string),
            file: "series.json".to_string(),
            kind,
            ply: None,
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_status_levels() {
        let mut report = BatchReport::default();
        assert_eq!(report.status(), RunStatus::Fatal);

        report.summary.positions = 10;
        assert_eq!(report.status(), RunStatus::Success);
        assert_eq!(report.status().exit_code(), 0);

        report.record_failure(failure(Some("g1"), FailureKind::Parse));
        assert_eq!(report.status(), RunStatus::PartialFailure);
        assert_eq!(report.status().exit_code(), 1);
    }

    #[test]
    fn test_record_failure_counts_files_and_games() {
        let mut report = BatchReport::default();
        report.record_failure(failure(None, FailureKind::Io));
        report.record_failure(failure(Some("g2"), FailureKind::Apply));
        assert_eq!(report.summary.files_failed, 1);
        assert_eq!(report.summary.games_failed, 1);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_written_report_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut report = BatchReport::default();
        report.summary.positions = 3;
        report.anomalies.push(AnomalyEntry {
            game_id: "g1".to_string(),
            ply: 4,
            anomaly: ClockAnomaly::MissingReading { estimate: 2.5 },
        });
        report.write(&path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"missing_reading\""));
        let back: BatchReport = serde_json::from_str(&text).unwrap();
        assert_eq!(back, report);
    }
}
