use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::RecordState;
use crate::error::StageFailure;

/// Terminal bucket a record lands in. Exactly one per processed record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordOutcome {
    Classified(String),
    Rejected,
    Stage1Failed,
    Stage2Failed,
}

impl std::fmt::Display for RecordOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordOutcome::Classified(label) => write!(f, "classified as {label}"),
            RecordOutcome::Rejected => write!(f, "not a transporter"),
            RecordOutcome::Stage1Failed => write!(f, "TooT-T failed"),
            RecordOutcome::Stage2Failed => write!(f, "TooT-SC failed"),
        }
    }
}

/// Progress of one record through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordTrack {
    pub record_id: String,
    pub state: RecordState,
    pub state_history: Vec<RecordState>,
    pub outcome: Option<RecordOutcome>,
    pub failure: Option<StageFailure>,
    pub started_at: DateTime<Utc>,
}

impl RecordTrack {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            state: RecordState::Isolated,
            state_history: Vec::new(),
            outcome: None,
            failure: None,
            started_at: Utc::now(),
        }
    }
}

/// Per-record line of the run report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordAudit {
    pub record_id: String,
    pub outcome: Option<RecordOutcome>,
    pub state_transitions: Vec<RecordState>,
    pub failure: Option<String>,
    pub duration_ms: i64,
}

impl RecordAudit {
    pub fn from_track(track: &RecordTrack) -> Self {
        let mut transitions = track.state_history.clone();
        transitions.push(track.state);
        Self {
            record_id: track.record_id.clone(),
            outcome: track.outcome.clone(),
            state_transitions: transitions,
            failure: track.failure.as_ref().map(|f| f.kind.to_string()),
            duration_ms: (Utc::now() - track.started_at).num_milliseconds(),
        }
    }
}

/// Structured record of a whole run, written next to the result tables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub query: String,
    pub input_records: usize,
    pub classified: usize,
    pub rejected: usize,
    pub stage1_failed: usize,
    pub stage2_failed: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: i64,
    pub records: Vec<RecordAudit>,
}

impl RunReport {
    pub fn start(query: &Path, input_records: usize) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            query: query.display().to_string(),
            input_records,
            classified: 0,
            rejected: 0,
            stage1_failed: 0,
            stage2_failed: 0,
            cancelled: false,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: 0,
            records: Vec::new(),
        }
    }

    /// Counts a finished record into its bucket.
    pub fn push(&mut self, track: &RecordTrack) {
        match &track.outcome {
            Some(RecordOutcome::Classified(_)) => self.classified += 1,
            Some(RecordOutcome::Rejected) => self.rejected += 1,
            Some(RecordOutcome::Stage1Failed) => self.stage1_failed += 1,
            Some(RecordOutcome::Stage2Failed) => self.stage2_failed += 1,
            None => {}
        }
        self.records.push(RecordAudit::from_track(track));
    }

    /// Records processed into a terminal bucket so far.
    pub fn processed(&self) -> usize {
        self.classified + self.rejected + self.stage1_failed + self.stage2_failed
    }

    /// Every input record landed in exactly one bucket.
    pub fn is_balanced(&self) -> bool {
        self.processed() == self.input_records
    }

    pub fn finish(&mut self, cancelled: bool) {
        let now = Utc::now();
        self.cancelled = cancelled;
        self.completed_at = Some(now);
        self.duration_ms = (now - self.started_at).num_milliseconds();
    }

    pub fn write_json(&self, path: &Path) -> Result<(), crate::error::TootError> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::stage::StageKind;

    fn finished(id: &str, outcome: RecordOutcome) -> RecordTrack {
        let mut track = RecordTrack::new(id);
        track.outcome = Some(outcome);
        track
    }

    #[test]
    fn track_creation_defaults() {
        let track = RecordTrack::new("P1");
        assert_eq!(track.state, RecordState::Isolated);
        assert!(track.state_history.is_empty());
        assert!(track.outcome.is_none());
        assert!(track.failure.is_none());
    }

    #[test]
    fn report_counts_each_bucket() {
        let mut report = RunReport::start(Path::new("q.fasta"), 4);
        report.push(&finished("A", RecordOutcome::Rejected));
        report.push(&finished("B", RecordOutcome::Stage1Failed));
        report.push(&finished("C", RecordOutcome::Stage2Failed));
        assert!(!report.is_balanced());
        report.push(&finished("D", RecordOutcome::Classified("water".into())));

        assert_eq!(report.classified, 1);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.stage1_failed, 1);
        assert_eq!(report.stage2_failed, 1);
        assert!(report.is_balanced());
        assert_eq!(report.records.len(), 4);
    }

    #[test]
    fn audit_includes_current_state_and_failure() {
        let mut track = RecordTrack::new("B");
        track.state_history = vec![RecordState::Isolated];
        track.state = RecordState::Stage1Ran;
        track.failure = Some(StageFailure {
            stage: StageKind::Transporter,
            record_id: "B".into(),
            kind: FailureKind::Exit(2),
        });

        let audit = RecordAudit::from_track(&track);
        assert_eq!(
            audit.state_transitions,
            vec![RecordState::Isolated, RecordState::Stage1Ran]
        );
        assert_eq!(audit.failure.as_deref(), Some("exited with status 2"));
    }

    #[test]
    fn report_serialization_roundtrip() {
        let mut report = RunReport::start(Path::new("q.fasta"), 1);
        report.push(&finished("A", RecordOutcome::Classified("water".into())));
        report.finish(false);

        let json = serde_json::to_string(&report).unwrap();
        let back: RunReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back.run_id, report.run_id);
        assert_eq!(back.classified, 1);
        assert!(back.completed_at.is_some());
    }
}
