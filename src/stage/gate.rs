use serde::{Deserialize, Serialize};

use super::StageKind;
use super::runner::StageOutcome;
use super::table::{ParseError, first_data_row};
use crate::error::{FailureKind, StageFailure};

/// Column holding the record identifier in both tools' result tables.
pub(crate) const ID_COLUMN: usize = 1;
/// Column holding TooT-T's binary transporter flag.
const FLAG_COLUMN: usize = 2;

/// TooT-T's verdict for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stage1Verdict {
    pub record_id: String,
    pub is_transporter: bool,
}

/// Interprets a TooT-T run: pass, reject, or fail.
pub struct Stage1Gate;

impl Stage1Gate {
    /// A nonzero exit or an unreadable table is a [`StageFailure`].
    /// A readable table with flag `0` is a verdict, not a failure.
    pub fn evaluate(outcome: &StageOutcome) -> Result<Stage1Verdict, StageFailure> {
        let fail = |kind| StageFailure {
            stage: StageKind::Transporter,
            record_id: outcome.record_id.clone(),
            kind,
        };

        match outcome.exit_code {
            Some(0) => {}
            Some(code) => return Err(fail(FailureKind::Exit(code))),
            None => return Err(fail(FailureKind::Signal)),
        }

        let table = outcome
            .result_table
            .as_deref()
            .ok_or_else(|| fail(FailureKind::Parse("no result table declared".into())))?;

        Self::parse(table).map_err(|e| fail(FailureKind::Parse(e.to_string())))
    }

    fn parse(table: &std::path::Path) -> Result<Stage1Verdict, ParseError> {
        let row = first_data_row(table, FLAG_COLUMN + 1)?;
        let is_transporter = match row[FLAG_COLUMN].trim() {
            "1" => true,
            "0" => false,
            other => return Err(ParseError::InvalidFlag(other.to_string())),
        };
        Ok(Stage1Verdict {
            record_id: row[ID_COLUMN].to_string(),
            is_transporter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn outcome(exit_code: Option<i32>, table: Option<PathBuf>) -> StageOutcome {
        StageOutcome {
            stage: StageKind::Transporter,
            record_id: "P1".into(),
            exit_code,
            result_table: table,
        }
    }

    fn table(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("TooTTout.csv");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn flag_one_passes() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, "\"\",\"UniProtID\",\"pred\"\n\"1\",\"P1\",\"1\"\n");
        let verdict = Stage1Gate::evaluate(&outcome(Some(0), Some(path))).unwrap();
        assert_eq!(
            verdict,
            Stage1Verdict {
                record_id: "P1".into(),
                is_transporter: true
            }
        );
    }

    #[test]
    fn flag_zero_is_a_rejection_not_a_failure() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, ",UniProtID,pred\n1,P1,0\n");
        let verdict = Stage1Gate::evaluate(&outcome(Some(0), Some(path))).unwrap();
        assert!(!verdict.is_transporter);
    }

    #[test]
    fn nonzero_exit_fails_without_reading_table() {
        let failure = Stage1Gate::evaluate(&outcome(Some(1), None)).unwrap_err();
        assert_eq!(failure.stage, StageKind::Transporter);
        assert_eq!(failure.record_id, "P1");
        assert_eq!(failure.kind, FailureKind::Exit(1));
    }

    #[test]
    fn signal_death_fails() {
        let failure = Stage1Gate::evaluate(&outcome(None, None)).unwrap_err();
        assert_eq!(failure.kind, FailureKind::Signal);
    }

    #[test]
    fn garbage_flag_is_a_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, ",UniProtID,pred\n1,P1,maybe\n");
        let failure = Stage1Gate::evaluate(&outcome(Some(0), Some(path))).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Parse(ref m) if m.contains("maybe")));
    }

    #[test]
    fn missing_table_is_a_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("TooTTout.csv");
        let failure = Stage1Gate::evaluate(&outcome(Some(0), Some(path))).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Parse(_)));
    }
}
