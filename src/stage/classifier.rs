use std::path::Path;

use serde::{Deserialize, Serialize};

use super::StageKind;
use super::gate::ID_COLUMN;
use super::runner::StageOutcome;
use super::table::{ParseError, first_data_row};
use crate::error::{FailureKind, StageFailure};

/// Substrate classes TooT-SC can assign, in canonical order.
pub const CLASS_LABELS: [&str; 11] = [
    "Nonselective",
    "water",
    "inorganic cation",
    "inorganic anion",
    "organic anion",
    "organooxogyn",
    "amino acid and derivatives",
    "other Organonitrogen compound",
    "nucleotide",
    "Organic heterocyclic",
    "Miscellaneous",
];

const INDEX_COLUMN: usize = 0;
const LABEL_COLUMN: usize = 2;
const FIRST_SCORE_COLUMN: usize = 3;
const SCORE_COLUMNS: usize = CLASS_LABELS.len();

/// TooT-SC's verdict for one record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage2Verdict {
    /// Row index as written by the tool; carried into the consolidated table.
    pub index: String,
    pub record_id: String,
    pub class_label: String,
    pub per_class_scores: [f64; SCORE_COLUMNS],
    /// The scores exactly as the tool wrote them.
    pub score_text: Vec<String>,
}

impl Stage2Verdict {
    /// The verdict as a consolidated-table row: index, id, label, 11 scores.
    pub fn to_row(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(FIRST_SCORE_COLUMN + SCORE_COLUMNS);
        row.push(self.index.clone());
        row.push(self.record_id.clone());
        row.push(self.class_label.clone());
        row.extend(self.score_text.iter().cloned());
        row
    }
}

/// Interprets a TooT-SC run. There is no rejection path at this stage.
pub struct Stage2Classifier;

impl Stage2Classifier {
    pub fn evaluate(outcome: &StageOutcome) -> Result<Stage2Verdict, StageFailure> {
        let fail = |kind| StageFailure {
            stage: StageKind::Substrate,
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

    fn parse(table: &Path) -> Result<Stage2Verdict, ParseError> {
        let row = first_data_row(table, FIRST_SCORE_COLUMN + SCORE_COLUMNS)?;

        let class_label = row[LABEL_COLUMN].trim().to_string();
        if !CLASS_LABELS.contains(&class_label.as_str()) {
            return Err(ParseError::UnknownLabel(class_label));
        }

        let mut per_class_scores = [0.0; SCORE_COLUMNS];
        let mut score_text = Vec::with_capacity(SCORE_COLUMNS);
        for (i, score) in per_class_scores.iter_mut().enumerate() {
            let column = FIRST_SCORE_COLUMN + i;
            let value = row[column].trim();
            *score = value.parse().map_err(|_| ParseError::InvalidScore {
                column,
                value: value.to_string(),
            })?;
            score_text.push(value.to_string());
        }

        Ok(Stage2Verdict {
            index: row[INDEX_COLUMN].to_string(),
            record_id: row[ID_COLUMN].to_string(),
            class_label,
            per_class_scores,
            score_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const HEADER: &str = "\"\",\"UniProtID\",\"pred\",\"1\",\"2\",\"3\",\"4\",\"5\",\"6\",\"7\",\"8\",\"9\",\"10\",\"11\"\n";

    fn outcome(exit_code: Option<i32>, table: Option<PathBuf>) -> StageOutcome {
        StageOutcome {
            stage: StageKind::Substrate,
            record_id: "Q9".into(),
            exit_code,
            result_table: table,
        }
    }

    fn table(dir: &TempDir, row: &str) -> PathBuf {
        let path = dir.path().join("TooTSCout.csv");
        fs::write(&path, format!("{HEADER}{row}\n")).unwrap();
        path
    }

    #[test]
    fn parses_label_and_scores() {
        let tmp = TempDir::new().unwrap();
        let path = table(
            &tmp,
            "\"1\",\"Q9\",\"water\",0.01,0.9,0,0,0,0,0,0,0,0.05,0.04",
        );
        let verdict = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap();

        assert_eq!(verdict.index, "1");
        assert_eq!(verdict.record_id, "Q9");
        assert_eq!(verdict.class_label, "water");
        assert_eq!(verdict.per_class_scores[1], 0.9);
        assert_eq!(verdict.per_class_scores[10], 0.04);
    }

    #[test]
    fn multi_word_labels_are_accepted() {
        let tmp = TempDir::new().unwrap();
        let path = table(
            &tmp,
            "1,Q9,amino acid and derivatives,0,0,0,0,0,0,1,0,0,0,0",
        );
        let verdict = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap();
        assert_eq!(verdict.class_label, "amino acid and derivatives");
    }

    #[test]
    fn row_round_trips_into_consolidated_shape() {
        let verdict = Stage2Verdict {
            index: "1".into(),
            record_id: "Q9".into(),
            class_label: "nucleotide".into(),
            per_class_scores: [0.5; SCORE_COLUMNS],
            score_text: vec!["0.5".to_string(); SCORE_COLUMNS],
        };
        let row = verdict.to_row();
        assert_eq!(row.len(), 14);
        assert_eq!(row[1], "Q9");
        assert_eq!(row[2], "nucleotide");
        assert_eq!(row[13], "0.5");
    }

    #[test]
    fn row_keeps_scores_as_the_tool_wrote_them() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, "1,Q9,water,1e-05,0.10,0,0,0,0,0,0,0,0,0.9");
        let verdict = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap();

        assert_eq!(verdict.per_class_scores[0], 0.00001);
        let row = verdict.to_row();
        assert_eq!(row[3], "1e-05");
        assert_eq!(row[4], "0.10");
        assert_eq!(row[13], "0.9");
    }

    #[test]
    fn nonzero_exit_fails() {
        let failure = Stage2Classifier::evaluate(&outcome(Some(1), None)).unwrap_err();
        assert_eq!(failure.stage, StageKind::Substrate);
        assert_eq!(failure.kind, FailureKind::Exit(1));
    }

    #[test]
    fn too_few_score_columns_is_a_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, "1,Q9,water,0.1,0.9");
        let failure = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Parse(ref m) if m.contains("14")));
    }

    #[test]
    fn non_numeric_score_is_a_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, "1,Q9,water,0,x,0,0,0,0,0,0,0,0,0");
        let failure = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Parse(ref m) if m.contains("column 4")));
    }

    #[test]
    fn unknown_label_is_a_parse_failure() {
        let tmp = TempDir::new().unwrap();
        let path = table(&tmp, "1,Q9,sugar,0,0,0,0,0,0,0,0,0,0,0");
        let failure = Stage2Classifier::evaluate(&outcome(Some(0), Some(path))).unwrap_err();
        assert!(matches!(failure.kind, FailureKind::Parse(ref m) if m.contains("sugar")));
    }
}
