//! Consolidated result table and per-class summary.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, Writer};

use crate::error::TootError;
use crate::stage::{CLASS_LABELS, Stage2Verdict};

/// Header of the consolidated result table.
pub const RESULT_HEADER: [&str; 14] = [
    "", "ID", "pred", "1", "2", "3", "4", "5", "6", "7", "8", "9", "10", "11",
];
/// Header of the summary table.
pub const SUMMARY_HEADER: [&str; 2] = ["Class", "Occurrence"];

const ID_COLUMN: &str = "ID";
const LABEL_COLUMN: &str = "pred";

/// Class counts for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateState {
    pub per_class_counts: HashMap<String, u64>,
    pub total_classified: u64,
}

impl AggregateState {
    pub fn add(&mut self, label: &str) {
        *self.per_class_counts.entry(label.to_string()).or_insert(0) += 1;
        self.total_classified += 1;
    }

    pub fn count(&self, label: &str) -> u64 {
        self.per_class_counts.get(label).copied().unwrap_or(0)
    }

    /// One `(label, count)` per canonical class, in canonical order, zeros included.
    pub fn summary_rows(&self) -> Vec<(&'static str, u64)> {
        CLASS_LABELS
            .iter()
            .map(|&label| (label, self.count(label)))
            .collect()
    }

    /// Total across the canonical classes.
    pub fn canonical_total(&self) -> u64 {
        self.summary_rows().iter().map(|(_, n)| n).sum()
    }

    /// Rebuilds counts from an existing consolidated result table.
    pub fn from_results(path: &Path) -> Result<Self, TootError> {
        let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
        let label_at = reader
            .headers()?
            .iter()
            .position(|h| h == LABEL_COLUMN)
            .ok_or_else(|| {
                TootError::Input(format!(
                    "{} has no {LABEL_COLUMN:?} column",
                    path.display()
                ))
            })?;

        let mut state = Self::default();
        for row in reader.records() {
            let row = row?;
            if let Some(label) = row.get(label_at) {
                state.add(label);
            }
        }
        Ok(state)
    }

    /// Writes the summary table: one row per canonical class, then `total`.
    pub fn write_summary(&self, path: &Path) -> Result<(), TootError> {
        let mut writer = Writer::from_path(path)?;
        writer.write_record(SUMMARY_HEADER)?;
        for (label, count) in self.summary_rows() {
            writer.write_record([label, count.to_string().as_str()])?;
        }
        writer.write_record(["total", self.canonical_total().to_string().as_str()])?;
        writer.flush()?;
        Ok(())
    }
}

/// Owns the consolidated result table for the duration of a run.
///
/// The header is written when the aggregator is created, so the table is
/// valid even if nothing is ever classified.
pub struct Aggregator {
    writer: Writer<File>,
    state: AggregateState,
}

impl Aggregator {
    pub fn create(results_path: impl Into<PathBuf>) -> Result<Self, TootError> {
        let mut writer = Writer::from_path(results_path.into())?;
        writer.write_record(RESULT_HEADER)?;
        writer.flush()?;
        Ok(Self {
            writer,
            state: AggregateState::default(),
        })
    }

    /// Appends the verdict's row and counts its label.
    pub fn record(&mut self, verdict: &Stage2Verdict) -> Result<(), TootError> {
        self.writer.write_record(verdict.to_row())?;
        self.writer.flush()?;
        self.state.add(&verdict.class_label);
        Ok(())
    }

    #[cfg(test)]
    pub fn state(&self) -> &AggregateState {
        &self.state
    }

    /// Writes the summary table and hands back the final counts.
    pub fn finalize(mut self, summary_path: &Path) -> Result<AggregateState, TootError> {
        self.writer.flush()?;
        self.state.write_summary(summary_path)?;
        Ok(self.state)
    }
}

/// Reads the `ID` column of a consolidated result table.
pub fn result_ids(path: &Path) -> Result<Vec<String>, TootError> {
    let mut reader = ReaderBuilder::new().flexible(true).from_path(path)?;
    let id_at = reader
        .headers()?
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| TootError::Input(format!("{} has no {ID_COLUMN:?} column", path.display())))?;

    let mut ids = Vec::new();
    for row in reader.records() {
        if let Some(id) = row?.get(id_at) {
            ids.push(id.to_string());
        }
    }
    Ok(ids)
}
