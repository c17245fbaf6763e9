use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::TootError;
use crate::stage::StageKind;
use crate::workspace::remove_if_exists;

/// Append-only audit trail of records that failed, one file per stage.
///
/// Each id is written and flushed as soon as the failure happens, so the
/// ledger survives a crash mid-batch.
#[derive(Debug, Clone)]
pub struct FailureLedger {
    dir: PathBuf,
}

impl FailureLedger {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self, stage: StageKind) -> PathBuf {
        self.dir.join(stage.ledger_file())
    }

    /// Deletes ledgers left by an earlier run.
    pub fn reset(&self) -> Result<(), TootError> {
        for stage in [StageKind::Transporter, StageKind::Substrate] {
            let path = self.path(stage);
            remove_if_exists(&path).map_err(|e| TootError::workspace(path, e))?;
        }
        Ok(())
    }

    pub fn record(&self, stage: StageKind, record_id: &str) -> Result<(), TootError> {
        let path = self.path(stage);
        append_line(&path, record_id).map_err(|e| TootError::workspace(path, e))
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{line}")?;
    file.flush()
}
