//! Per-record isolation under the pipeline work directory.
//!
//! Layout under the user's work root `W`:
//!
//! ```text
//! W/work/TooT-P/<id>/<id>.fasta   record input, logs, stage result tables
//! W/work/TooT-T/<id>/             TooT-T's own intermediate state
//! W/work/TooT-SC/<id>/            TooT-SC's own intermediate state
//! ```
//!
//! The external tools pick the `TooT-T`/`TooT-SC` paths themselves; this module is
//! the only place that knows about them.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::TootError;
use crate::sequence::SequenceRecord;
use crate::stage::StageKind;

/// Directory under the work root shared by all tools.
const SHARED_DIR: &str = "work";
/// This pipeline's own directory under [`SHARED_DIR`].
const PIPELINE_DIR: &str = "TooT-P";

/// One record's isolated workspace. Owned by a single pipeline iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub record_id: String,
    pub dir: PathBuf,
    pub input_file: PathBuf,
}

/// Allocates and tears down per-record workspaces.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    work_root: PathBuf,
}

impl WorkspaceManager {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
        }
    }

    /// `W/work/TooT-P`, parent of every workspace and of the failure ledgers.
    pub fn pipeline_dir(&self) -> PathBuf {
        self.work_root.join(SHARED_DIR).join(PIPELINE_DIR)
    }

    /// Where `stage` keeps intermediate state for `record_id`.
    pub fn shared_dir(&self, stage: StageKind, record_id: &str) -> PathBuf {
        self.work_root
            .join(SHARED_DIR)
            .join(stage.tool_name())
            .join(record_id)
    }

    /// Creates the pipeline directory if needed.
    pub fn prepare(&self) -> Result<PathBuf, TootError> {
        let dir = self.pipeline_dir();
        fs::create_dir_all(&dir).map_err(|e| TootError::workspace(&dir, e))?;
        Ok(dir)
    }

    /// Gives `record` a fresh, empty workspace holding only its single-record FASTA.
    ///
    /// A stale directory from an earlier run is removed first.
    pub fn isolate(&self, record: &SequenceRecord) -> Result<WorkItem, TootError> {
        let id = record.id();
        let dir = self.pipeline_dir().join(id);

        if dir.exists() {
            debug!(record = id, "removing stale workspace");
            fs::remove_dir_all(&dir).map_err(|e| TootError::workspace(&dir, e))?;
        }
        fs::create_dir_all(&dir).map_err(|e| TootError::workspace(&dir, e))?;

        let input_file = dir.join(format!("{id}.fasta"));
        record
            .write_fasta(&input_file)
            .map_err(|e| TootError::workspace(&input_file, e))?;

        Ok(WorkItem {
            record_id: id.to_string(),
            dir,
            input_file,
        })
    }

    /// Drops `stage`'s intermediate state for `record_id` once its verdict has been read.
    ///
    /// A missing directory is not an error; not every tool version leaves one.
    pub fn cleanup(&self, stage: StageKind, record_id: &str) -> Result<(), TootError> {
        let dir = self.shared_dir(stage, record_id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => {
                debug!(stage = %stage, record = record_id, "removed shared intermediates");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TootError::workspace(dir, e)),
        }
    }

    /// Removes a workspace whose record reached a non-failure terminal state.
    pub fn release(&self, item: WorkItem) -> Result<(), TootError> {
        match fs::remove_dir_all(&item.dir) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(TootError::workspace(item.dir, e)),
        }
    }
}

/// `fs::remove_file` that treats an already-missing file as success.
pub(crate) fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
