use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::StageKind;
use crate::state_machine::InvalidTransition;

/// Fatal errors. Any of these aborts the whole run.
#[derive(Debug, Error)]
pub enum TootError {
    #[error("Environment error: {0}")]
    Environment(String),

    #[error("Workspace error at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Input error: {0}")]
    Input(String),

    #[error("Failed to launch {}: {source}", program.display())]
    Launch {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TootError {
    /// Wraps an I/O error raised while touching a workspace path.
    pub fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        TootError::Workspace {
            path: path.into(),
            source,
        }
    }
}

/// Why a stage produced no usable verdict for one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// The classifier exited with a nonzero status.
    Exit(i32),
    /// The classifier was terminated by a signal.
    Signal,
    /// The result table was missing or malformed.
    Parse(String),
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Exit(code) => write!(f, "exited with status {code}"),
            FailureKind::Signal => write!(f, "terminated by signal"),
            FailureKind::Parse(msg) => write!(f, "unusable result table: {msg}"),
        }
    }
}

/// A recoverable, per-record stage failure. Logged to the ledger; the batch continues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFailure {
    pub stage: StageKind,
    pub record_id: String,
    pub kind: FailureKind,
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed for {}: {}", self.stage, self.record_id, self.kind)
    }
}
