use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::StageKind;
use crate::error::TootError;
use crate::workspace::{WorkItem, remove_if_exists};

/// Log files the external tool's standard streams are redirected into.
pub const STDOUT_LOG: &str = "log.stdout";
pub const STDERR_LOG: &str = "log.stderr";

/// A fully resolved call of one external classifier against one record.
#[derive(Debug, Clone)]
pub struct StageInvocation {
    pub stage: StageKind,
    pub record_id: String,
    pub program: PathBuf,
    pub args: Vec<String>,
    /// The `-out` directory, i.e. the record's workspace.
    pub out_dir: PathBuf,
    pub stdout_log: PathBuf,
    pub stderr_log: PathBuf,
}

impl StageInvocation {
    /// The command line as it would be typed in a shell, for progress output.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }
}

/// Something that can run a [`StageInvocation`] to completion.
///
/// Returns the exit code, or `None` when the process died from a signal.
/// Must stop the process and return [`TootError::Cancelled`] once `cancel` fires.
pub trait StageExecutor {
    async fn execute(
        &self,
        invocation: &StageInvocation,
        cancel: &CancellationToken,
    ) -> Result<Option<i32>, TootError>;
}

/// Native executor: spawns the classifier as a child process via [`tokio::process`].
pub struct ProcessExecutor;

impl StageExecutor for ProcessExecutor {
    async fn execute(
        &self,
        invocation: &StageInvocation,
        cancel: &CancellationToken,
    ) -> Result<Option<i32>, TootError> {
        let stdout = File::create(&invocation.stdout_log)
            .map_err(|e| TootError::workspace(&invocation.stdout_log, e))?;
        let stderr = File::create(&invocation.stderr_log)
            .map_err(|e| TootError::workspace(&invocation.stderr_log, e))?;

        let mut child = tokio::process::Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::from(stdout))
            .stderr(Stdio::from(stderr))
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| TootError::Launch {
                program: invocation.program.clone(),
                source,
            })?;

        tokio::select! {
            status = child.wait() => Ok(status?.code()),
            _ = cancel.cancelled() => {
                warn!(
                    stage = %invocation.stage,
                    record = %invocation.record_id,
                    "cancelled mid-stage, killing classifier"
                );
                child.kill().await?;
                Err(TootError::Cancelled)
            }
        }
    }
}

/// What one stage invocation left behind. Consumed once by the stage's interpreter.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub stage: StageKind,
    pub record_id: String,
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    /// Location of the declared result table; only set when the stage exited 0.
    pub result_table: Option<PathBuf>,
}

impl StageOutcome {
    pub fn succeeded(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs either classifier against a single-record workspace.
///
/// The argument contract is the same for both tools; only the program differs.
pub struct StageRunner<'a, E> {
    executor: &'a E,
    db: PathBuf,
    work_root: PathBuf,
}

impl<'a, E: StageExecutor> StageRunner<'a, E> {
    pub fn new(executor: &'a E, db: impl Into<PathBuf>, work_root: impl Into<PathBuf>) -> Self {
        Self {
            executor,
            db: db.into(),
            work_root: work_root.into(),
        }
    }

    /// Builds the invocation for `stage` against `item`.
    pub fn invocation(&self, stage: StageKind, program: &Path, item: &WorkItem) -> StageInvocation {
        StageInvocation {
            stage,
            record_id: item.record_id.clone(),
            program: program.to_path_buf(),
            args: vec![
                format!("-query={}", item.input_file.display()),
                format!("-db={}", self.db.display()),
                format!("-out={}", item.dir.display()),
                format!("-work={}", self.work_root.display()),
            ],
            out_dir: item.dir.clone(),
            stdout_log: item.dir.join(STDOUT_LOG),
            stderr_log: item.dir.join(STDERR_LOG),
        }
    }

    /// Runs the stage and waits for it. Logs are dropped on success and kept on failure.
    pub async fn run(
        &self,
        stage: StageKind,
        program: &Path,
        item: &WorkItem,
        cancel: &CancellationToken,
    ) -> Result<StageOutcome, TootError> {
        let invocation = self.invocation(stage, program, item);
        info!("Executing: {}", invocation.command_line());

        let exit_code = self.executor.execute(&invocation, cancel).await?;
        debug!(stage = %stage, record = %item.record_id, ?exit_code, "stage exited");

        let mut outcome = StageOutcome {
            stage,
            record_id: item.record_id.clone(),
            exit_code,
            result_table: None,
        };
        if outcome.succeeded() {
            for log in [&invocation.stdout_log, &invocation.stderr_log] {
                remove_if_exists(log).map_err(|e| TootError::workspace(log, e))?;
            }
            outcome.result_table = Some(invocation.out_dir.join(stage.result_file()));
        }
        Ok(outcome)
    }
}
