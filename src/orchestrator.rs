use std::path::PathBuf;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::aggregate::{AggregateState, Aggregator};
use crate::config::RunSettings;
use crate::error::{StageFailure, TootError};
use crate::ledger::FailureLedger;
use crate::sequence::{FastaSource, SequenceRecord, validate_id};
use crate::stage::{Stage1Gate, Stage2Classifier, StageExecutor, StageKind, StageRunner};
use crate::state_machine::{Event, RecordTrack, RunReport, StateMachine};
use crate::ui::RunProgress;
use crate::workspace::{WorkItem, WorkspaceManager};

/// Consolidated result table, written to the output directory.
pub const RESULTS_FILE: &str = "TooTSCOut.csv";
/// Per-class summary table, written to the output directory.
pub const SUMMARY_FILE: &str = "TooTSCSummary.csv";
/// JSON run report, written to the output directory.
pub const REPORT_FILE: &str = "TooTPReport.json";

/// What a finished (or cancelled) run hands back.
#[derive(Debug)]
pub struct RunOutput {
    pub report: RunReport,
    pub state: AggregateState,
}

/// Drives every record of a batch through TooT-T and TooT-SC.
///
/// Records are processed one at a time, in input order. A stage failing for one
/// record is logged to the ledger and the batch moves on; only environment
/// problems and cancellation stop the run.
pub struct Pipeline<E> {
    settings: RunSettings,
    executor: E,
}

impl<E: StageExecutor> Pipeline<E> {
    pub fn new(settings: RunSettings, executor: E) -> Self {
        Self { settings, executor }
    }

    pub fn results_path(&self) -> PathBuf {
        self.settings.out.join(RESULTS_FILE)
    }

    pub fn summary_path(&self) -> PathBuf {
        self.settings.out.join(SUMMARY_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.settings.out.join(REPORT_FILE)
    }

    /// Runs the whole batch.
    ///
    /// The result and summary tables are always left fully headered, even when no
    /// record was classified or the run was cancelled between records.
    pub async fn run(
        &self,
        progress: &RunProgress,
        cancel: &CancellationToken,
    ) -> Result<RunOutput, TootError> {
        let source = FastaSource::new(&self.settings.query);
        let total = source.scan()?;
        progress.set_total(total);
        info!(records = total, query = %self.settings.query.display(), "starting run");

        let workspace = WorkspaceManager::new(&self.settings.work);
        let ledger = FailureLedger::new(workspace.prepare()?);
        ledger.reset()?;

        let mut batch = Batch {
            settings: &self.settings,
            runner: StageRunner::new(&self.executor, &self.settings.db, &self.settings.work),
            workspace,
            ledger,
            aggregator: Aggregator::create(self.results_path())?,
            progress,
            cancel,
        };
        let mut report = RunReport::start(&self.settings.query, total);
        let mut cancelled = false;

        for record in source.records()? {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }
            let record = record?;
            match batch.process(&record).await {
                Ok(track) => report.push(&track),
                Err(TootError::Cancelled) => {
                    warn!(record = record.id(), "run cancelled, record left unfinished");
                    cancelled = true;
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        report.finish(cancelled);
        let state = batch.aggregator.finalize(&self.summary_path())?;
        report.write_json(&self.report_path())?;

        if !cancelled && !report.is_balanced() {
            warn!(
                processed = report.processed(),
                input = report.input_records,
                "record counts do not add up"
            );
        }
        info!(
            classified = report.classified,
            rejected = report.rejected,
            stage1_failed = report.stage1_failed,
            stage2_failed = report.stage2_failed,
            cancelled,
            "run finished"
        );
        Ok(RunOutput { report, state })
    }
}

/// Per-run state shared by every record iteration.
struct Batch<'a, E> {
    settings: &'a RunSettings,
    runner: StageRunner<'a, E>,
    workspace: WorkspaceManager,
    ledger: FailureLedger,
    aggregator: Aggregator,
    progress: &'a RunProgress,
    cancel: &'a CancellationToken,
}

impl<E: StageExecutor> Batch<'_, E> {
    /// Takes one record to a terminal state. `Err` means the run must stop.
    async fn process(&mut self, record: &SequenceRecord) -> Result<RecordTrack, TootError> {
        let item = self.workspace.isolate(record)?;
        let mut track = RecordTrack::new(record.id());

        self.progress.stage(&item.record_id, StageKind::Transporter.tool_name());
        let outcome = self
            .runner
            .run(StageKind::Transporter, &self.settings.toot_t, &item, self.cancel)
            .await?;
        StateMachine::next(&mut track, Event::StageExited)?;

        let verdict = match Stage1Gate::evaluate(&outcome) {
            Ok(verdict) => verdict,
            Err(failure) => return self.fail(track, failure),
        };
        self.cleanup_shared(StageKind::Transporter, &item, &verdict.record_id)?;

        if !verdict.is_transporter {
            StateMachine::next(&mut track, Event::NotTransporter)?;
            self.progress.rejected(&item.record_id);
            self.release(item)?;
            return Ok(track);
        }
        StateMachine::next(&mut track, Event::Passed)?;

        self.progress.stage(&item.record_id, StageKind::Substrate.tool_name());
        let outcome = self
            .runner
            .run(StageKind::Substrate, &self.settings.toot_sc, &item, self.cancel)
            .await?;
        StateMachine::next(&mut track, Event::StageExited)?;

        let mut verdict = match Stage2Classifier::evaluate(&outcome) {
            Ok(verdict) => verdict,
            Err(failure) => return self.fail(track, failure),
        };
        self.cleanup_shared(StageKind::Substrate, &item, &verdict.record_id)?;

        // The consolidated table keys rows by the input identifier.
        verdict.record_id = item.record_id.clone();
        self.aggregator.record(&verdict)?;

        StateMachine::next(&mut track, Event::Classified(verdict.class_label.clone()))?;
        self.progress.classified(&item.record_id, &verdict.class_label);
        self.release(item)?;
        Ok(track)
    }

    /// Drops the tool's shared intermediates, which it keys by the id it reports.
    ///
    /// The input id is cleaned too when the two differ. A reported id that is not
    /// a safe directory name is never used as a path.
    fn cleanup_shared(&self, stage: StageKind, item: &WorkItem, reported: &str) -> Result<(), TootError> {
        if reported != item.record_id {
            debug!(record = %item.record_id, reported, "{stage} reported a different id");
            match validate_id(reported) {
                Ok(()) => self.workspace.cleanup(stage, reported)?,
                Err(e) => warn!(record = %item.record_id, "skipping shared cleanup for reported id: {e}"),
            }
        }
        self.workspace.cleanup(stage, &item.record_id)
    }

    /// Ledgers the failure and leaves the workspace on disk for inspection.
    fn fail(&self, mut track: RecordTrack, failure: StageFailure) -> Result<RecordTrack, TootError> {
        warn!("{failure}");
        self.ledger.record(failure.stage, &failure.record_id)?;
        self.progress.failed(&failure);
        StateMachine::next(&mut track, Event::Failed(failure))?;
        Ok(track)
    }

    fn release(&self, item: WorkItem) -> Result<(), TootError> {
        if self.settings.keep_workspaces {
            return Ok(());
        }
        self.workspace.release(item)
    }
}
