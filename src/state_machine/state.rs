use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::record::{RecordOutcome, RecordTrack};
use crate::error::StageFailure;

/// Where a record is in the two-stage pipeline.
///
/// Isolated → Stage1Ran → {Rejected | Stage1Failed | Stage1Passed}
/// Stage1Passed → Stage2Ran → {Stage2Failed | Classified}
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordState {
    Isolated,
    Stage1Ran,
    Rejected,
    Stage1Failed,
    Stage1Passed,
    Stage2Ran,
    Stage2Failed,
    Classified,
}

impl RecordState {
    #[cfg(test)]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RecordState::Rejected
                | RecordState::Stage1Failed
                | RecordState::Stage2Failed
                | RecordState::Classified
        )
    }
}

impl fmt::Display for RecordState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordState::Isolated => write!(f, "ISOLATED"),
            RecordState::Stage1Ran => write!(f, "STAGE1_RAN"),
            RecordState::Rejected => write!(f, "REJECTED"),
            RecordState::Stage1Failed => write!(f, "STAGE1_FAILED"),
            RecordState::Stage1Passed => write!(f, "STAGE1_PASSED"),
            RecordState::Stage2Ran => write!(f, "STAGE2_RAN"),
            RecordState::Stage2Failed => write!(f, "STAGE2_FAILED"),
            RecordState::Classified => write!(f, "CLASSIFIED"),
        }
    }
}

/// Something that happened to a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The current stage's process exited (with any status).
    StageExited,
    /// TooT-T flagged the record as a transporter.
    Passed,
    /// TooT-T flagged the record as a non-transporter.
    NotTransporter,
    /// TooT-SC assigned this class label.
    Classified(String),
    /// The current stage failed for this record.
    Failed(StageFailure),
}

/// The result of applying an [`Event`].
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Move to a non-terminal state; more work follows.
    Next(RecordState),
    /// The record is done.
    Complete(RecordOutcome),
}

/// An event that makes no sense in the record's current state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("event {event} is not valid in state {state}")]
pub struct InvalidTransition {
    pub state: RecordState,
    pub event: String,
}

/// Drives a [`RecordTrack`] through the pipeline states.
pub struct StateMachine;

impl StateMachine {
    /// Applies `event` to `track`, recording the state it leaves in the history.
    pub fn next(track: &mut RecordTrack, event: Event) -> Result<Transition, InvalidTransition> {
        use RecordState::*;

        let target = match (track.state, &event) {
            (Isolated, Event::StageExited) => Stage1Ran,
            (Stage1Ran, Event::Passed) => Stage1Passed,
            (Stage1Ran, Event::NotTransporter) => Rejected,
            (Stage1Ran, Event::Failed(_)) => Stage1Failed,
            (Stage1Passed, Event::StageExited) => Stage2Ran,
            (Stage2Ran, Event::Classified(_)) => Classified,
            (Stage2Ran, Event::Failed(_)) => Stage2Failed,
            (state, event) => {
                return Err(InvalidTransition {
                    state,
                    event: format!("{event:?}"),
                });
            }
        };

        track.state_history.push(track.state);
        track.state = target;

        let transition = match event {
            Event::NotTransporter => Transition::Complete(RecordOutcome::Rejected),
            Event::Classified(label) => Transition::Complete(RecordOutcome::Classified(label)),
            Event::Failed(failure) => {
                let outcome = match target {
                    Stage1Failed => RecordOutcome::Stage1Failed,
                    _ => RecordOutcome::Stage2Failed,
                };
                track.failure = Some(failure);
                Transition::Complete(outcome)
            }
            Event::StageExited | Event::Passed => Transition::Next(target),
        };

        if let Transition::Complete(outcome) = &transition {
            track.outcome = Some(outcome.clone());
        }
        Ok(transition)
    }
}
