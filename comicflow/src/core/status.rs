//! Run status, run phase and stage outcome enums.

use super::StageId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The overall status of a pipeline run.
///
/// Transitions only move forward: `Pending → Running → Succeeded | Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The run has been created but nothing has executed.
    Pending,
    /// Validation or a stage is in progress.
    Running,
    /// All three stages completed and produced artifacts.
    Succeeded,
    /// The run was aborted.
    Failed,
}

impl Default for RunStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

impl RunStatus {
    /// Returns true if the status is final.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }

    /// Returns true if moving to `next` is a forward transition.
    #[must_use]
    pub fn can_transition_to(&self, next: Self) -> bool {
        match self {
            Self::Pending => next != Self::Pending,
            Self::Running => next.is_terminal(),
            Self::Succeeded | Self::Failed => false,
        }
    }
}

/// The fine-grained position of a run in the orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", content = "stage", rename_all = "snake_case")]
pub enum RunPhase {
    /// Created, nothing started.
    Pending,
    /// Checking inputs.
    Validating,
    /// A stage process is executing.
    StageRunning(StageId),
    /// A stage finished and its artifact was found.
    StageLocated(StageId),
    /// Copying artifacts into the results location.
    Archiving,
    /// Terminal success.
    Succeeded,
    /// Terminal failure.
    Failed,
}

impl Default for RunPhase {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Validating => write!(f, "validating"),
            Self::StageRunning(stage) => write!(f, "{stage} running"),
            Self::StageLocated(stage) => write!(f, "{stage} located"),
            Self::Archiving => write!(f, "archiving"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Outcome of a single stage execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// The process exited with status zero.
    Success,
    /// The process failed, timed out, could not start or was cancelled.
    Failure,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => write!(f, "success"),
            Self::Failure => write!(f, "failure"),
        }
    }
}
