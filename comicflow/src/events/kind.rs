//! Names of the events the orchestrator emits.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle events of a pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A run was created and is about to validate its inputs.
    #[serde(rename = "pipeline.started")]
    PipelineStarted,
    /// Input validation finished; the payload says whether it passed.
    #[serde(rename = "pipeline.validated")]
    PipelineValidated,
    /// A stage process is being launched.
    #[serde(rename = "stage.started")]
    StageStarted,
    /// A stage process exited with status zero.
    #[serde(rename = "stage.completed")]
    StageCompleted,
    /// A stage process failed, timed out or could not start.
    #[serde(rename = "stage.failed")]
    StageFailed,
    /// A stage artifact was found.
    #[serde(rename = "artifact.located")]
    ArtifactLocated,
    /// A stage exited successfully but left no artifact.
    #[serde(rename = "artifact.missing")]
    ArtifactMissing,
    /// Artifacts were copied into the results location.
    #[serde(rename = "pipeline.archived")]
    PipelineArchived,
    /// The run succeeded.
    #[serde(rename = "pipeline.completed")]
    PipelineCompleted,
    /// The run failed.
    #[serde(rename = "pipeline.failed")]
    PipelineFailed,
    /// The run was interrupted.
    #[serde(rename = "pipeline.cancelled")]
    PipelineCancelled,
}

impl EventKind {
    /// Returns the dotted event name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PipelineStarted => "pipeline.started",
            Self::PipelineValidated => "pipeline.validated",
            Self::StageStarted => "stage.started",
            Self::StageCompleted => "stage.completed",
            Self::StageFailed => "stage.failed",
            Self::ArtifactLocated => "artifact.located",
            Self::ArtifactMissing => "artifact.missing",
            Self::PipelineArchived => "pipeline.archived",
            Self::PipelineCompleted => "pipeline.completed",
            Self::PipelineFailed => "pipeline.failed",
            Self::PipelineCancelled => "pipeline.cancelled",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
