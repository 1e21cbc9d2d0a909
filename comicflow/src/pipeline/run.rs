//! The record of one pipeline run.

use crate::artifacts::{ArchiveOutcome, ArchivedArtifact};
use crate::core::{Artifact, RunPhase, RunStatus, StageId};
use crate::stages::{StageFailureReason, StageResult};
use crate::utils::timestamps::{now_utc, seconds_between, Timestamp};
use crate::utils::RunId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RunFailureReason {
    /// The inputs did not pass validation.
    Validation {
        /// Every issue the validator found.
        issues: Vec<String>,
    },
    /// The stage process failed.
    StageExecution {
        /// How it failed.
        failure: StageFailureReason,
    },
    /// The stage exited successfully but wrote no artifact.
    ArtifactMissing {
        /// The filename prefix that was searched for.
        prefix: String,
        /// The directory that was searched.
        directory: PathBuf,
    },
    /// The artifact did not match its stage's schema.
    SchemaMismatch {
        /// The offending artifact.
        path: PathBuf,
        /// What was wrong with it.
        detail: String,
    },
    /// The run was interrupted.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
    /// The orchestrator could not continue.
    Aborted {
        /// The underlying error.
        message: String,
    },
}

impl fmt::Display for RunFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { issues } => {
                write!(f, "input validation failed ({} issue(s))", issues.len())
            }
            Self::StageExecution { failure } => write!(f, "{failure}"),
            Self::ArtifactMissing { prefix, directory } => write!(
                f,
                "no {prefix}*.json artifact found in {}",
                directory.display()
            ),
            Self::SchemaMismatch { detail, .. } => write!(f, "{detail}"),
            Self::Cancelled { reason } => write!(f, "cancelled: {reason}"),
            Self::Aborted { message } => write!(f, "aborted: {message}"),
        }
    }
}

/// The failure that ended a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// The stage that aborted the run, if a stage did.
    pub stage: Option<StageId>,
    /// What went wrong.
    pub reason: RunFailureReason,
}

impl RunFailure {
    /// A failure attributed to no stage.
    #[must_use]
    pub fn run_level(reason: RunFailureReason) -> Self {
        Self { stage: None, reason }
    }

    /// A failure attributed to `stage`.
    #[must_use]
    pub fn at_stage(stage: StageId, reason: RunFailureReason) -> Self {
        Self {
            stage: Some(stage),
            reason,
        }
    }
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.stage {
            Some(stage) => write!(f, "{stage}: {}", self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// One execution of the three-stage pipeline.
///
/// Only the orchestrator mutates a run. Status moves forward only and a
/// terminal run ignores every further mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    run_id: RunId,
    source_path: PathBuf,
    competitor_data_path: PathBuf,
    target_duration: u32,
    status: RunStatus,
    phase: RunPhase,
    started_at: Timestamp,
    #[serde(default)]
    finished_at: Option<Timestamp>,
    #[serde(default)]
    stage_directory: Option<PathBuf>,
    #[serde(default)]
    stage_results: Vec<StageResult>,
    #[serde(default)]
    artifacts: Vec<Artifact>,
    #[serde(default)]
    validation_issues: Vec<String>,
    #[serde(default)]
    failure: Option<RunFailure>,
    #[serde(default)]
    results_location: Option<PathBuf>,
    #[serde(default)]
    archived: Vec<ArchivedArtifact>,
    #[serde(default)]
    archive_warnings: Vec<String>,
}

impl PipelineRun {
    /// Creates a pending run.
    #[must_use]
    pub fn new(
        run_id: RunId,
        source_path: impl Into<PathBuf>,
        competitor_data_path: impl Into<PathBuf>,
        target_duration: u32,
    ) -> Self {
        Self {
            run_id,
            source_path: source_path.into(),
            competitor_data_path: competitor_data_path.into(),
            target_duration,
            status: RunStatus::Pending,
            phase: RunPhase::Pending,
            started_at: now_utc(),
            finished_at: None,
            stage_directory: None,
            stage_results: Vec::new(),
            artifacts: Vec::new(),
            validation_issues: Vec::new(),
            failure: None,
            results_location: None,
            archived: Vec::new(),
            archive_warnings: Vec::new(),
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &RunId {
        &self.run_id
    }

    /// Returns the comic archive the run was started with.
    #[must_use]
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Returns the competitor data file.
    #[must_use]
    pub fn competitor_data_path(&self) -> &Path {
        &self.competitor_data_path
    }

    /// Returns the target video length in seconds.
    #[must_use]
    pub fn target_duration(&self) -> u32 {
        self.target_duration
    }

    /// Returns the overall status.
    #[must_use]
    pub fn status(&self) -> RunStatus {
        self.status
    }

    /// Returns the last phase reached.
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Returns true if the run succeeded.
    #[must_use]
    pub fn is_succeeded(&self) -> bool {
        self.status == RunStatus::Succeeded
    }

    /// Returns when the run started.
    #[must_use]
    pub fn started_at(&self) -> Timestamp {
        self.started_at
    }

    /// Returns when the run reached a terminal status.
    #[must_use]
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// Returns the wall-clock duration, up to now for unfinished runs.
    #[must_use]
    pub fn total_duration_seconds(&self) -> f64 {
        let end = self.finished_at.unwrap_or_else(now_utc);
        seconds_between(&self.started_at, &end)
    }

    /// Returns the directory the stages ran in.
    #[must_use]
    pub fn stage_directory(&self) -> Option<&Path> {
        self.stage_directory.as_deref()
    }

    /// Returns stage results in execution order.
    #[must_use]
    pub fn stage_results(&self) -> &[StageResult] {
        &self.stage_results
    }

    /// Returns the result for one stage, if it was attempted.
    #[must_use]
    pub fn stage_result(&self, stage: StageId) -> Option<&StageResult> {
        self.stage_results.iter().find(|r| r.stage == stage)
    }

    /// Returns located artifacts in execution order.
    #[must_use]
    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }

    /// Returns the last stage's artifact, if it was produced.
    #[must_use]
    pub fn final_artifact(&self) -> Option<&Artifact> {
        self.artifacts
            .iter()
            .find(|a| a.producing_stage == StageId::FinalIntegrator)
    }

    /// Returns the validation issues, empty unless validation failed.
    #[must_use]
    pub fn validation_issues(&self) -> &[String] {
        &self.validation_issues
    }

    /// Returns the failure, if the run failed.
    #[must_use]
    pub fn failure(&self) -> Option<&RunFailure> {
        self.failure.as_ref()
    }

    /// Returns the stage that aborted the run.
    ///
    /// `None` for successful runs and for failures no stage caused:
    /// invalid inputs, cancellation before a launch and orchestrator aborts.
    #[must_use]
    pub fn failed_stage(&self) -> Option<StageId> {
        self.failure.as_ref().and_then(|f| f.stage)
    }

    /// Returns where the artifacts were archived. Only set on success.
    #[must_use]
    pub fn results_location(&self) -> Option<&Path> {
        self.results_location.as_deref()
    }

    /// Returns the archived copies.
    #[must_use]
    pub fn archived(&self) -> &[ArchivedArtifact] {
        &self.archived
    }

    /// Returns non-fatal archiving problems.
    #[must_use]
    pub fn archive_warnings(&self) -> &[String] {
        &self.archive_warnings
    }

    fn transition(&mut self, next: RunStatus) -> bool {
        if !self.status.can_transition_to(next) {
            return false;
        }
        self.status = next;
        if next.is_terminal() {
            self.finished_at = Some(now_utc());
        }
        true
    }

    pub(crate) fn start(&mut self) {
        if self.transition(RunStatus::Running) {
            self.phase = RunPhase::Validating;
        }
    }

    pub(crate) fn enter_phase(&mut self, phase: RunPhase) {
        if self.status == RunStatus::Running {
            self.phase = phase;
        }
    }

    pub(crate) fn set_stage_directory(&mut self, dir: PathBuf) {
        if !self.status.is_terminal() {
            self.stage_directory = Some(dir);
        }
    }

    /// Records a stage result. At most one result per stage.
    pub(crate) fn record_stage_result(&mut self, result: StageResult) {
        if self.status.is_terminal() || self.stage_result(result.stage).is_some() {
            return;
        }
        self.stage_results.push(result);
    }

    /// Records a located artifact and links it to its stage result.
    pub(crate) fn attach_artifact(&mut self, artifact: Artifact) {
        if self.status.is_terminal() {
            return;
        }
        if let Some(result) = self
            .stage_results
            .iter_mut()
            .find(|r| r.stage == artifact.producing_stage)
        {
            result.artifact = Some(artifact.clone());
        }
        self.artifacts.push(artifact);
    }

    pub(crate) fn fail(&mut self, failure: RunFailure) {
        if !self.transition(RunStatus::Failed) {
            return;
        }
        if let RunFailureReason::Validation { issues } = &failure.reason {
            self.validation_issues.clone_from(issues);
        }
        self.phase = RunPhase::Failed;
        self.failure = Some(failure);
    }

    pub(crate) fn succeed(&mut self, outcome: ArchiveOutcome) {
        if !self.transition(RunStatus::Succeeded) {
            return;
        }
        self.phase = RunPhase::Succeeded;
        self.results_location = outcome.location;
        self.archived = outcome.archived;
        self.archive_warnings = outcome.warnings;
    }
}
