//! Drives the fixed three-stage sequence.

use super::run::{PipelineRun, RunFailure, RunFailureReason};
use crate::artifacts::{locate, schema, ResultsArchive};
use crate::cancellation::CancellationToken;
use crate::config::{PipelineConfig, StageProgram};
use crate::core::{Artifact, RunPhase, StageId};
use crate::errors::{ConfigError, OrchestratorError};
use crate::events::{EventKind, EventSink, NoOpEventSink};
use crate::stages::{StageFailureReason, StageInvocation, StageResult, StageRunner};
use crate::utils::RunId;
use crate::validation::InputValidator;
use serde_json::json;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};

/// Target video length used when the caller gives none.
pub const DEFAULT_TARGET_DURATION: u32 = 75;

/// Parameters of one pipeline run.
#[derive(Clone)]
pub struct RunRequest {
    /// The comic archive.
    pub source_path: PathBuf,
    /// The competitor statistics file.
    pub competitor_data_path: PathBuf,
    /// API credential handed to every stage.
    pub credential: String,
    /// Target video length in seconds.
    pub target_duration: u32,
}

impl RunRequest {
    /// Creates a request with the default target duration.
    #[must_use]
    pub fn new(
        source_path: impl Into<PathBuf>,
        competitor_data_path: impl Into<PathBuf>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            source_path: source_path.into(),
            competitor_data_path: competitor_data_path.into(),
            credential: credential.into(),
            target_duration: DEFAULT_TARGET_DURATION,
        }
    }

    /// Sets the target duration.
    #[must_use]
    pub fn with_target_duration(mut self, seconds: u32) -> Self {
        self.target_duration = seconds;
        self
    }
}

impl fmt::Debug for RunRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunRequest")
            .field("source_path", &self.source_path)
            .field("competitor_data_path", &self.competitor_data_path)
            .field("credential", &"***")
            .field("target_duration", &self.target_duration)
            .finish()
    }
}

/// Absolute paths and programs resolved once per run.
struct Resolved {
    source: PathBuf,
    competitor_data: PathBuf,
    programs: Vec<(StageId, StageProgram)>,
}

impl Resolved {
    fn program(&self, stage: StageId) -> Option<&StageProgram> {
        self.programs
            .iter()
            .find_map(|(s, program)| (*s == stage).then_some(program))
    }
}

/// Runs the comic processor, script editor and final integrator in order.
///
/// Each stage receives the artifact of the stage before it. The first
/// failure ends the run; nothing is retried.
pub struct PipelineOrchestrator {
    config: PipelineConfig,
    validator: InputValidator,
    runner: Box<dyn StageRunner>,
    events: Arc<dyn EventSink>,
    cancel: Arc<CancellationToken>,
    archive: ResultsArchive,
}

impl PipelineOrchestrator {
    /// Creates an orchestrator, validating the configuration.
    pub fn new(config: PipelineConfig, runner: Box<dyn StageRunner>) -> Result<Self, ConfigError> {
        config.validate()?;
        let validator = InputValidator::from_config(&config.validation)?;
        let archive = ResultsArchive::new(&config.results_root);
        Ok(Self {
            config,
            validator,
            runner,
            events: Arc::new(NoOpEventSink),
            cancel: CancellationToken::shared(),
            archive,
        })
    }

    /// Sets the event sink.
    #[must_use]
    pub fn with_event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Shares a cancellation token with the caller.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: Arc<CancellationToken>) -> Self {
        self.cancel = cancel;
        self
    }

    /// Returns the cancellation token runs observe.
    #[must_use]
    pub fn cancellation_token(&self) -> Arc<CancellationToken> {
        Arc::clone(&self.cancel)
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Executes one run.
    ///
    /// Every stage-level failure is reported through the returned run. An
    /// error means the orchestrator itself could not continue; the partial
    /// run travels inside it.
    pub async fn run(&self, request: &RunRequest) -> Result<PipelineRun, OrchestratorError> {
        let run = PipelineRun::new(
            RunId::generate(),
            &request.source_path,
            &request.competitor_data_path,
            request.target_duration,
        );
        let span = info_span!("pipeline", run_id = %run.run_id());
        self.drive(run, request).instrument(span).await
    }

    async fn drive(
        &self,
        mut run: PipelineRun,
        request: &RunRequest,
    ) -> Result<PipelineRun, OrchestratorError> {
        run.start();
        info!(
            source = %request.source_path.display(),
            target_duration = request.target_duration,
            "Pipeline started"
        );
        self.emit(
            EventKind::PipelineStarted,
            json!({
                "run_id": run.run_id(),
                "source_path": request.source_path,
                "competitor_data_path": request.competitor_data_path,
                "target_duration": request.target_duration,
            }),
        )
        .await;

        let resolved = match self.resolve(request) {
            Ok(resolved) => resolved,
            Err(e) => return Err(self.abort(run, e).await),
        };

        let program_paths: Vec<&Path> = resolved
            .programs
            .iter()
            .map(|(_, p)| p.program.as_path())
            .collect();
        let report = self.validator.validate(
            &request.source_path,
            &request.competitor_data_path,
            &request.credential,
            &program_paths,
        );
        self.emit(
            EventKind::PipelineValidated,
            json!({
                "run_id": run.run_id(),
                "valid": report.valid,
                "issues": report.issues,
            }),
        )
        .await;
        if !report.valid {
            for issue in &report.issues {
                warn!(issue = %issue, "Input validation issue");
            }
            return Ok(self
                .finish_failed(
                    run,
                    RunFailure::run_level(RunFailureReason::Validation {
                        issues: report.issues,
                    }),
                )
                .await);
        }

        let stage_dir = match self.prepare_stage_directory(run.run_id()) {
            Ok(dir) => dir,
            Err(e) => return Err(self.abort(run, e).await),
        };
        run.set_stage_directory(stage_dir.clone());

        let mut upstream = resolved.source.clone();
        for stage in StageId::ALL {
            if self.cancel.is_cancelled() {
                let reason = self.cancel_reason();
                return Ok(self
                    .finish_failed(
                        run,
                        RunFailure::run_level(RunFailureReason::Cancelled { reason }),
                    )
                    .await);
            }

            run.enter_phase(RunPhase::StageRunning(stage));
            let Some(program) = resolved.program(stage) else {
                let e = io::Error::new(io::ErrorKind::NotFound, format!("no program for {stage}"));
                return Err(self.abort(run, e).await);
            };
            let invocation = self.invocation(stage, program, &stage_dir, &upstream, &resolved, request);
            self.emit(
                EventKind::StageStarted,
                json!({
                    "run_id": run.run_id(),
                    "stage": stage,
                    "position": stage.position(),
                    "command": invocation.command_line(),
                }),
            )
            .await;

            let result = self.runner.execute(&invocation, &self.cancel).await;
            if let Some(failure) = self.stage_failure(&run, &result).await {
                run.record_stage_result(result);
                return Ok(self.finish_failed(run, failure).await);
            }
            self.emit(
                EventKind::StageCompleted,
                json!({
                    "run_id": run.run_id(),
                    "stage": stage,
                    "duration_seconds": result.duration_seconds,
                }),
            )
            .await;
            run.record_stage_result(result);

            let artifact = match locate(&stage_dir, stage) {
                Ok(Some(artifact)) => artifact,
                Ok(None) => {
                    let failure = self.missing_artifact(&run, stage, &stage_dir).await;
                    return Ok(self.finish_failed(run, failure).await);
                }
                Err(e) => return Err(self.abort(run, e).await),
            };
            run.attach_artifact(artifact.clone());

            if let Some(failure) = self.check_schema(&artifact) {
                warn!(stage = %stage, path = %artifact.path.display(), reason = %failure.reason, "Artifact rejected");
                return Ok(self.finish_failed(run, failure).await);
            }

            self.emit(
                EventKind::ArtifactLocated,
                json!({
                    "run_id": run.run_id(),
                    "stage": stage,
                    "path": artifact.path,
                }),
            )
            .await;
            run.enter_phase(RunPhase::StageLocated(stage));
            upstream = artifact.path;
        }

        run.enter_phase(RunPhase::Archiving);
        let outcome = self.archive.archive(run.run_id(), run.artifacts());
        self.emit(
            EventKind::PipelineArchived,
            json!({
                "run_id": run.run_id(),
                "location": outcome.location,
                "archived": outcome.archived.len(),
                "warnings": outcome.warnings,
            }),
        )
        .await;
        run.succeed(outcome);

        info!(
            duration_ms = run.total_duration_seconds() * 1000.0,
            "Pipeline completed successfully"
        );
        self.emit(
            EventKind::PipelineCompleted,
            json!({
                "run_id": run.run_id(),
                "results_location": run.results_location(),
                "duration_seconds": run.total_duration_seconds(),
            }),
        )
        .await;
        Ok(run)
    }

    /// Makes input paths absolute so stages can run in any directory.
    fn resolve(&self, request: &RunRequest) -> io::Result<Resolved> {
        let cwd = std::env::current_dir()?;
        let programs = self
            .config
            .stages
            .iter()
            .map(|(stage, program)| (stage, program.resolved_against(&cwd)))
            .collect();
        Ok(Resolved {
            source: cwd.join(&request.source_path),
            competitor_data: cwd.join(&request.competitor_data_path),
            programs,
        })
    }

    fn prepare_stage_directory(&self, run_id: &RunId) -> io::Result<PathBuf> {
        let base = std::path::absolute(&self.config.working_dir)?;
        let dir = if self.config.isolate_runs {
            base.join(run_id.as_str())
        } else {
            base
        };
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    fn invocation(
        &self,
        stage: StageId,
        program: &StageProgram,
        stage_dir: &Path,
        upstream: &Path,
        resolved: &Resolved,
        request: &RunRequest,
    ) -> StageInvocation {
        let base = StageInvocation::new(stage, program.clone(), stage_dir, self.config.stage_timeout())
            .with_arg(upstream);
        let duration = request.target_duration.to_string();
        match stage {
            StageId::ComicProcessor | StageId::FinalIntegrator => base
                .with_secret_arg(&request.credential)
                .with_arg(duration),
            StageId::ScriptEditor => base
                .with_arg(&resolved.competitor_data)
                .with_secret_arg(&request.credential),
        }
    }

    /// Turns an unsuccessful stage result into the run failure it causes.
    async fn stage_failure(&self, run: &PipelineRun, result: &StageResult) -> Option<RunFailure> {
        if result.is_success() {
            return None;
        }
        let stage = result.stage;
        let failure = result
            .failure_reason
            .clone()
            .unwrap_or(StageFailureReason::NonZeroExit {
                code: result.exit_code,
            });
        self.emit(
            EventKind::StageFailed,
            json!({
                "run_id": run.run_id(),
                "stage": stage,
                "reason": failure,
                "duration_seconds": result.duration_seconds,
            }),
        )
        .await;

        let reason = match failure {
            StageFailureReason::Cancelled { reason } => RunFailureReason::Cancelled { reason },
            other => RunFailureReason::StageExecution { failure: other },
        };
        Some(RunFailure::at_stage(stage, reason))
    }

    async fn missing_artifact(&self, run: &PipelineRun, stage: StageId, dir: &Path) -> RunFailure {
        warn!(stage = %stage, directory = %dir.display(), "Stage exited successfully but wrote no artifact");
        self.emit(
            EventKind::ArtifactMissing,
            json!({
                "run_id": run.run_id(),
                "stage": stage,
                "prefix": stage.output_prefix(),
                "directory": dir,
            }),
        )
        .await;
        RunFailure::at_stage(
            stage,
            RunFailureReason::ArtifactMissing {
                prefix: stage.output_prefix().to_string(),
                directory: dir.to_path_buf(),
            },
        )
    }

    fn check_schema(&self, artifact: &Artifact) -> Option<RunFailure> {
        if !self.config.validate_artifacts {
            return None;
        }
        schema::parse(artifact).err().map(|e| {
            RunFailure::at_stage(
                artifact.producing_stage,
                RunFailureReason::SchemaMismatch {
                    path: e.path().to_path_buf(),
                    detail: e.to_string(),
                },
            )
        })
    }

    fn cancel_reason(&self) -> String {
        self.cancel
            .reason()
            .unwrap_or_else(|| "cancelled".to_string())
    }

    async fn finish_failed(&self, mut run: PipelineRun, failure: RunFailure) -> PipelineRun {
        let cancelled = matches!(failure.reason, RunFailureReason::Cancelled { .. });
        warn!(failure = %failure, "Pipeline failed");
        run.fail(failure);

        let kind = if cancelled {
            EventKind::PipelineCancelled
        } else {
            EventKind::PipelineFailed
        };
        self.emit(
            kind,
            json!({
                "run_id": run.run_id(),
                "failed_stage": run.failed_stage(),
                "failure": run.failure(),
                "duration_seconds": run.total_duration_seconds(),
            }),
        )
        .await;
        run
    }

    async fn abort(&self, mut run: PipelineRun, source: io::Error) -> OrchestratorError {
        let phase = run.phase();
        warn!(phase = %phase, error = %source, "Pipeline aborted");
        run.fail(RunFailure::run_level(RunFailureReason::Aborted {
            message: source.to_string(),
        }));
        self.emit(
            EventKind::PipelineFailed,
            json!({
                "run_id": run.run_id(),
                "phase": phase,
                "failure": run.failure(),
            }),
        )
        .await;
        OrchestratorError::Aborted {
            run: Box::new(run),
            phase,
            source,
        }
    }

    async fn emit(&self, kind: EventKind, data: serde_json::Value) {
        self.events.emit(kind, data).await;
    }
}

impl fmt::Debug for PipelineOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineOrchestrator")
            .field("config", &self.config)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
