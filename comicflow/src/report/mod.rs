//! Human-readable and JSON reports of a pipeline run.
//!
//! Rendering is pure: the same run always renders to the same text.

use crate::core::{RunStatus, StageId};
use crate::errors::ComicflowError;
use crate::pipeline::{PipelineRun, RunFailureReason};
use crate::stages::StageResult;
use crate::utils::timestamps::{format_iso8601, seconds_between};
use crate::utils::RunId;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const WIDTH: usize = 80;
const RULE_WIDTH: usize = 40;
const STDERR_TAIL_LINES: usize = 5;

/// Returns the report file name for a run.
#[must_use]
pub fn report_file_name(run_id: &RunId) -> String {
    format!("pipeline_report_{run_id}.txt")
}

/// Returns the JSON report file name for a run.
#[must_use]
pub fn json_report_file_name(run_id: &RunId) -> String {
    format!("pipeline_report_{run_id}.json")
}

/// Renders the run as a pretty-printed JSON document.
pub fn render_json(run: &PipelineRun) -> serde_json::Result<String> {
    serde_json::to_string_pretty(run)
}

/// Renders the run as a plain-text report.
#[must_use]
pub fn render(run: &PipelineRun) -> String {
    let mut out = String::new();
    let banner = "=".repeat(WIDTH);

    let _ = writeln!(out, "{banner}");
    let _ = writeln!(out, "COMIC-TO-SHORTS SCRIPT PIPELINE REPORT");
    let _ = writeln!(out, "{banner}");
    let _ = writeln!(out, "Run ID: {}", run.run_id());
    let _ = writeln!(out, "Source: {}", run.source_path().display());
    let _ = writeln!(out, "Competitor Data: {}", run.competitor_data_path().display());
    let _ = writeln!(out, "Target Duration: {} seconds", run.target_duration());
    let _ = writeln!(out, "Started: {}", format_iso8601(&run.started_at()));
    if let Some(dir) = run.stage_directory() {
        let _ = writeln!(out, "Working Directory: {}", dir.display());
    }

    section(&mut out, "EXECUTION SUMMARY");
    let _ = writeln!(out, "Status: {}", status_label(run.status()));
    match run.finished_at() {
        Some(end) => {
            let _ = writeln!(
                out,
                "Total Duration: {:.2}s",
                seconds_between(&run.started_at(), &end)
            );
        }
        None => {
            let _ = writeln!(out, "Total Duration: n/a");
        }
    }
    if let Some(failure) = run.failure() {
        if let Some(stage) = failure.stage {
            let _ = writeln!(out, "Failed At: {stage} ({})", stage.title());
        }
        let _ = writeln!(out, "Error: {}", failure.reason);
    }

    if !run.validation_issues().is_empty() {
        section(&mut out, "VALIDATION ISSUES");
        for issue in run.validation_issues() {
            let _ = writeln!(out, "  - {issue}");
        }
    }

    section(&mut out, "STAGE BREAKDOWN");
    for stage in StageId::ALL {
        match run.stage_result(stage) {
            Some(result) => stage_line(&mut out, result, run.failed_stage() == Some(stage)),
            None => {
                let _ = writeln!(out, "{}. {stage}: NOT RUN", stage.position());
            }
        }
    }
    if let Some(failure) = run.failure() {
        if let RunFailureReason::SchemaMismatch { path, .. } = &failure.reason {
            let _ = writeln!(out, "   Rejected artifact: {}", path.display());
        }
    }

    if run.is_succeeded() {
        if let Some(artifact) = run.final_artifact() {
            section(&mut out, "FINAL OUTPUT");
            let _ = writeln!(out, "{}", artifact.path.display());
        }

        section(&mut out, "RESULTS SAVED TO");
        match run.results_location() {
            Some(location) => {
                let _ = writeln!(out, "{}", location.display());
            }
            None => {
                let _ = writeln!(out, "(results directory could not be created)");
            }
        }
        for archived in run.archived() {
            let name = archived
                .destination
                .file_name()
                .map_or_else(|| archived.destination.display().to_string(), |n| n.to_string_lossy().into_owned());
            let _ = writeln!(out, "  {name}  sha256:{}", archived.sha256);
        }
        for warning in run.archive_warnings() {
            let _ = writeln!(out, "  WARNING: {warning}");
        }
    }

    let _ = writeln!(out, "{banner}");
    out
}

/// Writes the text report (and optionally the JSON report) into `dir`.
///
/// Creates `dir` when it does not exist yet. Returns the paths written,
/// text report first.
pub fn persist(run: &PipelineRun, dir: &Path, with_json: bool) -> Result<Vec<PathBuf>, ComicflowError> {
    fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let text_path = dir.join(report_file_name(run.run_id()));
    fs::write(&text_path, render(run))?;
    written.push(text_path);

    if with_json {
        let json_path = dir.join(json_report_file_name(run.run_id()));
        fs::write(&json_path, render_json(run)?)?;
        written.push(json_path);
    }

    info!(run_id = %run.run_id(), files = written.len(), "Report written");
    Ok(written)
}

fn section(out: &mut String, title: &str) {
    let _ = writeln!(out);
    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
}

fn status_label(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => "PENDING",
        RunStatus::Running => "RUNNING",
        RunStatus::Succeeded => "SUCCEEDED",
        RunStatus::Failed => "FAILED",
    }
}

fn stage_line(out: &mut String, result: &StageResult, failed_here: bool) {
    let label = if result.is_success() { "SUCCESS" } else { "FAILED" };
    let _ = writeln!(
        out,
        "{}. {}: {label} ({:.2}s)",
        result.stage.position(),
        result.stage,
        result.duration_seconds
    );
    if let Some(reason) = &result.failure_reason {
        let _ = writeln!(out, "   Error: {reason}");
    }
    if let Some(artifact) = &result.artifact {
        let _ = writeln!(out, "   Artifact: {}", artifact.file_name());
    }
    if failed_here {
        for line in result.stderr_tail(STDERR_TAIL_LINES) {
            let _ = writeln!(out, "   stderr: {line}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::{ArchiveOutcome, ArchivedArtifact};
    use crate::core::Artifact;
    use crate::pipeline::RunFailure;
    use crate::stages::StageFailureReason;
    use pretty_assertions::assert_eq;

    fn base_run() -> PipelineRun {
        let mut run = PipelineRun::new(
            RunId::new("pipeline_20240309T070501_1a2b3c4d"),
            "/in/issue.cbz",
            "/in/competitors.csv",
            75,
        );
        run.start();
        run
    }

    fn succeeded_run() -> PipelineRun {
        let mut run = base_run();
        for stage in StageId::ALL {
            run.record_stage_result(StageResult::success(stage, "cmd", 1.5));
            run.attach_artifact(Artifact::new(
                format!("/w/{}1.json", stage.output_prefix()),
                stage,
            ));
        }
        run.succeed(ArchiveOutcome {
            location: Some(PathBuf::from("/r/results_pipeline_20240309T070501_1a2b3c4d")),
            archived: vec![ArchivedArtifact {
                stage: StageId::FinalIntegrator,
                source: PathBuf::from("/w/final_output_1.json"),
                destination: PathBuf::from("/r/results_x/final_output.json"),
                sha256: "abc123".into(),
            }],
            warnings: Vec::new(),
        });
        run
    }

    #[test]
    fn test_report_file_name() {
        assert_eq!(
            report_file_name(&RunId::new("pipeline_1")),
            "pipeline_report_pipeline_1.txt"
        );
    }

    #[test]
    fn test_render_is_deterministic() {
        let run = succeeded_run();
        assert_eq!(render(&run), render(&run));
    }

    #[test]
    fn test_render_success() {
        let text = render(&succeeded_run());

        assert!(text.starts_with(&"=".repeat(80)));
        assert!(text.contains("Run ID: pipeline_20240309T070501_1a2b3c4d"));
        assert!(text.contains("Status: SUCCEEDED"));
        assert!(text.contains("1. comic_processor: SUCCESS (1.50s)"));
        assert!(text.contains("3. final_integrator: SUCCESS (1.50s)"));
        assert!(text.contains("FINAL OUTPUT\n----------------------------------------\n/w/final_output_1.json"));
        assert!(text.contains("RESULTS SAVED TO"));
        assert!(text.contains("final_output.json  sha256:abc123"));
        assert!(!text.contains("Failed At"));
    }

    #[test]
    fn test_render_stage_failure() {
        let mut run = base_run();
        run.record_stage_result(StageResult::success(StageId::ComicProcessor, "cmd", 2.0));
        run.record_stage_result(
            StageResult::failure(
                StageId::ScriptEditor,
                "cmd",
                0.25,
                StageFailureReason::NonZeroExit { code: Some(1) },
            )
            .with_output("", "Traceback\nKeyError: 'script'\n"),
        );
        run.fail(RunFailure::at_stage(
            StageId::ScriptEditor,
            RunFailureReason::StageExecution {
                failure: StageFailureReason::NonZeroExit { code: Some(1) },
            },
        ));

        let text = render(&run);
        let breakdown = text
            .split("STAGE BREAKDOWN\n----------------------------------------\n")
            .nth(1)
            .unwrap();

        assert!(text.contains("Status: FAILED"));
        assert!(text.contains("Failed At: script_editor (Script Editor & Competitive Analyst)"));
        assert!(text.contains("Error: exited with return code 1"));
        assert_eq!(
            breakdown,
            "1. comic_processor: SUCCESS (2.00s)\n\
             2. script_editor: FAILED (0.25s)\n   \
             Error: exited with return code 1\n   \
             stderr: Traceback\n   \
             stderr: KeyError: 'script'\n\
             3. final_integrator: NOT RUN\n\
             ================================================================================\n"
        );
        assert!(!text.contains("RESULTS SAVED TO"));
    }

    #[test]
    fn test_render_validation_failure() {
        let mut run = base_run();
        run.fail(RunFailure::run_level(RunFailureReason::Validation {
            issues: vec!["CBR file not found: /in/issue.cbz".into()],
        }));

        let text = render(&run);

        assert!(text.contains("VALIDATION ISSUES"));
        assert!(text.contains("  - CBR file not found: /in/issue.cbz"));
        assert!(text.contains("1. comic_processor: NOT RUN"));
        assert!(!text.contains("Failed At"));
    }

    #[test]
    fn test_render_json_is_parseable() {
        let json = render_json(&succeeded_run()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["status"], "succeeded");
        assert_eq!(value["stage_results"].as_array().unwrap().len(), 3);
    }

    #[test]
    fn test_persist_writes_files() {
        let dir = tempfile::TempDir::new().unwrap();
        let run = succeeded_run();

        let written = persist(&run, dir.path(), true).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(
            written[0].file_name().unwrap(),
            "pipeline_report_pipeline_20240309T070501_1a2b3c4d.txt"
        );
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), render(&run));
    }

    #[test]
    fn test_persist_creates_missing_directory() {
        let dir = tempfile::TempDir::new().unwrap();
        let target = dir.path().join("reports").join("nested");

        let written = persist(&base_run(), &target, false).unwrap();

        assert_eq!(written.len(), 1);
        assert!(written[0].starts_with(&target));
        assert!(written[0].is_file());
    }

    #[test]
    fn test_persist_into_file_path_fails() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();

        assert!(persist(&base_run(), &blocker, false).is_err());
    }
}
