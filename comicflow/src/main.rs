//! Comicflow CLI
//!
//! Runs the comic-to-shorts script pipeline once and writes a report.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info, warn};

use comicflow::cancellation::CancellationToken;
use comicflow::config::PipelineConfig;
use comicflow::events::LoggingEventSink;
use comicflow::observability::{init_logging, LoggingConfig};
use comicflow::pipeline::{
    PipelineOrchestrator, PipelineRun, RunFailureReason, RunRequest, DEFAULT_TARGET_DURATION,
};
use comicflow::report;
use comicflow::stages::SubprocessExecutor;

/// Exit code for a failed run.
const EXIT_FAILED: u8 = 1;

/// Exit code for a run stopped by an interrupt.
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "comicflow", version)]
#[command(about = "Turn a comic archive into a short-form video script", long_about = None)]
struct Cli {
    /// Comic archive (.cbr, .cbz or .zip)
    source: PathBuf,

    /// Competitor statistics (.csv)
    competitor_data: PathBuf,

    /// API key handed to every stage
    #[arg(env = "COMICFLOW_API_KEY", hide_env_values = true)]
    api_key: String,

    /// Target video length in seconds
    #[arg(default_value_t = DEFAULT_TARGET_DURATION)]
    target_duration: u32,

    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory the stages run in
    #[arg(long)]
    working_dir: Option<PathBuf>,

    /// Directory results are archived under
    #[arg(long)]
    results_root: Option<PathBuf>,

    /// Per-stage timeout in seconds
    #[arg(long)]
    stage_timeout: Option<f64>,

    /// Run stages directly in the working directory instead of a per-run subdirectory
    #[arg(long)]
    shared_working_dir: bool,

    /// Forward artifacts without checking their schema
    #[arg(long)]
    no_artifact_validation: bool,

    /// Also write the report as JSON
    #[arg(long)]
    json_report: bool,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = &self.working_dir {
            config.working_dir.clone_from(dir);
        }
        if let Some(dir) = &self.results_root {
            config.results_root.clone_from(dir);
        }
        if let Some(seconds) = self.stage_timeout {
            config.stage_timeout_seconds = seconds;
        }
        if self.shared_working_dir {
            config.isolate_runs = false;
        }
        if self.no_artifact_validation {
            config.validate_artifacts = false;
        }

        config.validate()?;
        Ok(config)
    }

    fn request(&self) -> RunRequest {
        RunRequest::new(&self.source, &self.competitor_data, &self.api_key)
            .with_target_duration(self.target_duration)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let logging = LoggingConfig::new()
        .with_verbose(cli.verbose)
        .with_json(cli.json_logs);
    if let Err(e) = init_logging(&logging) {
        eprintln!("Failed to initialize logging: {e}");
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = cli.pipeline_config()?;
    let report_dir = config.working_dir.clone();

    let token = CancellationToken::shared();
    token.on_cancel(|| warn!("Interrupt received, stopping the running stage"));
    {
        let token = Arc::clone(&token);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel("interrupted by user");
            }
        });
    }

    let events = if cli.verbose {
        LoggingEventSink::debug()
    } else {
        LoggingEventSink::default()
    };
    let executor = SubprocessExecutor::from_config(&config);
    let orchestrator = PipelineOrchestrator::new(config, Box::new(executor))?
        .with_event_sink(Arc::new(events))
        .with_cancellation(token);

    let (run, status) = match orchestrator.run(&cli.request()).await {
        Ok(run) => {
            let status = exit_status(&run);
            (run, status)
        }
        Err(err) => {
            error!(error = %err, "Pipeline aborted");
            (err.into_partial_run(), EXIT_FAILED)
        }
    };

    publish_report(&run, &report_dir, cli.json_report, &mut std::io::stdout().lock());
    Ok(ExitCode::from(status))
}

/// Prints the text report to `out`, then saves the report files into `dir`.
///
/// Saving is best-effort and never changes the exit status. Returns the
/// files written.
fn publish_report(run: &PipelineRun, dir: &Path, json: bool, out: &mut impl Write) -> Vec<PathBuf> {
    if let Err(e) = writeln!(out, "{}", report::render(run)).and_then(|()| out.flush()) {
        warn!(error = %e, "Failed to print report");
    }

    let saved = report::persist(run, dir, json)
        .with_context(|| format!("failed to write report into {}", dir.display()));
    match saved {
        Ok(written) => {
            for path in &written {
                info!(path = %path.display(), "Report saved");
            }
            written
        }
        Err(e) => {
            warn!(error = %format!("{e:#}"), "Report file not saved");
            Vec::new()
        }
    }
}

fn exit_status(run: &PipelineRun) -> u8 {
    if run.is_succeeded() {
        return 0;
    }
    match run.failure().map(|f| &f.reason) {
        Some(RunFailureReason::Cancelled { .. }) => EXIT_INTERRUPTED,
        _ => EXIT_FAILED,
    }
}
