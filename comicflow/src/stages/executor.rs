//! Subprocess-backed stage runner.

use super::{StageFailureReason, StageInvocation, StageResult, StageRunner};
use crate::cancellation::CancellationToken;
use crate::config::PipelineConfig;
use crate::observability::SpanTimer;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

type OutputBuffer = Arc<Mutex<Vec<u8>>>;

const READ_CHUNK: usize = 8192;

/// How a wait on the child ended.
enum WaitOutcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

/// Runs stages as child processes with piped output.
///
/// The child is spawned with `kill_on_drop`, so it cannot outlive a dropped
/// `execute` future, and is always reaped before `execute` returns.
#[derive(Debug, Clone)]
pub struct SubprocessExecutor {
    output_grace: Duration,
}

impl Default for SubprocessExecutor {
    fn default() -> Self {
        Self {
            output_grace: Duration::from_secs(1),
        }
    }
}

impl SubprocessExecutor {
    /// Creates an executor with a one second output grace period.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an executor using the configured grace period.
    #[must_use]
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new().with_output_grace(config.output_grace())
    }

    /// Sets how long output readers may keep draining after the child is reaped.
    #[must_use]
    pub fn with_output_grace(mut self, grace: Duration) -> Self {
        self.output_grace = grace;
        self
    }

    /// Kills the child and waits for it so no zombie is left behind.
    async fn terminate(child: &mut Child, stage: &str) {
        if let Err(e) = child.start_kill() {
            debug!(stage, error = %e, "Kill failed, child already exited");
        }
        if let Err(e) = child.wait().await {
            warn!(stage, error = %e, "Failed to reap stage process");
        }
    }

    /// Waits for the drain tasks, aborting any still blocked after the grace period.
    ///
    /// Readers can stay blocked when a grandchild inherited the pipe.
    async fn collect_output(&self, readers: Vec<JoinHandle<()>>) {
        let Some(deadline) = tokio::time::Instant::now().checked_add(self.output_grace) else {
            for reader in readers {
                let _ = reader.await;
            }
            return;
        };
        for mut reader in readers {
            if tokio::time::timeout_at(deadline, &mut reader).await.is_err() {
                reader.abort();
            }
        }
    }
}

async fn drain<R>(mut reader: R, buffer: OutputBuffer)
where
    R: AsyncRead + Unpin,
{
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        match reader.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
        }
    }
}

fn spawn_drain<R>(reader: Option<R>, buffer: &OutputBuffer) -> Option<JoinHandle<()>>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    reader.map(|r| tokio::spawn(drain(r, Arc::clone(buffer))))
}

fn decode(buffer: &OutputBuffer) -> String {
    String::from_utf8_lossy(&buffer.lock()).into_owned()
}

#[async_trait]
impl StageRunner for SubprocessExecutor {
    async fn execute(&self, invocation: &StageInvocation, cancel: &CancellationToken) -> StageResult {
        let stage = invocation.stage;
        let command_line = invocation.command_line();
        let timer = SpanTimer::start(stage.as_str());
        let (exe, args) = invocation.command_parts();

        let mut command = Command::new(&exe);
        command
            .args(&args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        info!(stage = %stage, command = %command_line, "Launching stage");

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(stage = %stage, error = %e, "Stage failed to launch");
                return StageResult::failure(
                    stage,
                    command_line,
                    timer.finish(),
                    StageFailureReason::LaunchFailure {
                        message: e.to_string(),
                    },
                );
            }
        };
        let process_id = child.id();

        let stdout: OutputBuffer = Arc::default();
        let stderr: OutputBuffer = Arc::default();
        let readers: Vec<JoinHandle<()>> = [
            spawn_drain(child.stdout.take(), &stdout),
            spawn_drain(child.stderr.take(), &stderr),
        ]
        .into_iter()
        .flatten()
        .collect();

        let outcome = tokio::select! {
            status = child.wait() => WaitOutcome::Exited(status),
            () = tokio::time::sleep(invocation.timeout) => WaitOutcome::TimedOut,
            () = cancel.cancelled() => WaitOutcome::Cancelled,
        };

        if !matches!(outcome, WaitOutcome::Exited(_)) {
            Self::terminate(&mut child, stage.as_str()).await;
        }
        self.collect_output(readers).await;

        let duration_seconds = timer.finish();
        let result = match outcome {
            WaitOutcome::Exited(Ok(status)) if status.success() => {
                StageResult::success(stage, command_line, duration_seconds)
            }
            WaitOutcome::Exited(Ok(status)) => StageResult::failure(
                stage,
                command_line,
                duration_seconds,
                StageFailureReason::NonZeroExit {
                    code: status.code(),
                },
            ),
            WaitOutcome::Exited(Err(e)) => StageResult::failure(
                stage,
                command_line,
                duration_seconds,
                StageFailureReason::LaunchFailure {
                    message: e.to_string(),
                },
            ),
            WaitOutcome::TimedOut => StageResult::failure(
                stage,
                command_line,
                duration_seconds,
                StageFailureReason::Timeout {
                    timeout_seconds: invocation.timeout.as_secs_f64(),
                },
            ),
            WaitOutcome::Cancelled => StageResult::failure(
                stage,
                command_line,
                duration_seconds,
                StageFailureReason::Cancelled {
                    reason: cancel.reason().unwrap_or_else(|| "cancelled".to_string()),
                },
            ),
        }
        .with_output(decode(&stdout), decode(&stderr))
        .with_process_id(process_id);

        match &result.failure_reason {
            None => info!(stage = %stage, duration_ms = duration_seconds * 1000.0, "Stage exited successfully"),
            Some(reason) => warn!(
                stage = %stage,
                duration_ms = duration_seconds * 1000.0,
                reason = %reason,
                "Stage failed"
            ),
        }

        result
    }
}
