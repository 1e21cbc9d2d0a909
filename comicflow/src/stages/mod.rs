//! Stage execution.
//!
//! A stage is an external program. The orchestrator describes what to run
//! with a [`StageInvocation`] and hands it to a [`StageRunner`]; the
//! production runner is [`SubprocessExecutor`].

mod executor;
mod result;

pub use executor::SubprocessExecutor;
pub use result::{StageFailureReason, StageResult};

use crate::cancellation::CancellationToken;
use crate::config::StageProgram;
use crate::core::StageId;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

const REDACTED: &str = "***";

/// Everything needed to launch one stage process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageInvocation {
    /// The stage being run.
    pub stage: StageId,
    /// Interpreter and program.
    pub program: StageProgram,
    /// Positional arguments, in order.
    pub args: Vec<OsString>,
    /// Current directory for the process.
    pub working_dir: PathBuf,
    /// Wall-clock budget.
    pub timeout: Duration,
    secret_positions: Vec<usize>,
}

impl StageInvocation {
    /// Creates an invocation with no arguments.
    #[must_use]
    pub fn new(
        stage: StageId,
        program: StageProgram,
        working_dir: impl Into<PathBuf>,
        timeout: Duration,
    ) -> Self {
        Self {
            stage,
            program,
            args: Vec::new(),
            working_dir: working_dir.into(),
            timeout,
            secret_positions: Vec::new(),
        }
    }

    /// Appends a positional argument.
    #[must_use]
    pub fn with_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Appends an argument that must never appear in logs or reports.
    #[must_use]
    pub fn with_secret_arg(mut self, arg: impl Into<OsString>) -> Self {
        self.secret_positions.push(self.args.len());
        self.args.push(arg.into());
        self
    }

    /// Returns the executable and the full argument vector.
    #[must_use]
    pub fn command_parts(&self) -> (OsString, Vec<OsString>) {
        let (exe, mut leading) = self.program.launch_parts();
        leading.extend(self.args.iter().cloned());
        (exe, leading)
    }

    /// Renders the command line for display, with secret arguments masked.
    #[must_use]
    pub fn command_line(&self) -> String {
        let (exe, leading) = self.program.launch_parts();
        let mut parts = vec![exe.to_string_lossy().into_owned()];
        parts.extend(leading.iter().map(|a| a.to_string_lossy().into_owned()));
        parts.extend(self.args.iter().enumerate().map(|(i, arg)| {
            if self.secret_positions.contains(&i) {
                REDACTED.to_string()
            } else {
                arg.to_string_lossy().into_owned()
            }
        }));
        parts.join(" ")
    }
}

/// Runs a single stage to completion.
///
/// Implementations never return an error: every way a stage can fail is
/// captured in the returned [`StageResult`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StageRunner: Send + Sync {
    /// Executes the invocation, honoring its timeout and the cancellation token.
    async fn execute(&self, invocation: &StageInvocation, cancel: &CancellationToken) -> StageResult;
}
