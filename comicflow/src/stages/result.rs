//! Result of running one stage process.

use crate::core::{Artifact, StageId, StageOutcome};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a stage execution failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageFailureReason {
    /// The process exited with a non-zero status, or was killed by a signal.
    NonZeroExit {
        /// Exit code, absent when the process was terminated by a signal.
        code: Option<i32>,
    },
    /// The process exceeded its wall-clock budget and was killed.
    Timeout {
        /// The budget that was exceeded.
        timeout_seconds: f64,
    },
    /// The process could not be started.
    LaunchFailure {
        /// The OS error text.
        message: String,
    },
    /// The run was cancelled while the process was running.
    Cancelled {
        /// The cancellation reason.
        reason: String,
    },
}

impl fmt::Display for StageFailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonZeroExit { code: Some(code) } => write!(f, "exited with return code {code}"),
            Self::NonZeroExit { code: None } => write!(f, "terminated by signal"),
            Self::Timeout { timeout_seconds } => write!(f, "timed out after {timeout_seconds} seconds"),
            Self::LaunchFailure { message } => write!(f, "failed to launch: {message}"),
            Self::Cancelled { reason } => write!(f, "cancelled: {reason}"),
        }
    }
}

/// Record of one stage execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    /// Which stage ran.
    pub stage: StageId,
    /// Success iff the process exited with status zero.
    pub outcome: StageOutcome,
    /// The command line, with secrets redacted.
    pub command: String,
    /// Everything the process wrote to stdout.
    pub captured_stdout: String,
    /// Everything the process wrote to stderr.
    pub captured_stderr: String,
    /// Wall-clock time from launch to reap.
    pub duration_seconds: f64,
    /// Exit code, when the process exited normally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// OS process id, when the process started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<u32>,
    /// Set iff `outcome` is failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<StageFailureReason>,
    /// The artifact located after a successful run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
}

impl StageResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(stage: StageId, command: impl Into<String>, duration_seconds: f64) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Success,
            command: command.into(),
            captured_stdout: String::new(),
            captured_stderr: String::new(),
            duration_seconds,
            exit_code: Some(0),
            process_id: None,
            failure_reason: None,
            artifact: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(
        stage: StageId,
        command: impl Into<String>,
        duration_seconds: f64,
        reason: StageFailureReason,
    ) -> Self {
        let exit_code = match &reason {
            StageFailureReason::NonZeroExit { code } => *code,
            _ => None,
        };
        Self {
            stage,
            outcome: StageOutcome::Failure,
            command: command.into(),
            captured_stdout: String::new(),
            captured_stderr: String::new(),
            duration_seconds,
            exit_code,
            process_id: None,
            failure_reason: Some(reason),
            artifact: None,
        }
    }

    /// Attaches captured output.
    #[must_use]
    pub fn with_output(mut self, stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        self.captured_stdout = stdout.into();
        self.captured_stderr = stderr.into();
        self
    }

    /// Records the OS process id.
    #[must_use]
    pub fn with_process_id(mut self, pid: Option<u32>) -> Self {
        self.process_id = pid;
        self
    }

    /// Returns true if the stage succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == StageOutcome::Success
    }

    /// Returns the last `lines` lines of stderr, for short diagnostics.
    #[must_use]
    pub fn stderr_tail(&self, lines: usize) -> Vec<&str> {
        let all: Vec<&str> = self
            .captured_stderr
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();
        let start = all.len().saturating_sub(lines);
        all[start..].to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_result() {
        let result = StageResult::success(StageId::ComicProcessor, "python3 agent.py", 1.5)
            .with_output("done\n", "");

        assert!(result.is_success());
        assert_eq!(result.exit_code, Some(0));
        assert!(result.failure_reason.is_none());
        assert_eq!(result.captured_stdout, "done\n");
    }

    #[test]
    fn test_failure_carries_exit_code() {
        let result = StageResult::failure(
            StageId::ScriptEditor,
            "agent",
            0.2,
            StageFailureReason::NonZeroExit { code: Some(3) },
        );

        assert!(!result.is_success());
        assert_eq!(result.exit_code, Some(3));
        assert_eq!(
            result.failure_reason.unwrap().to_string(),
            "exited with return code 3"
        );
    }

    #[test]
    fn test_failure_reason_display() {
        assert_eq!(
            StageFailureReason::Timeout { timeout_seconds: 600.0 }.to_string(),
            "timed out after 600 seconds"
        );
        assert_eq!(
            StageFailureReason::Cancelled { reason: "interrupted".into() }.to_string(),
            "cancelled: interrupted"
        );
    }

    #[test]
    fn test_failure_reason_serialize() {
        let json = serde_json::to_value(StageFailureReason::Timeout { timeout_seconds: 2.0 }).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "timeout", "timeout_seconds": 2.0}));
    }

    #[test]
    fn test_stderr_tail() {
        let result = StageResult::success(StageId::FinalIntegrator, "x", 0.0)
            .with_output("", "one\n\ntwo\nthree\n");
        assert_eq!(result.stderr_tail(2), vec!["two", "three"]);
        assert_eq!(result.stderr_tail(10).len(), 3);
    }
}
