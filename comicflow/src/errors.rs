//! Error types for comicflow.
//!
//! Stage-level failures (timeouts, non-zero exits, missing artifacts) are
//! not errors in this sense: they are recorded inside the `PipelineRun`.
//! The types here cover configuration problems, artifact parsing and the
//! rare case where the orchestrator itself cannot continue.

use crate::core::RunPhase;
use crate::pipeline::PipelineRun;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for comicflow operations.
#[derive(Debug, Error)]
pub enum ComicflowError {
    /// Configuration could not be loaded or is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The orchestrator aborted the run.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// Serialization/deserialization error.
    #[error("Serialization error")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error")]
    Io(#[from] std::io::Error),
}

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {source}")]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for the config schema.
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        /// The file that was parsed.
        path: PathBuf,
        /// The underlying TOML error.
        #[source]
        source: toml::de::Error,
    },

    /// A value is out of range or inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl ConfigError {
    /// Creates an invalid configuration error.
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid(message.into())
    }
}

/// Errors raised when an artifact does not match its stage's schema.
#[derive(Debug, Error)]
pub enum ArtifactSchemaError {
    /// The artifact could not be read.
    #[error("Could not read artifact {path}: {source}")]
    Read {
        /// The artifact path.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The artifact is not valid JSON or lacks required fields.
    #[error("Artifact {path} does not match the expected schema: {source}")]
    Shape {
        /// The artifact path.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// The stage wrote an error document instead of a result.
    #[error("Artifact {path} carries a stage error: {message}")]
    StageReportedError {
        /// The artifact path.
        path: PathBuf,
        /// The error the stage reported.
        message: String,
    },
}

impl ArtifactSchemaError {
    /// Returns the path of the offending artifact.
    #[must_use]
    pub fn path(&self) -> &std::path::Path {
        match self {
            Self::Read { path, .. } | Self::Shape { path, .. } | Self::StageReportedError { path, .. } => path,
        }
    }
}

/// Errors that abort the orchestrator itself.
///
/// The partially populated run travels with the error so the caller can
/// still persist a report.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A filesystem operation the orchestrator depends on failed.
    #[error("Pipeline aborted during {phase}: {source}")]
    Aborted {
        /// The run as it stood when the orchestrator gave up.
        run: Box<PipelineRun>,
        /// Where the orchestrator was in its state machine.
        phase: RunPhase,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

impl OrchestratorError {
    /// Returns the partial run captured at the time of the abort.
    #[must_use]
    pub fn partial_run(&self) -> &PipelineRun {
        match self {
            Self::Aborted { run, .. } => run,
        }
    }

    /// Consumes the error and returns the partial run.
    #[must_use]
    pub fn into_partial_run(self) -> PipelineRun {
        match self {
            Self::Aborted { run, .. } => *run,
        }
    }
}
