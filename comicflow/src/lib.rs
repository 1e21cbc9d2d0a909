//! # Comicflow
//!
//! Orchestrates the three-stage comic-to-shorts script pipeline.
//!
//! A run turns a comic archive and a competitor data file into a short-form
//! video script by invoking three external stage programs in order:
//!
//! - **Comic processor**: reads the archive and drafts a script
//! - **Script editor**: reviews the draft against the comic and competitor data
//! - **Final integrator**: folds the review into the final script package
//!
//! Each stage writes a JSON artifact that becomes the next stage's input.
//! Comicflow validates the inputs, launches the stages with a timeout,
//! locates and checks their artifacts, archives the results and renders a
//! report. It never interprets what the stages produce beyond their schemas.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use comicflow::prelude::*;
//!
//! let config = PipelineConfig::new();
//! let executor = SubprocessExecutor::from_config(&config);
//! let orchestrator = PipelineOrchestrator::new(config, Box::new(executor))?;
//!
//! let request = RunRequest::new("issue-01.cbz", "competitors.csv", api_key);
//! let run = orchestrator.run(&request).await?;
//! println!("{}", comicflow::report::render(&run));
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod artifacts;
pub mod cancellation;
pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod observability;
pub mod pipeline;
pub mod report;
pub mod stages;
pub mod utils;
pub mod validation;

#[cfg(test)]
mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{PipelineConfig, StageProgram, ValidationConfig};
    pub use crate::core::{Artifact, RunPhase, RunStatus, StageId, StageOutcome};
    pub use crate::errors::{ComicflowError, ConfigError, OrchestratorError};
    pub use crate::events::{CollectingEventSink, EventKind, EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::pipeline::{PipelineOrchestrator, PipelineRun, RunFailure, RunRequest};
    pub use crate::stages::{StageResult, StageRunner, SubprocessExecutor};
    pub use crate::utils::RunId;
    pub use crate::validation::{InputValidator, ValidationReport};
}
