//! Pipeline orchestration.
//!
//! [`PipelineOrchestrator`] validates the inputs, runs the three stages in
//! order and archives their artifacts; [`PipelineRun`] records what happened.

mod orchestrator;
mod run;

pub use orchestrator::{PipelineOrchestrator, RunRequest, DEFAULT_TARGET_DURATION};
pub use run::{PipelineRun, RunFailure, RunFailureReason};
