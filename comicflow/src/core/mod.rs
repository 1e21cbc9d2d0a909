//! Core domain model types for comicflow.
//!
//! This module contains the fundamental types used throughout the crate:
//! - The fixed stage identifiers
//! - Run status, run phase and stage outcome enums
//! - Artifact handles

mod artifact;
mod stage;
mod status;

pub use artifact::Artifact;
pub use stage::StageId;
pub use status::{RunPhase, RunStatus, StageOutcome};
