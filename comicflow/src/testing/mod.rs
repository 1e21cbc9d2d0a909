//! Test fixtures for orchestrator tests.
//!
//! A [`Workspace`] is a temporary directory holding a comic archive, a
//! competitor data file and `/bin/sh` stand-ins for the stage programs.

mod fixtures;

pub use fixtures::{artifact_script, stage_document, Workspace, TEST_CREDENTIAL};
