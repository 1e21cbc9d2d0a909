//! Run identifier generation.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque identifier of a pipeline run.
///
/// Generated identifiers look like `pipeline_20240309T070501_1a2b3c4d`: the
/// UTC start time followed by the random tail of a UUID v7, so they sort by
/// creation time and stay unique for runs started in the same second.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    /// Generates a fresh, time-derived run identifier.
    #[must_use]
    pub fn generate() -> Self {
        let uuid = Uuid::now_v7().simple().to_string();
        let tail = &uuid[uuid.len() - 8..];
        Self(format!("pipeline_{}_{tail}", Utc::now().format("%Y%m%dT%H%M%S")))
    }

    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the name of the results directory for this run.
    #[must_use]
    pub fn results_dir_name(&self) -> String {
        format!("results_{}", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
