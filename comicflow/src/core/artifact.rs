//! Handle to a JSON artifact written by a stage.

use super::StageId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// An artifact produced by a stage.
///
/// The orchestrator only ever reads the path; the file itself belongs to the
/// stage that created it and is forwarded to the next stage untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artifact {
    /// Where the stage wrote the document.
    pub path: PathBuf,

    /// The stage that wrote it.
    pub producing_stage: StageId,

    /// Modification time observed when the artifact was located.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<DateTime<Utc>>,
}

impl Artifact {
    /// Creates a new artifact handle.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, producing_stage: StageId) -> Self {
        Self {
            path: path.into(),
            producing_stage,
            modified_at: None,
        }
    }

    /// Records the modification time used to select the artifact.
    #[must_use]
    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }

    /// Returns the artifact path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the file name, or the full path when it has none.
    #[must_use]
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map_or_else(|| self.path.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}
