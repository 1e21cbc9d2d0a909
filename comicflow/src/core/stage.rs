//! The three fixed pipeline stages.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies one of the three fixed content-generation stages.
///
/// The order of the variants is the execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Extracts the comic pages and drafts the first script.
    ComicProcessor,
    /// Reviews the draft against the source and competitor data.
    ScriptEditor,
    /// Folds the review back into a final script package.
    FinalIntegrator,
}

impl StageId {
    /// All stages, in execution order.
    pub const ALL: [Self; 3] = [Self::ComicProcessor, Self::ScriptEditor, Self::FinalIntegrator];

    /// Returns the snake_case identifier of the stage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ComicProcessor => "comic_processor",
            Self::ScriptEditor => "script_editor",
            Self::FinalIntegrator => "final_integrator",
        }
    }

    /// Returns the 1-based position of the stage in the sequence.
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::ComicProcessor => 1,
            Self::ScriptEditor => 2,
            Self::FinalIntegrator => 3,
        }
    }

    /// Returns a human readable title for reports.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::ComicProcessor => "Comic Processor & Script Creator",
            Self::ScriptEditor => "Script Editor & Competitive Analyst",
            Self::FinalIntegrator => "Final Integration Specialist",
        }
    }

    /// Returns the filename prefix of the artifact this stage writes.
    #[must_use]
    pub const fn output_prefix(self) -> &'static str {
        match self {
            Self::ComicProcessor => "agent_1_output_",
            Self::ScriptEditor => "agent_2_output_",
            Self::FinalIntegrator => "final_output_",
        }
    }

    /// Returns the fixed file name used when the artifact is archived.
    #[must_use]
    pub const fn archived_name(self) -> &'static str {
        match self {
            Self::ComicProcessor => "agent_1_output.json",
            Self::ScriptEditor => "agent_2_output.json",
            Self::FinalIntegrator => "final_output.json",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
