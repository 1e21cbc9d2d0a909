//! Stage artifacts: discovery, schema checks and archiving.

mod archive;
mod locator;
pub mod schema;

pub use archive::{ArchiveOutcome, ArchivedArtifact, ResultsArchive};
pub use locator::{find_latest, locate};
pub use schema::{
    ArtifactPayload, ComicScriptArtifact, FinalScriptArtifact, ScriptGeneration,
    ScriptReviewArtifact,
};
