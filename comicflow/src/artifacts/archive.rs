//! Copies a successful run's artifacts into its results directory.

use crate::core::{Artifact, StageId};
use crate::utils::RunId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// One artifact copied into the results directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchivedArtifact {
    /// The stage that produced it.
    pub stage: StageId,
    /// Where the stage wrote it.
    pub source: PathBuf,
    /// The copy inside the results directory.
    pub destination: PathBuf,
    /// Hex-encoded SHA-256 of the copy.
    pub sha256: String,
}

/// Result of archiving a run.
///
/// Archiving never fails the run; anything that went wrong is a warning.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveOutcome {
    /// The results directory, if it could be created.
    pub location: Option<PathBuf>,
    /// Artifacts that were copied.
    pub archived: Vec<ArchivedArtifact>,
    /// One entry per failed operation.
    pub warnings: Vec<String>,
}

/// Archives artifacts under `<root>/results_<run_id>/`.
#[derive(Debug, Clone)]
pub struct ResultsArchive {
    root: PathBuf,
}

impl ResultsArchive {
    /// Creates an archive rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the results directory for a run.
    #[must_use]
    pub fn location_for(&self, run_id: &RunId) -> PathBuf {
        self.root.join(run_id.results_dir_name())
    }

    /// Copies each artifact to its fixed archived name.
    pub fn archive(&self, run_id: &RunId, artifacts: &[Artifact]) -> ArchiveOutcome {
        let location = self.location_for(run_id);
        let mut outcome = ArchiveOutcome::default();

        if let Err(e) = fs::create_dir_all(&location) {
            warn!(path = %location.display(), error = %e, "Could not create results directory");
            outcome.warnings.push(format!(
                "Could not create results directory {}: {e}",
                location.display()
            ));
            return outcome;
        }

        for artifact in artifacts {
            let destination = location.join(artifact.producing_stage.archived_name());
            match copy_with_digest(artifact.path(), &destination) {
                Ok(sha256) => outcome.archived.push(ArchivedArtifact {
                    stage: artifact.producing_stage,
                    source: artifact.path.clone(),
                    destination,
                    sha256,
                }),
                Err(e) => {
                    warn!(
                        stage = %artifact.producing_stage,
                        source = %artifact.path.display(),
                        error = %e,
                        "Could not archive artifact"
                    );
                    outcome.warnings.push(format!(
                        "Could not copy {} to {}: {e}",
                        artifact.path.display(),
                        destination.display()
                    ));
                }
            }
        }

        info!(
            run_id = %run_id,
            location = %location.display(),
            archived = outcome.archived.len(),
            "Results archived"
        );
        outcome.location = Some(location);
        outcome
    }
}

/// Copies `source` to `destination` and hashes the written copy.
fn copy_with_digest(source: &Path, destination: &Path) -> io::Result<String> {
    fs::copy(source, destination)?;
    let bytes = fs::read(destination)?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn artifact(dir: &Path, name: &str, stage: StageId, body: &str) -> Artifact {
        let path = dir.join(name);
        fs::write(&path, body).unwrap();
        Artifact::new(path, stage)
    }

    #[test]
    fn test_archives_under_fixed_names() {
        let work = TempDir::new().unwrap();
        let results = TempDir::new().unwrap();
        let run_id = RunId::new("pipeline_test");
        let artifacts = vec![
            artifact(work.path(), "agent_1_output_9.json", StageId::ComicProcessor, "{}"),
            artifact(work.path(), "agent_2_output_9.json", StageId::ScriptEditor, "{}"),
            artifact(work.path(), "final_output_9.json", StageId::FinalIntegrator, "{}"),
        ];

        let outcome = ResultsArchive::new(results.path()).archive(&run_id, &artifacts);

        let location = results.path().join("results_pipeline_test");
        assert_eq!(outcome.location.as_deref(), Some(location.as_path()));
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.archived.len(), 3);
        let mut names: Vec<_> = fs::read_dir(&location)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(
            names,
            vec!["agent_1_output.json", "agent_2_output.json", "final_output.json"]
        );
    }

    #[test]
    fn test_digest_matches_content() {
        let work = TempDir::new().unwrap();
        let results = TempDir::new().unwrap();
        let artifacts = vec![artifact(
            work.path(),
            "final_output_1.json",
            StageId::FinalIntegrator,
            "abc",
        )];

        let outcome = ResultsArchive::new(results.path()).archive(&RunId::new("r"), &artifacts);

        assert_eq!(
            outcome.archived[0].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_copy_failure_is_warning() {
        let work = TempDir::new().unwrap();
        let results = TempDir::new().unwrap();
        let ok = artifact(work.path(), "agent_1_output_1.json", StageId::ComicProcessor, "{}");
        let gone = Artifact::new(work.path().join("agent_2_output_1.json"), StageId::ScriptEditor);

        let outcome = ResultsArchive::new(results.path()).archive(&RunId::new("r"), &[ok, gone]);

        assert!(outcome.location.is_some());
        assert_eq!(outcome.archived.len(), 1);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("agent_2_output_1.json"));
    }

    #[test]
    fn test_unwritable_root_is_warning() {
        let work = TempDir::new().unwrap();
        let blocker = work.path().join("file");
        fs::write(&blocker, "").unwrap();

        let outcome = ResultsArchive::new(&blocker).archive(&RunId::new("r"), &[]);

        assert!(outcome.location.is_none());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
