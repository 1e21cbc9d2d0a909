//! Workspace and stage-script fixtures.

use crate::config::{PipelineConfig, StageProgram};
use crate::core::StageId;
use crate::pipeline::RunRequest;
use serde_json::{json, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Credential accepted by the default validation rules.
pub const TEST_CREDENTIAL: &str = "sk-test-credential";

/// A minimal document that satisfies the schema of `stage`.
#[must_use]
pub fn stage_document(stage: StageId) -> Value {
    match stage {
        StageId::ComicProcessor => json!({
            "source_file": "issue.cbz",
            "story_analysis": {"total_pages": 3, "story_summary": {"summary": "A heist."}},
            "script_generation_result": {"script": "HOOK: ...", "word_count": 150},
            "status": "success"
        }),
        StageId::ScriptEditor => json!({
            "comic_filename_reviewed": "issue.cbz",
            "accuracy_and_profile_review": {"accuracy_review": "Accurate."},
            "improvement_recommendations_for_profile": {"improvement_recommendations": "Tighten the hook."}
        }),
        StageId::FinalIntegrator => json!({
            "comic_filename_integrated": "issue.cbz",
            "final_script_package": {"final_script_package_content": "FINAL"},
            "validation_results": {"meets_profile_criteria": true},
            "title_options": {"title_options_content": "1. The Heist"}
        }),
    }
}

/// A shell script body that records its arguments and writes `document`
/// as the artifact of `stage` in the current directory.
#[must_use]
pub fn artifact_script(stage: StageId, document: &Value) -> String {
    format!(
        "printf '%s\\n' \"$@\" > args_{stage}.txt\n\
         cat > \"{prefix}$$.json\" <<'JSON'\n{document}\nJSON\n\
         echo \"{stage} done\"\n",
        prefix = stage.output_prefix(),
    )
}

/// A temporary directory with pipeline inputs and stage scripts.
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
    /// The comic archive.
    pub source: PathBuf,
    /// The competitor data file.
    pub competitor_data: PathBuf,
}

impl Workspace {
    /// Creates the workspace with valid inputs.
    #[must_use]
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("issue.cbz");
        let competitor_data = dir.path().join("competitors.csv");
        fs::write(&source, b"PK\x03\x04").unwrap();
        fs::write(&competitor_data, "title,views\nHeist,1000\n").unwrap();
        fs::create_dir(dir.path().join("scripts")).unwrap();
        Self {
            dir,
            source,
            competitor_data,
        }
    }

    /// Returns the workspace root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory stages run under.
    #[must_use]
    pub fn work_dir(&self) -> PathBuf {
        self.path().join("work")
    }

    /// Directory results are archived under.
    #[must_use]
    pub fn results_root(&self) -> PathBuf {
        self.path().join("results")
    }

    /// Writes `body` as the script for `stage` and returns its program.
    #[must_use]
    pub fn script(&self, stage: StageId, body: &str) -> StageProgram {
        let path = self.path().join("scripts").join(format!("{stage}.sh"));
        fs::write(&path, body).unwrap();
        StageProgram::script("/bin/sh", path)
    }

    /// Writes a well-behaved script for `stage`.
    #[must_use]
    pub fn happy_script(&self, stage: StageId) -> StageProgram {
        self.script(stage, &artifact_script(stage, &stage_document(stage)))
    }

    /// A configuration whose three stages all succeed.
    #[must_use]
    pub fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new()
            .with_working_dir(self.work_dir())
            .with_results_root(self.results_root())
            .with_stage_timeout(20.0)
            .with_output_grace(0.2);
        for stage in StageId::ALL {
            config = config.with_stage_program(stage, self.happy_script(stage));
        }
        config
    }

    /// A request for the workspace inputs.
    #[must_use]
    pub fn request(&self) -> RunRequest {
        RunRequest::new(&self.source, &self.competitor_data, TEST_CREDENTIAL)
    }
}
