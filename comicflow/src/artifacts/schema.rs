//! Typed views of the JSON documents each stage writes.
//!
//! Only the keys the next stage depends on are required. Everything else a
//! stage writes is kept verbatim in `extra`.

use crate::core::{Artifact, StageId};
use crate::errors::ArtifactSchemaError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Output of the comic processor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComicScriptArtifact {
    /// The archive the script was generated from.
    pub source_file: String,
    /// Page-level and summary analysis of the story.
    pub story_analysis: Value,
    /// The drafted script.
    pub script_generation_result: ScriptGeneration,
    /// Any other keys the stage wrote.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The script section of the comic processor output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptGeneration {
    /// Full script text.
    pub script: String,
    /// Any other keys the stage wrote.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Output of the script editor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScriptReviewArtifact {
    /// The comic the review refers to, when known.
    pub comic_filename_reviewed: Option<String>,
    /// Accuracy review of the draft against the source.
    pub accuracy_and_profile_review: Value,
    /// Concrete recommendations for the final pass.
    pub improvement_recommendations_for_profile: Value,
    /// Any other keys the stage wrote.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Output of the final integrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalScriptArtifact {
    /// The comic the package refers to, when known.
    pub comic_filename_integrated: Option<String>,
    /// The integrated script package.
    pub final_script_package: Value,
    /// Validation of the package against the narrative profile.
    pub validation_results: Value,
    /// Candidate video titles.
    pub title_options: Value,
    /// Any other keys the stage wrote.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A parsed artifact, tagged by the stage that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum ArtifactPayload {
    /// Stage 1 output.
    ComicScript(Box<ComicScriptArtifact>),
    /// Stage 2 output.
    ScriptReview(Box<ScriptReviewArtifact>),
    /// Stage 3 output.
    FinalScript(Box<FinalScriptArtifact>),
}

impl ArtifactPayload {
    /// Returns the stage this payload belongs to.
    #[must_use]
    pub fn stage(&self) -> StageId {
        match self {
            Self::ComicScript(_) => StageId::ComicProcessor,
            Self::ScriptReview(_) => StageId::ScriptEditor,
            Self::FinalScript(_) => StageId::FinalIntegrator,
        }
    }
}

/// Reads and checks an artifact against the schema of its producing stage.
pub fn parse(artifact: &Artifact) -> Result<ArtifactPayload, ArtifactSchemaError> {
    let text = std::fs::read_to_string(artifact.path()).map_err(|source| ArtifactSchemaError::Read {
        path: artifact.path.clone(),
        source,
    })?;
    parse_str(&text, artifact.producing_stage, artifact.path())
}

/// Checks a JSON document against the schema of `stage`.
pub fn parse_str(
    text: &str,
    stage: StageId,
    path: &Path,
) -> Result<ArtifactPayload, ArtifactSchemaError> {
    let shape = |source| ArtifactSchemaError::Shape {
        path: path.to_path_buf(),
        source,
    };
    let document: Value = serde_json::from_str(text).map_err(shape)?;

    if let Some(error) = document.get("error") {
        let message = error
            .as_str()
            .map_or_else(|| error.to_string(), str::to_string);
        return Err(ArtifactSchemaError::StageReportedError {
            path: path.to_path_buf(),
            message,
        });
    }

    let payload = match stage {
        StageId::ComicProcessor => {
            ArtifactPayload::ComicScript(Box::new(serde_json::from_value(document).map_err(shape)?))
        }
        StageId::ScriptEditor => {
            ArtifactPayload::ScriptReview(Box::new(serde_json::from_value(document).map_err(shape)?))
        }
        StageId::FinalIntegrator => {
            ArtifactPayload::FinalScript(Box::new(serde_json::from_value(document).map_err(shape)?))
        }
    };
    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path() -> &'static Path {
        Path::new("agent_1_output_1.json")
    }

    #[test]
    fn test_comic_script_keeps_extra_keys() {
        let text = json!({
            "source_file": "/comics/issue.cbz",
            "story_analysis": {"total_pages": 22},
            "script_generation_result": {"script": "HOOK...", "word_count": 180},
            "status": "success"
        })
        .to_string();

        let payload = parse_str(&text, StageId::ComicProcessor, path()).unwrap();

        let ArtifactPayload::ComicScript(script) = payload else {
            panic!("wrong payload");
        };
        assert_eq!(script.script_generation_result.script, "HOOK...");
        assert_eq!(script.script_generation_result.extra["word_count"], 180);
        assert_eq!(script.extra["status"], "success");
    }

    #[test]
    fn test_missing_required_key_is_shape_error() {
        let text = json!({"source_file": "x.cbz", "story_analysis": {}}).to_string();

        let err = parse_str(&text, StageId::ComicProcessor, path()).unwrap_err();
        assert!(matches!(err, ArtifactSchemaError::Shape { .. }));
        assert!(err.to_string().contains("script_generation_result"));
    }

    #[test]
    fn test_error_document_is_reported() {
        let text = json!({"error": "Story analysis failed: quota"}).to_string();

        let err = parse_str(&text, StageId::ScriptEditor, path()).unwrap_err();
        match err {
            ArtifactSchemaError::StageReportedError { message, .. } => {
                assert_eq!(message, "Story analysis failed: quota");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_json_is_shape_error() {
        let err = parse_str("not json", StageId::FinalIntegrator, path()).unwrap_err();
        assert!(matches!(err, ArtifactSchemaError::Shape { .. }));
    }

    #[test]
    fn test_review_allows_null_filename() {
        let text = json!({
            "comic_filename_reviewed": null,
            "accuracy_and_profile_review": {"accuracy_review": "ok"},
            "improvement_recommendations_for_profile": {"improvement_recommendations": "none"}
        })
        .to_string();

        let payload = parse_str(&text, StageId::ScriptEditor, path()).unwrap();
        assert_eq!(payload.stage(), StageId::ScriptEditor);
    }

    #[test]
    fn test_final_script_requires_titles() {
        let text = json!({
            "comic_filename_integrated": "issue.cbz",
            "final_script_package": {},
            "validation_results": {}
        })
        .to_string();

        assert!(parse_str(&text, StageId::FinalIntegrator, path()).is_err());
    }

    #[test]
    fn test_parse_reads_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("final_output_1.json");
        std::fs::write(
            &file,
            json!({
                "comic_filename_integrated": "issue.cbz",
                "final_script_package": {"final_script_package_content": "..."},
                "validation_results": {},
                "title_options": {"title_options_content": "1. ..."}
            })
            .to_string(),
        )
        .unwrap();

        let artifact = Artifact::new(&file, StageId::FinalIntegrator);
        assert!(matches!(parse(&artifact), Ok(ArtifactPayload::FinalScript(_))));

        let missing = Artifact::new(dir.path().join("gone.json"), StageId::FinalIntegrator);
        assert!(matches!(parse(&missing), Err(ArtifactSchemaError::Read { .. })));
    }
}
