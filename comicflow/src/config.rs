//! Configuration for the pipeline.
//!
//! Every field has a default, so an empty TOML file (or no file at all) gives
//! the stock setup: three Python stage scripts in the current directory, a
//! ten minute timeout per stage and per-run working directories.

use crate::core::StageId;
use crate::errors::ConfigError;
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Directory the stages write their artifacts into.
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,

    /// Directory under which `results_<run_id>` directories are created.
    #[serde(default = "default_results_root")]
    pub results_root: PathBuf,

    /// Wall-clock budget for each stage, in seconds.
    #[serde(default = "default_stage_timeout")]
    pub stage_timeout_seconds: f64,

    /// How long to keep draining a stage's output after it exits or is killed.
    #[serde(default = "default_output_grace")]
    pub output_grace_seconds: f64,

    /// Run every pipeline in its own `<working_dir>/<run_id>` subdirectory.
    #[serde(default = "default_true")]
    pub isolate_runs: bool,

    /// Parse each artifact into its stage schema before forwarding it.
    #[serde(default = "default_true")]
    pub validate_artifacts: bool,

    /// The external program for each stage.
    #[serde(default)]
    pub stages: StagePrograms,

    /// Input validation rules.
    #[serde(default)]
    pub validation: ValidationConfig,
}

fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_results_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_stage_timeout() -> f64 {
    600.0
}

fn default_output_grace() -> f64 {
    1.0
}

fn default_true() -> bool {
    true
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            results_root: default_results_root(),
            stage_timeout_seconds: default_stage_timeout(),
            output_grace_seconds: default_output_grace(),
            isolate_runs: true,
            validate_artifacts: true,
            stages: StagePrograms::default(),
            validation: ValidationConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Sets the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = dir.into();
        self
    }

    /// Sets the results root.
    #[must_use]
    pub fn with_results_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_root = dir.into();
        self
    }

    /// Sets the per-stage timeout.
    #[must_use]
    pub fn with_stage_timeout(mut self, seconds: f64) -> Self {
        self.stage_timeout_seconds = seconds;
        self
    }

    /// Sets the output drain grace period.
    #[must_use]
    pub fn with_output_grace(mut self, seconds: f64) -> Self {
        self.output_grace_seconds = seconds;
        self
    }

    /// Enables or disables per-run working directories.
    #[must_use]
    pub fn with_isolated_runs(mut self, isolate: bool) -> Self {
        self.isolate_runs = isolate;
        self
    }

    /// Enables or disables artifact schema checks.
    #[must_use]
    pub fn with_artifact_validation(mut self, enabled: bool) -> Self {
        self.validate_artifacts = enabled;
        self
    }

    /// Replaces the program for one stage.
    #[must_use]
    pub fn with_stage_program(mut self, stage: StageId, program: StageProgram) -> Self {
        *self.stages.get_mut(stage) = program;
        self
    }

    /// Gets the stage timeout as a `Duration`.
    ///
    /// Values `validate` would reject saturate to `Duration::MAX`.
    #[must_use]
    pub fn stage_timeout(&self) -> Duration {
        Duration::try_from_secs_f64(self.stage_timeout_seconds).unwrap_or(Duration::MAX)
    }

    /// Gets the output grace period as a `Duration`.
    ///
    /// Values `validate` would reject saturate to `Duration::MAX`.
    #[must_use]
    pub fn output_grace(&self) -> Duration {
        Duration::try_from_secs_f64(self.output_grace_seconds).unwrap_or(Duration::MAX)
    }

    /// Checks that numeric values are usable and lists are non-empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let timeout = Duration::try_from_secs_f64(self.stage_timeout_seconds);
        if !matches!(timeout, Ok(d) if !d.is_zero()) {
            return Err(ConfigError::invalid(format!(
                "stage_timeout_seconds must be a positive number of seconds within range, got {}",
                self.stage_timeout_seconds
            )));
        }
        if Duration::try_from_secs_f64(self.output_grace_seconds).is_err() {
            return Err(ConfigError::invalid(format!(
                "output_grace_seconds must be a non-negative number of seconds within range, got {}",
                self.output_grace_seconds
            )));
        }
        if self.validation.archive_extensions.is_empty() {
            return Err(ConfigError::invalid(
                "validation.archive_extensions must list at least one extension",
            ));
        }
        if self.validation.credential_prefix.is_empty() {
            return Err(ConfigError::invalid("validation.credential_prefix must not be empty"));
        }
        for (stage, program) in self.stages.iter() {
            if program.program.as_os_str().is_empty() {
                return Err(ConfigError::invalid(format!(
                    "stages.{stage}.program must not be empty"
                )));
            }
        }
        Ok(())
    }
}

/// How to launch one stage: an optional interpreter plus a program path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgram {
    /// Interpreter to run the program with (e.g. `python3`), looked up on `PATH`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interpreter: Option<PathBuf>,

    /// The program or script itself.
    pub program: PathBuf,
}

impl StageProgram {
    /// Creates a program that is executed directly.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: None,
            program: program.into(),
        }
    }

    /// Creates a script that is run through an interpreter.
    #[must_use]
    pub fn script(interpreter: impl Into<PathBuf>, program: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: Some(interpreter.into()),
            program: program.into(),
        }
    }

    /// Returns the executable and the leading arguments needed to start it.
    #[must_use]
    pub fn launch_parts(&self) -> (OsString, Vec<OsString>) {
        match &self.interpreter {
            Some(interpreter) => (
                interpreter.clone().into_os_string(),
                vec![self.program.clone().into_os_string()],
            ),
            None => (self.program.clone().into_os_string(), Vec::new()),
        }
    }

    /// Returns a copy whose program path is absolute, resolved against `base`.
    #[must_use]
    pub fn resolved_against(&self, base: &Path) -> Self {
        let program = if self.program.is_absolute() {
            self.program.clone()
        } else {
            base.join(&self.program)
        };
        Self {
            interpreter: self.interpreter.clone(),
            program,
        }
    }
}

/// The programs for the three fixed stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePrograms {
    /// Stage 1.
    #[serde(default = "default_comic_processor")]
    pub comic_processor: StageProgram,
    /// Stage 2.
    #[serde(default = "default_script_editor")]
    pub script_editor: StageProgram,
    /// Stage 3.
    #[serde(default = "default_final_integrator")]
    pub final_integrator: StageProgram,
}

fn default_comic_processor() -> StageProgram {
    StageProgram::script("python3", "agent_1_comic_processor.py")
}

fn default_script_editor() -> StageProgram {
    StageProgram::script("python3", "agent_2_script_editor.py")
}

fn default_final_integrator() -> StageProgram {
    StageProgram::script("python3", "agent_3_final_integrator.py")
}

impl Default for StagePrograms {
    fn default() -> Self {
        Self {
            comic_processor: default_comic_processor(),
            script_editor: default_script_editor(),
            final_integrator: default_final_integrator(),
        }
    }
}

impl StagePrograms {
    /// Returns the program for a stage.
    #[must_use]
    pub fn get(&self, stage: StageId) -> &StageProgram {
        match stage {
            StageId::ComicProcessor => &self.comic_processor,
            StageId::ScriptEditor => &self.script_editor,
            StageId::FinalIntegrator => &self.final_integrator,
        }
    }

    /// Returns a mutable reference to the program for a stage.
    pub fn get_mut(&mut self, stage: StageId) -> &mut StageProgram {
        match stage {
            StageId::ComicProcessor => &mut self.comic_processor,
            StageId::ScriptEditor => &mut self.script_editor,
            StageId::FinalIntegrator => &mut self.final_integrator,
        }
    }

    /// Iterates over the stages and their programs in execution order.
    pub fn iter(&self) -> impl Iterator<Item = (StageId, &StageProgram)> {
        StageId::ALL.into_iter().map(move |stage| (stage, self.get(stage)))
    }
}

/// Rules the input validator applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Accepted comic archive extensions, without the leading dot.
    #[serde(default = "default_archive_extensions")]
    pub archive_extensions: Vec<String>,

    /// Required extension of the competitor data file.
    #[serde(default = "default_competitor_data_extension")]
    pub competitor_data_extension: String,

    /// Prefix every API credential starts with.
    #[serde(default = "default_credential_prefix")]
    pub credential_prefix: String,
}

fn default_archive_extensions() -> Vec<String> {
    vec!["cbr".to_string(), "cbz".to_string(), "zip".to_string()]
}

fn default_competitor_data_extension() -> String {
    "csv".to_string()
}

fn default_credential_prefix() -> String {
    "sk-".to_string()
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            archive_extensions: default_archive_extensions(),
            competitor_data_extension: default_competitor_data_extension(),
            credential_prefix: default_credential_prefix(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();

        assert_eq!(config.stage_timeout(), Duration::from_secs(600));
        assert!(config.isolate_runs);
        assert!(config.validate_artifacts);
        assert_eq!(config.validation.credential_prefix, "sk-");
        assert_eq!(
            config.stages.get(StageId::ScriptEditor).program,
            PathBuf::from("agent_2_script_editor.py")
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_from_file_with_overrides() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
stage_timeout_seconds = 30.5
isolate_runs = false

[stages.final_integrator]
program = "/opt/stages/integrate"

[validation]
archive_extensions = ["cbz"]
"#
        )
        .unwrap();

        let config = PipelineConfig::from_file(file.path()).unwrap();

        assert!((config.stage_timeout_seconds - 30.5).abs() < f64::EPSILON);
        assert!(!config.isolate_runs);
        assert_eq!(
            config.stages.final_integrator,
            StageProgram::new("/opt/stages/integrate")
        );
        assert_eq!(config.stages.comic_processor, default_comic_processor());
        assert_eq!(config.validation.archive_extensions, vec!["cbz".to_string()]);
        assert_eq!(config.validation.competitor_data_extension, "csv");
    }

    #[test]
    fn test_from_file_missing() {
        let err = PipelineConfig::from_file("/definitely/not/here.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_file_malformed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "stage_timeout_seconds = \"soon\"").unwrap();

        let err = PipelineConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate_rejects_bad_timeout() {
        assert!(PipelineConfig::new().with_stage_timeout(0.0).validate().is_err());
        assert!(PipelineConfig::new().with_stage_timeout(f64::NAN).validate().is_err());
        assert!(PipelineConfig::new().with_output_grace(-1.0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_out_of_range_durations() {
        let huge_timeout = PipelineConfig::new().with_stage_timeout(1e20);
        assert!(huge_timeout.validate().is_err());
        assert_eq!(huge_timeout.stage_timeout(), Duration::MAX);

        let huge_grace = PipelineConfig::new().with_output_grace(f64::INFINITY);
        assert!(huge_grace.validate().is_err());
        assert_eq!(huge_grace.output_grace(), Duration::MAX);

        let tiny = PipelineConfig::new().with_stage_timeout(1e-12);
        assert!(tiny.validate().is_err());
    }

    #[test]
    fn test_launch_parts() {
        let script = StageProgram::script("python3", "agent.py");
        let (exe, leading) = script.launch_parts();
        assert_eq!(exe, OsString::from("python3"));
        assert_eq!(leading, vec![OsString::from("agent.py")]);

        let direct = StageProgram::new("/usr/bin/stage");
        let (exe, leading) = direct.launch_parts();
        assert_eq!(exe, OsString::from("/usr/bin/stage"));
        assert!(leading.is_empty());
    }

    #[test]
    fn test_resolved_against_keeps_interpreter() {
        let program = StageProgram::script("python3", "agent.py").resolved_against(Path::new("/srv"));
        assert_eq!(program.program, PathBuf::from("/srv/agent.py"));
        assert_eq!(program.interpreter, Some(PathBuf::from("python3")));
    }

    #[test]
    fn test_with_stage_program() {
        let config = PipelineConfig::new()
            .with_stage_program(StageId::ComicProcessor, StageProgram::new("/bin/true"));
        assert_eq!(config.stages.comic_processor.program, PathBuf::from("/bin/true"));
    }
}
