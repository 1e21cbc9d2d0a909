//! Pre-flight input validation.
//!
//! Every check runs and contributes its own issue; nothing here fails fast
//! and nothing touches the filesystem beyond existence checks.

use crate::config::ValidationConfig;
use crate::errors::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Result of validating the pipeline inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `issues` is empty.
    pub valid: bool,
    /// One entry per failed check, in check order.
    pub issues: Vec<String>,
}

impl ValidationReport {
    fn from_issues(issues: Vec<String>) -> Self {
        Self {
            valid: issues.is_empty(),
            issues,
        }
    }
}

/// Checks pipeline preconditions before any stage runs.
#[derive(Debug, Clone)]
pub struct InputValidator {
    archive_extensions: Vec<String>,
    competitor_data_extension: String,
    credential_pattern: Regex,
}

impl InputValidator {
    /// Builds a validator from configuration.
    pub fn from_config(config: &ValidationConfig) -> Result<Self, ConfigError> {
        let pattern = format!(r"^{}\S+$", regex::escape(&config.credential_prefix));
        let credential_pattern = Regex::new(&pattern)
            .map_err(|e| ConfigError::invalid(format!("credential prefix: {e}")))?;

        Ok(Self {
            archive_extensions: config
                .archive_extensions
                .iter()
                .map(|ext| normalize_extension(ext))
                .collect(),
            competitor_data_extension: normalize_extension(&config.competitor_data_extension),
            credential_pattern,
        })
    }

    /// Validates the run inputs and the presence of every stage program.
    pub fn validate(
        &self,
        source_path: &Path,
        competitor_data_path: &Path,
        credential: &str,
        required_stage_programs: &[&Path],
    ) -> ValidationReport {
        let mut issues = Vec::new();

        if !source_path.exists() {
            issues.push(format!("CBR file not found: {}", source_path.display()));
        } else if !has_extension(source_path, &self.archive_extensions) {
            issues.push(format!(
                "Invalid file type. Expected {}: {}",
                describe_extensions(&self.archive_extensions),
                source_path.display()
            ));
        }

        if !competitor_data_path.exists() {
            issues.push(format!(
                "Competitor data file not found: {}",
                competitor_data_path.display()
            ));
        } else if !has_extension(
            competitor_data_path,
            std::slice::from_ref(&self.competitor_data_extension),
        ) {
            issues.push(format!(
                "Invalid competitor data format. Expected .{}: {}",
                self.competitor_data_extension,
                competitor_data_path.display()
            ));
        }

        for program in required_stage_programs {
            if !program.exists() {
                issues.push(format!("Stage program not found: {}", program.display()));
            }
        }

        if !self.credential_pattern.is_match(credential) {
            issues.push("Invalid API key format".to_string());
        }

        ValidationReport::from_issues(issues)
    }
}

fn normalize_extension(ext: &str) -> String {
    ext.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn has_extension(path: &Path, accepted: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| accepted.iter().any(|a| *a == ext))
}

/// Renders `["cbr", "cbz", "zip"]` as `.cbr, .cbz, or .zip`.
fn describe_extensions(extensions: &[String]) -> String {
    let dotted: Vec<String> = extensions.iter().map(|e| format!(".{e}")).collect();
    match dotted.as_slice() {
        [] => String::new(),
        [only] => only.clone(),
        [first, second] => format!("{first} or {second}"),
        [init @ .., last] => format!("{}, or {last}", init.join(", ")),
    }
}
