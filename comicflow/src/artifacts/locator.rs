//! Finds the newest artifact a stage wrote.

use crate::core::{Artifact, StageId};
use crate::utils::timestamps::from_system_time;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

const ARTIFACT_SUFFIX: &str = ".json";

/// Returns the most recently modified `<prefix>*.json` file in `directory`.
///
/// Only regular files count. Ties on modification time go to the
/// lexicographically greatest file name. Entries whose metadata cannot be
/// read are skipped; failing to read the directory itself is an error.
pub fn find_latest(directory: &Path, filename_prefix: &str) -> io::Result<Option<PathBuf>> {
    Ok(newest(directory, filename_prefix)?.map(|(path, _)| path))
}

/// Locates the artifact of `stage` in `directory`.
pub fn locate(directory: &Path, stage: StageId) -> io::Result<Option<Artifact>> {
    let found = newest(directory, stage.output_prefix())?;
    Ok(found.map(|(path, modified)| {
        debug!(stage = %stage, path = %path.display(), "Artifact located");
        Artifact::new(path, stage).with_modified_at(from_system_time(modified))
    }))
}

fn newest(directory: &Path, prefix: &str) -> io::Result<Option<(PathBuf, SystemTime)>> {
    let mut best: Option<(SystemTime, String, PathBuf)> = None;

    for entry in fs::read_dir(directory)? {
        let Ok(entry) = entry else { continue };
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.starts_with(prefix) || !name.ends_with(ARTIFACT_SUFFIX) {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        if !metadata.is_file() {
            continue;
        }
        let Ok(modified) = metadata.modified() else { continue };

        let newer = best
            .as_ref()
            .map_or(true, |(t, n, _)| (modified, name.as_str()) > (*t, n.as_str()));
        if newer {
            best = Some((modified, name, entry.path()));
        }
    }

    Ok(best.map(|(modified, _, path)| (path, modified)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str, modified: SystemTime) -> PathBuf {
        let path = dir.join(name);
        let file = File::create(&path).unwrap();
        file.set_modified(modified).unwrap();
        path
    }

    fn at(seconds: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000 + seconds)
    }

    #[test]
    fn test_picks_newest_by_mtime() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "agent_1_output_B.json", at(10));
        let newer = touch(dir.path(), "agent_1_output_A.json", at(20));

        let found = find_latest(dir.path(), "agent_1_output_").unwrap();
        assert_eq!(found, Some(newer));
    }

    #[test]
    fn test_tie_breaks_on_greatest_name() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "final_output_1.json", at(5));
        let greatest = touch(dir.path(), "final_output_2.json", at(5));

        let found = find_latest(dir.path(), "final_output_").unwrap();
        assert_eq!(found, Some(greatest));
    }

    #[test]
    fn test_ignores_other_prefixes_suffixes_and_directories() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "agent_2_output_1.json", at(50));
        touch(dir.path(), "agent_1_output_1.txt", at(50));
        fs::create_dir(dir.path().join("agent_1_output_dir.json")).unwrap();

        assert_eq!(find_latest(dir.path(), "agent_1_output_").unwrap(), None);
    }

    #[test]
    fn test_empty_directory() {
        let dir = TempDir::new().unwrap();
        assert_eq!(find_latest(dir.path(), "agent_1_output_").unwrap(), None);
    }

    #[test]
    fn test_missing_directory_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        assert!(find_latest(&missing, "agent_1_output_").is_err());
    }

    #[test]
    fn test_locate_builds_artifact() {
        let dir = TempDir::new().unwrap();
        let path = touch(dir.path(), "agent_2_output_77.json", at(1));

        let artifact = locate(dir.path(), StageId::ScriptEditor).unwrap().unwrap();

        assert_eq!(artifact.path, path);
        assert_eq!(artifact.producing_stage, StageId::ScriptEditor);
        assert_eq!(artifact.modified_at, Some(from_system_time(at(1))));
    }
}
