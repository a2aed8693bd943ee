use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::InstallPaths;

pub const SCIENCE_RESULTS_FILE: &str = "ScienceResults.txt";
pub const MAP_FILE_EXTENSION: &str = "png";
pub const ATTRIBUTE_FILE_EXTENSION: &str = "att";

#[derive(Debug, Error)]
pub enum SetDiscoveryError {
    #[error("failed to read sets directory {path}: {source}")]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to read directory entry in {path}: {source}")]
    ReadDirEntry {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Lists the biome set folders available under the install root, sorted by
/// name. Plain files inside the sets directory are ignored.
pub fn list_set_names(paths: &InstallPaths) -> Result<Vec<String>, SetDiscoveryError> {
    let entries = fs::read_dir(&paths.sets_dir).map_err(|source| SetDiscoveryError::ReadDir {
        path: paths.sets_dir.clone(),
        source,
    })?;
    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| SetDiscoveryError::ReadDirEntry {
            path: paths.sets_dir.clone(),
            source,
        })?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        if let Some(name) = path.file_name().and_then(|name| name.to_str()) {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

/// Path helpers for the files one set may provide.
#[derive(Debug, Clone)]
pub struct SetLayout {
    set_dir: PathBuf,
}

impl SetLayout {
    pub fn new(paths: &InstallPaths, set_name: &str) -> Self {
        Self {
            set_dir: paths.sets_dir.join(set_name),
        }
    }

    pub fn set_dir(&self) -> &Path {
        &self.set_dir
    }

    pub fn map_path(&self, region_name: &str) -> PathBuf {
        self.set_dir
            .join(format!("{region_name}.{MAP_FILE_EXTENSION}"))
    }

    pub fn attributes_path(&self, region_name: &str) -> PathBuf {
        self.set_dir
            .join(format!("{region_name}.{ATTRIBUTE_FILE_EXTENSION}"))
    }

    pub fn science_results_path(&self) -> PathBuf {
        self.set_dir.join(SCIENCE_RESULTS_FILE)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn lists_set_folders_sorted_and_ignores_files() {
        let temp = TempDir::new().expect("tempdir");
        let paths = InstallPaths::for_root(temp.path().to_path_buf());
        fs::create_dir_all(paths.sets_dir.join("Zeta")).expect("zeta");
        fs::create_dir_all(paths.sets_dir.join("Alpine")).expect("alpine");
        fs::write(paths.sets_dir.join("notes.txt"), "stray").expect("stray");

        let names = list_set_names(&paths).expect("list");
        assert_eq!(names, vec!["Alpine".to_string(), "Zeta".to_string()]);
    }

    #[test]
    fn missing_sets_directory_is_an_error() {
        let temp = TempDir::new().expect("tempdir");
        let paths = InstallPaths::for_root(temp.path().join("nowhere"));
        assert!(matches!(
            list_set_names(&paths),
            Err(SetDiscoveryError::ReadDir { .. })
        ));
    }

    #[test]
    fn layout_builds_expected_file_paths() {
        let temp = TempDir::new().expect("tempdir");
        let paths = InstallPaths::for_root(temp.path().to_path_buf());
        let layout = SetLayout::new(&paths, "Alpine");
        assert_eq!(
            layout.map_path("Highlands"),
            paths.sets_dir.join("Alpine").join("Highlands.png")
        );
        assert_eq!(
            layout.attributes_path("Highlands"),
            paths.sets_dir.join("Alpine").join("Highlands.att")
        );
        assert_eq!(
            layout.science_results_path(),
            paths.sets_dir.join("Alpine").join("ScienceResults.txt")
        );
    }
}
