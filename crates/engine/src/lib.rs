use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod defaults;
pub mod inject;
pub mod region;
pub mod set;
pub mod settings;

pub use defaults::{DefaultSets, BASIC_SET_NAME};
pub use inject::{
    ExperimentRegistry, InjectionSession, InjectionState, MemoryExperimentRegistry,
    RegistryUnavailable,
};
pub use region::{
    BiomeMapRaster, Color, ExactSearchMode, RasterError, Region, RegionAttribute, RegionRegistry,
};
pub use set::{
    apply_set, decode_biome_map, list_set_names, parse_attribute_file, parse_science_results,
    ApplyReport, ApplySummary, AttributeField, AttributeFileError, MalformedScienceLine,
    MapDecodeError, RegionApplyError, RegionErrorKind, RegionOutcome, ScienceApplyError,
    ScienceOutcome, ScienceParse, ScienceResultEntry, SetDiscoveryError, SetLayout,
    SCIENCE_RESULTS_FILE,
};
pub use settings::{
    read_settings, write_settings_atomic, write_text_atomic, Settings, SettingsError,
    SettingsReadState,
};

pub const ROOT_ENV_VAR: &str = "BIOMESET_ROOT";
pub const SETS_DIR_NAME: &str = "biome-sets";
const SETTINGS_FILE_NAME: &str = "settings.json";

/// Resolved filesystem layout of one install. Everything the engine reads
/// or writes lives under `root`.
#[derive(Debug, Clone)]
pub struct InstallPaths {
    pub root: PathBuf,
    pub sets_dir: PathBuf,
    pub settings_path: PathBuf,
}

impl InstallPaths {
    /// Builds the layout for an already-known root without validating it.
    /// Used by callers that take the root from an explicit flag or a test
    /// fixture.
    pub fn for_root(root: PathBuf) -> Self {
        let sets_dir = root.join(SETS_DIR_NAME);
        let settings_path = root.join(SETTINGS_FILE_NAME);
        Self {
            root,
            sets_dir,
            settings_path,
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to resolve current executable path: {0}")]
    CurrentExe(#[source] std::io::Error),
    #[error("current executable path has no parent directory: {0}")]
    ExeHasNoParent(PathBuf),
    #[error(
        "{var} is set but does not point to a valid install root: {path}\n\
A valid root must contain a {sets_dir}/ directory."
    )]
    InvalidEnvRoot {
        var: &'static str,
        path: PathBuf,
        sets_dir: &'static str,
    },
    #[error(
        "Could not detect an install root by walking upward from the executable directory: {start_dir}\n\
Expected a directory containing {sets_dir}/.\n\
Set {env_var} explicitly, for example:\n\
PowerShell: $env:{env_var}=\"C:\\path\\to\\install\"\n\
Bash/zsh: export {env_var}=\"/path/to/install\""
    )]
    RootNotFound {
        start_dir: PathBuf,
        env_var: &'static str,
        sets_dir: &'static str,
    },
}

/// Resolves the install root: the `BIOMESET_ROOT` env var when set (and
/// validated), otherwise the nearest ancestor of the executable directory
/// that contains a `biome-sets/` directory.
pub fn resolve_install_paths() -> Result<InstallPaths, StartupError> {
    let root = resolve_root()?;
    Ok(InstallPaths::for_root(root))
}

fn resolve_root() -> Result<PathBuf, StartupError> {
    match env::var(ROOT_ENV_VAR) {
        Ok(value) => {
            let raw = PathBuf::from(value);
            let normalized = normalize_path(&raw);
            if is_install_root(&normalized) {
                Ok(normalized)
            } else {
                Err(StartupError::InvalidEnvRoot {
                    var: ROOT_ENV_VAR,
                    path: normalized,
                    sets_dir: SETS_DIR_NAME,
                })
            }
        }
        Err(env::VarError::NotPresent) => {
            let exe = env::current_exe().map_err(StartupError::CurrentExe)?;
            let exe_dir = exe
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| StartupError::ExeHasNoParent(exe.clone()))?;

            for candidate in exe_dir.ancestors() {
                if is_install_root(candidate) {
                    return Ok(normalize_path(candidate));
                }
            }

            Err(StartupError::RootNotFound {
                start_dir: normalize_path(&exe_dir),
                env_var: ROOT_ENV_VAR,
                sets_dir: SETS_DIR_NAME,
            })
        }
        Err(source) => Err(StartupError::EnvVar {
            var: ROOT_ENV_VAR,
            source,
        }),
    }
}

fn is_install_root(path: &Path) -> bool {
    path.join(SETS_DIR_NAME).is_dir()
}

fn normalize_path(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn install_root_requires_sets_directory() {
        let temp = TempDir::new().expect("tempdir");
        assert!(!is_install_root(temp.path()));
        fs::create_dir_all(temp.path().join(SETS_DIR_NAME)).expect("sets dir");
        assert!(is_install_root(temp.path()));
    }

    #[test]
    fn for_root_lays_out_expected_paths() {
        let paths = InstallPaths::for_root(PathBuf::from("/opt/sim"));
        assert_eq!(paths.sets_dir, PathBuf::from("/opt/sim/biome-sets"));
        assert_eq!(paths.settings_path, PathBuf::from("/opt/sim/settings.json"));
    }
}
