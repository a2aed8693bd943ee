use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Persisted operator preferences. Consumed at startup as the source of
/// the default-set mapping; see [`crate::defaults::DefaultSets`] for the
/// `default_sets` wire form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub default_sets: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingsReadState {
    Missing,
    Unreadable,
    Present(Settings),
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to encode settings json: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A missing file means first run; an unparseable file is reported as a
/// distinct state so callers can fall back to defaults without destroying
/// the broken file silently.
pub fn read_settings(path: &Path) -> Result<SettingsReadState, SettingsError> {
    if !path.exists() {
        return Ok(SettingsReadState::Missing);
    }
    let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    match serde_json::from_str::<Settings>(&raw) {
        Ok(settings) => Ok(SettingsReadState::Present(settings)),
        Err(_) => Ok(SettingsReadState::Unreadable),
    }
}

pub fn write_settings_atomic(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let text = serde_json::to_string_pretty(settings).map_err(SettingsError::Encode)?;
    write_text_atomic(path, &text).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Write-to-temp-then-rename so a crash mid-write never leaves a truncated
/// file behind. Shared with the CLI's registry rewrite.
pub fn write_text_atomic(path: &Path, text: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let tmp_path = temp_path_for(path);
    fs::write(&tmp_path, text)?;
    replace_file(&tmp_path, path)
}

fn replace_file(tmp_path: &Path, final_path: &Path) -> io::Result<()> {
    match fs::remove_file(final_path) {
        Ok(_) => {}
        Err(error) if error.kind() == io::ErrorKind::NotFound => {}
        Err(error) => {
            let _ = fs::remove_file(tmp_path);
            return Err(error);
        }
    }

    if let Err(error) = fs::rename(tmp_path, final_path) {
        let _ = fs::remove_file(tmp_path);
        return Err(error);
    }
    Ok(())
}

fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("settings.tmp");
    let tmp_name = format!("{file_name}.tmp");
    match path.parent() {
        Some(parent) => parent.join(tmp_name),
        None => PathBuf::from(tmp_name),
    }
}
