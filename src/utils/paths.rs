use std::path::{Path, PathBuf};

use crate::error::VogonError;

/// Name of the settings file kept in the user's home directory.
pub const SETTINGS_FILE_NAME: &str = ".vogon.json";

/// Get the user's home directory
pub fn home_dir() -> Result<PathBuf, VogonError> {
    dirs::home_dir().ok_or(VogonError::MissingHomeDirectory)
}

/// Get the settings file path (~/.vogon.json)
pub fn get_settings_file() -> Result<PathBuf, VogonError> {
    Ok(home_dir()?.join(SETTINGS_FILE_NAME))
}

/// Get the host credential directory mounted by `--ssh` (~/.ssh)
pub fn get_ssh_dir() -> Result<PathBuf, VogonError> {
    Ok(home_dir()?.join(".ssh"))
}

/// Make `path` absolute against the current directory without touching the filesystem.
pub fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Last path segment, used as the repository name.
pub fn last_segment(path: &Path) -> Option<String> {
    path.components()
        .filter_map(|c| match c {
            std::path::Component::Normal(s) => s.to_str().map(str::to_string),
            _ => None,
        })
        .last()
}
