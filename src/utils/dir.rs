use std::{env, io, path::PathBuf};

use anyhow::{Context, Result};

/// Name of the directory holding all jotter data (logs, to-do list, time log, settings).
pub const APPLICATION_DIR_NAME: &str = "jotter";

/// Returns the platform data directory for jotter, creating it when missing.
/// On Linux this is $XDG_DATA_HOME/jotter or $HOME/.local/share/jotter.
pub fn create_application_default_path() -> Result<PathBuf> {
    let mut path = platform_data_dir()?;
    path.push(APPLICATION_DIR_NAME);
    ensure_dir(path)
}

/// Creates `path` (and parents) if needed.
pub fn ensure_dir(path: PathBuf) -> Result<PathBuf> {
    match std::fs::create_dir_all(&path) {
        Ok(_) => Ok(path),
        Err(v) if v.kind() == io::ErrorKind::AlreadyExists => Ok(path),
        Err(v) => Err(v).with_context(|| format!("Couldn't create directory {path:?}")),
    }
}

#[cfg(windows)]
fn platform_data_dir() -> Result<PathBuf> {
    env::var("APPDATA")
        .map(PathBuf::from)
        .context("APPDATA should be present on Windows")
}

#[cfg(not(windows))]
fn platform_data_dir() -> Result<PathBuf> {
    env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|_| {
            env::var("HOME").map(|home| {
                let mut path = PathBuf::from(home);
                path.push(".local/share");
                path
            })
        })
        .context("Couldn't find neither XDG_DATA_HOME nor HOME")
}
