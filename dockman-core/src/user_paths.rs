//! Well-known per-user locations.

use crate::error::{DockError, Result};
use std::path::PathBuf;

/// Directory name of the default projects root under the home directory.
pub const PROJECTS_DIR_NAME: &str = "DockMan_Projects";

/// Get the user's home directory
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| DockError::Config("Could not determine home directory".to_string()))
}

/// DockMan's state directory (`~/.dockman`).
pub fn state_dir() -> Result<PathBuf> {
    Ok(home_dir()?.join(".dockman"))
}

/// Default configuration file (`~/.dockman/config.yaml`).
pub fn config_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("config.yaml"))
}

/// Default log file (`~/.dockman/dockman.log`).
pub fn log_file_path() -> Result<PathBuf> {
    Ok(state_dir()?.join("dockman.log"))
}
