//! DockMan configuration.
//!
//! Settings live in `~/.dockman/config.yaml`. Every field has a default so a
//! missing or partial file is valid; a handful of fields can be overridden
//! from the environment without touching the file.

use dockman_core::error::{DockError, Result};
use dockman_core::user_paths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Environment variable overriding [`DockmanConfig::docker_binary`].
pub const ENV_DOCKER_BIN: &str = "DOCKMAN_DOCKER_BIN";
/// Environment variable overriding [`DockmanConfig::projects_root`].
pub const ENV_PROJECTS_ROOT: &str = "DOCKMAN_PROJECTS_ROOT";

/// Root structure of `config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockmanConfig {
    /// Container runtime client executable
    #[serde(default = "default_docker_binary")]
    pub docker_binary: String,

    /// Directory holding one subdirectory per project (`~` is expanded)
    #[serde(default = "default_projects_root")]
    pub projects_root: String,

    /// Value shown when live stats or size are unavailable for a container
    #[serde(default = "default_placeholder")]
    pub placeholder: String,

    /// Default destination directory for container backups (`~` is expanded)
    #[serde(default = "default_backup_dir")]
    pub backup_dir: String,
}

fn default_docker_binary() -> String {
    "docker".to_string()
}

fn default_projects_root() -> String {
    format!("~/{}", user_paths::PROJECTS_DIR_NAME)
}

fn default_placeholder() -> String {
    "N/A".to_string()
}

fn default_backup_dir() -> String {
    "~/.dockman/backups".to_string()
}

impl Default for DockmanConfig {
    fn default() -> Self {
        Self {
            docker_binary: default_docker_binary(),
            projects_root: default_projects_root(),
            placeholder: default_placeholder(),
            backup_dir: default_backup_dir(),
        }
    }
}

impl DockmanConfig {
    /// Load configuration from the standard location, creating it with defaults when missing.
    ///
    /// Environment overrides are applied after the file is read.
    pub fn load() -> Result<Self> {
        let config_path = user_paths::config_path()?;

        let config = if config_path.exists() {
            Self::load_from_path(&config_path)?
        } else {
            info!("Creating default configuration at {}", config_path.display());
            let default_config = Self::default();
            default_config.save_to_path(&config_path)?;
            default_config
        };

        Ok(config.with_env_overrides())
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_yaml_ng::from_str(&contents)
            .map_err(|e| DockError::Config(format!("Invalid configuration in {}: {}", path.display(), e)))?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to a specific path
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let yaml = serde_yaml_ng::to_string(self)?;
        std::fs::write(path, yaml)?;

        Ok(())
    }

    /// Apply `DOCKMAN_*` environment overrides.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(binary) = lookup(ENV_DOCKER_BIN).filter(|v| !v.trim().is_empty()) {
            self.docker_binary = binary;
        }
        if let Some(root) = lookup(ENV_PROJECTS_ROOT).filter(|v| !v.trim().is_empty()) {
            self.projects_root = root;
        }
        self
    }

    /// Projects root with `~` and environment variables expanded.
    pub fn projects_root_path(&self) -> Result<PathBuf> {
        expand_path(&self.projects_root)
    }

    /// Backup directory with `~` and environment variables expanded.
    pub fn backup_dir_path(&self) -> Result<PathBuf> {
        expand_path(&self.backup_dir)
    }
}

fn expand_path(raw: &str) -> Result<PathBuf> {
    let expanded = shellexpand::full(raw)
        .map_err(|e| DockError::Config(format!("Cannot expand path '{}': {}", raw, e)))?;
    Ok(PathBuf::from(expanded.as_ref()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "docker_binary: podman\n").unwrap();

        let config = DockmanConfig::load_from_path(&path).unwrap();
        assert_eq!(config.docker_binary, "podman");
        assert_eq!(config.placeholder, "N/A");
        assert_eq!(config.projects_root, "~/DockMan_Projects");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        let config = DockmanConfig {
            projects_root: "/srv/projects".to_string(),
            ..Default::default()
        };

        config.save_to_path(&path).unwrap();
        let reloaded = DockmanConfig::load_from_path(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_invalid_yaml_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "placeholder: [unclosed\n").unwrap();

        let err = DockmanConfig::load_from_path(&path).unwrap_err();
        assert!(matches!(err, DockError::Config(_)));
    }

    #[test]
    fn test_overrides_replace_file_values() {
        let env: HashMap<&str, &str> = [
            (ENV_DOCKER_BIN, "/usr/local/bin/docker"),
            (ENV_PROJECTS_ROOT, "  "),
        ]
        .into_iter()
        .collect();

        let config = DockmanConfig::default().with_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(config.docker_binary, "/usr/local/bin/docker");
        // Blank override is ignored
        assert_eq!(config.projects_root, "~/DockMan_Projects");
    }

    #[test]
    fn test_absolute_paths_are_kept() {
        let config = DockmanConfig {
            projects_root: "/srv/projects".to_string(),
            backup_dir: "/var/backups/dockman".to_string(),
            ..Default::default()
        };
        assert_eq!(config.projects_root_path().unwrap(), PathBuf::from("/srv/projects"));
        assert_eq!(config.backup_dir_path().unwrap(), PathBuf::from("/var/backups/dockman"));
    }
}
