//! Project directories under the projects root.
//!
//! A project exists exactly when its directory exists; nothing else records it.

use crate::resource::ProjectRecord;
use dockman_core::validation::validate_project_name;
use dockman_core::{DockError, ResourceKind, Result, ValidationError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const DOCKERFILE: &str = "FROM python:3.8-slim
WORKDIR /app
COPY requirements.txt requirements.txt
RUN pip install -r requirements.txt
COPY . .
CMD [\"python\", \"app.py\"]
";

const REQUIREMENTS: &str = "flask\n";

const APP_PY: &str = "from flask import Flask
app = Flask(__name__)

@app.route(\"/\")
def hello():
    return 'Hello from Docker!'

if __name__ == '__main__':
    app.run(host='0.0.0.0', port=5000)
";

/// Starter files, relative to the project directory, in display order.
pub const EDITABLE_FILES: [&str; 3] = ["Dockerfile", "requirements.txt", "app/app.py"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectWorkspace {
    root: PathBuf,
}

impl ProjectWorkspace {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root if it does not exist yet.
    pub fn ensure_root(&self) -> Result<()> {
        if !self.root.is_dir() {
            info!("Creating projects root {}", self.root.display());
            fs::create_dir_all(&self.root)?;
        }
        Ok(())
    }

    /// Validated directory for `name`. Does not check that it exists.
    pub fn project_dir(&self, name: &str) -> Result<PathBuf> {
        let name = validate_project_name(name)?;
        Ok(self.root.join(name))
    }

    pub fn exists(&self, name: &str) -> bool {
        self.project_dir(name).map(|p| p.is_dir()).unwrap_or(false)
    }

    /// Sorted names of every subdirectory of the root.
    pub fn list_names(&self) -> Result<Vec<String>> {
        self.ensure_root()?;
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        debug!("Found {} project directories", names.len());
        Ok(names)
    }

    /// Look up an existing project.
    pub fn get(&self, name: &str) -> Result<ProjectRecord> {
        let path = self.project_dir(name)?;
        if !path.is_dir() {
            return Err(DockError::not_found(ResourceKind::Project, name.trim()));
        }
        Ok(ProjectRecord {
            name: name.trim().to_string(),
            path,
        })
    }

    /// Scaffold a new Python web project.
    pub fn create(&self, name: &str) -> Result<ProjectRecord> {
        let path = self.project_dir(name)?;
        let name = name.trim();
        if path.exists() {
            return Err(ValidationError::NameConflict {
                kind: ResourceKind::Project,
                name: name.to_string(),
            }
            .into());
        }

        self.ensure_root()?;
        fs::create_dir_all(path.join("app"))?;
        fs::write(path.join("Dockerfile"), DOCKERFILE)?;
        fs::write(path.join("requirements.txt"), REQUIREMENTS)?;
        fs::write(path.join("app").join("app.py"), APP_PY)?;
        info!("Created project '{}' at {}", name, path.display());

        Ok(ProjectRecord {
            name: name.to_string(),
            path,
        })
    }

    /// Remove a project directory and everything in it.
    pub fn delete(&self, name: &str) -> Result<()> {
        let project = self.get(name)?;
        fs::remove_dir_all(&project.path)?;
        info!("Deleted project '{}'", project.name);
        Ok(())
    }

    /// Starter files that still exist in the project.
    pub fn editable_files(&self, name: &str) -> Result<Vec<PathBuf>> {
        let project = self.get(name)?;
        Ok(EDITABLE_FILES
            .iter()
            .map(|f| project.path.join(f))
            .filter(|p| p.is_file())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn workspace() -> (ProjectWorkspace, TempDir) {
        let dir = TempDir::new().unwrap();
        (ProjectWorkspace::new(dir.path().join("DockMan_Projects")), dir)
    }

    #[test]
    fn test_create_scaffolds_starter_files() {
        let (ws, _dir) = workspace();
        let project = ws.create("  webapp ").unwrap();

        assert_eq!(project.name, "webapp");
        let dockerfile = fs::read_to_string(project.path.join("Dockerfile")).unwrap();
        assert!(dockerfile.starts_with("FROM python:3.8-slim"));
        assert_eq!(
            fs::read_to_string(project.path.join("requirements.txt")).unwrap(),
            "flask\n"
        );
        assert!(project.path.join("app/app.py").is_file());
        assert_eq!(ws.editable_files("webapp").unwrap().len(), 3);
    }

    #[test]
    fn test_create_rejects_existing_and_bad_names() {
        let (ws, _dir) = workspace();
        ws.create("webapp").unwrap();

        let err = ws.create("webapp").unwrap_err();
        assert!(matches!(
            err,
            DockError::Validation(ValidationError::NameConflict { .. })
        ));
        assert!(matches!(
            ws.create("  ").unwrap_err(),
            DockError::Validation(ValidationError::EmptyName { .. })
        ));
        assert!(matches!(
            ws.create("../escape").unwrap_err(),
            DockError::Validation(ValidationError::InvalidProjectName { .. })
        ));
    }

    #[test]
    fn test_list_names_creates_root_and_lists_dirs_only() {
        let (ws, _dir) = workspace();
        assert!(ws.list_names().unwrap().is_empty());
        assert!(ws.root().is_dir());

        ws.create("b-project").unwrap();
        ws.create("a-project").unwrap();
        fs::write(ws.root().join("stray.txt"), "x").unwrap();

        assert_eq!(ws.list_names().unwrap(), vec!["a-project", "b-project"]);
    }

    #[test]
    fn test_delete_removes_tree() {
        let (ws, _dir) = workspace();
        ws.create("webapp").unwrap();
        ws.delete("webapp").unwrap();

        assert!(!ws.exists("webapp"));
        assert!(matches!(
            ws.delete("webapp").unwrap_err(),
            DockError::NotFound { kind: ResourceKind::Project, .. }
        ));
    }

    #[test]
    fn test_editable_files_skips_removed_files() {
        let (ws, _dir) = workspace();
        let project = ws.create("webapp").unwrap();
        fs::remove_file(project.path.join("requirements.txt")).unwrap();

        let files = ws.editable_files("webapp").unwrap();
        assert_eq!(
            files,
            vec![project.path.join("Dockerfile"), project.path.join("app/app.py")]
        );
    }
}
