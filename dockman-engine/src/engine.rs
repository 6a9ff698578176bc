//! Facade tying the runner, store, refresher, dispatcher and poller together.

use crate::commands;
use crate::dispatch::{Dispatcher, Operation, OperationHandle};
use crate::health::{HealthPoller, HealthState};
use crate::projects::ProjectWorkspace;
use crate::refresh::{FilteredView, RefreshReport, RefreshSummary, Refresher};
use crate::resource::ProjectRecord;
use crate::store::{InventorySnapshot, InventoryStore};
use dockman_config::DockmanConfig;
use dockman_core::{
    validate_identifier, CommandOutput, CommandRunner, DockError, DockerCli, DockerCommand,
    ResourceKind, Result,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// Engine settings resolved from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub projects_root: PathBuf,
    pub backup_dir: PathBuf,
    pub placeholder: String,
}

impl EngineSettings {
    pub fn from_config(config: &DockmanConfig) -> Result<Self> {
        Ok(Self {
            projects_root: config.projects_root_path()?,
            backup_dir: config.backup_dir_path()?,
            placeholder: config.placeholder.clone(),
        })
    }
}

/// Cheap to clone; clones share the store and health state.
#[derive(Clone)]
pub struct Engine {
    runner: Arc<dyn CommandRunner>,
    refresher: Refresher,
    dispatcher: Dispatcher,
    health: HealthState,
    settings: EngineSettings,
}

impl Engine {
    pub fn new(runner: Arc<dyn CommandRunner>, settings: EngineSettings) -> Self {
        let store = Arc::new(InventoryStore::new());
        let refresher = Refresher::new(
            Arc::clone(&runner),
            store,
            ProjectWorkspace::new(settings.projects_root.clone()),
            settings.placeholder.clone(),
        );
        let dispatcher = Dispatcher::new(Arc::clone(&runner), refresher.clone());

        Self {
            runner,
            refresher,
            dispatcher,
            health: HealthState::new(),
            settings,
        }
    }

    /// Engine backed by the configured runtime client.
    pub fn from_config(config: &DockmanConfig) -> Result<Self> {
        let settings = EngineSettings::from_config(config)?;
        let cli = DockerCli::new(config.docker_binary.clone());
        if !cli.is_installed() {
            debug!("'{}' was not found on PATH", config.docker_binary);
        }
        Ok(Self::new(Arc::new(cli), settings))
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    pub fn store(&self) -> &Arc<InventoryStore> {
        self.refresher.store()
    }

    pub fn workspace(&self) -> &ProjectWorkspace {
        self.refresher.workspace()
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        self.store().snapshot()
    }

    /// Receive every snapshot the store publishes.
    pub fn subscribe(&self) -> watch::Receiver<Arc<InventorySnapshot>> {
        self.store().subscribe()
    }

    pub fn health(&self) -> &HealthState {
        &self.health
    }

    async fn blocking<T, F>(&self, task: F) -> Result<T>
    where
        F: FnOnce(Refresher) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let refresher = self.refresher.clone();
        tokio::task::spawn_blocking(move || task(refresher))
            .await
            .map_err(|e| DockError::Internal(format!("worker task failed: {}", e)))?
    }

    pub async fn refresh(&self, kind: ResourceKind) -> Result<RefreshReport> {
        self.blocking(move |r| r.refresh(kind)).await
    }

    pub async fn refresh_all(&self) -> Result<RefreshSummary> {
        self.blocking(|r| Ok(r.refresh_all())).await
    }

    /// Search every kind without touching the stored snapshot.
    pub async fn search(&self, query: &str) -> Result<FilteredView> {
        let query = query.to_string();
        self.blocking(move |r| r.refresh_filtered(&query)).await
    }

    pub async fn dispatch(&self, operation: Operation) -> Result<OperationHandle> {
        self.dispatcher.dispatch(operation).await
    }

    pub async fn create_project(&self, name: &str) -> Result<ProjectRecord> {
        let name = name.to_string();
        self.blocking(move |r| {
            let project = r.workspace().create(&name)?;
            r.store().upsert_project(project.clone());
            Ok(project)
        })
        .await
    }

    pub async fn delete_project(&self, name: &str) -> Result<()> {
        let name = name.to_string();
        self.blocking(move |r| {
            r.workspace().delete(&name)?;
            if let Err(e) = r.store().remove_project(name.trim()) {
                debug!("Project was not in the inventory: {}", e);
            }
            Ok(())
        })
        .await
    }

    pub fn editable_files(&self, name: &str) -> Result<Vec<PathBuf>> {
        self.workspace().editable_files(name)
    }

    async fn query(&self, id: &str, command: DockerCommand) -> Result<CommandOutput> {
        validate_identifier(ResourceKind::Container, id)?;
        let runner = Arc::clone(&self.runner);
        tokio::task::spawn_blocking(move || runner.run(&command))
            .await
            .map_err(|e| DockError::Internal(format!("worker task failed: {}", e)))?
            .into_result()
    }

    /// Captured `logs` output of a container.
    pub async fn logs(&self, id: &str) -> Result<CommandOutput> {
        self.query(id, commands::logs(id)).await
    }

    /// Captured `inspect` output of a container.
    pub async fn inspect(&self, id: &str) -> Result<CommandOutput> {
        self.query(id, commands::inspect(id)).await
    }

    /// Run one liveness probe now.
    pub async fn probe_health(&self) -> bool {
        HealthPoller::new(Arc::clone(&self.runner), self.health.clone())
            .tick()
            .await
    }

    /// Start the background liveness loop writing into [`Engine::health`].
    pub fn start_health_poller(&self) -> JoinHandle<()> {
        HealthPoller::new(Arc::clone(&self.runner), self.health.clone()).spawn()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedRunner;
    use tempfile::TempDir;

    fn engine(runner: ScriptedRunner) -> (Engine, Arc<ScriptedRunner>, TempDir) {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(runner);
        let settings = EngineSettings {
            projects_root: dir.path().join("DockMan_Projects"),
            backup_dir: dir.path().join("backups"),
            placeholder: "N/A".to_string(),
        };
        (Engine::new(runner.clone(), settings), runner, dir)
    }

    #[test]
    fn test_settings_from_config_expand_paths() {
        let config = DockmanConfig {
            projects_root: "/srv/projects".to_string(),
            backup_dir: "/srv/backups".to_string(),
            placeholder: "-".to_string(),
            ..DockmanConfig::default()
        };
        let settings = EngineSettings::from_config(&config).unwrap();
        assert_eq!(settings.projects_root, PathBuf::from("/srv/projects"));
        assert_eq!(settings.placeholder, "-");
    }

    #[tokio::test]
    async fn test_project_lifecycle_updates_store() {
        let (engine, _, _dir) = engine(ScriptedRunner::new());
        let mut rx = engine.subscribe();

        engine.create_project("webapp").await.unwrap();
        assert!(engine
            .snapshot()
            .get(ResourceKind::Project, "webapp")
            .is_some());
        assert!(rx.has_changed().unwrap());
        let _ = rx.borrow_and_update();

        assert_eq!(engine.editable_files("webapp").unwrap().len(), 3);

        engine.delete_project("webapp").await.unwrap();
        assert!(engine.snapshot().records_of(ResourceKind::Project).is_empty());
        assert!(!engine.workspace().exists("webapp"));
        assert!(rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_logs_validates_then_captures_output() {
        let runner = ScriptedRunner::new().on(
            "logs abc123456789",
            CommandOutput::success("logs", "listening on :80\n"),
        );
        let (engine, runner, _dir) = engine(runner);

        let output = engine.logs("abc123456789").await.unwrap();
        assert_eq!(output.stdout, "listening on :80\n");

        assert!(engine.inspect("bad id").await.is_err());
        assert_eq!(runner.calls(), vec!["logs abc123456789"]);
    }

    #[tokio::test]
    async fn test_probe_health_sets_flag() {
        let runner = ScriptedRunner::new().on("info", CommandOutput::success("info", ""));
        let (engine, _, _dir) = engine(runner);

        assert!(!engine.health().is_running());
        assert!(engine.probe_health().await);
        assert!(engine.health().is_running());
    }
}
