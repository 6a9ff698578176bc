//! Mutating operations against the container runtime.
//!
//! [`Dispatcher::dispatch`] validates an [`Operation`] before any mutating
//! command runs, then hands its command sequence to a worker task. The worker
//! runs the steps in order, refreshes the kinds the operation touched and
//! resolves the returned [`OperationHandle`].

use crate::commands;
use crate::refresh::Refresher;
use chrono::{DateTime, Utc};
use dockman_core::{
    validate_identifier, validate_name, CommandOutput, CommandRunner, DockError, DockerCommand,
    ResourceKind, Result, ValidationError,
};
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// A mutating action and its parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum Operation {
    Start { target: String },
    Stop { target: String },
    /// Forced removal.
    Remove { target: String },
    /// Stop, remove and run a fresh container. Uses the container's own image
    /// unless `image` is given.
    Rebuild { target: String, image: Option<String> },
    /// Export the container filesystem to a tar file.
    Backup { target: String, destination: PathBuf },
    /// Commit to `backup_<target>` and create a stopped container from it.
    Copy { target: String, new_name: String },
    /// Build an image from a project directory.
    Build { project: String, tag: String },
    RemoveImage { target: String },
    RemoveNetwork { target: String },
    /// Remove every unused container, image and network.
    PruneSystem,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Start,
    Stop,
    Remove,
    Rebuild,
    Backup,
    Copy,
    Build,
    RemoveImage,
    RemoveNetwork,
    PruneSystem,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::Start => "start",
            OperationKind::Stop => "stop",
            OperationKind::Remove => "remove",
            OperationKind::Rebuild => "rebuild",
            OperationKind::Backup => "backup",
            OperationKind::Copy => "copy",
            OperationKind::Build => "build",
            OperationKind::RemoveImage => "remove-image",
            OperationKind::RemoveNetwork => "remove-network",
            OperationKind::PruneSystem => "prune",
        };
        f.write_str(s)
    }
}

/// What happens to the remaining steps after one fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StepPolicy {
    StopOnFailure,
    /// Every step runs; the first failure is still reported.
    ContinueOnFailure,
}

impl Operation {
    /// Backup into `dir` as `<target>_backup.tar`.
    pub fn backup_into_dir(target: impl Into<String>, dir: &Path) -> Self {
        let target = target.into();
        let destination = dir.join(format!("{}_backup.tar", target));
        Operation::Backup {
            target,
            destination,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Start { .. } => OperationKind::Start,
            Operation::Stop { .. } => OperationKind::Stop,
            Operation::Remove { .. } => OperationKind::Remove,
            Operation::Rebuild { .. } => OperationKind::Rebuild,
            Operation::Backup { .. } => OperationKind::Backup,
            Operation::Copy { .. } => OperationKind::Copy,
            Operation::Build { .. } => OperationKind::Build,
            Operation::RemoveImage { .. } => OperationKind::RemoveImage,
            Operation::RemoveNetwork { .. } => OperationKind::RemoveNetwork,
            Operation::PruneSystem => OperationKind::PruneSystem,
        }
    }

    /// The targeted resource id or project name.
    pub fn target(&self) -> Option<&str> {
        match self {
            Operation::Start { target }
            | Operation::Stop { target }
            | Operation::Remove { target }
            | Operation::Rebuild { target, .. }
            | Operation::Backup { target, .. }
            | Operation::Copy { target, .. }
            | Operation::RemoveImage { target }
            | Operation::RemoveNetwork { target } => Some(target),
            Operation::Build { project, .. } => Some(project),
            Operation::PruneSystem => None,
        }
    }

    /// Kind the target belongs to.
    pub fn target_kind(&self) -> Option<ResourceKind> {
        match self.kind() {
            OperationKind::Build => Some(ResourceKind::Project),
            OperationKind::RemoveImage => Some(ResourceKind::Image),
            OperationKind::RemoveNetwork => Some(ResourceKind::Network),
            OperationKind::PruneSystem => None,
            _ => Some(ResourceKind::Container),
        }
    }

    /// Kinds refreshed once the steps have run.
    pub fn affected_kinds(&self) -> &'static [ResourceKind] {
        match self.kind() {
            OperationKind::Start
            | OperationKind::Stop
            | OperationKind::Remove
            | OperationKind::Backup => &[ResourceKind::Container],
            OperationKind::Rebuild | OperationKind::Copy => {
                &[ResourceKind::Container, ResourceKind::Image]
            }
            OperationKind::Build | OperationKind::RemoveImage => &[ResourceKind::Image],
            OperationKind::RemoveNetwork => &[ResourceKind::Network],
            OperationKind::PruneSystem => &ResourceKind::RUNTIME,
        }
    }

    pub fn policy(&self) -> StepPolicy {
        match self.kind() {
            OperationKind::Rebuild => StepPolicy::ContinueOnFailure,
            _ => StepPolicy::StopOnFailure,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target() {
            Some(target) => write!(f, "{} {}", self.kind(), target),
            None => write!(f, "{}", self.kind()),
        }
    }
}

/// Record of a finished operation.
#[derive(Debug, Clone, Serialize)]
pub struct OperationOutcome {
    pub id: Uuid,
    pub operation: Operation,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    /// Output of every step that ran, in order.
    pub steps: Vec<CommandOutput>,
    /// Index into `steps` of the first failed step.
    pub first_failure: Option<usize>,
    /// Kinds whose trailing refresh succeeded.
    pub refreshed: Vec<ResourceKind>,
    pub refresh_failures: Vec<(ResourceKind, String)>,
    /// Set when the handle was cancelled; the trailing refresh was skipped.
    pub cancelled: bool,
}

impl OperationOutcome {
    pub fn succeeded(&self) -> bool {
        self.first_failure.is_none()
    }

    pub fn failure(&self) -> Option<&CommandOutput> {
        self.first_failure.and_then(|i| self.steps.get(i))
    }

    /// Turn the first failed step into an error.
    pub fn into_result(self) -> Result<Self> {
        if let Some(step) = self.failure() {
            return Err(step.to_error());
        }
        Ok(self)
    }
}

/// Completion handle for a dispatched operation.
#[derive(Debug)]
pub struct OperationHandle {
    id: Uuid,
    operation: Operation,
    cancel: Arc<AtomicBool>,
    join: JoinHandle<OperationOutcome>,
}

impl OperationHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> OperationKind {
        self.operation.kind()
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    /// Suppress the trailing refresh. Commands already issued still run to
    /// completion.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::Release);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Wait for the steps and the trailing refresh to finish.
    pub async fn wait(self) -> Result<OperationOutcome> {
        self.join
            .await
            .map_err(|e| DockError::Internal(format!("operation worker failed: {}", e)))
    }
}

/// Validates and launches operations. Cheap to clone.
#[derive(Clone)]
pub struct Dispatcher {
    runner: Arc<dyn CommandRunner>,
    refresher: Refresher,
}

impl Dispatcher {
    pub fn new(runner: Arc<dyn CommandRunner>, refresher: Refresher) -> Self {
        Self { runner, refresher }
    }

    /// Validate `operation` and start it on a worker task.
    ///
    /// Validation failures and unknown targets are returned here, before any
    /// mutating command has been issued.
    pub async fn dispatch(&self, operation: Operation) -> Result<OperationHandle> {
        let this = self.clone();
        let op = operation.clone();
        let steps = tokio::task::spawn_blocking(move || this.prepare(&op))
            .await
            .map_err(|e| DockError::Internal(format!("validation task failed: {}", e)))??;

        let id = Uuid::new_v4();
        let cancel = Arc::new(AtomicBool::new(false));
        let span = info_span!("operation", id = %id, op = %operation);
        info!(parent: &span, "Dispatching {} ({} steps)", operation, steps.len());

        let join = tokio::spawn(
            execute(
                id,
                Arc::clone(&self.runner),
                self.refresher.clone(),
                operation.clone(),
                steps,
                Arc::clone(&cancel),
            )
            .instrument(span),
        );

        Ok(OperationHandle {
            id,
            operation,
            cancel,
            join,
        })
    }

    fn resolve(&self, kind: ResourceKind, target: &str) -> Result<crate::ResourceRecord> {
        validate_identifier(kind, target)?;
        self.refresher.store().resolve(kind, target)
    }

    /// Build the command sequence, checking every precondition first.
    pub fn prepare(&self, operation: &Operation) -> Result<Vec<DockerCommand>> {
        let steps = match operation {
            Operation::Start { target } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                vec![commands::start(record.id())]
            }
            Operation::Stop { target } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                vec![commands::stop(record.id())]
            }
            Operation::Remove { target } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                vec![commands::remove_forced(record.id())]
            }
            Operation::Rebuild { target, image } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                let container = record.as_container().ok_or_else(|| {
                    DockError::Internal(format!("'{}' is not a container record", target))
                })?;
                let image = match image {
                    Some(image) => validate_name("image", image)?.to_string(),
                    None => validate_name("image", &container.image)?.to_string(),
                };
                let name = if container.name.trim().is_empty() {
                    container.id.as_str()
                } else {
                    container.name.as_str()
                };
                vec![
                    commands::stop(&container.id),
                    commands::remove(&container.id),
                    commands::run_detached(name, &image),
                ]
            }
            Operation::Backup {
                target,
                destination,
            } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                check_writable(destination)?;
                vec![commands::export(record.id(), destination)]
            }
            Operation::Copy { target, new_name } => {
                let record = self.resolve(ResourceKind::Container, target)?;
                let new_name = validate_name("container name", new_name)?;
                self.check_name_free(new_name)?;
                let image = commands::copy_image_name(record.id());
                vec![
                    commands::commit(record.id(), &image),
                    commands::create(new_name, &image),
                ]
            }
            Operation::Build { project, tag } => {
                let project = self.refresher.workspace().get(project)?;
                let tag = validate_name("image tag", tag)?;
                vec![commands::build(tag, &project.path)]
            }
            Operation::RemoveImage { target } => {
                let record = self.resolve(ResourceKind::Image, target)?;
                vec![commands::remove_image(record.id())]
            }
            Operation::RemoveNetwork { target } => {
                let record = self.resolve(ResourceKind::Network, target)?;
                vec![commands::remove_network(record.id())]
            }
            Operation::PruneSystem => vec![commands::prune_system()],
        };

        Ok(steps)
    }

    // Checked against a fresh listing rather than the snapshot, since other
    // clients may have created containers since the last refresh.
    fn check_name_free(&self, name: &str) -> Result<()> {
        let output = self.runner.run(&commands::container_names()).into_result()?;
        if output.lines().iter().any(|existing| existing.trim() == name) {
            return Err(ValidationError::NameConflict {
                kind: ResourceKind::Container,
                name: name.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn check_writable(destination: &Path) -> Result<()> {
    let unwritable = |reason: String| -> DockError {
        ValidationError::UnwritableDestination {
            path: destination.display().to_string(),
            reason,
        }
        .into()
    };

    if destination.as_os_str().is_empty() || destination.is_dir() {
        return Err(unwritable("not a file path".to_string()));
    }
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    if !dir.is_dir() {
        return Err(unwritable(format!("directory {} does not exist", dir.display())));
    }
    tempfile::NamedTempFile::new_in(dir)
        .map(drop)
        .map_err(|e| unwritable(e.to_string()))
}

async fn execute(
    id: Uuid,
    runner: Arc<dyn CommandRunner>,
    refresher: Refresher,
    operation: Operation,
    steps: Vec<DockerCommand>,
    cancel: Arc<AtomicBool>,
) -> OperationOutcome {
    let started_at = Utc::now();
    let policy = operation.policy();
    let mut outputs: Vec<CommandOutput> = Vec::with_capacity(steps.len());
    let mut first_failure = None;

    for step in steps {
        let rendered = step.render(runner.program());
        let step_runner = Arc::clone(&runner);
        let output = tokio::task::spawn_blocking(move || step_runner.run(&step))
            .await
            .unwrap_or_else(|e| {
                CommandOutput::failure(rendered, format!("command worker failed: {}", e), None)
            });

        let failed = !output.ok;
        if failed {
            error!("Step failed: {} ({})", output.command, output.stderr.trim());
            if first_failure.is_none() {
                first_failure = Some(outputs.len());
            }
        }
        outputs.push(output);

        if failed && policy == StepPolicy::StopOnFailure {
            warn!("Skipping remaining steps");
            break;
        }
    }

    let mut refreshed = Vec::new();
    let mut refresh_failures = Vec::new();
    let cancelled = cancel.load(Ordering::Acquire);

    if cancelled {
        info!("Operation cancelled; skipping refresh");
    } else {
        let kinds = operation.affected_kinds();
        match tokio::task::spawn_blocking(move || refresher.refresh_kinds(kinds)).await {
            Ok(summary) => {
                refreshed = summary.reports.iter().map(|r| r.kind).collect();
                refresh_failures = summary
                    .failures
                    .into_iter()
                    .map(|(kind, e)| (kind, e.to_string()))
                    .collect();
            }
            Err(e) => {
                warn!("Refresh worker failed: {}", e);
                refresh_failures = kinds.iter().map(|k| (*k, e.to_string())).collect();
            }
        }
    }

    let outcome = OperationOutcome {
        id,
        operation,
        started_at,
        completed_at: Utc::now(),
        steps: outputs,
        first_failure,
        refreshed,
        refresh_failures,
        cancelled,
    };
    info!(
        "Operation finished: {}",
        if outcome.succeeded() { "success" } else { "failed" }
    );
    outcome
}
