//! Resource inventory synchronization and command orchestration.
//!
//! The engine polls the container runtime through a [`CommandRunner`], parses
//! its `|`-delimited listings into typed [`ResourceRecord`]s and publishes them
//! through an [`InventoryStore`] whose per-kind replacement is atomic. Mutating
//! operations run on worker tasks and finish with a refresh of the kinds they
//! touched.
//!
//! ```no_run
//! use dockman_engine::{Engine, Operation, ResourceKind};
//!
//! # async fn demo(engine: Engine) -> dockman_core::Result<()> {
//! engine.refresh(ResourceKind::Container).await?;
//! let handle = engine
//!     .dispatch(Operation::Stop { target: "abc123456789".into() })
//!     .await?;
//! let outcome = handle.wait().await?;
//! println!("{} steps, refreshed {:?}", outcome.steps.len(), outcome.refreshed);
//! # Ok(())
//! # }
//! ```

pub mod commands;
pub mod dispatch;
pub mod engine;
pub mod health;
pub mod parser;
pub mod projects;
pub mod refresh;
pub mod resource;
pub mod store;

#[cfg(any(test, feature = "test-helpers"))]
pub mod mock;

pub use dispatch::{Dispatcher, Operation, OperationHandle, OperationKind, OperationOutcome, StepPolicy};
pub use dockman_core::{CommandOutput, CommandRunner, DockError, ParseError, ResourceKind, Result, ValidationError};
pub use engine::{Engine, EngineSettings};
pub use health::{HealthPoller, HealthState, HEALTH_POLL_INTERVAL};
pub use parser::ParseOutcome;
pub use projects::ProjectWorkspace;
pub use refresh::{FilteredView, RefreshReport, RefreshSummary, Refresher};
pub use resource::{
    ContainerRecord, ImageRecord, NetworkRecord, ProjectRecord, ResourceRecord, RunningState,
};
pub use store::{InventorySnapshot, InventoryStore};
