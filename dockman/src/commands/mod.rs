// Command handlers

use crate::cli::{Args, Command};
use anyhow::{Context, Result};
use dockman_config::DockmanConfig;
use dockman_engine::Engine;
use tracing::debug;

pub mod inventory;
pub mod operations;
pub mod project;

/// State shared by every handler for one invocation.
pub struct Session {
    pub engine: Engine,
    pub config: DockmanConfig,
    pub json: bool,
}

fn load_config(args: &Args) -> Result<DockmanConfig> {
    match &args.config {
        Some(path) => Ok(DockmanConfig::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            .with_env_overrides()),
        None => DockmanConfig::load().context("Failed to load configuration"),
    }
}

/// Main command dispatcher
pub async fn execute_command(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let engine = Engine::from_config(&config)?;
    let session = Session {
        engine,
        config,
        json: args.json,
    };

    debug!("Handling {:?}", args.command);
    match args.command {
        Command::Status => inventory::handle_status(&session).await,
        Command::List { kind } => inventory::handle_list(&session, kind).await,
        Command::Search { query } => inventory::handle_search(&session, &query).await,
        Command::Watch => inventory::handle_watch(&session).await,
        Command::Project { command } => project::handle_project(&session, command).await,
        Command::Logs { id } => operations::handle_logs(&session, &id).await,
        Command::Inspect { id } => operations::handle_inspect(&session, &id).await,
        other => operations::handle_operation(&session, other).await,
    }
}
