//! Mutating container, image and network commands.

use super::Session;
use crate::cli::Command;
use crate::output::{print_json, print_outcome};
use anyhow::{bail, Context, Result};
use dockman_core::{dm_println, dm_progress, dm_success, CommandOutput};
use dockman_engine::{Operation, ResourceKind};
use tracing::debug;

fn operation_for(session: &Session, command: Command) -> Result<Operation> {
    let operation = match command {
        Command::Start { id } => Operation::Start { target: id },
        Command::Stop { id } => Operation::Stop { target: id },
        Command::Rm { id } => Operation::Remove { target: id },
        Command::Rebuild { id, image } => Operation::Rebuild { target: id, image },
        Command::Backup { id, output } => match output {
            Some(destination) => Operation::Backup {
                target: id,
                destination,
            },
            None => {
                let dir = &session.engine.settings().backup_dir;
                std::fs::create_dir_all(dir).with_context(|| {
                    format!("Failed to create backup directory {}", dir.display())
                })?;
                Operation::backup_into_dir(id, dir)
            }
        },
        Command::Copy { id, new_name } => Operation::Copy {
            target: id,
            new_name,
        },
        Command::Rmi { id } => Operation::RemoveImage { target: id },
        Command::NetworkRm { id } => Operation::RemoveNetwork { target: id },
        Command::Prune { yes } => {
            if !yes {
                bail!("Pruning removes every unused container, image and network; pass --yes to confirm");
            }
            Operation::PruneSystem
        }
        Command::Build { project, tag } => Operation::Build { project, tag },
        other => bail!("{:?} is not an operation", other),
    };
    Ok(operation)
}

/// Refresh the target's kind, dispatch the operation and wait for it.
pub async fn handle_operation(session: &Session, command: Command) -> Result<()> {
    let operation = operation_for(session, command)?;

    // Targets are resolved against the inventory, so it must be current.
    if let Some(kind) = operation.target_kind().filter(ResourceKind::has_runtime_identifier) {
        session
            .engine
            .refresh(kind)
            .await
            .with_context(|| format!("Failed to list {}s", kind))?;
    }

    dm_progress!("Running {}", operation);
    let handle = session.engine.dispatch(operation).await?;
    debug!("Dispatched operation {}", handle.id());
    let outcome = handle.wait().await?;

    if session.json {
        print_json(&outcome)?;
    } else {
        print_outcome(&outcome);
    }

    if let Some(failed) = outcome.failure() {
        return Err(failed.to_error().into());
    }
    dm_success!("{} completed", outcome.operation);
    Ok(())
}

fn print_captured(session: &Session, output: &CommandOutput) -> Result<()> {
    if session.json {
        return print_json(output);
    }
    // `docker logs` replays the container's stderr on stderr
    for text in [&output.stdout, &output.stderr] {
        let text = text.trim_end();
        if !text.is_empty() {
            dm_println!("{}", text);
        }
    }
    Ok(())
}

pub async fn handle_logs(session: &Session, id: &str) -> Result<()> {
    let output = session.engine.logs(id).await?;
    print_captured(session, &output)
}

pub async fn handle_inspect(session: &Session, id: &str) -> Result<()> {
    let output = session.engine.inspect(id).await?;
    print_captured(session, &output)
}
