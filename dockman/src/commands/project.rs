//! Project workspace commands.

use super::Session;
use crate::cli::ProjectSubcommand;
use crate::output::{print_json, print_records};
use anyhow::{bail, Result};
use dockman_core::{dm_info, dm_println, dm_success};
use dockman_engine::ResourceKind;

pub async fn handle_project(session: &Session, command: ProjectSubcommand) -> Result<()> {
    let engine = &session.engine;

    match command {
        ProjectSubcommand::New { name } => {
            let project = engine.create_project(&name).await?;
            if session.json {
                return print_json(&project);
            }
            dm_success!("Project '{}' created at {}", project.name, project.path.display());
            dm_info!("Build it with: dockman build {} {}:latest", project.name, project.name);
        }
        ProjectSubcommand::Rm { name, yes } => {
            if !yes {
                bail!("Deleting '{}' removes its directory tree; pass --yes to confirm", name);
            }
            engine.delete_project(&name).await?;
            dm_success!("Project '{}' deleted", name.trim());
        }
        ProjectSubcommand::Ls => {
            engine.refresh(ResourceKind::Project).await?;
            let snapshot = engine.snapshot();
            let projects = snapshot.records_of(ResourceKind::Project);
            if session.json {
                return print_json(&projects);
            }
            print_records(ResourceKind::Project, &projects);
        }
        ProjectSubcommand::Files { name } => {
            let files = engine.editable_files(&name)?;
            if session.json {
                return print_json(&files);
            }
            if files.is_empty() {
                dm_info!("No editable files found in '{}'", name);
            }
            for file in files {
                dm_println!("{}", file.display());
            }
        }
    }

    Ok(())
}
