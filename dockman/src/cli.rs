// CLI argument parsing and definitions

use clap::{Parser, Subcommand};
use dockman_core::ResourceKind;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "dockman")]
#[command(about = "Inventory and manage Docker containers, images, networks and projects")]
#[command(version)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// Path to a custom configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print machine-readable JSON instead of tables
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Debug, Clone, Subcommand)]
pub enum ProjectSubcommand {
    /// Scaffold a new project under the projects root
    New {
        /// Project name (becomes the directory name)
        name: String,
    },
    /// Delete a project directory and everything in it
    Rm {
        name: String,
        /// Skip the confirmation guard
        #[arg(short, long)]
        yes: bool,
    },
    /// List projects
    Ls,
    /// Show the project's editable starter files
    Files { name: String },
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Check whether the container runtime is reachable
    Status,

    /// Refresh and list resources
    List {
        /// Only this kind (container, image, network, project)
        #[arg(short, long)]
        kind: Option<ResourceKind>,
    },

    /// Search every kind for a case-insensitive substring
    Search { query: String },

    /// Poll health and inventory, printing every change
    Watch,

    /// Start a container
    Start { id: String },

    /// Stop a container
    Stop { id: String },

    /// Force-remove a container
    Rm { id: String },

    /// Stop, remove and re-run a container from its image
    Rebuild {
        id: String,
        /// Image to run instead of the container's current one
        #[arg(long)]
        image: Option<String>,
    },

    /// Export a container's filesystem to a tar file
    Backup {
        id: String,
        /// Destination file (defaults to <backup_dir>/<id>_backup.tar)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Commit a container and create a stopped copy under a new name
    Copy { id: String, new_name: String },

    /// Force-remove an image
    Rmi { id: String },

    /// Remove a network
    NetworkRm { id: String },

    /// Remove all unused containers, images and networks
    Prune {
        /// Required; pruning cannot be undone
        #[arg(short, long)]
        yes: bool,
    },

    /// Build an image from a project
    Build { project: String, tag: String },

    /// Manage projects
    Project {
        #[command(subcommand)]
        command: ProjectSubcommand,
    },

    /// Show a container's logs
    Logs { id: String },

    /// Show a container's low-level details
    Inspect { id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_global_json_flag_after_subcommand() {
        let args = Args::try_parse_from(["dockman", "list", "--kind", "images", "--json"]).unwrap();
        assert!(args.json);
        assert!(matches!(
            args.command,
            Command::List {
                kind: Some(ResourceKind::Image)
            }
        ));
    }

    #[test]
    fn test_parses_nested_project_command() {
        let args = Args::try_parse_from(["dockman", "project", "rm", "webapp", "-y"]).unwrap();
        match args.command {
            Command::Project {
                command: ProjectSubcommand::Rm { name, yes },
            } => {
                assert_eq!(name, "webapp");
                assert!(yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_network_rm_is_kebab_case() {
        let args = Args::try_parse_from(["dockman", "network-rm", "f3a9c2d1b7e4"]).unwrap();
        assert!(matches!(args.command, Command::NetworkRm { .. }));
        assert!(Args::try_parse_from(["dockman", "list", "--kind", "volume"]).is_err());
    }
}
