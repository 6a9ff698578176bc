//! Runtime command lines used by the engine.
//!
//! Listing commands use `--format` templates joined with `|`, which is the only
//! wire contract the parsers depend on.

use dockman_core::DockerCommand;
use std::path::Path;

pub const CONTAINER_FORMAT: &str = "{{.ID}}|{{.Image}}|{{.Command}}|{{.CreatedAt}}|{{.Status}}|{{.Names}}";
pub const IMAGE_FORMAT: &str = "{{.Repository}}|{{.Tag}}|{{.ID}}|{{.CreatedSince}}|{{.Size}}";
pub const NETWORK_FORMAT: &str = "{{.ID}}|{{.Name}}|{{.Driver}}|{{.Scope}}";
pub const STATS_FORMAT: &str = "{{.Container}}|{{.CPUPerc}}|{{.MemUsage}}";

/// Prefix for images produced by the copy operation.
pub const COPY_IMAGE_PREFIX: &str = "backup_";

pub fn list_containers() -> DockerCommand {
    DockerCommand::new()
        .subcommand("ps")
        .args(["-a", "--format", CONTAINER_FORMAT])
}

pub fn list_images() -> DockerCommand {
    DockerCommand::new()
        .subcommand("images")
        .args(["--format", IMAGE_FORMAT])
}

pub fn list_networks() -> DockerCommand {
    DockerCommand::new()
        .subcommand("network")
        .args(["ls", "--format", NETWORK_FORMAT])
}

/// One-shot CPU and memory sample for every running container.
pub fn container_stats() -> DockerCommand {
    DockerCommand::new()
        .subcommand("stats")
        .args(["--no-stream", "--format", STATS_FORMAT])
}

pub fn container_size(id: &str) -> DockerCommand {
    DockerCommand::new()
        .subcommand("ps")
        .args(["-s", "-a", "--filter"])
        .arg(format!("id={}", id))
        .args(["--format", "{{.Size}}"])
}

/// Names of every container, fetched fresh for name-conflict checks.
pub fn container_names() -> DockerCommand {
    DockerCommand::new()
        .subcommand("ps")
        .args(["-a", "--format", "{{.Names}}"])
}

/// Liveness probe: succeeds only when the daemon answers.
pub fn daemon_info() -> DockerCommand {
    DockerCommand::new().subcommand("info")
}

pub fn start(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("start").arg(id)
}

pub fn stop(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("stop").arg(id)
}

pub fn remove(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("rm").arg(id)
}

pub fn remove_forced(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("rm").args(["-f", id])
}

/// Start a detached container named `name` from `image`.
pub fn run_detached(name: &str, image: &str) -> DockerCommand {
    DockerCommand::new()
        .subcommand("run")
        .args(["-d", "--name", name, image])
}

pub fn commit(id: &str, image: &str) -> DockerCommand {
    DockerCommand::new().subcommand("commit").args([id, image])
}

/// Create (without starting) a container named `name` from `image`.
pub fn create(name: &str, image: &str) -> DockerCommand {
    DockerCommand::new()
        .subcommand("create")
        .args(["--name", name, image])
}

pub fn export(id: &str, destination: &Path) -> DockerCommand {
    DockerCommand::new()
        .subcommand("export")
        .arg(id)
        .arg("-o")
        .arg(destination.to_string_lossy())
}

pub fn build(tag: &str, context: &Path) -> DockerCommand {
    DockerCommand::new()
        .subcommand("build")
        .args(["-t", tag])
        .arg(context.to_string_lossy())
}

pub fn remove_image(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("rmi").args(["-f", id])
}

pub fn remove_network(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("network").args(["rm", id])
}

pub fn prune_system() -> DockerCommand {
    DockerCommand::new()
        .subcommand("system")
        .args(["prune", "-a", "-f"])
}

pub fn logs(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("logs").arg(id)
}

pub fn inspect(id: &str) -> DockerCommand {
    DockerCommand::new().subcommand("inspect").arg(id)
}

/// Image name the copy operation commits a container to.
pub fn copy_image_name(id: &str) -> String {
    format!("{}{}", COPY_IMAGE_PREFIX, id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_commands() {
        assert_eq!(
            list_containers().argv().join(" "),
            "ps -a --format {{.ID}}|{{.Image}}|{{.Command}}|{{.CreatedAt}}|{{.Status}}|{{.Names}}"
        );
        assert_eq!(
            list_networks().argv(),
            vec!["network", "ls", "--format", NETWORK_FORMAT]
        );
        assert_eq!(
            container_size("abc123456789").argv().join(" "),
            "ps -s -a --filter id=abc123456789 --format {{.Size}}"
        );
    }

    #[test]
    fn test_mutating_commands() {
        assert_eq!(
            run_detached("abc123456789", "nginx:latest").argv().join(" "),
            "run -d --name abc123456789 nginx:latest"
        );
        assert_eq!(
            export("abc123456789", Path::new("/backups/abc123456789_backup.tar"))
                .argv()
                .join(" "),
            "export abc123456789 -o /backups/abc123456789_backup.tar"
        );
        assert_eq!(copy_image_name("abc123456789"), "backup_abc123456789");
        assert_eq!(prune_system().argv().join(" "), "system prune -a -f");
    }
}
