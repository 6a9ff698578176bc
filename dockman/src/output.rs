//! Table and JSON rendering for command output.

use colored::Colorize;
use dockman_core::{dm_println, ResourceKind};
use dockman_engine::{OperationOutcome, ResourceRecord};
use serde::Serialize;

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    dm_println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

fn short_id(id: &str) -> String {
    id.chars().take(12).collect()
}

fn header(kind: ResourceKind) -> String {
    match kind {
        ResourceKind::Container => format!(
            "{:<14} {:<20} {:<9} {:<24} {:<8} {:<20} {:<12}",
            "ID", "NAME", "STATE", "IMAGE", "CPU", "MEMORY", "SIZE"
        ),
        ResourceKind::Image => format!(
            "{:<14} {:<40} {:<16} {:<10}",
            "ID", "IMAGE", "CREATED", "SIZE"
        ),
        ResourceKind::Network => {
            format!("{:<14} {:<24} {:<10} {:<8}", "ID", "NAME", "DRIVER", "SCOPE")
        }
        ResourceKind::Project => format!("{:<24} {}", "NAME", "PATH"),
    }
}

fn row(record: &ResourceRecord) -> String {
    match record {
        ResourceRecord::Container(c) => {
            let state = if c.is_running() {
                format!("{:<9}", c.state).green()
            } else {
                format!("{:<9}", c.state).dimmed()
            };
            format!(
                "{:<14} {:<20} {} {:<24} {:<8} {:<20} {:<12}",
                short_id(&c.id),
                truncate_string(&c.name, 20),
                state,
                truncate_string(&c.image, 24),
                c.cpu,
                truncate_string(&c.memory, 20),
                truncate_string(&c.size, 12)
            )
        }
        ResourceRecord::Image(i) => format!(
            "{:<14} {:<40} {:<16} {:<10}",
            short_id(&i.id),
            truncate_string(&i.full_name(), 40),
            i.created_since,
            i.size
        ),
        ResourceRecord::Network(n) => format!(
            "{:<14} {:<24} {:<10} {:<8}",
            short_id(&n.id),
            truncate_string(&n.name, 24),
            n.driver,
            n.scope
        ),
        ResourceRecord::Project(p) => format!("{:<24} {}", p.name, p.path.display()),
    }
}

/// Print one titled table per kind.
pub fn print_records(kind: ResourceKind, records: &[&ResourceRecord]) {
    dm_println!("{} ({})", kind.as_str().to_uppercase().bold(), records.len());
    if records.is_empty() {
        dm_println!("  {}", "(none)".dimmed());
        dm_println!();
        return;
    }
    dm_println!("{}", header(kind).bold());
    for record in records {
        dm_println!("{}", row(record));
    }
    dm_println!();
}

pub fn print_outcome(outcome: &OperationOutcome) {
    for step in &outcome.steps {
        let marker = if step.ok { "✓".green() } else { "✗".red() };
        dm_println!("{} {}", marker, step.command);
        let text = if step.ok { &step.stdout } else { &step.stderr };
        for line in text.lines().filter(|l| !l.trim().is_empty()) {
            dm_println!("    {}", line);
        }
    }
    if !outcome.refresh_failures.is_empty() {
        for (kind, reason) in &outcome.refresh_failures {
            dm_println!("{} refresh of {} failed: {}", "⚠".yellow(), kind, reason);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("nginx:1.27-alpine-slim", 12), "nginx:1.2...");
        assert_eq!(truncate_string("web1", 20), "web1");
        assert_eq!(short_id("abc123456789abcdef"), "abc123456789");
    }
}
