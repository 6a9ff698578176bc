//! Read-only inventory commands: status, list, search and watch.

use super::Session;
use crate::output::{print_json, print_records};
use anyhow::Result;
use colored::Colorize;
use dockman_core::{dm_info, dm_println, dm_warning, DockerCli, ResourceKind};
use dockman_engine::{InventorySnapshot, ResourceRecord, HEALTH_POLL_INTERVAL};
use serde_json::json;
use tokio::time::{interval, MissedTickBehavior};
use tracing::warn;

pub async fn handle_status(session: &Session) -> Result<()> {
    let installed = DockerCli::new(session.config.docker_binary.clone()).is_installed();
    let running = session.engine.probe_health().await;

    if session.json {
        return print_json(&json!({
            "binary": session.config.docker_binary,
            "installed": installed,
            "running": running,
        }));
    }

    if !installed {
        dm_warning!(
            "'{}' was not found on PATH; set DOCKMAN_DOCKER_BIN to use another client",
            session.config.docker_binary
        );
    }
    if running {
        dm_println!("Docker: {}", "Running".green().bold());
    } else {
        dm_println!("Docker: {}", "Not Running".red().bold());
    }
    Ok(())
}

pub async fn handle_list(session: &Session, kind: Option<ResourceKind>) -> Result<()> {
    let kinds: Vec<ResourceKind> = match kind {
        Some(kind) => vec![kind],
        None => ResourceKind::ALL.to_vec(),
    };

    for &kind in &kinds {
        match session.engine.refresh(kind).await {
            Ok(report) => {
                for error in &report.parse_errors {
                    warn!("{}", error);
                }
            }
            Err(e) => {
                warn!("Refreshing {} failed: {}", kind, e);
                dm_warning!("Could not refresh {}s: {}", kind, e.user_friendly());
            }
        }
    }

    let snapshot = session.engine.snapshot();
    if session.json {
        let records: Vec<&ResourceRecord> = kinds
            .iter()
            .flat_map(|kind| snapshot.records_of(*kind))
            .collect();
        return print_json(&records);
    }

    for kind in kinds {
        print_records(kind, &snapshot.records_of(kind));
    }
    Ok(())
}

pub async fn handle_search(session: &Session, query: &str) -> Result<()> {
    let view = session.engine.search(query).await?;

    for (kind, e) in &view.failures {
        dm_warning!("Could not search {}s: {}", kind, e.user_friendly());
    }

    if session.json {
        let records: Vec<&ResourceRecord> = view.matches.values().flatten().collect();
        return print_json(&records);
    }

    if view.total() == 0 {
        dm_info!("No resources match '{}'", view.query);
        return Ok(());
    }
    for (kind, records) in &view.matches {
        if !records.is_empty() {
            let refs: Vec<&ResourceRecord> = records.iter().collect();
            print_records(*kind, &refs);
        }
    }
    Ok(())
}

fn summary_line(snapshot: &InventorySnapshot) -> String {
    let containers = snapshot.containers();
    let running = containers.iter().filter(|c| c.is_running()).count();
    format!(
        "{} containers ({} running), {} images, {} networks, {} projects",
        containers.len(),
        running,
        snapshot.records_of(ResourceKind::Image).len(),
        snapshot.records_of(ResourceKind::Network).len(),
        snapshot.records_of(ResourceKind::Project).len()
    )
}

/// Refresh on the health poll period and print inventory changes as they are published.
pub async fn handle_watch(session: &Session) -> Result<()> {
    let engine = &session.engine;
    let poller = engine.start_health_poller();
    let mut snapshots = engine.subscribe();
    let mut ticker = interval(HEALTH_POLL_INTERVAL);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut last_health = None;
    let mut last_summary = String::new();

    dm_info!("Watching (Ctrl-C to stop)");
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let summary = engine.refresh_all().await?;
                for (kind, e) in &summary.failures {
                    dm_warning!("Refreshing {}s failed: {}", kind, e);
                }
                let skipped = summary.parse_error_count();
                if skipped > 0 {
                    warn!("Skipped {} malformed listing lines", skipped);
                }

                let healthy = engine.health().is_running();
                if engine.health().probes() > 0 && last_health != Some(healthy) {
                    last_health = Some(healthy);
                    if healthy {
                        dm_println!("Docker: {}", "Running".green());
                    } else {
                        dm_println!("Docker: {}", "Not Running".red());
                    }
                }
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = snapshots.borrow_and_update().clone();
                if session.json {
                    let records: Vec<&ResourceRecord> = snapshot.records();
                    print_json(&json!({ "version": snapshot.version, "records": records }))?;
                } else {
                    let line = summary_line(&snapshot);
                    if line != last_summary {
                        dm_println!("[v{}] {}", snapshot.version, line);
                        last_summary = line;
                    }
                }
            }
        }
    }

    poller.abort();
    Ok(())
}
