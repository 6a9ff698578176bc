//! Listing, parsing and publishing one resource kind at a time.

use crate::commands;
use crate::parser::{self, lookup_stats, ParseOutcome};
use crate::projects::ProjectWorkspace;
use crate::resource::{ContainerRecord, ResourceRecord};
use crate::store::InventoryStore;
use dockman_core::{
    CommandRunner, DockError, DockerCommand, ParseError, ResourceKind, Result, ValidationError,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Result of one successful refresh of a kind.
#[derive(Debug, Clone)]
pub struct RefreshReport {
    pub kind: ResourceKind,
    /// Records now stored for the kind.
    pub count: usize,
    /// Malformed lines skipped during parsing.
    pub parse_errors: Vec<ParseError>,
    /// Store version after the replacement.
    pub version: u64,
}

/// Outcome of refreshing every kind. A failed kind keeps its previous records.
#[derive(Debug, Default)]
pub struct RefreshSummary {
    pub reports: Vec<RefreshReport>,
    pub failures: Vec<(ResourceKind, DockError)>,
}

impl RefreshSummary {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn parse_error_count(&self) -> usize {
        self.reports.iter().map(|r| r.parse_errors.len()).sum()
    }
}

/// Records matching a search, grouped by kind. Never written to the store.
#[derive(Debug, Default)]
pub struct FilteredView {
    pub query: String,
    pub matches: BTreeMap<ResourceKind, Vec<ResourceRecord>>,
    pub failures: Vec<(ResourceKind, DockError)>,
}

impl FilteredView {
    pub fn total(&self) -> usize {
        self.matches.values().map(Vec::len).sum()
    }
}

/// Listing command for a runtime-backed kind.
pub fn listing_command(kind: ResourceKind) -> Option<DockerCommand> {
    match kind {
        ResourceKind::Container => Some(commands::list_containers()),
        ResourceKind::Image => Some(commands::list_images()),
        ResourceKind::Network => Some(commands::list_networks()),
        ResourceKind::Project => None,
    }
}

/// Runs refreshes synchronously; callers move it onto a blocking worker.
#[derive(Clone)]
pub struct Refresher {
    runner: Arc<dyn CommandRunner>,
    store: Arc<InventoryStore>,
    workspace: ProjectWorkspace,
    placeholder: String,
}

impl Refresher {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        store: Arc<InventoryStore>,
        workspace: ProjectWorkspace,
        placeholder: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            store,
            workspace,
            placeholder: placeholder.into(),
        }
    }

    pub fn store(&self) -> &Arc<InventoryStore> {
        &self.store
    }

    pub fn workspace(&self) -> &ProjectWorkspace {
        &self.workspace
    }

    // List and parse without touching the store.
    fn list(&self, kind: ResourceKind) -> Result<ParseOutcome> {
        match listing_command(kind) {
            Some(command) => {
                let output = self.runner.run(&command).into_result()?;
                Ok(parser::parse_kind(kind, output.stdout.lines(), self.workspace.root()))
            }
            None => {
                let names = self.workspace.list_names()?;
                Ok(parser::parse_projects(self.workspace.root(), names))
            }
        }
    }

    /// Re-list `kind` and atomically replace its records.
    ///
    /// If the listing command fails the stored records are left exactly as
    /// they were and the failure is returned.
    pub fn refresh(&self, kind: ResourceKind) -> Result<RefreshReport> {
        let span = info_span!("refresh", kind = %kind);
        let _enter = span.enter();

        let outcome = match self.list(kind) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Refresh failed, keeping previous snapshot: {}", e);
                return Err(e);
            }
        };

        let mut records = outcome.records;
        if kind == ResourceKind::Container {
            records = self.enrich_containers(records);
        }

        let count = records.len();
        let version = self.store.replace_kind(kind, records);
        info!(
            "Refreshed {} {} records ({} malformed lines skipped)",
            count,
            kind,
            outcome.errors.len()
        );

        Ok(RefreshReport {
            kind,
            count,
            parse_errors: outcome.errors,
            version,
        })
    }

    /// Refresh every kind in turn, collecting failures instead of stopping.
    pub fn refresh_all(&self) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        for kind in ResourceKind::ALL {
            match self.refresh(kind) {
                Ok(report) => summary.reports.push(report),
                Err(e) => summary.failures.push((kind, e)),
            }
        }
        summary
    }

    /// Refresh several kinds, e.g. the ones an operation touched.
    pub fn refresh_kinds(&self, kinds: &[ResourceKind]) -> RefreshSummary {
        let mut summary = RefreshSummary::default();
        for &kind in kinds {
            match self.refresh(kind) {
                Ok(report) => summary.reports.push(report),
                Err(e) => summary.failures.push((kind, e)),
            }
        }
        summary
    }

    /// List every kind and keep records whose rendered line contains `query`,
    /// ignoring case. Matching containers get the same stats and size merge
    /// as a refresh; the size queries only run for hits.
    pub fn refresh_filtered(&self, query: &str) -> Result<FilteredView> {
        let query = validate_query(query)?.to_string();
        let mut view = FilteredView {
            query: query.clone(),
            ..FilteredView::default()
        };

        for kind in ResourceKind::ALL {
            match self.list(kind) {
                Ok(outcome) => {
                    let mut hits: Vec<ResourceRecord> = outcome
                        .records
                        .into_iter()
                        .filter(|r| r.matches(&query))
                        .collect();
                    if kind == ResourceKind::Container && !hits.is_empty() {
                        hits = self.enrich_containers(hits);
                    }
                    debug!("Search '{}' matched {} {} records", query, hits.len(), kind);
                    view.matches.insert(kind, hits);
                }
                Err(e) => {
                    warn!("Search listing for {} failed: {}", kind, e);
                    view.failures.push((kind, e));
                }
            }
        }

        Ok(view)
    }

    /// Merge live stats and disk size into freshly parsed containers.
    ///
    /// Anything the runtime does not report stays at the placeholder.
    fn enrich_containers(&self, records: Vec<ResourceRecord>) -> Vec<ResourceRecord> {
        let stats_output = self.runner.run(&commands::container_stats());
        let stats = if stats_output.ok {
            parser::parse_stats(stats_output.lines())
        } else {
            warn!("Live stats unavailable: {}", stats_output.stderr.trim());
            Default::default()
        };

        records
            .into_par_iter()
            .map(|record| match record {
                ResourceRecord::Container(container) => {
                    let stats = lookup_stats(&stats, &container.id);
                    let size = self.container_size(&container.id);
                    ResourceRecord::Container(ContainerRecord {
                        cpu: stats
                            .map(|s| s.cpu.clone())
                            .unwrap_or_else(|| self.placeholder.clone()),
                        memory: stats
                            .map(|s| s.memory.clone())
                            .unwrap_or_else(|| self.placeholder.clone()),
                        size: size.unwrap_or_else(|| self.placeholder.clone()),
                        ..container
                    })
                }
                other => other,
            })
            .collect()
    }

    fn container_size(&self, id: &str) -> Option<String> {
        let output = self.runner.run(&commands::container_size(id));
        if !output.ok {
            debug!("Size query for {} failed: {}", id, output.stderr.trim());
            return None;
        }
        output.lines().first().map(|line| line.trim().to_string())
    }
}

/// Reject an empty search before any listing runs.
pub fn validate_query(query: &str) -> std::result::Result<&str, ValidationError> {
    dockman_core::validate_name("search query", query)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedRunner;
    use crate::resource::DEFAULT_PLACEHOLDER;
    use dockman_core::CommandOutput;
    use tempfile::TempDir;

    const CONTAINER_LINE: &str =
        r#"abc123456789|nginx:latest|"nginx -g daemon off;"|2024-01-01|Up 3 hours|web1"#;

    fn refresher(runner: ScriptedRunner) -> (Refresher, Arc<ScriptedRunner>, TempDir) {
        let dir = TempDir::new().unwrap();
        let runner = Arc::new(runner);
        let refresher = Refresher::new(
            runner.clone(),
            Arc::new(InventoryStore::new()),
            ProjectWorkspace::new(dir.path().join("projects")),
            DEFAULT_PLACEHOLDER,
        );
        (refresher, runner, dir)
    }

    #[test]
    fn test_container_refresh_merges_stats_and_size() {
        let runner = ScriptedRunner::new()
            .on("ps -a --format {{.ID}}", CommandOutput::success("ps", CONTAINER_LINE))
            .on(
                "stats --no-stream",
                CommandOutput::success("stats", "abc123456789|2.3%|15MiB / 1GiB\n"),
            )
            .on("ps -s -a --filter id=abc123456789", CommandOutput::success("ps", "2B (virtual 187MB)\n"));
        let (refresher, _, _dir) = refresher(runner);

        let report = refresher.refresh(ResourceKind::Container).unwrap();
        assert_eq!(report.count, 1);

        let snapshot = refresher.store().snapshot();
        let containers = snapshot.containers();
        assert_eq!(containers[0].cpu, "2.3%");
        assert_eq!(containers[0].memory, "15MiB / 1GiB");
        assert_eq!(containers[0].size, "2B (virtual 187MB)");
    }

    #[test]
    fn test_missing_stats_degrade_to_placeholder() {
        let runner = ScriptedRunner::new()
            .on("ps -a --format {{.ID}}", CommandOutput::success("ps", CONTAINER_LINE))
            .fail("stats --no-stream", "stats unsupported")
            .fail("ps -s -a", "boom");
        let (refresher, _, _dir) = refresher(runner);

        refresher.refresh(ResourceKind::Container).unwrap();
        let snapshot = refresher.store().snapshot();
        let container = snapshot.containers()[0].clone();
        assert_eq!(container.cpu, DEFAULT_PLACEHOLDER);
        assert_eq!(container.memory, DEFAULT_PLACEHOLDER);
        assert_eq!(container.size, DEFAULT_PLACEHOLDER);
    }

    #[test]
    fn test_failed_listing_keeps_previous_records() {
        let runner = ScriptedRunner::new()
            .on_once(
                "network ls",
                CommandOutput::success("network ls", "abc123456789|bridge|bridge|local\n"),
            )
            .fail("network ls", "Cannot connect to the Docker daemon");
        let (refresher, _, _dir) = refresher(runner);

        refresher.refresh(ResourceKind::Network).unwrap();
        let before = refresher.store().snapshot();

        let err = refresher.refresh(ResourceKind::Network).unwrap_err();
        assert!(matches!(err, DockError::CommandFailed { .. }));

        let after = refresher.store().snapshot();
        assert_eq!(
            before.records_of(ResourceKind::Network),
            after.records_of(ResourceKind::Network)
        );
        assert_eq!(before.version, after.version);
    }

    #[test]
    fn test_parse_errors_are_reported_not_fatal() {
        let runner = ScriptedRunner::new().on(
            "images --format",
            CommandOutput::success(
                "images",
                "nginx|latest|605c77e624dd|2 weeks ago|141MB\nbroken|line\n",
            ),
        );
        let (refresher, _, _dir) = refresher(runner);

        let report = refresher.refresh(ResourceKind::Image).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.parse_errors.len(), 1);
    }

    #[test]
    fn test_refresh_all_collects_failures() {
        let runner = ScriptedRunner::new()
            .on("ps -a --format {{.ID}}", CommandOutput::success("ps", ""))
            .on("stats --no-stream", CommandOutput::success("stats", ""))
            .fail("images --format", "daemon down")
            .on(
                "network ls",
                CommandOutput::success("network ls", "abc123456789|bridge|bridge|local\n"),
            );
        let (refresher, _, _dir) = refresher(runner);

        let summary = refresher.refresh_all();
        assert!(!summary.is_complete());
        assert_eq!(summary.failures.len(), 1);
        assert_eq!(summary.failures[0].0, ResourceKind::Image);
        assert_eq!(summary.reports.len(), 3);
    }

    #[test]
    fn test_filtered_search_leaves_store_alone() {
        let runner = ScriptedRunner::new()
            .on("ps -a --format {{.ID}}", CommandOutput::success("ps", CONTAINER_LINE))
            .on(
                "images --format",
                CommandOutput::success("images", "nginx|latest|605c77e624dd|2 weeks ago|141MB\n"),
            )
            .on(
                "network ls",
                CommandOutput::success("network ls", "abc123456789|bridge|bridge|local\n"),
            );
        let (refresher, _, _dir) = refresher(runner);

        let view = refresher.refresh_filtered("NGINX").unwrap();
        assert_eq!(view.total(), 2);
        assert_eq!(view.matches[&ResourceKind::Network].len(), 0);
        assert_eq!(refresher.store().version(), 0);
    }

    #[test]
    fn test_search_merges_stats_into_matching_containers() {
        let listing = format!(
            "{}\ndef456789abc|redis:7|redis-server|2024-01-02|Exited (0) 2 days ago|cache\n",
            CONTAINER_LINE
        );
        let runner = ScriptedRunner::new()
            .on("ps -a --format {{.ID}}", CommandOutput::success("ps", listing))
            .on(
                "stats --no-stream",
                CommandOutput::success("stats", "abc123456789|2.3%|15MiB / 1GiB\n"),
            )
            .on("ps -s -a --filter", CommandOutput::success("ps", "2B (virtual 187MB)\n"))
            .on("images --format", CommandOutput::success("images", ""))
            .on("network ls", CommandOutput::success("network ls", ""));
        let (refresher, runner, _dir) = refresher(runner);

        let view = refresher.refresh_filtered("nginx").unwrap();
        let containers = &view.matches[&ResourceKind::Container];
        assert_eq!(containers.len(), 1);

        let ResourceRecord::Container(web) = &containers[0] else {
            panic!("expected a container record");
        };
        assert_eq!(web.cpu, "2.3%");
        assert_eq!(web.memory, "15MiB / 1GiB");
        assert_eq!(web.size, "2B (virtual 187MB)");

        // Only the hit gets a size query
        assert_eq!(
            runner.calls_matching("ps -s -a"),
            vec!["ps -s -a --filter id=abc123456789 --format {{.Size}}"]
        );
        assert_eq!(refresher.store().version(), 0);
    }

    #[test]
    fn test_parse_error_line_numbers_count_blank_lines() {
        let runner = ScriptedRunner::new().on(
            "images --format",
            CommandOutput::success(
                "images",
                "nginx|latest|605c77e624dd|2 weeks ago|141MB\n\nbroken|line\n",
            ),
        );
        let (refresher, _, _dir) = refresher(runner);

        let summary = refresher.refresh_kinds(&[ResourceKind::Image]);
        assert!(summary.is_complete());
        assert_eq!(summary.parse_error_count(), 1);
        assert_eq!(summary.reports[0].parse_errors[0].line_number, 3);
    }

    #[test]
    fn test_empty_search_is_rejected_before_listing() {
        let (refresher, runner, _dir) = refresher(ScriptedRunner::new());
        let err = refresher.refresh_filtered("   ").unwrap_err();
        assert!(matches!(err, DockError::Validation(ValidationError::EmptyName { .. })));
        assert!(runner.calls().is_empty());
    }

    #[test]
    fn test_project_refresh_lists_directories() {
        let (refresher, runner, _dir) = refresher(ScriptedRunner::new());
        std::fs::create_dir_all(refresher.workspace().root().join("webapp")).unwrap();
        std::fs::write(refresher.workspace().root().join("notes.txt"), "x").unwrap();

        let report = refresher.refresh(ResourceKind::Project).unwrap();
        assert_eq!(report.count, 1);
        assert!(runner.calls().is_empty());
    }
}
