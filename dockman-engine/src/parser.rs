//! Parsers for `|`-delimited runtime listings.
//!
//! Each parser is total: a malformed line becomes a [`ParseError`] next to the
//! records that did parse, and the batch carries on. Output order follows
//! input order.

use crate::resource::{
    ContainerRecord, ImageRecord, NetworkRecord, ProjectRecord, ResourceRecord, RunningState,
    DEFAULT_PLACEHOLDER,
};
use dockman_core::validation::validate_project_name;
use dockman_core::{is_valid_identifier, ParseError, ResourceKind};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

pub const FIELD_DELIMITER: char = '|';

/// Records and errors produced from one listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    pub records: Vec<ResourceRecord>,
    pub errors: Vec<ParseError>,
}

impl ParseOutcome {
    fn push_error(&mut self, error: ParseError) {
        warn!("Skipping malformed line: {}", error);
        self.errors.push(error);
    }
}

/// Live usage sample for one container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerStats {
    pub cpu: String,
    pub memory: String,
}

/// Parse any listing for `kind`. Project lines are resolved against `projects_root`.
pub fn parse_kind<I, S>(kind: ResourceKind, lines: I, projects_root: &Path) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    match kind {
        ResourceKind::Container => parse_containers(lines),
        ResourceKind::Image => parse_images(lines),
        ResourceKind::Network => parse_networks(lines),
        ResourceKind::Project => parse_projects(projects_root, lines),
    }
}

/// Split non-blank lines into fields, reporting lines with too few.
fn split_lines<I, S>(
    kind: ResourceKind,
    lines: I,
    outcome: &mut ParseOutcome,
) -> Vec<(usize, String, Vec<String>)>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let expected = kind.field_count();
    let mut rows = Vec::new();

    for (index, raw) in lines.into_iter().enumerate() {
        let line = raw.as_ref().trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<String> = line.split(FIELD_DELIMITER).map(str::to_string).collect();
        if fields.len() < expected {
            outcome.push_error(ParseError::new(
                kind,
                index + 1,
                line,
                format!("expected {} fields, found {}", expected, fields.len()),
            ));
            continue;
        }
        rows.push((index + 1, line.to_string(), fields));
    }

    rows
}

fn check_identifier(
    kind: ResourceKind,
    line_number: usize,
    line: &str,
    id: &str,
    outcome: &mut ParseOutcome,
) -> bool {
    if is_valid_identifier(id) {
        true
    } else {
        outcome.push_error(ParseError::new(
            kind,
            line_number,
            line,
            format!("invalid identifier '{}'", id),
        ));
        false
    }
}

/// Parse `ID|Image|Command|CreatedAt|Status|Names` lines.
///
/// The command column is the only free-text field, so any surplus `|` is
/// folded back into it. Live stats and size start as placeholders.
pub fn parse_containers<I, S>(lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kind = ResourceKind::Container;
    let mut outcome = ParseOutcome::default();

    for (line_number, line, fields) in split_lines(kind, lines, &mut outcome) {
        let id = fields[0].trim();
        if !check_identifier(kind, line_number, &line, id, &mut outcome) {
            continue;
        }

        let n = fields.len();
        let command = fields[2..n - 3].join("|");
        let status = fields[n - 2].trim().to_string();

        outcome.records.push(ResourceRecord::Container(ContainerRecord {
            id: id.to_string(),
            name: fields[n - 1].trim().to_string(),
            state: RunningState::from_status(&status),
            image: fields[1].trim().to_string(),
            command: command.trim().trim_matches('"').to_string(),
            created: fields[n - 3].trim().to_string(),
            status,
            cpu: DEFAULT_PLACEHOLDER.to_string(),
            memory: DEFAULT_PLACEHOLDER.to_string(),
            size: DEFAULT_PLACEHOLDER.to_string(),
        }));
    }

    outcome
}

/// Parse `Repository|Tag|ID|CreatedSince|Size` lines.
pub fn parse_images<I, S>(lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kind = ResourceKind::Image;
    let mut outcome = ParseOutcome::default();

    for (line_number, line, fields) in split_lines(kind, lines, &mut outcome) {
        let id = fields[2].trim();
        if !check_identifier(kind, line_number, &line, id, &mut outcome) {
            continue;
        }

        outcome.records.push(ResourceRecord::Image(ImageRecord {
            id: id.to_string(),
            repository: fields[0].trim().to_string(),
            tag: fields[1].trim().to_string(),
            created_since: fields[3].trim().to_string(),
            size: fields[4].trim().to_string(),
        }));
    }

    outcome
}

/// Parse `ID|Name|Driver|Scope` lines.
pub fn parse_networks<I, S>(lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kind = ResourceKind::Network;
    let mut outcome = ParseOutcome::default();

    for (line_number, line, fields) in split_lines(kind, lines, &mut outcome) {
        let id = fields[0].trim();
        if !check_identifier(kind, line_number, &line, id, &mut outcome) {
            continue;
        }

        outcome.records.push(ResourceRecord::Network(NetworkRecord {
            id: id.to_string(),
            name: fields[1].trim().to_string(),
            driver: fields[2].trim().to_string(),
            scope: fields[3].trim().to_string(),
        }));
    }

    outcome
}

/// Parse a directory listing (one subdirectory name per line) under `root`.
///
/// Projects have no identifier pattern; a name is rejected only if it could
/// not be a direct child directory.
pub fn parse_projects<I, S>(root: &Path, lines: I) -> ParseOutcome
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let kind = ResourceKind::Project;
    let mut outcome = ParseOutcome::default();

    for (index, raw) in lines.into_iter().enumerate() {
        let line = raw.as_ref();
        if line.trim().is_empty() {
            continue;
        }
        match validate_project_name(line) {
            Ok(name) => outcome.records.push(ResourceRecord::Project(ProjectRecord {
                name: name.to_string(),
                path: root.join(name),
            })),
            Err(e) => outcome.push_error(ParseError::new(kind, index + 1, line, e.to_string())),
        }
    }

    outcome
}

/// Parse `Container|CPUPerc|MemUsage` lines into a map keyed by container id.
///
/// Lines without exactly three fields are ignored; missing stats degrade to
/// placeholders later rather than failing a refresh.
pub fn parse_stats<I, S>(lines: I) -> HashMap<String, ContainerStats>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut stats = HashMap::new();

    for raw in lines {
        let line = raw.as_ref().trim();
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split(FIELD_DELIMITER).collect();
        if let [id, cpu, memory] = parts.as_slice() {
            stats.insert(
                id.trim().to_string(),
                ContainerStats {
                    cpu: cpu.trim().to_string(),
                    memory: memory.trim().to_string(),
                },
            );
        } else {
            debug!("Ignoring stats line with {} fields: {:?}", parts.len(), line);
        }
    }

    stats
}

/// Find stats for `id`, tolerating short/long identifier forms on either side.
pub fn lookup_stats<'a>(
    stats: &'a HashMap<String, ContainerStats>,
    id: &str,
) -> Option<&'a ContainerStats> {
    stats.get(id).or_else(|| {
        stats
            .iter()
            .find(|(key, _)| !key.is_empty() && (key.starts_with(id) || id.starts_with(key.as_str())))
            .map(|(_, value)| value)
    })
}
