//! Typed resource records.
//!
//! Records are immutable values: a refresh replaces them wholesale and nothing
//! edits a field in place once a record is in the store.

use dockman_core::ResourceKind;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Value used for live stats and size until (or unless) the runtime reports them.
pub const DEFAULT_PLACEHOLDER: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunningState {
    Running,
    Stopped,
}

impl RunningState {
    /// The runtime reports running containers with a status such as `Up 3 hours`.
    pub fn from_status(status: &str) -> Self {
        if status.contains("Up") {
            RunningState::Running
        } else {
            RunningState::Stopped
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self, RunningState::Running)
    }
}

impl fmt::Display for RunningState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunningState::Running => f.write_str("Running"),
            RunningState::Stopped => f.write_str("Stopped"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub state: RunningState,
    pub image: String,
    pub command: String,
    /// Creation timestamp exactly as the runtime printed it
    pub created: String,
    /// Raw status column (`Up 3 hours`, `Exited (0) 2 days ago`)
    pub status: String,
    pub cpu: String,
    pub memory: String,
    pub size: String,
}

impl ContainerRecord {
    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRecord {
    pub id: String,
    pub repository: String,
    pub tag: String,
    pub created_since: String,
    pub size: String,
}

impl ImageRecord {
    /// `repository:tag`
    pub fn full_name(&self) -> String {
        format!("{}:{}", self.repository, self.tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NetworkRecord {
    pub id: String,
    pub name: String,
    pub driver: String,
    pub scope: String,
}

/// A buildable source directory under the projects root. Identity is the name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectRecord {
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ResourceRecord {
    Container(ContainerRecord),
    Image(ImageRecord),
    Network(NetworkRecord),
    Project(ProjectRecord),
}

impl ResourceRecord {
    pub fn kind(&self) -> ResourceKind {
        match self {
            ResourceRecord::Container(_) => ResourceKind::Container,
            ResourceRecord::Image(_) => ResourceKind::Image,
            ResourceRecord::Network(_) => ResourceKind::Network,
            ResourceRecord::Project(_) => ResourceKind::Project,
        }
    }

    /// Store key: the runtime identifier, or the name for projects.
    pub fn id(&self) -> &str {
        match self {
            ResourceRecord::Container(c) => &c.id,
            ResourceRecord::Image(i) => &i.id,
            ResourceRecord::Network(n) => &n.id,
            ResourceRecord::Project(p) => &p.name,
        }
    }

    pub fn display_name(&self) -> String {
        match self {
            ResourceRecord::Container(c) => c.name.clone(),
            ResourceRecord::Image(i) => i.full_name(),
            ResourceRecord::Network(n) => n.name.clone(),
            ResourceRecord::Project(p) => p.name.clone(),
        }
    }

    /// The record's listing fields joined the way the runtime printed them.
    pub fn rendered(&self) -> String {
        match self {
            ResourceRecord::Container(c) => [
                c.id.as_str(),
                c.image.as_str(),
                c.command.as_str(),
                c.created.as_str(),
                c.status.as_str(),
                c.name.as_str(),
            ]
            .join("|"),
            ResourceRecord::Image(i) => [
                i.repository.as_str(),
                i.tag.as_str(),
                i.id.as_str(),
                i.created_since.as_str(),
                i.size.as_str(),
            ]
            .join("|"),
            ResourceRecord::Network(n) => [
                n.id.as_str(),
                n.name.as_str(),
                n.driver.as_str(),
                n.scope.as_str(),
            ]
            .join("|"),
            ResourceRecord::Project(p) => p.name.clone(),
        }
    }

    /// Case-insensitive substring match against [`rendered`](Self::rendered).
    pub fn matches(&self, query: &str) -> bool {
        self.rendered()
            .to_lowercase()
            .contains(&query.to_lowercase())
    }

    pub fn as_container(&self) -> Option<&ContainerRecord> {
        match self {
            ResourceRecord::Container(c) => Some(c),
            _ => None,
        }
    }
}
