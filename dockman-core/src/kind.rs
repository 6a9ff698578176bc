//! Resource kinds tracked by the inventory.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The four kinds of resource DockMan knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    Container,
    Image,
    Network,
    Project,
}

impl ResourceKind {
    /// All kinds, in display order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Container,
        ResourceKind::Image,
        ResourceKind::Network,
        ResourceKind::Project,
    ];

    /// Kinds whose records come from the container runtime (and carry a runtime identifier).
    pub const RUNTIME: [ResourceKind; 3] = [
        ResourceKind::Container,
        ResourceKind::Image,
        ResourceKind::Network,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Container => "container",
            ResourceKind::Image => "image",
            ResourceKind::Network => "network",
            ResourceKind::Project => "project",
        }
    }

    /// Number of `|`-separated fields a listing line of this kind must carry.
    ///
    /// Projects come from a directory listing, one name per line.
    pub fn field_count(&self) -> usize {
        match self {
            ResourceKind::Container => 6,
            ResourceKind::Image => 5,
            ResourceKind::Network => 4,
            ResourceKind::Project => 1,
        }
    }

    pub fn has_runtime_identifier(&self) -> bool {
        !matches!(self, ResourceKind::Project)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" | "containers" => Ok(ResourceKind::Container),
            "image" | "images" => Ok(ResourceKind::Image),
            "network" | "networks" => Ok(ResourceKind::Network),
            "project" | "projects" => Ok(ResourceKind::Project),
            other => Err(format!("unknown resource kind '{}'", other)),
        }
    }
}
