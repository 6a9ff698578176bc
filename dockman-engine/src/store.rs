//! In-memory inventory with atomic per-kind replacement.
//!
//! The store holds one immutable `Arc<IndexMap>` per kind. Replacing a kind
//! swaps that pointer under the write lock, so a reader holding a snapshot sees
//! either the whole old set or the whole new set. The lock guards only the
//! swap; listings are produced by the caller before it is taken.

use crate::resource::{ContainerRecord, ProjectRecord, ResourceRecord};
use dockman_core::{DockError, ResourceKind, Result};
use indexmap::IndexMap;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{debug, warn};

type KindMap = Arc<IndexMap<String, ResourceRecord>>;

/// Consistent, read-only view of every kind at one instant.
#[derive(Debug, Clone, Default)]
pub struct InventorySnapshot {
    /// Strictly increases with every published mutation.
    pub version: u64,
    kinds: BTreeMap<ResourceKind, KindMap>,
}

impl InventorySnapshot {
    /// Every record, grouped by kind in declaration order.
    pub fn records(&self) -> Vec<&ResourceRecord> {
        self.kinds.values().flat_map(|m| m.values()).collect()
    }

    pub fn records_of(&self, kind: ResourceKind) -> Vec<&ResourceRecord> {
        self.kinds
            .get(&kind)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<&ResourceRecord> {
        self.kinds.get(&kind).and_then(|m| m.get(id))
    }

    pub fn containers(&self) -> Vec<&ContainerRecord> {
        self.records_of(ResourceKind::Container)
            .into_iter()
            .filter_map(ResourceRecord::as_container)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.kinds.values().map(|m| m.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether `kind` has ever been populated.
    pub fn has_kind(&self, kind: ResourceKind) -> bool {
        self.kinds.contains_key(&kind)
    }
}

/// Sole owner of all resource records.
pub struct InventoryStore {
    inner: RwLock<InventorySnapshot>,
    notifier: watch::Sender<Arc<InventorySnapshot>>,
}

impl Default for InventoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InventoryStore {
    pub fn new() -> Self {
        let (notifier, _) = watch::channel(Arc::new(InventorySnapshot::default()));
        Self {
            inner: RwLock::new(InventorySnapshot::default()),
            notifier,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, InventorySnapshot> {
        self.inner.read().unwrap_or_else(|poisoned| {
            warn!("Inventory lock was poisoned; continuing with last state");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, InventorySnapshot> {
        self.inner.write().unwrap_or_else(|poisoned| {
            warn!("Inventory lock was poisoned; continuing with last state");
            poisoned.into_inner()
        })
    }

    // Publishing while still holding the write lock keeps versions ordered
    // for subscribers.
    fn publish(&self, state: &mut InventorySnapshot) -> u64 {
        state.version += 1;
        self.notifier.send_replace(Arc::new(state.clone()));
        state.version
    }

    /// Swap every record of `kind` for `records`.
    ///
    /// A later record with the same id replaces an earlier one in the batch.
    /// Returns the new snapshot version.
    pub fn replace_kind(&self, kind: ResourceKind, records: Vec<ResourceRecord>) -> u64 {
        let mut map = IndexMap::with_capacity(records.len());
        for record in records {
            if record.kind() != kind {
                warn!(
                    "Ignoring {} record '{}' in {} replacement",
                    record.kind(),
                    record.id(),
                    kind
                );
                continue;
            }
            map.insert(record.id().to_string(), record);
        }
        let count = map.len();

        let mut state = self.write();
        state.kinds.insert(kind, Arc::new(map));
        let version = self.publish(&mut state);
        debug!("Replaced {} {} records (version {})", count, kind, version);
        version
    }

    /// Point-in-time copy of every kind. Cheap: only `Arc`s are cloned.
    pub fn snapshot(&self) -> InventorySnapshot {
        self.read().clone()
    }

    pub fn version(&self) -> u64 {
        self.read().version
    }

    pub fn get(&self, kind: ResourceKind, id: &str) -> Result<ResourceRecord> {
        self.read()
            .get(kind, id)
            .cloned()
            .ok_or_else(|| DockError::not_found(kind, id))
    }

    /// Look up by exact id, falling back to a unique id prefix.
    pub fn resolve(&self, kind: ResourceKind, id: &str) -> Result<ResourceRecord> {
        let state = self.read();
        if let Some(record) = state.get(kind, id) {
            return Ok(record.clone());
        }

        let mut matches = state
            .records_of(kind)
            .into_iter()
            .filter(|r| !id.is_empty() && (r.id().starts_with(id) || id.starts_with(r.id())));
        match (matches.next(), matches.next()) {
            (Some(record), None) => Ok(record.clone()),
            _ => Err(DockError::not_found(kind, id)),
        }
    }

    /// Add or replace one project without touching the others.
    pub fn upsert_project(&self, project: ProjectRecord) -> u64 {
        let mut state = self.write();
        let mut map = state
            .kinds
            .get(&ResourceKind::Project)
            .map(|m| (**m).clone())
            .unwrap_or_default();
        map.insert(project.name.clone(), ResourceRecord::Project(project));
        state.kinds.insert(ResourceKind::Project, Arc::new(map));
        self.publish(&mut state)
    }

    /// Remove one project. Returns `NotFound` if it was not present.
    pub fn remove_project(&self, name: &str) -> Result<u64> {
        let mut state = self.write();
        let mut map = state
            .kinds
            .get(&ResourceKind::Project)
            .map(|m| (**m).clone())
            .unwrap_or_default();
        if map.shift_remove(name).is_none() {
            return Err(DockError::not_found(ResourceKind::Project, name));
        }
        state.kinds.insert(ResourceKind::Project, Arc::new(map));
        Ok(self.publish(&mut state))
    }

    /// Receiver that sees every snapshot published from now on.
    pub fn subscribe(&self) -> watch::Receiver<Arc<InventorySnapshot>> {
        self.notifier.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::NetworkRecord;
    use std::path::PathBuf;

    fn network(id: &str, name: &str) -> ResourceRecord {
        ResourceRecord::Network(NetworkRecord {
            id: id.to_string(),
            name: name.to_string(),
            driver: "bridge".to_string(),
            scope: "local".to_string(),
        })
    }

    fn project(name: &str) -> ProjectRecord {
        ProjectRecord {
            name: name.to_string(),
            path: PathBuf::from("/projects").join(name),
        }
    }

    #[test]
    fn test_replace_kind_swaps_whole_set() {
        let store = InventoryStore::new();
        store.replace_kind(
            ResourceKind::Network,
            vec![network("aaaaaaaaaaaa", "one"), network("bbbbbbbbbbbb", "two")],
        );
        store.replace_kind(ResourceKind::Network, vec![network("cccccccccccc", "three")]);

        let snapshot = store.snapshot();
        let ids: Vec<&str> = snapshot
            .records_of(ResourceKind::Network)
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(ids, vec!["cccccccccccc"]);
        assert_eq!(snapshot.version, 2);
    }

    #[test]
    fn test_duplicate_id_last_wins() {
        let store = InventoryStore::new();
        store.replace_kind(
            ResourceKind::Network,
            vec![network("aaaaaaaaaaaa", "first"), network("aaaaaaaaaaaa", "second")],
        );
        let record = store.get(ResourceKind::Network, "aaaaaaaaaaaa").unwrap();
        assert_eq!(record.display_name(), "second");
        assert_eq!(store.snapshot().len(), 1);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let store = InventoryStore::new();
        let err = store.get(ResourceKind::Container, "abc123456789").unwrap_err();
        assert!(matches!(err, DockError::NotFound { kind: ResourceKind::Container, .. }));
    }

    #[test]
    fn test_resolve_by_prefix() {
        let store = InventoryStore::new();
        store.replace_kind(
            ResourceKind::Network,
            vec![network("aaaaaaaaaaaa1111", "one"), network("bbbbbbbbbbbb2222", "two")],
        );
        let record = store.resolve(ResourceKind::Network, "aaaaaaaaaaaa").unwrap();
        assert_eq!(record.display_name(), "one");
        assert!(store.resolve(ResourceKind::Network, "cccccccccccc").is_err());
    }

    #[test]
    fn test_snapshot_is_isolated_from_later_writes() {
        let store = InventoryStore::new();
        store.replace_kind(ResourceKind::Network, vec![network("aaaaaaaaaaaa", "one")]);
        let before = store.snapshot();
        store.replace_kind(ResourceKind::Network, Vec::new());

        assert_eq!(before.records_of(ResourceKind::Network).len(), 1);
        assert!(store.snapshot().records_of(ResourceKind::Network).is_empty());
    }

    #[test]
    fn test_projects_are_incremental() {
        let store = InventoryStore::new();
        store.replace_kind(ResourceKind::Network, vec![network("aaaaaaaaaaaa", "one")]);
        store.upsert_project(project("web"));
        store.upsert_project(project("api"));
        store.remove_project("web").unwrap();

        let snapshot = store.snapshot();
        let names: Vec<&str> = snapshot
            .records_of(ResourceKind::Project)
            .iter()
            .map(|r| r.id())
            .collect();
        assert_eq!(names, vec!["api"]);
        assert_eq!(snapshot.records_of(ResourceKind::Network).len(), 1);
        assert!(store.remove_project("web").is_err());
    }

    #[test]
    fn test_mismatched_kind_is_ignored() {
        let store = InventoryStore::new();
        store.replace_kind(ResourceKind::Container, vec![network("aaaaaaaaaaaa", "one")]);
        assert!(store.snapshot().is_empty());
        assert!(store.snapshot().has_kind(ResourceKind::Container));
    }

    #[test]
    fn test_subscribers_see_latest_version() {
        let store = InventoryStore::new();
        let rx = store.subscribe();
        store.replace_kind(ResourceKind::Network, vec![network("aaaaaaaaaaaa", "one")]);
        store.upsert_project(project("web"));

        let latest = rx.borrow().clone();
        assert_eq!(latest.version, 2);
        assert_eq!(latest.len(), 2);
    }
}
