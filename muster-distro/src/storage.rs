//! Per-data-type storage.
//!
//! Each registered data type brings its own [`DistroStorage`]; the engine
//! is the only writer (transport code never touches storage directly).
//! [`InMemoryStorage`] is the stock implementation for ephemeral data —
//! ephemeral state is rebuilt from peers on restart, so nothing needs to
//! survive a process exit.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::types::{DistroData, DistroKey};

/// Local payload store for one data type.
pub trait DistroStorage: Send + Sync {
    /// The datum for `key`, if present.
    fn get(&self, key: &DistroKey) -> Option<DistroData>;

    /// Store a datum, replacing any existing entry for its key.
    fn put(&self, data: DistroData);

    /// Remove the datum for `key`. Returns whether an entry existed.
    fn remove(&self, key: &DistroKey) -> bool;

    /// All keys currently stored.
    fn list_keys(&self) -> Vec<DistroKey>;
}

/// Version-gated apply.
///
/// The replication protocol may deliver pushes and pulls out of order or
/// more than once; this is the single point that makes application
/// idempotent. Returns whether the incoming datum was stored.
pub fn apply_if_newer(storage: &dyn DistroStorage, incoming: DistroData) -> bool {
    match storage.get(&incoming.key) {
        Some(existing) if !incoming.supersedes(&existing) => false,
        _ => {
            storage.put(incoming);
            true
        }
    }
}

/// Hash-map storage for ephemeral data.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    entries: RwLock<HashMap<DistroKey, DistroData>>,
}

impl InMemoryStorage {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DistroStorage for InMemoryStorage {
    fn get(&self, key: &DistroKey) -> Option<DistroData> {
        self.entries.read().get(key).cloned()
    }

    fn put(&self, data: DistroData) {
        self.entries.write().insert(data.key.clone(), data);
    }

    fn remove(&self, key: &DistroKey) -> bool {
        self.entries.write().remove(key).is_some()
    }

    fn list_keys(&self) -> Vec<DistroKey> {
        self.entries.read().keys().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use muster_core::NodeId;

    use super::*;

    fn data(key: &str, version: u64, origin: &str) -> DistroData {
        DistroData::new(
            DistroKey::new("session", key),
            format!("v{}", version).into_bytes(),
            version,
            NodeId(origin.to_string()),
        )
    }

    #[test]
    fn test_put_get_remove() {
        let storage = InMemoryStorage::new();
        let d = data("c1", 1, "n1");

        storage.put(d.clone());
        assert_eq!(storage.get(&d.key), Some(d.clone()));
        assert_eq!(storage.list_keys(), vec![d.key.clone()]);

        assert!(storage.remove(&d.key));
        assert!(!storage.remove(&d.key));
        assert!(storage.get(&d.key).is_none());
    }

    #[test]
    fn test_apply_if_newer_accepts_first_write() {
        let storage = InMemoryStorage::new();
        assert!(apply_if_newer(&storage, data("c1", 1, "n1")));
        assert_eq!(storage.len(), 1);
    }

    #[test]
    fn test_apply_if_newer_rejects_stale_and_duplicate() {
        let storage = InMemoryStorage::new();
        assert!(apply_if_newer(&storage, data("c1", 5, "n1")));

        // Stale version: rejected.
        assert!(!apply_if_newer(&storage, data("c1", 4, "n2")));
        // Exact duplicate: no-op.
        assert!(!apply_if_newer(&storage, data("c1", 5, "n1")));

        let stored = storage.get(&DistroKey::new("session", "c1")).expect("kept");
        assert_eq!(stored.version, 5);
    }

    #[test]
    fn test_apply_if_newer_takes_higher_version() {
        let storage = InMemoryStorage::new();
        apply_if_newer(&storage, data("c1", 5, "n1"));
        assert!(apply_if_newer(&storage, data("c1", 6, "n2")));
        let stored = storage.get(&DistroKey::new("session", "c1")).expect("kept");
        assert_eq!(stored.version, 6);
    }
}
