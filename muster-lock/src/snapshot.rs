//! Snapshot hooks for log compaction.
//!
//! The consensus layer decides WHEN to snapshot; these traits define
//! WHAT gets captured. A [`SnapshotOperation`] serializes one state
//! machine's state into a [`SnapshotStore`] and can rebuild it later,
//! letting the log truncate everything the snapshot already reflects.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use muster_core::{JsonCodec, MessageCodec};
use parking_lot::{Mutex, RwLock};
use tracing::info;

use crate::error::LockError;
use crate::table::LockTable;
use crate::types::LockInfo;

/// Blob name the lock table is stored under.
const LOCK_TABLE_BLOB: &str = "lock_table";

/// Durable store for snapshot blobs.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist a named blob, replacing any previous version.
    async fn write_blob(&self, name: &str, bytes: Vec<u8>) -> Result<(), LockError>;

    /// Read back a named blob, `None` when it was never written.
    async fn read_blob(&self, name: &str) -> Result<Option<Vec<u8>>, LockError>;
}

/// One state machine's save/load hooks.
#[async_trait]
pub trait SnapshotOperation: Send + Sync {
    /// Capture current state into the store.
    async fn save(&self, store: &dyn SnapshotStore) -> Result<(), LockError>;

    /// Rebuild state from the store.
    async fn load(&self, store: &dyn SnapshotStore) -> Result<(), LockError>;
}

/// Snapshot hooks over a shared lock table.
pub struct LockSnapshotOperation {
    table: Arc<RwLock<LockTable>>,
    codec: JsonCodec,
}

impl LockSnapshotOperation {
    /// Hooks over the given table handle.
    pub fn new(table: Arc<RwLock<LockTable>>) -> Self {
        Self {
            table,
            codec: JsonCodec,
        }
    }
}

#[async_trait]
impl SnapshotOperation for LockSnapshotOperation {
    async fn save(&self, store: &dyn SnapshotStore) -> Result<(), LockError> {
        // Exclusive capture: an in-flight apply must never be split
        // across the snapshot boundary.
        let entries = {
            let table = self.table.write();
            table.snapshot()
        };
        let count = entries.len();
        let bytes = self.codec.encode(&entries)?;
        store.write_blob(LOCK_TABLE_BLOB, bytes).await?;
        info!(entries = count, "lock table snapshot saved");
        Ok(())
    }

    async fn load(&self, store: &dyn SnapshotStore) -> Result<(), LockError> {
        let bytes = store
            .read_blob(LOCK_TABLE_BLOB)
            .await?
            .ok_or_else(|| LockError::SnapshotMissing(LOCK_TABLE_BLOB.to_string()))?;
        let entries: Vec<LockInfo> = self.codec.decode(&bytes)?;
        let count = entries.len();
        self.table.write().restore(entries);
        info!(entries = count, "lock table snapshot restored");
        Ok(())
    }
}

/// Map-backed snapshot store for tests.
#[derive(Default)]
pub struct InMemorySnapshotStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl InMemorySnapshotStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn write_blob(&self, name: &str, bytes: Vec<u8>) -> Result<(), LockError> {
        self.blobs.lock().insert(name.to_string(), bytes);
        Ok(())
    }

    async fn read_blob(&self, name: &str) -> Result<Option<Vec<u8>>, LockError> {
        Ok(self.blobs.lock().get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::types::LockKey;

    use super::*;

    fn table_with_entry() -> Arc<RwLock<LockTable>> {
        let mut table = LockTable::new();
        table.try_lock(
            LockInfo {
                key: LockKey::new("mutex", "job-7"),
                params: HashMap::new(),
                expire_at: Duration::from_secs(30),
            },
            Duration::ZERO,
        );
        Arc::new(RwLock::new(table))
    }

    #[tokio::test]
    async fn test_save_then_load_rebuilds_table() {
        let original = table_with_entry();
        let store = InMemorySnapshotStore::new();

        LockSnapshotOperation::new(Arc::clone(&original))
            .save(&store)
            .await
            .expect("save");

        let rebuilt = Arc::new(RwLock::new(LockTable::new()));
        LockSnapshotOperation::new(Arc::clone(&rebuilt))
            .load(&store)
            .await
            .expect("load");

        assert_eq!(*rebuilt.read(), *original.read());
    }

    #[tokio::test]
    async fn test_load_without_snapshot_is_an_error() {
        let store = InMemorySnapshotStore::new();
        let table = Arc::new(RwLock::new(LockTable::new()));
        let result = LockSnapshotOperation::new(table).load(&store).await;
        assert!(matches!(result, Err(LockError::SnapshotMissing(_))));
    }
}
