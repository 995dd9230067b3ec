//! The replication engine.
//!
//! One [`DistroEngine`] runs per process. It owns the task scheduler, the
//! verify timer, and the membership watcher; its public methods split into
//! the local side (a write happened here, replicate it) and the remote
//! side (a peer pushed, verified, or pulled against us).
//!
//! The write path and the replication path are decoupled by design:
//! [`DistroEngine::sync_to_peers`] only enqueues tasks, so a local
//! mutation never waits on, or fails because of, a peer.

use std::sync::Arc;

use muster_cluster::{HashRing, MemberDirectory};
use muster_core::{MemberList, NodeId};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::DistroError;
use crate::registry::ComponentRegistry;
use crate::storage::apply_if_newer;
use crate::task::{DistroConfig, DistroTask, TaskScheduler};
use crate::types::{DistroChecksum, DistroData, DistroKey};

/// Push/verify/pull replication engine for ephemeral data.
pub struct DistroEngine {
    local: NodeId,
    directory: Arc<MemberDirectory>,
    registry: Arc<ComponentRegistry>,
    scheduler: TaskScheduler,
    background: Mutex<Vec<JoinHandle<()>>>,
    config: DistroConfig,
}

impl DistroEngine {
    /// Create an engine for the member identified by `local`.
    pub fn new(
        local: NodeId,
        directory: Arc<MemberDirectory>,
        registry: Arc<ComponentRegistry>,
        config: DistroConfig,
    ) -> Arc<Self> {
        let scheduler = TaskScheduler::new(
            local.clone(),
            Arc::clone(&directory),
            Arc::clone(&registry),
            config.clone(),
        );
        Arc::new(Self {
            local,
            directory,
            registry,
            scheduler,
            background: Mutex::new(Vec::new()),
            config,
        })
    }

    /// This engine's member identity.
    pub fn local(&self) -> &NodeId {
        &self.local
    }

    /// Start workers, the verify timer, and the membership watcher, and
    /// schedule the joining pull for every registered data type.
    pub fn start(self: &Arc<Self>) {
        for resource_type in self.registry.resource_types() {
            self.scheduler.start_worker(&resource_type);
        }

        // Rebuild our view from peers before verify rounds count us.
        if let Err(error) = self.request_full_sync() {
            warn!(%error, "initial pull could not be scheduled");
        }

        let engine = Arc::clone(self);
        let verify_interval = self.config.verify_interval;
        let verify = tokio::spawn(async move {
            loop {
                tokio::time::sleep(verify_interval).await;
                if let Err(error) = engine.run_verify_round() {
                    warn!(%error, "verify round could not be scheduled");
                }
            }
        });

        let engine = Arc::clone(self);
        let mut rx = self.directory.subscribe();
        let watcher = tokio::spawn(async move {
            let mut previous = rx.borrow().clone();
            while rx.changed().await.is_ok() {
                let next = rx.borrow_and_update().clone();
                engine.on_membership_change(&previous, &next);
                previous = next;
            }
        });

        let mut background = self.background.lock();
        background.push(verify);
        background.push(watcher);
        info!(local = %self.local, "distro engine started");
    }

    /// Stop background work and the task workers.
    pub fn shutdown(&self) {
        for handle in self.background.lock().drain(..) {
            handle.abort();
        }
        self.scheduler.shutdown();
    }

    // --- local side ---------------------------------------------------

    /// Replicate a locally-written key to every other member.
    ///
    /// Enqueues one push task per peer and returns immediately; transport
    /// failures are retried and ultimately escalated by the scheduler,
    /// never reported here.
    pub fn sync_to_peers(&self, key: &DistroKey) -> Result<(), DistroError> {
        let peers = self.directory.current().peers_of(&self.local);
        for peer in peers {
            self.scheduler.submit(DistroTask::push(key.clone(), peer))?;
        }
        Ok(())
    }

    /// Schedule one verify task per (data type, peer).
    pub fn run_verify_round(&self) -> Result<(), DistroError> {
        let peers = self.directory.current().peers_of(&self.local);
        for resource_type in self.registry.resource_types() {
            for peer in &peers {
                self.scheduler
                    .submit(DistroTask::verify(resource_type.clone(), peer.clone()))?;
            }
        }
        Ok(())
    }

    /// Schedule a bulk pull of every data type from every peer, used when
    /// joining the cluster or recovering from unreachability.
    pub fn request_full_sync(&self) -> Result<(), DistroError> {
        let peers = self.directory.current().peers_of(&self.local);
        for resource_type in self.registry.resource_types() {
            for peer in &peers {
                self.scheduler
                    .submit(DistroTask::pull(resource_type.clone(), peer.clone()))?;
            }
        }
        Ok(())
    }

    // --- remote side --------------------------------------------------

    /// Apply a datum pushed by a peer. Returns whether it was stored
    /// (`false` for stale or duplicate versions).
    pub fn on_receive(&self, data: DistroData) -> Result<bool, DistroError> {
        let storage = self.registry.storage_of(&data.key.resource_type)?;
        let applied = apply_if_newer(storage.as_ref(), data);
        Ok(applied)
    }

    /// Compare an owner's checksum summaries against local state and
    /// schedule an immediate pull when any entry is divergent or missing.
    pub fn on_verify(
        &self,
        from: &NodeId,
        summaries: &[DistroChecksum],
    ) -> Result<(), DistroError> {
        let mut divergent_types: Vec<String> = Vec::new();
        for summary in summaries {
            let storage = self.registry.storage_of(&summary.key.resource_type)?;
            let diverged = match storage.get(&summary.key) {
                None => true,
                Some(local) => {
                    local.checksum != summary.checksum && summary.version >= local.version
                }
            };
            if diverged && !divergent_types.contains(&summary.key.resource_type) {
                divergent_types.push(summary.key.resource_type.clone());
            }
        }
        for resource_type in divergent_types {
            debug!(%from, %resource_type, "verify detected divergence, pulling");
            self.scheduler
                .submit(DistroTask::pull(resource_type, from.clone()))?;
        }
        Ok(())
    }

    /// Serve a peer's bulk pull: the full local data set for a type.
    pub fn handle_pull(&self, resource_type: &str) -> Result<Vec<DistroData>, DistroError> {
        let storage = self.registry.storage_of(resource_type)?;
        Ok(storage
            .list_keys()
            .into_iter()
            .filter_map(|key| storage.get(&key))
            .collect())
    }

    // --- membership ---------------------------------------------------

    /// React to a membership change: any locally-held key whose owner
    /// moved between the two snapshots is re-pushed to all current peers.
    fn on_membership_change(&self, old: &MemberList, new: &MemberList) {
        let old_ring = HashRing::from_members(old);
        let new_ring = HashRing::from_members(new);
        let mut moved = 0usize;

        for resource_type in self.registry.resource_types() {
            let storage = match self.registry.storage_of(&resource_type) {
                Ok(storage) => storage,
                Err(_) => continue,
            };
            for key in storage.list_keys() {
                let key_str = key.to_string();
                if old_ring.owner(&key_str) == new_ring.owner(&key_str) {
                    continue;
                }
                moved += 1;
                if let Err(error) = self.sync_to_peers(&key) {
                    warn!(%error, %key, "resync scheduling failed");
                }
            }
        }
        info!(
            members = new.len(),
            moved_keys = moved,
            "membership change processed"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use async_trait::async_trait;
    use muster_core::{Member, NetworkAddress};

    use super::*;
    use crate::registry::LoggingFailedTaskHandler;
    use crate::storage::{DistroStorage, InMemoryStorage};
    use crate::transport::TransportAgent;

    struct NullTransport;

    #[async_trait]
    impl TransportAgent for NullTransport {
        async fn send_sync(&self, _: &NodeId, _: &DistroData) -> Result<(), DistroError> {
            Ok(())
        }
        async fn send_async(&self, _: &NodeId, _: &DistroData) -> Result<(), DistroError> {
            Ok(())
        }
        async fn send_verify(&self, _: &NodeId, _: &[DistroChecksum]) -> Result<(), DistroError> {
            Ok(())
        }
        async fn request_pull(&self, _: &NodeId, _: &str) -> Result<Vec<DistroData>, DistroError> {
            Ok(Vec::new())
        }
        fn support_callback_transport(&self) -> bool {
            false
        }
    }

    fn member(last_octet: u8) -> Member {
        Member::new(NetworkAddress::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
            8848,
        ))
    }

    fn engine_with_storage() -> (Arc<DistroEngine>, Arc<InMemoryStorage>) {
        let directory = Arc::new(MemberDirectory::new());
        directory.after_lookup(vec![member(1), member(2)]);

        let storage = Arc::new(InMemoryStorage::new());
        let registry = Arc::new(ComponentRegistry::new());
        registry.register(
            "session",
            Arc::clone(&storage) as Arc<dyn crate::storage::DistroStorage>,
            Arc::new(NullTransport),
            Arc::new(LoggingFailedTaskHandler),
        );

        let engine = DistroEngine::new(
            member(1).node_id(),
            directory,
            registry,
            DistroConfig::for_test(),
        );
        (engine, storage)
    }

    fn data(key: &str, version: u64, origin: &str) -> DistroData {
        DistroData::new(
            DistroKey::new("session", key),
            format!("payload-v{}", version).into_bytes(),
            version,
            NodeId(origin.to_string()),
        )
    }

    #[tokio::test]
    async fn test_on_receive_is_version_idempotent() {
        let (engine, storage) = engine_with_storage();

        assert!(engine.on_receive(data("c1", 3, "n2")).expect("apply"));
        assert!(!engine.on_receive(data("c1", 3, "n2")).expect("dup"));
        assert!(!engine.on_receive(data("c1", 2, "n2")).expect("stale"));
        assert!(engine.on_receive(data("c1", 4, "n2")).expect("newer"));
        assert_eq!(storage.len(), 1);
    }

    #[tokio::test]
    async fn test_on_receive_unknown_type_errors() {
        let (engine, _) = engine_with_storage();
        let mut d = data("c1", 1, "n2");
        d.key.resource_type = "ghost".to_string();
        assert!(matches!(
            engine.on_receive(d),
            Err(DistroError::NoSuchType(_))
        ));
    }

    #[tokio::test]
    async fn test_handle_pull_returns_full_set() {
        let (engine, _) = engine_with_storage();
        engine.on_receive(data("c1", 1, "n2")).expect("apply");
        engine.on_receive(data("c2", 1, "n2")).expect("apply");

        let pulled = engine.handle_pull("session").expect("pull");
        assert_eq!(pulled.len(), 2);
    }

    #[tokio::test]
    async fn test_sync_to_peers_never_blocks_or_errors_on_transport() {
        let (engine, storage) = engine_with_storage();
        let d = data("c1", 1, "10.0.0.1:8848");
        storage.put(d.clone());
        // Queue submission succeeds regardless of peer reachability.
        engine.start();
        engine.sync_to_peers(&d.key).expect("enqueue");
        engine.shutdown();
    }
}
