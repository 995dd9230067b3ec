//! Membership directory.
//!
//! The directory is the single authority for "who is in the cluster right
//! now". Lookup strategies push fresh member lists into it via
//! [`MemberDirectory::after_lookup`]; everything else reads snapshots out
//! of it or subscribes to change notifications.
//!
//! Readers never block writers for long: the current snapshot and the
//! ring built from it sit behind a short-critical-section `RwLock`, and
//! change fanout goes through a `tokio::sync::watch` channel so a slow
//! subscriber only ever sees the latest snapshot, never a backlog.

use muster_core::{Member, MemberList, NodeId};
use parking_lot::RwLock;
use tokio::sync::watch;
use tracing::{debug, info};

use crate::partition::HashRing;

/// Authoritative holder of the current cluster member list.
#[derive(Debug)]
pub struct MemberDirectory {
    state: RwLock<DirectoryState>,
    tx: watch::Sender<MemberList>,
}

#[derive(Debug)]
struct DirectoryState {
    members: MemberList,
    ring: HashRing,
}

impl MemberDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(MemberList::default());
        Self {
            state: RwLock::new(DirectoryState {
                members: MemberList::default(),
                ring: HashRing::default(),
            }),
            tx,
        }
    }

    /// Publish a fresh member list from a lookup strategy.
    ///
    /// Idempotent under redelivery: a list matching the current snapshot
    /// (after dedup and ordering) changes nothing and notifies nobody.
    /// Returns whether the snapshot actually changed.
    ///
    /// Change detection compares full member state, not just addresses:
    /// a heartbeat loss arrives as the same address set with a new
    /// health state, and subscribers must see it.
    pub fn after_lookup(&self, members: Vec<Member>) -> bool {
        let snapshot = MemberList::new(members);
        {
            let mut state = self.state.write();
            if state.members.same_state_as(&snapshot) {
                debug!(members = snapshot.len(), "lookup redelivered unchanged list");
                return false;
            }
            state.ring = HashRing::from_members(&snapshot);
            state.members = snapshot.clone();
        }
        info!(members = snapshot.len(), "membership changed");
        // Subscribers re-partition from the snapshot itself; send_replace
        // keeps this correct even with no active receivers.
        self.tx.send_replace(snapshot);
        true
    }

    /// The current membership snapshot.
    pub fn current(&self) -> MemberList {
        self.state.read().members.clone()
    }

    /// The member responsible for `key` under the current snapshot.
    pub fn owner(&self, key: &str) -> Option<NodeId> {
        self.state.read().ring.owner(key).cloned()
    }

    /// Whether `id` owns `key` under the current snapshot.
    pub fn is_owner(&self, key: &str, id: &NodeId) -> bool {
        self.state.read().ring.is_owner(key, id)
    }

    /// Subscribe to membership changes. The receiver always starts with
    /// the snapshot current at subscription time.
    pub fn subscribe(&self) -> watch::Receiver<MemberList> {
        self.tx.subscribe()
    }
}

impl Default for MemberDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use muster_core::{HealthState, NetworkAddress};

    use super::*;

    fn member(last_octet: u8) -> Member {
        Member::new(NetworkAddress::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
            8848,
        ))
    }

    #[test]
    fn test_after_lookup_publishes_snapshot() {
        let directory = MemberDirectory::new();
        assert!(directory.after_lookup(vec![member(1), member(2)]));
        assert_eq!(directory.current().len(), 2);
    }

    #[test]
    fn test_after_lookup_is_idempotent_on_unchanged_list() {
        let directory = MemberDirectory::new();
        assert!(directory.after_lookup(vec![member(1), member(2)]));
        // Same set, different order: still unchanged.
        assert!(!directory.after_lookup(vec![member(2), member(1)]));
    }

    #[test]
    fn test_health_state_change_publishes() {
        let directory = MemberDirectory::new();
        assert!(directory.after_lookup(vec![member(1), member(2)]));

        // Same addresses, one member now down: this is a change.
        let mut down = member(1);
        down.state = HealthState::Down;
        assert!(directory.after_lookup(vec![down, member(2)]));

        let current = directory.current();
        let stored = current.get(&member(1).node_id()).expect("member present");
        assert_eq!(stored.state, HealthState::Down);
        assert_eq!(current.healthy().count(), 1);
    }

    #[test]
    fn test_heartbeat_refresh_publishes() {
        let directory = MemberDirectory::new();
        directory.after_lookup(vec![member(1)]);

        let mut beaten = member(1);
        beaten.record_heartbeat(std::time::Duration::from_secs(7));
        assert!(directory.after_lookup(vec![beaten]));
        let current = directory.current();
        let stored = current.get(&member(1).node_id()).expect("member present");
        assert_eq!(stored.last_heartbeat, std::time::Duration::from_secs(7));
    }

    #[test]
    fn test_ownership_follows_membership() {
        let directory = MemberDirectory::new();
        assert!(directory.owner("some-key").is_none());

        directory.after_lookup(vec![member(1)]);
        let only = member(1).node_id();
        assert_eq!(directory.owner("some-key"), Some(only.clone()));
        assert!(directory.is_owner("some-key", &only));
    }

    #[tokio::test]
    async fn test_subscribers_see_changes_not_redeliveries() {
        let directory = MemberDirectory::new();
        let mut rx = directory.subscribe();

        directory.after_lookup(vec![member(1)]);
        rx.changed().await.expect("change notification");
        assert_eq!(rx.borrow_and_update().len(), 1);

        // Redelivery of the same list must not wake the subscriber.
        directory.after_lookup(vec![member(1)]);
        assert!(!rx.has_changed().expect("channel alive"));

        directory.after_lookup(vec![member(1), member(2)]);
        rx.changed().await.expect("change notification");
        assert_eq!(rx.borrow_and_update().len(), 2);
    }
}
