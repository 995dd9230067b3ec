//! Cluster member model.
//!
//! A [`Member`] is one node in the cluster as seen by the membership
//! directory: its address, health state, role, and the time of its last
//! heartbeat. A [`MemberList`] is an immutable, address-deduplicated,
//! sorted snapshot of the whole cluster — the unit that lookup strategies
//! publish and that the ownership partitioner consumes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::address::{NetworkAddress, NodeId};

/// Health state of a cluster member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthState {
    /// The member is reachable and heartbeating.
    Up,
    /// Heartbeats have been missed but the member is not yet declared dead.
    Suspect,
    /// The member has sustained heartbeat failure and is considered gone.
    Down,
}

/// Role of a member within the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberRole {
    /// Eligible to lead consensus groups.
    LeaderCapable,
    /// Participates in replication but never leads.
    FollowerOnly,
}

/// One node in the cluster.
///
/// Created and refreshed by a lookup strategy; removed from published
/// snapshots on sustained heartbeat failure. Equality considers only the
/// address — two `Member` values for the same address describe the same
/// node at different moments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    /// Network address of the member.
    pub address: NetworkAddress,
    /// Current health state.
    pub state: HealthState,
    /// Consensus role.
    pub role: MemberRole,
    /// Time of the last heartbeat, as a duration since the time provider's
    /// epoch. `Duration::ZERO` for a member that has never heartbeated.
    pub last_heartbeat: Duration,
}

impl Member {
    /// Create an `Up`, leader-capable member that has not heartbeated yet.
    pub fn new(address: NetworkAddress) -> Self {
        Self {
            address,
            state: HealthState::Up,
            role: MemberRole::LeaderCapable,
            last_heartbeat: Duration::ZERO,
        }
    }

    /// Stable identity of this member.
    pub fn node_id(&self) -> NodeId {
        self.address.node_id()
    }

    /// Record a heartbeat observed at `now`, marking the member `Up`.
    pub fn record_heartbeat(&mut self, now: Duration) {
        self.last_heartbeat = now;
        self.state = HealthState::Up;
    }

    /// Whether the member has gone longer than `timeout` without a heartbeat.
    pub fn is_timed_out(&self, now: Duration, timeout: Duration) -> bool {
        now.saturating_sub(self.last_heartbeat) > timeout
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.address == other.address
    }
}

impl Eq for Member {}

/// An immutable membership snapshot.
///
/// Members are deduplicated by address (the last occurrence wins, matching
/// lookup redelivery semantics) and sorted by address so that every node
/// building a snapshot from the same input produces an identical list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MemberList {
    members: Vec<Member>,
}

impl MemberList {
    /// Build a snapshot from an arbitrary collection of members.
    pub fn new(members: Vec<Member>) -> Self {
        let mut deduped: Vec<Member> = Vec::with_capacity(members.len());
        for member in members {
            if let Some(existing) = deduped.iter_mut().find(|m| m.address == member.address) {
                *existing = member;
            } else {
                deduped.push(member);
            }
        }
        deduped.sort_by(|a, b| a.address.cmp(&b.address));
        Self { members: deduped }
    }

    /// All members in address order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the snapshot is empty.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Look up a member by node id.
    pub fn get(&self, id: &NodeId) -> Option<&Member> {
        self.members.iter().find(|m| &m.node_id() == id)
    }

    /// Whether a member with the given id is present.
    pub fn contains(&self, id: &NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Node ids of every member except `me`, in address order.
    ///
    /// This is the peer set a member pushes replicated data to.
    pub fn peers_of(&self, me: &NodeId) -> Vec<NodeId> {
        self.members
            .iter()
            .map(Member::node_id)
            .filter(|id| id != me)
            .collect()
    }

    /// Members whose health state is `Up`.
    pub fn healthy(&self) -> impl Iterator<Item = &Member> {
        self.members
            .iter()
            .filter(|m| m.state == HealthState::Up)
    }

    /// Whether `other` describes the same members in the same observed
    /// state.
    ///
    /// `==` compares identity only (addresses, via `Member::eq`), which
    /// is the right notion for set membership but not for change
    /// detection: a heartbeat loss redelivers the same addresses with a
    /// different health state, and that IS a change. This compares
    /// state, role, and heartbeat as well. Both lists are sorted by
    /// address, so positional comparison suffices.
    pub fn same_state_as(&self, other: &MemberList) -> bool {
        self.members.len() == other.members.len()
            && self
                .members
                .iter()
                .zip(other.members.iter())
                .all(|(a, b)| {
                    a.address == b.address
                        && a.state == b.state
                        && a.role == b.role
                        && a.last_heartbeat == b.last_heartbeat
                })
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    fn member(last_octet: u8) -> Member {
        Member::new(NetworkAddress::new(
            IpAddr::V4(Ipv4Addr::new(10, 0, 0, last_octet)),
            8848,
        ))
    }

    #[test]
    fn test_member_equality_is_address_only() {
        let mut a = member(1);
        let b = member(1);
        a.record_heartbeat(Duration::from_secs(5));
        assert_eq!(a, b);
    }

    #[test]
    fn test_heartbeat_recovers_suspect_member() {
        let mut m = member(1);
        m.state = HealthState::Suspect;
        m.record_heartbeat(Duration::from_secs(3));
        assert_eq!(m.state, HealthState::Up);
        assert_eq!(m.last_heartbeat, Duration::from_secs(3));
    }

    #[test]
    fn test_timeout_detection() {
        let mut m = member(1);
        m.record_heartbeat(Duration::from_secs(10));

        let timeout = Duration::from_secs(5);
        assert!(!m.is_timed_out(Duration::from_secs(14), timeout));
        assert!(!m.is_timed_out(Duration::from_secs(15), timeout));
        assert!(m.is_timed_out(Duration::from_secs(16), timeout));
    }

    #[test]
    fn test_member_list_dedups_by_address_last_wins() {
        let mut refreshed = member(1);
        refreshed.record_heartbeat(Duration::from_secs(9));

        let list = MemberList::new(vec![member(1), member(2), refreshed]);
        assert_eq!(list.len(), 2);

        let id = member(1).node_id();
        let stored = list.get(&id).expect("member present");
        assert_eq!(stored.last_heartbeat, Duration::from_secs(9));
    }

    #[test]
    fn test_same_state_as_sees_health_changes_equality_misses() {
        let up = MemberList::new(vec![member(1), member(2)]);

        let mut suspect = member(1);
        suspect.state = HealthState::Suspect;
        let degraded = MemberList::new(vec![suspect, member(2)]);

        // Identity-equal, state-different.
        assert_eq!(up, degraded);
        assert!(!up.same_state_as(&degraded));
        assert!(up.same_state_as(&up.clone()));
    }

    #[test]
    fn test_same_state_as_sees_heartbeat_changes() {
        let before = MemberList::new(vec![member(1)]);
        let mut beaten = member(1);
        beaten.record_heartbeat(Duration::from_secs(4));
        let after = MemberList::new(vec![beaten]);
        assert!(!before.same_state_as(&after));
    }

    #[test]
    fn test_member_list_sorted_regardless_of_input_order() {
        let a = MemberList::new(vec![member(3), member(1), member(2)]);
        let b = MemberList::new(vec![member(2), member(3), member(1)]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_peers_of_excludes_self() {
        let list = MemberList::new(vec![member(1), member(2), member(3)]);
        let me = member(2).node_id();
        let peers = list.peers_of(&me);
        assert_eq!(peers.len(), 2);
        assert!(!peers.contains(&me));
    }

    #[test]
    fn test_healthy_filter() {
        let mut down = member(2);
        down.state = HealthState::Down;
        let list = MemberList::new(vec![member(1), down]);
        assert_eq!(list.healthy().count(), 1);
    }
}
