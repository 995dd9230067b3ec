//! Ownership partitioning via consistent hashing.
//!
//! Every data key is owned by exactly one member at any membership
//! snapshot. Ownership must be computable by every node independently and
//! identically — there is no coordinator handing out assignments — so it is
//! a pure function of the member list: members are placed on a hash ring
//! (with virtual nodes for balance) and a key belongs to the first member
//! clockwise from the key's own hash.
//!
//! Consistent hashing keeps key movement minimal: adding or removing one
//! member reassigns only the keys adjacent to that member's ring positions,
//! roughly a `1/N` share, instead of reshuffling everything.
//!
//! The hash is a SHA-256 prefix rather than `DefaultHasher` because
//! placement must agree across processes and releases; `DefaultHasher`
//! guarantees neither.

use std::collections::BTreeMap;

use muster_core::{MemberList, NodeId};
use sha2::{Digest, Sha256};

/// Virtual nodes per member. More points smooth the load distribution at
/// the cost of a larger ring.
const VIRTUAL_NODES: u32 = 128;

/// A consistent-hash ring over the cluster's members.
///
/// Immutable once built; membership changes produce a new ring from the
/// new snapshot rather than mutating in place.
#[derive(Debug, Clone, Default)]
pub struct HashRing {
    ring: BTreeMap<u64, NodeId>,
}

impl HashRing {
    /// Build a ring from a membership snapshot.
    pub fn from_members(members: &MemberList) -> Self {
        let mut ring = BTreeMap::new();
        for member in members.members() {
            let id = member.node_id();
            for vnode in 0..VIRTUAL_NODES {
                let point = hash_point(&format!("{}#{}", id, vnode));
                ring.insert(point, id.clone());
            }
        }
        Self { ring }
    }

    /// The member responsible for `key`, or `None` on an empty ring.
    ///
    /// Deterministic: repeated calls, and calls on any node holding the
    /// same member list, return the same owner.
    pub fn owner(&self, key: &str) -> Option<&NodeId> {
        if self.ring.is_empty() {
            return None;
        }
        let point = hash_point(key);
        self.ring
            .range(point..)
            .next()
            .or_else(|| self.ring.iter().next())
            .map(|(_, id)| id)
    }

    /// Whether `id` owns `key` on this ring.
    pub fn is_owner(&self, key: &str, id: &NodeId) -> bool {
        self.owner(key) == Some(id)
    }

    /// Number of distinct members on the ring.
    pub fn member_count(&self) -> usize {
        let mut ids: Vec<&NodeId> = self.ring.values().collect();
        ids.sort();
        ids.dedup();
        ids.len()
    }

    /// Whether the ring has no members.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

/// First 8 bytes of SHA-256, big-endian, as the ring coordinate.
fn hash_point(input: &str) -> u64 {
    let digest = Sha256::digest(input.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix)
}
