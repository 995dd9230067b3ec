//! # muster-cluster
//!
//! Cluster membership and ownership partitioning for the muster registry.
//!
//! Three pieces cooperate here:
//!
//! - A [`MemberLookup`] strategy discovers the cluster's members — from a
//!   static seed list or by polling an address server — and publishes each
//!   fresh snapshot to the directory.
//! - The [`MemberDirectory`] holds the authoritative [`MemberList`] snapshot,
//!   deduplicates and change-detects published lists, and broadcasts every
//!   change to subscribers (the replication engine re-partitions on each).
//! - The [`HashRing`] maps any data key to exactly one responsible member,
//!   deterministically, as a pure function of the member list — so every
//!   node computes the same owner without coordination, and a single
//!   membership change moves only the keys adjacent to that member in hash
//!   order.
//!
//! [`MemberList`]: muster_core::MemberList

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod directory;
mod error;
mod lookup;
mod partition;

pub use directory::MemberDirectory;
pub use error::ClusterError;
pub use lookup::{AddressServerLookup, AddressSource, MemberLookup, StaticListLookup};
pub use partition::HashRing;
