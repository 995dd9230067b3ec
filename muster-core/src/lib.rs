//! # muster-core
//!
//! Foundational types and provider traits for the muster clustered registry.
//!
//! Every other crate in the workspace builds on top of this one:
//!
//! - **Addressing**: [`NetworkAddress`] and [`NodeId`] identify cluster members.
//! - **Membership model**: [`Member`], [`MemberList`], health and role states.
//! - **Time**: the [`TimeProvider`] trait decouples expiry and heartbeat logic
//!   from the wall clock so it can be driven manually in tests.
//! - **Codec**: [`MessageCodec`] pluggable serialization with a [`JsonCodec`]
//!   default, used for replicated requests and snapshots.
//! - **Registry domain objects**: [`Service`], [`ClusterMetadata`],
//!   [`InstanceMetadata`].
//! - **CMDB boundary**: the [`CmdbSource`] trait through which entity labels
//!   are polled from an external configuration-management database, and the
//!   [`Selector`] kinds that filter discovered instances by those labels.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod address;
mod cmdb;
mod codec;
mod member;
mod metadata;
mod selector;
mod service;
mod time;

pub use address::{AddressParseError, NetworkAddress, NodeId};
pub use cmdb::{CmdbSource, Entity, EntityEvent, EntityEventKind, Label};
pub use codec::{CodecError, JsonCodec, MessageCodec};
pub use member::{HealthState, Member, MemberList, MemberRole};
pub use metadata::{ClusterMetadata, HealthCheckType, InstanceMetadata};
pub use selector::{Selector, SelectorParseError};
pub use service::Service;
pub use time::{ManualClock, SystemTimeProvider, TimeProvider};
