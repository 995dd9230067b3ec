//! # muster-lock
//!
//! The strongly-consistent ("CP") distributed lock service.
//!
//! Locks are a replicated state machine: every `lock`/`unlock` call is
//! proposed to an injected replicated log ([`LogProtocol`]), and once
//! committed is applied identically on every replica by the
//! [`LockProcessor`], which reduces the entry stream into a
//! [`LockTable`] of key to grant-with-expiry. Consensus itself is
//! outside this crate; [`InMemoryLogProtocol`] stands in for it in
//! tests.
//!
//! Grants always expire. The absolute expiry is stamped by the proposing
//! member (clamped to configured bounds) before the entry enters the
//! log, so replicas apply deterministically and a caller's clock can
//! never keep a lock alive. A crashed holder's lock frees itself when
//! the expiry passes; no session tracking is needed.
//!
//! Snapshot hooks ([`SnapshotOperation`]) let the log compact: the whole
//! table serializes under the same exclusive lock the apply path uses,
//! so a snapshot never captures a half-applied entry.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod error;
mod processor;
mod protocol;
mod service;
mod snapshot;
mod table;
mod types;

pub use error::LockError;
pub use processor::{LockProcessor, LOCK_GROUP};
pub use protocol::{
    InMemoryLogProtocol, LogProtocol, LogResponse, ReadRequest, RequestProcessor, WriteRequest,
};
pub use service::{LockConfig, LockService};
pub use snapshot::{
    InMemorySnapshotStore, LockSnapshotOperation, SnapshotOperation, SnapshotStore,
};
pub use table::LockTable;
pub use types::{LockInfo, LockKey, LockOperation, MutexLockRequest};
