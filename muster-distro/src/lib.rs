//! # muster-distro
//!
//! The eventually-consistent ("AP") replication engine for ephemeral
//! registry data — live service instances and other session-bound state
//! whose churn rate rules out majority-commit replication.
//!
//! ## Protocol
//!
//! Responsibility for every key is partitioned across the cluster by the
//! ownership ring in `muster-cluster`. Three mechanisms keep replicas
//! converged:
//!
//! - **Push on write** — when the owning member mutates a key, the full
//!   [`DistroData`] is enqueued for asynchronous delivery to every
//!   non-owning member. The local write never waits on replication.
//! - **Verify** — periodically the owner sends checksum-only summaries of
//!   its keys to each peer; a peer holding a divergent or missing copy
//!   schedules a pull. This repairs pushes lost to crashes or partitions
//!   without re-sending unchanged payloads.
//! - **Pull** — a member joining (or recovering from unreachability)
//!   bulk-pulls each data type to rebuild its view.
//!
//! Conflicts converge by version: the higher version wins, equal versions
//! break by origin member id, and applying the same datum twice is a
//! no-op — the protocol stays correct under reordering and duplication.
//!
//! ## Plug-in boundary
//!
//! Each data type registers its own [`DistroStorage`], [`TransportAgent`],
//! and [`FailedTaskHandler`] in a [`ComponentRegistry`] that is passed to
//! the engine at construction. The registry is an explicit object, not
//! global state, so independent engines (and tests) never collide.

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]

mod engine;
mod error;
mod registry;
mod storage;
mod task;
mod transport;
mod types;

pub use engine::DistroEngine;
pub use error::DistroError;
pub use registry::{ComponentRegistry, FailedTaskHandler, LoggingFailedTaskHandler};
pub use storage::{apply_if_newer, DistroStorage, InMemoryStorage};
pub use task::{DistroConfig, DistroTask, TaskKind, TaskScheduler};
pub use transport::TransportAgent;
pub use types::{payload_checksum, DistroChecksum, DistroData, DistroKey};
