//! Distro error type.

use thiserror::Error;

/// Errors from the replication engine.
///
/// Transport and storage failures here are *replication* faults: they are
/// retried by the task scheduler and escalated to the data type's failed
/// task handler, never surfaced synchronously to the writer that
/// triggered the replication.
#[derive(Debug, Error)]
pub enum DistroError {
    /// Sending to a peer failed.
    #[error("transport to {peer} failed: {reason}")]
    Transport {
        /// The unreachable peer.
        peer: String,
        /// What went wrong.
        reason: String,
    },

    /// Local storage rejected an operation.
    #[error("storage error: {0}")]
    Storage(String),

    /// No components are registered for the data type.
    #[error("no components registered for data type {0:?}")]
    NoSuchType(String),

    /// No member owns the key (empty member list).
    #[error("no owner for key {0:?}")]
    NoOwner(String),

    /// The task queue for a data type has shut down.
    #[error("task queue for {0:?} is closed")]
    QueueClosed(String),
}
