//! Lock service errors.

use muster_core::CodecError;
use thiserror::Error;

/// Error from the lock service or its replicated-log boundary.
///
/// A lock that is simply held by someone else is NOT an error — that is
/// the boolean `false` outcome of `lock`. Errors are runtime faults:
/// the log rejected or lost the proposal, a payload would not decode,
/// or a snapshot blob is missing.
#[derive(Debug, Error)]
pub enum LockError {
    /// The replicated log failed to commit or apply a request.
    #[error("log protocol error: {0}")]
    Protocol(String),

    /// A request or snapshot payload failed to encode or decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A snapshot load found no blob under the expected name.
    #[error("snapshot blob missing: {0}")]
    SnapshotMissing(String),
}
