//! Replicated data model.
//!
//! [`DistroData`] travels in two shapes: full content (push, pull) and
//! checksum-only ([`DistroChecksum`], verify). The checksum is SHA-256 of
//! the payload so that divergence detection never depends on comparing
//! payloads byte-by-byte across the network.

use muster_core::NodeId;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Identifies one replicated datum: a data-type tag plus a unique key.
///
/// Exactly one member owns each `DistroKey` at any membership snapshot;
/// ownership is recomputed from the ring on membership change, never
/// migrated statefully.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DistroKey {
    /// Registered data-type name, e.g. a client-session type.
    pub resource_type: String,
    /// Unique identifier within the type.
    pub key: String,
}

impl DistroKey {
    /// Create a key.
    pub fn new(resource_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            key: key.into(),
        }
    }
}

impl std::fmt::Display for DistroKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.resource_type, self.key)
    }
}

/// A full replicated datum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroData {
    /// The datum's key.
    pub key: DistroKey,
    /// Opaque payload.
    pub payload: Vec<u8>,
    /// Hex SHA-256 of the payload.
    pub checksum: String,
    /// Version/timestamp of the write that produced this datum.
    pub version: u64,
    /// Member that originated the write; the tie-break key for equal
    /// versions.
    pub origin: NodeId,
}

impl DistroData {
    /// Create a datum, computing its checksum from the payload.
    pub fn new(key: DistroKey, payload: Vec<u8>, version: u64, origin: NodeId) -> Self {
        let checksum = payload_checksum(&payload);
        Self {
            key,
            payload,
            checksum,
            version,
            origin,
        }
    }

    /// Whether this datum wins over `other` for the same key.
    ///
    /// Higher version wins. Equal versions break by origin id so that
    /// every replica picks the same winner regardless of arrival order —
    /// without the tie-break, two concurrent same-version writes could
    /// leave replicas permanently split.
    pub fn supersedes(&self, other: &DistroData) -> bool {
        self.version > other.version
            || (self.version == other.version && self.origin > other.origin)
    }

    /// The checksum-only form used by the verify protocol.
    pub fn summary(&self) -> DistroChecksum {
        DistroChecksum {
            key: self.key.clone(),
            checksum: self.checksum.clone(),
            version: self.version,
        }
    }
}

/// Checksum-only form of a datum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistroChecksum {
    /// The datum's key.
    pub key: DistroKey,
    /// Hex SHA-256 of the owner's payload.
    pub checksum: String,
    /// The owner's version.
    pub version: u64,
}

/// Hex SHA-256 of a payload.
pub fn payload_checksum(payload: &[u8]) -> String {
    hex::encode(Sha256::digest(payload))
}
