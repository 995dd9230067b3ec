//! Lock domain types.
//!
//! Everything here crosses the replicated log, so every type derives
//! serde and carries no non-deterministic state. In particular the
//! absolute expiry is fixed by the proposing member BEFORE the request
//! enters the log: every replica then applies the identical entry,
//! regardless of when its own apply runs.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Identity of one lock: a lock type (e.g. `"mutex"`) plus a key string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockKey {
    /// Kind of lock, routing to the matching state machine semantics.
    pub lock_type: String,
    /// Unique key within the lock type.
    pub key: String,
}

impl LockKey {
    /// Build a key from its two parts.
    pub fn new(lock_type: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            lock_type: lock_type.into(),
            key: key.into(),
        }
    }
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.lock_type, self.key)
    }
}

/// One lock grant: key, caller-supplied parameters, and the absolute
/// time (as a duration since the service epoch) at which it lapses.
///
/// An entry is held only while `now < expire_at`; at or past the expiry
/// the key is acquirable again without an explicit release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockInfo {
    /// Lock being granted.
    pub key: LockKey,
    /// Free-form caller attributes (holder identity, connection id, ...).
    pub params: HashMap<String, String>,
    /// Absolute expiry, fixed by the proposer.
    pub expire_at: Duration,
}

impl LockInfo {
    /// Whether this grant is still live at `now`.
    pub fn is_live(&self, now: Duration) -> bool {
        now < self.expire_at
    }
}

/// Wire payload of an acquire or release proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutexLockRequest {
    /// The grant being proposed or released.
    pub lock_info: LockInfo,
}

/// Operation tag carried by a replicated lock request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockOperation {
    /// Install a grant if the key is free or its holder expired.
    Acquire,
    /// Remove a live grant.
    Release,
}

impl LockOperation {
    /// The string tag used on the wire.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Acquire => "ACQUIRE",
            Self::Release => "RELEASE",
        }
    }

    /// Parse a wire tag. Unknown tags are `None`, not a panic: the log
    /// may replay entries written by a newer version.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "ACQUIRE" => Some(Self::Acquire),
            "RELEASE" => Some(Self::Release),
            _ => None,
        }
    }
}
