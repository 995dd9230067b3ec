//! The deterministic lock state machine.
//!
//! A [`LockTable`] is a plain map from key to grant; all concurrency
//! control lives in the processor around it. Keeping the table itself
//! synchronization-free is what makes snapshot equality and log replay
//! straightforward to reason about.

use std::collections::HashMap;
use std::time::Duration;

use crate::types::{LockInfo, LockKey};

/// Key to current-grant map reduced from committed acquire/release entries.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LockTable {
    entries: HashMap<LockKey, LockInfo>,
}

impl LockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt to install `info` at time `now`.
    ///
    /// Succeeds iff the key has no entry or the existing grant expired;
    /// a live grant by anyone (including the same caller) refuses the
    /// acquire with `false`, never an error.
    pub fn try_lock(&mut self, info: LockInfo, now: Duration) -> bool {
        if let Some(existing) = self.entries.get(&info.key) {
            if existing.is_live(now) {
                return false;
            }
        }
        self.entries.insert(info.key.clone(), info);
        true
    }

    /// Remove the entry for `key`.
    ///
    /// Returns `true` iff a live grant existed. Releasing an absent or
    /// already-expired lock returns `false`; an expired leftover entry is
    /// still swept out.
    pub fn unlock(&mut self, key: &LockKey, now: Duration) -> bool {
        match self.entries.remove(key) {
            Some(existing) => existing.is_live(now),
            None => false,
        }
    }

    /// The live grant for `key` at `now`, if any.
    pub fn holder(&self, key: &LockKey, now: Duration) -> Option<&LockInfo> {
        self.entries.get(key).filter(|info| info.is_live(now))
    }

    /// Number of entries, expired leftovers included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, for snapshot serialization.
    pub fn snapshot(&self) -> Vec<LockInfo> {
        self.entries.values().cloned().collect()
    }

    /// Replace the table wholesale with snapshot entries.
    pub fn restore(&mut self, entries: Vec<LockInfo>) {
        self.entries = entries
            .into_iter()
            .map(|info| (info.key.clone(), info))
            .collect();
    }
}
