//! Registry service identity.

use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};

/// A registered service.
///
/// Identity is the (namespace, group, name) triple and nothing else:
/// equality and hashing ignore the revision counter, so a `Service` stays
/// the same map key across mutations. The namespace is a strong isolation
/// domain; the group is a weak, logical one (e.g. separating a test and a
/// production deployment of the same name).
///
/// The revision increments on every mutation and drives downstream cache
/// invalidation; `last_updated` only ever advances through a mutation.
/// Both are atomics with acquire/release ordering so concurrent readers
/// observe a revision no older than the data that produced it.
#[derive(Debug)]
pub struct Service {
    namespace: String,
    group: String,
    name: String,
    ephemeral: bool,
    revision: AtomicU64,
    last_updated_ms: AtomicU64,
}

impl Service {
    /// Create an ephemeral service.
    pub fn new(namespace: impl Into<String>, group: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_ephemeral(namespace, group, name, true)
    }

    /// Create a service with an explicit ephemeral flag.
    pub fn with_ephemeral(
        namespace: impl Into<String>,
        group: impl Into<String>,
        name: impl Into<String>,
        ephemeral: bool,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            group: group.into(),
            name: name.into(),
            ephemeral,
            revision: AtomicU64::new(0),
            last_updated_ms: AtomicU64::new(0),
        }
    }

    /// Isolation namespace.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Logical group within the namespace.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Service name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether instances of this service are session-bound ephemeral data.
    pub fn ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Current revision counter.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Time of the last mutation, in milliseconds since the clock epoch.
    pub fn last_updated_ms(&self) -> u64 {
        self.last_updated_ms.load(Ordering::Acquire)
    }

    /// Record a mutation at `now_ms`: bump the revision and advance the
    /// last-updated time. This is the only way either field moves.
    pub fn bump_revision(&self, now_ms: u64) {
        self.last_updated_ms.store(now_ms, Ordering::Release);
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    /// `group@@name` rendering used in grouped lookups.
    pub fn grouped_name(&self) -> String {
        format!("{}@@{}", self.group, self.name)
    }
}

impl PartialEq for Service {
    fn eq(&self, other: &Self) -> bool {
        self.namespace == other.namespace && self.group == other.group && self.name == other.name
    }
}

impl Eq for Service {}

impl Hash for Service {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.namespace.hash(state);
        self.group.hash(state);
        self.name.hash(state);
    }
}

impl std::fmt::Display for Service {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}@@{} (ephemeral={})",
            self.namespace, self.group, self.name, self.ephemeral
        )
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_identity_ignores_revision() {
        let a = Service::new("public", "DEFAULT_GROUP", "orders");
        let b = Service::new("public", "DEFAULT_GROUP", "orders");
        a.bump_revision(100);
        a.bump_revision(200);
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_revision_and_last_updated_advance_together() {
        let service = Service::new("public", "DEFAULT_GROUP", "orders");
        assert_eq!(service.revision(), 0);
        assert_eq!(service.last_updated_ms(), 0);

        service.bump_revision(1234);
        assert_eq!(service.revision(), 1);
        assert_eq!(service.last_updated_ms(), 1234);

        service.bump_revision(5678);
        assert_eq!(service.revision(), 2);
        assert_eq!(service.last_updated_ms(), 5678);
    }

    #[test]
    fn test_different_namespace_is_different_service() {
        let a = Service::new("public", "DEFAULT_GROUP", "orders");
        let b = Service::new("staging", "DEFAULT_GROUP", "orders");
        assert_ne!(a, b);
    }

    #[test]
    fn test_grouped_name() {
        let service = Service::new("public", "DEFAULT_GROUP", "orders");
        assert_eq!(service.grouped_name(), "DEFAULT_GROUP@@orders");
    }
}
