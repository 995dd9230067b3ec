//! CMDB boundary.
//!
//! An external configuration-management database supplies entity labels
//! (machine room, rack, environment, …) that the naming layer uses for
//! label-based instance selection. The registry polls and caches this
//! source on an interval; it is never consulted on a per-lookup basis.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

/// A label definition: its name and the set of values it may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    /// Label name.
    pub name: String,
    /// Allowed values.
    pub values: HashSet<String>,
}

/// An entity known to the CMDB, e.g. a host or a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity name, unique within its type.
    pub name: String,
    /// Entity type, e.g. `ip`.
    pub entity_type: String,
    /// Label name → label value for this entity.
    pub labels: HashMap<String, String>,
}

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityEventKind {
    /// The entity was added or its labels changed.
    Update,
    /// The entity was removed.
    Remove,
}

/// A change event for incremental cache refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityEvent {
    /// Kind of change.
    pub kind: EntityEventKind,
    /// Name of the affected entity.
    pub entity_name: String,
    /// Type of the affected entity.
    pub entity_type: String,
}

/// Source of CMDB data, implemented by an external provider.
pub trait CmdbSource: Send + Sync {
    /// All label names the source knows about.
    fn label_names(&self) -> HashSet<String>;

    /// All entity types the source knows about.
    fn entity_types(&self) -> HashSet<String>;

    /// A label definition by name.
    fn label(&self, name: &str) -> Option<Label>;

    /// The value of one label on one entity.
    fn label_value(&self, entity_name: &str, entity_type: &str, label_name: &str)
        -> Option<String>;

    /// All label values on one entity.
    fn label_values(&self, entity_name: &str, entity_type: &str) -> HashMap<String, String>;

    /// Every entity, keyed by type then name.
    fn all_entities(&self) -> HashMap<String, HashMap<String, Entity>>;

    /// Change events since `since_ms` (milliseconds since the source epoch).
    fn entity_events(&self, since_ms: u64) -> Vec<EntityEvent>;

    /// One entity by name and type.
    fn entity(&self, entity_name: &str, entity_type: &str) -> Option<Entity>;
}
