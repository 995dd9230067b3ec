//! Per-data-type component registry.
//!
//! Every data type replicated through the engine registers three
//! components under its type name: storage, a transport agent, and a
//! failed-task handler. The registry is constructed explicitly and handed
//! to the engine — multiple engines in one process (common in tests) each
//! get their own.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use crate::error::DistroError;
use crate::storage::DistroStorage;
use crate::task::DistroTask;
use crate::transport::TransportAgent;

/// Policy for a replication task that exhausted its retries.
///
/// Escalation is the end of the line: whatever the handler decides
/// (drop, count, page), the failure has already been logged by the
/// scheduler — a task is never lost silently.
pub trait FailedTaskHandler: Send + Sync {
    /// Called once per task after the final retry has failed.
    fn on_task_fail(&self, task: &DistroTask);
}

/// Stock handler that records the failure and drops the task.
#[derive(Debug, Default)]
pub struct LoggingFailedTaskHandler;

impl FailedTaskHandler for LoggingFailedTaskHandler {
    fn on_task_fail(&self, task: &DistroTask) {
        warn!(
            kind = ?task.kind,
            resource_type = %task.resource_type,
            target = %task.target,
            retries = task.retries,
            "replication task dropped after exhausting retries"
        );
    }
}

struct TypeComponents {
    storage: Arc<dyn DistroStorage>,
    transport: Arc<dyn TransportAgent>,
    failed_handler: Arc<dyn FailedTaskHandler>,
}

/// Registry of per-data-type plug-ins.
#[derive(Default)]
pub struct ComponentRegistry {
    components: RwLock<HashMap<String, TypeComponents>>,
}

impl ComponentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the component set for a data type, replacing any previous
    /// registration under the same name.
    pub fn register(
        &self,
        resource_type: impl Into<String>,
        storage: Arc<dyn DistroStorage>,
        transport: Arc<dyn TransportAgent>,
        failed_handler: Arc<dyn FailedTaskHandler>,
    ) {
        self.components.write().insert(
            resource_type.into(),
            TypeComponents {
                storage,
                transport,
                failed_handler,
            },
        );
    }

    /// Storage for a data type.
    pub fn storage_of(&self, resource_type: &str) -> Result<Arc<dyn DistroStorage>, DistroError> {
        self.components
            .read()
            .get(resource_type)
            .map(|c| Arc::clone(&c.storage))
            .ok_or_else(|| DistroError::NoSuchType(resource_type.to_string()))
    }

    /// Transport agent for a data type.
    pub fn transport_of(
        &self,
        resource_type: &str,
    ) -> Result<Arc<dyn TransportAgent>, DistroError> {
        self.components
            .read()
            .get(resource_type)
            .map(|c| Arc::clone(&c.transport))
            .ok_or_else(|| DistroError::NoSuchType(resource_type.to_string()))
    }

    /// Failed-task handler for a data type.
    pub fn failed_handler_of(
        &self,
        resource_type: &str,
    ) -> Result<Arc<dyn FailedTaskHandler>, DistroError> {
        self.components
            .read()
            .get(resource_type)
            .map(|c| Arc::clone(&c.failed_handler))
            .ok_or_else(|| DistroError::NoSuchType(resource_type.to_string()))
    }

    /// All registered data-type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.components.read().keys().cloned().collect()
    }
}
