//! Replicated-log boundary.
//!
//! The lock service consumes a consensus protocol, it does not implement
//! one. [`LogProtocol`] is the injected seam: `write` proposes an entry
//! and resolves once it is committed and applied, `read` serves a
//! linearizable status query, and processors register per group so one
//! log can host several state machines.
//!
//! [`InMemoryLogProtocol`] is the single-replica stand-in used by tests:
//! it applies writes in submission order under one mutex, which is
//! exactly the ordering contract a real log provides per group.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::error::LockError;
use crate::snapshot::SnapshotOperation;

/// A proposal for the replicated log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriteRequest {
    /// State-machine group the entry routes to.
    pub group: String,
    /// Operation tag, interpreted by the group's processor.
    pub operation: String,
    /// Opaque payload, encoded by the proposer's codec.
    pub data: Vec<u8>,
}

/// A linearizable read against a state-machine group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadRequest {
    /// State-machine group the query routes to.
    pub group: String,
    /// Opaque query payload.
    pub data: Vec<u8>,
}

/// Outcome of an applied write or a served read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogResponse {
    /// Whether the processor accepted and applied the request.
    pub success: bool,
    /// Opaque result payload (empty on failure).
    pub data: Vec<u8>,
}

impl LogResponse {
    /// A successful response carrying `data`.
    pub fn ok(data: Vec<u8>) -> Self {
        Self {
            success: true,
            data,
        }
    }

    /// A failed response with no payload.
    pub fn fail() -> Self {
        Self {
            success: false,
            data: Vec::new(),
        }
    }
}

/// State machine registered under a log group.
///
/// `on_apply` is invoked for committed entries strictly in log order,
/// one at a time; implementations must be deterministic given the entry
/// alone.
pub trait RequestProcessor: Send + Sync {
    /// Group name this processor serves.
    fn group(&self) -> &str;

    /// Apply one committed entry.
    fn on_apply(&self, request: &WriteRequest) -> LogResponse;

    /// Serve a status query.
    fn on_read(&self, request: &ReadRequest) -> LogResponse;

    /// Snapshot hooks for log compaction of this group's state.
    fn snapshot_operations(&self) -> Vec<Arc<dyn SnapshotOperation>>;
}

/// Consensus protocol seam consumed by the lock service.
#[async_trait]
pub trait LogProtocol: Send + Sync {
    /// Propose an entry; resolves after commit and apply.
    async fn write(&self, request: WriteRequest) -> Result<LogResponse, LockError>;

    /// Serve a linearizable read.
    async fn read(&self, request: ReadRequest) -> Result<LogResponse, LockError>;

    /// Register the state machine for a group, replacing any previous one.
    fn add_processor(&self, processor: Arc<dyn RequestProcessor>);
}

/// Single-replica log: writes apply immediately, in submission order.
#[derive(Default)]
pub struct InMemoryLogProtocol {
    processors: RwLock<HashMap<String, Arc<dyn RequestProcessor>>>,
    // Serializes applies the way a real log serializes commits per group.
    apply_gate: Mutex<()>,
}

impl InMemoryLogProtocol {
    /// Create an empty log with no processors.
    pub fn new() -> Self {
        Self::default()
    }

    fn processor_of(&self, group: &str) -> Result<Arc<dyn RequestProcessor>, LockError> {
        self.processors
            .read()
            .get(group)
            .cloned()
            .ok_or_else(|| LockError::Protocol(format!("no processor for group {}", group)))
    }
}

#[async_trait]
impl LogProtocol for InMemoryLogProtocol {
    async fn write(&self, request: WriteRequest) -> Result<LogResponse, LockError> {
        let processor = self.processor_of(&request.group)?;
        let _gate = self.apply_gate.lock();
        Ok(processor.on_apply(&request))
    }

    async fn read(&self, request: ReadRequest) -> Result<LogResponse, LockError> {
        let processor = self.processor_of(&request.group)?;
        Ok(processor.on_read(&request))
    }

    fn add_processor(&self, processor: Arc<dyn RequestProcessor>) {
        self.processors
            .write()
            .insert(processor.group().to_string(), processor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProcessor;

    impl RequestProcessor for EchoProcessor {
        fn group(&self) -> &str {
            "echo"
        }

        fn on_apply(&self, request: &WriteRequest) -> LogResponse {
            LogResponse::ok(request.data.clone())
        }

        fn on_read(&self, request: &ReadRequest) -> LogResponse {
            LogResponse::ok(request.data.clone())
        }

        fn snapshot_operations(&self) -> Vec<Arc<dyn SnapshotOperation>> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn test_write_routes_to_registered_group() {
        let log = InMemoryLogProtocol::new();
        log.add_processor(Arc::new(EchoProcessor));

        let response = log
            .write(WriteRequest {
                group: "echo".to_string(),
                operation: "NOOP".to_string(),
                data: b"payload".to_vec(),
            })
            .await
            .expect("write");
        assert!(response.success);
        assert_eq!(response.data, b"payload");
    }

    #[tokio::test]
    async fn test_unknown_group_is_a_protocol_error() {
        let log = InMemoryLogProtocol::new();
        let result = log
            .write(WriteRequest {
                group: "ghost".to_string(),
                operation: "NOOP".to_string(),
                data: Vec::new(),
            })
            .await;
        assert!(matches!(result, Err(LockError::Protocol(_))));
    }
}
