//! The lock group's request processor.
//!
//! [`LockProcessor`] is the [`RequestProcessor`] registered under the
//! lock group: it decodes committed acquire/release entries and reduces
//! them into the shared [`LockTable`]. Applies and snapshot capture take
//! the write half of the table lock, so an entry is applied atomically
//! with respect to snapshots; status reads take the read half and run
//! concurrently with each other.
//!
//! Malformed entries (unknown operation tag, undecodable payload) yield
//! `success = false` rather than an error: the log has already committed
//! them, so every replica must reduce them to the same (refused) outcome.

use std::sync::Arc;

use muster_core::{JsonCodec, MessageCodec, TimeProvider};
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::protocol::{LogResponse, ReadRequest, RequestProcessor, WriteRequest};
use crate::snapshot::{LockSnapshotOperation, SnapshotOperation};
use crate::table::LockTable;
use crate::types::{LockInfo, LockKey, LockOperation, MutexLockRequest};

/// Log group name the lock state machine registers under.
pub const LOCK_GROUP: &str = "lock";

/// State machine applying committed lock operations to a [`LockTable`].
pub struct LockProcessor {
    table: Arc<RwLock<LockTable>>,
    time: Arc<dyn TimeProvider>,
    codec: JsonCodec,
}

impl LockProcessor {
    /// A processor over a fresh table, judging liveness with `time`.
    pub fn new(time: Arc<dyn TimeProvider>) -> Self {
        Self {
            table: Arc::new(RwLock::new(LockTable::new())),
            time,
            codec: JsonCodec,
        }
    }

    /// The live grant for `key`, if any. Local status query; takes the
    /// shared read path.
    pub fn holder(&self, key: &LockKey) -> Option<LockInfo> {
        self.table.read().holder(key, self.time.now()).cloned()
    }

    /// Handle to the shared table, for snapshot hooks and tests.
    pub fn table(&self) -> Arc<RwLock<LockTable>> {
        Arc::clone(&self.table)
    }

    fn apply(&self, operation: LockOperation, request: MutexLockRequest) -> bool {
        let now = self.time.now();
        let mut table = self.table.write();
        match operation {
            LockOperation::Acquire => table.try_lock(request.lock_info, now),
            LockOperation::Release => table.unlock(&request.lock_info.key, now),
        }
    }
}

impl RequestProcessor for LockProcessor {
    fn group(&self) -> &str {
        LOCK_GROUP
    }

    fn on_apply(&self, request: &WriteRequest) -> LogResponse {
        let Some(operation) = LockOperation::from_tag(&request.operation) else {
            warn!(operation = %request.operation, "unknown lock operation in committed entry");
            return LogResponse::fail();
        };
        let decoded: MutexLockRequest = match self.codec.decode(&request.data) {
            Ok(decoded) => decoded,
            Err(error) => {
                warn!(%error, operation = %request.operation, "undecodable lock entry");
                return LogResponse::fail();
            }
        };

        let key = decoded.lock_info.key.clone();
        let granted = self.apply(operation, decoded);
        debug!(%key, op = operation.tag(), granted, "lock entry applied");
        match self.codec.encode(&granted) {
            Ok(data) => LogResponse::ok(data),
            Err(error) => {
                warn!(%error, "lock apply result failed to encode");
                LogResponse::fail()
            }
        }
    }

    fn on_read(&self, request: &ReadRequest) -> LogResponse {
        let key: LockKey = match self.codec.decode(&request.data) {
            Ok(key) => key,
            Err(error) => {
                warn!(%error, "undecodable lock status query");
                return LogResponse::fail();
            }
        };
        match self.codec.encode(&self.holder(&key)) {
            Ok(data) => LogResponse::ok(data),
            Err(error) => {
                warn!(%error, "lock holder failed to encode");
                LogResponse::fail()
            }
        }
    }

    fn snapshot_operations(&self) -> Vec<Arc<dyn SnapshotOperation>> {
        vec![Arc::new(LockSnapshotOperation::new(self.table()))]
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use muster_core::ManualClock;

    use super::*;

    fn processor_at(clock: Arc<ManualClock>) -> LockProcessor {
        LockProcessor::new(clock)
    }

    fn acquire_request(key: &str, expire_at_secs: u64) -> WriteRequest {
        let payload = MutexLockRequest {
            lock_info: LockInfo {
                key: LockKey::new("mutex", key),
                params: HashMap::new(),
                expire_at: Duration::from_secs(expire_at_secs),
            },
        };
        WriteRequest {
            group: LOCK_GROUP.to_string(),
            operation: LockOperation::Acquire.tag().to_string(),
            data: JsonCodec.encode(&payload).expect("encode"),
        }
    }

    fn granted(response: &LogResponse) -> bool {
        assert!(response.success);
        JsonCodec.decode(&response.data).expect("bool payload")
    }

    #[test]
    fn test_apply_acquire_then_conflict() {
        let clock = Arc::new(ManualClock::new());
        let processor = processor_at(clock);

        assert!(granted(&processor.on_apply(&acquire_request("job-7", 30))));
        assert!(!granted(&processor.on_apply(&acquire_request("job-7", 40))));
    }

    #[test]
    fn test_apply_release() {
        let clock = Arc::new(ManualClock::new());
        let processor = processor_at(Arc::clone(&clock));
        processor.on_apply(&acquire_request("job-7", 30));

        let mut release = acquire_request("job-7", 30);
        release.operation = LockOperation::Release.tag().to_string();
        assert!(granted(&processor.on_apply(&release)));
        // Second release of the same key: unheld, refused.
        assert!(!granted(&processor.on_apply(&release)));
    }

    #[test]
    fn test_unknown_operation_is_refused_not_fatal() {
        let clock = Arc::new(ManualClock::new());
        let processor = processor_at(clock);
        let mut request = acquire_request("job-7", 30);
        request.operation = "STEAL".to_string();
        assert!(!processor.on_apply(&request).success);
    }

    #[test]
    fn test_garbage_payload_is_refused() {
        let clock = Arc::new(ManualClock::new());
        let processor = processor_at(clock);
        let request = WriteRequest {
            group: LOCK_GROUP.to_string(),
            operation: LockOperation::Acquire.tag().to_string(),
            data: b"{not json".to_vec(),
        };
        assert!(!processor.on_apply(&request).success);
    }

    #[test]
    fn test_read_reports_live_holder_only() {
        let clock = Arc::new(ManualClock::new());
        let processor = processor_at(Arc::clone(&clock));
        processor.on_apply(&acquire_request("job-7", 30));

        let key = LockKey::new("mutex", "job-7");
        let query = ReadRequest {
            group: LOCK_GROUP.to_string(),
            data: JsonCodec.encode(&key).expect("encode"),
        };

        let response = processor.on_read(&query);
        let holder: Option<LockInfo> = JsonCodec.decode(&response.data).expect("decode");
        assert!(holder.is_some());

        clock.advance(Duration::from_secs(31));
        let response = processor.on_read(&query);
        let holder: Option<LockInfo> = JsonCodec.decode(&response.data).expect("decode");
        assert!(holder.is_none());
    }
}
