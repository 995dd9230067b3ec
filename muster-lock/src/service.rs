//! Client entry points.
//!
//! [`LockService`] turns `lock`/`unlock` calls into replicated-log
//! proposals for the lock group and blocks until the log reports
//! commit+apply. The boolean outcome (granted or refused) travels in
//! the response payload; a submission or codec failure is a
//! [`LockError`], never a silent `false`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use muster_core::{JsonCodec, MessageCodec, TimeProvider};
use tracing::debug;

use crate::error::LockError;
use crate::processor::LOCK_GROUP;
use crate::protocol::{LogProtocol, WriteRequest};
use crate::types::{LockInfo, LockKey, LockOperation, MutexLockRequest};

/// Expiry policy knobs.
#[derive(Debug, Clone)]
pub struct LockConfig {
    /// Expiry granted when the caller requests a negative duration.
    pub default_expire_ms: i64,
    /// Ceiling on any requested expiry.
    pub max_expire_ms: i64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            default_expire_ms: 30_000,
            max_expire_ms: 1_800_000,
        }
    }
}

/// Distributed mutex client over an injected [`LogProtocol`].
pub struct LockService {
    protocol: Arc<dyn LogProtocol>,
    time: Arc<dyn TimeProvider>,
    codec: JsonCodec,
    config: LockConfig,
}

impl LockService {
    /// A service proposing through `protocol`, stamping expiries with
    /// `time`.
    pub fn new(
        protocol: Arc<dyn LogProtocol>,
        time: Arc<dyn TimeProvider>,
        config: LockConfig,
    ) -> Self {
        Self {
            protocol,
            time,
            codec: JsonCodec,
            config,
        }
    }

    /// Acquire `key` for `expire_ms` milliseconds.
    ///
    /// The granted duration is clamped: a negative request gets the
    /// configured default, anything else is capped at the configured
    /// maximum. The absolute expiry is stamped with this member's clock
    /// before the proposal enters the log, so a caller's clock can never
    /// extend its own grant.
    ///
    /// Returns whether the lock was granted.
    pub async fn lock(
        &self,
        key: LockKey,
        params: HashMap<String, String>,
        expire_ms: i64,
    ) -> Result<bool, LockError> {
        let expire_at = self.time.now() + self.clamped_expire(expire_ms);
        let info = LockInfo {
            key,
            params,
            expire_at,
        };
        self.submit(LockOperation::Acquire, info).await
    }

    /// Release `key`. Returns whether a live grant was removed; releasing
    /// an unheld lock is `Ok(false)`, not an error.
    pub async fn unlock(&self, key: LockKey) -> Result<bool, LockError> {
        let info = LockInfo {
            key,
            params: HashMap::new(),
            expire_at: Duration::ZERO,
        };
        self.submit(LockOperation::Release, info).await
    }

    fn clamped_expire(&self, requested_ms: i64) -> Duration {
        let granted_ms = if requested_ms < 0 {
            self.config.default_expire_ms
        } else {
            self.config.max_expire_ms.min(requested_ms)
        };
        Duration::from_millis(granted_ms as u64)
    }

    async fn submit(&self, operation: LockOperation, info: LockInfo) -> Result<bool, LockError> {
        let key = info.key.clone();
        let data = self.codec.encode(&MutexLockRequest { lock_info: info })?;
        let response = self
            .protocol
            .write(WriteRequest {
                group: LOCK_GROUP.to_string(),
                operation: operation.tag().to_string(),
                data,
            })
            .await?;
        if !response.success {
            return Err(LockError::Protocol(format!(
                "{} for {} was not applied",
                operation.tag(),
                key
            )));
        }
        let granted: bool = self.codec.decode(&response.data)?;
        debug!(%key, op = operation.tag(), granted, "lock operation committed");
        Ok(granted)
    }
}
