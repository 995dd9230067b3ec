//! Replication task scheduling.
//!
//! Every unit of replication work — a push of one key to one peer, a
//! verify round against one peer, a bulk pull from one peer — is a
//! [`DistroTask`] on the queue of its data type. One worker per data type
//! drains its queue, so a misbehaving type (slow storage, flaky
//! transport) backs up its own queue and nothing else.
//!
//! Failure policy, per task kind:
//!
//! - **Push** and **Pull** are re-enqueued with an increasing delay up to
//!   [`DistroConfig::max_retries`]; after the final failure the task goes
//!   to the type's [`FailedTaskHandler`] and the escalation is logged.
//! - **Verify** is never retried — the next periodic round supersedes it.
//!
//! [`FailedTaskHandler`]: crate::registry::FailedTaskHandler

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use muster_cluster::MemberDirectory;
use muster_core::NodeId;
use parking_lot::{Mutex, RwLock};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::DistroError;
use crate::registry::ComponentRegistry;
use crate::storage::apply_if_newer;
use crate::types::DistroKey;

/// Tuning knobs for the replication engine.
#[derive(Debug, Clone)]
pub struct DistroConfig {
    /// Base delay before retrying a failed push/pull; the n-th retry
    /// waits `n * sync_retry_delay`.
    pub sync_retry_delay: Duration,
    /// Retries before a task is escalated to the failed-task handler.
    pub max_retries: u32,
    /// Period of the verify (anti-entropy) protocol.
    pub verify_interval: Duration,
}

impl Default for DistroConfig {
    fn default() -> Self {
        Self {
            sync_retry_delay: Duration::from_secs(1),
            max_retries: 3,
            verify_interval: Duration::from_secs(5),
        }
    }
}

impl DistroConfig {
    /// Short intervals for tests.
    pub fn for_test() -> Self {
        Self {
            sync_retry_delay: Duration::from_millis(5),
            max_retries: 2,
            verify_interval: Duration::from_millis(50),
        }
    }
}

/// Kind of replication work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// Send the full datum for one key to the target peer.
    Push,
    /// Send checksum summaries of owned keys to the target peer.
    Verify,
    /// Bulk-pull a data type from the target peer.
    Pull,
}

/// One unit of replication work.
#[derive(Debug, Clone)]
pub struct DistroTask {
    /// What to do.
    pub kind: TaskKind,
    /// Data type the task belongs to.
    pub resource_type: String,
    /// Key being pushed; `None` for verify and pull.
    pub key: Option<DistroKey>,
    /// Peer on the other end.
    pub target: NodeId,
    /// Retries consumed so far.
    pub retries: u32,
}

impl DistroTask {
    /// A push task for `key` to `target`.
    pub fn push(key: DistroKey, target: NodeId) -> Self {
        Self {
            kind: TaskKind::Push,
            resource_type: key.resource_type.clone(),
            key: Some(key),
            target,
            retries: 0,
        }
    }

    /// A verify task toward `target` for `resource_type`.
    pub fn verify(resource_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: TaskKind::Verify,
            resource_type: resource_type.into(),
            key: None,
            target,
            retries: 0,
        }
    }

    /// A pull task for `resource_type` from `target`.
    pub fn pull(resource_type: impl Into<String>, target: NodeId) -> Self {
        Self {
            kind: TaskKind::Pull,
            resource_type: resource_type.into(),
            key: None,
            target,
            retries: 0,
        }
    }
}

/// Owns the per-data-type queues and their workers.
pub struct TaskScheduler {
    local: NodeId,
    directory: Arc<MemberDirectory>,
    registry: Arc<ComponentRegistry>,
    config: DistroConfig,
    queues: RwLock<HashMap<String, mpsc::UnboundedSender<DistroTask>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl TaskScheduler {
    /// Create a scheduler. Workers start per data type via
    /// [`TaskScheduler::start_worker`].
    pub fn new(
        local: NodeId,
        directory: Arc<MemberDirectory>,
        registry: Arc<ComponentRegistry>,
        config: DistroConfig,
    ) -> Self {
        Self {
            local,
            directory,
            registry,
            config,
            queues: RwLock::new(HashMap::new()),
            workers: Mutex::new(Vec::new()),
        }
    }

    /// Spawn the worker for a data type. Idempotent: a second call for
    /// the same type keeps the existing queue.
    pub fn start_worker(&self, resource_type: &str) {
        let mut queues = self.queues.write();
        if queues.contains_key(resource_type) {
            return;
        }
        let (tx, mut rx) = mpsc::unbounded_channel::<DistroTask>();
        queues.insert(resource_type.to_string(), tx.clone());

        let ctx = WorkerContext {
            local: self.local.clone(),
            directory: Arc::clone(&self.directory),
            registry: Arc::clone(&self.registry),
            config: self.config.clone(),
            requeue: tx,
        };
        let handle = tokio::spawn(async move {
            while let Some(task) = rx.recv().await {
                ctx.execute(task).await;
            }
        });
        self.workers.lock().push(handle);
    }

    /// Enqueue a task on its data type's queue.
    ///
    /// Non-blocking: the queue is unbounded, so a writer that triggers a
    /// push is never held up by replication backlog.
    pub fn submit(&self, task: DistroTask) -> Result<(), DistroError> {
        let queues = self.queues.read();
        let tx = queues
            .get(&task.resource_type)
            .ok_or_else(|| DistroError::NoSuchType(task.resource_type.clone()))?;
        tx.send(task.clone())
            .map_err(|_| DistroError::QueueClosed(task.resource_type))
    }

    /// Abort all workers and drop the queues.
    pub fn shutdown(&self) {
        self.queues.write().clear();
        for handle in self.workers.lock().drain(..) {
            handle.abort();
        }
    }
}

/// Everything a worker needs to execute tasks for one data type.
struct WorkerContext {
    local: NodeId,
    directory: Arc<MemberDirectory>,
    registry: Arc<ComponentRegistry>,
    config: DistroConfig,
    requeue: mpsc::UnboundedSender<DistroTask>,
}

impl WorkerContext {
    async fn execute(&self, task: DistroTask) {
        let result = match task.kind {
            TaskKind::Push => self.execute_push(&task).await,
            TaskKind::Verify => self.execute_verify(&task).await,
            TaskKind::Pull => self.execute_pull(&task).await,
        };

        if let Err(error) = result {
            match task.kind {
                // Next verify round supersedes a failed one.
                TaskKind::Verify => {
                    debug!(%error, target = %task.target, "verify round failed, awaiting next period");
                }
                TaskKind::Push | TaskKind::Pull => self.retry_or_escalate(task, &error),
            }
        }
    }

    async fn execute_push(&self, task: &DistroTask) -> Result<(), DistroError> {
        let key = match &task.key {
            Some(key) => key,
            None => return Ok(()),
        };
        let storage = self.registry.storage_of(&task.resource_type)?;
        // Read at execution time so a retried push carries the latest
        // version, not the one from enqueue time.
        let Some(data) = storage.get(key) else {
            debug!(%key, "push skipped, key removed before delivery");
            return Ok(());
        };
        let transport = self.registry.transport_of(&task.resource_type)?;
        transport.send_async(&task.target, &data).await
    }

    async fn execute_verify(&self, task: &DistroTask) -> Result<(), DistroError> {
        let storage = self.registry.storage_of(&task.resource_type)?;
        let summaries: Vec<_> = storage
            .list_keys()
            .into_iter()
            .filter(|key| self.directory.is_owner(&key.to_string(), &self.local))
            .filter_map(|key| storage.get(&key))
            .map(|data| data.summary())
            .collect();
        if summaries.is_empty() {
            return Ok(());
        }
        let transport = self.registry.transport_of(&task.resource_type)?;
        transport.send_verify(&task.target, &summaries).await
    }

    async fn execute_pull(&self, task: &DistroTask) -> Result<(), DistroError> {
        let transport = self.registry.transport_of(&task.resource_type)?;
        let storage = self.registry.storage_of(&task.resource_type)?;
        let entries = transport
            .request_pull(&task.target, &task.resource_type)
            .await?;
        let mut applied = 0usize;
        for data in entries {
            if apply_if_newer(storage.as_ref(), data) {
                applied += 1;
            }
        }
        debug!(
            resource_type = %task.resource_type,
            from = %task.target,
            applied,
            "pull applied"
        );
        Ok(())
    }

    fn retry_or_escalate(&self, mut task: DistroTask, error: &DistroError) {
        if task.retries < self.config.max_retries {
            task.retries += 1;
            let delay = self.config.sync_retry_delay * task.retries;
            warn!(
                %error,
                kind = ?task.kind,
                target = %task.target,
                retry = task.retries,
                delay_ms = delay.as_millis() as u64,
                "replication task failed, retrying"
            );
            let requeue = self.requeue.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                // The queue may have shut down in the meantime.
                let _ = requeue.send(task);
            });
        } else {
            warn!(
                %error,
                kind = ?task.kind,
                target = %task.target,
                "replication task exhausted retries, escalating"
            );
            match self.registry.failed_handler_of(&task.resource_type) {
                Ok(handler) => handler.on_task_fail(&task),
                Err(missing) => warn!(%missing, "no failed-task handler registered"),
            }
        }
    }
}
