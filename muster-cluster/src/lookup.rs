//! Member lookup strategies.
//!
//! A lookup strategy decides *where the member list comes from*: a static
//! seed list baked into configuration, or an external address server
//! polled on an interval. Whatever the source, every fresh list flows to
//! the [`MemberDirectory`] through `after_lookup`, which handles dedup,
//! change detection, and fanout.
//!
//! Failure policy: an error while starting a strategy is a startup fault
//! and propagates. An error during a runtime poll is transient — the
//! directory keeps the last-known member list in effect (degrading to an
//! empty cluster on a flaky address server would be strictly worse) and
//! the failure is logged.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use muster_core::Member;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::directory::MemberDirectory;
use crate::error::ClusterError;

/// A member addressing strategy.
#[async_trait]
pub trait MemberLookup: Send + Sync {
    /// Activate the strategy. Publishes an initial member list to the
    /// directory before returning.
    ///
    /// # Errors
    ///
    /// Any failure here is a startup fault.
    async fn start(&self) -> Result<(), ClusterError>;

    /// Release polling resources. Safe to call more than once.
    async fn destroy(&self);

    /// Whether this strategy depends on an external address server.
    fn use_address_server(&self) -> bool;

    /// Diagnostic information about the strategy. Never empty: at minimum
    /// the strategy kind is reported.
    fn info(&self) -> HashMap<String, String>;
}

/// Lookup backed by a fixed seed list.
///
/// `start` publishes the configured members once; the list only changes
/// if `start` is called again with a rebuilt instance.
pub struct StaticListLookup {
    directory: Arc<MemberDirectory>,
    seeds: Vec<Member>,
}

impl StaticListLookup {
    /// Create a static lookup over the given seed members.
    pub fn new(directory: Arc<MemberDirectory>, seeds: Vec<Member>) -> Self {
        Self { directory, seeds }
    }
}

#[async_trait]
impl MemberLookup for StaticListLookup {
    async fn start(&self) -> Result<(), ClusterError> {
        if self.seeds.is_empty() {
            return Err(ClusterError::EmptyMemberList);
        }
        self.directory.after_lookup(self.seeds.clone());
        info!(members = self.seeds.len(), "static member list published");
        Ok(())
    }

    async fn destroy(&self) {}

    fn use_address_server(&self) -> bool {
        false
    }

    fn info(&self) -> HashMap<String, String> {
        HashMap::from([
            ("kind".to_string(), "static-list".to_string()),
            ("seeds".to_string(), self.seeds.len().to_string()),
        ])
    }
}

/// Source of member lists for [`AddressServerLookup`].
///
/// Implemented over whatever transport reaches the address server; the
/// lookup only cares about the fetched list.
#[async_trait]
pub trait AddressSource: Send + Sync {
    /// Fetch the current member list.
    async fn fetch_members(&self) -> Result<Vec<Member>, ClusterError>;
}

/// Lookup that polls an external address server.
pub struct AddressServerLookup {
    directory: Arc<MemberDirectory>,
    source: Arc<dyn AddressSource>,
    poll_interval: Duration,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl AddressServerLookup {
    /// Create a polling lookup with the given source and interval.
    pub fn new(
        directory: Arc<MemberDirectory>,
        source: Arc<dyn AddressSource>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            directory,
            source,
            poll_interval,
            poller: Mutex::new(None),
        }
    }
}

#[async_trait]
impl MemberLookup for AddressServerLookup {
    async fn start(&self) -> Result<(), ClusterError> {
        // The initial fetch must succeed: starting a cluster node with no
        // idea who its peers are is a configuration problem, not a
        // transient one.
        let members = self.source.fetch_members().await?;
        self.directory.after_lookup(members);

        let directory = Arc::clone(&self.directory);
        let source = Arc::clone(&self.source);
        let interval = self.poll_interval;
        let handle = tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                match source.fetch_members().await {
                    Ok(members) => {
                        directory.after_lookup(members);
                    }
                    Err(error) => {
                        // Last-known list stays in effect.
                        warn!(%error, "address server poll failed, keeping last member list");
                    }
                }
            }
        });
        *self.poller.lock() = Some(handle);
        info!(interval_ms = interval.as_millis() as u64, "address server polling started");
        Ok(())
    }

    async fn destroy(&self) {
        if let Some(handle) = self.poller.lock().take() {
            handle.abort();
        }
    }

    fn use_address_server(&self) -> bool {
        true
    }

    fn info(&self) -> HashMap<String, String> {
        HashMap::from([
            ("kind".to_string(), "address-server".to_string()),
            (
                "poll_interval_ms".to_string(),
                self.poll_interval.as_millis().to_string(),
            ),
            (
                "members".to_string(),
                self.directory.current().len().to_string(),
            ),
        ])
    }
}
