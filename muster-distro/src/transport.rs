//! Transport agent boundary.
//!
//! Physical transport (sockets, framing, RPC envelopes) is outside this
//! crate; a [`TransportAgent`] is registered per data type and the engine
//! only ever talks to peers through it.

use async_trait::async_trait;
use muster_core::NodeId;

use crate::error::DistroError;
use crate::types::{DistroChecksum, DistroData};

/// Sends replication traffic to peers for one data type.
#[async_trait]
pub trait TransportAgent: Send + Sync {
    /// Send a full datum and wait for the peer to acknowledge applying it.
    async fn send_sync(&self, peer: &NodeId, data: &DistroData) -> Result<(), DistroError>;

    /// Send a full datum without waiting for application.
    ///
    /// Errors still surface (the scheduler retries them); "async" refers
    /// to the peer-side apply, not to delivery.
    async fn send_async(&self, peer: &NodeId, data: &DistroData) -> Result<(), DistroError>;

    /// Send checksum-only summaries for the verify protocol.
    async fn send_verify(
        &self,
        peer: &NodeId,
        summaries: &[DistroChecksum],
    ) -> Result<(), DistroError>;

    /// Request the peer's full data set for a data type.
    async fn request_pull(
        &self,
        peer: &NodeId,
        resource_type: &str,
    ) -> Result<Vec<DistroData>, DistroError>;

    /// Whether the transport can report peer-side apply results through a
    /// callback channel (affects how send_async failures are observed).
    fn support_callback_transport(&self) -> bool;
}
