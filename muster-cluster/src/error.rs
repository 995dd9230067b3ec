//! Cluster error type.

use thiserror::Error;

/// Errors from membership lookup and partitioning.
#[derive(Debug, Error)]
pub enum ClusterError {
    /// A lookup strategy failed to fetch the member list.
    ///
    /// Fatal during `start()`; at runtime the last-known list stays in
    /// effect instead.
    #[error("member lookup failed: {0}")]
    Lookup(String),

    /// An operation needed members but the directory holds none.
    #[error("member list is empty")]
    EmptyMemberList,

    /// A configured member address could not be parsed.
    #[error(transparent)]
    AddressParse(#[from] muster_core::AddressParseError),
}
