//! Pluggable message serialization.
//!
//! Replicated lock requests and snapshot payloads pass through a
//! [`MessageCodec`] rather than calling a serializer directly, so the wire
//! format can be swapped without touching protocol code. [`JsonCodec`] is
//! the default.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Error from encoding or decoding a message.
#[derive(Debug, Error)]
pub enum CodecError {
    /// Failed to encode a message to bytes.
    #[error("encode error: {0}")]
    Encode(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Failed to decode bytes into a message.
    #[error("decode error: {0}")]
    Decode(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Pluggable serialization format for messages and snapshots.
///
/// Message types must implement serde's `Serialize`/`DeserializeOwned`.
pub trait MessageCodec: Clone + Send + Sync + 'static {
    /// Encode a message to bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Encode`] if serialization fails.
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError>;

    /// Decode bytes into a message.
    ///
    /// # Errors
    ///
    /// Returns [`CodecError::Decode`] if deserialization fails.
    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError>;
}

/// JSON codec backed by serde_json.
///
/// Human-readable, which makes replicated requests and snapshot blobs easy
/// to inspect while debugging.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl MessageCodec for JsonCodec {
    fn encode<T: Serialize>(&self, msg: &T) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(msg).map_err(|e| CodecError::Encode(Box::new(e)))
    }

    fn decode<T: DeserializeOwned>(&self, buf: &[u8]) -> Result<T, CodecError> {
        serde_json::from_slice(buf).map_err(|e| CodecError::Decode(Box::new(e)))
    }
}
