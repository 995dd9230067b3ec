//! Cluster member addressing.
//!
//! A [`NetworkAddress`] is an IP + port pair. A [`NodeId`] is the stable
//! string identity derived from it (`ip:port`), used wherever members must
//! hash or compare identically on every node — consistent-hash placement
//! and replication tie-breaks in particular.

use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when parsing a [`NetworkAddress`] from a string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressParseError {
    /// The string is not of the form `ip:port`.
    #[error("expected ip:port, got {0:?}")]
    MissingPort(String),

    /// The IP component failed to parse.
    #[error("invalid ip address: {0}")]
    InvalidIp(String),

    /// The port component failed to parse.
    #[error("invalid port: {0}")]
    InvalidPort(String),
}

/// Network address of a cluster member: IP + port.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NetworkAddress {
    /// IP address of the member.
    pub ip: IpAddr,
    /// Port the member's cluster endpoint listens on.
    pub port: u16,
}

impl NetworkAddress {
    /// Create a new network address.
    pub fn new(ip: IpAddr, port: u16) -> Self {
        Self { ip, port }
    }

    /// The stable node identity for this address.
    pub fn node_id(&self) -> NodeId {
        NodeId(self.to_string())
    }
}

impl std::fmt::Display for NetworkAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.ip, self.port)
    }
}

impl FromStr for NetworkAddress {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (ip, port) = s
            .rsplit_once(':')
            .ok_or_else(|| AddressParseError::MissingPort(s.to_string()))?;
        let ip = ip
            .parse::<IpAddr>()
            .map_err(|_| AddressParseError::InvalidIp(ip.to_string()))?;
        let port = port
            .parse::<u16>()
            .map_err(|_| AddressParseError::InvalidPort(port.to_string()))?;
        Ok(Self { ip, port })
    }
}

/// Stable identity of a cluster member.
///
/// Two nodes computing placement for the same key must agree on every
/// member's identity, so the id is the canonical `ip:port` rendering of the
/// member's address — never a random token regenerated at startup.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&NetworkAddress> for NodeId {
    fn from(addr: &NetworkAddress) -> Self {
        addr.node_id()
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use super::*;

    #[test]
    fn test_address_display_and_node_id() {
        let addr = NetworkAddress::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 8848);
        assert_eq!(addr.to_string(), "10.0.0.1:8848");
        assert_eq!(addr.node_id().as_str(), "10.0.0.1:8848");
    }

    #[test]
    fn test_address_parse_roundtrip() {
        let addr: NetworkAddress = "127.0.0.1:7001".parse().expect("parse");
        assert_eq!(addr.ip, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(addr.port, 7001);
        assert_eq!(addr.to_string().parse::<NetworkAddress>(), Ok(addr));
    }

    #[test]
    fn test_address_parse_errors() {
        assert!(matches!(
            "nonsense".parse::<NetworkAddress>(),
            Err(AddressParseError::MissingPort(_))
        ));
        assert!(matches!(
            "not-an-ip:80".parse::<NetworkAddress>(),
            Err(AddressParseError::InvalidIp(_))
        ));
        assert!(matches!(
            "127.0.0.1:notaport".parse::<NetworkAddress>(),
            Err(AddressParseError::InvalidPort(_))
        ));
    }

    #[test]
    fn test_node_id_ordering_is_stable() {
        let a = NodeId("10.0.0.1:8848".to_string());
        let b = NodeId("10.0.0.2:8848".to_string());
        assert!(a < b);
    }
}
