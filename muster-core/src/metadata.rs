//! Cluster and instance metadata.
//!
//! These carry operator-editable configuration that lives alongside, but
//! independently of, the registration lifecycle: how a cluster's instances
//! are health-checked, and per-instance traffic controls.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Kind of health check applied to a cluster's instances.
///
/// A closed set: the health-check subsystem dispatches over these variants
/// rather than over open-ended plug-ins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HealthCheckType {
    /// TCP connect probe.
    #[default]
    Tcp,
    /// HTTP GET probe.
    Http,
    /// No active probing; liveness comes from client heartbeats only.
    None,
}

impl HealthCheckType {
    /// Whether this check kind actively probes instances.
    pub fn is_active(&self) -> bool {
        !matches!(self, HealthCheckType::None)
    }
}

/// Per-cluster health-check configuration plus free-form extensions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterMetadata {
    /// Port probed by the health checker when not using the instance's own.
    pub health_check_port: u16,
    /// Which probe to run.
    pub check_type: HealthCheckType,
    /// Probe the instance's registered port instead of `health_check_port`.
    pub use_instance_port_for_check: bool,
    /// Free-form extension data.
    pub extend_data: HashMap<String, String>,
}

impl Default for ClusterMetadata {
    fn default() -> Self {
        Self {
            health_check_port: 80,
            check_type: HealthCheckType::Tcp,
            use_instance_port_for_check: true,
            extend_data: HashMap::new(),
        }
    }
}

/// Per-instance traffic controls, mutated by operators independently of the
/// instance's registration lifecycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetadata {
    /// Relative traffic share. Non-negative; 1.0 by default.
    pub weight: f64,
    /// Traffic override: when `false` the instance receives no traffic
    /// regardless of weight or health state.
    pub enabled: bool,
    /// Free-form extension data.
    pub extend_data: HashMap<String, String>,
}

impl Default for InstanceMetadata {
    fn default() -> Self {
        Self {
            weight: 1.0,
            enabled: true,
            extend_data: HashMap::new(),
        }
    }
}

impl InstanceMetadata {
    /// Whether the instance may receive traffic. The enabled flag wins over
    /// everything else; a zero weight also removes it from rotation.
    pub fn accepts_traffic(&self) -> bool {
        self.enabled && self.weight > 0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cluster_metadata_defaults() {
        let meta = ClusterMetadata::default();
        assert_eq!(meta.health_check_port, 80);
        assert_eq!(meta.check_type, HealthCheckType::Tcp);
        assert!(meta.use_instance_port_for_check);
    }

    #[test]
    fn test_none_check_is_passive() {
        assert!(HealthCheckType::Tcp.is_active());
        assert!(HealthCheckType::Http.is_active());
        assert!(!HealthCheckType::None.is_active());
    }

    #[test]
    fn test_disabled_instance_rejects_traffic_despite_weight() {
        let meta = InstanceMetadata {
            weight: 10.0,
            enabled: false,
            ..Default::default()
        };
        assert!(!meta.accepts_traffic());
    }

    #[test]
    fn test_default_instance_accepts_traffic() {
        let meta = InstanceMetadata::default();
        assert_eq!(meta.weight, 1.0);
        assert!(meta.accepts_traffic());
    }

    #[test]
    fn test_zero_weight_removes_from_rotation() {
        let meta = InstanceMetadata {
            weight: 0.0,
            ..Default::default()
        };
        assert!(!meta.accepts_traffic());
    }
}
