// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Feature manifest: the external, read-only declaration of what a service
//! type needs (ports, memory, VLAN isolation, dependencies).

use serde::{Deserialize, Serialize};

/// A dependency this feature wants auto-started alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencySpec {
    pub feature_id: String,
    pub auto_start: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthProbeDescriptor {
    pub kind: String,
    pub interval_seconds: u64,
}

/// Declares required ports, memory, platform-compat predicate, the
/// health-probe descriptor, and whether VLAN isolation is required.
///
/// `dependencies` is the mechanism by which the instance manager's Start
/// resolves auto-start dependencies: siblings on the same router whose
/// `feature_id` matches a `DependencySpec` here are the instances to
/// resolve, since `ServiceInstance` itself carries no dependency list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureManifest {
    pub feature_id: String,
    pub required_ports: u32,
    pub memory_required_mb: u64,
    pub requires_vlan: bool,
    pub requires_vif_bridge: bool,
    pub socks_port_offset: Option<u16>,
    pub health_probe: HealthProbeDescriptor,
    pub dependencies: Vec<DependencySpec>,
}

impl FeatureManifest {
    /// Evaluate the platform-compatibility predicate against reported
    /// capability facts. Real compatibility rules (OS/arch allowlists) are an
    /// external concern; this only checks the facts this manifest declares
    /// as mandatory.
    pub fn is_compatible(&self, capabilities: &CapabilityFacts) -> bool {
        capabilities.available_memory_mb >= self.memory_required_mb
    }
}

/// Capability facts supplied at Create time (OS version, arch, available
/// memory/disk).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapabilityFacts {
    pub os_version: String,
    pub arch: String,
    pub available_memory_mb: u64,
    pub available_disk_mb: u64,
}

#[cfg(test)]
#[path = "manifest_tests.rs"]
mod tests;
