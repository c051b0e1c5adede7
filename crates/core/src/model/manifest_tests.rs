// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn manifest(memory_required_mb: u64) -> FeatureManifest {
    FeatureManifest {
        feature_id: "relay".into(),
        required_ports: 1,
        memory_required_mb,
        requires_vlan: false,
        requires_vif_bridge: false,
        socks_port_offset: None,
        health_probe: HealthProbeDescriptor { kind: "tcp".into(), interval_seconds: 5 },
        dependencies: Vec::new(),
    }
}

#[test]
fn compatible_when_enough_memory() {
    let facts = CapabilityFacts {
        os_version: "1".into(),
        arch: "x86_64".into(),
        available_memory_mb: 512,
        available_disk_mb: 1024,
    };
    assert!(manifest(256).is_compatible(&facts));
    assert!(!manifest(1024).is_compatible(&facts));
}
