// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::binary::FakeBinaryProvisioner;
use crate::fakes::{FakeEventBus, FakeSupervisor};
use crate::host_memory::FakeHostMemory;
use crate::manifests::StaticManifestRegistry;
use bastion_core::{CapabilityFacts, DependencySpec, FakeClock, HealthProbeDescriptor, RouterId};
use bastion_store::MemoryStore;
use std::net::IpAddr;

fn manifest(feature_id: &str, dependencies: Vec<DependencySpec>) -> bastion_core::FeatureManifest {
    bastion_core::FeatureManifest {
        feature_id: feature_id.to_string(),
        required_ports: 1,
        memory_required_mb: 64,
        requires_vlan: false,
        requires_vif_bridge: false,
        socks_port_offset: None,
        health_probe: HealthProbeDescriptor { kind: "tcp".into(), interval_seconds: 30 },
        dependencies,
    }
}

fn capabilities() -> CapabilityFacts {
    CapabilityFacts {
        os_version: "test".into(),
        arch: "x86_64".into(),
        available_memory_mb: 4096,
        available_disk_mb: 10_000,
    }
}

#[allow(clippy::type_complexity)]
fn harness(
    manifests: impl IntoIterator<Item = bastion_core::FeatureManifest>,
) -> (
    InstanceManager<FakeClock>,
    Arc<MemoryStore>,
    Arc<FakeSupervisor>,
    Arc<FakeBinaryProvisioner>,
) {
    let store = Arc::new(MemoryStore::new());
    let supervisor = Arc::new(FakeSupervisor::default());
    let host_memory = Arc::new(FakeHostMemory { total_mb: 8192, available_mb: 4096 });
    let bus = Arc::new(FakeEventBus::default());
    let registry = Arc::new(StaticManifestRegistry::new(manifests));
    let binaries = Arc::new(FakeBinaryProvisioner::default());
    let manager = InstanceManager::new(
        store.clone(),
        supervisor.clone(),
        host_memory,
        bus,
        registry,
        binaries.clone(),
        FakeClock::new(),
    );
    (manager, store, supervisor, binaries)
}

async fn wait_for_status(store: &MemoryStore, instance_id: InstanceId, target: InstanceState) -> ServiceInstance {
    for _ in 0..100 {
        if let Some(instance) = store.get_instance(instance_id).await.unwrap() {
            if instance.status == target {
                return instance;
            }
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("instance never reached {target}");
}

#[tokio::test]
async fn create_allocates_ports_and_installs_asynchronously() {
    let (manager, store, _supervisor, _binaries) = harness([manifest("relay", Vec::new())]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(instance.status, InstanceState::Installing);
    assert_eq!(instance.ports.len(), 1);

    let installed = wait_for_status(&store, instance.id, InstanceState::Installed).await;
    assert!(installed.binary_path.is_some());
}

#[tokio::test]
async fn create_rejects_incompatible_capabilities() {
    let (manager, _store, _supervisor, _binaries) = harness([manifest("heavy", Vec::new())]);
    let mut incompatible = capabilities();
    incompatible.available_memory_mb = 1;
    let result = manager
        .create(
            CreateInput {
                feature_id: "heavy".into(),
                router_id: RouterId::new(),
                name: "heavy-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: incompatible,
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await;
    assert!(matches!(result, Err(CoreError::InvalidInput(_))));
}

#[tokio::test]
async fn start_brings_instance_to_running_and_registers_with_supervisor() {
    let (manager, store, supervisor, _binaries) = harness([manifest("relay", Vec::new())]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    wait_for_status(&store, instance.id, InstanceState::Installed).await;

    manager.start(instance.id, 5, CancellationToken::new()).await.unwrap();

    let running = store.get_instance(instance.id).await.unwrap().unwrap();
    assert_eq!(running.status, InstanceState::Running);
    assert!(supervisor.is_running(instance.id).await.unwrap());
}

#[tokio::test]
async fn start_resolves_auto_start_dependency_first() {
    let (manager, store, _supervisor, _binaries) = harness([
        manifest("dns-filter", Vec::new()),
        manifest("relay", vec![DependencySpec { feature_id: "dns-filter".into(), auto_start: true }]),
    ]);
    let router_id = RouterId::new();

    let dependency = manager
        .create(
            CreateInput {
                feature_id: "dns-filter".into(),
                router_id,
                name: "dns-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 6]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let leaf = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 7]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    wait_for_status(&store, dependency.id, InstanceState::Installed).await;
    wait_for_status(&store, leaf.id, InstanceState::Installed).await;

    manager.start(leaf.id, 5, CancellationToken::new()).await.unwrap();

    let dep_after = store.get_instance(dependency.id).await.unwrap().unwrap();
    let leaf_after = store.get_instance(leaf.id).await.unwrap().unwrap();
    assert_eq!(dep_after.status, InstanceState::Running);
    assert_eq!(leaf_after.status, InstanceState::Running);
}

#[tokio::test]
async fn stop_rejects_when_a_running_dependent_exists() {
    let (manager, store, _supervisor, _binaries) = harness([
        manifest("dns-filter", Vec::new()),
        manifest("relay", vec![DependencySpec { feature_id: "dns-filter".into(), auto_start: true }]),
    ]);
    let router_id = RouterId::new();
    let dependency = manager
        .create(
            CreateInput {
                feature_id: "dns-filter".into(),
                router_id,
                name: "dns-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 6]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let leaf = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 7]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    wait_for_status(&store, dependency.id, InstanceState::Installed).await;
    wait_for_status(&store, leaf.id, InstanceState::Installed).await;
    manager.start(leaf.id, 5, CancellationToken::new()).await.unwrap();

    let result = manager.stop(dependency.id, CancellationToken::new()).await;
    assert!(matches!(result, Err(CoreError::InvalidState(_))));
}

#[tokio::test]
async fn reconcile_reclaims_orphans_and_fails_transient_instances() {
    let (manager, store, _supervisor, _binaries) = harness([manifest("relay", Vec::new())]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();

    manager.reconcile(router_id, CancellationToken::new()).await.unwrap();

    let after = store.get_instance(instance.id).await.unwrap().unwrap();
    assert_eq!(after.status, InstanceState::Failed);
}

#[tokio::test]
async fn reconcile_rewrites_running_to_stopped_when_supervisor_disagrees() {
    let (manager, store, supervisor, _binaries) = harness([manifest("relay", Vec::new())]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "relay".into(),
                router_id,
                name: "relay-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    wait_for_status(&store, instance.id, InstanceState::Installed).await;
    manager.start(instance.id, 5, CancellationToken::new()).await.unwrap();

    // Simulate the process dying out from under the supervisor without the
    // store being told: the next reconcile pass should catch the mismatch.
    supervisor.stop(instance.id, Duration::from_secs(0)).await.unwrap();

    manager.reconcile(router_id, CancellationToken::new()).await.unwrap();

    let after = store.get_instance(instance.id).await.unwrap().unwrap();
    assert_eq!(after.status, InstanceState::Stopped);
}

#[tokio::test]
async fn start_fails_closed_when_vif_bridge_configuration_fails() {
    let (manager, store, supervisor, _binaries) = harness([{
        let mut m = manifest("vif-relay", Vec::new());
        m.requires_vif_bridge = true;
        m
    }]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "vif-relay".into(),
                router_id,
                name: "vif-1".into(),
                bind_ip: IpAddr::from([10, 0, 0, 5]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    wait_for_status(&store, instance.id, InstanceState::Installed).await;
    supervisor.fail_vif_bridge_for(instance.id);

    let result = manager.start(instance.id, 5, CancellationToken::new()).await;
    assert!(result.is_err());

    let after = store.get_instance(instance.id).await.unwrap().unwrap();
    assert_eq!(after.status, InstanceState::Failed);
    assert!(!supervisor.is_running(instance.id).await.unwrap());
}

#[tokio::test]
async fn start_polls_socks_endpoint_then_starts_gateway() {
    let (manager, store, supervisor, _binaries) = harness([{
        let mut m = manifest("socks-relay", Vec::new());
        m.socks_port_offset = Some(0);
        m
    }]);
    let router_id = RouterId::new();
    let instance = manager
        .create(
            CreateInput {
                feature_id: "socks-relay".into(),
                router_id,
                name: "socks-1".into(),
                bind_ip: IpAddr::from([127, 0, 0, 1]),
                capabilities: capabilities(),
                config: HashMap::new(),
                health_timeout_seconds: 30,
            },
            CancellationToken::new(),
        )
        .await
        .unwrap();
    let installed = wait_for_status(&store, instance.id, InstanceState::Installed).await;
    let socks_port = installed.ports.first().copied().expect("port allocated at create");
    let _listener = std::net::TcpListener::bind((installed.bind_ip, socks_port)).unwrap();

    manager.start(instance.id, 5, CancellationToken::new()).await.unwrap();

    for _ in 0..100 {
        if supervisor.gateway_started(instance.id) {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("gateway never started after socks endpoint became ready");
}
