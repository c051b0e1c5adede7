// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fakes::FakeEventBus;
use bastion_core::{RouterId, ServiceInstanceBuilder};
use bastion_store::MemoryStore;
use std::collections::HashMap as StdHashMap;

#[derive(Default)]
struct ScriptedProbe {
    healthy: Mutex<StdHashMap<InstanceId, bool>>,
}

impl ScriptedProbe {
    fn set(&self, instance_id: InstanceId, healthy: bool) {
        self.healthy.lock().insert(instance_id, healthy);
    }
}

#[async_trait]
impl HealthProbe for ScriptedProbe {
    async fn check(&self, instance: &ServiceInstance) -> bool {
        *self.healthy.lock().get(&instance.id).unwrap_or(&true)
    }
}

#[tokio::test]
async fn requests_restart_after_threshold_consecutive_failures() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(FakeEventBus::default());
    let probe = Arc::new(ScriptedProbe::default());
    let (checker, mut restart_rx) = HealthChecker::new(store.clone(), bus, probe.clone(), 8);

    let router_id = RouterId::new();
    let instance = ServiceInstanceBuilder::default()
        .router_id(router_id)
        .status(InstanceState::Running)
        .ports(vec![8080])
        .build();
    store.upsert_instance(instance.clone(), Default::default()).await.unwrap();
    probe.set(instance.id, false);

    for _ in 0..FAILURE_THRESHOLD {
        checker.tick(router_id).await.unwrap();
    }

    let requested = restart_rx.try_recv().unwrap();
    assert_eq!(requested, instance.id);
}

#[tokio::test]
async fn recovers_without_further_restart_requests() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(FakeEventBus::default());
    let probe = Arc::new(ScriptedProbe::default());
    let (checker, mut restart_rx) = HealthChecker::new(store.clone(), bus, probe.clone(), 8);

    let router_id = RouterId::new();
    let instance = ServiceInstanceBuilder::default()
        .router_id(router_id)
        .status(InstanceState::Running)
        .ports(vec![8080])
        .build();
    store.upsert_instance(instance.clone(), Default::default()).await.unwrap();
    probe.set(instance.id, false);
    for _ in 0..FAILURE_THRESHOLD {
        checker.tick(router_id).await.unwrap();
    }
    restart_rx.try_recv().unwrap();

    probe.set(instance.id, true);
    checker.tick(router_id).await.unwrap();
    assert!(restart_rx.try_recv().is_err());
}

#[tokio::test]
async fn ignores_instances_that_are_not_running() {
    let store = Arc::new(MemoryStore::new());
    let bus = Arc::new(FakeEventBus::default());
    let probe = Arc::new(ScriptedProbe::default());
    let (checker, mut restart_rx) = HealthChecker::new(store.clone(), bus, probe, 8);

    let router_id = RouterId::new();
    let instance =
        ServiceInstanceBuilder::default().router_id(router_id).status(InstanceState::Stopped).build();
    store.upsert_instance(instance, Default::default()).await.unwrap();

    checker.tick(router_id).await.unwrap();
    assert!(restart_rx.try_recv().is_err());
}
