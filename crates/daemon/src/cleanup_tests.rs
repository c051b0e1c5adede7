// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bastion_core::{RouterId, ServiceInstanceBuilder, SystemClock};
use bastion_instance::{FakeEventBus, FakeSupervisor, StaticManifestRegistry};
use bastion_store::MemoryStore;
use std::sync::Arc;

fn handler_with_store(store: Arc<MemoryStore>) -> DaemonCleanupHandler {
    let instance_manager = Arc::new(InstanceManager::new(
        store.clone(),
        Arc::new(FakeSupervisor::default()),
        Arc::new(bastion_instance::FakeHostMemory { total_mb: 1024, available_mb: 1024 }),
        Arc::new(FakeEventBus::default()),
        Arc::new(StaticManifestRegistry::new(Vec::new())),
        Arc::new(bastion_instance::FakeBinaryProvisioner::default()),
        SystemClock,
    ));
    DaemonCleanupHandler::new(instance_manager, store as Arc<dyn Store>)
}

#[tokio::test]
async fn router_deleted_removes_every_instance_on_that_router() {
    let store = Arc::new(MemoryStore::new());
    let router_id = RouterId::new();
    let other_router = RouterId::new();

    let kept = ServiceInstanceBuilder::default().router_id(other_router).build();
    let removed = ServiceInstanceBuilder::default().router_id(router_id).build();
    store.upsert_instance(kept.clone()).await.unwrap();
    store.upsert_instance(removed.clone()).await.unwrap();

    let handler = handler_with_store(store.clone());
    handler.handle(&CleanupTask::RouterDeleted { router_id }).await.unwrap();

    assert!(store.get_instance(removed.id).await.unwrap().is_none());
    assert!(store.get_instance(kept.id).await.unwrap().is_some());
}

#[tokio::test]
async fn storage_reconnected_is_a_log_only_no_op() {
    let store = Arc::new(MemoryStore::new());
    let handler = handler_with_store(store);

    handler
        .handle(&CleanupTask::StorageReconnected { router_id: RouterId::new(), path_prefix: "/mnt/usb1".into() })
        .await
        .unwrap();
}
