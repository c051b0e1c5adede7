// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bastion_store::MemoryStore;

fn tiny_range() -> AllocationRange {
    AllocationRange { port_start: 30000, port_end: 30001, vlan_start: 500, vlan_end: 500 }
}

#[tokio::test]
async fn allocates_requested_count_of_ports() {
    let store = MemoryStore::new();
    let router_id = RouterId::new();
    let instance_id = InstanceId::new();
    let allocations = allocate_ports(&store, router_id, instance_id, 2, tiny_range()).await.unwrap();
    assert_eq!(allocations.len(), 2);
    assert_ne!(allocations[0].port, allocations[1].port);
}

#[tokio::test]
async fn exhausted_range_rolls_back_prior_allocations() {
    let store = MemoryStore::new();
    let router_id = RouterId::new();
    let instance_id = InstanceId::new();
    let result = allocate_ports(&store, router_id, instance_id, 3, tiny_range()).await;
    assert!(matches!(result, Err(CoreError::PoolExhausted(_))));
    let remaining = store.list_port_allocations_by_router(router_id).await.unwrap();
    assert!(remaining.is_empty());
}

#[tokio::test]
async fn vlan_exhaustion_returns_pool_exhausted() {
    let store = MemoryStore::new();
    let router_id = RouterId::new();
    let range = tiny_range();
    allocate_vlan(&store, router_id, InstanceId::new(), range).await.unwrap();
    let result = allocate_vlan(&store, router_id, InstanceId::new(), range).await;
    assert!(matches!(result, Err(CoreError::PoolExhausted(_))));
}

#[tokio::test]
async fn reclaim_orphans_releases_allocations_with_no_instance() {
    let store = MemoryStore::new();
    let router_id = RouterId::new();
    allocate_ports(&store, router_id, InstanceId::new(), 1, tiny_range()).await.unwrap();
    let reclaimed = reclaim_orphans(&store, router_id).await.unwrap();
    assert_eq!(reclaimed, 1);
    assert!(store.list_port_allocations_by_router(router_id).await.unwrap().is_empty());
}
