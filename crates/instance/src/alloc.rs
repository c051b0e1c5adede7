// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Port and VLAN allocators: hand out scarce router-scoped resources with
//! ordered rollback on partial failure.

use bastion_core::{
    CoreError, InstanceId, PortAllocation, PortAllocationId, RouterId, Store, VlanAllocation,
    VlanAllocationId,
};
use std::collections::HashSet;

/// Candidate ranges searched for a free port/VLAN. Router-scoped resources
/// are picked from these ranges; exhaustion yields `PoolExhausted`.
#[derive(Debug, Clone, Copy)]
pub struct AllocationRange {
    pub port_start: u16,
    pub port_end: u16,
    pub vlan_start: u16,
    pub vlan_end: u16,
}

impl Default for AllocationRange {
    fn default() -> Self {
        Self { port_start: 20000, port_end: 29999, vlan_start: 100, vlan_end: 999 }
    }
}

async fn find_free_port(
    store: &dyn Store,
    router_id: RouterId,
    range: AllocationRange,
    taken: &HashSet<u16>,
) -> Result<u16, CoreError> {
    let existing: HashSet<u16> = store
        .list_port_allocations_by_router(router_id)
        .await?
        .into_iter()
        .map(|a| a.port)
        .collect();
    (range.port_start..=range.port_end)
        .find(|p| !existing.contains(p) && !taken.contains(p))
        .ok_or_else(|| CoreError::PoolExhausted(format!("no free port in router {router_id}")))
}

async fn find_free_vlan(
    store: &dyn Store,
    router_id: RouterId,
    range: AllocationRange,
) -> Result<u16, CoreError> {
    let existing: HashSet<u16> = store
        .list_vlan_allocations_by_router(router_id)
        .await?
        .into_iter()
        .map(|a| a.vlan_id)
        .collect();
    (range.vlan_start..=range.vlan_end)
        .find(|v| !existing.contains(v))
        .ok_or_else(|| CoreError::PoolExhausted(format!("no free vlan in router {router_id}")))
}

/// Allocates `count` ports for `instance_id`, rolling back 1..k-1 if port
/// `k` fails. Returns the allocations in the order they were minted.
pub async fn allocate_ports(
    store: &dyn Store,
    router_id: RouterId,
    instance_id: InstanceId,
    count: u32,
    range: AllocationRange,
) -> Result<Vec<PortAllocation>, CoreError> {
    let mut allocated = Vec::new();
    let mut taken = HashSet::new();
    for _ in 0..count {
        match find_free_port(store, router_id, range, &taken).await {
            Ok(port) => {
                taken.insert(port);
                let allocation = PortAllocation {
                    id: PortAllocationId::new(),
                    router_id,
                    port,
                    instance_id,
                };
                if let Err(err) = store.upsert_port_allocation(allocation.clone()).await {
                    release_ports(store, &allocated).await;
                    return Err(err);
                }
                allocated.push(allocation);
            }
            Err(err) => {
                release_ports(store, &allocated).await;
                return Err(err);
            }
        }
    }
    Ok(allocated)
}

/// Best-effort release of a batch of port allocations. Used for rollback, so
/// individual release failures are logged by the caller, not propagated.
pub async fn release_ports(store: &dyn Store, allocations: &[PortAllocation]) {
    for allocation in allocations {
        let _ = store.release_port_allocation(allocation.id).await;
    }
}

pub async fn allocate_vlan(
    store: &dyn Store,
    router_id: RouterId,
    instance_id: InstanceId,
    range: AllocationRange,
) -> Result<VlanAllocation, CoreError> {
    let vlan_id = find_free_vlan(store, router_id, range).await?;
    let allocation = VlanAllocation { id: VlanAllocationId::new(), router_id, vlan_id, instance_id };
    store.upsert_vlan_allocation(allocation.clone()).await?;
    Ok(allocation)
}

/// Releases any port/VLAN allocation whose `instance_id` has no matching
/// [`bastion_core::ServiceInstance`] row. Part of startup reconcile.
pub async fn reclaim_orphans(store: &dyn Store, router_id: RouterId) -> Result<u32, CoreError> {
    let mut reclaimed = 0;
    for allocation in store.list_port_allocations_by_router(router_id).await? {
        if store.get_instance(allocation.instance_id).await?.is_none() {
            store.release_port_allocation(allocation.id).await?;
            reclaimed += 1;
        }
    }
    for allocation in store.list_vlan_allocations_by_router(router_id).await? {
        if store.get_instance(allocation.instance_id).await?.is_none() {
            store.release_vlan_allocation(allocation.id).await?;
            reclaimed += 1;
        }
    }
    Ok(reclaimed)
}

#[cfg(test)]
#[path = "alloc_tests.rs"]
mod tests;
