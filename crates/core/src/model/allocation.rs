// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router identity and the scarce router-scoped resources (ports, VLANs)
//! handed out to service instances.

use super::InstanceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifies a MikroTik-class edge router under management.
    ///
    /// Router identity/session management is an external concern; this type
    /// exists because every allocation and kill-switch rule is scoped by it.
    pub struct RouterId("rtr_");
}

crate::define_id! {
    pub struct PortAllocationId("pal_");
}

crate::define_id! {
    pub struct VlanAllocationId("vln_");
}

/// Key: `(router_id, port)`. Invariant: no two live allocations share a key;
/// orphans (instance deleted) are reclaimed by the reconcile sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortAllocation {
    pub id: PortAllocationId,
    pub router_id: RouterId,
    pub port: u16,
    pub instance_id: InstanceId,
}

/// Key: `(router_id, vlan_id)`. Same orphan-reclaim invariant as
/// [`PortAllocation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VlanAllocation {
    pub id: VlanAllocationId,
    pub router_id: RouterId,
    pub vlan_id: u16,
    pub instance_id: InstanceId,
}
