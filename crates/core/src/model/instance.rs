// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service instance entity and its state machine.

use super::RouterId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

crate::define_id! {
    /// Identifies a managed service instance (proxy, relay, DNS filter, ...).
    pub struct InstanceId("inst");
}

/// States of the instance lifecycle state machine. See [`crate::fsm`] for the
/// allowed-transition table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Installing,
    Installed,
    Starting,
    Running,
    Stopping,
    Stopped,
    Failed,
    Deleting,
}

crate::simple_display! {
    InstanceState {
        Installing => "installing",
        Installed => "installed",
        Starting => "starting",
        Running => "running",
        Stopping => "stopping",
        Stopped => "stopped",
        Failed => "failed",
        Deleting => "deleting",
    }
}

/// A managed occurrence of a service type on a specific router.
///
/// Mutated only through the FSM; created by instance-create, destroyed only
/// when terminal and no dependents reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInstance {
    pub id: InstanceId,
    pub feature_id: String,
    pub router_id: RouterId,
    pub name: String,
    pub status: InstanceState,
    pub bind_ip: IpAddr,
    pub ports: Vec<u16>,
    pub vlan_id: Option<u16>,
    pub binary_path: Option<String>,
    pub binary_checksum: Option<String>,
    pub binary_version: Option<String>,
    pub config: HashMap<String, serde_json::Value>,
    pub memory_limit: Option<u64>,
    pub unavailable_reason: Option<String>,
    pub created_at_epoch_ms: u64,
    pub updated_at_epoch_ms: u64,
}

crate::builder! {
    pub struct ServiceInstanceBuilder => ServiceInstance {
        computed { id: InstanceId = InstanceId::new() }
        into { feature_id: String = "relay" }
        set { router_id: RouterId = RouterId::new() }
        into { name: String = "instance" }
        set { status: InstanceState = InstanceState::Installing }
        set { bind_ip: IpAddr = IpAddr::from([10, 0, 0, 1]) }
        set { ports: Vec<u16> = Vec::new() }
        option { vlan_id: u16 = None }
        option { binary_path: String = None }
        option { binary_checksum: String = None }
        option { binary_version: String = None }
        set { config: HashMap<String, serde_json::Value> = HashMap::new() }
        option { memory_limit: u64 = None }
        option { unavailable_reason: String = None }
        set { created_at_epoch_ms: u64 = 0 }
        set { updated_at_epoch_ms: u64 = 0 }
    }
}

impl ServiceInstance {
    /// True if no other instance may legally depend on this one being alive.
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, InstanceState::Deleting)
    }
}

#[cfg(test)]
#[path = "instance_tests.rs"]
mod tests;
