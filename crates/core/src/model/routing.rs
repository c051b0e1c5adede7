// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Device-to-instance routing bindings and the kill-switch fields carried on
//! them.

use super::{InstanceId, RouterId};
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct DeviceRoutingId("drt_");
}

/// Firewall strategy a kill-switch rule enforces while active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum KillSwitchMode {
    /// `forward`-chain filter rule, `action=drop`.
    BlockAll,
    /// `prerouting` mangle rule, `action=mark-routing`, routes through a
    /// fallback virtual interface.
    FallbackService,
    /// `forward`-chain filter rule, `action=accept`.
    AllowDirect,
}

crate::simple_display! {
    KillSwitchMode {
        BlockAll => "blockAll",
        FallbackService => "fallbackService",
        AllowDirect => "allowDirect",
    }
}

/// Binds a client MAC to a [`super::ServiceInstance`] via a router routing
/// mark and a mangle-rule id, plus the kill-switch fields.
///
/// Invariant: `kill_switch_active ⇒ kill_switch_enabled ∧ kill_switch_rule_id
/// is Some(non-empty)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRouting {
    pub id: DeviceRoutingId,
    pub router_id: RouterId,
    pub instance_id: InstanceId,
    pub device_mac: String,
    pub routing_mark: String,
    pub mangle_rule_id: Option<String>,
    pub kill_switch_enabled: bool,
    pub kill_switch_mode: Option<KillSwitchMode>,
    pub kill_switch_rule_id: Option<String>,
    pub kill_switch_active: bool,
    pub kill_switch_activated_at_epoch_ms: Option<u64>,
    pub kill_switch_fallback_interface_id: Option<String>,
}

impl DeviceRouting {
    /// Checks the invariant: `killSwitchActive ⇒ killSwitchEnabled ∧
    /// killSwitchRuleId ≠ ""`.
    pub fn kill_switch_invariant_holds(&self) -> bool {
        if !self.kill_switch_active {
            return true;
        }
        self.kill_switch_enabled
            && self.kill_switch_rule_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}

crate::builder! {
    pub struct DeviceRoutingBuilder => DeviceRouting {
        computed { id: DeviceRoutingId = DeviceRoutingId::new() }
        set { router_id: RouterId = RouterId::new() }
        set { instance_id: InstanceId = InstanceId::new() }
        into { device_mac: String = "aa:bb:cc:dd:ee:ff" }
        into { routing_mark: String = "mark-1" }
        option { mangle_rule_id: String = None }
        set { kill_switch_enabled: bool = false }
        option { kill_switch_mode: KillSwitchMode = None }
        option { kill_switch_rule_id: String = None }
        set { kill_switch_active: bool = false }
        option { kill_switch_activated_at_epoch_ms: u64 = None }
        option { kill_switch_fallback_interface_id: String = None }
    }
}

#[cfg(test)]
#[path = "routing_tests.rs"]
mod tests;
