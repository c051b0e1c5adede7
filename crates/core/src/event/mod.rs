// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event types published on and consumed from the in-process event bus.

mod dispatch;

use crate::model::{AlertId, DeviceRoutingId, InstanceId, KillSwitchMode, RouterId};
use serde::{Deserialize, Serialize};

/// Health state reported by the health checker (component D). A relevant
/// transition for the kill-switch listener is `¬Unhealthy -> Unhealthy` or
/// `Unhealthy -> Healthy`; any other transition (including `Unknown`) is
/// ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Events flowing over the in-process event bus.
///
/// Serializes with `{"type": "event:name", ...fields}` format. Unknown type
/// tags deserialize to `Custom`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- service (consumed + republished) --
    #[serde(rename = "service.state_changed")]
    ServiceStateChanged { instance_id: InstanceId, previous: String, current: String },

    #[serde(rename = "service.crashed")]
    ServiceCrashed { instance_id: InstanceId, reason: String },

    #[serde(rename = "service.restarted")]
    ServiceRestarted { instance_id: InstanceId },

    #[serde(rename = "service.health_failing")]
    ServiceHealthFailing { instance_id: InstanceId, reason: String },

    #[serde(rename = "service.resource_warning")]
    ServiceResourceWarning { instance_id: InstanceId, message: String },

    #[serde(rename = "service.kill_switch")]
    ServiceKillSwitch { instance_id: InstanceId, device_mac: String, active: bool },

    #[serde(rename = "service.installed")]
    ServiceInstalled { instance_id: InstanceId },

    #[serde(rename = "service.removed")]
    ServiceRemoved { instance_id: InstanceId },

    #[serde(rename = "service.update_available")]
    ServiceUpdateAvailable { instance_id: InstanceId, version: String },

    #[serde(rename = "service.health")]
    ServiceHealth { instance_id: InstanceId, status: HealthStatus },

    // -- health --
    #[serde(rename = "health.changed")]
    HealthChanged { instance_id: InstanceId, previous: HealthStatus, current: HealthStatus },

    // -- alert --
    #[serde(rename = "alert.escalated")]
    AlertEscalated { alert_id: AlertId, level: u32 },

    #[serde(rename = "alert.escalation.cancelled")]
    AlertEscalationCancelled { alert_id: AlertId, resolved_by: String },

    #[serde(rename = "alert.escalation.max_reached")]
    AlertEscalationMaxReached { alert_id: AlertId },

    // -- killswitch --
    #[serde(rename = "killswitch.enabled")]
    KillSwitchEnabled { routing_id: DeviceRoutingId, mode: KillSwitchMode },

    #[serde(rename = "killswitch.disabled")]
    KillSwitchDisabled { routing_id: DeviceRoutingId },

    #[serde(rename = "killswitch.activated")]
    KillSwitchActivated {
        routing_id: DeviceRoutingId,
        instance_id: InstanceId,
        device_mac: String,
        mode: KillSwitchMode,
        reason: String,
    },

    #[serde(rename = "killswitch.deactivated")]
    KillSwitchDeactivated {
        routing_id: DeviceRoutingId,
        instance_id: InstanceId,
        device_mac: String,
        mode: KillSwitchMode,
        active_duration_seconds: u64,
    },

    #[serde(rename = "killswitch.reconciled")]
    KillSwitchReconciled { router_id: RouterId, removed: u32, recreated: u32, flipped: u32 },

    // -- storage --
    #[serde(rename = "storage.unavailable")]
    StorageUnavailable { path: String, instance_id: Option<InstanceId> },

    /// Catch-all for unknown event types (extensibility).
    #[serde(other, skip_serializing)]
    Custom,
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
