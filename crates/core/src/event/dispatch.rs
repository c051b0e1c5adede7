// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatch methods — name, log summary, instance_id extraction.

use super::Event;
use crate::model::InstanceId;

impl Event {
    pub fn name(&self) -> &str {
        match self {
            Event::ServiceStateChanged { .. } => "service.state_changed",
            Event::ServiceCrashed { .. } => "service.crashed",
            Event::ServiceRestarted { .. } => "service.restarted",
            Event::ServiceHealthFailing { .. } => "service.health_failing",
            Event::ServiceResourceWarning { .. } => "service.resource_warning",
            Event::ServiceKillSwitch { .. } => "service.kill_switch",
            Event::ServiceInstalled { .. } => "service.installed",
            Event::ServiceRemoved { .. } => "service.removed",
            Event::ServiceUpdateAvailable { .. } => "service.update_available",
            Event::ServiceHealth { .. } => "service.health",
            Event::HealthChanged { .. } => "health.changed",
            Event::AlertEscalated { .. } => "alert.escalated",
            Event::AlertEscalationCancelled { .. } => "alert.escalation.cancelled",
            Event::AlertEscalationMaxReached { .. } => "alert.escalation.max_reached",
            Event::KillSwitchEnabled { .. } => "killswitch.enabled",
            Event::KillSwitchDisabled { .. } => "killswitch.disabled",
            Event::KillSwitchActivated { .. } => "killswitch.activated",
            Event::KillSwitchDeactivated { .. } => "killswitch.deactivated",
            Event::KillSwitchReconciled { .. } => "killswitch.reconciled",
            Event::StorageUnavailable { .. } => "storage.unavailable",
            Event::Custom => "custom",
        }
    }

    /// Whether this event type is one of the fixed `service.*` types the
    /// alert bridge subscribes to.
    pub fn is_bridge_source(&self) -> bool {
        matches!(
            self,
            Event::ServiceCrashed { .. }
                | Event::ServiceRestarted { .. }
                | Event::ServiceHealthFailing { .. }
                | Event::ServiceResourceWarning { .. }
                | Event::ServiceKillSwitch { .. }
                | Event::ServiceInstalled { .. }
                | Event::ServiceRemoved { .. }
                | Event::ServiceUpdateAvailable { .. }
        )
    }

    /// Extract the instance this event concerns, if any.
    pub fn instance_id(&self) -> Option<InstanceId> {
        match self {
            Event::ServiceStateChanged { instance_id, .. }
            | Event::ServiceCrashed { instance_id, .. }
            | Event::ServiceRestarted { instance_id }
            | Event::ServiceHealthFailing { instance_id, .. }
            | Event::ServiceResourceWarning { instance_id, .. }
            | Event::ServiceKillSwitch { instance_id, .. }
            | Event::ServiceInstalled { instance_id }
            | Event::ServiceRemoved { instance_id }
            | Event::ServiceUpdateAvailable { instance_id, .. }
            | Event::ServiceHealth { instance_id, .. }
            | Event::HealthChanged { instance_id, .. }
            | Event::KillSwitchActivated { instance_id, .. }
            | Event::KillSwitchDeactivated { instance_id, .. } => Some(*instance_id),
            Event::StorageUnavailable { instance_id, .. } => *instance_id,
            _ => None,
        }
    }

    pub fn log_summary(&self) -> String {
        let name = self.name();
        match self.instance_id() {
            Some(id) => format!("{name} instance={id}"),
            None => name.to_string(),
        }
    }
}
