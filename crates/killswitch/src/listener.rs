// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Health-changed subscriber: flips kill-switch state on `¬Unhealthy ->
//! Unhealthy` (activate) and `Unhealthy -> Healthy` (deactivate), continuing
//! past per-row failures so one bad routing doesn't block the rest.

use crate::manager::KillSwitchManager;
use bastion_core::{Clock, HealthStatus, InstanceId, Store};
use std::sync::Arc;
use tracing::warn;

pub struct KillSwitchListener<C: Clock> {
    manager: Arc<KillSwitchManager<C>>,
    store: Arc<dyn Store>,
}

impl<C: Clock> KillSwitchListener<C> {
    pub fn new(manager: Arc<KillSwitchManager<C>>, store: Arc<dyn Store>) -> Self {
        Self { manager, store }
    }

    /// Call on every `health.changed` event; no-ops on irrelevant
    /// transitions (anything not `¬Unhealthy -> Unhealthy` or `Unhealthy ->
    /// Healthy`, including any transition through `Unknown`).
    pub async fn on_health_changed(&self, instance_id: InstanceId, previous: HealthStatus, current: HealthStatus) {
        let activating = previous != HealthStatus::Unhealthy && current == HealthStatus::Unhealthy;
        let deactivating = previous == HealthStatus::Unhealthy && current == HealthStatus::Healthy;
        if !activating && !deactivating {
            return;
        }

        let routings = match self.store.list_device_routings_by_instance(instance_id).await {
            Ok(routings) => routings,
            Err(err) => {
                warn!(%instance_id, %err, "could not load device routings for health transition");
                return;
            }
        };

        for routing in routings.into_iter().filter(|r| r.kill_switch_enabled) {
            let result = if activating {
                self.manager.activate(routing.id).await
            } else {
                self.manager.deactivate(routing.id).await
            };
            if let Err(err) = result {
                warn!(routing_id = %routing.id, %err, "kill-switch flip on health transition failed, continuing with remaining routings");
            }
        }
    }
}

#[cfg(test)]
#[path = "listener_tests.rs"]
mod tests;
