// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Plain `RwLock<HashMap<...>>` tables behind the [`Store`] port. Every
//! method locks only the table(s) it touches; callers needing atomicity
//! across tables must serialize at a higher layer (the manager modules hold
//! their own coordination locks).

use async_trait::async_trait;
use bastion_core::{
    Alert, AlertEscalation, AlertId, AlertRule, AlertRuleId, CoreError, DeviceRouting,
    DeviceRoutingId, EscalationId, EscalationStatus, InstanceId, PortAllocation,
    PortAllocationId, RouterId, ServiceInstance, Store, VlanAllocation, VlanAllocationId,
};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct MemoryStore {
    instances: RwLock<HashMap<InstanceId, ServiceInstance>>,
    port_allocations: RwLock<HashMap<PortAllocationId, PortAllocation>>,
    vlan_allocations: RwLock<HashMap<VlanAllocationId, VlanAllocation>>,
    device_routings: RwLock<HashMap<DeviceRoutingId, DeviceRouting>>,
    alert_rules: RwLock<HashMap<AlertRuleId, AlertRule>>,
    alerts: RwLock<HashMap<AlertId, Alert>>,
    escalations: RwLock<HashMap<EscalationId, AlertEscalation>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn upsert_instance(
        &self,
        instance: ServiceInstance,
        _cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        self.instances.write().insert(instance.id, instance);
        Ok(())
    }

    async fn get_instance(&self, id: InstanceId) -> Result<Option<ServiceInstance>, CoreError> {
        Ok(self.instances.read().get(&id).cloned())
    }

    async fn list_instances_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<ServiceInstance>, CoreError> {
        Ok(self
            .instances
            .read()
            .values()
            .filter(|i| i.router_id == router_id)
            .cloned()
            .collect())
    }

    async fn list_instances_by_feature(
        &self,
        router_id: RouterId,
        feature_id: &str,
    ) -> Result<Vec<ServiceInstance>, CoreError> {
        Ok(self
            .instances
            .read()
            .values()
            .filter(|i| i.router_id == router_id && i.feature_id == feature_id)
            .cloned()
            .collect())
    }

    async fn delete_instance(&self, id: InstanceId) -> Result<(), CoreError> {
        self.instances.write().remove(&id);
        Ok(())
    }

    async fn upsert_port_allocation(&self, allocation: PortAllocation) -> Result<(), CoreError> {
        self.port_allocations.write().insert(allocation.id, allocation);
        Ok(())
    }

    async fn release_port_allocation(&self, id: PortAllocationId) -> Result<(), CoreError> {
        self.port_allocations.write().remove(&id);
        Ok(())
    }

    async fn list_port_allocations_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<PortAllocation>, CoreError> {
        Ok(self
            .port_allocations
            .read()
            .values()
            .filter(|a| a.router_id == router_id)
            .cloned()
            .collect())
    }

    async fn upsert_vlan_allocation(&self, allocation: VlanAllocation) -> Result<(), CoreError> {
        self.vlan_allocations.write().insert(allocation.id, allocation);
        Ok(())
    }

    async fn release_vlan_allocation(&self, id: VlanAllocationId) -> Result<(), CoreError> {
        self.vlan_allocations.write().remove(&id);
        Ok(())
    }

    async fn list_vlan_allocations_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<VlanAllocation>, CoreError> {
        Ok(self
            .vlan_allocations
            .read()
            .values()
            .filter(|a| a.router_id == router_id)
            .cloned()
            .collect())
    }

    async fn upsert_device_routing(&self, routing: DeviceRouting) -> Result<(), CoreError> {
        self.device_routings.write().insert(routing.id, routing);
        Ok(())
    }

    async fn get_device_routing(
        &self,
        id: DeviceRoutingId,
    ) -> Result<Option<DeviceRouting>, CoreError> {
        Ok(self.device_routings.read().get(&id).cloned())
    }

    async fn delete_device_routing(&self, id: DeviceRoutingId) -> Result<(), CoreError> {
        self.device_routings.write().remove(&id);
        Ok(())
    }

    async fn list_device_routings_by_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<DeviceRouting>, CoreError> {
        Ok(self
            .device_routings
            .read()
            .values()
            .filter(|r| r.instance_id == instance_id)
            .cloned()
            .collect())
    }

    async fn list_kill_switch_enabled_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<DeviceRouting>, CoreError> {
        Ok(self
            .device_routings
            .read()
            .values()
            .filter(|r| r.router_id == router_id && r.kill_switch_enabled)
            .cloned()
            .collect())
    }

    async fn upsert_alert_rule(&self, rule: AlertRule) -> Result<(), CoreError> {
        self.alert_rules.write().insert(rule.id, rule);
        Ok(())
    }

    async fn get_alert_rule_by_event_type(
        &self,
        event_type: &str,
    ) -> Result<Option<AlertRule>, CoreError> {
        Ok(self
            .alert_rules
            .read()
            .values()
            .find(|r| r.enabled && r.event_type == event_type)
            .cloned())
    }

    async fn get_alert_rule(&self, id: AlertRuleId) -> Result<Option<AlertRule>, CoreError> {
        Ok(self.alert_rules.read().get(&id).cloned())
    }

    async fn upsert_alert(&self, alert: Alert) -> Result<(), CoreError> {
        self.alerts.write().insert(alert.id, alert);
        Ok(())
    }

    async fn get_alert(&self, id: AlertId) -> Result<Option<Alert>, CoreError> {
        Ok(self.alerts.read().get(&id).cloned())
    }

    async fn acknowledge_alert(&self, id: AlertId, at_epoch_ms: u64) -> Result<(), CoreError> {
        let mut alerts = self.alerts.write();
        let alert = alerts
            .get_mut(&id)
            .ok_or_else(|| CoreError::not_found(format!("alert {id} not found")))?;
        alert.acknowledged_at_epoch_ms = Some(at_epoch_ms);
        Ok(())
    }

    async fn upsert_escalation(&self, escalation: AlertEscalation) -> Result<(), CoreError> {
        self.escalations.write().insert(escalation.id, escalation);
        Ok(())
    }

    async fn get_escalation(
        &self,
        id: EscalationId,
    ) -> Result<Option<AlertEscalation>, CoreError> {
        Ok(self.escalations.read().get(&id).cloned())
    }

    async fn get_escalation_by_alert(
        &self,
        alert_id: AlertId,
    ) -> Result<Option<AlertEscalation>, CoreError> {
        Ok(self
            .escalations
            .read()
            .values()
            .find(|e| e.alert_id == alert_id)
            .cloned())
    }

    async fn list_pending_escalations(&self) -> Result<Vec<AlertEscalation>, CoreError> {
        Ok(self
            .escalations
            .read()
            .values()
            .filter(|e| e.status == EscalationStatus::Pending)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
