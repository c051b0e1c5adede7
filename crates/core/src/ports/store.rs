// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persistent store: transactional row-level mutation with indexed lookup
//! by id and by the secondary fields each method names.

use crate::error::CoreError;
use crate::model::{
    Alert, AlertEscalation, AlertId, AlertRule, AlertRuleId, DeviceRouting, DeviceRoutingId,
    EscalationId, InstanceId, PortAllocation, PortAllocationId, RouterId, ServiceInstance,
    VlanAllocation, VlanAllocationId,
};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

#[async_trait]
pub trait Store: Send + Sync {
    async fn upsert_instance(
        &self,
        instance: ServiceInstance,
        cancel: CancellationToken,
    ) -> Result<(), CoreError>;
    async fn get_instance(&self, id: InstanceId) -> Result<Option<ServiceInstance>, CoreError>;
    async fn list_instances_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<ServiceInstance>, CoreError>;
    async fn list_instances_by_feature(
        &self,
        router_id: RouterId,
        feature_id: &str,
    ) -> Result<Vec<ServiceInstance>, CoreError>;
    async fn delete_instance(&self, id: InstanceId) -> Result<(), CoreError>;

    async fn upsert_port_allocation(&self, allocation: PortAllocation) -> Result<(), CoreError>;
    async fn release_port_allocation(&self, id: PortAllocationId) -> Result<(), CoreError>;
    async fn list_port_allocations_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<PortAllocation>, CoreError>;

    async fn upsert_vlan_allocation(&self, allocation: VlanAllocation) -> Result<(), CoreError>;
    async fn release_vlan_allocation(&self, id: VlanAllocationId) -> Result<(), CoreError>;
    async fn list_vlan_allocations_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<VlanAllocation>, CoreError>;

    async fn upsert_device_routing(&self, routing: DeviceRouting) -> Result<(), CoreError>;
    async fn get_device_routing(
        &self,
        id: DeviceRoutingId,
    ) -> Result<Option<DeviceRouting>, CoreError>;
    async fn delete_device_routing(&self, id: DeviceRoutingId) -> Result<(), CoreError>;
    async fn list_device_routings_by_instance(
        &self,
        instance_id: InstanceId,
    ) -> Result<Vec<DeviceRouting>, CoreError>;
    async fn list_kill_switch_enabled_by_router(
        &self,
        router_id: RouterId,
    ) -> Result<Vec<DeviceRouting>, CoreError>;

    async fn upsert_alert_rule(&self, rule: AlertRule) -> Result<(), CoreError>;
    async fn get_alert_rule_by_event_type(
        &self,
        event_type: &str,
    ) -> Result<Option<AlertRule>, CoreError>;
    async fn get_alert_rule(&self, id: AlertRuleId) -> Result<Option<AlertRule>, CoreError>;

    async fn upsert_alert(&self, alert: Alert) -> Result<(), CoreError>;
    async fn get_alert(&self, id: AlertId) -> Result<Option<Alert>, CoreError>;
    async fn acknowledge_alert(&self, id: AlertId, at_epoch_ms: u64) -> Result<(), CoreError>;

    async fn upsert_escalation(&self, escalation: AlertEscalation) -> Result<(), CoreError>;
    async fn get_escalation(&self, id: EscalationId) -> Result<Option<AlertEscalation>, CoreError>;
    async fn get_escalation_by_alert(
        &self,
        alert_id: AlertId,
    ) -> Result<Option<AlertEscalation>, CoreError>;
    async fn list_pending_escalations(&self) -> Result<Vec<AlertEscalation>, CoreError>;
}
