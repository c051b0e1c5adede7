// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory `Supervisor` and `EventBus` stand-ins for exercising
//! [`crate::manager::InstanceManager`] without a real process supervisor or
//! broadcast wiring.

#![cfg(any(test, feature = "test-support"))]

use async_trait::async_trait;
use bastion_core::{CoreError, Event, EventBus, InstanceId, ProcessDescriptor, Supervisor};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::broadcast;

#[derive(Debug)]
struct SupervisorEntry {
    running: bool,
    memory_limit: Option<u64>,
    vif_bridge_configured: bool,
    gateway_started: bool,
}

/// Tracks registered/running instances in memory; `fail_start_for` forces
/// `start()` to error for a given instance id, to exercise the rollback path.
/// `fail_vif_bridge_for` does the same for `configure_vif_bridge`.
#[derive(Default)]
pub struct FakeSupervisor {
    entries: Mutex<HashMap<InstanceId, SupervisorEntry>>,
    fail_start_for: Mutex<Option<InstanceId>>,
    fail_vif_bridge_for: Mutex<Option<InstanceId>>,
}

impl FakeSupervisor {
    pub fn fail_start_for(&self, instance_id: InstanceId) {
        *self.fail_start_for.lock() = Some(instance_id);
    }

    pub fn fail_vif_bridge_for(&self, instance_id: InstanceId) {
        *self.fail_vif_bridge_for.lock() = Some(instance_id);
    }

    pub fn memory_limit_of(&self, instance_id: InstanceId) -> Option<u64> {
        self.entries.lock().get(&instance_id).and_then(|e| e.memory_limit)
    }

    pub fn vif_bridge_configured(&self, instance_id: InstanceId) -> bool {
        self.entries.lock().get(&instance_id).map(|e| e.vif_bridge_configured).unwrap_or(false)
    }

    pub fn gateway_started(&self, instance_id: InstanceId) -> bool {
        self.entries.lock().get(&instance_id).map(|e| e.gateway_started).unwrap_or(false)
    }
}

#[async_trait]
impl Supervisor for FakeSupervisor {
    async fn register(&self, descriptor: ProcessDescriptor) -> Result<(), CoreError> {
        let instance_id = descriptor.instance_id;
        self.entries.lock().insert(
            instance_id,
            SupervisorEntry { running: false, memory_limit: None, vif_bridge_configured: false, gateway_started: false },
        );
        Ok(())
    }

    async fn start(&self, instance_id: InstanceId) -> Result<(), CoreError> {
        if *self.fail_start_for.lock() == Some(instance_id) {
            return Err(CoreError::ExternalFailure("forced start failure".into()));
        }
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&instance_id)
            .ok_or_else(|| CoreError::NotFound(format!("{instance_id} not registered")))?;
        entry.running = true;
        Ok(())
    }

    async fn stop(&self, instance_id: InstanceId, _grace: Duration) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&instance_id)
            .ok_or_else(|| CoreError::NotFound(format!("{instance_id} not registered")))?;
        entry.running = false;
        Ok(())
    }

    async fn deregister(&self, instance_id: InstanceId) -> Result<(), CoreError> {
        self.entries.lock().remove(&instance_id);
        Ok(())
    }

    async fn is_running(&self, instance_id: InstanceId) -> Result<bool, CoreError> {
        Ok(self.entries.lock().get(&instance_id).map(|e| e.running).unwrap_or(false))
    }

    async fn apply_memory_limit(&self, instance_id: InstanceId, limit_bytes: u64) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&instance_id)
            .ok_or_else(|| CoreError::NotFound(format!("{instance_id} not registered")))?;
        entry.memory_limit = Some(limit_bytes);
        Ok(())
    }

    async fn configure_vif_bridge(&self, instance_id: InstanceId) -> Result<(), CoreError> {
        if *self.fail_vif_bridge_for.lock() == Some(instance_id) {
            return Err(CoreError::ExternalFailure("forced vif-bridge failure".into()));
        }
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&instance_id)
            .ok_or_else(|| CoreError::NotFound(format!("{instance_id} not registered")))?;
        entry.vif_bridge_configured = true;
        Ok(())
    }

    async fn start_gateway(&self, instance_id: InstanceId) -> Result<(), CoreError> {
        let mut entries = self.entries.lock();
        let entry = entries
            .get_mut(&instance_id)
            .ok_or_else(|| CoreError::NotFound(format!("{instance_id} not registered")))?;
        entry.gateway_started = true;
        Ok(())
    }
}

/// Thin `tokio::sync::broadcast` wrapper; a dropped-if-no-subscribers bus
/// same as any production `EventBus` would be.
pub struct FakeEventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for FakeEventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(256);
        Self { sender }
    }
}

impl EventBus for FakeEventBus {
    fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }

    fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }
}
