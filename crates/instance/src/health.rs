// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-instance health probe loop. Ticked externally (the daemon owns the
//! schedule); on each tick, every Running instance on a router is probed and
//! consecutive failures past [`FAILURE_THRESHOLD`] request a restart over a
//! bounded channel — best-effort, since health-triggered restarts must never
//! block the probe loop itself.

use async_trait::async_trait;
use bastion_core::{CoreError, Event, EventBus, HealthStatus, InstanceId, InstanceState, RouterId, ServiceInstance, Store};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tracing::warn;

const FAILURE_THRESHOLD: u32 = 3;
const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn check(&self, instance: &ServiceInstance) -> bool;
}

/// Connects to the instance's first bound port; a live accept is "healthy".
#[derive(Debug, Default)]
pub struct TcpHealthProbe;

#[async_trait]
impl HealthProbe for TcpHealthProbe {
    async fn check(&self, instance: &ServiceInstance) -> bool {
        let Some(&port) = instance.ports.first() else { return false };
        let addr = SocketAddr::new(instance.bind_ip, port);
        matches!(tokio::time::timeout(PROBE_TIMEOUT, TcpStream::connect(addr)).await, Ok(Ok(_)))
    }
}

#[derive(Debug, Clone, Copy)]
struct ProbeState {
    status: HealthStatus,
    consecutive_failures: u32,
}

impl Default for ProbeState {
    fn default() -> Self {
        Self { status: HealthStatus::Unknown, consecutive_failures: 0 }
    }
}

pub struct HealthChecker {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    probe: Arc<dyn HealthProbe>,
    restart_tx: mpsc::Sender<InstanceId>,
    state: Mutex<HashMap<InstanceId, ProbeState>>,
}

impl HealthChecker {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        probe: Arc<dyn HealthProbe>,
        restart_channel_capacity: usize,
    ) -> (Self, mpsc::Receiver<InstanceId>) {
        let (restart_tx, restart_rx) = mpsc::channel(restart_channel_capacity);
        (Self { store, bus, probe, restart_tx, state: Mutex::new(HashMap::new()) }, restart_rx)
    }

    /// Probes every Running instance on `router_id` once.
    pub async fn tick(&self, router_id: RouterId) -> Result<(), CoreError> {
        let instances = self.store.list_instances_by_router(router_id).await?;
        for instance in instances.into_iter().filter(|i| i.status == InstanceState::Running) {
            self.probe_one(&instance).await;
        }
        Ok(())
    }

    async fn probe_one(&self, instance: &ServiceInstance) {
        let healthy = self.probe.check(instance).await;
        let current = if healthy { HealthStatus::Healthy } else { HealthStatus::Unhealthy };

        let (previous, consecutive_failures, just_crossed_threshold) = {
            let mut states = self.state.lock();
            let entry = states.entry(instance.id).or_default();
            let previous = entry.status;
            entry.consecutive_failures = if healthy { 0 } else { entry.consecutive_failures + 1 };
            let crossed = !healthy && entry.consecutive_failures == FAILURE_THRESHOLD;
            entry.status = current;
            (previous, entry.consecutive_failures, crossed)
        };

        if previous != current {
            self.bus.publish(Event::HealthChanged { instance_id: instance.id, previous, current });
        }
        if !healthy && consecutive_failures == 1 {
            self.bus.publish(Event::ServiceHealthFailing {
                instance_id: instance.id,
                reason: "health probe failed".into(),
            });
        }

        if just_crossed_threshold {
            if let Err(err) = self.restart_tx.try_send(instance.id) {
                warn!(instance_id = %instance.id, %err, "restart request channel full or closed, dropping");
            }
        }
    }
}

#[cfg(test)]
#[path = "health_tests.rs"]
mod tests;
