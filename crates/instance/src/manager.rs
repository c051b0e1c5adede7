// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Instance lifecycle manager: Create / Start (with dependency resolution) /
//! Stop / Restart / Reconcile.

use crate::alloc::{self, AllocationRange};
use crate::binary::BinaryProvisioner;
use crate::manifests::ManifestRegistry;
use crate::resources::preflight_memory_check;
use bastion_core::{
    can_transition, CapabilityFacts, Clock, CoreError, Event, EventBus, HostMemory, InstanceId,
    InstanceState, IsolationConfig, ProcessDescriptor, RouterId, ServiceInstance, Store, Supervisor,
};
use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Start's depth-first dependency walk aborts with `dependency-too-deep`
/// past this depth rather than risk a runaway or cyclic graph.
const MAX_DEPENDENCY_DEPTH: u32 = 10;
const DEPENDENCY_POLL_INTERVAL: Duration = Duration::from_secs(1);
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const RESTART_BUDGET: Duration = Duration::from_secs(30);
const SOCKS_POLL_INTERVAL: Duration = Duration::from_millis(200);
const SOCKS_READY_TIMEOUT: Duration = Duration::from_secs(10);

/// Polls `addr` until a connection succeeds or `SOCKS_READY_TIMEOUT` elapses.
async fn wait_for_socks_ready(addr: SocketAddr) -> bool {
    let deadline = tokio::time::Instant::now() + SOCKS_READY_TIMEOUT;
    loop {
        if TcpStream::connect(addr).await.is_ok() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(SOCKS_POLL_INTERVAL).await;
    }
}

pub struct CreateInput {
    pub feature_id: String,
    pub router_id: RouterId,
    pub name: String,
    pub bind_ip: IpAddr,
    pub capabilities: CapabilityFacts,
    pub config: HashMap<String, serde_json::Value>,
    pub health_timeout_seconds: u64,
}

pub struct InstanceManager<C: Clock> {
    store: Arc<dyn Store>,
    supervisor: Arc<dyn Supervisor>,
    host_memory: Arc<dyn HostMemory>,
    bus: Arc<dyn EventBus>,
    manifests: Arc<dyn ManifestRegistry>,
    binaries: Arc<dyn BinaryProvisioner>,
    clock: C,
    alloc_range: AllocationRange,
}

impl<C: Clock> InstanceManager<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        supervisor: Arc<dyn Supervisor>,
        host_memory: Arc<dyn HostMemory>,
        bus: Arc<dyn EventBus>,
        manifests: Arc<dyn ManifestRegistry>,
        binaries: Arc<dyn BinaryProvisioner>,
        clock: C,
    ) -> Self {
        Self {
            store,
            supervisor,
            host_memory,
            bus,
            manifests,
            binaries,
            clock,
            alloc_range: AllocationRange::default(),
        }
    }

    fn publish_state_changed(&self, instance_id: InstanceId, previous: InstanceState, current: InstanceState) {
        self.bus.publish(Event::ServiceStateChanged {
            instance_id,
            previous: previous.to_string(),
            current: current.to_string(),
        });
    }

    async fn transition(
        &self,
        instance: &mut ServiceInstance,
        to: InstanceState,
        cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        if !can_transition(instance.status, to) {
            return Err(CoreError::InvalidState(format!(
                "cannot transition {} from {} to {to}",
                instance.id, instance.status
            )));
        }
        let previous = instance.status;
        instance.status = to;
        instance.updated_at_epoch_ms = self.clock.epoch_ms();
        self.store.upsert_instance(instance.clone(), cancel).await?;
        self.publish_state_changed(instance.id, previous, to);
        Ok(())
    }

    /// Step 1-6 of instance-create.
    pub async fn create(
        &self,
        input: CreateInput,
        cancel: CancellationToken,
    ) -> Result<ServiceInstance, CoreError> {
        let manifest = self
            .manifests
            .get(&input.feature_id)
            .ok_or_else(|| CoreError::NotFound(format!("no manifest for feature {}", input.feature_id)))?;

        if !manifest.is_compatible(&input.capabilities) {
            return Err(CoreError::InvalidInput(format!(
                "feature {} is not compatible with the reported host capabilities",
                input.feature_id
            )));
        }

        let instance_id = InstanceId::new();
        let port_count = manifest.required_ports.max(1);
        let ports = alloc::allocate_ports(
            self.store.as_ref(),
            input.router_id,
            instance_id,
            port_count,
            self.alloc_range,
        )
        .await?;

        let vlan_id = if manifest.requires_vlan {
            match alloc::allocate_vlan(self.store.as_ref(), input.router_id, instance_id, self.alloc_range)
                .await
            {
                Ok(vlan) => Some(vlan.vlan_id),
                Err(err) => {
                    alloc::release_ports(self.store.as_ref(), &ports).await;
                    return Err(err);
                }
            }
        } else {
            None
        };

        let now = self.clock.epoch_ms();
        let instance = ServiceInstance {
            id: instance_id,
            feature_id: input.feature_id.clone(),
            router_id: input.router_id,
            name: input.name,
            status: InstanceState::Installing,
            bind_ip: input.bind_ip,
            ports: ports.iter().map(|p| p.port).collect(),
            vlan_id,
            binary_path: None,
            binary_checksum: None,
            binary_version: None,
            config: input.config,
            memory_limit: None,
            unavailable_reason: None,
            created_at_epoch_ms: now,
            updated_at_epoch_ms: now,
        };

        if let Err(err) = self.store.upsert_instance(instance.clone(), cancel.clone()).await {
            alloc::release_ports(self.store.as_ref(), &ports).await;
            return Err(err);
        }

        self.spawn_download(instance.clone());
        Ok(instance)
    }

    /// Scheduled asynchronously; on failure the instance moves to Failed but
    /// its port/VLAN allocations are left bound for retry.
    fn spawn_download(&self, instance: ServiceInstance) {
        let store = self.store.clone();
        let bus = self.bus.clone();
        let binaries = self.binaries.clone();
        let clock_now = self.clock.epoch_ms();
        tokio::spawn(async move {
            let mut instance = instance;
            match binaries.download(&instance.feature_id, instance.id).await {
                Ok(artifact) => {
                    let previous = instance.status;
                    instance.binary_path = Some(artifact.path);
                    instance.binary_checksum = Some(artifact.checksum);
                    instance.binary_version = Some(artifact.version);
                    instance.status = InstanceState::Installed;
                    instance.updated_at_epoch_ms = clock_now;
                    if store.upsert_instance(instance.clone(), CancellationToken::new()).await.is_ok() {
                        bus.publish(Event::ServiceStateChanged {
                            instance_id: instance.id,
                            previous: previous.to_string(),
                            current: InstanceState::Installed.to_string(),
                        });
                        bus.publish(Event::ServiceInstalled { instance_id: instance.id });
                    }
                }
                Err(err) => {
                    warn!(instance_id = %instance.id, %err, "binary download failed");
                    let previous = instance.status;
                    instance.status = InstanceState::Failed;
                    instance.updated_at_epoch_ms = clock_now;
                    if store.upsert_instance(instance.clone(), CancellationToken::new()).await.is_ok() {
                        bus.publish(Event::ServiceStateChanged {
                            instance_id: instance.id,
                            previous: previous.to_string(),
                            current: InstanceState::Failed.to_string(),
                        });
                    }
                }
            }
        });
    }

    /// Start with recursive `autoStart` dependency resolution.
    pub async fn start(&self, instance_id: InstanceId, health_timeout_seconds: u64, cancel: CancellationToken) -> Result<(), CoreError> {
        let mut visited = HashSet::new();
        self.start_with_depth(instance_id, health_timeout_seconds, &mut visited, 0, cancel).await
    }

    fn start_with_depth<'a>(
        &'a self,
        instance_id: InstanceId,
        health_timeout_seconds: u64,
        visited: &'a mut HashSet<InstanceId>,
        depth: u32,
        cancel: CancellationToken,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), CoreError>> + Send + 'a>> {
        Box::pin(async move {
            if depth > MAX_DEPENDENCY_DEPTH {
                return Err(CoreError::InvalidState("dependency-too-deep".into()));
            }
            if !visited.insert(instance_id) {
                return Ok(());
            }

            let instance = self
                .store
                .get_instance(instance_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("instance {instance_id} not found")))?;

            if instance.status == InstanceState::Running {
                return Ok(());
            }

            let manifest = self.manifests.get(&instance.feature_id).ok_or_else(|| {
                CoreError::NotFound(format!("no manifest for feature {}", instance.feature_id))
            })?;

            for dependency in manifest.dependencies.iter().filter(|d| d.auto_start) {
                let siblings = self
                    .store
                    .list_instances_by_feature(instance.router_id, &dependency.feature_id)
                    .await?;
                let Some(dep_instance) = siblings.into_iter().next() else {
                    return Err(CoreError::DependencyNotReady(format!(
                        "no instance providing dependency {}",
                        dependency.feature_id
                    )));
                };

                if dep_instance.status != InstanceState::Running {
                    self.start_with_depth(dep_instance.id, health_timeout_seconds, visited, depth + 1, cancel.clone())
                        .await?;
                    self.wait_for_running(dep_instance.id, health_timeout_seconds, cancel.clone()).await?;
                }
            }

            self.start_single(instance, cancel).await
        })
    }

    async fn wait_for_running(
        &self,
        instance_id: InstanceId,
        timeout_seconds: u64,
        cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        let deadline = self.clock.epoch_ms() + timeout_seconds * 1000;
        loop {
            if cancel.is_cancelled() {
                return Err(CoreError::DependencyNotReady("start cancelled while waiting on dependency".into()));
            }
            let instance = self
                .store
                .get_instance(instance_id)
                .await?
                .ok_or_else(|| CoreError::NotFound(format!("instance {instance_id} not found")))?;
            match instance.status {
                InstanceState::Running => return Ok(()),
                InstanceState::Failed => {
                    return Err(CoreError::DependencyNotReady(format!(
                        "dependency {instance_id} failed to start"
                    )))
                }
                _ => {}
            }
            if self.clock.epoch_ms() >= deadline {
                return Err(CoreError::DependencyNotReady(format!(
                    "timed out waiting for dependency {instance_id} to become healthy"
                )));
            }
            tokio::time::sleep(DEPENDENCY_POLL_INTERVAL).await;
        }
    }

    async fn start_single(&self, mut instance: ServiceInstance, cancel: CancellationToken) -> Result<(), CoreError> {
        self.transition(&mut instance, InstanceState::Starting, cancel.clone()).await?;

        if let Err(err) = self.preflight(&instance).await {
            self.transition(&mut instance, InstanceState::Failed, cancel.clone()).await?;
            return Err(err);
        }

        let descriptor = ProcessDescriptor {
            instance_id: instance.id,
            command: instance.binary_path.clone().unwrap_or_default(),
            args: Vec::new(),
            env: HashMap::new(),
            working_dir: "/".to_string(),
            isolation: IsolationConfig {
                bind_ip: instance.bind_ip,
                ports: instance.ports.clone(),
                vlan_id: instance.vlan_id,
            },
            shutdown_grace: SHUTDOWN_GRACE,
        };

        if let Err(err) = self.supervisor.register(descriptor).await {
            self.transition(&mut instance, InstanceState::Failed, cancel.clone()).await?;
            return Err(err);
        }

        if let Err(err) = self.supervisor.start(instance.id).await {
            let _ = self.supervisor.deregister(instance.id).await;
            self.transition(&mut instance, InstanceState::Failed, cancel.clone()).await?;
            return Err(err);
        }

        self.transition(&mut instance, InstanceState::Running, cancel.clone()).await?;

        if let Some(limit) = instance.memory_limit {
            let supervisor = self.supervisor.clone();
            let instance_id = instance.id;
            tokio::spawn(async move {
                if let Err(err) = supervisor.apply_memory_limit(instance_id, limit).await {
                    warn!(%instance_id, %err, "failed to apply memory limit after start");
                }
            });
        }

        let manifest = self.manifests.get(&instance.feature_id);

        if manifest.as_ref().is_some_and(|m| m.requires_vif_bridge) {
            if let Err(err) = self.supervisor.configure_vif_bridge(instance.id).await {
                let _ = self.supervisor.stop(instance.id, SHUTDOWN_GRACE).await;
                let _ = self.supervisor.deregister(instance.id).await;
                self.transition(&mut instance, InstanceState::Failed, cancel).await?;
                return Err(err);
            }
        }

        if let Some(offset) = manifest.as_ref().and_then(|m| m.socks_port_offset) {
            if let Some(&base_port) = instance.ports.first() {
                let socks_addr = SocketAddr::new(instance.bind_ip, base_port + offset);
                let supervisor = self.supervisor.clone();
                let instance_id = instance.id;
                tokio::spawn(async move {
                    if wait_for_socks_ready(socks_addr).await {
                        if let Err(err) = supervisor.start_gateway(instance_id).await {
                            warn!(%instance_id, %err, "failed to start gateway after socks endpoint became ready");
                        }
                    } else {
                        warn!(%instance_id, %socks_addr, "socks endpoint never became ready within the 10s budget");
                    }
                });
            }
        }

        Ok(())
    }

    async fn preflight(&self, instance: &ServiceInstance) -> Result<(), CoreError> {
        let running = self
            .store
            .list_instances_by_router(instance.router_id)
            .await?
            .into_iter()
            .filter(|i| i.id != instance.id && i.status == InstanceState::Running)
            .collect::<Vec<_>>();
        let reserved_mb: u64 = running.iter().filter_map(|i| i.memory_limit).map(|b| b / (1024 * 1024)).sum();
        let memory_limit = instance.memory_limit.unwrap_or(0);
        if memory_limit > 0 {
            preflight_memory_check(self.host_memory.as_ref(), memory_limit, reserved_mb, &running)?;
        }
        Ok(())
    }

    /// Straight FSM walk Running -> Stopping -> Stopped; rejected while
    /// dependents are still Running.
    pub async fn stop(&self, instance_id: InstanceId, cancel: CancellationToken) -> Result<(), CoreError> {
        let mut instance = self
            .store
            .get_instance(instance_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("instance {instance_id} not found")))?;

        let dependents = self.running_dependents(&instance).await?;
        if !dependents.is_empty() {
            return Err(CoreError::InvalidState(format!(
                "cannot stop {}: depended on by {}",
                instance.name,
                dependents.join(", ")
            )));
        }

        self.transition(&mut instance, InstanceState::Stopping, cancel.clone()).await?;

        if let Err(err) = self.supervisor.stop(instance_id, SHUTDOWN_GRACE).await {
            self.transition(&mut instance, InstanceState::Failed, cancel).await?;
            return Err(err);
        }

        self.transition(&mut instance, InstanceState::Stopped, cancel).await
    }

    async fn running_dependents(&self, instance: &ServiceInstance) -> Result<Vec<String>, CoreError> {
        let siblings = self.store.list_instances_by_router(instance.router_id).await?;
        let mut dependents = Vec::new();
        for sibling in siblings {
            if sibling.id == instance.id || sibling.status != InstanceState::Running {
                continue;
            }
            let Some(manifest) = self.manifests.get(&sibling.feature_id) else { continue };
            if manifest.dependencies.iter().any(|d| d.feature_id == instance.feature_id) {
                dependents.push(sibling.name);
            }
        }
        Ok(dependents)
    }

    /// Stop then Start under a single 30-second budget, reusing the same id.
    pub async fn restart(
        &self,
        instance_id: InstanceId,
        health_timeout_seconds: u64,
        cancel: CancellationToken,
    ) -> Result<(), CoreError> {
        tokio::time::timeout(RESTART_BUDGET, async {
            self.stop(instance_id, cancel.clone()).await?;
            self.start(instance_id, health_timeout_seconds, cancel).await
        })
        .await
        .map_err(|_| CoreError::ExternalFailure(format!("restart of {instance_id} exceeded its 30s budget")))?
    }

    /// Startup reconcile: reclaim orphaned allocations, then align persisted
    /// status with the supervisor's actual record.
    pub async fn reconcile(&self, router_id: RouterId, cancel: CancellationToken) -> Result<(), CoreError> {
        let reclaimed = alloc::reclaim_orphans(self.store.as_ref(), router_id).await?;
        if reclaimed > 0 {
            info!(router_id = %router_id, reclaimed, "reclaimed orphaned allocations");
        }

        for mut instance in self.store.list_instances_by_router(router_id).await? {
            match instance.status {
                InstanceState::Running => {
                    if !self.supervisor.is_running(instance.id).await.unwrap_or(false) {
                        // Running -> Stopped isn't a legal transition() target, and this
                        // corrective sweep isn't the guarded start/stop path: write the
                        // persisted state directly, the same as handle_storage_disconnected.
                        instance.status = InstanceState::Stopped;
                        instance.updated_at_epoch_ms = self.clock.epoch_ms();
                        self.store.upsert_instance(instance.clone(), cancel.clone()).await?;
                    }
                }
                InstanceState::Installing | InstanceState::Starting | InstanceState::Stopping => {
                    self.transition(&mut instance, InstanceState::Failed, cancel.clone()).await?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// On a storage-disconnect signal: stop and fail every instance whose
    /// binary path sits under `path_prefix`.
    pub async fn handle_storage_disconnected(&self, router_id: RouterId, path_prefix: &str, cancel: CancellationToken) -> Result<(), CoreError> {
        for mut instance in self.store.list_instances_by_router(router_id).await? {
            let Some(binary_path) = &instance.binary_path else { continue };
            if !binary_path.starts_with(path_prefix) {
                continue;
            }
            if instance.status == InstanceState::Running {
                let _ = self.supervisor.stop(instance.id, SHUTDOWN_GRACE).await;
                let _ = self.supervisor.deregister(instance.id).await;
            }
            instance.status = InstanceState::Failed;
            instance.unavailable_reason = Some(format!("External storage disconnected: {path_prefix}"));
            instance.updated_at_epoch_ms = self.clock.epoch_ms();
            self.store.upsert_instance(instance.clone(), cancel.clone()).await?;
            self.bus.publish(Event::StorageUnavailable {
                path: path_prefix.to_string(),
                instance_id: Some(instance.id),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
