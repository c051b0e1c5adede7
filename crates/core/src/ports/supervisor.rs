// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process supervisor: adds/starts/stops/removes a process record and
//! reports current state. An external contract — this system only issues
//! commands against it.

use crate::error::CoreError;
use crate::model::InstanceId;
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct IsolationConfig {
    pub bind_ip: IpAddr,
    pub ports: Vec<u16>,
    pub vlan_id: Option<u16>,
}

#[derive(Debug, Clone)]
pub struct ProcessDescriptor {
    pub instance_id: InstanceId,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub working_dir: String,
    pub isolation: IsolationConfig,
    pub shutdown_grace: Duration,
}

#[async_trait]
pub trait Supervisor: Send + Sync {
    async fn register(&self, descriptor: ProcessDescriptor) -> Result<(), CoreError>;
    async fn start(&self, instance_id: InstanceId) -> Result<(), CoreError>;
    async fn stop(&self, instance_id: InstanceId, grace: Duration) -> Result<(), CoreError>;
    async fn deregister(&self, instance_id: InstanceId) -> Result<(), CoreError>;
    async fn is_running(&self, instance_id: InstanceId) -> Result<bool, CoreError>;
    /// Applies a memory ceiling to an already-running process; part of the
    /// post-start "register with the resource poller" step.
    async fn apply_memory_limit(
        &self,
        instance_id: InstanceId,
        limit_bytes: u64,
    ) -> Result<(), CoreError>;
    /// Wires the process's isolated network namespace to the host bridge.
    /// Only called when the feature manifest requests it.
    async fn configure_vif_bridge(&self, instance_id: InstanceId) -> Result<(), CoreError>;
    /// Starts the downstream gateway that proxies through the instance's
    /// SOCKS endpoint; called once that endpoint is confirmed ready.
    async fn start_gateway(&self, instance_id: InstanceId) -> Result<(), CoreError>;
}

/// Reads host memory for the pre-flight resource check, abstracted behind a
/// port so `bastion-instance` can swap a `sysinfo`-backed implementation for
/// a fake in tests.
pub trait HostMemory: Send + Sync {
    fn total_mb(&self) -> u64;
    fn available_mb(&self) -> u64;
}
