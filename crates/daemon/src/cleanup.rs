// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bridges the generic cleanup queue to the concrete instance manager and
//! store. The queue only sequences retries; this is where the actual
//! storage-disconnect / router-deletion behavior lives.

use async_trait::async_trait;
use bastion_core::{CoreError, RouterId, Store, SystemClock};
use bastion_instance::{CleanupHandler, CleanupTask, InstanceManager};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub struct DaemonCleanupHandler {
    instance_manager: Arc<InstanceManager<SystemClock>>,
    store: Arc<dyn Store>,
}

impl DaemonCleanupHandler {
    pub fn new(instance_manager: Arc<InstanceManager<SystemClock>>, store: Arc<dyn Store>) -> Self {
        Self { instance_manager, store }
    }

    /// No corrective action exists for a reconnect: the next health probe
    /// and reconcile pass pick the instances back up on their own.
    fn storage_reconnected(&self, router_id: RouterId, path_prefix: &str) {
        info!(%router_id, path_prefix, "storage reconnected, relying on the next reconcile pass");
    }

    async fn router_deleted(&self, router_id: RouterId) -> Result<(), CoreError> {
        let instances = self.store.list_instances_by_router(router_id).await?;
        for instance in instances {
            if let Err(err) = self.store.delete_instance(instance.id).await {
                warn!(%err, instance_id = %instance.id, "failed to delete instance for a deleted router");
            }
        }
        Ok(())
    }
}

#[async_trait]
impl CleanupHandler for DaemonCleanupHandler {
    async fn handle(&self, task: &CleanupTask) -> Result<(), CoreError> {
        match task {
            CleanupTask::StorageDisconnected { router_id, path_prefix } => {
                self.instance_manager
                    .handle_storage_disconnected(*router_id, path_prefix, CancellationToken::new())
                    .await
            }
            CleanupTask::StorageReconnected { router_id, path_prefix } => {
                self.storage_reconnected(*router_id, path_prefix);
                Ok(())
            }
            CleanupTask::RouterDeleted { router_id } => self.router_deleted(*router_id).await,
        }
    }
}

#[cfg(test)]
#[path = "cleanup_tests.rs"]
mod tests;
