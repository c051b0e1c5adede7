// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every component together from [`Config`] and runs reconcile-on-start.
//! This is the one place in the crate that knows every concrete type; the
//! rest of the crate only sees the ports.

use crate::cleanup::DaemonCleanupHandler;
use crate::config::Config;
use crate::{bus::BroadcastEventBus, tasks};
use bastion_alerts::{AlertBridge, EscalationEngine, RateLimiter, ThresholdQuietHours};
use bastion_core::{CoreError, SystemClock};
use bastion_instance::{
    CleanupQueue, FakeBinaryProvisioner, FakeSupervisor, HealthChecker, InstanceManager,
    StaticManifestRegistry, SysinfoHostMemory, TcpHealthProbe,
};
use bastion_killswitch::{KillSwitchListener, KillSwitchManager, StaticFallbackInterfaceResolver};
use bastion_router::FakeRouterDriver;
use bastion_store::MemoryStore;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

const RESTART_CHANNEL_CAPACITY: usize = 64;

/// Every running background task plus the handles needed to shut them down.
pub struct Daemon {
    pub cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    escalation: Arc<EscalationEngine<SystemClock>>,
}

impl Daemon {
    /// Cancels every background task, waits for them to finish, and stops
    /// any in-flight escalation timers.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        if let Err(err) = self.escalation.shutdown().await {
            tracing::warn!(%err, "escalation engine shutdown reported an error");
        }
    }
}

/// Builds every component, runs reconcile-on-start, and spawns the
/// background tasks. Returns once the system is caught up and running.
pub async fn bootstrap(config: &Config) -> Result<Daemon, CoreError> {
    let clock = SystemClock;
    let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
    let bus: Arc<BroadcastEventBus> = Arc::new(BroadcastEventBus::new());
    let supervisor: Arc<FakeSupervisor> = Arc::new(FakeSupervisor::default());
    let host_memory: Arc<SysinfoHostMemory> = Arc::new(SysinfoHostMemory::new());
    let manifests: Arc<StaticManifestRegistry> =
        Arc::new(StaticManifestRegistry::new(config.manifests.clone()));
    let binaries: Arc<FakeBinaryProvisioner> = Arc::new(FakeBinaryProvisioner::default());
    let router: Arc<FakeRouterDriver> = Arc::new(FakeRouterDriver::new());
    let fallback_interfaces: Arc<StaticFallbackInterfaceResolver> = Arc::new(
        StaticFallbackInterfaceResolver::new(config.fallback_interfaces.clone()),
    );
    let dispatcher: Arc<bastion_alerts::FakeNotificationDispatcher> =
        Arc::new(bastion_alerts::FakeNotificationDispatcher::default());
    let quiet_hours: Arc<ThresholdQuietHours> =
        Arc::new(ThresholdQuietHours::new(config.quiet_hours_threshold));

    let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone(), clock.clone()));
    let escalation = Arc::new(EscalationEngine::new(
        store.clone(),
        bus.clone() as Arc<dyn bastion_core::EventBus>,
        dispatcher.clone(),
        clock.clone(),
    ));
    let alert_bridge = Arc::new(AlertBridge::new(
        store.clone(),
        bus.clone() as Arc<dyn bastion_core::EventBus>,
        dispatcher.clone(),
        quiet_hours.clone(),
        manifests.clone(),
        rate_limiter.clone(),
        escalation.clone(),
        clock.clone(),
    ));

    let instance_manager = Arc::new(InstanceManager::new(
        store.clone(),
        supervisor.clone(),
        host_memory.clone(),
        bus.clone() as Arc<dyn bastion_core::EventBus>,
        manifests.clone(),
        binaries.clone(),
        clock.clone(),
    ));

    let kill_switch_manager = Arc::new(KillSwitchManager::new(
        router.clone(),
        store.clone(),
        bus.clone() as Arc<dyn bastion_core::EventBus>,
        fallback_interfaces.clone(),
        clock.clone(),
    ));
    let kill_switch_listener = Arc::new(KillSwitchListener::new(
        kill_switch_manager.clone(),
        store.clone(),
    ));

    let (health_checker, restart_rx) = HealthChecker::new(
        store.clone(),
        bus.clone() as Arc<dyn bastion_core::EventBus>,
        Arc::new(TcpHealthProbe),
        RESTART_CHANNEL_CAPACITY,
    );
    let health_checker = Arc::new(health_checker);

    let cleanup_handler: Arc<DaemonCleanupHandler> = Arc::new(DaemonCleanupHandler::new(
        instance_manager.clone(),
        store.clone(),
    ));
    let cleanup_queue = Arc::new(CleanupQueue::new(
        cleanup_handler,
        clock,
        config.cleanup_queue_capacity,
    ));

    let router_id = config.router_id;

    info!(%router_id, "reconciling instance state against the supervisor");
    instance_manager
        .reconcile(router_id, CancellationToken::new())
        .await?;
    info!(%router_id, "reconciling kill-switch rules against the router");
    kill_switch_manager.reconcile(router_id).await?;
    info!("recovering in-flight alert escalations");
    escalation.recover_on_start().await?;

    let cancel = CancellationToken::new();
    let tasks = vec![
        tasks::spawn_event_loop(
            bus.clone() as Arc<dyn bastion_core::EventBus>,
            kill_switch_listener.clone(),
            alert_bridge.clone(),
            cancel.clone(),
        ),
        tasks::spawn_health_check_loop(
            health_checker,
            router_id,
            config.health_check_interval_seconds,
            cancel.clone(),
        ),
        tasks::spawn_restart_loop(
            instance_manager.clone(),
            restart_rx,
            config.health_timeout_seconds,
            cancel.clone(),
        ),
        tasks::spawn_rate_limiter_sweep(
            rate_limiter,
            config.rate_limit_sweep_interval_seconds,
            cancel.clone(),
        ),
        tasks::spawn_cleanup_tick(
            cleanup_queue,
            config.cleanup_tick_interval_seconds,
            cancel.clone(),
        ),
        tasks::spawn_kill_switch_reconcile(
            kill_switch_manager,
            router_id,
            config.kill_switch_reconcile_interval_seconds,
            cancel.clone(),
        ),
    ];

    Ok(Daemon { cancel, tasks, escalation })
}
