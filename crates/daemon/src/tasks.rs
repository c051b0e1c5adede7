// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background loops: each is a `tokio::spawn`ed task selecting on a
//! `tokio::time::interval` tick against a `CancellationToken`, in the style
//! of the teacher's interval-driven collectors.

use bastion_alerts::{AlertBridge, RateLimiter};
use bastion_core::{Clock, Event, EventBus, InstanceId, RouterId};
use bastion_instance::{CleanupQueue, HealthChecker, InstanceManager};
use bastion_killswitch::KillSwitchListener;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Dispatches every published event to the kill-switch listener and the
/// alert bridge. Both are tolerant of events they don't care about, so this
/// loop fans every event out to both unconditionally.
pub fn spawn_event_loop<C: Clock + 'static>(
    bus: Arc<dyn EventBus>,
    killswitch_listener: Arc<KillSwitchListener<C>>,
    alert_bridge: Arc<AlertBridge<C>>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let mut receiver = bus.subscribe();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                event = receiver.recv() => {
                    match event {
                        Ok(Event::HealthChanged { instance_id, previous, current }) => {
                            killswitch_listener.on_health_changed(instance_id, previous, current).await;
                        }
                        Ok(event) => {
                            if let Err(err) = alert_bridge.handle_event(event).await {
                                warn!(%err, "alert bridge failed to forward an event");
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event loop lagged behind the bus, events were dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

pub fn spawn_health_check_loop(
    checker: Arc<HealthChecker>,
    router_id: RouterId,
    interval_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = checker.tick(router_id).await {
                        warn!(%err, "health check tick failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

/// Drains health-triggered restart requests and asks the instance manager to
/// restart them. Best-effort: a failed restart is logged, not retried here.
pub fn spawn_restart_loop<C: Clock + 'static>(
    manager: Arc<InstanceManager<C>>,
    mut restart_rx: mpsc::Receiver<InstanceId>,
    health_timeout_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                instance_id = restart_rx.recv() => {
                    let Some(instance_id) = instance_id else { break };
                    if let Err(err) = manager.restart(instance_id, health_timeout_seconds, CancellationToken::new()).await {
                        warn!(%instance_id, %err, "health-triggered restart failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}

pub fn spawn_rate_limiter_sweep<C: Clock + 'static>(
    rate_limiter: Arc<RateLimiter<C>>,
    interval_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            tokio::select! {
                _ = ticker.tick() => rate_limiter.sweep(),
                _ = cancel.cancelled() => break,
            }
        }
    })
}

pub fn spawn_cleanup_tick<C: Clock + 'static>(
    queue: Arc<CleanupQueue<C>>,
    interval_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            tokio::select! {
                _ = ticker.tick() => queue.tick().await,
                _ = cancel.cancelled() => break,
            }
        }
    })
}

pub fn spawn_kill_switch_reconcile<C: Clock + 'static>(
    manager: Arc<bastion_killswitch::KillSwitchManager<C>>,
    router_id: RouterId,
    interval_seconds: u64,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = manager.reconcile(router_id).await {
                        warn!(%err, "periodic kill-switch reconcile failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    })
}
