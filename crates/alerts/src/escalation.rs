// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-alert persistent escalation ladder: arm/fire/cancel/recover/shutdown.
//!
//! Dual-lock hierarchy per-alert: a top-level read-write lock over the
//! `alertId -> state` map, and a `parking_lot::Mutex` per entry for the
//! multi-step timer-stop/DB-write/pointer-swap update. The top-level write
//! lock is never taken while holding a per-state lock.

use bastion_core::{
    Alert, AlertEscalation, AlertId, AlertRuleId, Clock, CoreError, EscalationId, EscalationStatus,
    Event, EventBus, Notification, NotificationDispatcher, Store, TimerId,
};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub use bastion_core::EscalationConfig;

struct EscalationState {
    cancelled: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct EscalationEngine<C: Clock> {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    clock: C,
    states: Arc<RwLock<HashMap<AlertId, Arc<Mutex<EscalationState>>>>>,
}

impl<C: Clock + 'static> EscalationEngine<C> {
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        clock: C,
    ) -> Self {
        Self { store, bus, dispatcher, clock, states: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Validates `config`, persists a `PENDING` `AlertEscalation`, and arms
    /// the first-level timer.
    pub async fn arm(&self, alert: &Alert, rule_id: AlertRuleId, config: &EscalationConfig) -> Result<(), CoreError> {
        config.validate().map_err(CoreError::invalid_input)?;
        let next_at = self.clock.epoch_ms() + config.escalation_delay_seconds * 1000;
        let escalation = AlertEscalation {
            id: EscalationId::new(),
            alert_id: alert.id,
            rule_id,
            current_level: 0,
            max_level: config.max_escalations,
            status: EscalationStatus::Pending,
            next_escalation_at_epoch_ms: Some(next_at),
            resolved_at_epoch_ms: None,
            resolved_by: None,
        };
        self.store.upsert_escalation(escalation).await?;
        self.schedule_timer(alert.id, 1, config.escalation_delay_seconds);
        Ok(())
    }

    /// Acknowledge/resolve path. Idempotent: no in-memory state is a silent
    /// success.
    pub async fn cancel(&self, alert_id: AlertId, resolved_by: &str) -> Result<(), CoreError> {
        let state = self.states.write().remove(&alert_id);
        let Some(state) = state else { return Ok(()) };
        {
            let guard = state.lock();
            guard.cancelled.store(true, Ordering::SeqCst);
            if let Some(handle) = &guard.handle {
                handle.abort();
            }
        }
        self.force_resolve_row(alert_id, resolved_by).await?;
        Ok(())
    }

    /// Loads every `PENDING` escalation and re-arms or force-resolves it.
    /// Called once at startup.
    pub async fn recover_on_start(&self) -> Result<(), CoreError> {
        let pending = self.store.list_pending_escalations().await?;
        let now = self.clock.epoch_ms();
        for escalation in pending {
            let rule = self.store.get_alert_rule(escalation.rule_id).await?;
            let config = rule.and_then(|r| r.escalation).filter(|c| c.validate().is_ok());
            let Some(_config) = config else {
                self.force_resolve(escalation, "invalid escalation config").await;
                continue;
            };
            let next_level = escalation.current_level + 1;
            match escalation.next_escalation_at_epoch_ms {
                Some(next_at) if next_at <= now => self.schedule_timer(escalation.alert_id, next_level, 0),
                Some(next_at) => {
                    let remaining_ms = next_at - now;
                    self.schedule_timer(escalation.alert_id, next_level, remaining_ms.div_ceil(1000));
                }
                None => self.force_resolve(escalation, "missing next_escalation_at").await,
            }
        }
        Ok(())
    }

    /// Cancels every in-memory timer. Timers still sleeping are aborted
    /// outright; timers already executing their fire body get up to 10s,
    /// shared across all of them, to finish before this returns an error.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        let drained: Vec<_> = self.states.write().drain().map(|(_, s)| s).collect();
        let mut in_flight_handles = Vec::new();
        for state in drained {
            let mut guard = state.lock();
            guard.cancelled.store(true, Ordering::SeqCst);
            let still_sleeping = !guard.in_flight.load(Ordering::SeqCst);
            if let Some(handle) = guard.handle.take() {
                if still_sleeping {
                    handle.abort();
                } else {
                    in_flight_handles.push(handle);
                }
            }
        }
        let wait_all = async {
            for handle in in_flight_handles {
                let _ = handle.await;
            }
        };
        tokio::time::timeout(Duration::from_secs(10), wait_all).await.map_err(|_| {
            CoreError::ExternalFailure("escalation engine shutdown timed out waiting for in-flight timers".into())
        })
    }

    fn schedule_timer(&self, alert_id: AlertId, level: u32, delay_secs: u64) {
        debug!(timer_id = %TimerId::escalation(alert_id, level), delay_secs, "arming escalation timer");
        if let Some(previous) = self.states.write().remove(&alert_id) {
            let guard = previous.lock();
            guard.cancelled.store(true, Ordering::SeqCst);
            if let Some(handle) = &guard.handle {
                handle.abort();
            }
        }

        let cancelled = Arc::new(AtomicBool::new(false));
        let in_flight = Arc::new(AtomicBool::new(false));
        let cancelled_for_task = cancelled.clone();
        let in_flight_for_task = in_flight.clone();
        let engine = self.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(delay_secs)).await;
            if cancelled_for_task.load(Ordering::SeqCst) {
                return;
            }
            in_flight_for_task.store(true, Ordering::SeqCst);
            engine.on_fire(alert_id).await;
        });
        self.states.write().insert(alert_id, Arc::new(Mutex::new(EscalationState { cancelled, in_flight, handle: Some(handle) })));
    }

    async fn on_fire(&self, alert_id: AlertId) {
        let alert = match self.store.get_alert(alert_id).await {
            Ok(Some(alert)) => alert,
            Ok(None) => return,
            Err(err) => {
                warn!(%alert_id, %err, "could not load alert on escalation timer fire");
                return;
            }
        };
        if alert.acknowledged_at_epoch_ms.is_some() {
            let _ = self.cancel(alert_id, "acknowledged").await;
            return;
        }

        let escalation = match self.store.get_escalation_by_alert(alert_id).await {
            Ok(Some(escalation)) => escalation,
            _ => return,
        };
        let rule = match self.store.get_alert_rule(escalation.rule_id).await {
            Ok(Some(rule)) => rule,
            _ => return,
        };
        let Some(config) = rule.escalation.clone() else {
            self.force_resolve(escalation, "missing escalation config").await;
            return;
        };

        let new_level = escalation.current_level + 1;
        let mut channels = rule.channels.clone();
        for channel in &config.additional_channels {
            if !channels.contains(channel) {
                channels.push(channel.clone());
            }
        }

        let notification = Notification {
            channel_id: "default".to_string(),
            alert_id,
            title: format!("[ESCALATED L{new_level}] {}", alert.title),
            message: format!("This alert has escalated to level {new_level}.\n{}", alert.message),
            severity: alert.severity,
            event_type: rule.event_type.clone(),
            channels,
            data: HashMap::new(),
        };
        for result in self.dispatcher.dispatch(notification, CancellationToken::new()).await.iter().filter(|r| !r.success) {
            warn!(%alert_id, channel = %result.channel, error = ?result.error, "escalation notification failed on a channel, continuing");
        }

        let mut escalation = escalation;
        escalation.current_level = new_level;
        if new_level >= config.max_escalations {
            escalation.status = EscalationStatus::MaxReached;
            escalation.next_escalation_at_epoch_ms = None;
            if self.store.upsert_escalation(escalation).await.is_ok() {
                self.states.write().remove(&alert_id);
                self.bus.publish(Event::AlertEscalationMaxReached { alert_id });
            }
            return;
        }

        let next_delay = config.repeat_delay_for_level(new_level);
        escalation.next_escalation_at_epoch_ms = Some(self.clock.epoch_ms() + next_delay * 1000);
        if self.store.upsert_escalation(escalation).await.is_err() {
            return;
        }
        self.schedule_timer(alert_id, new_level + 1, next_delay);
        self.bus.publish(Event::AlertEscalated { alert_id, level: new_level });
    }

    async fn force_resolve(&self, mut escalation: AlertEscalation, reason: &str) {
        escalation.status = EscalationStatus::Resolved;
        escalation.resolved_at_epoch_ms = Some(self.clock.epoch_ms());
        escalation.resolved_by = Some(reason.to_string());
        escalation.next_escalation_at_epoch_ms = None;
        let alert_id = escalation.alert_id;
        if self.store.upsert_escalation(escalation).await.is_ok() {
            self.states.write().remove(&alert_id);
            self.bus.publish(Event::AlertEscalationCancelled { alert_id, resolved_by: reason.to_string() });
        }
    }

    async fn force_resolve_row(&self, alert_id: AlertId, resolved_by: &str) -> Result<(), CoreError> {
        if let Some(mut escalation) = self.store.get_escalation_by_alert(alert_id).await? {
            escalation.status = EscalationStatus::Resolved;
            escalation.resolved_at_epoch_ms = Some(self.clock.epoch_ms());
            escalation.resolved_by = Some(resolved_by.to_string());
            escalation.next_escalation_at_epoch_ms = None;
            self.store.upsert_escalation(escalation).await?;
        }
        self.bus.publish(Event::AlertEscalationCancelled { alert_id, resolved_by: resolved_by.to_string() });
        Ok(())
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
