// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert bridge: turns raw `service.*` events into fired alerts. Per event:
//! rate-limit, derive severity, defer to quiet hours if it says so, seed the
//! default rule set on an instance's first install, enrich, then forward to
//! the escalation engine.

use crate::escalation::EscalationEngine;
use crate::rate_limit::RateLimiter;
use bastion_core::{
    Alert, AlertId, AlertRule, AlertRuleId, AlertSeverity, Clock, CoreError, Event, EventBus,
    InstanceId, Notification, NotificationDispatcher, QuietHours, Store,
};
use bastion_instance::ManifestRegistry;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// `(eventType, severity)` synthesized into a default `AlertRule` the first
/// time any instance reaches `ServiceInstalled`. Channels default to
/// `["inapp"]` for every synthesized rule.
const DEFAULT_RULES: &[(&str, AlertSeverity)] = &[
    ("service.crashed", AlertSeverity::Critical),
    ("service.health_failing", AlertSeverity::Warning),
    ("service.resource_warning", AlertSeverity::Warning),
    ("service.restarted", AlertSeverity::Info),
    ("service.installed", AlertSeverity::Info),
    ("service.removed", AlertSeverity::Info),
    ("service.update_available", AlertSeverity::Info),
    ("service.kill_switch", AlertSeverity::Critical),
];

fn default_severity(event_type: &str) -> Option<AlertSeverity> {
    DEFAULT_RULES.iter().find(|(t, _)| *t == event_type).map(|(_, s)| *s)
}

fn event_type_str(event: &Event) -> Option<&'static str> {
    match event {
        Event::ServiceCrashed { .. } => Some("service.crashed"),
        Event::ServiceHealthFailing { .. } => Some("service.health_failing"),
        Event::ServiceResourceWarning { .. } => Some("service.resource_warning"),
        Event::ServiceRestarted { .. } => Some("service.restarted"),
        Event::ServiceInstalled { .. } => Some("service.installed"),
        Event::ServiceRemoved { .. } => Some("service.removed"),
        Event::ServiceUpdateAvailable { .. } => Some("service.update_available"),
        Event::ServiceKillSwitch { .. } => Some("service.kill_switch"),
        _ => None,
    }
}

fn instance_id_of(event: &Event) -> Option<InstanceId> {
    match event {
        Event::ServiceCrashed { instance_id, .. }
        | Event::ServiceHealthFailing { instance_id, .. }
        | Event::ServiceResourceWarning { instance_id, .. }
        | Event::ServiceRestarted { instance_id }
        | Event::ServiceInstalled { instance_id }
        | Event::ServiceRemoved { instance_id }
        | Event::ServiceUpdateAvailable { instance_id, .. }
        | Event::ServiceKillSwitch { instance_id, .. } => Some(*instance_id),
        _ => None,
    }
}

fn describe(event: &Event) -> (String, String) {
    match event {
        Event::ServiceCrashed { instance_id, reason } => {
            ("Service crashed".to_string(), format!("Instance {instance_id} crashed: {reason}"))
        }
        Event::ServiceHealthFailing { instance_id, reason } => (
            "Health check failing".to_string(),
            format!("Instance {instance_id} is failing health checks: {reason}"),
        ),
        Event::ServiceResourceWarning { instance_id, message } => {
            ("Resource warning".to_string(), format!("Instance {instance_id}: {message}"))
        }
        Event::ServiceRestarted { instance_id } => {
            ("Service restarted".to_string(), format!("Instance {instance_id} restarted"))
        }
        Event::ServiceInstalled { instance_id } => {
            ("Service installed".to_string(), format!("Instance {instance_id} installed"))
        }
        Event::ServiceRemoved { instance_id } => {
            ("Service removed".to_string(), format!("Instance {instance_id} removed"))
        }
        Event::ServiceUpdateAvailable { instance_id, version } => (
            "Update available".to_string(),
            format!("Instance {instance_id} has update {version} available"),
        ),
        Event::ServiceKillSwitch { instance_id, device_mac, active } => (
            "Kill switch".to_string(),
            format!(
                "Instance {instance_id} kill switch for {device_mac} is now {}",
                if *active { "active" } else { "inactive" }
            ),
        ),
        _ => ("Service event".to_string(), String::new()),
    }
}

pub struct AlertBridge<C: Clock + 'static> {
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    dispatcher: Arc<dyn NotificationDispatcher>,
    quiet_hours: Arc<dyn QuietHours>,
    manifests: Arc<dyn ManifestRegistry>,
    rate_limiter: Arc<RateLimiter<C>>,
    escalation: Arc<EscalationEngine<C>>,
    clock: C,
    seeded: RwLock<HashSet<InstanceId>>,
}

impl<C: Clock + 'static> AlertBridge<C> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        dispatcher: Arc<dyn NotificationDispatcher>,
        quiet_hours: Arc<dyn QuietHours>,
        manifests: Arc<dyn ManifestRegistry>,
        rate_limiter: Arc<RateLimiter<C>>,
        escalation: Arc<EscalationEngine<C>>,
        clock: C,
    ) -> Self {
        Self { store, bus, dispatcher, quiet_hours, manifests, rate_limiter, escalation, clock, seeded: RwLock::new(HashSet::new()) }
    }

    /// Returns `Err` only for a failure forwarding the alert to the store;
    /// rate-limit, quiet-hours, and enrich failures are absorbed and logged.
    pub async fn handle_event(&self, event: Event) -> Result<(), CoreError> {
        let Some(event_type) = event_type_str(&event) else { return Ok(()) };
        let Some(instance_id) = instance_id_of(&event) else { return Ok(()) };

        let decision = self.rate_limiter.should_allow(instance_id);
        if !decision.allowed {
            warn!(%instance_id, event_type, suppressed_count = decision.suppressed_count, reason = %decision.reason, "alert suppressed by rate limiter");
            return Ok(());
        }

        let severity = default_severity(event_type).unwrap_or(AlertSeverity::Info);
        if self.quiet_hours.should_queue(severity).await {
            let (title, message) = describe(&event);
            let shell = Notification {
                channel_id: "default".to_string(),
                alert_id: bastion_core::AlertId::new(),
                title,
                message,
                severity,
                event_type: event_type.to_string(),
                channels: vec!["inapp".to_string()],
                data: HashMap::new(),
            };
            if let Err(err) = self.quiet_hours.enqueue(shell).await {
                warn!(%instance_id, event_type, %err, "quiet-hours enqueue failed, dropping notification");
            }
            return Ok(());
        }

        if matches!(event, Event::ServiceInstalled { .. }) {
            self.seed_default_rules_once(instance_id).await;
        }

        let rule = match self.store.get_alert_rule_by_event_type(event_type).await {
            Ok(Some(rule)) => rule,
            Ok(None) => return Ok(()),
            Err(err) => {
                warn!(event_type, %err, "failed to look up alert rule, dropping event");
                return Ok(());
            }
        };
        if !rule.enabled {
            return Ok(());
        }

        self.forward(instance_id, event_type, &event, rule).await
    }

    async fn forward(&self, instance_id: InstanceId, event_type: &str, event: &Event, rule: AlertRule) -> Result<(), CoreError> {
        let (title, message) = describe(event);
        let alert = Alert {
            id: AlertId::new(),
            rule_id: rule.id,
            instance_id,
            title,
            message,
            severity: rule.severity,
            channels: rule.channels.clone(),
            created_at_epoch_ms: self.clock.epoch_ms(),
            acknowledged_at_epoch_ms: None,
        };

        if let Err(err) = self.store.upsert_alert(alert.clone()).await {
            self.bus.publish(Event::StorageUnavailable { path: "alerts".to_string(), instance_id: Some(instance_id) });
            return Err(err);
        }

        let data = self.enrich(instance_id).await;
        let notification = Notification {
            channel_id: "default".to_string(),
            alert_id: alert.id,
            title: alert.title.clone(),
            message: alert.message.clone(),
            severity: alert.severity,
            event_type: event_type.to_string(),
            channels: alert.channels.clone(),
            data,
        };
        for result in self.dispatcher.dispatch(notification, CancellationToken::new()).await.into_iter().filter(|r| !r.success) {
            warn!(alert_id = %alert.id, channel = %result.channel, error = ?result.error, "initial alert dispatch failed on a channel");
        }

        if let Some(config) = rule.escalation.filter(|c| c.enabled) {
            if let Err(err) = self.escalation.arm(&alert, rule.id, &config).await {
                warn!(alert_id = %alert.id, %err, "failed to arm escalation for fired alert");
            }
        }

        Ok(())
    }

    /// Looks up the instance's feature manifest for extra notification
    /// context; falls back to an empty map (the raw event stands alone) if
    /// either lookup misses.
    async fn enrich(&self, instance_id: InstanceId) -> HashMap<String, String> {
        let Ok(Some(instance)) = self.store.get_instance(instance_id).await else {
            return HashMap::new();
        };
        let Some(manifest) = self.manifests.get(&instance.feature_id) else {
            return HashMap::new();
        };
        HashMap::from([
            ("featureId".to_string(), manifest.feature_id.clone()),
            ("healthProbeKind".to_string(), manifest.health_probe.kind.clone()),
            ("memoryRequiredMb".to_string(), manifest.memory_required_mb.to_string()),
        ])
    }

    /// Per-instance fast-path gate over the (rule-level-idempotent) seeding
    /// below: a repeated `ServiceInstalled` for the same instance should not
    /// re-check every default rule against the store.
    async fn seed_default_rules_once(&self, instance_id: InstanceId) {
        if self.seeded.read().contains(&instance_id) {
            return;
        }
        for (event_type, severity) in DEFAULT_RULES {
            match self.store.get_alert_rule_by_event_type(event_type).await {
                Ok(Some(_)) => continue,
                Ok(None) => {
                    let rule = AlertRule {
                        id: AlertRuleId::new(),
                        event_type: event_type.to_string(),
                        severity: *severity,
                        channels: vec!["inapp".to_string()],
                        enabled: true,
                        escalation: None,
                    };
                    if let Err(err) = self.store.upsert_alert_rule(rule).await {
                        warn!(event_type, %err, "failed to seed default alert rule");
                    }
                }
                Err(err) => warn!(event_type, %err, "failed to check existing alert rule before seeding"),
            }
        }
        self.seeded.write().insert(instance_id);
    }
}

#[cfg(test)]
#[path = "bridge_tests.rs"]
mod tests;
