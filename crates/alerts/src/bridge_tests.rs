// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::fakes::{FakeEventBus, FakeNotificationDispatcher};
use crate::{RateLimitConfig, RateLimiter, ThresholdQuietHours};
use bastion_core::{
    AlertRuleBuilder, AlertSeverity, Event, EscalationConfig, FakeClock, FeatureManifest,
    HealthProbeDescriptor, RouterId, ServiceInstanceBuilder,
};
use bastion_instance::StaticManifestRegistry;
use bastion_store::MemoryStore;
use std::net::IpAddr;

fn manifest(feature_id: &str) -> FeatureManifest {
    FeatureManifest {
        feature_id: feature_id.to_string(),
        required_ports: 1,
        memory_required_mb: 32,
        requires_vlan: false,
        requires_vif_bridge: false,
        socks_port_offset: None,
        health_probe: HealthProbeDescriptor { kind: "tcp".to_string(), interval_seconds: 30 },
        dependencies: Vec::new(),
    }
}

fn harness(
    quiet_threshold: AlertSeverity,
    max_alerts: i64,
    manifests: Vec<FeatureManifest>,
) -> (AlertBridge<FakeClock>, Arc<MemoryStore>, Arc<FakeNotificationDispatcher>, Arc<ThresholdQuietHours>) {
    let store = Arc::new(MemoryStore::new());
    let bus: Arc<dyn EventBus> = Arc::new(FakeEventBus::default());
    let dispatcher = Arc::new(FakeNotificationDispatcher::default());
    let quiet_hours = Arc::new(ThresholdQuietHours::new(quiet_threshold));
    let registry: Arc<dyn ManifestRegistry> = Arc::new(StaticManifestRegistry::new(manifests));
    let clock = FakeClock::new();
    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig { max_alerts, window_seconds: 60 }, clock.clone()));
    let escalation = Arc::new(EscalationEngine::new(store.clone(), bus.clone(), dispatcher.clone(), clock.clone()));

    let bridge = AlertBridge::new(store.clone(), bus, dispatcher.clone(), quiet_hours.clone(), registry, rate_limiter, escalation, clock);
    (bridge, store, dispatcher, quiet_hours)
}

fn seed_rule(event_type: &str, enabled: bool, escalation: Option<EscalationConfig>) -> AlertRuleBuilder {
    let mut builder = AlertRuleBuilder::default().event_type(event_type).enabled(enabled).channels(vec!["inapp".to_string()]);
    if let Some(config) = escalation {
        builder = builder.escalation(config);
    }
    builder
}

#[tokio::test]
async fn event_type_not_consumed_by_the_bridge_is_ignored() {
    let (bridge, _store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, Vec::new());
    let instance_id = InstanceId::new();

    bridge
        .handle_event(Event::ServiceStateChanged { instance_id, previous: "running".to_string(), current: "stopped".to_string() })
        .await
        .unwrap();

    assert_eq!(dispatcher.dispatch_count(), 0);
}

#[tokio::test]
async fn rate_limited_events_beyond_max_are_dropped() {
    let (bridge, store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 1, Vec::new());
    let instance_id = InstanceId::new();
    store.upsert_alert_rule(seed_rule("service.crashed", true, None).build()).await.unwrap();

    bridge.handle_event(Event::ServiceCrashed { instance_id, reason: "oom".to_string() }).await.unwrap();
    bridge.handle_event(Event::ServiceCrashed { instance_id, reason: "oom again".to_string() }).await.unwrap();

    assert_eq!(dispatcher.dispatch_count(), 1);
}

#[tokio::test]
async fn quiet_hours_defers_instead_of_dispatching() {
    let (bridge, store, dispatcher, quiet_hours) = harness(AlertSeverity::Warning, 10, Vec::new());
    let instance_id = InstanceId::new();
    store.upsert_alert_rule(seed_rule("service.installed", true, None).build()).await.unwrap();

    bridge.handle_event(Event::ServiceInstalled { instance_id }).await.unwrap();

    assert_eq!(dispatcher.dispatch_count(), 0);
    assert_eq!(quiet_hours.len(), 1);
    // Deferred to the quiet-hours queue before rule lookup, so default rules
    // never get a chance to seed.
    assert!(store.get_alert_rule_by_event_type("service.crashed").await.unwrap().is_none());
}

#[tokio::test]
async fn first_service_installed_seeds_default_rules_and_fires() {
    let (bridge, store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, Vec::new());
    let instance_id = InstanceId::new();

    bridge.handle_event(Event::ServiceInstalled { instance_id }).await.unwrap();

    let seeded = store.get_alert_rule_by_event_type("service.crashed").await.unwrap().unwrap();
    assert_eq!(seeded.severity, AlertSeverity::Critical);
    assert!(seeded.enabled);
    assert_eq!(dispatcher.dispatch_count(), 1);
}

#[tokio::test]
async fn seeding_is_idempotent_across_instances() {
    let (bridge, store, _dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, Vec::new());

    bridge.handle_event(Event::ServiceInstalled { instance_id: InstanceId::new() }).await.unwrap();
    let first = store.get_alert_rule_by_event_type("service.crashed").await.unwrap().unwrap();

    bridge.handle_event(Event::ServiceInstalled { instance_id: InstanceId::new() }).await.unwrap();
    let second = store.get_alert_rule_by_event_type("service.crashed").await.unwrap().unwrap();

    assert_eq!(first.id, second.id);
}

#[tokio::test]
async fn disabled_rule_is_not_forwarded() {
    let (bridge, store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, Vec::new());
    let instance_id = InstanceId::new();
    store.upsert_alert_rule(seed_rule("service.restarted", false, None).build()).await.unwrap();

    bridge.handle_event(Event::ServiceRestarted { instance_id }).await.unwrap();

    assert_eq!(dispatcher.dispatch_count(), 0);
}

#[tokio::test]
async fn rule_with_escalation_enabled_arms_the_ladder() {
    let (bridge, store, _dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, Vec::new());
    let instance_id = InstanceId::new();
    let config = EscalationConfig {
        enabled: true,
        require_ack: false,
        escalation_delay_seconds: 3600,
        max_escalations: 3,
        additional_channels: Vec::new(),
        repeat_interval_seconds: vec![3600],
    };
    store.upsert_alert_rule(seed_rule("service.crashed", true, Some(config)).build()).await.unwrap();

    bridge.handle_event(Event::ServiceCrashed { instance_id, reason: "oom".to_string() }).await.unwrap();

    assert_eq!(store.list_pending_escalations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn enrich_adds_manifest_fields_when_instance_and_manifest_are_known() {
    let (bridge, store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, vec![manifest("relay")]);
    store.upsert_alert_rule(seed_rule("service.crashed", true, None).build()).await.unwrap();
    let instance = ServiceInstanceBuilder::default()
        .router_id(RouterId::new())
        .feature_id("relay")
        .bind_ip(IpAddr::from([10, 0, 0, 2]))
        .build();
    let instance_id = instance.id;
    store.upsert_instance(instance, tokio_util::sync::CancellationToken::new()).await.unwrap();

    bridge.handle_event(Event::ServiceCrashed { instance_id, reason: "oom".to_string() }).await.unwrap();

    let dispatched = dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert_eq!(dispatched[0].data.get("featureId").map(String::as_str), Some("relay"));
    assert_eq!(dispatched[0].data.get("healthProbeKind").map(String::as_str), Some("tcp"));
}

#[tokio::test]
async fn enrich_falls_back_to_empty_when_instance_unknown() {
    let (bridge, store, dispatcher, _quiet_hours) = harness(AlertSeverity::Info, 10, vec![manifest("relay")]);
    let instance_id = InstanceId::new();
    store.upsert_alert_rule(seed_rule("service.crashed", true, None).build()).await.unwrap();

    bridge.handle_event(Event::ServiceCrashed { instance_id, reason: "oom".to_string() }).await.unwrap();

    let dispatched = dispatcher.dispatched();
    assert_eq!(dispatched.len(), 1);
    assert!(dispatched[0].data.is_empty());
}
