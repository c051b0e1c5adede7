// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::model::InstanceId;

#[test]
fn serializes_with_tagged_type_field() {
    let event = Event::ServiceCrashed { instance_id: InstanceId::new(), reason: "oom".into() };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "service.crashed");
    assert_eq!(value["reason"], "oom");
}

#[test]
fn unknown_type_tag_deserializes_to_custom() {
    let value = serde_json::json!({"type": "something.unrecognized"});
    let event: Event = serde_json::from_value(value).unwrap();
    assert_eq!(event, Event::Custom);
}

#[test]
fn name_matches_serde_rename() {
    let event = Event::AlertEscalated { alert_id: AlertId::new(), level: 2 };
    assert_eq!(event.name(), "alert.escalated");
}

#[test]
fn bridge_source_excludes_health_and_alert_events() {
    let crashed = Event::ServiceRestarted { instance_id: InstanceId::new() };
    assert!(crashed.is_bridge_source());
    let health = Event::ServiceHealth { instance_id: InstanceId::new(), status: HealthStatus::Healthy };
    assert!(!health.is_bridge_source());
}

#[test]
fn instance_id_extracted_when_present() {
    let id = InstanceId::new();
    let event = Event::ServiceInstalled { instance_id: id };
    assert_eq!(event.instance_id(), Some(id));
    assert_eq!(Event::Custom.instance_id(), None);
}
