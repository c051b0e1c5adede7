// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bastion_core::AlertId;
use std::collections::HashMap;

fn notification(severity: AlertSeverity) -> Notification {
    Notification {
        channel_id: "default".to_string(),
        alert_id: AlertId::new(),
        title: "t".to_string(),
        message: "m".to_string(),
        severity,
        event_type: "service.crashed".to_string(),
        channels: vec!["inapp".to_string()],
        data: HashMap::new(),
    }
}

#[tokio::test]
async fn queues_below_threshold_and_dispatches_at_or_above() {
    let quiet_hours = ThresholdQuietHours::new(AlertSeverity::Warning);
    assert!(quiet_hours.should_queue(AlertSeverity::Info).await);
    assert!(!quiet_hours.should_queue(AlertSeverity::Warning).await);
    assert!(!quiet_hours.should_queue(AlertSeverity::Critical).await);
}

#[tokio::test]
async fn enqueue_accumulates_in_order_and_drain_empties() {
    let quiet_hours = ThresholdQuietHours::new(AlertSeverity::Critical);
    quiet_hours.enqueue(notification(AlertSeverity::Info)).await.unwrap();
    quiet_hours.enqueue(notification(AlertSeverity::Warning)).await.unwrap();
    assert_eq!(quiet_hours.len(), 2);

    let drained = quiet_hours.drain();
    assert_eq!(drained.len(), 2);
    assert_eq!(drained[0].severity, AlertSeverity::Info);
    assert_eq!(drained[1].severity, AlertSeverity::Warning);
    assert!(quiet_hours.is_empty());
}

#[tokio::test]
async fn always_dispatch_never_queues() {
    let quiet_hours = ThresholdQuietHours::always_dispatch();
    assert!(!quiet_hours.should_queue(AlertSeverity::Info).await);
}
