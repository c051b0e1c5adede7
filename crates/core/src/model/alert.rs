// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert rules and fired alert instances.

use super::InstanceId;
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct AlertRuleId("arl_");
}

crate::define_id! {
    pub struct AlertId("alt_");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertSeverity {
    Info,
    Warning,
    Critical,
}

crate::simple_display! {
    AlertSeverity {
        Info => "INFO",
        Warning => "WARNING",
        Critical => "CRITICAL",
    }
}

/// `escalationDelaySeconds` (first-level delay), `maxEscalations` (1..10),
/// additional channels merged in at escalation time, and the per-level
/// repeat cadence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationConfig {
    pub enabled: bool,
    pub require_ack: bool,
    pub escalation_delay_seconds: u64,
    pub max_escalations: u32,
    pub additional_channels: Vec<String>,
    pub repeat_interval_seconds: Vec<u64>,
}

impl EscalationConfig {
    /// `escalationDelaySeconds > 0`, `0 < maxEscalations ≤ 10`,
    /// `repeatIntervalSeconds` non-empty and all positive.
    pub fn validate(&self) -> Result<(), String> {
        if self.escalation_delay_seconds == 0 {
            return Err("escalationDelaySeconds must be positive".into());
        }
        if self.max_escalations == 0 || self.max_escalations > 10 {
            return Err("maxEscalations must be between 1 and 10".into());
        }
        if self.repeat_interval_seconds.is_empty() {
            return Err("repeatIntervalSeconds must not be empty".into());
        }
        if self.repeat_interval_seconds.iter().any(|&s| s == 0) {
            return Err("repeatIntervalSeconds entries must be positive".into());
        }
        Ok(())
    }

    /// Repeat delay for escalating to `new_level` (1-indexed). Reuses the
    /// last element once `new_level` exceeds the configured list length.
    pub fn repeat_delay_for_level(&self, new_level: u32) -> u64 {
        let idx = (new_level as usize).saturating_sub(1);
        self.repeat_interval_seconds
            .get(idx)
            .or_else(|| self.repeat_interval_seconds.last())
            .copied()
            .unwrap_or(0)
    }
}

/// A rule matching raw service events to severity, channels, and an optional
/// escalation ladder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertRule {
    pub id: AlertRuleId,
    pub event_type: String,
    pub severity: AlertSeverity,
    pub channels: Vec<String>,
    pub enabled: bool,
    pub escalation: Option<EscalationConfig>,
}

crate::builder! {
    pub struct AlertRuleBuilder => AlertRule {
        computed { id: AlertRuleId = AlertRuleId::new() }
        into { event_type: String = "service.crashed" }
        set { severity: AlertSeverity = AlertSeverity::Critical }
        set { channels: Vec<String> = vec!["inapp".to_string()] }
        set { enabled: bool = true }
        option { escalation: EscalationConfig = None }
    }
}

/// Fired instance of an [`AlertRule`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub rule_id: AlertRuleId,
    pub instance_id: InstanceId,
    pub title: String,
    pub message: String,
    pub severity: AlertSeverity,
    pub channels: Vec<String>,
    pub created_at_epoch_ms: u64,
    pub acknowledged_at_epoch_ms: Option<u64>,
}

crate::builder! {
    pub struct AlertBuilder => Alert {
        computed { id: AlertId = AlertId::new() }
        set { rule_id: AlertRuleId = AlertRuleId::new() }
        set { instance_id: InstanceId = InstanceId::new() }
        into { title: String = "alert" }
        into { message: String = "" }
        set { severity: AlertSeverity = AlertSeverity::Info }
        set { channels: Vec<String> = vec!["inapp".to_string()] }
        set { created_at_epoch_ms: u64 = 0 }
        option { acknowledged_at_epoch_ms: u64 = None }
    }
}

/// Per-instance, memory-only rate-limit window. Caches of this are rebuilt
/// from nothing on restart — it is the window arithmetic, not persisted
/// state.
#[derive(Debug, Clone, Copy, Default)]
pub struct RateLimitWindow {
    pub window_start_epoch_ms: u64,
    pub count: u32,
    pub suppressed_count: u32,
}

#[cfg(test)]
#[path = "alert_tests.rs"]
mod tests;
