// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted escalation ladder state for a fired alert.

use super::{AlertId, AlertRuleId};
use serde::{Deserialize, Serialize};

crate::define_id! {
    pub struct EscalationId("esc_");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EscalationStatus {
    Pending,
    Resolved,
    MaxReached,
}

crate::simple_display! {
    EscalationStatus {
        Pending => "PENDING",
        Resolved => "RESOLVED",
        MaxReached => "MAX_REACHED",
    }
}

/// Persisted row tracking one alert's escalation progress.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEscalation {
    pub id: EscalationId,
    pub alert_id: AlertId,
    pub rule_id: AlertRuleId,
    pub current_level: u32,
    pub max_level: u32,
    pub status: EscalationStatus,
    pub next_escalation_at_epoch_ms: Option<u64>,
    pub resolved_at_epoch_ms: Option<u64>,
    pub resolved_by: Option<String>,
}

impl AlertEscalation {
    /// Checks the escalation-state invariant: `Pending ⇒ level < max ∧
    /// next_time is set`; `MaxReached ⇒ level == max ∧ next_time is None`.
    pub fn invariant_holds(&self) -> bool {
        match self.status {
            EscalationStatus::Pending => {
                self.current_level < self.max_level && self.next_escalation_at_epoch_ms.is_some()
            }
            EscalationStatus::MaxReached => {
                self.current_level == self.max_level && self.next_escalation_at_epoch_ms.is_none()
            }
            EscalationStatus::Resolved => true,
        }
    }
}

crate::builder! {
    pub struct AlertEscalationBuilder => AlertEscalation {
        computed { id: EscalationId = EscalationId::new() }
        set { alert_id: AlertId = AlertId::new() }
        set { rule_id: AlertRuleId = AlertRuleId::new() }
        set { current_level: u32 = 0 }
        set { max_level: u32 = 3 }
        set { status: EscalationStatus = EscalationStatus::Pending }
        option { next_escalation_at_epoch_ms: u64 = None }
        option { resolved_at_epoch_ms: u64 = None }
        option { resolved_by: String = None }
    }
}

#[cfg(test)]
#[path = "escalation_tests.rs"]
mod tests;
