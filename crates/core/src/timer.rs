// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Timer identifier type for tracking scheduled timers: escalation fires,
//! health probes, and the background sweep/tick loops.
//!
//! Unlike the fixed-width `prefix + nanoid` entity IDs in [`crate::id`],
//! timer IDs are composite strings built from another entity's id plus a
//! kind tag, so they don't fit `IdBuf`'s 23-byte inline buffer — `TimerId`
//! wraps an owned `String` instead.

use crate::model::AlertId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimerId(String);

impl TimerId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn escalation(alert_id: AlertId, level: u32) -> Self {
        TimerKind::Escalation { alert_id, level }.to_timer_id()
    }

    pub fn health_probe(instance_id: &str) -> Self {
        TimerKind::HealthProbe { instance_id: instance_id.to_string() }.to_timer_id()
    }

    pub fn rate_limit_sweep() -> Self {
        TimerKind::RateLimitSweep.to_timer_id()
    }

    pub fn cleanup_tick() -> Self {
        TimerKind::CleanupTick.to_timer_id()
    }

    pub fn kill_switch_reconcile() -> Self {
        TimerKind::KillSwitchReconcile.to_timer_id()
    }

    /// Parse this timer ID into a typed `TimerKind`.
    pub fn kind(&self) -> Option<TimerKind> {
        TimerKind::parse(&self.0)
    }

    /// Extract the alert this timer escalates, if it is an escalation timer.
    pub fn alert_id(&self) -> Option<AlertId> {
        match self.kind()? {
            TimerKind::Escalation { alert_id, .. } => Some(alert_id),
            _ => None,
        }
    }
}

impl std::fmt::Display for TimerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parsed representation of a timer ID for type-safe routing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerKind {
    Escalation { alert_id: AlertId, level: u32 },
    HealthProbe { instance_id: String },
    RateLimitSweep,
    CleanupTick,
    KillSwitchReconcile,
}

impl TimerKind {
    pub fn parse(id: &str) -> Option<TimerKind> {
        if let Some(rest) = id.strip_prefix("escalation:") {
            let (alert, level_str) = rest.rsplit_once(':')?;
            let level = level_str.parse().ok()?;
            return Some(TimerKind::Escalation { alert_id: AlertId::from_string(alert), level });
        }
        if let Some(rest) = id.strip_prefix("health-probe:") {
            return Some(TimerKind::HealthProbe { instance_id: rest.to_string() });
        }
        match id {
            "rate-limit-sweep" => Some(TimerKind::RateLimitSweep),
            "cleanup-tick" => Some(TimerKind::CleanupTick),
            "killswitch-reconcile" => Some(TimerKind::KillSwitchReconcile),
            _ => None,
        }
    }

    pub fn to_timer_id(&self) -> TimerId {
        match self {
            TimerKind::Escalation { alert_id, level } => {
                TimerId(format!("escalation:{alert_id}:{level}"))
            }
            TimerKind::HealthProbe { instance_id } => {
                TimerId(format!("health-probe:{instance_id}"))
            }
            TimerKind::RateLimitSweep => TimerId("rate-limit-sweep".to_string()),
            TimerKind::CleanupTick => TimerId("cleanup-tick".to_string()),
            TimerKind::KillSwitchReconcile => TimerId("killswitch-reconcile".to_string()),
        }
    }
}

#[cfg(test)]
#[path = "timer_tests.rs"]
mod tests;
