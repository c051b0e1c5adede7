// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Kill-switch coordinator: per-`DeviceRouting` firewall rule lifecycle
//! (Enable/Disable/Activate/Deactivate), instance-granularity batch helpers,
//! and router-state reconciliation.

use crate::resolver::FallbackInterfaceResolver;
use bastion_core::{
    Clock, CoreError, DeviceRouting, DeviceRoutingId, Event, EventBus, InstanceId, KillSwitchMode,
    RouterAction, RouterCommand, RouterCommandResult, RouterDriver, RouterId, RouterQuery, Store,
};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const FILTER_PATH: &str = "/ip/firewall/filter";
const MANGLE_PATH: &str = "/ip/firewall/mangle";

fn comment_tag(routing_id: DeviceRoutingId) -> String {
    format!("nnc-killswitch-{routing_id}")
}

fn rule_path(mode: KillSwitchMode) -> &'static str {
    match mode {
        KillSwitchMode::BlockAll | KillSwitchMode::AllowDirect => FILTER_PATH,
        KillSwitchMode::FallbackService => MANGLE_PATH,
    }
}

fn require_success(result: RouterCommandResult) -> Result<RouterCommandResult, CoreError> {
    if result.success {
        Ok(result)
    } else {
        Err(CoreError::ExternalFailure(
            result.error.unwrap_or_else(|| "router command failed".into()),
        ))
    }
}

/// Outcome of a batch Suspend/Resume: the count that succeeded before the
/// first failure, plus that failure if the batch didn't complete.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub succeeded: u32,
    pub error: Option<CoreError>,
}

#[derive(Debug, Default)]
pub struct ReconcileOutcome {
    pub removed: u32,
    pub recreated: u32,
    pub flipped: u32,
}

pub struct KillSwitchManager<C: Clock> {
    router: Arc<dyn RouterDriver>,
    store: Arc<dyn Store>,
    bus: Arc<dyn EventBus>,
    fallback_interfaces: Arc<dyn FallbackInterfaceResolver>,
    clock: C,
}

impl<C: Clock> KillSwitchManager<C> {
    pub fn new(
        router: Arc<dyn RouterDriver>,
        store: Arc<dyn Store>,
        bus: Arc<dyn EventBus>,
        fallback_interfaces: Arc<dyn FallbackInterfaceResolver>,
        clock: C,
    ) -> Self {
        Self { router, store, bus, fallback_interfaces, clock }
    }

    fn build_rule_args(&self, routing: &DeviceRouting, mode: KillSwitchMode) -> Result<HashMap<String, String>, CoreError> {
        let mut args = HashMap::new();
        args.insert("comment".to_string(), comment_tag(routing.id));
        args.insert("disabled".to_string(), "yes".to_string());
        match mode {
            KillSwitchMode::BlockAll => {
                args.insert("chain".into(), "forward".into());
                args.insert("src-mac-address".into(), routing.device_mac.clone());
                args.insert("action".into(), "drop".into());
                args.insert("place-before".into(), "0".into());
            }
            KillSwitchMode::AllowDirect => {
                args.insert("chain".into(), "forward".into());
                args.insert("src-mac-address".into(), routing.device_mac.clone());
                args.insert("action".into(), "accept".into());
                args.insert("place-before".into(), "0".into());
            }
            KillSwitchMode::FallbackService => {
                let interface_id = routing
                    .kill_switch_fallback_interface_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or_else(|| CoreError::InvalidInput("fallbackService requires a fallback interface id".into()))?;
                let mark = self.fallback_interfaces.routing_mark(interface_id).ok_or_else(|| {
                    CoreError::InvalidInput(format!("fallback interface {interface_id} has no routing mark"))
                })?;
                args.insert("chain".into(), "prerouting".into());
                args.insert("action".into(), "mark-routing".into());
                args.insert("new-routing-mark".into(), mark);
                args.insert("passthrough".into(), "yes".into());
            }
        }
        Ok(args)
    }

    async fn get_routing(&self, routing_id: DeviceRoutingId) -> Result<DeviceRouting, CoreError> {
        self.store
            .get_device_routing(routing_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("device routing {routing_id} not found")))
    }

    pub async fn enable(
        &self,
        routing_id: DeviceRoutingId,
        mode: KillSwitchMode,
        fallback_interface_id: Option<String>,
    ) -> Result<(), CoreError> {
        let mut routing = self.get_routing(routing_id).await?;
        if routing.kill_switch_enabled {
            return Err(CoreError::InvalidState(format!("kill switch already enabled for {routing_id}")));
        }
        routing.kill_switch_fallback_interface_id = fallback_interface_id;

        let args = self.build_rule_args(&routing, mode)?;
        let command = RouterCommand { path: rule_path(mode).to_string(), action: RouterAction::Add, id: None, args };
        let result = require_success(self.router.execute_command(command, CancellationToken::new()).await?)?;
        let rule_id = result.id.ok_or_else(|| CoreError::ExternalFailure("router did not return a rule id".into()))?;

        routing.kill_switch_enabled = true;
        routing.kill_switch_mode = Some(mode);
        routing.kill_switch_rule_id = Some(rule_id.clone());

        if let Err(err) = self.store.upsert_device_routing(routing).await {
            let remove = RouterCommand {
                path: rule_path(mode).to_string(),
                action: RouterAction::Remove,
                id: Some(rule_id),
                args: HashMap::new(),
            };
            let _ = self.router.execute_command(remove, CancellationToken::new()).await;
            return Err(err);
        }

        self.bus.publish(Event::KillSwitchEnabled { routing_id, mode });
        Ok(())
    }

    pub async fn disable(&self, routing_id: DeviceRoutingId) -> Result<(), CoreError> {
        let mut routing = self.get_routing(routing_id).await?;
        if let (Some(mode), Some(rule_id)) = (routing.kill_switch_mode, routing.kill_switch_rule_id.clone()) {
            let remove = RouterCommand { path: rule_path(mode).to_string(), action: RouterAction::Remove, id: Some(rule_id), args: HashMap::new() };
            require_success(self.router.execute_command(remove, CancellationToken::new()).await?)?;
        }

        routing.kill_switch_enabled = false;
        routing.kill_switch_mode = None;
        routing.kill_switch_rule_id = None;
        routing.kill_switch_active = false;
        routing.kill_switch_activated_at_epoch_ms = None;
        routing.kill_switch_fallback_interface_id = None;
        self.store.upsert_device_routing(routing).await?;

        self.bus.publish(Event::KillSwitchDisabled { routing_id });
        Ok(())
    }

    pub async fn activate(&self, routing_id: DeviceRoutingId) -> Result<(), CoreError> {
        let mut routing = self.get_routing(routing_id).await?;
        if routing.kill_switch_active {
            return Ok(());
        }
        let mode = routing.kill_switch_mode.ok_or_else(|| CoreError::InvalidState("kill switch not enabled".into()))?;
        let rule_id = routing
            .kill_switch_rule_id
            .clone()
            .ok_or_else(|| CoreError::InvalidState("kill switch enabled but has no rule id".into()))?;

        let set_enabled = RouterCommand {
            path: rule_path(mode).to_string(),
            action: RouterAction::Set,
            id: Some(rule_id.clone()),
            args: HashMap::from([("disabled".to_string(), "no".to_string())]),
        };
        require_success(self.router.execute_command(set_enabled, CancellationToken::new()).await?)?;

        routing.kill_switch_active = true;
        routing.kill_switch_activated_at_epoch_ms = Some(self.clock.epoch_ms());

        if let Err(err) = self.store.upsert_device_routing(routing.clone()).await {
            let revert = RouterCommand {
                path: rule_path(mode).to_string(),
                action: RouterAction::Set,
                id: Some(rule_id),
                args: HashMap::from([("disabled".to_string(), "yes".to_string())]),
            };
            let _ = self.router.execute_command(revert, CancellationToken::new()).await;
            return Err(err);
        }

        self.bus.publish(Event::KillSwitchActivated {
            routing_id,
            instance_id: routing.instance_id,
            device_mac: routing.device_mac.clone(),
            mode,
            reason: "activated".into(),
        });
        self.bus.publish(Event::ServiceKillSwitch {
            instance_id: routing.instance_id,
            device_mac: routing.device_mac,
            active: true,
        });
        Ok(())
    }

    pub async fn deactivate(&self, routing_id: DeviceRoutingId) -> Result<(), CoreError> {
        let mut routing = self.get_routing(routing_id).await?;
        if !routing.kill_switch_active {
            return Ok(());
        }
        let mode = routing.kill_switch_mode.ok_or_else(|| CoreError::InvalidState("kill switch not enabled".into()))?;
        let rule_id = routing
            .kill_switch_rule_id
            .clone()
            .ok_or_else(|| CoreError::InvalidState("kill switch enabled but has no rule id".into()))?;

        let set_disabled = RouterCommand {
            path: rule_path(mode).to_string(),
            action: RouterAction::Set,
            id: Some(rule_id.clone()),
            args: HashMap::from([("disabled".to_string(), "yes".to_string())]),
        };
        require_success(self.router.execute_command(set_disabled, CancellationToken::new()).await?)?;

        let activated_at = routing.kill_switch_activated_at_epoch_ms.unwrap_or(self.clock.epoch_ms());
        let now = self.clock.epoch_ms();
        let active_duration_seconds = now.saturating_sub(activated_at) / 1000;

        routing.kill_switch_active = false;
        routing.kill_switch_activated_at_epoch_ms = None;

        if let Err(err) = self.store.upsert_device_routing(routing.clone()).await {
            let revert = RouterCommand {
                path: rule_path(mode).to_string(),
                action: RouterAction::Set,
                id: Some(rule_id),
                args: HashMap::from([("disabled".to_string(), "no".to_string())]),
            };
            let _ = self.router.execute_command(revert, CancellationToken::new()).await;
            return Err(err);
        }

        self.bus.publish(Event::KillSwitchDeactivated {
            routing_id,
            instance_id: routing.instance_id,
            device_mac: routing.device_mac.clone(),
            mode,
            active_duration_seconds,
        });
        self.bus.publish(Event::ServiceKillSwitch {
            instance_id: routing.instance_id,
            device_mac: routing.device_mac,
            active: false,
        });
        Ok(())
    }

    /// Activates every enabled, inactive routing bound to `instance_id`.
    pub async fn suspend_routing(&self, instance_id: InstanceId) -> Result<BatchOutcome, CoreError> {
        let routings = self.store.list_device_routings_by_instance(instance_id).await?;
        let mut outcome = BatchOutcome::default();
        for routing in routings.into_iter().filter(|r| r.kill_switch_enabled && !r.kill_switch_active) {
            match self.activate(routing.id).await {
                Ok(()) => outcome.succeeded += 1,
                Err(err) => {
                    outcome.error = Some(err);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    /// Deactivates every active routing bound to `instance_id`.
    pub async fn resume_routing(&self, instance_id: InstanceId) -> Result<BatchOutcome, CoreError> {
        let routings = self.store.list_device_routings_by_instance(instance_id).await?;
        let mut outcome = BatchOutcome::default();
        for routing in routings.into_iter().filter(|r| r.kill_switch_active) {
            match self.deactivate(routing.id).await {
                Ok(()) => outcome.succeeded += 1,
                Err(err) => {
                    outcome.error = Some(err);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    pub async fn get_suspended_devices(&self, instance_id: InstanceId) -> Result<Vec<String>, CoreError> {
        Ok(self
            .store
            .list_device_routings_by_instance(instance_id)
            .await?
            .into_iter()
            .filter(|r| r.kill_switch_active)
            .map(|r| r.device_mac)
            .collect())
    }

    pub async fn is_suspended(&self, instance_id: InstanceId) -> Result<bool, CoreError> {
        Ok(!self.get_suspended_devices(instance_id).await?.is_empty())
    }

    /// Always empty: stale-activation detection needs a health-history
    /// query this system doesn't implement. Left as a hook so a future
    /// implementation has somewhere to plug in without changing callers.
    pub fn detect_stale(&self) -> Vec<DeviceRoutingId> {
        Vec::new()
    }

    async fn query_tagged_rules(&self, path: &str) -> Result<HashMap<String, (bool, String)>, CoreError> {
        let query = RouterQuery {
            path: path.to_string(),
            fields: vec!["comment".to_string(), "disabled".to_string()],
            filter: HashMap::from([("comment".to_string(), "nnc-killswitch-*".to_string())]),
        };
        let rows = self.router.query_state(query, CancellationToken::new()).await?;
        Ok(rows
            .into_iter()
            .filter_map(|row| {
                let id = row.get(".id")?.clone();
                let comment = row.get("comment")?.clone();
                let disabled = row.get("disabled").map(|v| v == "yes").unwrap_or(false);
                Some((id, (disabled, comment)))
            })
            .collect())
    }

    /// Startup (and periodic) reconciliation: orphaned router rules are
    /// removed, DB rows missing their rule get a fresh one, and
    /// disabled-state disagreements are flipped to match the DB.
    pub async fn reconcile(&self, router_id: RouterId) -> Result<ReconcileOutcome, CoreError> {
        let mut outcome = ReconcileOutcome::default();
        let routings = self.store.list_kill_switch_enabled_by_router(router_id).await?;

        let filter_rules = self.query_tagged_rules(FILTER_PATH).await?;
        let mangle_rules = self.query_tagged_rules(MANGLE_PATH).await?;

        let known_rule_ids: HashSet<&str> =
            routings.iter().filter_map(|r| r.kill_switch_rule_id.as_deref()).collect();

        for (path, rules) in [(FILTER_PATH, &filter_rules), (MANGLE_PATH, &mangle_rules)] {
            for rule_id in rules.keys() {
                if !known_rule_ids.contains(rule_id.as_str()) {
                    let remove = RouterCommand {
                        path: path.to_string(),
                        action: RouterAction::Remove,
                        id: Some(rule_id.clone()),
                        args: HashMap::new(),
                    };
                    if self.router.execute_command(remove, CancellationToken::new()).await.is_ok() {
                        outcome.removed += 1;
                    }
                }
            }
        }

        for mut routing in routings {
            let Some(mode) = routing.kill_switch_mode else { continue };
            let Some(rule_id) = routing.kill_switch_rule_id.clone() else { continue };
            let rules = if rule_path(mode) == FILTER_PATH { &filter_rules } else { &mangle_rules };

            match rules.get(&rule_id) {
                None => {
                    let args = match self.build_rule_args(&routing, mode) {
                        Ok(mut args) => {
                            args.insert("disabled".to_string(), if routing.kill_switch_active { "no" } else { "yes" }.to_string());
                            args
                        }
                        Err(err) => {
                            warn!(routing_id = %routing.id, %err, "could not rebuild rule args during reconcile, skipping");
                            continue;
                        }
                    };
                    let add = RouterCommand { path: rule_path(mode).to_string(), action: RouterAction::Add, id: None, args };
                    match self.router.execute_command(add, CancellationToken::new()).await {
                        Ok(result) if result.success => {
                            let Some(new_id) = result.id else { continue };
                            routing.kill_switch_rule_id = Some(new_id.clone());
                            if self.store.upsert_device_routing(routing).await.is_err() {
                                let remove = RouterCommand {
                                    path: rule_path(mode).to_string(),
                                    action: RouterAction::Remove,
                                    id: Some(new_id),
                                    args: HashMap::new(),
                                };
                                let _ = self.router.execute_command(remove, CancellationToken::new()).await;
                            } else {
                                outcome.recreated += 1;
                            }
                        }
                        _ => warn!(routing_id = %routing.id, "failed to recreate missing kill-switch rule"),
                    }
                }
                Some((disabled, _comment)) => {
                    let desired_disabled = !routing.kill_switch_active;
                    if *disabled != desired_disabled {
                        let set = RouterCommand {
                            path: rule_path(mode).to_string(),
                            action: RouterAction::Set,
                            id: Some(rule_id),
                            args: HashMap::from([(
                                "disabled".to_string(),
                                if desired_disabled { "yes" } else { "no" }.to_string(),
                            )]),
                        };
                        if self.router.execute_command(set, CancellationToken::new()).await.is_ok() {
                            outcome.flipped += 1;
                        }
                    }
                }
            }
        }

        self.bus.publish(Event::KillSwitchReconciled {
            router_id,
            removed: outcome.removed,
            recreated: outcome.recreated,
            flipped: outcome.flipped,
        });
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
