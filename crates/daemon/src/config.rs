// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration: loaded once at startup from a TOML file. No
//! config-framework layering, same as the teacher's `lifecycle::Config` —
//! one flat struct, one `load()`.

use bastion_alerts::RateLimitConfig;
use bastion_core::{AlertSeverity, FeatureManifest, RouterId};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

fn default_health_check_interval_seconds() -> u64 {
    15
}

fn default_health_timeout_seconds() -> u64 {
    30
}

fn default_rate_limit_sweep_interval_seconds() -> u64 {
    300
}

fn default_cleanup_tick_interval_seconds() -> u64 {
    10
}

fn default_kill_switch_reconcile_interval_seconds() -> u64 {
    300
}

fn default_cleanup_queue_capacity() -> usize {
    256
}

fn default_quiet_hours_threshold() -> AlertSeverity {
    AlertSeverity::Info
}

fn default_rate_limit() -> RateLimitConfig {
    RateLimitConfig::default()
}

/// The daemon manages exactly one router per process; `router_id` names it.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub router_id: RouterId,
    pub state_dir: PathBuf,

    #[serde(default = "default_rate_limit")]
    pub rate_limit: RateLimitConfig,
    #[serde(default = "default_quiet_hours_threshold")]
    pub quiet_hours_threshold: AlertSeverity,

    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,
    #[serde(default = "default_health_timeout_seconds")]
    pub health_timeout_seconds: u64,
    #[serde(default = "default_rate_limit_sweep_interval_seconds")]
    pub rate_limit_sweep_interval_seconds: u64,
    #[serde(default = "default_cleanup_tick_interval_seconds")]
    pub cleanup_tick_interval_seconds: u64,
    #[serde(default = "default_kill_switch_reconcile_interval_seconds")]
    pub kill_switch_reconcile_interval_seconds: u64,
    #[serde(default = "default_cleanup_queue_capacity")]
    pub cleanup_queue_capacity: usize,

    #[serde(default)]
    pub fallback_interfaces: HashMap<String, String>,
    #[serde(default)]
    pub manifests: Vec<FeatureManifest>,
}

impl Config {
    /// Reads and parses the TOML config at `path`. The log file lives at
    /// `state_dir/daemon.log`, mirroring the teacher's state-dir layout.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|err| ConfigError::Read(path.to_path_buf(), err))?;
        let config: Config = toml::from_str(&raw).map_err(|err| ConfigError::Parse(path.to_path_buf(), err))?;
        Ok(config)
    }

    pub fn log_path(&self) -> PathBuf {
        self.state_dir.join("daemon.log")
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Read(PathBuf, #[source] std::io::Error),
    #[error("could not parse config file {0}: {1}")]
    Parse(PathBuf, #[source] toml::de::Error),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
