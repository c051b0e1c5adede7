// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Router driver: the opaque command/query transport to a MikroTik-class
//! edge router. Standard firewall paths used by this system:
//! `/ip/firewall/filter` and `/ip/firewall/mangle`.

use crate::error::CoreError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouterAction {
    Add,
    Set,
    Remove,
}

#[derive(Debug, Clone)]
pub struct RouterCommand {
    pub path: String,
    pub action: RouterAction,
    /// Required for `Set`/`Remove`, absent for `Add`.
    pub id: Option<String>,
    pub args: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct RouterCommandResult {
    pub success: bool,
    /// Populated by `Add`: the new resource's identifier.
    pub id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct RouterQuery {
    pub path: String,
    pub fields: Vec<String>,
    pub filter: HashMap<String, String>,
}

/// The router driver's boundary. Implementations are expected to honor
/// `cancel`.
#[async_trait]
pub trait RouterDriver: Send + Sync {
    async fn execute_command(
        &self,
        command: RouterCommand,
        cancel: CancellationToken,
    ) -> Result<RouterCommandResult, CoreError>;

    async fn query_state(
        &self,
        query: RouterQuery,
        cancel: CancellationToken,
    ) -> Result<Vec<HashMap<String, String>>, CoreError>;
}
