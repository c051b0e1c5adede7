// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory stand-in for the router's command/query transport. Holds one
//! resource table per firewall path (`/ip/firewall/filter`,
//! `/ip/firewall/mangle`, ...), keyed by a router-minted id.

use async_trait::async_trait;
use bastion_core::{CoreError, RouterAction, RouterCommand, RouterCommandResult, RouterDriver, RouterQuery};
use parking_lot::RwLock;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
pub struct FakeRouterDriver {
    tables: RwLock<HashMap<String, HashMap<String, HashMap<String, String>>>>,
}

impl FakeRouterDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/inspection helper: resources currently held at `path`.
    pub fn resources(&self, path: &str) -> Vec<(String, HashMap<String, String>)> {
        self.tables
            .read()
            .get(path)
            .map(|table| table.iter().map(|(id, args)| (id.clone(), args.clone())).collect())
            .unwrap_or_default()
    }

    pub fn resource_count(&self, path: &str) -> usize {
        self.tables.read().get(path).map(HashMap::len).unwrap_or(0)
    }
}

fn matches_filter(args: &HashMap<String, String>, filter: &HashMap<String, String>) -> bool {
    filter.iter().all(|(key, want)| match args.get(key) {
        Some(have) => match want.strip_suffix('*') {
            Some(prefix) => have.starts_with(prefix),
            None => have == want,
        },
        None => false,
    })
}

#[async_trait]
impl RouterDriver for FakeRouterDriver {
    async fn execute_command(
        &self,
        command: RouterCommand,
        _cancel: CancellationToken,
    ) -> Result<RouterCommandResult, CoreError> {
        let mut tables = self.tables.write();
        let table = tables.entry(command.path.clone()).or_default();

        match command.action {
            RouterAction::Add => {
                let id = format!("*{}", nanoid::nanoid!(8));
                table.insert(id.clone(), command.args);
                Ok(RouterCommandResult { success: true, id: Some(id), error: None })
            }
            RouterAction::Set => {
                let Some(id) = command.id else {
                    return Ok(RouterCommandResult {
                        success: false,
                        id: None,
                        error: Some("set requires an id".into()),
                    });
                };
                match table.get_mut(&id) {
                    Some(existing) => {
                        existing.extend(command.args);
                        Ok(RouterCommandResult { success: true, id: Some(id), error: None })
                    }
                    None => Ok(RouterCommandResult {
                        success: false,
                        id: Some(id.clone()),
                        error: Some(format!("no resource {id} at {}", command.path)),
                    }),
                }
            }
            RouterAction::Remove => {
                let Some(id) = command.id else {
                    return Ok(RouterCommandResult {
                        success: false,
                        id: None,
                        error: Some("remove requires an id".into()),
                    });
                };
                match table.remove(&id) {
                    Some(_) => Ok(RouterCommandResult { success: true, id: Some(id), error: None }),
                    None => Ok(RouterCommandResult {
                        success: false,
                        id: Some(id.clone()),
                        error: Some(format!("no resource {id} at {}", command.path)),
                    }),
                }
            }
        }
    }

    async fn query_state(
        &self,
        query: RouterQuery,
        _cancel: CancellationToken,
    ) -> Result<Vec<HashMap<String, String>>, CoreError> {
        let tables = self.tables.read();
        let Some(table) = tables.get(&query.path) else {
            return Ok(Vec::new());
        };
        Ok(table
            .iter()
            .filter(|(_, args)| matches_filter(args, &query.filter))
            .map(|(id, args)| {
                let mut row = HashMap::new();
                row.insert(".id".to_string(), id.clone());
                if query.fields.is_empty() {
                    row.extend(args.clone());
                } else {
                    for field in &query.fields {
                        if let Some(v) = args.get(field) {
                            row.insert(field.clone(), v.clone());
                        }
                    }
                }
                row
            })
            .collect())
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
