// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use bastion_core::RouterQuery;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

async fn add(driver: &FakeRouterDriver, path: &str, args: &[(&str, &str)]) -> String {
    let args = args.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
    let command = RouterCommand { path: path.into(), action: RouterAction::Add, id: None, args };
    driver.execute_command(command, CancellationToken::new()).await.unwrap().id.unwrap()
}

#[tokio::test]
async fn add_assigns_an_id_and_stores_args() {
    let driver = FakeRouterDriver::new();
    let command = RouterCommand {
        path: "/ip/firewall/filter".into(),
        action: RouterAction::Add,
        id: None,
        args: HashMap::from([("action".to_string(), "drop".to_string())]),
    };
    let result = driver.execute_command(command, CancellationToken::new()).await.unwrap();
    assert!(result.success);
    assert!(result.id.is_some());
    assert_eq!(driver.resource_count("/ip/firewall/filter"), 1);
}

#[tokio::test]
async fn set_merges_args_into_existing_resource() {
    let driver = FakeRouterDriver::new();
    let id = add(&driver, "/ip/firewall/filter", &[("disabled", "yes")]).await;
    let command = RouterCommand {
        path: "/ip/firewall/filter".into(),
        action: RouterAction::Set,
        id: Some(id.clone()),
        args: HashMap::from([("disabled".to_string(), "no".to_string())]),
    };
    let result = driver.execute_command(command, CancellationToken::new()).await.unwrap();
    assert!(result.success);
    let (_, args) = driver.resources("/ip/firewall/filter").into_iter().find(|(i, _)| *i == id).unwrap();
    assert_eq!(args.get("disabled"), Some(&"no".to_string()));
}

#[tokio::test]
async fn set_on_missing_id_fails() {
    let driver = FakeRouterDriver::new();
    let command = RouterCommand {
        path: "/ip/firewall/filter".into(),
        action: RouterAction::Set,
        id: Some("*9999".into()),
        args: HashMap::new(),
    };
    let result = driver.execute_command(command, CancellationToken::new()).await.unwrap();
    assert!(!result.success);
}

#[tokio::test]
async fn remove_deletes_resource() {
    let driver = FakeRouterDriver::new();
    let id = add(&driver, "/ip/firewall/filter", &[]).await;
    let command = RouterCommand {
        path: "/ip/firewall/filter".into(),
        action: RouterAction::Remove,
        id: Some(id),
        args: HashMap::new(),
    };
    let result = driver.execute_command(command, CancellationToken::new()).await.unwrap();
    assert!(result.success);
    assert_eq!(driver.resource_count("/ip/firewall/filter"), 0);
}

#[tokio::test]
async fn query_filters_by_exact_and_prefix_match() {
    let driver = FakeRouterDriver::new();
    add(&driver, "/ip/firewall/filter", &[("comment", "nnc-killswitch-abc")]).await;
    add(&driver, "/ip/firewall/filter", &[("comment", "other-rule")]).await;

    let query = RouterQuery {
        path: "/ip/firewall/filter".into(),
        fields: vec!["comment".into()],
        filter: HashMap::from([("comment".to_string(), "nnc-killswitch-*".to_string())]),
    };
    let rows = driver.query_state(query, CancellationToken::new()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("comment"), Some(&"nnc-killswitch-abc".to_string()));
}

#[tokio::test]
async fn query_unknown_path_returns_empty() {
    let driver = FakeRouterDriver::new();
    let query = RouterQuery { path: "/ip/firewall/mangle".into(), fields: vec![], filter: HashMap::new() };
    let rows = driver.query_state(query, CancellationToken::new()).await.unwrap();
    assert!(rows.is_empty());
}
