// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `bastiond`: long-running process only. It reads its config once, reconciles
//! instance and kill-switch state against the router, then runs the
//! background loops until interrupted. There is no command surface here —
//! no CLI flags beyond the config path, no control socket.

use bastion_daemon::{bootstrap, Config};
use std::env;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const DEFAULT_CONFIG_PATH: &str = "/etc/bastion/bastiond.toml";

#[derive(Debug, Error)]
enum MainError {
    #[error(transparent)]
    Config(#[from] bastion_daemon::ConfigError),
    #[error(transparent)]
    Core(#[from] bastion_core::CoreError),
}

#[tokio::main]
async fn main() {
    let config_path = env::var("BASTIOND_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH));

    let config = match Config::load(&config_path) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("failed to load config at {}: {err}", config_path.display());
            std::process::exit(1);
        }
    };

    let _guard = init_logging(&config);

    if let Err(err) = run(config).await {
        tracing::error!(%err, "bastiond exited with an error");
        std::process::exit(1);
    }
}

fn init_logging(config: &Config) -> tracing_appender::non_blocking::WorkerGuard {
    let log_dir = config.log_path();
    let log_dir = log_dir.parent().unwrap_or_else(|| std::path::Path::new("."));
    let _ = std::fs::create_dir_all(log_dir);

    let file_appender = tracing_appender::rolling::daily(log_dir, "daemon.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer);
    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .init();

    guard
}

async fn run(config: Config) -> Result<(), MainError> {
    tracing::info!(router_id = %config.router_id, "starting bastiond");
    let daemon = bootstrap(&config).await?;

    tokio::signal::ctrl_c().await.expect("failed to listen for ctrl-c");
    tracing::info!("shutdown signal received, stopping background tasks");
    daemon.shutdown().await;

    Ok(())
}
