// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `threadline serve` command implementation.
//!
//! Opens SQLite storage (running migrations), connects the orchestration
//! engine client, builds the conversation service, and serves the HTTP
//! gateway until SIGINT or SIGTERM.

use std::sync::Arc;

use threadline_config::ThreadlineConfig;
use threadline_conversation::ConversationService;
use threadline_core::{HealthStatus, PluginAdapter, ThreadStore, ThreadlineError};
use threadline_engine::HttpEngine;
use threadline_gateway::{GatewayState, ServerConfig, start_server};
use threadline_storage::SqliteStorage;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `threadline serve` command.
pub async fn run_serve(config: ThreadlineConfig) -> Result<(), ThreadlineError> {
    init_tracing(&config.service.log_level);
    info!(
        name = %config.service.name,
        version = env!("CARGO_PKG_VERSION"),
        "starting threadline"
    );

    let storage = Arc::new(SqliteStorage::new(config.storage.clone()));
    storage.initialize().await?;
    info!(path = %config.storage.database_path, "storage initialized");

    let engine = Arc::new(HttpEngine::new(&config.engine)?);
    report_engine_health(engine.as_ref()).await;

    let service = Arc::new(ConversationService::new(
        storage.clone(),
        engine.clone(),
        &config,
    ));

    let cancel = shutdown::install_signal_handler();
    let served = if config.gateway.enabled {
        let state = GatewayState::new(service, &config);
        start_server(&ServerConfig::from(&config.gateway), state, cancel.clone()).await
    } else {
        warn!("gateway disabled; nothing to serve until shutdown");
        cancel.cancelled().await;
        Ok(())
    };
    if let Err(e) = &served {
        error!(error = %e, "gateway failed");
    }

    info!("shutting down");
    if let Err(e) = engine.shutdown().await {
        warn!(error = %e, "engine client shutdown failed");
    }
    storage.close().await?;
    info!("shutdown complete");
    served
}

/// Logs engine reachability at startup. An unreachable engine is not fatal:
/// messages are still recorded and delivery errors surface per request.
async fn report_engine_health(engine: &HttpEngine) {
    match engine.health_check().await {
        Ok(HealthStatus::Healthy) => info!("orchestration engine reachable"),
        Ok(HealthStatus::Degraded(reason)) => warn!(%reason, "orchestration engine degraded"),
        Ok(HealthStatus::Unhealthy(reason)) => warn!(%reason, "orchestration engine unreachable"),
        Err(e) => warn!(error = %e, "orchestration engine health check failed"),
    }
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("threadline={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
