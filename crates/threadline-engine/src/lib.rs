// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration engine adapter for the Threadline control plane.
//!
//! [`HttpEngine`] implements [`WorkflowEngine`] over the engine's HTTP bridge:
//! plain signals to running processes and signal-with-start for processes
//! that may not exist yet.

pub mod client;
pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use threadline_config::model::EngineConfig;
use threadline_core::types::{AdapterType, HealthStatus, StartOptions};
use threadline_core::{PluginAdapter, ThreadlineError, WorkflowEngine};
use tracing::{debug, info};

use crate::client::EngineClient;

/// [`WorkflowEngine`] backed by the engine bridge HTTP API.
pub struct HttpEngine {
    client: EngineClient,
}

impl HttpEngine {
    pub fn new(config: &EngineConfig) -> Result<Self, ThreadlineError> {
        let client = EngineClient::new(
            &config.base_url,
            config.api_key.as_deref(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(base_url = %client.base_url(), "engine client initialized");
        Ok(Self { client })
    }
}

#[async_trait]
impl PluginAdapter for HttpEngine {
    fn name(&self) -> &str {
        "http-engine"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, ThreadlineError> {
        match self.client.health().await {
            Ok(status) if status.is_success() => Ok(HealthStatus::Healthy),
            Ok(status) => Ok(HealthStatus::Degraded(format!(
                "engine health endpoint returned {status}"
            ))),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), ThreadlineError> {
        Ok(())
    }
}

#[async_trait]
impl WorkflowEngine for HttpEngine {
    async fn signal(
        &self,
        process_id: &str,
        signal_name: &str,
        payload: serde_json::Value,
    ) -> Result<(), ThreadlineError> {
        self.client.signal(process_id, signal_name, &payload).await
    }

    async fn signal_with_start(
        &self,
        proposed_process_id: &str,
        process_type: &str,
        signal_name: &str,
        payload: serde_json::Value,
        options: &StartOptions,
    ) -> Result<(), ThreadlineError> {
        let response = self
            .client
            .signal_with_start(
                proposed_process_id,
                process_type,
                signal_name,
                &payload,
                options,
            )
            .await?;
        debug!(
            process_id = proposed_process_id,
            started = response.started,
            run_id = response.run_id.as_deref().unwrap_or(""),
            "signal-with-start delivered"
        );
        Ok(())
    }
}
