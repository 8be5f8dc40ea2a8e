// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock orchestration engine for deterministic testing.
//!
//! `MockEngine` keeps a set of running process ids. A plain signal to an
//! unknown id fails with `ProcessNotFound`; signal-with-start adds the id.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use threadline_core::types::{AdapterType, HealthStatus, StartOptions};
use threadline_core::{PluginAdapter, ThreadlineError, WorkflowEngine};

/// One recorded engine call.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineCall {
    Signal {
        process_id: String,
        signal_name: String,
        payload: serde_json::Value,
    },
    SignalWithStart {
        process_id: String,
        process_type: String,
        signal_name: String,
        payload: serde_json::Value,
        options: StartOptions,
    },
}

impl EngineCall {
    pub fn process_id(&self) -> &str {
        match self {
            Self::Signal { process_id, .. } | Self::SignalWithStart { process_id, .. } => {
                process_id
            }
        }
    }

    pub fn payload(&self) -> &serde_json::Value {
        match self {
            Self::Signal { payload, .. } | Self::SignalWithStart { payload, .. } => payload,
        }
    }
}

#[derive(Default)]
struct State {
    calls: Vec<EngineCall>,
    running: BTreeSet<String>,
    unavailable: bool,
}

/// In-memory [`WorkflowEngine`].
#[derive(Clone, Default)]
pub struct MockEngine {
    state: Arc<Mutex<State>>,
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with these processes already running.
    pub fn with_running<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let state = State {
            running: ids.into_iter().map(Into::into).collect(),
            ..State::default()
        };
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// While set, every call fails with a transient engine error.
    pub async fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().await.unavailable = unavailable;
    }

    pub async fn calls(&self) -> Vec<EngineCall> {
        self.state.lock().await.calls.clone()
    }

    pub async fn is_running(&self, process_id: &str) -> bool {
        self.state.lock().await.running.contains(process_id)
    }

    pub async fn running(&self) -> Vec<String> {
        self.state.lock().await.running.iter().cloned().collect()
    }
}

fn unavailable() -> ThreadlineError {
    ThreadlineError::Engine {
        message: "mock engine unavailable".into(),
        source: None,
    }
}

#[async_trait]
impl PluginAdapter for MockEngine {
    fn name(&self) -> &str {
        "mock-engine"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Engine
    }

    async fn health_check(&self) -> Result<HealthStatus, ThreadlineError> {
        if self.state.lock().await.unavailable {
            return Ok(HealthStatus::Unhealthy("mock engine unavailable".into()));
        }
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), ThreadlineError> {
        Ok(())
    }
}

#[async_trait]
impl WorkflowEngine for MockEngine {
    async fn signal(
        &self,
        process_id: &str,
        signal_name: &str,
        payload: serde_json::Value,
    ) -> Result<(), ThreadlineError> {
        let mut state = self.state.lock().await;
        state.calls.push(EngineCall::Signal {
            process_id: process_id.to_string(),
            signal_name: signal_name.to_string(),
            payload,
        });
        if state.unavailable {
            return Err(unavailable());
        }
        if !state.running.contains(process_id) {
            return Err(ThreadlineError::ProcessNotFound {
                process_id: process_id.to_string(),
            });
        }
        Ok(())
    }

    async fn signal_with_start(
        &self,
        proposed_process_id: &str,
        process_type: &str,
        signal_name: &str,
        payload: serde_json::Value,
        options: &StartOptions,
    ) -> Result<(), ThreadlineError> {
        let mut state = self.state.lock().await;
        state.calls.push(EngineCall::SignalWithStart {
            process_id: proposed_process_id.to_string(),
            process_type: process_type.to_string(),
            signal_name: signal_name.to_string(),
            payload,
            options: options.clone(),
        });
        if state.unavailable {
            return Err(unavailable());
        }
        state.running.insert(proposed_process_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signal_with_start_converges_on_one_process() {
        let engine = MockEngine::new();
        for _ in 0..3 {
            engine
                .signal_with_start("acme:echo", "echo", "s", serde_json::json!({}), &StartOptions::default())
                .await
                .unwrap();
        }
        assert_eq!(engine.running().await, vec!["acme:echo".to_string()]);
        assert_eq!(engine.calls().await.len(), 3);
        engine.signal("acme:echo", "s", serde_json::Value::Null).await.unwrap();
    }

    #[tokio::test]
    async fn unavailable_engine_fails_transiently() {
        let engine = MockEngine::with_running(["acme:echo"]);
        engine.set_unavailable(true).await;
        let err = engine
            .signal("acme:echo", "s", serde_json::Value::Null)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), threadline_core::ErrorKind::Transient);
        assert!(matches!(
            engine.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
    }
}
