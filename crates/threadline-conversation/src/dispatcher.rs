// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery of message signals to agent processes.

use std::collections::BTreeMap;
use std::sync::Arc;

use threadline_config::model::EngineConfig;
use threadline_core::types::{MessageSignal, StartOptions};
use threadline_core::{RequestContext, ThreadlineError, WorkflowEngine};
use tracing::{debug, warn};

/// Wraps a [`WorkflowEngine`] with the signal name and start options every
/// message delivery uses.
///
/// Nothing here retries: a failed delivery is returned to the caller as is.
#[derive(Clone)]
pub struct SignalDispatcher {
    engine: Arc<dyn WorkflowEngine>,
    signal_name: String,
    task_queue: Option<String>,
}

impl SignalDispatcher {
    pub fn new(engine: Arc<dyn WorkflowEngine>, config: &EngineConfig) -> Self {
        Self {
            engine,
            signal_name: config.inbound_signal.clone(),
            task_queue: config.task_queue.clone(),
        }
    }

    pub fn signal_name(&self) -> &str {
        &self.signal_name
    }

    /// Signals a process that must already be running.
    pub async fn signal(
        &self,
        ctx: &RequestContext,
        process_id: &str,
        message: &MessageSignal,
    ) -> Result<(), ThreadlineError> {
        let payload = to_payload(message)?;
        debug!(tenant_id = ctx.tenant_id(), process_id, "signalling process");
        self.engine
            .signal(process_id, &self.signal_name, payload)
            .await
            .inspect_err(|e| warn!(process_id, error = %e, "signal failed"))
    }

    /// Signals `proposed_process_id`, starting a `process_type` process under
    /// that id when none is running.
    pub async fn signal_or_start(
        &self,
        ctx: &RequestContext,
        proposed_process_id: &str,
        process_type: &str,
        message: &MessageSignal,
    ) -> Result<(), ThreadlineError> {
        let payload = to_payload(message)?;
        let options = self.start_options(ctx, message);
        debug!(
            tenant_id = ctx.tenant_id(),
            process_id = proposed_process_id,
            process_type,
            "signal-or-start"
        );
        self.engine
            .signal_with_start(
                proposed_process_id,
                process_type,
                &self.signal_name,
                payload,
                &options,
            )
            .await
            .inspect_err(|e| {
                warn!(process_id = proposed_process_id, error = %e, "signal-or-start failed")
            })
    }

    fn start_options(&self, ctx: &RequestContext, message: &MessageSignal) -> StartOptions {
        let mut memo = BTreeMap::new();
        memo.insert("tenant_id".to_string(), ctx.tenant_id().to_string());
        memo.insert("participant_id".to_string(), message.participant_id.clone());
        memo.insert("thread_id".to_string(), message.thread_id.clone());
        if let Some(parent) = &message.parent_workflow_id {
            memo.insert("parent_workflow_id".to_string(), parent.clone());
        }
        StartOptions {
            task_queue: self.task_queue.clone(),
            memo,
        }
    }
}

fn to_payload(message: &MessageSignal) -> Result<serde_json::Value, ThreadlineError> {
    serde_json::to_value(message)
        .map_err(|e| ThreadlineError::Internal(format!("failed to encode signal payload: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use threadline_core::types::MessageType;
    use threadline_test_utils::{EngineCall, MockEngine};

    fn signal() -> MessageSignal {
        MessageSignal {
            thread_id: "t-1".into(),
            message_id: "m-1".into(),
            tenant_id: "acme".into(),
            participant_id: "user-42".into(),
            workflow_id: "acme:echo".into(),
            workflow_type: "echo".into(),
            message_type: MessageType::Chat,
            text: Some("hi".into()),
            data: None,
            scope: None,
            request_id: "r".into(),
            hint: None,
            task_id: None,
            origin: None,
            authorization: None,
            parent_workflow_id: None,
        }
    }

    fn dispatcher(engine: Arc<MockEngine>) -> SignalDispatcher {
        let config = EngineConfig {
            task_queue: Some("agents".into()),
            ..EngineConfig::default()
        };
        SignalDispatcher::new(engine, &config)
    }

    #[tokio::test]
    async fn signal_or_start_carries_memo_and_queue() {
        let engine = Arc::new(MockEngine::new());
        let ctx = RequestContext::new("acme");
        dispatcher(Arc::clone(&engine))
            .signal_or_start(&ctx, "acme:echo", "echo", &signal())
            .await
            .unwrap();

        let calls = engine.calls().await;
        assert_eq!(calls.len(), 1);
        match &calls[0] {
            EngineCall::SignalWithStart {
                process_id,
                process_type,
                signal_name,
                options,
                payload,
            } => {
                assert_eq!(process_id, "acme:echo");
                assert_eq!(process_type, "echo");
                assert_eq!(signal_name, "inbound_message");
                assert_eq!(options.task_queue.as_deref(), Some("agents"));
                assert_eq!(options.memo.get("tenant_id").map(String::as_str), Some("acme"));
                assert_eq!(payload["text"], "hi");
            }
            other => panic!("unexpected call {other:?}"),
        }
        assert!(engine.is_running("acme:echo").await);
    }

    #[tokio::test]
    async fn plain_signal_to_missing_process_is_not_found() {
        let engine = Arc::new(MockEngine::new());
        let ctx = RequestContext::new("acme");
        let err = dispatcher(Arc::clone(&engine))
            .signal(&ctx, "acme:echo", &signal())
            .await
            .unwrap_err();
        assert!(matches!(err, ThreadlineError::ProcessNotFound { .. }));
        assert_eq!(engine.calls().await.len(), 1);
    }
}
