// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound and outbound chat/data message processing.

use serde::Deserialize;
use threadline_core::identity::{derive_request_id, normalize_participant};
use threadline_core::types::{
    ConversationMessage, MessageDirection, MessageSignal, MessageType, normalize_scope,
    now_timestamp,
};
use threadline_core::workflow::{ResolvedWorkflow, resolve_workflow};
use threadline_core::{RequestContext, ThreadlineError};
use tracing::{debug, info};

use crate::dispatcher::SignalDispatcher;
use crate::message_log::MessageLog;
use crate::resolver::ThreadResolver;

/// A single chat or data message from a caller or an agent.
///
/// Older request shapes deserialize into this type through field aliases.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MessageCommand {
    #[serde(alias = "participant")]
    pub participant_id: String,
    #[serde(default, alias = "workflow")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(default, alias = "type")]
    pub message_type: MessageType,
    #[serde(default, alias = "content")]
    pub text: Option<String>,
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default, alias = "topic")]
    pub scope: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub authorization: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
}

impl MessageCommand {
    /// Chat message for a workflow type.
    pub fn chat(
        participant_id: impl Into<String>,
        workflow_type: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            participant_id: participant_id.into(),
            workflow_type: Some(workflow_type.into()),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), ThreadlineError> {
        if self.message_type == MessageType::Handoff {
            return Err(ThreadlineError::validation(
                "message_type",
                "handoff messages are created by the handoff operation",
            ));
        }
        let has_text = self.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && self.data.is_none() {
            return Err(ThreadlineError::validation(
                "text",
                "a message needs text or data",
            ));
        }
        Ok(())
    }
}

/// Identity and content of a message after boundary validation.
struct Prepared {
    workflow: ResolvedWorkflow,
    participant_id: String,
    request_id: String,
    scope: Option<String>,
}

/// Public-facing message processing.
#[derive(Clone)]
pub struct MessageProcessor {
    resolver: ThreadResolver,
    log: MessageLog,
    dispatcher: SignalDispatcher,
}

impl MessageProcessor {
    pub fn new(resolver: ThreadResolver, log: MessageLog, dispatcher: SignalDispatcher) -> Self {
        Self {
            resolver,
            log,
            dispatcher,
        }
    }

    fn prepare(
        &self,
        ctx: &RequestContext,
        command: &MessageCommand,
    ) -> Result<Prepared, ThreadlineError> {
        command.validate()?;
        let participant_id = normalize_participant(&command.participant_id)?;
        let workflow = resolve_workflow(
            ctx.tenant_id(),
            command.workflow_id.as_deref(),
            command.workflow_type.as_deref(),
        )?;
        let request_id = match command.request_id.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => derive_request_id(&workflow.workflow_id, &participant_id),
        };
        Ok(Prepared {
            scope: normalize_scope(command.scope.as_deref()),
            workflow,
            participant_id,
            request_id,
        })
    }

    fn message(
        ctx: &RequestContext,
        command: &MessageCommand,
        prepared: &Prepared,
        thread_id: &str,
        direction: MessageDirection,
    ) -> ConversationMessage {
        let now = now_timestamp();
        ConversationMessage {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            tenant_id: ctx.tenant_id().to_string(),
            participant_id: prepared.participant_id.clone(),
            direction,
            message_type: command.message_type,
            text: command.text.clone(),
            data: command.data.clone(),
            scope: prepared.scope.clone(),
            request_id: prepared.request_id.clone(),
            hint: command.hint.clone(),
            task_id: command.task_id.clone(),
            origin: command.origin.clone(),
            workflow_id: prepared.workflow.workflow_id.clone(),
            workflow_type: prepared.workflow.workflow_type.clone(),
            created_at: now.clone(),
            updated_at: now,
            created_by: ctx.actor_id().map(str::to_string),
            parent_workflow_id: None,
            child_workflow_id: None,
        }
    }

    /// Persists a caller message and delivers it to the agent process,
    /// starting the process if it is not running yet. Returns the thread id.
    pub async fn process_incoming(
        &self,
        ctx: &RequestContext,
        command: &MessageCommand,
    ) -> Result<String, ThreadlineError> {
        let prepared = self.prepare(ctx, command)?;
        let thread_id = self
            .resolver
            .resolve(ctx, &prepared.workflow, &prepared.participant_id, command.is_internal)
            .await?;

        let message = Self::message(ctx, command, &prepared, &thread_id, MessageDirection::Incoming);
        self.log.append(&message).await?;

        let signal = MessageSignal {
            thread_id: thread_id.clone(),
            message_id: message.id.clone(),
            tenant_id: message.tenant_id.clone(),
            participant_id: message.participant_id.clone(),
            workflow_id: message.workflow_id.clone(),
            workflow_type: message.workflow_type.clone(),
            message_type: message.message_type,
            text: message.text.clone(),
            data: message.data.clone(),
            scope: message.scope.clone(),
            request_id: message.request_id.clone(),
            hint: message.hint.clone(),
            task_id: message.task_id.clone(),
            origin: message.origin.clone(),
            authorization: command.authorization.clone(),
            parent_workflow_id: None,
        };
        self.dispatcher
            .signal_or_start(
                ctx,
                &prepared.workflow.workflow_id,
                &prepared.workflow.workflow_type,
                &signal,
            )
            .await?;

        info!(
            tenant_id = ctx.tenant_id(),
            thread_id = %thread_id,
            workflow_id = %prepared.workflow.workflow_id,
            "incoming message processed"
        );
        Ok(thread_id)
    }

    /// Persists an agent reply. No signal is sent.
    ///
    /// `origin` and `data` left empty are copied from the latest incoming
    /// message of the thread, so replies can be routed back to the channel
    /// the conversation came from.
    pub async fn process_outgoing(
        &self,
        ctx: &RequestContext,
        command: &MessageCommand,
    ) -> Result<String, ThreadlineError> {
        let prepared = self.prepare(ctx, command)?;
        let thread_id = self
            .resolver
            .resolve(ctx, &prepared.workflow, &prepared.participant_id, command.is_internal)
            .await?;

        let mut message =
            Self::message(ctx, command, &prepared, &thread_id, MessageDirection::Outgoing);
        if (message.origin.is_none() || message.data.is_none())
            && let Some(incoming) = self.log.latest_incoming(&thread_id).await?
        {
            if message.origin.is_none() {
                message.origin = incoming.origin;
            }
            if message.data.is_none() {
                message.data = incoming.data;
            }
            debug!(thread_id = %thread_id, source_message = %incoming.id, "backfilled reply metadata");
        }
        self.log.append(&message).await?;

        info!(
            tenant_id = ctx.tenant_id(),
            thread_id = %thread_id,
            workflow_id = %prepared.workflow.workflow_id,
            "outgoing message recorded"
        );
        Ok(thread_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_shape_maps_to_command() {
        let command: MessageCommand = serde_json::from_value(serde_json::json!({
            "participant": "User-42",
            "workflow": "acme:support-agent:triage",
            "content": "hello",
            "topic": "billing"
        }))
        .unwrap();
        assert_eq!(command.participant_id, "User-42");
        assert_eq!(command.workflow_id.as_deref(), Some("acme:support-agent:triage"));
        assert_eq!(command.text.as_deref(), Some("hello"));
        assert_eq!(command.scope.as_deref(), Some("billing"));
        assert_eq!(command.message_type, MessageType::Chat);
    }

    #[test]
    fn empty_message_is_rejected() {
        let mut command = MessageCommand::chat("u", "echo", "");
        assert!(command.validate().is_err());
        command.data = Some(serde_json::json!({"k": 1}));
        command.message_type = MessageType::Data;
        assert!(command.validate().is_ok());
    }

    #[test]
    fn handoff_type_is_reserved() {
        let mut command = MessageCommand::chat("u", "echo", "hi");
        command.message_type = MessageType::Handoff;
        let err = command.validate().unwrap_err();
        assert!(matches!(err, ThreadlineError::Validation { ref field, .. } if field == "message_type"));
    }
}
