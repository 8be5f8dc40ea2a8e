// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cross-agent handoff.
//!
//! A handoff writes a linked pair of messages, one in the source thread and
//! one in the target thread, then delivers the target message to the target
//! agent process. The two writes are independent: if the second write or the
//! delivery fails, the earlier record stays and a warning carries the handoff
//! id so the pair can be reconciled.

use serde::Deserialize;
use threadline_config::model::HandoffDelivery;
use threadline_core::identity::normalize_participant;
use threadline_core::types::{
    ConversationMessage, MessageDirection, MessageSignal, MessageType, normalize_scope,
    now_timestamp,
};
use threadline_core::workflow::{ResolvedWorkflow, resolve_workflow};
use threadline_core::{RequestContext, ThreadlineError};
use tracing::{info, warn};

use crate::dispatcher::SignalDispatcher;
use crate::message_log::MessageLog;
use crate::resolver::ThreadResolver;

/// Which agent process receives the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffTarget {
    /// A process already running under this workflow id.
    ///
    /// `workflow_type` is derived from the id when omitted; supply it when the
    /// id carries a suffix, since it is used if the process has to be started.
    Running {
        workflow_id: String,
        #[serde(default)]
        workflow_type: Option<String>,
    },
    /// A process of this workflow type, started if needed.
    Start { workflow_type: String },
}

/// Everything needed to hand a conversation to another agent.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HandoffRequest {
    /// Thread the conversation is leaving.
    pub thread_id: String,
    pub source_workflow_id: String,
    #[serde(default)]
    pub source_workflow_type: Option<String>,
    pub target: HandoffTarget,
    #[serde(alias = "participant")]
    pub participant_id: String,
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
    pub authorization: Option<String>,
}

/// Result of a completed handoff.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoffOutcome {
    pub handoff_id: String,
    pub target_thread_id: String,
    pub target_workflow_id: String,
    pub source_message_id: String,
    pub target_message_id: String,
}

/// Composes resolver, log, and dispatcher into the handoff procedure.
#[derive(Clone)]
pub struct HandoffOrchestrator {
    resolver: ThreadResolver,
    log: MessageLog,
    dispatcher: SignalDispatcher,
    delivery: HandoffDelivery,
}

impl HandoffOrchestrator {
    pub fn new(
        resolver: ThreadResolver,
        log: MessageLog,
        dispatcher: SignalDispatcher,
        delivery: HandoffDelivery,
    ) -> Self {
        Self {
            resolver,
            log,
            dispatcher,
            delivery,
        }
    }

    /// Transfers the conversation and returns the ids of what was written.
    pub async fn handoff(
        &self,
        ctx: &RequestContext,
        request: &HandoffRequest,
    ) -> Result<HandoffOutcome, ThreadlineError> {
        let has_text = request.text.as_deref().is_some_and(|t| !t.is_empty());
        if !has_text && request.data.is_none() {
            return Err(ThreadlineError::validation(
                "text",
                "a handoff needs text or data",
            ));
        }
        let participant_id = normalize_participant(&request.participant_id)?;
        let source = resolve_workflow(
            ctx.tenant_id(),
            Some(&request.source_workflow_id),
            request.source_workflow_type.as_deref(),
        )?;
        let target = match &request.target {
            HandoffTarget::Running {
                workflow_id,
                workflow_type,
            } => resolve_workflow(ctx.tenant_id(), Some(workflow_id), workflow_type.as_deref())?,
            HandoffTarget::Start { workflow_type } => {
                resolve_workflow(ctx.tenant_id(), None, Some(workflow_type))?
            }
        };
        if target.workflow_id == source.workflow_id {
            return Err(ThreadlineError::validation(
                "target",
                format!("cannot hand `{}` off to itself", source.workflow_id),
            ));
        }

        let source_thread = self.resolver.owned(ctx, &request.thread_id).await?;
        if source_thread.workflow_id != source.workflow_id {
            return Err(ThreadlineError::validation(
                "thread_id",
                format!(
                    "thread `{}` belongs to `{}`, not `{}`",
                    source_thread.id, source_thread.workflow_id, source.workflow_id
                ),
            ));
        }
        if source_thread.participant_id != participant_id {
            return Err(ThreadlineError::validation(
                "participant_id",
                format!(
                    "thread `{}` belongs to participant `{}`",
                    source_thread.id, source_thread.participant_id
                ),
            ));
        }

        let target_thread_id = self
            .resolver
            .resolve(ctx, &target, &participant_id, source_thread.is_internal)
            .await?;

        let handoff_id = uuid::Uuid::new_v4().to_string();
        let scope = normalize_scope(request.scope.as_deref());

        let pair = PairContext {
            ctx,
            request,
            handoff_id: &handoff_id,
            participant_id: &participant_id,
            scope: &scope,
        };

        let mut source_message = pair.message(&source_thread.id, &source);
        source_message.direction = MessageDirection::Outgoing;
        source_message.child_workflow_id = Some(target.workflow_id.clone());
        let source_message_id = self.log.append(&source_message).await?;

        let mut target_message = pair.message(&target_thread_id, &target);
        target_message.direction = MessageDirection::Incoming;
        target_message.parent_workflow_id = Some(source.workflow_id.clone());
        let target_message_id = self
            .log
            .append(&target_message)
            .await
            .inspect_err(|e| {
                warn!(
                    handoff_id = %handoff_id,
                    source_workflow_id = %source.workflow_id,
                    target_workflow_id = %target.workflow_id,
                    error = %e,
                    "half-handoff: source message written, target message failed"
                )
            })?;

        let signal = MessageSignal {
            thread_id: target_thread_id.clone(),
            message_id: target_message_id.clone(),
            tenant_id: ctx.tenant_id().to_string(),
            participant_id: participant_id.clone(),
            workflow_id: target.workflow_id.clone(),
            workflow_type: target.workflow_type.clone(),
            message_type: MessageType::Handoff,
            text: request.text.clone(),
            data: request.data.clone(),
            scope,
            request_id: handoff_id.clone(),
            hint: request.hint.clone(),
            task_id: request.task_id.clone(),
            origin: None,
            authorization: request.authorization.clone(),
            parent_workflow_id: Some(source.workflow_id.clone()),
        };

        let use_plain_signal = matches!(request.target, HandoffTarget::Running { .. })
            && self.delivery == HandoffDelivery::Conditional;
        let delivered = if use_plain_signal {
            self.dispatcher
                .signal(ctx, &target.workflow_id, &signal)
                .await
        } else {
            self.dispatcher
                .signal_or_start(ctx, &target.workflow_id, &target.workflow_type, &signal)
                .await
        };
        delivered.inspect_err(|e| {
            warn!(
                handoff_id = %handoff_id,
                source_workflow_id = %source.workflow_id,
                target_workflow_id = %target.workflow_id,
                error = %e,
                "handoff recorded but not delivered"
            )
        })?;

        info!(
            tenant_id = ctx.tenant_id(),
            handoff_id = %handoff_id,
            source_workflow_id = %source.workflow_id,
            target_workflow_id = %target.workflow_id,
            "handoff completed"
        );

        Ok(HandoffOutcome {
            handoff_id,
            target_thread_id,
            target_workflow_id: target.workflow_id,
            source_message_id,
            target_message_id,
        })
    }
}

/// Fields shared by both messages of one handoff.
struct PairContext<'a> {
    ctx: &'a RequestContext,
    request: &'a HandoffRequest,
    handoff_id: &'a str,
    participant_id: &'a str,
    scope: &'a Option<String>,
}

impl PairContext<'_> {
    fn message(&self, thread_id: &str, workflow: &ResolvedWorkflow) -> ConversationMessage {
        let now = now_timestamp();
        ConversationMessage {
            id: uuid::Uuid::new_v4().to_string(),
            thread_id: thread_id.to_string(),
            tenant_id: self.ctx.tenant_id().to_string(),
            participant_id: self.participant_id.to_string(),
            direction: MessageDirection::Handoff,
            message_type: MessageType::Handoff,
            text: self.request.text.clone(),
            data: self.request.data.clone(),
            scope: self.scope.clone(),
            request_id: self.handoff_id.to_string(),
            hint: self.request.hint.clone(),
            task_id: self.request.task_id.clone(),
            origin: None,
            workflow_id: workflow.workflow_id.clone(),
            workflow_type: workflow.workflow_type.clone(),
            created_at: now.clone(),
            updated_at: now,
            created_by: self.ctx.actor_id().map(str::to_string),
            parent_workflow_id: None,
            child_workflow_id: None,
        }
    }
}
