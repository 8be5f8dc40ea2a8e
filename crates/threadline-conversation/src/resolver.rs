// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Thread resolution: natural key to thread id, creating on first contact.

use std::sync::Arc;

use serde::Deserialize;
use threadline_core::identity::normalize_participant;
use threadline_core::types::{ConversationThread, NewThread, ThreadKey};
use threadline_core::workflow::{ResolvedWorkflow, resolve_workflow};
use threadline_core::{RequestContext, ThreadStore, ThreadlineError};
use tracing::{debug, info};

/// Identifies an existing thread by its natural key components.
///
/// The workflow may be named by id or by type, exactly as in a message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ThreadLocator {
    #[serde(default, alias = "workflow")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(alias = "participant")]
    pub participant_id: String,
}

impl ThreadLocator {
    pub fn new(workflow_id: impl Into<String>, participant_id: impl Into<String>) -> Self {
        Self {
            workflow_id: Some(workflow_id.into()),
            workflow_type: None,
            participant_id: participant_id.into(),
        }
    }

    /// Validated natural key inside the caller's tenant.
    pub fn key(&self, ctx: &RequestContext) -> Result<ThreadKey, ThreadlineError> {
        let workflow = resolve_workflow(
            ctx.tenant_id(),
            self.workflow_id.as_deref(),
            self.workflow_type.as_deref(),
        )?;
        Ok(ThreadKey {
            tenant_id: ctx.tenant_id().to_string(),
            workflow_id: workflow.workflow_id,
            participant_id: normalize_participant(&self.participant_id)?,
        })
    }
}

/// Resolves or creates conversation threads.
#[derive(Clone)]
pub struct ThreadResolver {
    store: Arc<dyn ThreadStore>,
}

impl ThreadResolver {
    pub fn new(store: Arc<dyn ThreadStore>) -> Self {
        Self { store }
    }

    /// Returns the thread id for (tenant, workflow, participant), creating it
    /// as Active when absent and reactivating it when archived.
    ///
    /// `participant_id` must already be normalized.
    pub async fn resolve(
        &self,
        ctx: &RequestContext,
        workflow: &ResolvedWorkflow,
        participant_id: &str,
        is_internal: bool,
    ) -> Result<String, ThreadlineError> {
        let new = NewThread {
            key: ThreadKey {
                tenant_id: ctx.tenant_id().to_string(),
                workflow_id: workflow.workflow_id.clone(),
                participant_id: participant_id.to_string(),
            },
            workflow_type: workflow.workflow_type.clone(),
            agent: workflow.agent.clone(),
            is_internal,
            created_by: ctx.actor_id().map(str::to_string),
        };
        let upsert = self.store.upsert_thread(&new).await?;

        if upsert.created {
            info!(
                tenant_id = ctx.tenant_id(),
                thread_id = %upsert.thread_id,
                workflow_id = %workflow.workflow_id,
                "thread created"
            );
        } else if upsert.reactivated {
            info!(
                tenant_id = ctx.tenant_id(),
                thread_id = %upsert.thread_id,
                "archived thread reactivated"
            );
        } else {
            debug!(thread_id = %upsert.thread_id, "thread resolved");
        }
        Ok(upsert.thread_id)
    }

    /// Existing thread for `locator`, never creating one.
    pub async fn find(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
    ) -> Result<Option<ConversationThread>, ThreadlineError> {
        let key = locator.key(ctx)?;
        self.store.find_thread(&key).await
    }

    /// Like [`find`](Self::find) but absence is a NotFound error.
    pub async fn require(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
    ) -> Result<ConversationThread, ThreadlineError> {
        let key = locator.key(ctx)?;
        self.store
            .find_thread(&key)
            .await?
            .ok_or_else(|| ThreadlineError::not_found("thread", key.to_string()))
    }

    /// Thread by id, provided it belongs to the caller's tenant.
    ///
    /// A thread of another tenant is reported exactly like a missing one.
    pub async fn owned(
        &self,
        ctx: &RequestContext,
        thread_id: &str,
    ) -> Result<ConversationThread, ThreadlineError> {
        match self.store.get_thread(thread_id).await? {
            Some(thread) if thread.tenant_id == ctx.tenant_id() => Ok(thread),
            _ => Err(ThreadlineError::not_found("thread", thread_id)),
        }
    }
}
