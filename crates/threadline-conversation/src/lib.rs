// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation thread and cross-agent handoff engine.
//!
//! [`ConversationService`] is the entry point for the seven caller
//! operations. Each one runs under the caller's [`RequestContext`], which
//! bounds it by deadline and cancellation.

pub mod dispatcher;
pub mod handoff;
pub mod message_log;
pub mod processor;
pub mod resolver;

use std::sync::Arc;

use threadline_config::ThreadlineConfig;
use threadline_core::types::{ConversationMessage, ConversationThread, TopicSummary};
use threadline_core::{RequestContext, ThreadStore, ThreadlineError, WorkflowEngine};
use tracing::info;

pub use dispatcher::SignalDispatcher;
pub use handoff::{HandoffOrchestrator, HandoffOutcome, HandoffRequest, HandoffTarget};
pub use message_log::{HistoryParams, MessageLog, PageLimits};
pub use processor::{MessageCommand, MessageProcessor};
pub use resolver::{ThreadLocator, ThreadResolver};

/// Facade over resolver, log, processor, and handoff orchestrator.
#[derive(Clone)]
pub struct ConversationService {
    store: Arc<dyn ThreadStore>,
    resolver: ThreadResolver,
    log: MessageLog,
    processor: MessageProcessor,
    handoffs: HandoffOrchestrator,
}

impl ConversationService {
    pub fn new(
        store: Arc<dyn ThreadStore>,
        engine: Arc<dyn WorkflowEngine>,
        config: &ThreadlineConfig,
    ) -> Self {
        let resolver = ThreadResolver::new(Arc::clone(&store));
        let log = MessageLog::new(Arc::clone(&store), PageLimits::from(&config.conversation));
        let dispatcher = SignalDispatcher::new(engine, &config.engine);
        let processor = MessageProcessor::new(resolver.clone(), log.clone(), dispatcher.clone());
        let handoffs = HandoffOrchestrator::new(
            resolver.clone(),
            log.clone(),
            dispatcher,
            config.conversation.handoff_delivery,
        );
        Self {
            store,
            resolver,
            log,
            processor,
            handoffs,
        }
    }

    /// Records a caller message and delivers it to the agent. Returns the thread id.
    pub async fn process_incoming(
        &self,
        ctx: &RequestContext,
        command: &MessageCommand,
    ) -> Result<String, ThreadlineError> {
        ctx.run(self.processor.process_incoming(ctx, command)).await
    }

    /// Records an agent reply. Returns the thread id.
    pub async fn process_outgoing(
        &self,
        ctx: &RequestContext,
        command: &MessageCommand,
    ) -> Result<String, ThreadlineError> {
        ctx.run(self.processor.process_outgoing(ctx, command)).await
    }

    /// Hands a conversation to another agent.
    pub async fn handoff(
        &self,
        ctx: &RequestContext,
        request: &HandoffRequest,
    ) -> Result<HandoffOutcome, ThreadlineError> {
        ctx.run(self.handoffs.handoff(ctx, request)).await
    }

    /// History of the thread identified by workflow and participant.
    pub async fn history(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
        params: &HistoryParams,
    ) -> Result<Vec<ConversationMessage>, ThreadlineError> {
        let mut query = self.log.query("", params)?;
        ctx.run(async {
            let thread = self.resolver.require(ctx, locator).await?;
            query.thread_id = thread.id;
            self.log.history(&query).await
        })
        .await
    }

    /// History of a thread addressed by id.
    pub async fn thread_history(
        &self,
        ctx: &RequestContext,
        thread_id: &str,
        params: &HistoryParams,
    ) -> Result<Vec<ConversationMessage>, ThreadlineError> {
        let query = self.log.query(thread_id, params)?;
        ctx.run(async {
            self.resolver.owned(ctx, thread_id).await?;
            self.log.history(&query).await
        })
        .await
    }

    /// Per-topic message counts; a missing thread has no topics.
    pub async fn topics(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<Vec<TopicSummary>, ThreadlineError> {
        let (page, page_size) = self.log.limits().check(page, page_size)?;
        ctx.run(async {
            match self.resolver.find(ctx, locator).await? {
                Some(thread) => self.log.topics(&thread.id, page, page_size).await,
                None => Ok(Vec::new()),
            }
        })
        .await
    }

    /// Deletes a thread and all its messages. Returns the messages removed.
    pub async fn delete_thread(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
    ) -> Result<u64, ThreadlineError> {
        ctx.run(async {
            let thread = self.resolver.require(ctx, locator).await?;
            let removed = self.log.delete_thread(&thread.id).await?;
            info!(
                tenant_id = ctx.tenant_id(),
                thread_id = %thread.id,
                removed,
                "thread deleted"
            );
            Ok(removed)
        })
        .await
    }

    /// Deletes one topic of a thread; `None` selects the default topic.
    pub async fn delete_by_topic(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
        scope: Option<&str>,
    ) -> Result<u64, ThreadlineError> {
        ctx.run(async {
            let thread = self.resolver.require(ctx, locator).await?;
            let removed = self.log.delete_by_topic(&thread.id, scope).await?;
            info!(
                tenant_id = ctx.tenant_id(),
                thread_id = %thread.id,
                scope = scope.unwrap_or(""),
                removed,
                "topic deleted"
            );
            Ok(removed)
        })
        .await
    }

    /// Thread by id within the caller's tenant.
    pub async fn get_thread(
        &self,
        ctx: &RequestContext,
        thread_id: &str,
    ) -> Result<ConversationThread, ThreadlineError> {
        ctx.run(self.resolver.owned(ctx, thread_id)).await
    }

    /// Thread by natural key, if it exists.
    pub async fn find_thread(
        &self,
        ctx: &RequestContext,
        locator: &ThreadLocator,
    ) -> Result<Option<ConversationThread>, ThreadlineError> {
        ctx.run(self.resolver.find(ctx, locator)).await
    }

    /// Marks a thread archived; the next message reactivates it.
    pub async fn archive_thread(
        &self,
        ctx: &RequestContext,
        thread_id: &str,
    ) -> Result<(), ThreadlineError> {
        ctx.run(async {
            let thread = self.resolver.owned(ctx, thread_id).await?;
            if !self.store.archive_thread(&thread.id).await? {
                return Err(ThreadlineError::not_found("thread", thread_id));
            }
            info!(tenant_id = ctx.tenant_id(), thread_id, "thread archived");
            Ok(())
        })
        .await
    }
}
