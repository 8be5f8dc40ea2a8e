// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only per-thread message history with topic partitioning.

use std::sync::Arc;

use serde::Deserialize;
use threadline_config::model::ConversationConfig;
use threadline_core::types::{
    ConversationMessage, MessageDirection, MessageQuery, ScopeFilter, SortOrder, TopicSummary,
};
use threadline_core::{ThreadStore, ThreadlineError};
use tracing::debug;

/// Paging bounds applied to history and topic listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
}

impl From<&ConversationConfig> for PageLimits {
    fn from(config: &ConversationConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
        }
    }
}

impl Default for PageLimits {
    fn default() -> Self {
        Self::from(&ConversationConfig::default())
    }
}

impl PageLimits {
    /// Validates caller paging input, filling in defaults.
    ///
    /// Signed input so that zero and negative values reach this check instead
    /// of failing deserialization somewhere upstream.
    pub fn check(
        &self,
        page: Option<i64>,
        page_size: Option<i64>,
    ) -> Result<(u32, u32), ThreadlineError> {
        let page = page.unwrap_or(1);
        if page < 1 {
            return Err(ThreadlineError::validation(
                "page",
                format!("must be at least 1, got {page}"),
            ));
        }
        let page = u32::try_from(page)
            .map_err(|_| ThreadlineError::validation("page", format!("{page} is too large")))?;

        let page_size = page_size.unwrap_or(i64::from(self.default_page_size));
        if page_size < 1 {
            return Err(ThreadlineError::validation(
                "page_size",
                format!("must be at least 1, got {page_size}"),
            ));
        }
        if page_size > i64::from(self.max_page_size) {
            return Err(ThreadlineError::validation(
                "page_size",
                format!("must be at most {}, got {page_size}", self.max_page_size),
            ));
        }
        let page_size = u32::try_from(page_size).map_err(|_| {
            ThreadlineError::validation("page_size", format!("{page_size} is too large"))
        })?;
        Ok((page, page_size))
    }
}

/// Caller-supplied history filters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct HistoryParams {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    /// Absent returns every topic; empty selects the default topic.
    #[serde(default, alias = "topic")]
    pub scope: Option<String>,
    #[serde(default)]
    pub chat_only: bool,
    #[serde(default, alias = "sort")]
    pub sort_order: SortOrder,
}

/// The message log over a [`ThreadStore`].
#[derive(Clone)]
pub struct MessageLog {
    store: Arc<dyn ThreadStore>,
    limits: PageLimits,
}

impl MessageLog {
    pub fn new(store: Arc<dyn ThreadStore>, limits: PageLimits) -> Self {
        Self { store, limits }
    }

    pub fn limits(&self) -> PageLimits {
        self.limits
    }

    /// Persists `message` and bumps its thread's `updated_at`; returns the message id.
    pub async fn append(&self, message: &ConversationMessage) -> Result<String, ThreadlineError> {
        self.store.append_message(message).await?;
        debug!(
            thread_id = %message.thread_id,
            message_id = %message.id,
            direction = %message.direction,
            "message appended"
        );
        Ok(message.id.clone())
    }

    /// Builds the storage query for `thread_id`, rejecting bad paging input.
    pub fn query(
        &self,
        thread_id: &str,
        params: &HistoryParams,
    ) -> Result<MessageQuery, ThreadlineError> {
        let (page, page_size) = self.limits.check(params.page, params.page_size)?;
        Ok(MessageQuery {
            thread_id: thread_id.to_string(),
            page,
            page_size,
            scope: ScopeFilter::from_param(params.scope.as_deref()),
            chat_only: params.chat_only,
            sort: params.sort_order,
        })
    }

    /// Runs a query built by [`query`](Self::query).
    pub async fn history(
        &self,
        query: &MessageQuery,
    ) -> Result<Vec<ConversationMessage>, ThreadlineError> {
        self.store.query_messages(query).await
    }

    /// Most recent inbound message of a thread.
    pub async fn latest_incoming(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationMessage>, ThreadlineError> {
        self.store
            .latest_message(thread_id, MessageDirection::Incoming)
            .await
    }

    pub async fn topics(
        &self,
        thread_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TopicSummary>, ThreadlineError> {
        self.store.topics(thread_id, page, page_size).await
    }

    /// Deletes every message, then the thread row. Returns messages removed.
    pub async fn delete_thread(&self, thread_id: &str) -> Result<u64, ThreadlineError> {
        let removed = self.store.delete_messages_by_thread(thread_id).await?;
        if !self.store.delete_thread(thread_id).await? {
            return Err(ThreadlineError::not_found("thread", thread_id));
        }
        Ok(removed)
    }

    /// Deletes one topic; `None` or empty selects the default topic.
    pub async fn delete_by_topic(
        &self,
        thread_id: &str,
        scope: Option<&str>,
    ) -> Result<u64, ThreadlineError> {
        self.store
            .delete_messages_by_scope(thread_id, &ScopeFilter::topic(scope))
            .await
    }
}
