// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for the thread and message collections.

use async_trait::async_trait;

use crate::error::ThreadlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    ConversationMessage, ConversationThread, MessageDirection, MessageQuery, NewThread,
    ScopeFilter, ThreadKey, ThreadUpsert, TopicSummary,
};

/// Durable keyed storage for conversation threads and their messages.
///
/// Concurrency correctness lives here: [`upsert_thread`](Self::upsert_thread)
/// must be atomic on the natural key and
/// [`append_message`](Self::append_message) must insert the message and bump
/// the thread's `updated_at` as one unit.
#[async_trait]
pub trait ThreadStore: PluginAdapter {
    /// Initializes the backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ThreadlineError>;

    /// Closes the backend, flushing pending writes.
    async fn close(&self) -> Result<(), ThreadlineError>;

    /// Creates the thread for `new.key` or returns the existing one,
    /// reactivating it if it was archived.
    async fn upsert_thread(&self, new: &NewThread) -> Result<ThreadUpsert, ThreadlineError>;

    async fn get_thread(
        &self,
        thread_id: &str,
    ) -> Result<Option<ConversationThread>, ThreadlineError>;

    async fn find_thread(
        &self,
        key: &ThreadKey,
    ) -> Result<Option<ConversationThread>, ThreadlineError>;

    /// Marks a thread archived. Returns `false` when no such thread exists.
    async fn archive_thread(&self, thread_id: &str) -> Result<bool, ThreadlineError>;

    /// Persists `message` and sets its thread's `updated_at` to the
    /// message's `created_at` in the same transaction.
    async fn append_message(&self, message: &ConversationMessage) -> Result<(), ThreadlineError>;

    /// Ordered, paged, filtered view of one thread's messages.
    async fn query_messages(
        &self,
        query: &MessageQuery,
    ) -> Result<Vec<ConversationMessage>, ThreadlineError>;

    /// Most recent message of `direction` in a thread.
    async fn latest_message(
        &self,
        thread_id: &str,
        direction: MessageDirection,
    ) -> Result<Option<ConversationMessage>, ThreadlineError>;

    /// Message counts grouped by scope, default topic included, paged.
    async fn topics(
        &self,
        thread_id: &str,
        page: u32,
        page_size: u32,
    ) -> Result<Vec<TopicSummary>, ThreadlineError>;

    /// Deletes every message of a thread. Returns the number removed.
    async fn delete_messages_by_thread(&self, thread_id: &str) -> Result<u64, ThreadlineError>;

    /// Deletes the thread row. Returns `false` when it did not exist.
    async fn delete_thread(&self, thread_id: &str) -> Result<bool, ThreadlineError>;

    /// Deletes the messages of one topic. `scope` must not be [`ScopeFilter::Any`].
    async fn delete_messages_by_scope(
        &self,
        thread_id: &str,
        scope: &ScopeFilter,
    ) -> Result<u64, ThreadlineError>;
}
