// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation domain types shared across adapter trait boundaries.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Timestamp layout used for every persisted `created_at`/`updated_at`.
///
/// Fixed-width UTC with microseconds, so lexical order equals time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6fZ";

/// Current UTC time rendered with [`TIMESTAMP_FORMAT`].
pub fn now_timestamp() -> String {
    chrono::Utc::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Health status reported by adapter health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Adapter is fully operational.
    Healthy,
    /// Adapter is operational but experiencing issues.
    Degraded(String),
    /// Adapter is not operational.
    Unhealthy(String),
}

/// Identifies the kind of adapter behind a trait object.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum AdapterType {
    Storage,
    Engine,
}

/// Lifecycle state of a conversation thread.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    Active,
    Archived,
}

/// Which way a message travelled relative to the agent.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageDirection {
    Incoming,
    Outgoing,
    Handoff,
}

/// Kind of content a message carries.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    Chat,
    Data,
    Handoff,
}

/// Ordering applied to message history.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumString,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Natural key of a conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadKey {
    pub tenant_id: String,
    pub workflow_id: String,
    pub participant_id: String,
}

impl fmt::Display for ThreadKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.tenant_id, self.workflow_id, self.participant_id
        )
    }
}

/// A durable conversation between one participant and one agent-backed process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationThread {
    pub id: String,
    pub tenant_id: String,
    pub workflow_id: String,
    pub workflow_type: String,
    pub agent: String,
    pub participant_id: String,
    pub status: ThreadStatus,
    pub is_internal: bool,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
}

impl ConversationThread {
    pub fn key(&self) -> ThreadKey {
        ThreadKey {
            tenant_id: self.tenant_id.clone(),
            workflow_id: self.workflow_id.clone(),
            participant_id: self.participant_id.clone(),
        }
    }
}

/// Attributes used when a thread has to be created for a key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewThread {
    pub key: ThreadKey,
    pub workflow_type: String,
    pub agent: String,
    pub is_internal: bool,
    pub created_by: Option<String>,
}

/// Outcome of an atomic create-or-get on the thread natural key.
#[derive(Debug, Clone, PartialEq)]
pub struct ThreadUpsert {
    pub thread_id: String,
    /// This call inserted the row.
    pub created: bool,
    /// The row existed as Archived and was switched back to Active.
    pub reactivated: bool,
}

/// One immutable entry in a thread's message log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationMessage {
    pub id: String,
    pub thread_id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub direction: MessageDirection,
    pub message_type: MessageType,
    pub text: Option<String>,
    pub data: Option<serde_json::Value>,
    /// `None` is the default topic; an empty string is never stored.
    pub scope: Option<String>,
    pub request_id: String,
    pub hint: Option<String>,
    pub task_id: Option<String>,
    pub origin: Option<String>,
    pub workflow_id: String,
    pub workflow_type: String,
    pub created_at: String,
    pub updated_at: String,
    pub created_by: Option<String>,
    pub parent_workflow_id: Option<String>,
    pub child_workflow_id: Option<String>,
}

/// Collapses the empty string into the default topic.
pub fn normalize_scope(scope: Option<&str>) -> Option<String> {
    match scope {
        Some(s) if !s.is_empty() => Some(s.to_string()),
        _ => None,
    }
}

/// Which topics a history query returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ScopeFilter {
    /// Every topic, including the default one.
    #[default]
    Any,
    /// Only messages without a scope.
    Default,
    /// Only messages with exactly this scope.
    Named(String),
}

impl ScopeFilter {
    /// Maps an optional history filter: absent means all topics, empty means
    /// the default topic.
    pub fn from_param(scope: Option<&str>) -> Self {
        match scope {
            None => Self::Any,
            Some("") => Self::Default,
            Some(s) => Self::Named(s.to_string()),
        }
    }

    /// Maps a topic selector where absence means the default topic.
    pub fn topic(scope: Option<&str>) -> Self {
        match normalize_scope(scope) {
            None => Self::Default,
            Some(s) => Self::Named(s),
        }
    }
}

/// A validated, storage-level history query.
#[derive(Debug, Clone, PartialEq)]
pub struct MessageQuery {
    pub thread_id: String,
    pub page: u32,
    pub page_size: u32,
    pub scope: ScopeFilter,
    pub chat_only: bool,
    pub sort: SortOrder,
}

impl MessageQuery {
    /// Number of rows to skip for the requested page.
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }
}

/// Message count for one topic of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicSummary {
    /// `None` is the default topic.
    pub scope: Option<String>,
    pub message_count: u64,
}

/// Options applied when the engine has to start a process on demand.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartOptions {
    /// Task queue the new process is scheduled on; engine default when `None`.
    pub task_queue: Option<String>,
    /// Searchable metadata attached to the process.
    pub memo: BTreeMap<String, String>,
}

/// Payload delivered to an agent process with every message signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageSignal {
    pub thread_id: String,
    pub message_id: String,
    pub tenant_id: String,
    pub participant_id: String,
    pub workflow_id: String,
    pub workflow_type: String,
    pub message_type: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    pub request_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_workflow_id: Option<String>,
}
