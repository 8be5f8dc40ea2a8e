// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};
use threadline_conversation::{
    HandoffOutcome, HandoffRequest, HistoryParams, MessageCommand, ThreadLocator,
};
use threadline_core::types::{ConversationMessage, SortOrder, TopicSummary};

use crate::caller::Caller;
use crate::error::ApiError;
use crate::server::GatewayState;

/// Response body for message and handoff writes.
#[derive(Debug, Serialize, Deserialize)]
pub struct ThreadResponse {
    pub thread_id: String,
}

/// Response body for POST /v1/handoffs.
#[derive(Debug, Serialize, Deserialize)]
pub struct HandoffResponse {
    /// The target thread.
    pub thread_id: String,
    pub handoff_id: String,
    pub workflow_id: String,
    pub source_message_id: String,
    pub target_message_id: String,
}

impl From<HandoffOutcome> for HandoffResponse {
    fn from(outcome: HandoffOutcome) -> Self {
        Self {
            thread_id: outcome.target_thread_id,
            handoff_id: outcome.handoff_id,
            workflow_id: outcome.target_workflow_id,
            source_message_id: outcome.source_message_id,
            target_message_id: outcome.target_message_id,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub messages: Vec<ConversationMessage>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TopicsResponse {
    pub topics: Vec<TopicSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub messages_removed: u64,
}

/// Response body for GET /health.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Query string for GET /v1/messages.
///
/// Flat rather than `#[serde(flatten)]` so numeric fields parse from the
/// query string.
#[derive(Debug, Default, Deserialize)]
pub struct MessagesQuery {
    #[serde(default, alias = "workflow")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(alias = "participant")]
    pub participant_id: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default, alias = "topic")]
    pub scope: Option<String>,
    #[serde(default)]
    pub chat_only: bool,
    #[serde(default, alias = "sort")]
    pub sort_order: SortOrder,
}

impl MessagesQuery {
    fn split(self) -> (ThreadLocator, HistoryParams) {
        let locator = ThreadLocator {
            workflow_id: self.workflow_id,
            workflow_type: self.workflow_type,
            participant_id: self.participant_id,
        };
        let params = HistoryParams {
            page: self.page,
            page_size: self.page_size,
            scope: self.scope,
            chat_only: self.chat_only,
            sort_order: self.sort_order,
        };
        (locator, params)
    }
}

/// Query string for GET /v1/topics.
#[derive(Debug, Default, Deserialize)]
pub struct TopicsQuery {
    #[serde(default, alias = "workflow")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(alias = "participant")]
    pub participant_id: String,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

/// Query string for DELETE /v1/topics. No `scope` selects the default topic.
#[derive(Debug, Default, Deserialize)]
pub struct TopicDeleteQuery {
    #[serde(default, alias = "workflow")]
    pub workflow_id: Option<String>,
    #[serde(default)]
    pub workflow_type: Option<String>,
    #[serde(alias = "participant")]
    pub participant_id: String,
    #[serde(default, alias = "topic")]
    pub scope: Option<String>,
}

fn locator(
    workflow_id: Option<String>,
    workflow_type: Option<String>,
    participant_id: String,
) -> ThreadLocator {
    ThreadLocator {
        workflow_id,
        workflow_type,
        participant_id,
    }
}

/// Body credential wins; the header is the fallback.
fn forward_authorization(body: &mut Option<String>, caller: &Caller) {
    if body.is_none() {
        body.clone_from(&caller.authorization);
    }
}

/// POST /v1/messages/inbound
pub async fn post_inbound(
    State(state): State<GatewayState>,
    caller: Caller,
    Json(mut command): Json<MessageCommand>,
) -> Result<Json<ThreadResponse>, ApiError> {
    forward_authorization(&mut command.authorization, &caller);
    let thread_id = state
        .service
        .process_incoming(&caller.ctx, &command)
        .await?;
    Ok(Json(ThreadResponse { thread_id }))
}

/// POST /v1/messages/outbound
pub async fn post_outbound(
    State(state): State<GatewayState>,
    caller: Caller,
    Json(command): Json<MessageCommand>,
) -> Result<Json<ThreadResponse>, ApiError> {
    let thread_id = state
        .service
        .process_outgoing(&caller.ctx, &command)
        .await?;
    Ok(Json(ThreadResponse { thread_id }))
}

/// POST /v1/handoffs
pub async fn post_handoff(
    State(state): State<GatewayState>,
    caller: Caller,
    Json(mut request): Json<HandoffRequest>,
) -> Result<Json<HandoffResponse>, ApiError> {
    forward_authorization(&mut request.authorization, &caller);
    let outcome = state.service.handoff(&caller.ctx, &request).await?;
    Ok(Json(outcome.into()))
}

/// GET /v1/threads/{thread_id}/messages
pub async fn get_thread_messages(
    State(state): State<GatewayState>,
    caller: Caller,
    Path(thread_id): Path<String>,
    Query(params): Query<HistoryParams>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state
        .service
        .thread_history(&caller.ctx, &thread_id, &params)
        .await?;
    Ok(Json(HistoryResponse { messages }))
}

/// GET /v1/messages
pub async fn get_messages(
    State(state): State<GatewayState>,
    caller: Caller,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let (locator, params) = query.split();
    let messages = state
        .service
        .history(&caller.ctx, &locator, &params)
        .await?;
    Ok(Json(HistoryResponse { messages }))
}

/// GET /v1/topics
pub async fn get_topics(
    State(state): State<GatewayState>,
    caller: Caller,
    Query(query): Query<TopicsQuery>,
) -> Result<Json<TopicsResponse>, ApiError> {
    let locator = locator(query.workflow_id, query.workflow_type, query.participant_id);
    let topics = state
        .service
        .topics(&caller.ctx, &locator, query.page, query.page_size)
        .await?;
    Ok(Json(TopicsResponse { topics }))
}

/// DELETE /v1/threads
pub async fn delete_thread(
    State(state): State<GatewayState>,
    caller: Caller,
    Query(locator): Query<ThreadLocator>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let messages_removed = state.service.delete_thread(&caller.ctx, &locator).await?;
    Ok(Json(DeleteResponse { messages_removed }))
}

/// DELETE /v1/topics
pub async fn delete_topic(
    State(state): State<GatewayState>,
    caller: Caller,
    Query(query): Query<TopicDeleteQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let locator = locator(query.workflow_id, query.workflow_type, query.participant_id);
    let messages_removed = state
        .service
        .delete_by_topic(&caller.ctx, &locator, query.scope.as_deref())
        .await?;
    Ok(Json(DeleteResponse { messages_removed }))
}

/// GET /health
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
