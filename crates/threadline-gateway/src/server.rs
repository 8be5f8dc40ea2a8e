// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Router, middleware as axum_middleware,
    routing::{delete, get, post},
};
use threadline_config::ThreadlineConfig;
use threadline_conversation::ConversationService;
use threadline_core::ThreadlineError;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub service: Arc<ConversationService>,
    /// Deadline applied to every operation; `None` disables it.
    pub operation_timeout: Option<Duration>,
    pub start_time: Instant,
}

impl GatewayState {
    pub fn new(service: Arc<ConversationService>, config: &ThreadlineConfig) -> Self {
        let secs = config.conversation.operation_timeout_secs;
        Self {
            service,
            operation_timeout: (secs > 0).then(|| Duration::from_secs(secs)),
            start_time: Instant::now(),
        }
    }
}

/// Bind address and credentials of the gateway.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub auth: AuthConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth", &self.auth)
            .finish()
    }
}

impl From<&threadline_config::model::GatewayConfig> for ServerConfig {
    fn from(config: &threadline_config::model::GatewayConfig) -> Self {
        Self {
            host: config.host.clone(),
            port: config.port,
            auth: AuthConfig {
                bearer_token: config.bearer_token.clone(),
            },
        }
    }
}

/// Builds the gateway router.
///
/// `/health` is public; every `/v1` route sits behind [`auth_middleware`].
pub fn build_router(state: GatewayState, auth: AuthConfig) -> Router {
    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/messages/inbound", post(handlers::post_inbound))
        .route("/v1/messages/outbound", post(handlers::post_outbound))
        .route("/v1/handoffs", post(handlers::post_handoff))
        .route(
            "/v1/threads/{thread_id}/messages",
            get(handlers::get_thread_messages),
        )
        .route("/v1/messages", get(handlers::get_messages))
        .route("/v1/threads", delete(handlers::delete_thread))
        .route(
            "/v1/topics",
            get(handlers::get_topics).delete(handlers::delete_topic),
        )
        .route_layer(axum_middleware::from_fn_with_state(auth, auth_middleware))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `shutdown` is cancelled.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    shutdown: CancellationToken,
) -> Result<(), ThreadlineError> {
    if !config.auth.is_enabled() {
        tracing::warn!("gateway bearer token not set; /v1 routes are unauthenticated");
    }
    let app = build_router(state, config.auth.clone());

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ThreadlineError::Config(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ThreadlineError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
