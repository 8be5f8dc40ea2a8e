// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bearer token authentication for `/v1` routes.

use axum::{
    extract::{Request, State},
    http::{StatusCode, header::AUTHORIZATION},
    middleware::Next,
    response::Response,
};

/// Authentication configuration for the gateway.
#[derive(Clone, Default)]
pub struct AuthConfig {
    /// Expected bearer token. `None` leaves the API open.
    pub bearer_token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        self.bearer_token.is_some()
    }
}

/// Rejects requests without the configured bearer token.
///
/// A matching `Authorization` header is removed before the request reaches
/// a handler, so the gateway credential is never forwarded to an agent.
pub async fn auth_middleware(
    State(auth): State<AuthConfig>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = auth.bearer_token.as_deref() else {
        return Ok(next.run(request).await);
    };

    let presented = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    if presented == Some(expected) {
        request.headers_mut().remove(AUTHORIZATION);
        return Ok(next.run(request).await);
    }

    tracing::debug!(
        path = %request.uri().path(),
        "request rejected: missing or wrong bearer token"
    );
    Err(StatusCode::UNAUTHORIZED)
}
