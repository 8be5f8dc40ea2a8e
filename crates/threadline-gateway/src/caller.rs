// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-request caller identity taken from headers.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use threadline_core::{RequestContext, ThreadlineError};

use crate::error::ApiError;
use crate::server::GatewayState;

pub const TENANT_HEADER: &str = "x-tenant-id";
pub const USER_HEADER: &str = "x-user-id";

/// Request context plus the credential to forward to the agent.
#[derive(Debug, Clone)]
pub struct Caller {
    pub ctx: RequestContext,
    pub authorization: Option<String>,
}

fn header(parts: &Parts, name: &str) -> Option<String> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl FromRequestParts<GatewayState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &GatewayState,
    ) -> Result<Self, Self::Rejection> {
        let tenant = header(parts, TENANT_HEADER).ok_or_else(|| {
            ThreadlineError::validation(TENANT_HEADER, "header is required")
        })?;

        let mut ctx = RequestContext::new(tenant);
        if let Some(user) = header(parts, USER_HEADER) {
            ctx = ctx.with_actor(user);
        }
        if let Some(timeout) = state.operation_timeout {
            ctx = ctx.with_timeout(timeout);
        }

        Ok(Self {
            ctx,
            authorization: header(parts, AUTHORIZATION.as_str()),
        })
    }
}
