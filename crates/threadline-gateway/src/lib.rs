// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for the Threadline conversation service.
//!
//! Every `/v1` route runs one [`ConversationService`] operation under a
//! [`RequestContext`] built from the caller's headers:
//!
//! - `X-Tenant-Id` (required) selects the tenant namespace
//! - `X-User-Id` (optional) is recorded as the acting user
//! - `Authorization` (optional) is forwarded to the agent process unless it
//!   was consumed by gateway bearer authentication
//!
//! [`ConversationService`]: threadline_conversation::ConversationService
//! [`RequestContext`]: threadline_core::RequestContext

pub mod auth;
pub mod caller;
pub mod error;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use caller::Caller;
pub use error::{ApiError, ErrorResponse};
pub use server::{GatewayState, ServerConfig, build_router, start_server};
