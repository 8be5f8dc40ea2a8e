// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mapping of [`ThreadlineError`] onto HTTP responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use threadline_core::{ErrorKind, ThreadlineError};

/// Error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// A failed operation on its way to the caller.
#[derive(Debug)]
pub struct ApiError(pub ThreadlineError);

impl From<ThreadlineError> for ApiError {
    fn from(err: ThreadlineError) -> Self {
        Self(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            ThreadlineError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ThreadlineError::Cancelled => StatusCode::REQUEST_TIMEOUT,
            err => match err.kind() {
                ErrorKind::Validation => StatusCode::BAD_REQUEST,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::Transient => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self.0, "request failed");
        }
        let body = ErrorResponse {
            error: self.0.public_message(),
            kind: self.0.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}
