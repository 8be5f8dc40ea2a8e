// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Threadline control plane.

use std::time::Duration;

use thiserror::Error;

/// The primary error type used across all Threadline adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ThreadlineError {
    /// Configuration errors (invalid TOML, missing required fields, bad engine URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// Caller input was rejected before any I/O took place.
    #[error("invalid {field}: {message}")]
    Validation { field: String, message: String },

    /// A thread (or other keyed entity) does not exist for the caller's tenant.
    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    /// A plain signal targeted a process the orchestration engine does not know.
    #[error("process not found: {process_id}")]
    ProcessNotFound { process_id: String },

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Orchestration engine errors (unreachable, rejected request, bad response).
    #[error("engine error: {message}")]
    Engine {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation exceeded the caller-supplied deadline.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Operation was cancelled by the caller.
    #[error("operation cancelled")]
    Cancelled,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Caller-facing classification of a [`ThreadlineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// The request was malformed; correct it and resubmit.
    Validation,
    /// Nothing exists for the requested key.
    NotFound,
    /// Infrastructure failure; the caller may retry.
    Transient,
    /// Bug or unexpected state.
    Internal,
}

impl ThreadlineError {
    /// Builds a validation error for the named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Builds a not-found error for the named entity and key.
    pub fn not_found(entity: impl Into<String>, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.into(),
        }
    }

    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }

    /// Classifies the error for callers.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::NotFound { .. } | Self::ProcessNotFound { .. } => ErrorKind::NotFound,
            Self::Storage { .. }
            | Self::Engine { .. }
            | Self::Timeout { .. }
            | Self::Cancelled => ErrorKind::Transient,
            Self::Config(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Message safe to return to an external caller.
    ///
    /// Validation and not-found errors carry their full context. Infrastructure
    /// errors are reduced to an opaque description.
    pub fn public_message(&self) -> String {
        match self {
            Self::Validation { .. }
            | Self::NotFound { .. }
            | Self::ProcessNotFound { .. }
            | Self::Timeout { .. }
            | Self::Cancelled => self.to_string(),
            Self::Storage { .. } => "conversation store unavailable".to_string(),
            Self::Engine { .. } => "orchestration engine unavailable".to_string(),
            Self::Config(_) | Self::Internal(_) => "internal error".to_string(),
        }
    }
}
