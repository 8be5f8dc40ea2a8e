// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Explicit per-request context: tenant, acting user, deadline, cancellation.
//!
//! Every public operation receives a [`RequestContext`] instead of reading
//! tenant or user information from ambient state.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ThreadlineError;

/// Caller identity and limits for a single operation.
#[derive(Debug, Clone)]
pub struct RequestContext {
    tenant_id: String,
    actor_id: Option<String>,
    timeout: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancellationToken,
}

impl RequestContext {
    /// Context for `tenant_id` with no deadline and a fresh cancellation token.
    pub fn new(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            actor_id: None,
            timeout: None,
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    /// Records the user on whose behalf the operation runs.
    pub fn with_actor(mut self, actor_id: impl Into<String>) -> Self {
        self.actor_id = Some(actor_id.into());
        self
    }

    /// Sets a deadline `timeout` from now.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self.deadline = Some(Instant::now() + timeout);
        self
    }

    /// Ties the operation to an externally owned cancellation token.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn actor_id(&self) -> Option<&str> {
        self.actor_id.as_deref()
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Drives `fut` to completion unless the caller cancels or the deadline passes.
    ///
    /// Dropping `fut` early never splits a storage write: each write is a single
    /// transaction executed on the connection's own thread.
    pub async fn run<F, T>(&self, fut: F) -> Result<T, ThreadlineError>
    where
        F: Future<Output = Result<T, ThreadlineError>>,
    {
        let work = async {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Err(ThreadlineError::Cancelled),
                result = fut => result,
            }
        };

        match self.deadline {
            Some(deadline) => tokio::time::timeout_at(deadline, work)
                .await
                .map_err(|_| ThreadlineError::Timeout {
                    duration: self.timeout.unwrap_or_default(),
                })?,
            None => work.await,
        }
    }
}
