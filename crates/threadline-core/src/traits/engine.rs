// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Orchestration engine adapter trait.

use async_trait::async_trait;

use crate::error::ThreadlineError;
use crate::traits::adapter::PluginAdapter;
use crate::types::StartOptions;

/// The two primitives consumed from the external orchestration engine.
#[async_trait]
pub trait WorkflowEngine: PluginAdapter {
    /// Delivers a signal to a running process.
    ///
    /// Fails with [`ThreadlineError::ProcessNotFound`] when the process does not exist.
    async fn signal(
        &self,
        process_id: &str,
        signal_name: &str,
        payload: serde_json::Value,
    ) -> Result<(), ThreadlineError>;

    /// Signals the process with `proposed_process_id`, starting it first
    /// when it is not running.
    async fn signal_with_start(
        &self,
        proposed_process_id: &str,
        process_type: &str,
        signal_name: &str,
        payload: serde_json::Value,
        options: &StartOptions,
    ) -> Result<(), ThreadlineError>;
}
