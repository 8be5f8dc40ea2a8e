// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the engine bridge API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Body of `POST /v1/processes/{id}/signal`.
#[derive(Debug, Serialize)]
pub struct SignalRequest<'a> {
    pub signal: &'a str,
    pub payload: &'a serde_json::Value,
}

/// Body of `POST /v1/processes/{id}/signal-with-start`.
#[derive(Debug, Serialize)]
pub struct SignalWithStartRequest<'a> {
    pub process_type: &'a str,
    pub signal: &'a str,
    pub payload: &'a serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_queue: Option<&'a str>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub memo: &'a BTreeMap<String, String>,
}

/// Success body of signal-with-start. Both fields are informational.
#[derive(Debug, Default, Deserialize)]
pub struct SignalWithStartResponse {
    #[serde(default)]
    pub run_id: Option<String>,
    /// `true` when the call started a new process.
    #[serde(default)]
    pub started: bool,
}

/// Error body returned by the bridge on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct EngineErrorResponse {
    pub error: String,
}
