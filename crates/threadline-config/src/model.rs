// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Threadline control plane.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use serde::{Deserialize, Serialize};

/// Top-level Threadline configuration.
///
/// Every section is optional and defaults to values suitable for a single
/// local node.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ThreadlineConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Orchestration engine bridge.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Paging limits, deadlines and handoff policy.
    #[serde(default)]
    pub conversation: ConversationConfig,
}

impl ThreadlineConfig {
    /// Copy with secrets replaced, for printing.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.gateway.bearer_token.is_some() {
            copy.gateway.bearer_token = Some(REDACTED.to_string());
        }
        if copy.engine.api_key.is_some() {
            copy.engine.api_key = Some(REDACTED.to_string());
        }
        copy
    }
}

const REDACTED: &str = "[redacted]";

/// Process identity and log verbosity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "threadline".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// SQLite thread and message store.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("threadline/threadline.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("threadline.db"))
        .display()
        .to_string()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Required `Authorization: Bearer` value; `None` disables the check.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3080
}

/// Orchestration engine bridge the dispatcher signals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default = "default_engine_url")]
    pub base_url: String,

    /// Sent as a bearer token on every engine request when set.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Signal name used for every message delivered to an agent process.
    #[serde(default = "default_inbound_signal")]
    pub inbound_signal: String,

    #[serde(default = "default_engine_timeout")]
    pub timeout_secs: u64,

    /// Task queue for processes started on demand; engine default when unset.
    #[serde(default)]
    pub task_queue: Option<String>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            base_url: default_engine_url(),
            api_key: None,
            inbound_signal: default_inbound_signal(),
            timeout_secs: default_engine_timeout(),
            task_queue: None,
        }
    }
}

fn default_engine_url() -> String {
    "http://127.0.0.1:8233".to_string()
}

fn default_inbound_signal() -> String {
    "inbound_message".to_string()
}

fn default_engine_timeout() -> u64 {
    10
}

/// How a handoff reaches the target agent process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffDelivery {
    /// Plain signal for a known running target, signal-or-start otherwise.
    #[default]
    Conditional,
    /// Always signal-or-start.
    SignalOrStart,
}

/// Conversation service limits and policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConversationConfig {
    /// Page size used when a history or topics request omits one.
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Largest page size a caller may request.
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,

    /// Deadline applied to gateway requests; 0 disables it.
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_secs: u64,

    #[serde(default)]
    pub handoff_delivery: HandoffDelivery,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
            operation_timeout_secs: default_operation_timeout(),
            handoff_delivery: HandoffDelivery::default(),
        }
    }
}

fn default_page_size() -> u32 {
    20
}

fn default_max_page_size() -> u32 {
    200
}

fn default_operation_timeout() -> u64 {
    30
}
