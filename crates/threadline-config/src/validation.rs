// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde cannot express. All problems are collected
//! rather than stopping at the first one.

use crate::diagnostic::ConfigError;
use crate::model::ThreadlineConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &ThreadlineConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if !LOG_LEVELS.contains(&config.service.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level `{}` must be one of {}",
            config.service.log_level,
            LOG_LEVELS.join(", ")
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        errors.push(ConfigError::validation("gateway.host must not be empty"));
    } else {
        let is_ip = host.parse::<std::net::IpAddr>().is_ok();
        let is_hostname = host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-');
        if !is_ip && !is_hostname {
            errors.push(ConfigError::validation(format!(
                "gateway.host `{host}` is not a valid IP address or hostname"
            )));
        }
    }

    if config.gateway.port == 0 {
        errors.push(ConfigError::validation("gateway.port must not be 0"));
    }

    if let Some(token) = &config.gateway.bearer_token
        && token.trim().is_empty()
    {
        errors.push(ConfigError::validation(
            "gateway.bearer_token must not be empty when set",
        ));
    }

    let base_url = config.engine.base_url.trim();
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        errors.push(ConfigError::validation(format!(
            "engine.base_url `{base_url}` must start with http:// or https://"
        )));
    }

    if config.engine.inbound_signal.trim().is_empty() {
        errors.push(ConfigError::validation(
            "engine.inbound_signal must not be empty",
        ));
    }

    if config.engine.timeout_secs == 0 {
        errors.push(ConfigError::validation(
            "engine.timeout_secs must be at least 1",
        ));
    }

    let conversation = &config.conversation;
    if conversation.default_page_size < 1 {
        errors.push(ConfigError::validation(
            "conversation.default_page_size must be at least 1",
        ));
    }
    if conversation.max_page_size < 1 {
        errors.push(ConfigError::validation(
            "conversation.max_page_size must be at least 1",
        ));
    }
    if conversation.default_page_size > conversation.max_page_size {
        errors.push(ConfigError::validation(format!(
            "conversation.default_page_size ({}) must not exceed conversation.max_page_size ({})",
            conversation.default_page_size, conversation.max_page_size
        )));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
